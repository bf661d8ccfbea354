//! Donation Normalization
//!
//! Turns a wire [`DonationRequest`] into a checked [`Donation`] ready for
//! the payment processor.

use std::collections::HashMap;

use donate_core::{
    validate_donor,
    wire::{to_minor_units, DonorMetadata},
    AmountUnits, Decimal, DonationRequest, DonorForm, Frequency,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PaymentError, Result};

/// Currencies the intent endpoint accepts
pub const SUPPORTED_CURRENCIES: &[&str] = &["usd", "eur", "gbp", "cad", "aud"];

/// A validated donation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    /// Designated fund
    pub fund: String,

    /// Donor's chosen frequency (recorded only)
    pub frequency: Frequency,

    /// Amount in currency units
    pub amount: Decimal,

    /// Amount in the processor's smallest unit
    pub amount_minor: i64,

    /// Lowercase ISO currency code
    pub currency: String,

    pub donor: DonorMetadata,
}

impl Donation {
    /// Validate a request body.
    ///
    /// Applies the same donor rules as the modal, then requires a positive
    /// amount in a supported currency.
    pub fn from_request(request: &DonationRequest, units: AmountUnits) -> Result<Self> {
        let form = DonorForm {
            first_name: request.metadata.first_name.clone(),
            last_name: request.metadata.last_name.clone(),
            email: request.metadata.email.clone(),
            designation: request.fund.clone(),
        };
        let report = validate_donor(&form);
        if !report.is_valid() {
            return Err(PaymentError::InvalidRequest(report.to_string()));
        }

        let amount = request
            .amount_major(units)
            .map_err(|e| PaymentError::InvalidRequest(e.to_string()))?;
        let amount_minor =
            to_minor_units(amount).map_err(|e| PaymentError::InvalidRequest(e.to_string()))?;
        if amount_minor <= 0 {
            return Err(PaymentError::InvalidRequest(format!(
                "amount must be at least one minor unit, got {amount}"
            )));
        }

        let currency = request.currency.trim().to_lowercase();
        if !SUPPORTED_CURRENCIES.contains(&currency.as_str()) {
            return Err(PaymentError::InvalidRequest(format!(
                "unsupported currency: {currency}"
            )));
        }

        Ok(Self {
            fund: form.fund().to_string(),
            frequency: request.frequency,
            amount,
            amount_minor,
            currency,
            donor: DonorMetadata {
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                email: form.email.trim().to_string(),
            },
        })
    }

    /// Statement description shown in the Stripe dashboard
    pub fn description(&self) -> String {
        match self.frequency {
            Frequency::OneTime => format!("Donation to {}", self.fund),
            Frequency::Monthly => format!("Monthly donation to {}", self.fund),
        }
    }

    /// Metadata attached to the payment intent
    pub fn metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            ("fund".to_string(), self.fund.clone()),
            ("frequency".to_string(), self.frequency.as_str().to_string()),
            ("first_name".to_string(), self.donor.first_name.clone()),
            ("last_name".to_string(), self.donor.last_name.clone()),
        ])
    }
}

/// Stable digest of a request body, used to detect idempotency key reuse
pub fn fingerprint(request: &DonationRequest) -> Result<String> {
    let bytes = serde_json::to_vec(request)
        .map_err(|e| PaymentError::InvalidRequest(format!("unserializable request: {e}")))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use donate_core::wire::DonorMetadata;

    fn request(amount: serde_json::Number) -> DonationRequest {
        DonationRequest {
            fund: "general".into(),
            frequency: Frequency::Monthly,
            amount,
            currency: "USD".into(),
            metadata: DonorMetadata {
                first_name: "Jane".into(),
                last_name: "Doe".into(),
                email: "jane@x.com".into(),
            },
        }
    }

    #[test]
    fn test_major_units_request() {
        let donation =
            Donation::from_request(&request(100.into()), AmountUnits::Major).unwrap();
        assert_eq!(donation.amount_minor, 10_000);
        assert_eq!(donation.currency, "usd");
        assert_eq!(donation.description(), "Monthly donation to general");
        assert_eq!(donation.metadata()["frequency"], "monthly");
    }

    #[test]
    fn test_minor_units_request() {
        let donation =
            Donation::from_request(&request(2_500.into()), AmountUnits::Minor).unwrap();
        assert_eq!(donation.amount, Decimal::from(25));
        assert_eq!(donation.amount_minor, 2_500);
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let err = Donation::from_request(&request(0.into()), AmountUnits::Major).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));

        let err = Donation::from_request(&request((-5).into()), AmountUnits::Major).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
    }

    #[test]
    fn test_rejects_amount_below_one_cent() {
        let tiny = serde_json::Number::from_f64(0.001).unwrap();
        let err = Donation::from_request(&request(tiny), AmountUnits::Major).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
        assert_eq!(err.code(), "INVALID_DONATION");
    }

    #[test]
    fn test_rejects_invalid_donor() {
        let mut body = request(50.into());
        body.metadata.email = "foo".into();
        let err = Donation::from_request(&body, AmountUnits::Major).unwrap_err();
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn test_rejects_unknown_currency() {
        let mut body = request(50.into());
        body.currency = "xyz".into();
        assert!(Donation::from_request(&body, AmountUnits::Major).is_err());
    }

    #[test]
    fn test_fingerprint_tracks_body() {
        let a = fingerprint(&request(50.into())).unwrap();
        let b = fingerprint(&request(50.into())).unwrap();
        let c = fingerprint(&request(51.into())).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
