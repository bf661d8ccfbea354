//! Donation Backend Wire Types
//!
//! JSON contract for `POST <backend-url>`:
//!
//! ```text
//! Idempotency-Key: don_1718000000000_9f2c4e1ab0
//! {"fund":"general","frequency":"monthly","amount":100,"currency":"usd",
//!  "metadata":{"firstName":"Jane","lastName":"Doe","email":"jane@x.com"}}
//!
//! 200 {"clientSecret":"pi_..._secret_..."}
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DonateError, Result};
use crate::model::{AmountUnits, DonorForm, Frequency};

/// Header carrying the idempotency key
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Caller-generated key so a retried submission is not charged twice
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Generate `don_<unix-millis>_<random>`
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("don_{millis}_{}", &random[..12]))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-time token authorizing confirmation of a specific payment.
///
/// `Debug` is redacted so secrets never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ClientSecret(..)")
    }
}

/// Donor metadata block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorMetadata {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Body of the create-payment-intent request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DonationRequest {
    pub fund: String,
    pub frequency: Frequency,

    /// Amount in the configured [`AmountUnits`]
    pub amount: serde_json::Number,

    pub currency: String,
    pub metadata: DonorMetadata,
}

impl DonationRequest {
    /// Build the request body from the validated form
    pub fn new(
        form: &DonorForm,
        frequency: Frequency,
        amount: Decimal,
        currency: &str,
        units: AmountUnits,
    ) -> Result<Self> {
        Ok(Self {
            fund: form.fund().to_string(),
            frequency,
            amount: encode_amount(amount, units)?,
            currency: currency.to_lowercase(),
            metadata: DonorMetadata {
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                email: form.email.trim().to_string(),
            },
        })
    }

    /// Read the amount back as currency units
    pub fn amount_major(&self, units: AmountUnits) -> Result<Decimal> {
        decode_amount(&self.amount, units)
    }
}

/// Successful backend response
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub client_secret: ClientSecret,
}

/// Error body returned by the reference backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Encode an amount for the wire.
///
/// Whole major amounts are sent as integers (`250`, not `250.0`).
pub fn encode_amount(amount: Decimal, units: AmountUnits) -> Result<serde_json::Number> {
    let overflow = || DonateError::Config(format!("amount out of range: {amount}"));
    match units {
        AmountUnits::Minor => amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.round().to_i64())
            .map(serde_json::Number::from)
            .ok_or_else(overflow),
        AmountUnits::Major if amount.fract().is_zero() => {
            amount.to_i64().map(serde_json::Number::from).ok_or_else(overflow)
        }
        AmountUnits::Major => amount
            .round_dp(2)
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .ok_or_else(overflow),
    }
}

/// Decode a wire amount into currency units
pub fn decode_amount(number: &serde_json::Number, units: AmountUnits) -> Result<Decimal> {
    let value: Decimal = number
        .to_string()
        .parse()
        .map_err(|_| DonateError::MalformedResponse(format!("not a decimal amount: {number}")))?;
    match units {
        AmountUnits::Major => Ok(value),
        AmountUnits::Minor if value.fract().is_zero() => Ok(value / Decimal::ONE_HUNDRED),
        AmountUnits::Minor => Err(DonateError::MalformedResponse(format!(
            "minor-unit amount must be whole: {number}"
        ))),
    }
}

/// Convert currency units to the provider's smallest unit
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.round().to_i64())
        .ok_or_else(|| DonateError::Config(format!("amount out of range: {amount}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn jane() -> DonorForm {
        DonorForm {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: "jane@x.com".into(),
            designation: String::new(),
        }
    }

    #[test]
    fn test_request_json_shape() {
        let request =
            DonationRequest::new(&jane(), Frequency::Monthly, dec!(100), "USD", AmountUnits::Major)
                .unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "fund": "general",
                "frequency": "monthly",
                "amount": 100,
                "currency": "usd",
                "metadata": {"firstName": "Jane", "lastName": "Doe", "email": "jane@x.com"}
            })
        );
    }

    #[test]
    fn test_amount_units() {
        assert_eq!(encode_amount(dec!(250), AmountUnits::Minor).unwrap().as_i64(), Some(25000));
        assert_eq!(encode_amount(dec!(12.5), AmountUnits::Major).unwrap().as_f64(), Some(12.5));

        let cents = serde_json::Number::from(1999);
        assert_eq!(decode_amount(&cents, AmountUnits::Minor).unwrap(), dec!(19.99));
        assert!(decode_amount(&serde_json::Number::from_f64(1.5).unwrap(), AmountUnits::Minor).is_err());
        assert_eq!(to_minor_units(dec!(12.5)).unwrap(), 1250);
    }

    #[test]
    fn test_huge_amount_is_an_error_not_a_panic() {
        let huge = crate::model::parse_custom_amount("79228162514264337593543950335").unwrap();
        assert!(matches!(
            encode_amount(huge, AmountUnits::Minor),
            Err(DonateError::Config(_))
        ));
        assert!(matches!(to_minor_units(huge), Err(DonateError::Config(_))));
        assert!(encode_amount(huge, AmountUnits::Major).is_err());

        // Fits in Decimal but not in i64 cents
        assert!(to_minor_units(dec!(100000000000000000)).is_err());
    }

    #[test]
    fn test_idempotency_key_shape() {
        let key = IdempotencyKey::generate();
        let parts: Vec<_> = key.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "don");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 12);
        assert_ne!(key, IdempotencyKey::generate());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = ClientSecret::new("pi_123_secret_abc");
        assert!(!format!("{secret:?}").contains("abc"));
    }

    #[test]
    fn test_intent_response_parses_camel_case() {
        let parsed: IntentResponse = serde_json::from_str(r#"{"clientSecret":"cs_test_1"}"#).unwrap();
        assert_eq!(parsed.client_secret.expose(), "cs_test_1");
    }
}
