//! Donor Form Validation
//!
//! Stateless checks over the donor fields. Rendering the result is the
//! caller's job.

use serde::{Deserialize, Serialize};

use crate::model::DonorForm;

/// Per-field pass/fail flags. `true` means the field has an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub first_name: bool,
    pub last_name: bool,
    pub email: bool,
}

impl ValidationReport {
    pub const fn is_valid(&self) -> bool {
        !(self.first_name || self.last_name || self.email)
    }

    /// Names of the failing fields, in form order
    pub fn failing_fields(&self) -> Vec<&'static str> {
        [
            (self.first_name, "firstName"),
            (self.last_name, "lastName"),
            (self.email, "email"),
        ]
        .into_iter()
        .filter_map(|(failed, name)| failed.then_some(name))
        .collect()
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            f.write_str("all fields valid")
        } else {
            write!(f, "invalid fields: {}", self.failing_fields().join(", "))
        }
    }
}

/// Validate the donor fields.
///
/// First name, last name and email must be non-empty after trimming, and a
/// non-empty email must look like `local@domain.tld`.
pub fn validate_donor(form: &DonorForm) -> ValidationReport {
    let email = form.email.trim();
    ValidationReport {
        first_name: form.first_name.trim().is_empty(),
        last_name: form.last_name.trim().is_empty(),
        email: email.is_empty() || !is_email_shaped(email),
    }
}

/// Shape check equivalent to `^[^\s@]+@[^\s@]+\.[^\s@]+$`.
pub fn is_email_shaped(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.chars().any(char::is_whitespace) {
        return false;
    }
    if domain.contains('@') || domain.chars().any(char::is_whitespace) {
        return false;
    }
    // Needs a dot with something on both sides; any dot will do
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(first: &str, last: &str, email: &str) -> DonorForm {
        DonorForm {
            first_name: first.into(),
            last_name: last.into(),
            email: email.into(),
            designation: String::new(),
        }
    }

    #[test]
    fn test_valid_donor() {
        let report = validate_donor(&form("Jane", "Doe", "jane@x.com"));
        assert!(report.is_valid());
    }

    #[test]
    fn test_all_fields_required() {
        let report = validate_donor(&form("", "  ", ""));
        assert!(report.first_name);
        assert!(report.last_name);
        assert!(report.email);
        assert_eq!(report.failing_fields(), vec!["firstName", "lastName", "email"]);
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_email_shaped("jane@x.com"));
        assert!(is_email_shaped("jane.doe+gifts@mail.example.org"));
        assert!(is_email_shaped("a@b.c.d"));
        assert!(!is_email_shaped("foo"));
        assert!(!is_email_shaped("foo@bar"));
        assert!(!is_email_shaped("@x.com"));
        assert!(!is_email_shaped("jane@.com"));
        assert!(!is_email_shaped("jane@x."));
        assert!(!is_email_shaped("ja ne@x.com"));
        assert!(!is_email_shaped("jane@x@y.com"));
    }

    #[test]
    fn test_invalid_email_only_flags_email() {
        let report = validate_donor(&form("Jane", "Doe", "foo"));
        assert!(!report.first_name && !report.last_name);
        assert!(report.email);
    }
}
