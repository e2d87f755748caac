// Email address syntax validation.
//
// Accepts the common `local@domain.tld` shape: an RFC 5322 dot-atom local
// part and a DNS-style domain with at least one dot. Quoted local parts
// and IP-literal domains are rejected.

use thiserror::Error;
use tracing::debug;

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

// Why an address was rejected. Only used for logging, clients always see
// the same message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("email is missing or empty")]
    Empty,

    #[error("email is longer than 254 bytes")]
    TooLong,

    #[error("email contains whitespace")]
    Whitespace,

    #[error("email must contain exactly one '@'")]
    AtSign,

    #[error("invalid local part: {0}")]
    LocalPart(&'static str),

    #[error("invalid domain: {0}")]
    Domain(&'static str),
}

// Validate an optional email field from a request body.
pub fn validate_optional(email: Option<&str>) -> Result<&str, ValidationError> {
    let email = email.ok_or(ValidationError::Empty)?;
    validate_email(email)?;
    Ok(email)
}

// Check that `email` is a syntactically valid address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let result = check(email);
    if let Err(err) = &result {
        debug!(error = %err, "Email rejected");
    }
    result
}

fn check(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    if email.len() > MAX_ADDRESS_LEN {
        return Err(ValidationError::TooLong);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::Whitespace);
    }

    let (local, domain) = email.split_once('@').ok_or(ValidationError::AtSign)?;
    if domain.contains('@') {
        return Err(ValidationError::AtSign);
    }

    check_local(local)?;
    check_domain(domain)
}

fn check_local(local: &str) -> Result<(), ValidationError> {
    if local.is_empty() {
        return Err(ValidationError::LocalPart("empty"));
    }
    if local.len() > MAX_LOCAL_LEN {
        return Err(ValidationError::LocalPart("too long"));
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(ValidationError::LocalPart("misplaced dot"));
    }
    if !local.chars().all(is_atom_char) {
        return Err(ValidationError::LocalPart("illegal character"));
    }
    Ok(())
}

fn check_domain(domain: &str) -> Result<(), ValidationError> {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(ValidationError::Domain("missing dot"));
    }

    for label in &labels {
        if label.is_empty() {
            return Err(ValidationError::Domain("empty label"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(ValidationError::Domain("label edge hyphen"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ValidationError::Domain("illegal character"));
        }
    }

    // labels is non-empty, checked above
    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || tld.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::Domain("bad top-level label"));
    }
    Ok(())
}

fn is_atom_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || "!#$%&'*+/=?^_`{|}~-".contains(c)
}
