use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, ApiResult};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trim a required field, rejecting blank input.
pub(crate) fn required(field: &str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Normalized identifier: trimmed and lower-cased, as stored.
pub(crate) fn normalized(field: &str, value: &str) -> ApiResult<String> {
    Ok(required(field, value)?.to_lowercase())
}

pub(crate) fn check_password(password: &str) -> ApiResult<()> {
    if password.trim().is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

pub(crate) fn check_email(email: &str) -> ApiResult<()> {
    if !is_valid_email(email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_and_rejects() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@x.com"));
        assert!(!is_valid_email("spaces in@x.com"));
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("fullName", "  Alice  ").unwrap(), "Alice");
        assert!(required("fullName", "   ").is_err());
        assert!(required("fullName", "").is_err());
    }

    #[test]
    fn normalized_lower_cases() {
        assert_eq!(normalized("username", "  AlIcE ").unwrap(), "alice");
    }

    #[test]
    fn password_policy() {
        assert!(check_password("secret123").is_ok());
        assert!(check_password("short").is_err());
        assert!(check_password("  ").is_err());
    }
}
