//! Request-body validation shared by the public handlers.

use crate::error::ApiError;

/// Minimal shape check; real deliverability is the mail system's problem.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let trimmed = email.trim();
    let valid = trimmed.len() >= 3
        && trimmed.contains('@')
        && !trimmed.starts_with('@')
        && !trimmed.ends_with('@');
    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request("A valid email address is required"))
    }
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 6 {
        return Err(ApiError::bad_request("Password must be at least 6 characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_emails() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@").is_err());
    }

    #[test]
    fn validates_passwords() {
        assert!(validate_password("hunter2").is_ok());
        assert!(validate_password("short").is_err());
    }
}
