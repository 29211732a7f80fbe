//! Account input validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,20}$").expect("valid username regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Minimum password length.
pub const PASSWORD_MIN_LEN: usize = 8;

/// Signup form as submitted by the client.
#[derive(Debug, Clone)]
pub struct SignupInput<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub password: &'a str,
    pub confirm_password: Option<&'a str>,
}

/// 3-20 characters of letters, digits or underscore.
pub fn validate_username(username: &str) -> Result<()> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(Error::InvalidInput(
            "Username must be 3-20 characters of letters, numbers or underscores".to_string(),
        ))
    }
}

pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(Error::InvalidInput("Invalid email address".to_string()))
    }
}

/// At least 8 characters with an uppercase letter, a lowercase letter and a digit.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(Error::InvalidInput(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LEN
        )));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(Error::InvalidInput(
            "Password must contain at least one uppercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(Error::InvalidInput(
            "Password must contain at least one lowercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidInput(
            "Password must contain at least one number".to_string(),
        ));
    }
    Ok(())
}

/// Validate a full signup form. Returns the first problem found.
pub fn validate_signup(input: &SignupInput<'_>) -> Result<()> {
    validate_username(input.username)?;
    validate_email(input.email)?;
    if input.full_name.trim().is_empty() {
        return Err(Error::InvalidInput("Full name is required".to_string()));
    }
    validate_password(input.password)?;
    if let Some(confirm) = input.confirm_password {
        if confirm != input.password {
            return Err(Error::InvalidInput("Passwords do not match".to_string()));
        }
    }
    Ok(())
}
