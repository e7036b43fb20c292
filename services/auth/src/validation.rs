//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate the stated reason for an OTP request
pub fn validate_otp_reason(reason: &str) -> Result<(), String> {
    let len = reason.chars().count();
    if !(3..=50).contains(&len) {
        return Err("Reason must be between 3 and 50 characters long".to_string());
    }
    Ok(())
}

/// Validate a submitted OTP code
pub fn validate_otp_code(code: &str) -> Result<(), String> {
    let len = code.chars().count();
    if !(4..=10).contains(&len) {
        return Err("Code must be between 4 and 10 characters long".to_string());
    }
    Ok(())
}
