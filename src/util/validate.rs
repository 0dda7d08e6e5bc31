//! Credential input validation for the auth forms.

#[cfg(test)]
#[path = "validate_test.rs"]
mod validate_test;

/// Minimum password length the provider accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Loose email-shape check: something before `@`, a dot somewhere in the
/// domain. The provider performs the authoritative validation.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if local.contains(char::is_whitespace) || domain.contains(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !domain.contains('@')
}

/// Validate sign-in/sign-up credentials, returning trimmed email on success.
///
/// # Errors
///
/// Returns the message to render inline next to the form.
pub fn validate_credentials(email: &str, password: &str) -> Result<String, &'static str> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required.");
    }
    if !is_valid_email(email) {
        return Err("Please enter a valid email address.");
    }
    if password.is_empty() {
        return Err("Password is required.");
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 6 characters.");
    }
    Ok(email.to_owned())
}
