use super::*;

#[test]
fn accepts_ordinary_addresses() {
    assert!(is_valid_email("asha@example.com"));
    assert!(is_valid_email("first.last@sub.example.co.in"));
}

#[test]
fn rejects_malformed_addresses() {
    assert!(!is_valid_email("plainaddress"));
    assert!(!is_valid_email("@example.com"));
    assert!(!is_valid_email("user@"));
    assert!(!is_valid_email("user@nodot"));
    assert!(!is_valid_email("user name@example.com"));
    assert!(!is_valid_email("user@exam ple.com"));
    assert!(!is_valid_email("user@example."));
}

#[test]
fn validate_credentials_trims_and_checks_in_order() {
    assert_eq!(
        validate_credentials("  asha@example.com  ", "Secret123"),
        Ok("asha@example.com".to_owned())
    );
    assert_eq!(validate_credentials("", "Secret123"), Err("Email is required."));
    assert_eq!(
        validate_credentials("not-an-email", "Secret123"),
        Err("Please enter a valid email address.")
    );
    assert_eq!(
        validate_credentials("asha@example.com", ""),
        Err("Password is required.")
    );
    assert_eq!(
        validate_credentials("asha@example.com", "short"),
        Err("Password must be at least 6 characters.")
    );
}

#[test]
fn six_character_password_is_accepted() {
    assert!(validate_credentials("asha@example.com", "abcdef").is_ok());
}
