use super::*;
use crate::net::types::{IdentityMetadata, Role};

fn identity(id: &str, email: &str) -> Identity {
    Identity {
        id: id.to_owned(),
        email: Some(email.to_owned()),
        metadata: IdentityMetadata::default(),
    }
}

fn profile(id: &str, full_name: &str) -> Profile {
    Profile {
        id: id.to_owned(),
        email: Some("profile@example.com".to_owned()),
        full_name: full_name.to_owned(),
        role: Role::Alumni,
        current_position: None,
        company: None,
        department: None,
        graduation_year: None,
        location: None,
        bio: None,
        is_active: true,
    }
}

#[test]
fn initial_state_is_loading_and_anonymous() {
    let state = SessionState::new();
    assert!(state.session_loading);
    assert!(!state.profile_loading);
    assert!(!state.is_authenticated());
    assert_eq!(state.epoch, 0);
}

#[test]
fn signed_in_event_stores_identity_and_requests_profile_work() {
    let mut state = SessionState::new();
    let schedule = apply_auth_event(&mut state, Some(identity("u-1", "a@b.com")));

    assert!(schedule);
    assert!(!state.session_loading);
    assert!(state.is_authenticated());
    assert_eq!(state.epoch, 1);
    // Profile loading is owned by the scheduled work, not the transition.
    assert!(!state.profile_loading);
}

#[test]
fn signed_out_event_clears_profile_synchronously() {
    let mut state = SessionState::new();
    apply_auth_event(&mut state, Some(identity("u-1", "a@b.com")));
    state.profile = Some(profile("u-1", "Asha"));
    state.profile_loading = true;

    let schedule = apply_auth_event(&mut state, None);

    assert!(!schedule);
    assert_eq!(state.identity, None);
    assert_eq!(state.profile, None);
    assert!(!state.profile_loading);
    assert_eq!(state.epoch, 2);
}

#[test]
fn every_event_bumps_the_epoch_even_when_identity_repeats() {
    let mut state = SessionState::new();
    apply_auth_event(&mut state, Some(identity("u-1", "a@b.com")));
    apply_auth_event(&mut state, Some(identity("u-1", "a@b.com")));
    assert_eq!(state.epoch, 2);
    assert!(state.is_authenticated());
}

#[test]
fn still_current_requires_matching_epoch_and_identity() {
    let mut state = SessionState::new();
    apply_auth_event(&mut state, Some(identity("u-1", "a@b.com")));
    let epoch = state.epoch;

    assert!(still_current(&state, "u-1", epoch));
    assert!(!still_current(&state, "u-2", epoch));
    assert!(!still_current(&state, "u-1", epoch + 1));

    // A later event for the same identity still invalidates older work.
    apply_auth_event(&mut state, Some(identity("u-1", "a@b.com")));
    assert!(!still_current(&state, "u-1", epoch));

    apply_auth_event(&mut state, None);
    assert!(!still_current(&state, "u-1", state.epoch));
}

#[test]
fn display_name_prefers_profile_then_identity_then_literal() {
    let mut state = SessionState::new();
    assert_eq!(state.display_name(), "User");

    apply_auth_event(&mut state, Some(identity("u-1", "asha@example.com")));
    assert_eq!(state.display_name(), "asha");

    state.profile = Some(profile("u-1", "Asha Verma"));
    assert_eq!(state.display_name(), "Asha Verma");

    // A blank profile name degrades back to the identity-derived one.
    state.profile = Some(profile("u-1", "  "));
    assert_eq!(state.display_name(), "asha");
}

#[test]
fn display_email_prefers_profile_row() {
    let mut state = SessionState::new();
    assert_eq!(state.display_email(), None);

    apply_auth_event(&mut state, Some(identity("u-1", "asha@example.com")));
    assert_eq!(state.display_email().as_deref(), Some("asha@example.com"));

    state.profile = Some(profile("u-1", "Asha"));
    assert_eq!(state.display_email().as_deref(), Some("profile@example.com"));
}
