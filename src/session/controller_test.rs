use super::*;

use futures::channel::oneshot;

use crate::net::gateway::GatewayError;
use crate::session::testing::{FetchReply, MockGateway, identity, profile_row, session_with};

#[test]
fn start_resolves_unauthenticated_session() {
    let gateway = MockGateway::new();
    let (session, mut pool) = session_with(gateway.clone());

    session.start();
    assert!(session.state().get_untracked().session_loading);

    pool.run_until_stalled();
    let state = session.state().get_untracked();
    assert!(!state.session_loading);
    assert_eq!(state.identity, None);
    assert_eq!(gateway.call_count("current"), 1);
}

#[test]
fn start_resolves_existing_session_and_loads_profile() {
    let gateway = MockGateway::new();
    gateway.seed_profile(profile_row("u-1", "Asha Verma"));
    *gateway.current.borrow_mut() = Some(Ok(Some(identity("u-1", "asha@example.com"))));
    let (session, mut pool) = session_with(gateway.clone());

    session.start();
    pool.run_until_stalled();

    let state = session.state().get_untracked();
    assert!(!state.session_loading);
    assert!(state.is_authenticated());
    assert_eq!(state.profile.as_ref().map(|p| p.full_name.as_str()), Some("Asha Verma"));
    assert!(!state.profile_loading);
    // The row existed, so the safety net never wrote.
    assert_eq!(gateway.call_count("upsert"), 0);
}

#[test]
fn start_survives_a_failing_initial_query() {
    let gateway = MockGateway::new();
    *gateway.current.borrow_mut() = Some(Err(GatewayError::Network("offline".to_owned())));
    let (session, mut pool) = session_with(gateway);

    session.start();
    pool.run_until_stalled();

    let state = session.state().get_untracked();
    assert!(!state.session_loading);
    assert_eq!(state.identity, None);
}

#[test]
fn transition_returns_before_scheduled_profile_work_runs() {
    let gateway = MockGateway::new();
    let (sender, receiver) = oneshot::channel();
    gateway.fetch_script.borrow_mut().push_back(FetchReply::Gated(receiver));
    gateway.exists_script.borrow_mut().push_back(Ok(true));
    let (session, mut pool) = session_with(gateway.clone());

    session.on_auth_event(Some(identity("u-1", "asha@example.com")));

    // Synchronous effects only: loading resolved, identity stored, and the
    // profile fetch has not even started yet.
    let state = session.state().get_untracked();
    assert!(!state.session_loading);
    assert!(state.is_authenticated());
    assert!(!state.profile_loading);
    assert_eq!(gateway.call_count("fetch"), 0);

    pool.run_until_stalled();
    assert!(session.state().get_untracked().profile_loading);

    sender
        .send(Ok(Some(profile_row("u-1", "Asha Verma"))))
        .expect("resolve gated fetch");
    pool.run_until_stalled();

    let state = session.state().get_untracked();
    assert!(!state.profile_loading);
    assert_eq!(state.profile.as_ref().map(|p| p.id.as_str()), Some("u-1"));
}

#[test]
fn stale_load_is_discarded_when_identity_changes() {
    let gateway = MockGateway::new();
    let (sender_a, receiver_a) = oneshot::channel();
    gateway.fetch_script.borrow_mut().push_back(FetchReply::Gated(receiver_a));
    gateway.exists_script.borrow_mut().push_back(Ok(true));
    gateway
        .fetch_script
        .borrow_mut()
        .push_back(FetchReply::Ready(Ok(Some(profile_row("u-b", "Bela")))));
    gateway.exists_script.borrow_mut().push_back(Ok(true));
    let (session, mut pool) = session_with(gateway);

    session.on_auth_event(Some(identity("u-a", "a@example.com")));
    pool.run_until_stalled();

    session.on_auth_event(Some(identity("u-b", "b@example.com")));
    pool.run_until_stalled();
    assert_eq!(
        session.state().get_untracked().profile.as_ref().map(|p| p.id.as_str()),
        Some("u-b")
    );

    // The first identity's fetch settles late; its result must be dropped.
    sender_a
        .send(Ok(Some(profile_row("u-a", "Abhay"))))
        .expect("resolve gated fetch");
    pool.run_until_stalled();

    let state = session.state().get_untracked();
    assert_eq!(state.profile.as_ref().map(|p| p.id.as_str()), Some("u-b"));
    assert!(!state.profile_loading);
}

#[test]
fn sign_out_discards_a_load_still_in_flight() {
    let gateway = MockGateway::new();
    let (sender, receiver) = oneshot::channel();
    gateway.fetch_script.borrow_mut().push_back(FetchReply::Gated(receiver));
    gateway.exists_script.borrow_mut().push_back(Ok(true));
    let (session, mut pool) = session_with(gateway);

    session.on_auth_event(Some(identity("u-1", "asha@example.com")));
    pool.run_until_stalled();
    assert!(session.state().get_untracked().profile_loading);

    let result = pool.run_until(session.sign_out());
    assert_eq!(result, Ok(()));

    let state = session.state().get_untracked();
    assert_eq!(state.identity, None);
    assert_eq!(state.profile, None);
    assert!(!state.profile_loading);

    sender
        .send(Ok(Some(profile_row("u-1", "Asha Verma"))))
        .expect("resolve gated fetch");
    pool.run_until_stalled();

    let state = session.state().get_untracked();
    assert_eq!(state.profile, None);
    assert!(!state.profile_loading);
}

#[test]
fn update_profile_without_a_session_makes_no_network_calls() {
    let gateway = MockGateway::new();
    let (session, mut pool) = session_with(gateway.clone());

    let result = pool.run_until(session.update_profile(crate::net::types::ProfileUpdate {
        company: Some("Acme".to_owned()),
        ..Default::default()
    }));

    assert_eq!(result, Err(SessionError::NoSession));
    assert!(gateway.calls().is_empty());
}

#[test]
fn failed_sign_in_schedules_no_profile_work() {
    let gateway = MockGateway::new();
    *gateway.sign_in_result.borrow_mut() = Some(Err(GatewayError::Rejected {
        status: 400,
        message: "Invalid login credentials".to_owned(),
    }));
    let (session, mut pool) = session_with(gateway.clone());

    // Initial resolution already happened; a failed sign-in must not
    // disturb it.
    session.on_auth_event(None);

    let result = pool.run_until(session.sign_in("asha@example.com", "wrong"));
    assert_eq!(
        result,
        Err(SessionError::Provider("Invalid login credentials".to_owned()))
    );

    pool.run_until_stalled();
    let state = session.state().get_untracked();
    assert_eq!(state.identity, None);
    assert!(!state.session_loading);
    assert_eq!(gateway.calls(), vec!["sign_in:asha@example.com".to_owned()]);
}

#[test]
fn successful_sign_in_transitions_synchronously_via_the_provider_event() {
    let gateway = MockGateway::new();
    gateway.seed_profile(profile_row("u-1", "Asha Verma"));
    *gateway.sign_in_result.borrow_mut() = Some(Ok(identity("u-1", "asha@example.com")));
    let (session, mut pool) = session_with(gateway.clone());

    session.attach();
    let result = pool.run_until(session.sign_in("asha@example.com", "Secret123"));
    assert!(result.is_ok());
    // The provider emitted the event inside sign_in, so identity is already
    // present before any background work ran.
    assert!(session.state().get_untracked().is_authenticated());

    pool.run_until_stalled();
    let state = session.state().get_untracked();
    assert_eq!(state.profile.as_ref().map(|p| p.full_name.as_str()), Some("Asha Verma"));
    assert_eq!(gateway.profiles.borrow().len(), 1);
}

#[test]
fn repeated_events_for_the_same_identity_stay_idempotent() {
    let gateway = MockGateway::new();
    gateway.seed_profile(profile_row("u-1", "Asha Verma"));
    let (session, mut pool) = session_with(gateway.clone());

    session.on_auth_event(Some(identity("u-1", "asha@example.com")));
    session.on_auth_event(Some(identity("u-1", "asha@example.com")));
    pool.run_until_stalled();

    let state = session.state().get_untracked();
    assert!(state.is_authenticated());
    assert_eq!(state.epoch, 2);
    assert_eq!(state.profile.as_ref().map(|p| p.id.as_str()), Some("u-1"));
    assert!(!state.profile_loading);
    assert_eq!(gateway.profiles.borrow().len(), 1);
    assert_eq!(gateway.call_count("upsert"), 0);
}

#[test]
fn update_profile_replaces_the_in_memory_row() {
    let gateway = MockGateway::new();
    gateway.seed_profile(profile_row("u-1", "Asha Verma"));
    let (session, mut pool) = session_with(gateway);

    session.on_auth_event(Some(identity("u-1", "asha@example.com")));
    pool.run_until_stalled();

    let result = pool.run_until(session.update_profile(crate::net::types::ProfileUpdate {
        company: Some("Acme".to_owned()),
        current_position: Some("Engineer".to_owned()),
        ..Default::default()
    }));

    let updated = result.expect("update succeeds");
    assert_eq!(updated.company.as_deref(), Some("Acme"));

    let state = session.state().get_untracked();
    assert_eq!(
        state.profile.as_ref().and_then(|p| p.company.as_deref()),
        Some("Acme")
    );
    assert_eq!(
        state.profile.as_ref().and_then(|p| p.current_position.as_deref()),
        Some("Engineer")
    );
}

#[test]
fn failed_update_leaves_the_displayed_profile_unchanged() {
    let gateway = MockGateway::new();
    gateway.seed_profile(profile_row("u-1", "Asha Verma"));
    let (session, mut pool) = session_with(gateway.clone());

    session.on_auth_event(Some(identity("u-1", "asha@example.com")));
    pool.run_until_stalled();

    // The row vanishes server-side before the update lands.
    gateway.profiles.borrow_mut().clear();
    let result = pool.run_until(session.update_profile(crate::net::types::ProfileUpdate {
        company: Some("Acme".to_owned()),
        ..Default::default()
    }));

    assert!(matches!(result, Err(SessionError::Provider(_))));
    let state = session.state().get_untracked();
    assert_eq!(
        state.profile.as_ref().map(|p| p.full_name.as_str()),
        Some("Asha Verma")
    );
}

#[test]
fn shutdown_detaches_the_provider_subscription() {
    let gateway = MockGateway::new();
    let (session, mut pool) = session_with(gateway.clone());

    session.attach();
    gateway.notify(Some(identity("u-1", "asha@example.com")));
    assert!(session.state().get_untracked().is_authenticated());
    pool.run_until_stalled();

    session.shutdown();
    gateway.notify(None);
    // The handler is gone; the event no longer reaches the state machine.
    assert!(session.state().get_untracked().is_authenticated());
}

#[test]
fn reset_password_points_the_email_at_the_login_route() {
    let gateway = MockGateway::new();
    let (session, mut pool) = session_with(gateway.clone());

    let result = pool.run_until(session.reset_password("asha@example.com"));
    assert_eq!(result, Ok(()));
    assert_eq!(gateway.calls(), vec!["reset:asha@example.com:/login".to_owned()]);
}

#[test]
fn sign_up_points_the_confirmation_email_at_the_login_route() {
    let gateway = MockGateway::new();
    *gateway.sign_up_result.borrow_mut() = Some(Ok(identity("u-9", "new@example.com")));
    let (session, mut pool) = session_with(gateway.clone());

    let result = pool.run_until(session.sign_up(
        "new@example.com",
        "Secret123",
        crate::net::types::IdentityMetadata::default(),
    ));

    assert!(result.is_ok());
    assert_eq!(gateway.call_count("sign_up:new@example.com:/login"), 1);
}
