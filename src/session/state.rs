//! Auth-session state for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards and user-aware pages read this through an
//! `RwSignal<SessionState>` provided via context; all writes go through the
//! `Session` controller, which applies the pure transition functions below
//! inside `signal.update`.

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

use crate::net::types::{Identity, Profile};

/// Lifecycle snapshot for the current session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    /// Identity from the provider; absent when signed out.
    pub identity: Option<Identity>,
    /// Application profile row for `identity`, once loaded.
    pub profile: Option<Profile>,
    /// True only until the first session resolution completes. Consumers
    /// must render a neutral loading state and not redirect while set.
    pub session_loading: bool,
    /// True while a profile fetch is in flight.
    pub profile_loading: bool,
    /// Session generation, bumped on every auth transition. In-flight
    /// profile work captures the value it was issued under and discards its
    /// result on mismatch, so a stale completion can never clobber the
    /// state of a newer sign-in.
    pub epoch: u64,
}

impl SessionState {
    /// Initial state at application start: resolving, nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_loading: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Name to greet the user with. Falls back to identity-derived fields
    /// whenever the profile has not materialized (yet, or at all), so a
    /// failed background load degrades the display instead of blocking it.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(profile) = &self.profile {
            if !profile.full_name.trim().is_empty() {
                return profile.full_name.clone();
            }
        }
        self.identity
            .as_ref()
            .map_or_else(|| "User".to_owned(), Identity::display_name)
    }

    /// Email to show alongside the name, preferring the profile row.
    #[must_use]
    pub fn display_email(&self) -> Option<String> {
        self.profile
            .as_ref()
            .and_then(|profile| profile.email.clone())
            .or_else(|| self.identity.as_ref().and_then(|identity| identity.email.clone()))
    }
}

/// Whether a completion issued for `identity_id` under `epoch` may still
/// publish into `state`. In-flight profile work is tagged with both when it
/// is scheduled; anything that settles after the session has moved on is
/// discarded instead of applied.
#[must_use]
pub fn still_current(state: &SessionState, identity_id: &str, epoch: u64) -> bool {
    state.epoch == epoch
        && state
            .identity
            .as_ref()
            .is_some_and(|identity| identity.id == identity_id)
}

/// Apply one provider auth event. Synchronous by contract: the provider
/// invokes the transition from inside its own dispatch, so this function
/// must only mutate fields and report whether profile work needs to be
/// scheduled by the caller.
pub fn apply_auth_event(state: &mut SessionState, identity: Option<Identity>) -> bool {
    state.epoch += 1;
    state.session_loading = false;
    match identity {
        Some(identity) => {
            state.identity = Some(identity);
            true
        }
        None => {
            state.identity = None;
            state.profile = None;
            state.profile_loading = false;
            false
        }
    }
}
