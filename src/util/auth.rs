//! Shared auth routing helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route components should apply identical redirect behavior: protected
//! routes bounce anonymous users to `/login`, the login route bounces
//! signed-in users to the dashboard, and nobody redirects while the initial
//! session resolution is still pending.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use leptos::prelude::*;
use leptos_router::NavigateOptions;

use crate::session::state::SessionState;

/// True when a protected route should send the visitor to the login page.
#[must_use]
pub fn should_redirect_unauth(state: &SessionState) -> bool {
    !state.session_loading && state.identity.is_none()
}

/// True when the login route should send the visitor to the dashboard.
#[must_use]
pub fn should_redirect_authed(state: &SessionState) -> bool {
    !state.session_loading && state.identity.is_some()
}

/// Redirect to `/login` whenever the session has resolved with no identity.
pub fn install_unauth_redirect<F>(state: RwSignal<SessionState>, navigate: F)
where
    F: Fn(&str, NavigateOptions) + Clone + 'static,
{
    let navigate = navigate.clone();
    Effect::new(move || {
        if should_redirect_unauth(&state.get()) {
            navigate("/login", NavigateOptions::default());
        }
    });
}

/// Redirect to the dashboard whenever a signed-in user lands on login.
pub fn install_authed_redirect<F>(state: RwSignal<SessionState>, navigate: F)
where
    F: Fn(&str, NavigateOptions) + Clone + 'static,
{
    let navigate = navigate.clone();
    Effect::new(move || {
        if should_redirect_authed(&state.get()) {
            navigate("/alumni-dashboard", NavigateOptions::default());
        }
    });
}
