//! Backend contract for the hosted identity and data provider.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session controller talks to the provider exclusively through this
//! trait, so native tests can substitute a scripted in-memory gateway for
//! the real backend. Handlers registered via `on_auth_change` are invoked
//! synchronously from inside the provider's own dispatch; the registered
//! callback must therefore never await.

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;

use std::rc::Rc;

use async_trait::async_trait;
use thiserror::Error;

use crate::net::types::{Identity, IdentityMetadata, NewProfile, Profile, ProfileUpdate};

/// Failures crossing the provider boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport-level failure; the request may not have reached the
    /// provider at all.
    #[error("network error: {0}")]
    Network(String),
    /// The provider received the request and rejected it.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Redirect artifacts an OAuth-style login can leave in the address bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedirectParams {
    /// Authorization-code flow: `?code=...` in the query string.
    Code(String),
    /// Implicit flow: `#access_token=...` in the fragment.
    Tokens {
        access_token: String,
        refresh_token: Option<String>,
    },
}

/// Callback invoked synchronously on every provider auth transition.
pub type AuthChangeHandler = Rc<dyn Fn(Option<Identity>)>;

/// Handle returned by [`Gateway::on_auth_change`]. Dropping it does not
/// detach the handler; call [`AuthSubscription::unsubscribe`].
pub struct AuthSubscription {
    cancel: Box<dyn FnOnce()>,
}

impl AuthSubscription {
    #[must_use]
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Detach the handler registered with [`Gateway::on_auth_change`].
    pub fn unsubscribe(self) {
        (self.cancel)();
    }
}

/// The identity and data surface the session core consumes.
///
/// Split conceptually in two: identity operations (`exchange_redirect`
/// through `reset_password`) and the profile-table operations keyed by
/// identity id. Implementations emit an auth event to registered handlers
/// after their own successful sign-in, sign-out, and redirect exchanges.
#[async_trait(?Send)]
pub trait Gateway {
    /// Complete a pending OAuth redirect described by `params`.
    async fn exchange_redirect(&self, params: &RedirectParams) -> Result<Identity, GatewayError>;

    /// Resolve the persisted session, if any. Used once at startup.
    async fn current_identity(&self) -> Result<Option<Identity>, GatewayError>;

    /// Register `handler` to run synchronously on every auth transition.
    fn on_auth_change(&self, handler: AuthChangeHandler) -> AuthSubscription;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, GatewayError>;

    /// Register a new identity. `email_redirect_to` is where the provider's
    /// confirmation email should land the user afterwards.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &IdentityMetadata,
        email_redirect_to: &str,
    ) -> Result<Identity, GatewayError>;

    async fn sign_out(&self) -> Result<(), GatewayError>;

    async fn reset_password(&self, email: &str, redirect_to: &str) -> Result<(), GatewayError>;

    /// Cheap existence probe for the profile row keyed by `identity_id`.
    async fn profile_exists(&self, identity_id: &str) -> Result<bool, GatewayError>;

    /// Insert-or-update keyed by id, so a racing provisioning trigger and
    /// this client converge on a single row.
    async fn upsert_profile(&self, row: &NewProfile) -> Result<Profile, GatewayError>;

    /// Fetch the profile row; `Ok(None)` when it does not exist yet.
    async fn fetch_profile(&self, identity_id: &str) -> Result<Option<Profile>, GatewayError>;

    async fn update_profile(
        &self,
        identity_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, GatewayError>;
}
