//! Session controller: owns the state signal and drives auth transitions.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `Session` is constructed at application start, provided to the UI
//! tree via context, started at mount, and shut down at unmount. The
//! provider invokes `on_auth_event` synchronously from inside its own
//! dispatch, so the transition path never awaits; profile work is spawned
//! through the `Spawner` seam and checked against the session epoch when it
//! settles.
//!
//! ERROR HANDLING
//! ==============
//! The public operations return `Result<_, SessionError>` and never panic
//! across the boundary; background work swallows its own failures (see
//! `materializer`) so the critical path is never blocked by enrichment.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use leptos::prelude::GetUntracked;
use leptos::prelude::LocalStorage;
use leptos::prelude::RwSignal;
use leptos::prelude::StoredValue;
use leptos::prelude::Update;

use crate::net::gateway::{AuthChangeHandler, AuthSubscription, Gateway};
use crate::net::types::{Identity, IdentityMetadata, Profile, ProfileUpdate};
use crate::session::bootstrap;
use crate::session::error::SessionError;
use crate::session::state::{self, SessionState, still_current};

/// Fire-and-forget task seam. The browser build plugs in
/// `leptos::task::spawn_local`; native tests plug in a pool they drive by
/// hand to pin down interleavings.
pub type Spawner = Rc<dyn Fn(LocalBoxFuture<'static, ()>)>;

/// Context handle for the controller. `Session` holds `Rc`s, so the value
/// itself lives in thread-local storage and this `Copy` handle is what
/// travels through context and into event handlers.
pub type SessionContext = StoredValue<Session, LocalStorage>;

/// The session lifecycle controller, cloned into pages via context.
#[derive(Clone)]
pub struct Session {
    state: RwSignal<SessionState>,
    gateway: Rc<dyn Gateway>,
    spawner: Spawner,
    subscription: Rc<RefCell<Option<AuthSubscription>>>,
}

impl Session {
    #[must_use]
    pub fn new(gateway: Rc<dyn Gateway>, spawner: Spawner) -> Self {
        Self {
            state: RwSignal::new(SessionState::new()),
            gateway,
            spawner,
            subscription: Rc::new(RefCell::new(None)),
        }
    }

    /// Reactive handle consumed by guards and pages.
    #[must_use]
    pub fn state(&self) -> RwSignal<SessionState> {
        self.state
    }

    /// Move this controller into thread-local storage for context use.
    #[must_use]
    pub fn into_context(self) -> SessionContext {
        StoredValue::new_local(self)
    }

    pub(crate) fn gateway(&self) -> &Rc<dyn Gateway> {
        &self.gateway
    }

    fn spawn(&self, fut: impl Future<Output = ()> + 'static) {
        (self.spawner)(Box::pin(fut));
    }

    /// Begin the session lifecycle: complete any pending OAuth redirect,
    /// register the provider subscription, then resolve the initial session
    /// into the first transition.
    pub fn start(&self) {
        let session = self.clone();
        self.spawn(async move {
            bootstrap::complete_redirect_login(&session).await;
            session.attach();
            let initial = match session.gateway.current_identity().await {
                Ok(identity) => identity,
                Err(err) => {
                    // Startup must not block on a flaky network; the user is
                    // treated as signed out until a later event says otherwise.
                    log::warn!("initial session query failed: {err}");
                    None
                }
            };
            session.on_auth_event(initial);
        });
    }

    /// Register the synchronous transition handler with the provider.
    pub fn attach(&self) {
        let session = self.clone();
        let handler: AuthChangeHandler = Rc::new(move |identity| session.on_auth_event(identity));
        let subscription = self.gateway.on_auth_change(handler);
        *self.subscription.borrow_mut() = Some(subscription);
    }

    /// Release the provider subscription when the owning UI tree unmounts.
    pub fn shutdown(&self) {
        if let Some(subscription) = self.subscription.borrow_mut().take() {
            subscription.unsubscribe();
        }
    }

    /// Transition handler. MUST stay synchronous: the provider calls it
    /// from inside its own dispatch, so it only mutates state and schedules
    /// profile work, tagged with the new epoch, for later.
    pub fn on_auth_event(&self, identity: Option<Identity>) {
        let mut schedule = false;
        self.state.update(|state| {
            schedule = state::apply_auth_event(state, identity);
        });
        if !schedule {
            return;
        }
        let snapshot = self.state.get_untracked();
        let epoch = snapshot.epoch;
        let Some(identity) = snapshot.identity else {
            return;
        };
        let loader = self.clone();
        let loader_id = identity.id.clone();
        self.spawn(async move {
            loader.load_profile(&loader_id, epoch).await;
        });
        let ensurer = self.clone();
        self.spawn(async move {
            ensurer.ensure_profile_exists(&identity, epoch).await;
        });
    }

    /// Password sign-in. The provider emits the auth event that drives the
    /// transition; the extra ensure here covers first-login-after-sign-up,
    /// where the backend's provisioning trigger may still be lagging.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let identity = self.gateway.sign_in(email, password).await?;
        self.schedule_ensure(&identity);
        Ok(identity)
    }

    /// Register a new identity, pointing the confirmation email back at the
    /// same-origin login route.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: IdentityMetadata,
    ) -> Result<Identity, SessionError> {
        let redirect = login_redirect_url();
        let identity = self
            .gateway
            .sign_up(email, password, &metadata, &redirect)
            .await?;
        self.schedule_ensure(&identity);
        Ok(identity)
    }

    /// Revoke the provider session. On success local identity and profile
    /// are cleared synchronously; the provider also emits the signed-out
    /// event, and the transition is idempotent under the double application.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.gateway.sign_out().await?;
        self.on_auth_event(None);
        Ok(())
    }

    /// Persist a partial profile update for the signed-in user and replace
    /// the in-memory profile with the persisted row.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile, SessionError> {
        let snapshot = self.state.get_untracked();
        let Some(identity) = snapshot.identity else {
            return Err(SessionError::NoSession);
        };
        let epoch = snapshot.epoch;
        let updated = self.gateway.update_profile(&identity.id, &update).await?;
        self.state.update(|state| {
            if still_current(state, &identity.id, epoch) {
                state.profile = Some(updated.clone());
            }
        });
        Ok(updated)
    }

    /// Ask the provider to send a password-reset email landing on `/login`.
    pub async fn reset_password(&self, email: &str) -> Result<(), SessionError> {
        let redirect = login_redirect_url();
        self.gateway.reset_password(email, &redirect).await?;
        Ok(())
    }

    fn schedule_ensure(&self, identity: &Identity) {
        let epoch = self.state.get_untracked().epoch;
        let session = self.clone();
        let identity = identity.clone();
        self.spawn(async move {
            session.ensure_profile_exists(&identity, epoch).await;
        });
    }
}

/// Confirmation and recovery emails land back on the login route of the
/// same origin.
fn login_redirect_url() -> String {
    #[cfg(feature = "csr")]
    {
        if let Some(window) = web_sys::window() {
            if let Ok(origin) = window.location().origin() {
                return format!("{origin}/login");
            }
        }
    }
    "/login".to_owned()
}
