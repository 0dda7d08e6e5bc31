//! Profile materialization: the client-side safety net that keeps the
//! profile table 1:1 with authenticated identities.
//!
//! The backend normally provisions a profile row through its own trigger
//! when an identity is created, but that trigger may not have run by the
//! time this client first asks. `ensure_profile_exists` closes the gap with
//! a keyed upsert, so a racing trigger and this client converge on one row.
//!
//! ERROR HANDLING
//! ==============
//! `ensure_profile_exists` is best-effort: every failure is logged and
//! swallowed, and the UI degrades to identity-derived display fields.
//! `load_profile` keeps previously loaded data on fetch errors and treats a
//! missing row as a legitimate transient state, not an error.

#[cfg(test)]
#[path = "materializer_test.rs"]
mod materializer_test;

use leptos::prelude::GetUntracked;
use leptos::prelude::RwSignal;
use leptos::prelude::Update;

use crate::net::gateway::{Gateway, GatewayError};
use crate::net::types::{Identity, NewProfile, Profile};
use crate::session::controller::Session;
use crate::session::state::{SessionState, still_current};

/// Default row synthesized when the provisioning trigger has not run yet.
/// Name fallback chain: provider full name, alternate name field, email
/// local-part, then the literal `"User"`; role defaults to alumni.
pub(crate) fn default_profile_for(identity: &Identity) -> NewProfile {
    NewProfile {
        id: identity.id.clone(),
        email: identity.email.clone(),
        full_name: identity.display_name(),
        role: identity.requested_role(),
    }
}

/// Clears `profile_loading` when dropped, so no exit path out of a load can
/// leave the flag stuck. A stale drop (the session generation moved on) is
/// a no-op; the newer load owns the flag by then.
struct LoadingGuard {
    state: RwSignal<SessionState>,
    epoch: u64,
}

impl LoadingGuard {
    fn engage(state: RwSignal<SessionState>, epoch: u64) -> Self {
        state.update(|state| {
            if state.epoch == epoch {
                state.profile_loading = true;
            }
        });
        Self { state, epoch }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let epoch = self.epoch;
        self.state.try_update(|state| {
            if state.epoch == epoch {
                state.profile_loading = false;
            }
        });
    }
}

impl Session {
    /// Create the profile row for `identity` if the backend has not.
    /// Fire-and-forget from the transition handler; never reports outcome.
    pub(crate) async fn ensure_profile_exists(&self, identity: &Identity, epoch: u64) {
        match self.try_ensure(identity).await {
            Ok(Some(created)) => {
                self.state().update(|state| {
                    if still_current(state, &identity.id, epoch) {
                        state.profile = Some(created);
                    }
                });
            }
            Ok(None) => {
                // The row already existed. If the initial load raced ahead
                // and came back empty, one follow-up fetch picks it up; a
                // load still in flight will deliver on its own.
                let state = self.state().get_untracked();
                if still_current(&state, &identity.id, epoch)
                    && state.profile.is_none()
                    && !state.profile_loading
                {
                    self.load_profile(&identity.id, epoch).await;
                }
            }
            Err(err) => {
                log::warn!("profile safety net failed for {}: {err}", identity.id);
            }
        }
    }

    async fn try_ensure(&self, identity: &Identity) -> Result<Option<Profile>, GatewayError> {
        if self.gateway().profile_exists(&identity.id).await? {
            return Ok(None);
        }
        let row = default_profile_for(identity);
        let created = self.gateway().upsert_profile(&row).await?;
        Ok(Some(created))
    }

    /// Fetch the profile row and publish it, unless the session generation
    /// has moved on since this load was issued.
    pub(crate) async fn load_profile(&self, identity_id: &str, epoch: u64) {
        if !still_current(&self.state().get_untracked(), identity_id, epoch) {
            return;
        }
        let _loading = LoadingGuard::engage(self.state(), epoch);
        match self.gateway().fetch_profile(identity_id).await {
            Ok(profile) => {
                self.state().update(|state| {
                    if still_current(state, identity_id, epoch) {
                        // Absence right after sign-up is a valid transient
                        // state and is published as-is.
                        state.profile = profile;
                    }
                });
            }
            Err(err) => {
                // Keep whatever was loaded before; a transient fetch failure
                // must not wipe good data.
                log::warn!("profile load failed for {identity_id}: {err}");
            }
        }
    }
}
