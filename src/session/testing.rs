//! Scripted in-memory gateway and task harness for native session tests.
//!
//! DESIGN
//! ======
//! `MockGateway` acts as a tiny provider: a `HashMap` stands in for the
//! profile table, per-method scripts override the defaults, and successful
//! sign-in/sign-up/sign-out notify registered handlers synchronously, the
//! way the real provider dispatches. Tests drive spawned work by hand
//! through a `futures` `LocalPool`, which makes interleavings explicit.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;

use crate::net::gateway::{
    AuthChangeHandler, AuthSubscription, Gateway, GatewayError, RedirectParams,
};
use crate::net::types::{Identity, IdentityMetadata, NewProfile, Profile, ProfileUpdate};
use crate::session::controller::{Session, Spawner};

pub(crate) fn identity(id: &str, email: &str) -> Identity {
    Identity {
        id: id.to_owned(),
        email: Some(email.to_owned()),
        metadata: IdentityMetadata::default(),
    }
}

pub(crate) fn profile_from_new(row: &NewProfile) -> Profile {
    Profile {
        id: row.id.clone(),
        email: row.email.clone(),
        full_name: row.full_name.clone(),
        role: row.role,
        current_position: None,
        company: None,
        department: None,
        graduation_year: None,
        location: None,
        bio: None,
        is_active: true,
    }
}

pub(crate) fn profile_row(id: &str, full_name: &str) -> Profile {
    profile_from_new(&NewProfile {
        id: id.to_owned(),
        email: Some(format!("{id}@example.com")),
        full_name: full_name.to_owned(),
        role: crate::net::types::Role::Alumni,
    })
}

/// One scripted reply for `fetch_profile`.
pub(crate) enum FetchReply {
    Ready(Result<Option<Profile>, GatewayError>),
    /// Resolves when the paired sender fires; lets a test hold a fetch open
    /// across other transitions.
    Gated(oneshot::Receiver<Result<Option<Profile>, GatewayError>>),
}

#[derive(Default)]
pub(crate) struct MockGateway {
    pub profiles: RefCell<HashMap<String, Profile>>,
    pub fetch_script: RefCell<VecDeque<FetchReply>>,
    pub exists_script: RefCell<VecDeque<Result<bool, GatewayError>>>,
    pub upsert_error: RefCell<Option<GatewayError>>,
    pub sign_in_result: RefCell<Option<Result<Identity, GatewayError>>>,
    pub sign_up_result: RefCell<Option<Result<Identity, GatewayError>>>,
    pub sign_out_error: RefCell<Option<GatewayError>>,
    pub current: RefCell<Option<Result<Option<Identity>, GatewayError>>>,
    pub calls: RefCell<Vec<String>>,
    listeners: Rc<RefCell<Vec<(u64, AuthChangeHandler)>>>,
    next_listener: Cell<u64>,
}

impl MockGateway {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn seed_profile(&self, profile: Profile) {
        self.profiles.borrow_mut().insert(profile.id.clone(), profile);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub(crate) fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Run every registered handler synchronously, like the provider does.
    pub(crate) fn notify(&self, identity: Option<Identity>) {
        let handlers: Vec<AuthChangeHandler> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(identity.clone());
        }
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn unscripted(what: &str) -> GatewayError {
        GatewayError::Network(format!("unscripted {what}"))
    }
}

#[async_trait(?Send)]
impl Gateway for MockGateway {
    async fn exchange_redirect(&self, params: &RedirectParams) -> Result<Identity, GatewayError> {
        let _ = params;
        self.record("exchange".to_owned());
        Err(Self::unscripted("exchange"))
    }

    async fn current_identity(&self) -> Result<Option<Identity>, GatewayError> {
        self.record("current".to_owned());
        self.current.borrow_mut().take().unwrap_or(Ok(None))
    }

    fn on_auth_change(&self, handler: AuthChangeHandler) -> AuthSubscription {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push((id, handler));
        let listeners = Rc::clone(&self.listeners);
        AuthSubscription::new(move || {
            listeners.borrow_mut().retain(|(entry, _)| *entry != id);
        })
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<Identity, GatewayError> {
        self.record(format!("sign_in:{email}"));
        let result = self
            .sign_in_result
            .borrow_mut()
            .take()
            .unwrap_or_else(|| Err(Self::unscripted("sign_in")));
        if let Ok(identity) = &result {
            self.notify(Some(identity.clone()));
        }
        result
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _metadata: &IdentityMetadata,
        email_redirect_to: &str,
    ) -> Result<Identity, GatewayError> {
        self.record(format!("sign_up:{email}:{email_redirect_to}"));
        let result = self
            .sign_up_result
            .borrow_mut()
            .take()
            .unwrap_or_else(|| Err(Self::unscripted("sign_up")));
        if let Ok(identity) = &result {
            // Auto-confirm project: a session exists immediately.
            self.notify(Some(identity.clone()));
        }
        result
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        self.record("sign_out".to_owned());
        if let Some(err) = self.sign_out_error.borrow_mut().take() {
            return Err(err);
        }
        self.notify(None);
        Ok(())
    }

    async fn reset_password(&self, email: &str, redirect_to: &str) -> Result<(), GatewayError> {
        self.record(format!("reset:{email}:{redirect_to}"));
        Ok(())
    }

    async fn profile_exists(&self, identity_id: &str) -> Result<bool, GatewayError> {
        self.record(format!("exists:{identity_id}"));
        if let Some(scripted) = self.exists_script.borrow_mut().pop_front() {
            return scripted;
        }
        Ok(self.profiles.borrow().contains_key(identity_id))
    }

    async fn upsert_profile(&self, row: &NewProfile) -> Result<Profile, GatewayError> {
        self.record(format!("upsert:{}", row.id));
        if let Some(err) = self.upsert_error.borrow_mut().take() {
            return Err(err);
        }
        let profile = profile_from_new(row);
        self.profiles
            .borrow_mut()
            .insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn fetch_profile(&self, identity_id: &str) -> Result<Option<Profile>, GatewayError> {
        self.record(format!("fetch:{identity_id}"));
        let scripted = self.fetch_script.borrow_mut().pop_front();
        match scripted {
            Some(FetchReply::Ready(result)) => result,
            Some(FetchReply::Gated(receiver)) => receiver
                .await
                .unwrap_or_else(|_| Err(GatewayError::Network("gate dropped".to_owned()))),
            None => Ok(self.profiles.borrow().get(identity_id).cloned()),
        }
    }

    async fn update_profile(
        &self,
        identity_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, GatewayError> {
        self.record(format!("update:{identity_id}"));
        let mut profiles = self.profiles.borrow_mut();
        let Some(profile) = profiles.get_mut(identity_id) else {
            return Err(GatewayError::Rejected {
                status: 404,
                message: "no profile row for the current user".to_owned(),
            });
        };
        if let Some(value) = &update.full_name {
            profile.full_name = value.clone();
        }
        if let Some(value) = &update.current_position {
            profile.current_position = Some(value.clone());
        }
        if let Some(value) = &update.company {
            profile.company = Some(value.clone());
        }
        if let Some(value) = &update.department {
            profile.department = Some(value.clone());
        }
        if let Some(value) = update.graduation_year {
            profile.graduation_year = Some(value);
        }
        if let Some(value) = &update.location {
            profile.location = Some(value.clone());
        }
        if let Some(value) = &update.bio {
            profile.bio = Some(value.clone());
        }
        Ok(profile.clone())
    }
}

/// A session wired to a hand-driven task pool. Spawned profile work only
/// progresses when the test runs the pool, which makes interleaving-
/// sensitive properties checkable.
pub(crate) fn session_with(gateway: Rc<MockGateway>) -> (Session, LocalPool) {
    let pool = LocalPool::new();
    let spawn_handle = pool.spawner();
    let spawner: Spawner = Rc::new(move |fut| {
        spawn_handle.spawn_local(fut).expect("spawn test task");
    });
    (Session::new(gateway, spawner), pool)
}
