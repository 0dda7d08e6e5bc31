//! Hosted-backend gateway speaking the Supabase auth and REST protocols.
//!
//! Browser build (`csr`): real HTTP via `gloo-net`, with the session
//! persisted in `localStorage` so a reload resumes where the user left off.
//! Native build: constructors and event plumbing only; network methods
//! return a typed network error since the endpoints are only reachable from
//! the browser.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures map to `GatewayError::Network`; any non-2xx response
//! maps to `GatewayError::Rejected` with the provider's own message when
//! one can be extracted from the body.

#[cfg(test)]
#[path = "supabase_test.rs"]
mod supabase_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::net::gateway::{
    AuthChangeHandler, AuthSubscription, Gateway, GatewayError, RedirectParams,
};
use crate::net::types::{Identity, IdentityMetadata, NewProfile, Profile, ProfileUpdate};

/// Table holding one application profile per identity.
pub const PROFILE_TABLE: &str = "user_profiles";

const DEFAULT_STORAGE_KEY: &str = "alumniconnect-auth";

/// Connection settings for the hosted backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project base URL, without a trailing slash.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    /// `localStorage` key the session is persisted under.
    pub storage_key: String,
}

impl SupabaseConfig {
    #[must_use]
    pub fn new(url: &str, anon_key: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            anon_key: anon_key.to_owned(),
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
        }
    }

    /// Build from compile-time environment (`SUPABASE_URL`,
    /// `SUPABASE_ANON_KEY`), the way the bundler injects deploy settings.
    #[must_use]
    pub fn from_build_env() -> Option<Self> {
        let url = option_env!("SUPABASE_URL")?;
        let anon_key = option_env!("SUPABASE_ANON_KEY")?;
        Some(Self::new(url, anon_key))
    }
}

/// Session material persisted across reloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: Identity,
}

/// Auth payload returned by the token and sign-up endpoints.
#[cfg(any(test, feature = "csr"))]
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: Identity,
}

#[cfg(any(test, feature = "csr"))]
fn token_password_endpoint(base: &str) -> String {
    format!("{base}/auth/v1/token?grant_type=password")
}

#[cfg(any(test, feature = "csr"))]
fn token_pkce_endpoint(base: &str) -> String {
    format!("{base}/auth/v1/token?grant_type=pkce")
}

#[cfg(any(test, feature = "csr"))]
fn signup_endpoint(base: &str, redirect_to: &str) -> String {
    format!("{base}/auth/v1/signup?redirect_to={}", percent_encode(redirect_to))
}

#[cfg(any(test, feature = "csr"))]
fn user_endpoint(base: &str) -> String {
    format!("{base}/auth/v1/user")
}

#[cfg(any(test, feature = "csr"))]
fn logout_endpoint(base: &str) -> String {
    format!("{base}/auth/v1/logout")
}

#[cfg(any(test, feature = "csr"))]
fn recover_endpoint(base: &str, redirect_to: &str) -> String {
    format!("{base}/auth/v1/recover?redirect_to={}", percent_encode(redirect_to))
}

#[cfg(any(test, feature = "csr"))]
fn profile_rows_endpoint(base: &str, identity_id: &str) -> String {
    format!("{base}/rest/v1/{PROFILE_TABLE}?id=eq.{identity_id}&select=*")
}

#[cfg(any(test, feature = "csr"))]
fn profile_probe_endpoint(base: &str, identity_id: &str) -> String {
    format!("{base}/rest/v1/{PROFILE_TABLE}?id=eq.{identity_id}&select=id&limit=1")
}

#[cfg(any(test, feature = "csr"))]
fn profile_upsert_endpoint(base: &str) -> String {
    format!("{base}/rest/v1/{PROFILE_TABLE}?on_conflict=id&select=*")
}

#[cfg(any(test, feature = "csr"))]
fn verifier_storage_key(storage_key: &str) -> String {
    format!("{storage_key}-code-verifier")
}

#[cfg(any(test, feature = "csr"))]
fn password_grant_body(email: &str, password: &str) -> serde_json::Value {
    serde_json::json!({ "email": email, "password": password })
}

#[cfg(any(test, feature = "csr"))]
fn signup_body(email: &str, password: &str, metadata: &IdentityMetadata) -> serde_json::Value {
    serde_json::json!({ "email": email, "password": password, "data": metadata })
}

#[cfg(any(test, feature = "csr"))]
fn pkce_grant_body(code: &str, verifier: &str) -> serde_json::Value {
    serde_json::json!({ "auth_code": code, "code_verifier": verifier })
}

/// Percent-encode a query-parameter value (RFC 3986 unreserved set).
#[cfg(any(test, feature = "csr"))]
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Pull a human-readable message out of a provider error body. The auth
/// endpoints use `error_description` or `msg`; the REST layer uses
/// `message`; OAuth-style errors use `error`.
#[cfg(any(test, feature = "csr"))]
fn extract_error_message(body: &serde_json::Value) -> Option<String> {
    for key in ["error_description", "msg", "message", "error"] {
        if let Some(message) = body.get(key).and_then(serde_json::Value::as_str) {
            if !message.is_empty() {
                return Some(message.to_owned());
            }
        }
    }
    None
}

/// Sign-up responses are the bare user when email confirmation is pending,
/// or a full session payload when the project auto-confirms.
#[cfg(any(test, feature = "csr"))]
fn identity_from_auth_payload(body: &serde_json::Value) -> Option<Identity> {
    let user = body.get("user").unwrap_or(body);
    serde_json::from_value(user.clone()).ok()
}

#[cfg(any(test, feature = "csr"))]
fn session_from_auth_payload(body: &serde_json::Value) -> Option<StoredSession> {
    let token: TokenResponse = serde_json::from_value(body.clone()).ok()?;
    Some(StoredSession {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        user: token.user,
    })
}

/// Gateway implementation backed by a Supabase project.
pub struct SupabaseGateway {
    config: SupabaseConfig,
    session: RefCell<Option<StoredSession>>,
    listeners: Rc<RefCell<Vec<(u64, AuthChangeHandler)>>>,
    next_listener: Cell<u64>,
}

impl SupabaseGateway {
    #[must_use]
    pub fn new(config: SupabaseConfig) -> Rc<Self> {
        Rc::new(Self {
            config,
            session: RefCell::new(None),
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_listener: Cell::new(0),
        })
    }

    /// Run every registered handler, synchronously, in registration order.
    #[cfg(feature = "csr")]
    fn notify(&self, identity: Option<Identity>) {
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

    #[cfg(feature = "csr")]
    fn bearer_token(&self) -> String {
        self.session
            .borrow()
            .as_ref()
            .map_or_else(|| self.config.anon_key.clone(), |s| s.access_token.clone())
    }

    #[cfg(feature = "csr")]
    fn local_storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }

    #[cfg(feature = "csr")]
    fn persist_session(&self, session: StoredSession) {
        if let Some(storage) = Self::local_storage() {
            if let Ok(json) = serde_json::to_string(&session) {
                let _ = storage.set_item(&self.config.storage_key, &json);
            }
        }
        *self.session.borrow_mut() = Some(session);
    }

    #[cfg(feature = "csr")]
    fn clear_session(&self) {
        if let Some(storage) = Self::local_storage() {
            let _ = storage.remove_item(&self.config.storage_key);
        }
        *self.session.borrow_mut() = None;
    }

    /// Load the persisted session into memory, once, before first use.
    #[cfg(feature = "csr")]
    fn restore_session(&self) {
        if self.session.borrow().is_some() {
            return;
        }
        let Some(storage) = Self::local_storage() else {
            return;
        };
        let Ok(Some(json)) = storage.get_item(&self.config.storage_key) else {
            return;
        };
        if let Ok(stored) = serde_json::from_str::<StoredSession>(&json) {
            *self.session.borrow_mut() = Some(stored);
        }
    }

    #[cfg(feature = "csr")]
    fn take_code_verifier(&self) -> Option<String> {
        let storage = Self::local_storage()?;
        let key = verifier_storage_key(&self.config.storage_key);
        let verifier = storage.get_item(&key).ok().flatten()?;
        let _ = storage.remove_item(&key);
        Some(verifier)
    }

    /// Fetch the identity behind `access_token` from the auth user endpoint.
    #[cfg(feature = "csr")]
    async fn fetch_identity(&self, access_token: &str) -> Result<Identity, GatewayError> {
        let resp = gloo_net::http::Request::get(&user_endpoint(&self.config.url))
            .header("apikey", &self.config.anon_key)
            .header("Authorization", &format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        if !resp.ok() {
            return Err(Self::rejection(resp).await);
        }
        resp.json::<Identity>()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))
    }

    #[cfg(feature = "csr")]
    async fn rejection(resp: gloo_net::http::Response) -> GatewayError {
        let status = resp.status();
        let message = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .as_ref()
            .and_then(extract_error_message)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        GatewayError::Rejected { status, message }
    }

    #[cfg(feature = "csr")]
    async fn rest_get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, GatewayError> {
        let resp = gloo_net::http::Request::get(url)
            .header("apikey", &self.config.anon_key)
            .header("Authorization", &format!("Bearer {}", self.bearer_token()))
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        if !resp.ok() {
            return Err(Self::rejection(resp).await);
        }
        resp.json::<T>()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))
    }
}

#[async_trait(?Send)]
impl Gateway for SupabaseGateway {
    async fn exchange_redirect(&self, params: &RedirectParams) -> Result<Identity, GatewayError> {
        #[cfg(feature = "csr")]
        {
            let session = match params {
                RedirectParams::Code(code) => {
                    let verifier = self.take_code_verifier().ok_or(GatewayError::Rejected {
                        status: 400,
                        message: "missing PKCE code verifier".to_owned(),
                    })?;
                    let body = pkce_grant_body(code, &verifier);
                    let resp = gloo_net::http::Request::post(&token_pkce_endpoint(&self.config.url))
                        .header("apikey", &self.config.anon_key)
                        .json(&body)
                        .map_err(|e| GatewayError::Network(e.to_string()))?
                        .send()
                        .await
                        .map_err(|e| GatewayError::Network(e.to_string()))?;
                    if !resp.ok() {
                        return Err(Self::rejection(resp).await);
                    }
                    let token: TokenResponse = resp
                        .json()
                        .await
                        .map_err(|e| GatewayError::Network(e.to_string()))?;
                    StoredSession {
                        access_token: token.access_token,
                        refresh_token: token.refresh_token,
                        user: token.user,
                    }
                }
                RedirectParams::Tokens {
                    access_token,
                    refresh_token,
                } => {
                    let user = self.fetch_identity(access_token).await?;
                    StoredSession {
                        access_token: access_token.clone(),
                        refresh_token: refresh_token.clone(),
                        user,
                    }
                }
            };
            let identity = session.user.clone();
            self.persist_session(session);
            self.notify(Some(identity.clone()));
            Ok(identity)
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = params;
            Err(GatewayError::Network(
                "backend is only reachable from the browser".to_owned(),
            ))
        }
    }

    async fn current_identity(&self) -> Result<Option<Identity>, GatewayError> {
        #[cfg(feature = "csr")]
        {
            self.restore_session();
            let Some(access_token) = self
                .session
                .borrow()
                .as_ref()
                .map(|s| s.access_token.clone())
            else {
                return Ok(None);
            };
            match self.fetch_identity(&access_token).await {
                Ok(identity) => {
                    if let Some(session) = self.session.borrow_mut().as_mut() {
                        session.user = identity.clone();
                    }
                    Ok(Some(identity))
                }
                // A dead token is an ordinary signed-out state, not an error.
                Err(GatewayError::Rejected { status: 401 | 403, .. }) => {
                    self.clear_session();
                    Ok(None)
                }
                Err(err) => Err(err),
            }
        }
        #[cfg(not(feature = "csr"))]
        {
            Err(GatewayError::Network(
                "backend is only reachable from the browser".to_owned(),
            ))
        }
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

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, GatewayError> {
        #[cfg(feature = "csr")]
        {
            let body = password_grant_body(email, password);
            let resp = gloo_net::http::Request::post(&token_password_endpoint(&self.config.url))
                .header("apikey", &self.config.anon_key)
                .json(&body)
                .map_err(|e| GatewayError::Network(e.to_string()))?
                .send()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            if !resp.ok() {
                return Err(Self::rejection(resp).await);
            }
            let token: TokenResponse = resp
                .json()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            let identity = token.user.clone();
            self.persist_session(StoredSession {
                access_token: token.access_token,
                refresh_token: token.refresh_token,
                user: token.user,
            });
            self.notify(Some(identity.clone()));
            Ok(identity)
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = (email, password);
            Err(GatewayError::Network(
                "backend is only reachable from the browser".to_owned(),
            ))
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &IdentityMetadata,
        email_redirect_to: &str,
    ) -> Result<Identity, GatewayError> {
        #[cfg(feature = "csr")]
        {
            let body = signup_body(email, password, metadata);
            let url = signup_endpoint(&self.config.url, email_redirect_to);
            let resp = gloo_net::http::Request::post(&url)
                .header("apikey", &self.config.anon_key)
                .json(&body)
                .map_err(|e| GatewayError::Network(e.to_string()))?
                .send()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            if !resp.ok() {
                return Err(Self::rejection(resp).await);
            }
            let payload: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            let identity = identity_from_auth_payload(&payload).ok_or_else(|| {
                GatewayError::Network("sign-up response carried no user".to_owned())
            })?;
            // Auto-confirm projects hand back a live session right away.
            if let Some(session) = session_from_auth_payload(&payload) {
                self.persist_session(session);
                self.notify(Some(identity.clone()));
            }
            Ok(identity)
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = (email, password, metadata, email_redirect_to);
            Err(GatewayError::Network(
                "backend is only reachable from the browser".to_owned(),
            ))
        }
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        #[cfg(feature = "csr")]
        {
            let resp = gloo_net::http::Request::post(&logout_endpoint(&self.config.url))
                .header("apikey", &self.config.anon_key)
                .header("Authorization", &format!("Bearer {}", self.bearer_token()))
                .send()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            if !resp.ok() {
                return Err(Self::rejection(resp).await);
            }
            self.clear_session();
            self.notify(None);
            Ok(())
        }
        #[cfg(not(feature = "csr"))]
        {
            Err(GatewayError::Network(
                "backend is only reachable from the browser".to_owned(),
            ))
        }
    }

    async fn reset_password(&self, email: &str, redirect_to: &str) -> Result<(), GatewayError> {
        #[cfg(feature = "csr")]
        {
            let url = recover_endpoint(&self.config.url, redirect_to);
            let resp = gloo_net::http::Request::post(&url)
                .header("apikey", &self.config.anon_key)
                .json(&serde_json::json!({ "email": email }))
                .map_err(|e| GatewayError::Network(e.to_string()))?
                .send()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            if !resp.ok() {
                return Err(Self::rejection(resp).await);
            }
            Ok(())
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = (email, redirect_to);
            Err(GatewayError::Network(
                "backend is only reachable from the browser".to_owned(),
            ))
        }
    }

    async fn profile_exists(&self, identity_id: &str) -> Result<bool, GatewayError> {
        #[cfg(feature = "csr")]
        {
            let url = profile_probe_endpoint(&self.config.url, identity_id);
            let rows: Vec<serde_json::Value> = self.rest_get(&url).await?;
            Ok(!rows.is_empty())
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = identity_id;
            Err(GatewayError::Network(
                "backend is only reachable from the browser".to_owned(),
            ))
        }
    }

    async fn upsert_profile(&self, row: &NewProfile) -> Result<Profile, GatewayError> {
        #[cfg(feature = "csr")]
        {
            let url = profile_upsert_endpoint(&self.config.url);
            let resp = gloo_net::http::Request::post(&url)
                .header("apikey", &self.config.anon_key)
                .header("Authorization", &format!("Bearer {}", self.bearer_token()))
                .header("Prefer", "resolution=merge-duplicates,return=representation")
                .json(&serde_json::json!([row]))
                .map_err(|e| GatewayError::Network(e.to_string()))?
                .send()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            if !resp.ok() {
                return Err(Self::rejection(resp).await);
            }
            let status = resp.status();
            let rows: Vec<Profile> = resp
                .json()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            rows.into_iter().next().ok_or(GatewayError::Rejected {
                status,
                message: "upsert returned no row".to_owned(),
            })
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = row;
            Err(GatewayError::Network(
                "backend is only reachable from the browser".to_owned(),
            ))
        }
    }

    async fn fetch_profile(&self, identity_id: &str) -> Result<Option<Profile>, GatewayError> {
        #[cfg(feature = "csr")]
        {
            let url = profile_rows_endpoint(&self.config.url, identity_id);
            let rows: Vec<Profile> = self.rest_get(&url).await?;
            Ok(rows.into_iter().next())
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = identity_id;
            Err(GatewayError::Network(
                "backend is only reachable from the browser".to_owned(),
            ))
        }
    }

    async fn update_profile(
        &self,
        identity_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, GatewayError> {
        #[cfg(feature = "csr")]
        {
            let url = profile_rows_endpoint(&self.config.url, identity_id);
            let resp = gloo_net::http::Request::patch(&url)
                .header("apikey", &self.config.anon_key)
                .header("Authorization", &format!("Bearer {}", self.bearer_token()))
                .header("Prefer", "return=representation")
                .json(update)
                .map_err(|e| GatewayError::Network(e.to_string()))?
                .send()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            if !resp.ok() {
                return Err(Self::rejection(resp).await);
            }
            let rows: Vec<Profile> = resp
                .json()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            rows.into_iter().next().ok_or(GatewayError::Rejected {
                status: 404,
                message: "no profile row for the current user".to_owned(),
            })
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = (identity_id, update);
            Err(GatewayError::Network(
                "backend is only reachable from the browser".to_owned(),
            ))
        }
    }
}
