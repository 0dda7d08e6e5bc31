//! Startup redirect handling for provider email links and OAuth logins.
//!
//! SYSTEM CONTEXT
//! ==============
//! Confirmation and recovery emails land the user back here with either an
//! authorization code in the query string or tokens in the fragment. The
//! exchange must complete before the initial session query runs, and the
//! sensitive parameters must not survive in the visible address, so a
//! reload cannot replay them.
//!
//! ERROR HANDLING
//! ==============
//! Strictly best-effort: any failure is logged and swallowed. Absence of a
//! valid session is rediscovered by the session query that follows.

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod bootstrap_test;

#[cfg(feature = "csr")]
use crate::net::gateway::Gateway;
use crate::net::gateway::RedirectParams;
use crate::session::controller::Session;

/// Detect redirect artifacts in a location's query string and fragment.
/// An authorization code wins over fragment tokens when both are present.
#[must_use]
pub fn parse_redirect_params(search: &str, hash: &str) -> Option<RedirectParams> {
    if let Some(code) = param_value(search, "code") {
        return Some(RedirectParams::Code(code));
    }
    let access_token = param_value(hash, "access_token")?;
    Some(RedirectParams::Tokens {
        access_token,
        refresh_token: param_value(hash, "refresh_token"),
    })
}

/// Extract `key` from a `?a=b&c=d` or `#a=b&c=d` style parameter string.
fn param_value(raw: &str, key: &str) -> Option<String> {
    let raw = raw
        .strip_prefix('?')
        .or_else(|| raw.strip_prefix('#'))
        .unwrap_or(raw);
    for pair in raw.split('&') {
        if let Some((name, value)) = pair.split_once('=') {
            if name == key && !value.is_empty() {
                return Some(value.to_owned());
            }
        }
    }
    None
}

/// Visible address after a completed exchange: same origin and path, no
/// query string or fragment.
#[must_use]
pub fn scrub_target(origin: &str, pathname: &str) -> String {
    format!("{origin}{pathname}")
}

/// Complete a pending provider redirect, if the current address carries
/// one. At most one exchange per process start; a no-op when no redirect
/// parameters are present, and again on any later call because the address
/// was scrubbed after the first success.
pub(crate) async fn complete_redirect_login(session: &Session) {
    #[cfg(feature = "csr")]
    {
        let Some(window) = web_sys::window() else {
            return;
        };
        let location = window.location();
        let search = location.search().unwrap_or_default();
        let hash = location.hash().unwrap_or_default();
        let Some(params) = parse_redirect_params(&search, &hash) else {
            return;
        };
        match session.gateway().exchange_redirect(&params).await {
            Ok(_) => scrub_location(&window),
            Err(err) => log::warn!("redirect session exchange failed: {err}"),
        }
    }
    #[cfg(not(feature = "csr"))]
    {
        let _ = session;
    }
}

#[cfg(feature = "csr")]
fn scrub_location(window: &web_sys::Window) {
    let location = window.location();
    let Ok(origin) = location.origin() else {
        return;
    };
    let Ok(pathname) = location.pathname() else {
        return;
    };
    let clean = scrub_target(&origin, &pathname);
    if let Ok(history) = window.history() {
        let _ = history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&clean));
    }
}
