//! Dashboard page: the authenticated landing route.
//!
//! SYSTEM CONTEXT
//! ==============
//! Shows the signed-in user's profile summary and sign-out. While the
//! profile has not materialized the header degrades to identity-derived
//! fields, so a slow or failed background load never blocks the page.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use leptos::prelude::*;
use leptos_router::hooks::use_navigate;

use crate::session::controller::SessionContext;
use crate::session::state::SessionState;
use crate::util::auth::install_unauth_redirect;

fn welcome_line(state: &SessionState) -> String {
    format!("Welcome back, {}", state.display_name())
}

/// Optional profile field rendered with a placeholder when unset.
fn summary_value(value: Option<&str>) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value.to_owned(),
        _ => "Not set".to_owned(),
    }
}

#[component]
pub fn DashboardPage() -> impl IntoView {
    let session_ctx = expect_context::<SessionContext>();
    let state = session_ctx.get_value().state();
    install_unauth_redirect(state, use_navigate());

    let error = RwSignal::new(String::new());
    let signing_out = RwSignal::new(false);

    let on_sign_out = move |_| {
        if signing_out.get() {
            return;
        }
        signing_out.set(true);
        error.set(String::new());

        #[cfg(feature = "csr")]
        {
            let session = session_ctx.get_value();
            leptos::task::spawn_local(async move {
                if let Err(err) = session.sign_out().await {
                    error.set(err.user_message());
                }
                // On success the unauth guard takes the user to /login.
                signing_out.set(false);
            });
        }
        #[cfg(not(feature = "csr"))]
        {
            signing_out.set(false);
        }
    };

    view! {
        <div class="dashboard-page">
            <header class="dashboard-header">
                <h1>"AlumniConnect"</h1>
                <button
                    class="dashboard-signout"
                    on:click=on_sign_out
                    disabled=move || signing_out.get()
                >
                    "Sign Out"
                </button>
            </header>
            <Show when=move || state.get().session_loading>
                <p class="dashboard-loading">"Loading session..."</p>
            </Show>
            <Show when=move || state.get().is_authenticated()>
                <section class="dashboard-welcome">
                    <h2>{move || welcome_line(&state.get())}</h2>
                    <p class="dashboard-email">
                        {move || state.get().display_email().unwrap_or_default()}
                    </p>
                    <Show when=move || state.get().profile_loading>
                        <p class="dashboard-hint">"Refreshing profile..."</p>
                    </Show>
                    <Show when=move || state.get().profile.is_some()>
                        <dl class="dashboard-profile">
                            <dt>"Role"</dt>
                            <dd>
                                {move || {
                                    state
                                        .get()
                                        .profile
                                        .map(|profile| profile.role.label())
                                        .unwrap_or_default()
                                }}
                            </dd>
                            <dt>"Position"</dt>
                            <dd>
                                {move || {
                                    summary_value(
                                        state.get().profile.and_then(|p| p.current_position).as_deref(),
                                    )
                                }}
                            </dd>
                            <dt>"Company"</dt>
                            <dd>
                                {move || {
                                    summary_value(state.get().profile.and_then(|p| p.company).as_deref())
                                }}
                            </dd>
                            <dt>"Location"</dt>
                            <dd>
                                {move || {
                                    summary_value(state.get().profile.and_then(|p| p.location).as_deref())
                                }}
                            </dd>
                        </dl>
                    </Show>
                </section>
            </Show>
            <Show when=move || !error.get().is_empty()>
                <p class="dashboard-error">{move || error.get()}</p>
            </Show>
        </div>
    }
}
