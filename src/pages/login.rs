//! Login page with a sign-in / create-account toggle and password reset.
//!
//! SYSTEM CONTEXT
//! ==============
//! This is the only public route. Signed-in visitors are bounced to the
//! dashboard by the authed-redirect guard, which also picks up a successful
//! sign-in as soon as the transition lands; form failures render inline and
//! never navigate.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use leptos::prelude::*;
use leptos_router::hooks::use_navigate;

use crate::net::types::{IdentityMetadata, Role};
use crate::session::controller::SessionContext;
use crate::util::auth::install_authed_redirect;
use crate::util::validate::validate_credentials;

/// Sign-up metadata from the optional form fields. Blank names are omitted
/// so the profile safety net falls through to the email local-part.
fn signup_metadata(full_name: &str, role_value: &str) -> IdentityMetadata {
    let full_name = full_name.trim();
    IdentityMetadata {
        full_name: (!full_name.is_empty()).then(|| full_name.to_owned()),
        name: None,
        role: Role::parse(role_value).map(|role| role.as_str().to_owned()),
    }
}

fn submit_label(signing_up: bool, busy: bool) -> &'static str {
    match (signing_up, busy) {
        (true, true) => "Creating account...",
        (true, false) => "Create Account",
        (false, true) => "Signing in...",
        (false, false) => "Sign In",
    }
}

fn toggle_prompt(signing_up: bool) -> &'static str {
    if signing_up {
        "Already have an account? Sign in"
    } else {
        "New to AlumniConnect? Create an account"
    }
}

#[component]
pub fn LoginPage() -> impl IntoView {
    let session_ctx = expect_context::<SessionContext>();
    install_authed_redirect(session_ctx.get_value().state(), use_navigate());

    let email = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let full_name = RwSignal::new(String::new());
    let role = RwSignal::new(Role::Alumni.as_str().to_owned());
    let is_sign_up = RwSignal::new(false);
    let error = RwSignal::new(String::new());
    let notice = RwSignal::new(String::new());
    let busy = RwSignal::new(false);

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if busy.get() {
            return;
        }
        let email_value = match validate_credentials(&email.get(), &password.get()) {
            Ok(trimmed) => trimmed,
            Err(message) => {
                error.set(message.to_owned());
                return;
            }
        };
        let password_value = password.get();
        let signing_up = is_sign_up.get();
        let metadata = signup_metadata(&full_name.get(), &role.get());
        busy.set(true);
        error.set(String::new());
        notice.set(String::new());

        #[cfg(feature = "csr")]
        {
            let session = session_ctx.get_value();
            leptos::task::spawn_local(async move {
                let outcome = if signing_up {
                    session
                        .sign_up(&email_value, &password_value, metadata)
                        .await
                        .map(|_| ())
                } else {
                    session.sign_in(&email_value, &password_value).await.map(|_| ())
                };
                match outcome {
                    Ok(()) => {
                        if signing_up {
                            notice.set(
                                "Account created. Check your email to confirm, then sign in."
                                    .to_owned(),
                            );
                        }
                        // A live session redirects via the authed guard.
                        busy.set(false);
                    }
                    Err(err) => {
                        error.set(err.user_message());
                        busy.set(false);
                    }
                }
            });
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = (signing_up, metadata, email_value, password_value);
            busy.set(false);
        }
    };

    let on_forgot_password = move |_| {
        if busy.get() {
            return;
        }
        let email_value = email.get().trim().to_owned();
        if email_value.is_empty() {
            error.set("Enter your email above, then use Forgot password.".to_owned());
            return;
        }
        busy.set(true);
        error.set(String::new());
        notice.set(String::new());

        #[cfg(feature = "csr")]
        {
            let session = session_ctx.get_value();
            leptos::task::spawn_local(async move {
                match session.reset_password(&email_value).await {
                    Ok(()) => {
                        notice.set("Check your email for a password reset link.".to_owned());
                    }
                    Err(err) => error.set(err.user_message()),
                }
                busy.set(false);
            });
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = email_value;
            busy.set(false);
        }
    };

    view! {
        <div class="login-page">
            <div class="login-card">
                <h1>"AlumniConnect"</h1>
                <p class="login-card__subtitle">
                    {move || if is_sign_up.get() { "Join the alumni network" } else { "Welcome back" }}
                </p>
                <form class="login-form" on:submit=on_submit>
                    <input
                        class="login-input"
                        type="email"
                        placeholder="you@example.com"
                        prop:value=move || email.get()
                        on:input=move |ev| email.set(event_target_value(&ev))
                    />
                    <input
                        class="login-input"
                        type="password"
                        placeholder="Password"
                        prop:value=move || password.get()
                        on:input=move |ev| password.set(event_target_value(&ev))
                    />
                    <Show when=move || is_sign_up.get()>
                        <input
                            class="login-input"
                            type="text"
                            placeholder="Full name"
                            prop:value=move || full_name.get()
                            on:input=move |ev| full_name.set(event_target_value(&ev))
                        />
                        <select
                            class="login-input"
                            on:change=move |ev| role.set(event_target_value(&ev))
                        >
                            {Role::ALL
                                .into_iter()
                                .map(|option| {
                                    view! {
                                        <option
                                            value=option.as_str()
                                            selected=move || role.get() == option.as_str()
                                        >
                                            {option.label()}
                                        </option>
                                    }
                                })
                                .collect_view()}
                        </select>
                    </Show>
                    <button class="login-button" type="submit" disabled=move || busy.get()>
                        {move || submit_label(is_sign_up.get(), busy.get())}
                    </button>
                </form>
                <button
                    class="login-link"
                    on:click=move |_| {
                        is_sign_up.update(|v| *v = !*v);
                        error.set(String::new());
                        notice.set(String::new());
                    }
                >
                    {move || toggle_prompt(is_sign_up.get())}
                </button>
                <Show when=move || !is_sign_up.get()>
                    <button class="login-link" on:click=on_forgot_password>
                        "Forgot password?"
                    </button>
                </Show>
                <Show when=move || !error.get().is_empty()>
                    <p class="login-message login-message--error">{move || error.get()}</p>
                </Show>
                <Show when=move || !notice.get().is_empty()>
                    <p class="login-message">{move || notice.get()}</p>
                </Show>
            </div>
        </div>
    }
}
