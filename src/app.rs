//! Application shell: context wiring, router, and session lifecycle.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session controller is constructed exactly once here, provided to the
//! tree as a context handle, started at mount, and shut down when the shell
//! unmounts. Pages never construct their own gateway or session.

use std::rc::Rc;

use leptos::prelude::*;
use leptos_meta::{Title, provide_meta_context};
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

use crate::net::gateway::Gateway;
use crate::net::supabase::{SupabaseConfig, SupabaseGateway};
use crate::pages::dashboard::DashboardPage;
use crate::pages::login::LoginPage;
use crate::session::controller::{Session, SessionContext, Spawner};

/// Fallback settings for local development against `supabase start`.
fn dev_config() -> SupabaseConfig {
    SupabaseConfig::new("http://127.0.0.1:54321", "dev-anon-key")
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let config = SupabaseConfig::from_build_env().unwrap_or_else(dev_config);
    let gateway: Rc<dyn Gateway> = SupabaseGateway::new(config);
    #[cfg(feature = "csr")]
    let spawner: Spawner = Rc::new(|task| leptos::task::spawn_local(task));
    #[cfg(not(feature = "csr"))]
    let spawner: Spawner = Rc::new(|_task| {});

    let session = Session::new(gateway, spawner);
    provide_context(session.state());
    let session_ctx: SessionContext = session.clone().into_context();
    provide_context(session_ctx);
    session.start();
    on_cleanup(move || session_ctx.get_value().shutdown());

    view! {
        <Title text="AlumniConnect"/>
        <Router>
            <main class="app-shell">
                <Routes fallback=|| view! { <p class="app-not-found">"Page not found."</p> }>
                    <Route path=path!("/") view=DashboardPage/>
                    <Route path=path!("/login") view=LoginPage/>
                    <Route path=path!("/alumni-dashboard") view=DashboardPage/>
                </Routes>
            </main>
        </Router>
    }
}
