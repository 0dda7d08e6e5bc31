//! AlumniConnect browser client.
//!
//! ARCHITECTURE
//! ============
//! `session` owns the auth lifecycle: startup redirect bootstrap, the
//! session state machine, and profile materialization against the hosted
//! backend. `net` is the backend boundary, `pages` render the route-level
//! screens, and `util` holds shared guards and validation. Browser-only
//! I/O is gated behind the `csr` feature so the native build (and the test
//! suite) compiles against stubs.

pub mod app;
pub mod net;
pub mod pages;
pub mod session;
pub mod util;

/// Browser entry point: mount the application onto `<body>`.
#[cfg(feature = "csr")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn mount() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    leptos::mount::mount_to_body(app::App);
}
