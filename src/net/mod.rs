//! Networking modules for the hosted backend boundary.
//!
//! SYSTEM CONTEXT
//! ==============
//! `types` defines the wire schema, `gateway` is the provider contract the
//! session core consumes, and `supabase` is the hosted implementation.

pub mod gateway;
pub mod supabase;
pub mod types;
