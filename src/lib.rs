//! Shift handover and project roster service.
//!
//! The binary in `main.rs` wires these modules into an axum server; the
//! integration tests drive the same router directly.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;
