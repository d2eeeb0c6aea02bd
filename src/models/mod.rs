//! Model module.
//!
//! Contains domain entities and repository pattern for data access.

pub mod broker_restart;
pub mod handover;
pub mod roster;
pub mod task;
pub mod user;

pub use broker_restart::*;
pub use handover::*;
pub use roster::*;
pub use task::*;
pub use user::*;
