//! HTTP request handler module.

pub mod handover;
pub mod health;
pub mod roster;

pub use handover::{
    get_handover, get_handover_all, get_history_handover, save_task, start_broker_restart,
};
pub use health::{health_handler, readiness_handler, HealthResponse, ReadinessResponse};
pub use roster::{data_search, file_upload, update_annotation};
