//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod models;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use models::run_models;
pub use serve::{router, run_serve};
