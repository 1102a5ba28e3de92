mod page;
mod telemetry;

pub mod app;
pub mod config;
pub mod routes;
pub mod server;

pub use app::{load_model, start_app};
pub use telemetry::Metrics;
