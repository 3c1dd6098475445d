pub mod config;
pub mod confirm;
pub mod errors;
pub mod metrics;
pub mod middleware;
pub mod orchestrator;
pub mod routes;
pub mod state;
pub mod streaming;

#[cfg(test)]
mod testing;

pub use config::GatewayConfig;
pub use errors::ApiError;
pub use routes::router;
pub use state::AppState;
