//! # spotmatch-gateway
//!
//! REST and WebSocket surface of a SpotMatch node, served with axum.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod telemetry;

pub use router::create_router;
pub use state::AppState;
