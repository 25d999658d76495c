//! HTTP surface for the Sentinel governance substrate.

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::SentinelConfig;
pub use error::{ApiError, ApiResult};
pub use server::Server;
pub use state::AppState;
