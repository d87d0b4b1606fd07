//! RemoveTube Server
//!
//! HTTP front end for the hybrid topic classifier. The browser extension posts
//! a video's title, description and the user's allowed topics; the server
//! answers with an allow/block verdict.

pub mod cli;
pub mod config;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use cli::Cli;
pub use config::{api_key_from_env, HttpSettings, PipelineSettings, ServerConfig};
pub use routes::{create_router, AppError};
pub use state::{AppState, LoadedOracle, OracleStatus};
