//! HTTP Server for fnhost.
//!
//! This crate provides the HTTP interface of the function runtime. It
//! handles:
//!
//! - Function registration (`PUT /register`)
//! - Dynamic dispatch to HTTP-bound functions (`/<name>`)
//! - Registry listing and liveness
//! - Startup restore of trigger bindings
//!
//! # Quick Start
//!
//! ```ignore
//! use fnhost_server::{FnServer, ServerConfig};
//! use fnhost_common::RuntimeConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime_config = RuntimeConfig::default();
//!     let server_config = ServerConfig::default();
//!
//!     let server = FnServer::new(&runtime_config, server_config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod handler;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

#[cfg(test)]
mod testing;

pub use server::{FnServer, ServerConfig, TestHandle};
pub use state::AppState;
