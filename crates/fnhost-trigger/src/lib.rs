//! Trigger bindings for fnhost.
//!
//! This crate connects registered functions to the things that activate
//! them:
//!
//! - [`routes`]: exact-path HTTP route table
//! - [`scheduler`]: one shared cron loop for every scheduled function
//! - [`orchestrator`]: binding, rebinding and dispatch
//!
//! Everything here depends on the [`FunctionInvoker`](fnhost_core::FunctionInvoker)
//! seam rather than on a concrete executor.

pub mod orchestrator;
pub mod routes;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use orchestrator::{Binding, TriggerOrchestrator};
pub use routes::RouteTable;
pub use scheduler::{ScheduledJob, Scheduler};
