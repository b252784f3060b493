//! Core function runtime for fnhost.
//!
//! This crate provides the pieces that turn submitted source into runnable
//! functions:
//! - [`RegistrationService`]: validate, build and persist a function
//! - [`BuildPipeline`]: run the toolchain into a staged artifact
//! - [`RegistryStore`]: durable `name -> metadata` mapping
//! - [`Executor`]: run an artifact and capture its output
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  RegistrationService                    │
//! │  (Per-name serialization, all-or-nothing)               │
//! └─────────────────────────────────────────────────────────┘
//!               │                            │
//!               ▼                            ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │       BuildPipeline       │  │      RegistryStore       │
//! │  - Toolchain subprocess   │  │  - Single JSON file      │
//! │  - Staged artifact rename │  │  - Atomic replace        │
//! └───────────────────────────┘  └──────────────────────────┘
//!                                            │
//!                                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Executor                          │
//! │  (FunctionInvoker, one child process per invocation)    │
//! │  - Combined stdout/stderr                               │
//! │  - Time bound, kill on drop                             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod build;
pub mod executor;
pub mod function;
pub mod process;
pub mod registration;
pub mod registry;
pub mod trigger;

pub use build::BuildPipeline;
pub use executor::{Executor, FunctionInvoker, Invocation};
pub use function::{FunctionDefinition, FunctionMetadata, FunctionName};
pub use registration::{Registration, RegistrationService};
pub use registry::{Registry, RegistryStore};
pub use trigger::{CronSchedule, Trigger};
