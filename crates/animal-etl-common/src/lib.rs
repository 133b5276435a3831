//! Animal ETL Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the animal ETL workspace members.
//!
//! - **Logging**: one place to set up the process-wide `tracing` subscriber,
//!   with console and rotating file output.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel, LogOutput, LoggingGuard};
