//! # Courier Telemetry
//!
//! Structured logging bootstrap for the Courier client.
//!
//! Provides configurable logging with JSON and pretty-print formats,
//! stdout and rotating-file outputs, and `RUST_LOG`-style level
//! filtering.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogOutput, LoggingError, RotationConfig};
