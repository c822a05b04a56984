//! # crashsym Utilities
//!
//! Shared helpers for the crashsym binaries, currently the logging setup
//! built on `tracing`.

pub mod logging;

pub use logging::{init_logging, init_logging_with, LogFormat, LogLevel, LogSettings, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
