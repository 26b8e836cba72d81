//! Logging setup.
//!
//! Everything logs through the `log` facade; `env_logger` is installed once
//! by the binary.

mod init;

pub use init::{filter_for, init_logging, LoggingConfig};
