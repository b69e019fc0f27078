//! Logging setup.
//!
//! Everything logs through the `log` facade; `env_logger` is the backend the
//! binary installs.

mod init;

pub use init::{init_logging, LoggingConfig};
