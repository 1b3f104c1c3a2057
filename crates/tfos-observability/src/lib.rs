//! # tfos-observability
//!
//! Logging infrastructure for the OpenStack provider.
//!
//! Log output goes to stderr so that command output on stdout stays
//! machine-readable.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig, DEFAULT_TARGETS};
