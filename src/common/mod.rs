//! Common Infrastructure Module
//!
//! This module contains:
//! - Configuration loading from environment variables
//! - Structured logging setup
//! - The root error type

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{ArcanaConfig, ConfigError, Network};
pub use error::{ArcanaError, Result};
pub use logging::{
    generate_correlation_id, init_from_config, init_logging, log_action_event, log_balance_event,
    log_security_event, EventCategory, LogEvent, LogLevel, LoggingError,
};
