//! Application-level configuration.
//!
//! - [`ExecutorConfig`]: attempt loop control (retry ceiling, timeouts,
//!   recovery strategy table)

pub mod executor_config;

pub use executor_config::ExecutorConfig;
