//! Logging infrastructure: structured run-event logging.
//!
//! Provides [`JsonlRunLogger`], a JSONL file writer that implements
//! the [`ExecutionProgressNotifier`](mender_application::ExecutionProgressNotifier) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlRunLogger;
