//! Tool domain module
//!
//! This module defines the **Tool Catalog** vocabulary: the invocable
//! capabilities a plan step can target.
//!
//! # Overview
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌────────────────────────┐
//! │ ToolDefinition │───▶│ ToolHandler  │───▶│ ToolResponse/ToolError │
//! │ (catalog entry)│    │ (invocation) │    │ (output + usage)       │
//! └────────────────┘    └──────────────┘    └────────────────────────┘
//! ```
//!
//! - [`ToolDefinition`]: name, category, typed inputs/outputs, retry and
//!   timeout defaults, tags, declared dependencies, version
//! - [`Tool`]: a definition bound to its [`ToolHandler`]
//! - [`ToolError`]: a run-time failure; its `kind` and `message` drive
//!   error classification in [`crate::recovery`]
//! - [`ToolValidator`]: pure check of resolved arguments against inputs
//!
//! The registry itself (indexes, search, discovery) lives in the
//! infrastructure layer behind the application's `ToolCatalogPort`.

pub mod entities;
pub mod handler;
pub mod traits;
pub mod value_objects;

pub use entities::{ToolCategory, ToolDefinition, ToolInput, ToolOutput};
pub use handler::{FnToolHandler, Tool, ToolArgs, ToolHandler};
pub use traits::{DefaultToolValidator, ToolValidator, apply_input_defaults};
pub use value_objects::{ToolError, ToolResponse, Usage};
