//! Plan domain module
//!
//! The declarative workflow model and everything that turns text into a
//! runnable [`Plan`].
//!
//! ```text
//!   JSON / TOML ──serde──┐
//!                        ├──▶ Plan ──validate(tools)──▶ Vec<PlanIssue>
//!   Markdown ──import────┘      │
//!                               └──compose (PlanLibrary)──▶ Plan
//! ```
//!
//! Step inputs and conditions use the `$`-reference mini-language defined
//! in [`reference`].

pub mod compiler;
pub mod entities;
pub mod library;
pub mod markdown;
pub mod reference;
pub mod validation;

pub use compiler::{PlanFormat, compile, parse_plan};
pub use entities::{InputSpec, OnError, Plan, PlanStep};
pub use library::PlanLibrary;
pub use markdown::{UNASSIGNED_TOOL, parse_markdown};
pub use reference::{Condition, Reference, ReferenceRoot, ReferenceScope, resolve_value};
pub use validation::{PlanIssue, PlanIssueCode, Severity};
