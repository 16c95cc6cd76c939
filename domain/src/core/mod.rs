//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: definition-time errors (parse, validation, composition)
//! - [`duration`]: bounded conversion of float seconds

pub mod duration;
pub mod error;
