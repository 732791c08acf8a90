//! recordkit command-line interface.
//!
//! Commands:
//! - `recordkit init`: create the schema directory
//! - `recordkit field list|show|create|update|delete|reorder`: administer definitions
//! - `recordkit layout --entity E`: show the form layout
//! - `recordkit validate --entity E --values FILE`: validate a label-keyed record
//! - `recordkit match --type T --op OP [--operand X] [VALUE]...`: test a filter
//! - `recordkit audit`: recent schema changes
//!
//! Exit codes:
//! - 0: Success
//! - 1: Validation failed or no match
//! - 2: Error

pub mod cli;
pub mod commands;
pub mod exit_codes;
pub mod output;

pub use cli::{Cli, Commands, FieldAction, OutputFormat};
