//! CLI command implementations
//!
//! Thin wrappers over `GridService`; no pricing or execution logic here.

pub mod create;
pub mod edit;
pub mod import;
pub mod plan;
pub mod tick;
pub mod trades;
