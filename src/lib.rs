//! Grid Trading Ledger
//!
//! Tracks a fixed-template grid strategy: 19 price bands around a base
//! price, each cycling between waiting to buy and holding. The core is the
//! pricing/re-anchoring algorithm plus the tick-driven execution engine that
//! mutates band state, cash, position, and realized profit.

pub mod config;
pub mod engine;
pub mod error;
pub mod fills;
pub mod model;
pub mod plan;
pub mod reanchor;
pub mod service;
pub mod state_manager;
pub mod types;

pub use config::Config;
pub use error::{GridError, Result};
pub use types::*;
