//! Screenrec Common Utilities
//!
//! Shared infrastructure for all screenrec crates:
//! - Error types and result aliases
//! - Pausable recording clock and status formatting helpers
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
