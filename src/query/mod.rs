//! Natural language query pipeline.
//!
//! This module provides:
//! - Filter extraction from question text
//! - Structured query construction against the registry
//! - End-to-end question execution over a session

pub mod builder;
pub mod executor;
pub mod extractor;
pub mod time;
pub mod types;

pub use builder::*;
pub use executor::*;
pub use extractor::*;
pub use types::*;
