//! Configuration module.

mod settings;

pub use settings::*;
