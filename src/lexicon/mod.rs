//! Lexicon & Schema Registry: domain vocabulary and table schemas.

pub mod registry;
pub mod schema;
pub mod vocab;

pub use registry::{
    normalize, Category, Lexicon, LexiconBuilder, LexiconEntry, Resolution, ResolveOutcome,
};
pub use schema::{ColumnDef, ColumnType, TableSchema};
pub use vocab::{builder_for, lexicon_for};
