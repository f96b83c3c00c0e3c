//! ClimaQL: natural-language query engine for climate and disaster datasets.
//!
//! Questions are extracted into structured filters against a per-domain
//! lexicon, compiled into validated queries, and executed by a query service
//! reachable in-process or over an MCP stdio session.

pub mod config;
pub mod domain;
pub mod error;
pub mod geocode;
pub mod lexicon;
pub mod mcp;
pub mod query;
pub mod render;
pub mod session;
pub mod store;

pub use config::Config;
pub use domain::Domain;
pub use error::{ClimaqlError, Result};
pub use lexicon::{Category, Lexicon, ResolveOutcome};
pub use mcp::{run_stdio, ClimaqlServer};
pub use query::{
    AnswerResult, FilterSet, QuestionPipeline, QuestionShape, ResolvedQuery, RowResult, TimeFilter,
};
pub use session::{LocalSession, McpSession, QuerySession};
pub use store::DatasetStore;
