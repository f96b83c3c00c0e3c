//! MCP surface of the query service.

mod server;
mod tools;
mod transport;

pub use server::*;
pub use tools::*;
pub use transport::*;
