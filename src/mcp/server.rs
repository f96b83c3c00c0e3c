//! MCP server exposing the query service tools.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use tracing::instrument;

use crate::domain::Domain;
use crate::error::StorageError;
use crate::mcp::tools::{
    DescribeTableResponse, DistinctValuesParams, DistinctValuesResponse, DomainParams,
    ListTablesResponse, QueryResponse, RunQueryParams, SampleParams, TableParams,
};
use crate::store::DatasetStore;

const DEFAULT_SAMPLE_ROWS: u32 = 5;

fn mcp_error(err: StorageError) -> McpError {
    match err {
        StorageError::UnknownTable(_) | StorageError::SchemaMismatch(_) => {
            McpError::invalid_params(err.to_string(), None)
        }
        StorageError::Execution(_) | StorageError::Connection(_) => {
            McpError::internal_error(err.to_string(), None)
        }
    }
}

fn json_result(value: &impl serde::Serialize) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Query service handler serving one or more domain datasets.
#[derive(Clone)]
pub struct ClimaqlServer {
    stores: Arc<HashMap<Domain, Arc<DatasetStore>>>,
    tool_router: ToolRouter<Self>,
}

impl ClimaqlServer {
    pub fn new(stores: HashMap<Domain, Arc<DatasetStore>>) -> Self {
        Self {
            stores: Arc::new(stores),
            tool_router: Self::tool_router(),
        }
    }

    fn store(&self, domain: Domain) -> Result<&Arc<DatasetStore>, McpError> {
        self.stores.get(&domain).ok_or_else(|| {
            McpError::invalid_params(format!("no dataset configured for domain {domain}"), None)
        })
    }
}

#[tool_router]
impl ClimaqlServer {
    /// Liveness check.
    #[tool(description = "Check that the query service is alive.")]
    async fn ping(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text("pong")]))
    }

    #[tool(description = "List the tables a domain dataset serves.")]
    #[instrument(skip(self))]
    async fn list_tables(
        &self,
        Parameters(params): Parameters<DomainParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(params.domain)?;
        json_result(&ListTablesResponse {
            domain: params.domain,
            tables: store.list_tables(),
        })
    }

    #[tool(description = "Describe the columns and types of one table.")]
    #[instrument(skip(self))]
    async fn describe_table(
        &self,
        Parameters(params): Parameters<TableParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(params.domain)?;
        let schema = store.describe_table(&params.table).map_err(mcp_error)?;
        json_result(&DescribeTableResponse {
            domain: params.domain,
            schema,
        })
    }

    #[tool(
        description = "Execute a structured query against one table. The query is re-validated server-side and results are capped by the row ceiling."
    )]
    #[instrument(skip(self, params))]
    async fn run_query(
        &self,
        Parameters(params): Parameters<RunQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(params.domain)?;
        let result = store.run_query(&params.query).map_err(mcp_error)?;
        json_result(&QueryResponse {
            domain: params.domain,
            result,
        })
    }

    #[tool(description = "Return the first rows of a table, capped by the row ceiling.")]
    #[instrument(skip(self))]
    async fn sample(
        &self,
        Parameters(params): Parameters<SampleParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(params.domain)?;
        let count = params.count.unwrap_or(DEFAULT_SAMPLE_ROWS);
        let result = store.sample(&params.table, count).map_err(mcp_error)?;
        json_result(&QueryResponse {
            domain: params.domain,
            result,
        })
    }

    #[tool(
        description = "Return the distinct values of one column, e.g. the country or city names a dataset covers."
    )]
    #[instrument(skip(self))]
    async fn distinct_values(
        &self,
        Parameters(params): Parameters<DistinctValuesParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store(params.domain)?;
        let values = store
            .distinct_values(&params.table, &params.column)
            .map_err(mcp_error)?;
        json_result(&DistinctValuesResponse {
            domain: params.domain,
            table: params.table,
            column: params.column,
            values,
        })
    }
}

#[tool_handler]
impl ServerHandler for ClimaqlServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Climate and disaster dataset query service. \
                 Use 'list_tables' and 'describe_table' to discover the schema, \
                 'run_query' to execute a structured query, 'sample' to preview \
                 rows and 'distinct_values' to enumerate names a dataset covers."
                    .to_string(),
            ),
        }
    }
}
