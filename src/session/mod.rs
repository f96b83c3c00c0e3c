//! Session Protocol, client role.
//!
//! `QuerySession` is the seam between the question pipeline and the query
//! service. `LocalSession` wraps an in-process store for tests and the local
//! CLI path; `McpSession` talks to a spawned service process over stdio,
//! one request in flight at a time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, RawContent},
    service::RunningService,
    transport::TokioChildProcess,
    RoleClient, ServiceExt,
};
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::Domain;
use crate::error::{ClimaqlError, Result};
use crate::lexicon::TableSchema;
use crate::mcp::{DescribeTableResponse, DistinctValuesResponse, ListTablesResponse, QueryResponse};
use crate::query::types::{ResolvedQuery, RowResult};
use crate::store::DatasetStore;

/// Client-side view of the query service.
#[async_trait]
pub trait QuerySession: Send + Sync {
    async fn list_tables(&self, domain: Domain) -> Result<Vec<String>>;
    async fn describe_table(&self, domain: Domain, table: &str) -> Result<TableSchema>;
    async fn run_query(&self, domain: Domain, query: &ResolvedQuery) -> Result<RowResult>;
    async fn sample(&self, domain: Domain, table: &str, count: u32) -> Result<RowResult>;
    async fn distinct_values(
        &self,
        domain: Domain,
        table: &str,
        column: &str,
    ) -> Result<Vec<String>>;
}

/// In-process session over local dataset stores.
pub struct LocalSession {
    stores: HashMap<Domain, Arc<DatasetStore>>,
}

impl LocalSession {
    pub fn new(stores: HashMap<Domain, Arc<DatasetStore>>) -> Self {
        Self { stores }
    }

    fn store(&self, domain: Domain) -> Result<&Arc<DatasetStore>> {
        self.stores
            .get(&domain)
            .ok_or_else(|| ClimaqlError::Mcp(format!("no dataset configured for domain {domain}")))
    }
}

#[async_trait]
impl QuerySession for LocalSession {
    async fn list_tables(&self, domain: Domain) -> Result<Vec<String>> {
        Ok(self.store(domain)?.list_tables())
    }

    async fn describe_table(&self, domain: Domain, table: &str) -> Result<TableSchema> {
        Ok(self.store(domain)?.describe_table(table)?)
    }

    async fn run_query(&self, domain: Domain, query: &ResolvedQuery) -> Result<RowResult> {
        Ok(self.store(domain)?.run_query(query)?)
    }

    async fn sample(&self, domain: Domain, table: &str, count: u32) -> Result<RowResult> {
        Ok(self.store(domain)?.sample(table, count)?)
    }

    async fn distinct_values(
        &self,
        domain: Domain,
        table: &str,
        column: &str,
    ) -> Result<Vec<String>> {
        Ok(self.store(domain)?.distinct_values(table, column)?)
    }
}

/// Session over a spawned query service process on stdio.
pub struct McpSession {
    client: RunningService<RoleClient, ()>,
}

impl McpSession {
    /// Spawn the service binary and complete the MCP handshake.
    pub async fn spawn(program: &str, args: &[String]) -> Result<Self> {
        info!(program, "spawning query service");
        let mut command = Command::new(program);
        command.args(args);
        let transport = TokioChildProcess::new(command)?;
        let client = ()
            .serve(transport)
            .await
            .map_err(|e| ClimaqlError::Mcp(format!("handshake failed: {e}")))?;
        Ok(Self { client })
    }

    /// Close the session and wait for the service to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.client
            .cancel()
            .await
            .map_err(|e| ClimaqlError::Mcp(format!("shutdown failed: {e}")))?;
        Ok(())
    }

    async fn call_tool<T: serde::de::DeserializeOwned>(
        &self,
        name: &'static str,
        arguments: serde_json::Value,
    ) -> Result<T> {
        debug!(tool = name, "calling query service");
        let result = self
            .client
            .call_tool(CallToolRequestParam {
                name: std::borrow::Cow::Borrowed(name),
                arguments: Some(arguments.as_object().cloned().unwrap_or_default()),
            })
            .await
            .map_err(|e| ClimaqlError::Mcp(format!("{name} failed: {e}")))?;

        let text = result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(text_content) => Some(text_content.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ClimaqlError::Mcp(format!("{name}: empty response")));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl QuerySession for McpSession {
    async fn list_tables(&self, domain: Domain) -> Result<Vec<String>> {
        let response: ListTablesResponse = self
            .call_tool("list_tables", serde_json::json!({ "domain": domain }))
            .await?;
        Ok(response.tables)
    }

    async fn describe_table(&self, domain: Domain, table: &str) -> Result<TableSchema> {
        let response: DescribeTableResponse = self
            .call_tool(
                "describe_table",
                serde_json::json!({ "domain": domain, "table": table }),
            )
            .await?;
        Ok(response.schema)
    }

    async fn run_query(&self, domain: Domain, query: &ResolvedQuery) -> Result<RowResult> {
        let response: QueryResponse = self
            .call_tool(
                "run_query",
                serde_json::json!({ "domain": domain, "query": query }),
            )
            .await?;
        Ok(response.result)
    }

    async fn sample(&self, domain: Domain, table: &str, count: u32) -> Result<RowResult> {
        let response: QueryResponse = self
            .call_tool(
                "sample",
                serde_json::json!({ "domain": domain, "table": table, "count": count }),
            )
            .await?;
        Ok(response.result)
    }

    async fn distinct_values(
        &self,
        domain: Domain,
        table: &str,
        column: &str,
    ) -> Result<Vec<String>> {
        let response: DistinctValuesResponse = self
            .call_tool(
                "distinct_values",
                serde_json::json!({ "domain": domain, "table": table, "column": column }),
            )
            .await?;
        Ok(response.values)
    }
}
