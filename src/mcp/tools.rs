//! Parameter and response types for the query service tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::lexicon::TableSchema;
use crate::query::types::{ResolvedQuery, RowResult};

/// Parameters selecting a domain only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainParams {
    /// Dataset domain to address.
    pub domain: Domain,
}

/// Parameters naming a table within a domain.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableParams {
    /// Dataset domain to address.
    pub domain: Domain,
    /// Table name as returned by list_tables.
    pub table: String,
}

/// Parameters for run_query.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunQueryParams {
    /// Dataset domain to address.
    pub domain: Domain,
    /// Structured query; the service re-validates it before execution.
    pub query: ResolvedQuery,
}

/// Parameters for sample.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SampleParams {
    /// Dataset domain to address.
    pub domain: Domain,
    /// Table name as returned by list_tables.
    pub table: String,
    /// Rows to return; clamped to the service row ceiling.
    #[serde(default)]
    pub count: Option<u32>,
}

/// Parameters for distinct_values.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DistinctValuesParams {
    /// Dataset domain to address.
    pub domain: Domain,
    /// Table name as returned by list_tables.
    pub table: String,
    /// Column whose distinct values to return.
    pub column: String,
}

/// Response for list_tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTablesResponse {
    pub domain: Domain,
    pub tables: Vec<String>,
}

/// Response for describe_table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeTableResponse {
    pub domain: Domain,
    pub schema: TableSchema,
}

/// Response for run_query and sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub domain: Domain,
    pub result: RowResult,
}

/// Response for distinct_values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistinctValuesResponse {
    pub domain: Domain,
    pub table: String,
    pub column: String,
    pub values: Vec<String>,
}
