//! Query Service storage layer.
//!
//! One read-only SQLite connection per domain. Every structured query coming
//! over the session is re-validated against this side's own registry before
//! any SQL is rendered; the client's view of the schema is never trusted.
//! Values always travel as bound parameters.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::domain::Domain;
use crate::error::StorageError;
use crate::lexicon::{Lexicon, TableSchema};
use crate::query::types::{Aggregation, Predicate, PredicateOp, PredicateValue, ResolvedQuery, RowResult};

/// Hard cap on rows returned by any single call, regardless of what the
/// client asked for.
pub const DEFAULT_ROW_CEILING: u32 = 100;

/// Read-only access to one domain's dataset.
pub struct DatasetStore {
    domain: Domain,
    lexicon: Arc<Lexicon>,
    conn: Mutex<Connection>,
    row_ceiling: u32,
}

impl DatasetStore {
    /// Open the dataset read-only and verify the registered tables exist.
    pub fn open(
        domain: Domain,
        path: impl AsRef<Path>,
        lexicon: Arc<Lexicon>,
        row_ceiling: u32,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StorageError::Connection(format!("{}: {e}", path.as_ref().display())))?;

        let store = Self {
            domain,
            lexicon,
            conn: Mutex::new(conn),
            row_ceiling,
        };
        store.verify_tables()?;
        info!(domain = %store.domain, path = %path.as_ref().display(), "dataset opened");
        Ok(store)
    }

    /// In-memory store seeded from SQL, for tests and fixtures.
    pub fn open_in_memory(
        domain: Domain,
        lexicon: Arc<Lexicon>,
        seed_sql: &str,
        row_ceiling: u32,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        conn.execute_batch(seed_sql)?;
        Ok(Self {
            domain,
            lexicon,
            conn: Mutex::new(conn),
            row_ceiling,
        })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn row_ceiling(&self) -> u32 {
        self.row_ceiling
    }

    /// Registered tables missing from the file are a deployment error, not
    /// something to discover one failed query at a time.
    fn verify_tables(&self) -> Result<(), StorageError> {
        let conn = self.lock();
        for table in self.lexicon.table_names() {
            let present: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                    [table],
                    |row| row.get(0),
                )
                .map_err(StorageError::from)?;
            if !present {
                return Err(StorageError::SchemaMismatch(format!(
                    "dataset is missing registered table {table}"
                )));
            }
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock means a panic mid-query; the connection itself is
        // still usable for read-only work.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Names of the tables this dataset serves.
    pub fn list_tables(&self) -> Vec<String> {
        self.lexicon.table_names().iter().map(|s| s.to_string()).collect()
    }

    /// Registry schema of one table.
    pub fn describe_table(&self, name: &str) -> Result<TableSchema, StorageError> {
        self.lexicon
            .table(name)
            .cloned()
            .ok_or_else(|| StorageError::UnknownTable(name.to_string()))
    }

    /// Execute a structured query. The table, every selected column and every
    /// predicate column are validated against this side's registry first.
    pub fn run_query(&self, query: &ResolvedQuery) -> Result<RowResult, StorageError> {
        let schema = self
            .lexicon
            .table(&query.table)
            .ok_or_else(|| StorageError::UnknownTable(query.table.clone()))?;
        if query.columns.is_empty() {
            return Err(StorageError::SchemaMismatch("no columns selected".into()));
        }
        for column in query.columns.iter().chain(query.predicates.iter().map(|p| &p.column)) {
            if !schema.has_column(column) {
                return Err(StorageError::SchemaMismatch(format!(
                    "column {column} not in table {}",
                    query.table
                )));
            }
        }

        let limit = query
            .limit
            .unwrap_or(self.row_ceiling)
            .min(self.row_ceiling);

        let (sql, params, out_columns) = render_sql(query, limit);
        debug!(%sql, "executing");

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let width = out_columns.len();
        let mut rows = Vec::new();
        let mut raw = stmt.query(rusqlite::params_from_iter(params))?;
        let mut truncated = false;
        while let Some(row) = raw.next()? {
            if rows.len() as u32 >= limit {
                truncated = true;
                break;
            }
            let mut record = Vec::with_capacity(width);
            for i in 0..width {
                record.push(json_value(row.get_ref(i)?));
            }
            rows.push(record);
        }

        Ok(RowResult {
            columns: out_columns,
            row_count: rows.len(),
            rows,
            truncated,
        })
    }

    /// First `count` rows of a table, capped by the row ceiling.
    pub fn sample(&self, table: &str, count: u32) -> Result<RowResult, StorageError> {
        let schema = self.describe_table(table)?;
        let columns: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();
        let query = ResolvedQuery::new(table, columns).with_limit(count);
        self.run_query(&query)
    }

    /// Distinct non-null values of one column, capped by the row ceiling.
    /// Used to seed location vocabularies at startup.
    pub fn distinct_values(&self, table: &str, column: &str) -> Result<Vec<String>, StorageError> {
        let schema = self.describe_table(table)?;
        if !schema.has_column(column) {
            return Err(StorageError::SchemaMismatch(format!(
                "column {column} not in table {table}"
            )));
        }
        let sql = format!(
            "SELECT DISTINCT {col} FROM {tbl} WHERE {col} IS NOT NULL ORDER BY {col} LIMIT {limit}",
            col = quote_ident(column),
            tbl = quote_ident(table),
            limit = self.row_ceiling,
        );
        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }
}

/// Double-quote an identifier. Only registry-validated names reach this, but
/// embedded quotes are still escaped.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render the SQL text, parameter list and output column labels.
fn render_sql(query: &ResolvedQuery, limit: u32) -> (String, Vec<SqlValue>, Vec<String>) {
    let (select, out_columns) = match query.aggregation {
        Aggregation::None | Aggregation::List => (
            query.columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
            query.columns.clone(),
        ),
        Aggregation::Count => (
            "COUNT(*)".to_string(),
            vec!["count".to_string()],
        ),
        Aggregation::Sum => (
            query
                .columns
                .iter()
                .map(|c| format!("SUM({})", quote_ident(c)))
                .collect::<Vec<_>>()
                .join(", "),
            query.columns.iter().map(|c| format!("sum_{c}")).collect(),
        ),
        Aggregation::Avg => (
            query
                .columns
                .iter()
                .map(|c| format!("AVG({})", quote_ident(c)))
                .collect::<Vec<_>>()
                .join(", "),
            query.columns.iter().map(|c| format!("avg_{c}")).collect(),
        ),
    };

    let mut sql = format!("SELECT {select} FROM {}", quote_ident(&query.table));
    let mut params: Vec<SqlValue> = Vec::new();
    if !query.predicates.is_empty() {
        let clauses: Vec<String> = query
            .predicates
            .iter()
            .map(|p| render_predicate(p, &mut params))
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    // Fetch one past the cap to tell a full page from a truncated one.
    sql.push_str(&format!(" LIMIT {}", limit.saturating_add(1)));
    (sql, params, out_columns)
}

fn render_predicate(predicate: &Predicate, params: &mut Vec<SqlValue>) -> String {
    let column = quote_ident(&predicate.column);
    match (&predicate.op, &predicate.value) {
        (PredicateOp::Between, PredicateValue::Pair(a, b)) => {
            params.push(SqlValue::Integer(*a));
            params.push(SqlValue::Integer(*b));
            format!("{column} BETWEEN ? AND ?")
        }
        (PredicateOp::LikePrefix, value) => {
            let prefix = match value {
                PredicateValue::Text(s) => s.clone(),
                other => format!("{other:?}"),
            };
            params.push(SqlValue::Text(format!("{prefix}%")));
            format!("{column} LIKE ?")
        }
        (op, value) => {
            params.push(sql_value(value));
            let symbol = match op {
                PredicateOp::Eq => "=",
                PredicateOp::Gt => ">",
                PredicateOp::Ge => ">=",
                PredicateOp::Lt => "<",
                PredicateOp::Le => "<=",
                // Between/LikePrefix handled above; a mismatched value
                // degrades to equality rather than panicking.
                PredicateOp::Between | PredicateOp::LikePrefix => "=",
            };
            format!("{column} {symbol} ?")
        }
    }
}

fn sql_value(value: &PredicateValue) -> SqlValue {
    match value {
        PredicateValue::Int(i) => SqlValue::Integer(*i),
        PredicateValue::Real(r) => SqlValue::Real(*r),
        PredicateValue::Text(s) => SqlValue::Text(s.clone()),
        PredicateValue::Pair(a, _) => SqlValue::Integer(*a),
    }
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(r) => serde_json::Number::from_f64(r)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => {
            warn!("blob column returned as null");
            serde_json::Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::lexicon_for;
    use crate::query::types::Predicate;

    fn assistance_store(row_ceiling: u32) -> DatasetStore {
        let lexicon = Arc::new(lexicon_for(Domain::Assistance, 0.85, 0.02));
        let seed = r#"
            CREATE TABLE disaster_dollar_db (
                year INTEGER, event TEXT, incident_number INTEGER,
                incident_start TEXT, incident_end TEXT, state TEXT,
                incident_type TEXT, valid_ihp_applications INTEGER,
                eligible_ihp_applications INTEGER, ihp_total REAL,
                pa_total REAL, pa_projects_count INTEGER, cdbg_dr_allocation REAL
            );
            INSERT INTO disaster_dollar_db VALUES
                (2017, 'Hurricane Harvey', 4332, '2017-08-23', '2017-09-15', 'TX',
                 'Hurricane', 900000, 400000, 1500000000.0, 2300000000.0, 1200, 5000000000.0),
                (2017, 'Hurricane Irma', 4337, '2017-09-04', '2017-10-18', 'FL',
                 'Hurricane', 800000, 350000, 1000000000.0, 1900000000.0, 1100, 4000000000.0),
                (2015, 'Severe Storms', 4223, '2015-05-04', '2015-06-22', 'TX',
                 'Severe Storm', 50000, 20000, 80000000.0, 120000000.0, 300, 0.0);
        "#;
        DatasetStore::open_in_memory(Domain::Assistance, lexicon, seed, row_ceiling).unwrap()
    }

    #[test]
    fn test_run_query_with_predicates() {
        let store = assistance_store(100);
        let query = ResolvedQuery::new(
            "disaster_dollar_db",
            vec!["year".into(), "event".into(), "ihp_total".into()],
        )
        .with_predicate(Predicate::eq("state", PredicateValue::Text("TX".into())))
        .with_predicate(Predicate::eq("year", PredicateValue::Int(2017)));
        let result = store.run_query(&query).unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0][1], serde_json::json!("Hurricane Harvey"));
    }

    #[test]
    fn test_sum_aggregation() {
        let store = assistance_store(100);
        let query = ResolvedQuery::new("disaster_dollar_db", vec!["ihp_total".into()])
            .with_predicate(Predicate::eq("year", PredicateValue::Int(2017)))
            .with_aggregation(Aggregation::Sum);
        let result = store.run_query(&query).unwrap();
        assert_eq!(result.columns, vec!["sum_ihp_total"]);
        assert_eq!(result.rows[0][0], serde_json::json!(2_500_000_000.0));
    }

    #[test]
    fn test_count_aggregation() {
        let store = assistance_store(100);
        let query = ResolvedQuery::new("disaster_dollar_db", vec!["incident_number".into()])
            .with_predicate(Predicate::eq(
                "incident_type",
                PredicateValue::Text("Hurricane".into()),
            ))
            .with_aggregation(Aggregation::Count);
        let result = store.run_query(&query).unwrap();
        assert_eq!(result.rows[0][0], serde_json::json!(2));
    }

    #[test]
    fn test_between_is_inclusive() {
        let store = assistance_store(100);
        let query = ResolvedQuery::new("disaster_dollar_db", vec!["year".into()])
            .with_predicate(Predicate::between("year", 2015, 2017));
        let result = store.run_query(&query).unwrap();
        assert_eq!(result.row_count, 3);
    }

    #[test]
    fn test_row_ceiling_clamps_and_flags_truncation() {
        let store = assistance_store(2);
        let query =
            ResolvedQuery::new("disaster_dollar_db", vec!["event".into()]).with_limit(1000);
        let result = store.run_query(&query).unwrap();
        assert_eq!(result.row_count, 2);
        assert!(result.truncated);
    }

    #[test]
    fn test_unknown_table_and_column_are_rejected() {
        let store = assistance_store(100);
        let err = store
            .run_query(&ResolvedQuery::new("secrets", vec!["x".into()]))
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownTable(_)));

        let err = store
            .run_query(&ResolvedQuery::new(
                "disaster_dollar_db",
                vec!["password".into()],
            ))
            .unwrap_err();
        assert!(matches!(err, StorageError::SchemaMismatch(_)));
    }

    #[test]
    fn test_describe_and_sample() {
        let store = assistance_store(100);
        let schema = store.describe_table("disaster_dollar_db").unwrap();
        assert!(schema.has_column("cdbg_dr_allocation"));
        let sample = store.sample("disaster_dollar_db", 2).unwrap();
        assert_eq!(sample.row_count, 2);
        assert_eq!(sample.columns.len(), 13);
    }

    #[test]
    fn test_distinct_values() {
        let store = assistance_store(100);
        let states = store.distinct_values("disaster_dollar_db", "state").unwrap();
        assert_eq!(states, vec!["FL", "TX"]);
    }
}
