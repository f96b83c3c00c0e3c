//! Query Builder: turns a [`FilterSet`] into structured [`ResolvedQuery`]s.
//!
//! Each domain has a minimum set of filters below which no meaningful query
//! exists; those cases return `UnresolvableQuery` with a message naming what
//! is missing. Every resolved column is checked against the registry schema
//! before it is emitted.

use std::sync::Arc;

use tracing::debug;

use crate::domain::Domain;
use crate::error::QueryError;
use crate::lexicon::vocab::COST_EVENT_TYPES;
use crate::lexicon::{Category, Lexicon, TableSchema};

use super::types::*;

const ASSISTANCE_TABLE: &str = "disaster_dollar_db";
const COSTS_TABLE: &str = "disaster_records";

/// Builds structured queries from extracted filters against one domain's
/// registry.
pub struct QueryBuilder {
    domain: Domain,
    lexicon: Arc<Lexicon>,
    row_limit: u32,
}

impl QueryBuilder {
    pub fn new(domain: Domain, lexicon: Arc<Lexicon>, row_limit: u32) -> Self {
        Self {
            domain,
            lexicon,
            row_limit,
        }
    }

    /// Build the queries for a filter set. Comparison questions produce one
    /// query per subject; everything else produces one query per table the
    /// filters resolve to.
    pub fn build(&self, filters: &FilterSet) -> Result<Vec<ResolvedQuery>, QueryError> {
        let queries = match self.domain {
            Domain::Emissions => self.build_emissions(filters)?,
            Domain::Reanalysis => self.build_reanalysis(filters)?,
            Domain::Assistance => self.build_assistance(filters)?,
            Domain::DisasterCosts => self.build_disaster_costs(filters)?,
        };
        for query in &queries {
            self.check_schema(query)?;
        }
        debug!(count = queries.len(), "built queries");
        Ok(queries)
    }

    /// Every emitted column and predicate column must exist in the registry
    /// schema for the target table.
    fn check_schema(&self, query: &ResolvedQuery) -> Result<(), QueryError> {
        let schema = self
            .lexicon
            .table(&query.table)
            .ok_or_else(|| QueryError::SchemaMismatch(format!("unknown table {}", query.table)))?;
        for column in query.columns.iter().chain(query.predicates.iter().map(|p| &p.column)) {
            if !schema.has_column(column) {
                return Err(QueryError::SchemaMismatch(format!(
                    "column {column} not in table {}",
                    query.table
                )));
            }
        }
        Ok(())
    }

    // === Emissions: wide tables, one query per (gas, country) ===

    fn build_emissions(&self, filters: &FilterSet) -> Result<Vec<ResolvedQuery>, QueryError> {
        let gases = filters.categories_of(Category::Gas);
        if gases.is_empty() {
            return Err(QueryError::UnresolvableQuery(
                "no gas recognized; name one of co2, methane, n2o or fluorinated".into(),
            ));
        }
        if filters.locations.is_empty() {
            return Err(QueryError::UnresolvableQuery(
                "no country recognized in the question".into(),
            ));
        }

        let mut queries = Vec::new();
        for gas in &gases {
            let table = gas.canonical_id.clone();
            let schema = self
                .lexicon
                .table(&table)
                .ok_or_else(|| QueryError::SchemaMismatch(format!("unknown table {table}")))?;
            let year_columns = self.emission_year_columns(schema, filters.time)?;

            // Substance rows are always collapsed per country unless the
            // question asks for the raw breakdown.
            let aggregation = match filters.shape {
                QuestionShape::Count => Aggregation::Count,
                QuestionShape::Average => Aggregation::Avg,
                QuestionShape::Compare => Aggregation::Sum,
                _ => Aggregation::Sum,
            };

            for location in &filters.locations {
                queries.push(
                    ResolvedQuery::new(&table, year_columns.clone())
                        .with_predicate(Predicate::eq(
                            "Name",
                            PredicateValue::Text(location.canonical_id.clone()),
                        ))
                        .with_aggregation(aggregation)
                        .with_limit(self.row_limit),
                );
            }
        }
        Ok(queries)
    }

    fn emission_year_columns(
        &self,
        schema: &TableSchema,
        time: Option<TimeFilter>,
    ) -> Result<Vec<String>, QueryError> {
        let (min, max) = self.domain.year_bounds();
        let (start, end) = match time {
            Some(TimeFilter::Point { year, .. }) => (year, year),
            Some(TimeFilter::Range { start, end }) => (start, end),
            None => (min, max),
        };
        let columns = schema.year_columns_in(start, end);
        if columns.is_empty() {
            return Err(QueryError::SchemaMismatch(format!(
                "no year columns between {start} and {end}"
            )));
        }
        Ok(columns)
    }

    // === Reanalysis: per-country table pairs, metric picks the split ===

    fn build_reanalysis(&self, filters: &FilterSet) -> Result<Vec<ResolvedQuery>, QueryError> {
        let metrics = filters.categories_of(Category::Metric);
        if metrics.is_empty() {
            return Err(QueryError::UnresolvableQuery(
                "no climate metric recognized in the question".into(),
            ));
        }
        if filters.locations.is_empty() {
            return Err(QueryError::UnresolvableQuery(
                "no city recognized in the question".into(),
            ));
        }

        let aggregation = match filters.shape {
            QuestionShape::Average => Aggregation::Avg,
            QuestionShape::Sum => Aggregation::Sum,
            QuestionShape::Count => Aggregation::Count,
            QuestionShape::Lookup | QuestionShape::Compare => Aggregation::List,
        };

        let mut queries = Vec::new();
        for metric in &metrics {
            let column = self
                .lexicon
                .entry(&metric.canonical_id, Category::Metric)
                .and_then(|e| e.column.clone())
                .ok_or_else(|| {
                    QueryError::SchemaMismatch(format!("metric {} has no column", metric.canonical_id))
                })?;
            let metric_tables = self.lexicon.tables_for(&metric.canonical_id);

            for location in &filters.locations {
                // Lexicon cities narrow to their country's table; geocoded
                // ones are searched across every table holding the metric.
                let city_tables = self.lexicon.tables_for(&location.canonical_id);
                let tables: Vec<String> = if city_tables.is_empty() {
                    metric_tables.iter().cloned().collect()
                } else {
                    metric_tables.intersection(&city_tables).cloned().collect()
                };
                if tables.is_empty() {
                    return Err(QueryError::SchemaMismatch(format!(
                        "no table holds {} for {}",
                        metric.canonical_id, location.canonical_id
                    )));
                }

                for table in tables {
                    let columns = if aggregation == Aggregation::List {
                        vec!["City".to_string(), "date".to_string(), column.clone()]
                    } else {
                        vec![column.clone()]
                    };
                    let mut query = ResolvedQuery::new(&table, columns)
                        .with_predicate(Predicate::eq(
                            "City",
                            PredicateValue::Text(location.canonical_id.clone()),
                        ))
                        .with_aggregation(aggregation)
                        .with_limit(self.row_limit);
                    for predicate in date_predicates(filters.time) {
                        query = query.with_predicate(predicate);
                    }
                    queries.push(query);
                }
            }
        }
        Ok(queries)
    }

    // === Assistance: one narrow table, metric column drives aggregation ===

    fn build_assistance(&self, filters: &FilterSet) -> Result<Vec<ResolvedQuery>, QueryError> {
        let incidents = filters.categories_of(Category::IncidentType);
        if filters.locations.is_empty() && incidents.is_empty() {
            return Err(QueryError::UnresolvableQuery(
                "name a state or an incident type to narrow the question".into(),
            ));
        }

        let metric_column = filters
            .categories_of(Category::Metric)
            .first()
            .and_then(|m| self.lexicon.entry(&m.canonical_id, Category::Metric))
            .and_then(|e| e.column.clone());

        let (aggregation, columns) = match (filters.shape, &metric_column) {
            (QuestionShape::Count, _) => {
                (Aggregation::Count, vec!["incident_number".to_string()])
            }
            (QuestionShape::Sum, Some(col)) => (Aggregation::Sum, vec![col.clone()]),
            (QuestionShape::Average, Some(col)) => (Aggregation::Avg, vec![col.clone()]),
            (_, Some(col)) => (
                Aggregation::List,
                vec![
                    "year".to_string(),
                    "event".to_string(),
                    "state".to_string(),
                    "incident_type".to_string(),
                    col.clone(),
                ],
            ),
            (_, None) => (
                Aggregation::List,
                vec![
                    "year".to_string(),
                    "event".to_string(),
                    "state".to_string(),
                    "incident_type".to_string(),
                    "ihp_total".to_string(),
                    "pa_total".to_string(),
                ],
            ),
        };

        // One query per state. Multi-state questions are answered side by
        // side, never collapsed onto the first state.
        let location_slots: Vec<Option<&ResolvedLocation>> = if filters.locations.is_empty() {
            vec![None]
        } else {
            filters.locations.iter().map(Some).collect()
        };

        let mut queries = Vec::new();
        for slot in location_slots {
            let mut query = ResolvedQuery::new(ASSISTANCE_TABLE, columns.clone())
                .with_aggregation(aggregation)
                .with_limit(self.row_limit);
            if let Some(location) = slot {
                query = query.with_predicate(Predicate::eq(
                    "state",
                    PredicateValue::Text(location.canonical_id.clone()),
                ));
            }
            if let Some(incident) = incidents.first() {
                query = query.with_predicate(Predicate::eq(
                    "incident_type",
                    PredicateValue::Text(incident.canonical_id.clone()),
                ));
            }
            match filters.time {
                Some(TimeFilter::Point { year, .. }) => {
                    query = query
                        .with_predicate(Predicate::eq("year", PredicateValue::Int(year.into())));
                }
                Some(TimeFilter::Range { start, end }) => {
                    query =
                        query.with_predicate(Predicate::between("year", start.into(), end.into()));
                }
                None => {}
            }
            if let Some(cmp) = &filters.comparison {
                let column = cmp
                    .column_hint
                    .as_ref()
                    .and_then(|id| self.lexicon.entry(id, Category::Metric))
                    .and_then(|e| e.column.clone())
                    .or_else(|| metric_column.clone())
                    .ok_or_else(|| {
                        QueryError::UnresolvableQuery(
                            "a numeric threshold needs a metric to compare against".into(),
                        )
                    })?;
                query = query.with_predicate(Predicate {
                    column,
                    op: cmp_predicate_op(cmp.op),
                    value: PredicateValue::Real(cmp.value),
                });
            }
            queries.push(query);
        }
        Ok(queries)
    }

    // === Disaster costs: one row per year, per-event-type column pairs ===

    fn build_disaster_costs(&self, filters: &FilterSet) -> Result<Vec<ResolvedQuery>, QueryError> {
        let incidents = filters.categories_of(Category::IncidentType);
        if incidents.is_empty() && filters.time.is_none() {
            return Err(QueryError::UnresolvableQuery(
                "name a disaster type or a year to narrow the question".into(),
            ));
        }

        let stem = incidents
            .first()
            .map(|i| i.canonical_id.as_str())
            .unwrap_or("Total");
        let (count_column, cost_column) = cost_columns(stem);

        let metric = filters
            .categories_of(Category::Metric)
            .first()
            .map(|m| m.canonical_id.clone());
        let wants_count =
            filters.shape == QuestionShape::Count || metric.as_deref() == Some("Count");
        let value_columns: Vec<String> = if wants_count {
            vec![count_column.clone()]
        } else if metric.as_deref() == Some("Cost") || filters.shape == QuestionShape::Sum {
            vec![cost_column.clone()]
        } else {
            vec![count_column.clone(), cost_column.clone()]
        };

        // A point year reads one row as-is; ranges and open questions
        // aggregate across the year rows.
        let point_year = matches!(filters.time, Some(TimeFilter::Point { .. }));
        let aggregation = match filters.shape {
            QuestionShape::Average => Aggregation::Avg,
            QuestionShape::Sum => Aggregation::Sum,
            QuestionShape::Count if !point_year => Aggregation::Sum,
            _ if point_year => Aggregation::None,
            _ => Aggregation::List,
        };

        let columns = if aggregation == Aggregation::None || aggregation == Aggregation::List {
            let mut cols = vec!["Year".to_string()];
            cols.extend(value_columns);
            cols
        } else {
            value_columns
        };

        let mut query = ResolvedQuery::new(COSTS_TABLE, columns)
            .with_aggregation(aggregation)
            .with_limit(self.row_limit);
        match filters.time {
            Some(TimeFilter::Point { year, .. }) => {
                query = query.with_predicate(Predicate::eq("Year", PredicateValue::Int(year.into())));
            }
            Some(TimeFilter::Range { start, end }) => {
                query = query.with_predicate(Predicate::between("Year", start.into(), end.into()));
            }
            None => {}
        }
        if let Some(cmp) = &filters.comparison {
            query = query.with_predicate(Predicate {
                column: cost_column,
                op: cmp_predicate_op(cmp.op),
                value: PredicateValue::Real(cmp.value),
            });
        }
        Ok(vec![query])
    }
}

fn cmp_predicate_op(op: CmpOp) -> PredicateOp {
    match op {
        CmpOp::Gt => PredicateOp::Gt,
        CmpOp::Ge => PredicateOp::Ge,
        CmpOp::Lt => PredicateOp::Lt,
        CmpOp::Le => PredicateOp::Le,
    }
}

/// The `<stem> Count` / `<stem> Cost` column pair for an incident canonical.
fn cost_columns(stem: &str) -> (String, String) {
    if stem == "Total" || !COST_EVENT_TYPES.contains(&stem) {
        (
            "Total_Disaster_Count".to_string(),
            "Total_Disaster_Cost".to_string(),
        )
    } else {
        (format!("{stem} Count"), format!("{stem} Cost"))
    }
}

/// Stored-date predicates for a time filter. Points become prefix matches
/// against the `YYYY-MM-DD` text; ranges become inclusive text bounds.
fn date_predicates(time: Option<TimeFilter>) -> Vec<Predicate> {
    match time {
        Some(TimeFilter::Point { year, month: Some(month) }) => {
            vec![Predicate::like_prefix("date", format!("{year}-{month:02}"))]
        }
        Some(TimeFilter::Point { year, month: None }) => {
            vec![Predicate::like_prefix("date", format!("{year}-"))]
        }
        Some(TimeFilter::Range { start, end }) => vec![
            Predicate {
                column: "date".to_string(),
                op: PredicateOp::Ge,
                value: PredicateValue::Text(format!("{start}-01-01")),
            },
            Predicate {
                column: "date".to_string(),
                op: PredicateOp::Le,
                value: PredicateValue::Text(format!("{end}-12-31")),
            },
        ],
        None => Vec::new(),
    }
}
