//! Types for the natural language query pipeline.

use serde::{Deserialize, Serialize};

use crate::lexicon::Category;

// ============================================================================
// Filter Set (extractor output)
// ============================================================================

/// The shape of the question, driving aggregation selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionShape {
    /// Plain value lookup ("what was ...").
    #[default]
    Lookup,
    /// "How many ..." questions.
    Count,
    /// "Total ..." questions.
    Sum,
    /// "Average ..." questions.
    Average,
    /// Side-by-side comparison of two or more subjects.
    Compare,
}

/// A location resolved through the lexicon or the geocoder fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub canonical_id: String,
    pub confidence: f32,
    /// True when the name was absent from the lexicon and confirmed by the
    /// geocoding collaborator instead.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub via_geocoder: bool,
}

/// A metric, gas or incident type resolved through the lexicon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCategory {
    pub canonical_id: String,
    pub category: Category,
    pub confidence: f32,
}

/// Time constraint extracted from the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TimeFilter {
    Point {
        year: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        month: Option<u8>,
    },
    /// Inclusive on both ends.
    Range { start: u16, end: u16 },
}

impl TimeFilter {
    pub fn point(year: u16) -> Self {
        Self::Point { year, month: None }
    }

    pub fn range(start: u16, end: u16) -> Self {
        Self::Range { start, end }
    }
}

/// Numeric comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
}

/// A numeric comparison bound to a metric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub op: CmpOp,
    pub value: f64,
    /// Metric canonical id the comparison binds to, when one was extracted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_hint: Option<String>,
}

/// Everything the extractor recognized in one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub question: String,

    #[serde(default)]
    pub shape: QuestionShape,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ResolvedLocation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<ResolvedCategory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeFilter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,

    /// Set when an ambiguous term needs the user to pick a candidate;
    /// nothing is dispatched while this is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,
}

impl FilterSet {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    /// No filter of any kind was recognized.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
            && self.categories.is_empty()
            && self.time.is_none()
            && self.comparison.is_none()
    }

    pub fn categories_of(&self, category: Category) -> Vec<&ResolvedCategory> {
        self.categories.iter().filter(|c| c.category == category).collect()
    }
}

// ============================================================================
// Resolved Query (builder output, crosses the session boundary)
// ============================================================================

/// Aggregation applied over the selected columns.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Plain row selection.
    #[default]
    None,
    Count,
    Sum,
    Avg,
    /// Row selection kept unaggregated for side-by-side comparison.
    List,
}

/// Predicate operator; the storage layer renders these with bound
/// parameters, never by splicing values into SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PredicateOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    /// Inclusive on both ends; value must be a pair.
    Between,
    /// Text prefix match (`LIKE ? || '%'`), used for stored date strings.
    LikePrefix,
}

/// A typed predicate value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum PredicateValue {
    Int(i64),
    Real(f64),
    Text(String),
    Pair(i64, i64),
}

/// One WHERE-clause predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Predicate {
    pub column: String,
    pub op: PredicateOp,
    pub value: PredicateValue,
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: PredicateValue) -> Self {
        Self {
            column: column.into(),
            op: PredicateOp::Eq,
            value,
        }
    }

    pub fn between(column: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            column: column.into(),
            op: PredicateOp::Between,
            value: PredicateValue::Pair(start, end),
        }
    }

    pub fn like_prefix(column: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: PredicateOp::LikePrefix,
            value: PredicateValue::Text(prefix.into()),
        }
    }
}

/// A structured query against one registered table. This is the only query
/// representation that crosses the session boundary; the service re-validates
/// every part of it against its own registry before execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ResolvedQuery {
    pub table: String,

    /// Columns to select, in order. Must be non-empty.
    pub columns: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<Predicate>,

    #[serde(default)]
    pub aggregation: Aggregation,

    /// Client-requested row cap; the service clamps it to its own ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ResolvedQuery {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            predicates: Vec::new(),
            aggregation: Aggregation::None,
            limit: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

// ============================================================================
// Row Result (service output)
// ============================================================================

/// Rows returned by the query service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
    /// True when the row ceiling cut the result short.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

// ============================================================================
// Answer (pipeline output)
// ============================================================================

/// Per-stage timing, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerStats {
    pub extract_ms: u64,
    pub query_ms: u64,
    pub render_ms: u64,
    pub total_ms: u64,
}

/// Final outcome of one question through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub question: String,

    pub filters: FilterSet,

    /// The structured queries that were dispatched, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<ResolvedQuery>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<RowResult>,

    /// Prose rendering of the rows; absent when the renderer is disabled or
    /// failed (the rows still stand on their own).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prose: Option<String>,

    /// Set instead of results when the question needs clarification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,

    pub stats: AnswerStats,
}

impl AnswerResult {
    pub fn clarification(question: impl Into<String>, filters: FilterSet, message: String) -> Self {
        Self {
            question: question.into(),
            filters,
            queries: Vec::new(),
            results: Vec::new(),
            prose: None,
            clarification: Some(message),
            stats: AnswerStats::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_set() {
        let fs = FilterSet::new("hello");
        assert!(fs.is_empty());
        assert!(fs.clarification.is_none());
    }

    #[test]
    fn test_filter_set_with_time_is_not_empty() {
        let mut fs = FilterSet::new("storms in 2020");
        fs.time = Some(TimeFilter::point(2020));
        assert!(!fs.is_empty());
    }

    #[test]
    fn test_resolved_query_builder() {
        let q = ResolvedQuery::new("disaster_dollar_db", vec!["ihp_total".into()])
            .with_predicate(Predicate::eq("state", PredicateValue::Text("TX".into())))
            .with_predicate(Predicate::between("year", 2017, 2019))
            .with_aggregation(Aggregation::Sum)
            .with_limit(100);
        assert_eq!(q.predicates.len(), 2);
        assert_eq!(q.aggregation, Aggregation::Sum);
        assert_eq!(q.limit, Some(100));
    }

    #[test]
    fn test_resolved_query_serde_round_trip() {
        let q = ResolvedQuery::new("co2_emissions", vec!["2020".into()])
            .with_predicate(Predicate::eq("Name", PredicateValue::Text("India".into())));
        let json = serde_json::to_string(&q).unwrap();
        let back: ResolvedQuery = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn test_predicate_value_untagged_serde() {
        let json = serde_json::to_string(&PredicateValue::Pair(2010, 2015)).unwrap();
        assert_eq!(json, "[2010,2015]");
        let back: PredicateValue = serde_json::from_str("\"TX\"").unwrap();
        assert_eq!(back, PredicateValue::Text("TX".into()));
    }

}
