//! Question pipeline: extract, build, dispatch, render.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::domain::Domain;
use crate::error::{ClimaqlError, QueryError, Result};
use crate::geocode::Geocoder;
use crate::lexicon::{Category, Lexicon};
use crate::render::{degraded_rendering, ProseRenderer};
use crate::session::QuerySession;

use super::builder::QueryBuilder;
use super::extractor::FilterExtractor;
use super::types::{AnswerResult, AnswerStats, FilterSet, RowResult};

/// Runs one question end to end against a session.
pub struct QuestionPipeline {
    domain: Domain,
    lexicon: Arc<Lexicon>,
    extractor: FilterExtractor,
    builder: QueryBuilder,
    session: Arc<dyn QuerySession>,
    renderer: Option<Arc<dyn ProseRenderer>>,
}

impl QuestionPipeline {
    pub fn new(
        domain: Domain,
        lexicon: Arc<Lexicon>,
        session: Arc<dyn QuerySession>,
        row_limit: u32,
    ) -> Self {
        Self {
            domain,
            extractor: FilterExtractor::new(domain, lexicon.clone()),
            builder: QueryBuilder::new(domain, lexicon.clone(), row_limit),
            lexicon,
            session,
            renderer: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ProseRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.extractor =
            FilterExtractor::new(self.domain, self.lexicon.clone()).with_geocoder(geocoder);
        self
    }

    /// Answer one question. Unanswerable questions come back as a
    /// clarification, never as an error; errors are reserved for the
    /// session and storage layers.
    #[instrument(skip(self), fields(domain = %self.domain))]
    pub async fn answer(&self, question: &str) -> Result<AnswerResult> {
        let started = Instant::now();
        let filters = self.extractor.extract(question).await;
        let extract_ms = started.elapsed().as_millis() as u64;

        if let Some(message) = &filters.clarification {
            info!(%message, "clarification needed");
            return Ok(finish(
                AnswerResult::clarification(question, filters.clone(), message.clone()),
                extract_ms,
                started,
            ));
        }
        if filters.is_empty() {
            let message = format!(
                "I couldn't find anything about {} in that question. \
                 Try naming a subject, a place or a year.",
                self.domain.display_name().to_lowercase()
            );
            return Ok(finish(
                AnswerResult::clarification(question, filters, message),
                extract_ms,
                started,
            ));
        }

        let queries = match self.builder.build(&filters) {
            Ok(queries) => queries,
            Err(QueryError::UnresolvableQuery(message)) => {
                info!(%message, "unresolvable question");
                return Ok(finish(
                    AnswerResult::clarification(question, filters, message),
                    extract_ms,
                    started,
                ));
            }
            Err(err) => return Err(ClimaqlError::Query(err)),
        };

        let query_started = Instant::now();
        let mut results = Vec::with_capacity(queries.len());
        for query in &queries {
            results.push(self.session.run_query(self.domain, query).await?);
        }
        let query_ms = query_started.elapsed().as_millis() as u64;

        let units = self.units_for(&filters);
        let render_started = Instant::now();
        let prose = self.render(question, &filters, &results, &units).await;
        let render_ms = render_started.elapsed().as_millis() as u64;

        Ok(AnswerResult {
            question: question.to_string(),
            filters,
            queries,
            results,
            prose: Some(prose),
            clarification: None,
            stats: AnswerStats {
                extract_ms,
                query_ms,
                render_ms,
                total_ms: started.elapsed().as_millis() as u64,
            },
        })
    }

    async fn render(
        &self,
        question: &str,
        filters: &FilterSet,
        results: &[RowResult],
        units: &[String],
    ) -> String {
        match &self.renderer {
            Some(renderer) => match renderer.render(question, filters, results, units).await {
                Ok(prose) => prose,
                Err(err) => {
                    warn!(%err, "renderer failed; returning rows as-is");
                    degraded_rendering(results)
                }
            },
            None => degraded_rendering(results),
        }
    }

    /// Units of the metrics/gases the question resolved to, for the prompt.
    fn units_for(&self, filters: &FilterSet) -> Vec<String> {
        let mut units = Vec::new();
        for resolved in &filters.categories {
            if let Some(unit) = self
                .lexicon
                .entry(&resolved.canonical_id, resolved.category)
                .and_then(|e| e.unit.clone())
            {
                if !units.contains(&unit) {
                    units.push(unit);
                }
            }
        }
        // Categories without a unit entry still get one for the whole-table
        // money columns of the assistance domain.
        if units.is_empty() && self.domain == Domain::Assistance {
            if !filters.categories_of(Category::IncidentType).is_empty() {
                units.push("$".to_string());
            }
        }
        units
    }
}

fn finish(mut answer: AnswerResult, extract_ms: u64, started: Instant) -> AnswerResult {
    answer.stats.extract_ms = extract_ms;
    answer.stats.total_ms = started.elapsed().as_millis() as u64;
    answer
}
