//! Filter Extractor: turns a free-text question into a [`FilterSet`].
//!
//! Extraction never fails. Anything it cannot recognize is left out of the
//! filter set; an empty set is the caller's signal to ask for clarification
//! instead of dispatching a query. Ambiguous lexicon hits short-circuit the
//! same way, carrying the candidate list in `clarification`.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, instrument};

use crate::domain::Domain;
use crate::geocode::{Geocoder, REANALYSIS_COUNTRY_CODES};
use crate::lexicon::{Category, Lexicon, ResolveOutcome};

use super::time::extract_time;
use super::types::*;

/// Confidence assigned to locations confirmed by the geocoder rather than
/// the lexicon.
const GEOCODER_CONFIDENCE: f32 = 0.7;

/// Most geocoder candidates per question; the fallback is a network call.
const MAX_GEOCODE_CANDIDATES: usize = 3;

static COUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhow\s+many\b|\bnumber\s+of\b").expect("Invalid regex"));
static SUM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\btotal\b|\bsum\b|\bcombined\b|\baltogether\b|\bin\s+all\b")
        .expect("Invalid regex")
});
static AVERAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\baverage\b|\bmean\b|\btypical\b").expect("Invalid regex"));
static COMPARE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcompare\b|\bversus\b|\bvs\.?\b|difference\s+between").expect("Invalid regex")
});

// Comparison phrases bind to a number that follows them; "over 1,000,000",
// "at least 500". Multipliers cover the spoken forms of large amounts.
static COMPARISON_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(more\s+than|greater\s+than|over|exceeding|less\s+than|under|below|at\s+least|at\s+most)\s+\$?([\d,]+(?:\.\d+)?)\s*(thousand|million|billion)?",
    )
    .expect("Invalid regex")
});

/// Question-phrasing words. A window containing one is only ever matched
/// exactly, and a window made entirely of them is never a place-name
/// candidate; uppercase tokens (state and country codes) are exempt from
/// the latter.
static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "what", "is", "was", "were", "are", "the", "in", "of", "for", "at", "on", "and", "or",
        "to", "from", "by", "with", "a", "an", "how", "many", "much", "total", "all", "sum",
        "average", "mean", "compare", "vs", "versus", "between", "since", "after", "before",
        "until", "during", "show", "me", "tell", "about", "did", "does", "do", "per", "year",
        "years", "month", "months", "cost", "costs", "count", "damage", "emissions", "hello",
        "hi", "hey", "there", "it", "this", "that", "which", "when", "where", "had", "has",
        "have", "been", "will", "would", "than", "most", "least", "each",
    ]
    .into_iter()
    .collect()
});

struct Token {
    lower: String,
    all_upper: bool,
}

fn tokenize(question: &str) -> Vec<Token> {
    question
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .map(|w| Token {
            lower: w.to_lowercase(),
            all_upper: w.len() >= 2 && w.chars().all(|c| c.is_ascii_uppercase()),
        })
        .collect()
}

/// Extracts a [`FilterSet`] from question text using a domain lexicon, with
/// an optional geocoder fallback for unknown place names.
pub struct FilterExtractor {
    domain: Domain,
    lexicon: Arc<Lexicon>,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl FilterExtractor {
    pub fn new(domain: Domain, lexicon: Arc<Lexicon>) -> Self {
        Self {
            domain,
            lexicon,
            geocoder: None,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Extract every filter the question supports. Never errors; an empty
    /// or clarification-carrying set is a valid outcome.
    #[instrument(skip(self), fields(domain = %self.domain))]
    pub async fn extract(&self, question: &str) -> FilterSet {
        let mut filters = FilterSet::new(question);
        filters.shape = detect_shape(question);
        filters.time = extract_time(question, self.domain);

        let tokens = tokenize(question);
        let mut used = vec![false; tokens.len()];

        // Categories first so metric/gas words are consumed before the
        // location pass can fuzzy-match them.
        for category in self.categories_to_scan() {
            let scan = self.scan(&tokens, &mut used, category, false);
            for (text, outcome) in scan {
                match outcome {
                    ResolveOutcome::Match(r) => filters.categories.push(ResolvedCategory {
                        canonical_id: r.canonical_id,
                        category,
                        confidence: r.confidence,
                    }),
                    ResolveOutcome::Ambiguous { candidates } => {
                        filters.clarification.get_or_insert(clarification_message(
                            &text, &candidates,
                        ));
                    }
                    ResolveOutcome::NoMatch => unreachable!("scan only yields hits"),
                }
            }
        }

        let location_scan = self.scan(&tokens, &mut used, Category::Location, true);
        for (text, outcome) in location_scan {
            match outcome {
                ResolveOutcome::Match(r) => filters.locations.push(ResolvedLocation {
                    canonical_id: r.canonical_id,
                    confidence: r.confidence,
                    via_geocoder: false,
                }),
                ResolveOutcome::Ambiguous { candidates } => {
                    filters
                        .clarification
                        .get_or_insert(clarification_message(&text, &candidates));
                }
                ResolveOutcome::NoMatch => unreachable!("scan only yields hits"),
            }
        }

        if filters.locations.is_empty() && filters.clarification.is_none() {
            self.geocode_fallback(&tokens, &used, &mut filters).await;
        }

        filters.comparison = extract_comparison(question, &filters);
        debug!(
            locations = filters.locations.len(),
            categories = filters.categories.len(),
            time = ?filters.time,
            shape = ?filters.shape,
            "extraction complete"
        );
        filters
    }

    fn categories_to_scan(&self) -> Vec<Category> {
        match self.domain {
            Domain::DisasterCosts => vec![Category::IncidentType, Category::Metric],
            Domain::Assistance => vec![Category::Metric, Category::IncidentType],
            Domain::Reanalysis => vec![Category::Metric],
            Domain::Emissions => vec![Category::Gas],
        }
    }

    /// Longest-first n-gram scan over unconsumed tokens. Yields every hit
    /// (match or ambiguity) and marks its tokens consumed.
    fn scan(
        &self,
        tokens: &[Token],
        used: &mut [bool],
        category: Category,
        stopword_guard: bool,
    ) -> Vec<(String, ResolveOutcome)> {
        let max_n = self.lexicon.max_surface_words(category).min(tokens.len());
        let mut hits = Vec::new();
        for n in (1..=max_n).rev() {
            let mut start = 0;
            while start + n <= tokens.len() {
                if used[start..start + n].iter().any(|u| *u) {
                    start += 1;
                    continue;
                }
                let window = &tokens[start..start + n];
                if stopword_guard && !location_candidate(window) {
                    start += 1;
                    continue;
                }
                let gram = window
                    .iter()
                    .map(|t| t.lower.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                // Fuzzy scores on bare short words or on windows holding a
                // stopword are phrasing noise; those match exactly or not
                // at all.
                let exact_only = (n == 1 && window[0].lower.len() < 4)
                    || window.iter().any(|t| STOPWORDS.contains(t.lower.as_str()));
                let outcome = if exact_only {
                    match self.lexicon.resolve(&gram, category) {
                        ResolveOutcome::Match(r) if r.confidence == 1.0 => {
                            ResolveOutcome::Match(r)
                        }
                        _ => ResolveOutcome::NoMatch,
                    }
                } else {
                    self.lexicon.resolve(&gram, category)
                };
                match outcome {
                    ResolveOutcome::NoMatch => start += 1,
                    hit => {
                        for slot in &mut used[start..start + n] {
                            *slot = true;
                        }
                        hits.push((gram, hit));
                        start += n;
                    }
                }
            }
        }
        hits
    }

    /// Ask the geocoder about leftover candidate words when the lexicon
    /// recognized no place. Failures only mean no location is added.
    async fn geocode_fallback(&self, tokens: &[Token], used: &[bool], filters: &mut FilterSet) {
        if self.domain != Domain::Reanalysis {
            return;
        }
        let Some(geocoder) = &self.geocoder else {
            return;
        };
        let candidates: Vec<&str> = tokens
            .iter()
            .zip(used)
            .filter(|(t, consumed)| {
                !**consumed
                    && t.lower.len() >= 4
                    && !STOPWORDS.contains(t.lower.as_str())
                    && t.lower.chars().next().is_some_and(|c| c.is_alphabetic())
            })
            .map(|(t, _)| t.lower.as_str())
            .take(MAX_GEOCODE_CANDIDATES)
            .collect();

        for candidate in candidates {
            match geocoder.lookup(candidate, &REANALYSIS_COUNTRY_CODES).await {
                Ok(Some(place)) => {
                    debug!(candidate, place = %place.name, "geocoder confirmed location");
                    filters.locations.push(ResolvedLocation {
                        canonical_id: place.name,
                        confidence: GEOCODER_CONFIDENCE,
                        via_geocoder: true,
                    });
                    return;
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(candidate, %err, "geocoder unavailable");
                    return;
                }
            }
        }
    }
}

/// A token window qualifies as a place-name candidate unless it is entirely
/// stopwords; uppercase tokens (state/country codes) always qualify.
fn location_candidate(window: &[Token]) -> bool {
    window
        .iter()
        .any(|t| t.all_upper || !STOPWORDS.contains(t.lower.as_str()))
}

fn detect_shape(question: &str) -> QuestionShape {
    if COMPARE_PATTERN.is_match(question) {
        QuestionShape::Compare
    } else if COUNT_PATTERN.is_match(question) {
        QuestionShape::Count
    } else if AVERAGE_PATTERN.is_match(question) {
        QuestionShape::Average
    } else if SUM_PATTERN.is_match(question) {
        QuestionShape::Sum
    } else {
        QuestionShape::Lookup
    }
}

fn extract_comparison(question: &str, filters: &FilterSet) -> Option<Comparison> {
    let caps = COMPARISON_PATTERN.captures(question)?;
    let phrase = caps[1].to_lowercase();
    let op = match phrase.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
        "more than" | "greater than" | "over" | "exceeding" => CmpOp::Gt,
        "less than" | "under" | "below" => CmpOp::Lt,
        "at least" => CmpOp::Ge,
        "at most" => CmpOp::Le,
        _ => return None,
    };
    let raw = caps[2].replace(',', "");
    let mut value: f64 = raw.parse().ok()?;
    match caps.get(3).map(|m| m.as_str().to_lowercase()) {
        Some(m) if m == "thousand" => value *= 1e3,
        Some(m) if m == "million" => value *= 1e6,
        Some(m) if m == "billion" => value *= 1e9,
        _ => {}
    }

    // A bare 4-digit number already claimed as the year is time language,
    // not a threshold ("after 2015").
    if let Some(TimeFilter::Point { year, .. } | TimeFilter::Range { start: year, .. }) =
        filters.time
    {
        if caps.get(3).is_none() && value == f64::from(year) {
            return None;
        }
    }

    let column_hint = filters
        .categories_of(Category::Metric)
        .first()
        .map(|c| c.canonical_id.clone());
    Some(Comparison {
        op,
        value,
        column_hint,
    })
}

fn clarification_message(text: &str, candidates: &[String]) -> String {
    format!("'{}' is ambiguous: did you mean {}?", text, candidates.join(" or "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::geocode::GeocodedPlace;
    use crate::lexicon::lexicon_for;
    use async_trait::async_trait;

    fn extractor(domain: Domain) -> FilterExtractor {
        FilterExtractor::new(domain, Arc::new(lexicon_for(domain, 0.85, 0.02)))
    }

    struct OneCityGeocoder(&'static str);

    #[async_trait]
    impl Geocoder for OneCityGeocoder {
        async fn lookup(
            &self,
            candidate: &str,
            _codes: &[&str],
        ) -> Result<Option<GeocodedPlace>, CollaboratorError> {
            Ok((candidate.eq_ignore_ascii_case(self.0)).then(|| GeocodedPlace {
                name: self.0.to_string(),
                latitude: 27.3,
                longitude: 88.6,
            }))
        }
    }

    #[tokio::test]
    async fn test_assistance_full_extraction() {
        let filters = extractor(Domain::Assistance)
            .extract("What was the total IHP total for hurricanes in Texas in 2017?")
            .await;
        assert_eq!(filters.shape, QuestionShape::Sum);
        assert_eq!(filters.time, Some(TimeFilter::point(2017)));
        assert_eq!(filters.locations.len(), 1);
        assert_eq!(filters.locations[0].canonical_id, "TX");
        let metrics = filters.categories_of(Category::Metric);
        assert_eq!(metrics[0].canonical_id, "ihp_total");
        let incidents = filters.categories_of(Category::IncidentType);
        assert_eq!(incidents[0].canonical_id, "Hurricane");
    }

    #[tokio::test]
    async fn test_location_survives_adjacent_incident_word() {
        let filters = extractor(Domain::Assistance)
            .extract("What was the IHP total for Texas hurricanes in 2012?")
            .await;
        assert_eq!(filters.locations.len(), 1);
        assert_eq!(filters.locations[0].canonical_id, "TX");
        assert_eq!(filters.categories_of(Category::Metric).len(), 1);
        assert_eq!(
            filters.categories_of(Category::IncidentType)[0].canonical_id,
            "Hurricane"
        );
        assert_eq!(filters.time, Some(TimeFilter::point(2012)));
    }

    #[tokio::test]
    async fn test_state_name_is_not_an_incident() {
        let filters = extractor(Domain::Assistance)
            .extract("total assistance for Florida in 2017")
            .await;
        assert_eq!(filters.locations.len(), 1);
        assert_eq!(filters.locations[0].canonical_id, "FL");
        assert!(filters.categories_of(Category::IncidentType).is_empty());
    }

    #[tokio::test]
    async fn test_small_talk_yields_empty_set() {
        let filters = extractor(Domain::Emissions).extract("hello there, how are you?").await;
        assert!(filters.is_empty(), "got {:?}", filters);
        assert!(filters.clarification.is_none());
    }

    #[tokio::test]
    async fn test_stopword_are_does_not_match_uae() {
        let filters = extractor(Domain::Emissions)
            .extract("what are the methane emissions of India")
            .await;
        assert_eq!(filters.locations.len(), 1);
        assert_eq!(filters.locations[0].canonical_id, "India");
    }

    #[tokio::test]
    async fn test_uppercase_code_resolves() {
        let filters = extractor(Domain::Emissions).extract("CO2 emissions for USA in 2020").await;
        assert_eq!(filters.locations[0].canonical_id, "United States");
        assert_eq!(filters.categories[0].canonical_id, "co2_emissions");
    }

    #[tokio::test]
    async fn test_compare_shape_with_two_locations() {
        let filters = extractor(Domain::Emissions)
            .extract("compare co2 emissions of India and China in 2019")
            .await;
        assert_eq!(filters.shape, QuestionShape::Compare);
        let ids: Vec<_> = filters.locations.iter().map(|l| l.canonical_id.as_str()).collect();
        assert!(ids.contains(&"India") && ids.contains(&"China"));
    }

    #[tokio::test]
    async fn test_comparison_phrase_with_multiplier() {
        let filters = extractor(Domain::Assistance)
            .extract("events in Florida with ihp total more than 2 million")
            .await;
        let cmp = filters.comparison.unwrap();
        assert_eq!(cmp.op, CmpOp::Gt);
        assert_eq!(cmp.value, 2_000_000.0);
        assert_eq!(cmp.column_hint.as_deref(), Some("ihp_total"));
    }

    #[tokio::test]
    async fn test_directional_year_is_not_a_threshold() {
        let filters = extractor(Domain::Assistance).extract("floods in Texas after 2015").await;
        assert_eq!(filters.time, Some(TimeFilter::range(2016, 2024)));
        assert!(filters.comparison.is_none());
    }

    #[tokio::test]
    async fn test_geocoder_fallback_for_unknown_city() {
        let ext = extractor(Domain::Reanalysis)
            .with_geocoder(Arc::new(OneCityGeocoder("gangtok")));
        let filters = ext.extract("wind speed in Gangtok in 2001").await;
        assert_eq!(filters.locations.len(), 1);
        assert!(filters.locations[0].via_geocoder);
        assert_eq!(filters.categories[0].canonical_id, "wind_speed");
    }

    #[tokio::test]
    async fn test_no_geocoder_no_location() {
        let filters = extractor(Domain::Reanalysis)
            .extract("wind speed in Gangtok in 2001")
            .await;
        assert!(filters.locations.is_empty());
        // The rest of the question still extracted.
        assert_eq!(filters.time, Some(TimeFilter::point(2001)));
    }

    #[tokio::test]
    async fn test_reanalysis_metric_and_city() {
        let filters = extractor(Domain::Reanalysis)
            .extract("average skin temperature in Kathmandu between 1990 and 2000")
            .await;
        assert_eq!(filters.shape, QuestionShape::Average);
        assert_eq!(filters.locations[0].canonical_id, "Kathmandu");
        assert_eq!(filters.categories[0].canonical_id, "skin_temperature");
        assert_eq!(filters.time, Some(TimeFilter::range(1990, 2000)));
    }

    #[tokio::test]
    async fn test_hurricane_alias_in_costs_domain() {
        let filters = extractor(Domain::DisasterCosts)
            .extract("how many hurricanes were there in 1992")
            .await;
        assert_eq!(filters.shape, QuestionShape::Count);
        assert_eq!(
            filters.categories_of(Category::IncidentType)[0].canonical_id,
            "Tropical Cyclone"
        );
    }
}
