//! Lexicon & Schema Registry.
//!
//! Maps domain vocabulary (place names, metric names, gas names, incident
//! types) to canonical identifiers and the tables that hold them. Built once
//! at process start from a fixed vocabulary, optionally seeded with names
//! read from the dataset, and immutable afterwards; safe for concurrent
//! reads behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::schema::TableSchema;

/// Vocabulary category a surface form belongs to.
///
/// Collisions across categories are allowed and resolved by the extraction
/// context; within a category a surface form maps to exactly one canonical
/// identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Location,
    Metric,
    Gas,
    IncidentType,
}

/// A registered vocabulary entry.
#[derive(Debug, Clone)]
pub struct LexiconEntry {
    pub canonical_id: String,
    pub category: Category,
    pub surface_forms: Vec<String>,
    pub table_affinity: BTreeSet<String>,
    /// Unit echoed into rendering prompts, when the entry names a measure.
    pub unit: Option<String>,
    /// Concrete column the entry maps to, when it is a per-row measure.
    pub column: Option<String>,
}

/// Outcome of a lexicon resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Match(Resolution),
    /// The top two fuzzy candidates tied within the margin. Ties never
    /// silently pick one; the caller turns this into a clarification.
    Ambiguous { candidates: Vec<String> },
    NoMatch,
}

/// A successful resolution to a canonical identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub canonical_id: String,
    pub confidence: f32,
}

/// Lower-case and whitespace-normalize a surface form. Punctuation other
/// than embedded hyphens becomes a word break, matching the question
/// tokenizer.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if ch.is_alphanumeric() || ch == '-' {
            out.push(ch);
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Two texts are worth a similarity score only when they have the same word
/// count and lengths within a fifth of each other; the Winkler prefix boost
/// otherwise lifts a text that merely starts like a surface form over the
/// threshold ("florida" against "flood", "hurricanes in texas" against
/// "hurricane").
fn fuzzy_comparable(needle: &str, needle_words: usize, surface: &str) -> bool {
    if surface.split(' ').count() != needle_words {
        return false;
    }
    let (shorter, longer) = if needle.len() <= surface.len() {
        (needle.len(), surface.len())
    } else {
        (surface.len(), needle.len())
    };
    shorter * 5 >= longer * 4
}

/// Immutable vocabulary and schema registry.
pub struct Lexicon {
    entries: Vec<LexiconEntry>,
    /// (category, normalized surface form) -> entry index.
    surface_index: HashMap<(Category, String), usize>,
    tables: BTreeMap<String, TableSchema>,
    similarity_threshold: f64,
    ambiguity_margin: f64,
}

impl Lexicon {
    pub fn builder() -> LexiconBuilder {
        LexiconBuilder::default()
    }

    /// Resolve a surface text to a canonical identifier within a category.
    ///
    /// Resolution order: exact case-insensitive match, then Jaro-Winkler
    /// similarity at or above the configured threshold. A tie between two
    /// distinct canonical ids within the ambiguity margin is `Ambiguous`.
    pub fn resolve(&self, text: &str, category: Category) -> ResolveOutcome {
        let needle = normalize(text);
        if needle.is_empty() {
            return ResolveOutcome::NoMatch;
        }

        if let Some(&idx) = self.surface_index.get(&(category, needle.clone())) {
            return ResolveOutcome::Match(Resolution {
                canonical_id: self.entries[idx].canonical_id.clone(),
                confidence: 1.0,
            });
        }

        // Fuzzy pass: best score per canonical id across the comparable
        // surface forms.
        let needle_words = needle.split(' ').count();
        let mut best: Option<(f64, &str)> = None;
        let mut second: Option<(f64, &str)> = None;
        for entry in self.entries.iter().filter(|e| e.category == category) {
            let score = entry
                .surface_forms
                .iter()
                .filter(|s| fuzzy_comparable(&needle, needle_words, s))
                .map(|s| strsim::jaro_winkler(&needle, s))
                .fold(0.0_f64, f64::max);
            if score < self.similarity_threshold {
                continue;
            }
            match best {
                Some((top, id)) if id == entry.canonical_id => {
                    if score > top {
                        best = Some((score, &entry.canonical_id));
                    }
                }
                Some((top, _)) if score > top => {
                    second = best;
                    best = Some((score, &entry.canonical_id));
                }
                Some(_) => {
                    if second.map_or(true, |(s, _)| score > s) {
                        second = Some((score, &entry.canonical_id));
                    }
                }
                None => best = Some((score, &entry.canonical_id)),
            }
        }

        match (best, second) {
            (Some((top, id)), Some((runner_up, other)))
                if id != other && (top - runner_up) < self.ambiguity_margin =>
            {
                ResolveOutcome::Ambiguous {
                    candidates: vec![id.to_string(), other.to_string()],
                }
            }
            (Some((top, id)), _) => ResolveOutcome::Match(Resolution {
                canonical_id: id.to_string(),
                confidence: top as f32,
            }),
            (None, _) => ResolveOutcome::NoMatch,
        }
    }

    /// Tables that hold data for a canonical identifier.
    pub fn tables_for(&self, canonical_id: &str) -> BTreeSet<String> {
        let mut tables = BTreeSet::new();
        for entry in &self.entries {
            if entry.canonical_id == canonical_id {
                tables.extend(entry.table_affinity.iter().cloned());
            }
        }
        tables
    }

    /// Full schema of a registered table.
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Names of all registered tables, in lexical order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// The entry behind a canonical identifier within a category.
    pub fn entry(&self, canonical_id: &str, category: Category) -> Option<&LexiconEntry> {
        self.entries
            .iter()
            .find(|e| e.category == category && e.canonical_id == canonical_id)
    }

    /// Longest registered surface form (in words) for a category; bounds the
    /// extractor's n-gram scan.
    pub fn max_surface_words(&self, category: Category) -> usize {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .flat_map(|e| e.surface_forms.iter())
            .map(|s| s.split(' ').count())
            .max()
            .unwrap_or(1)
    }
}

/// Builder for the immutable [`Lexicon`].
pub struct LexiconBuilder {
    entries: Vec<LexiconEntry>,
    tables: BTreeMap<String, TableSchema>,
    similarity_threshold: f64,
    ambiguity_margin: f64,
}

impl Default for LexiconBuilder {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            tables: BTreeMap::new(),
            similarity_threshold: 0.85,
            ambiguity_margin: 0.02,
        }
    }
}

impl LexiconBuilder {
    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn ambiguity_margin(mut self, margin: f64) -> Self {
        self.ambiguity_margin = margin;
        self
    }

    /// Register a vocabulary entry. Surface forms are normalized here; the
    /// canonical id itself is always registered as a surface form.
    pub fn entry(
        mut self,
        category: Category,
        canonical_id: impl Into<String>,
        surfaces: &[&str],
        tables: &[&str],
    ) -> Self {
        let canonical_id = canonical_id.into();
        let mut surface_forms: Vec<String> = Vec::with_capacity(surfaces.len() + 1);
        surface_forms.push(normalize(&canonical_id));
        for s in surfaces {
            let n = normalize(s);
            if !n.is_empty() && !surface_forms.contains(&n) {
                surface_forms.push(n);
            }
        }
        self.entries.push(LexiconEntry {
            canonical_id,
            category,
            surface_forms,
            table_affinity: tables.iter().map(|t| t.to_string()).collect(),
            unit: None,
            column: None,
        });
        self
    }

    /// Register a measure entry carrying a unit and a concrete column.
    pub fn measure(
        self,
        category: Category,
        canonical_id: &str,
        surfaces: &[&str],
        tables: &[&str],
        column: Option<&str>,
        unit: &str,
    ) -> Self {
        let mut b = self.entry(category, canonical_id, surfaces, tables);
        let entry = b.entries.last_mut().expect("entry just pushed");
        entry.unit = Some(unit.to_string());
        entry.column = column.map(str::to_string);
        b
    }

    /// Register a table schema.
    pub fn table(mut self, schema: TableSchema) -> Self {
        self.tables.insert(schema.name.clone(), schema);
        self
    }

    /// Extend an existing entry (or add a plain one) with additional surface
    /// forms discovered at startup, e.g. distinct city names read from the
    /// dataset. Only valid before `build`.
    pub fn seed_surfaces(
        mut self,
        category: Category,
        canonical_id: &str,
        surfaces: &[String],
        tables: &[String],
    ) -> Self {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.category == category && e.canonical_id == canonical_id)
        {
            for s in surfaces {
                let n = normalize(s);
                if !n.is_empty() && !entry.surface_forms.contains(&n) {
                    entry.surface_forms.push(n);
                }
            }
            entry.table_affinity.extend(tables.iter().cloned());
        } else {
            let table_refs: Vec<&str> = tables.iter().map(String::as_str).collect();
            let surface_refs: Vec<&str> = surfaces.iter().map(String::as_str).collect();
            self = self.entry(category, canonical_id, &surface_refs, &table_refs);
        }
        self
    }

    pub fn build(self) -> Lexicon {
        let mut surface_index = HashMap::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            for surface in &entry.surface_forms {
                // First registration wins within a category; duplicates are
                // a vocabulary bug, not a runtime condition.
                surface_index
                    .entry((entry.category, surface.clone()))
                    .or_insert(idx);
            }
        }
        Lexicon {
            entries: self.entries,
            surface_index,
            tables: self.tables,
            similarity_threshold: self.similarity_threshold,
            ambiguity_margin: self.ambiguity_margin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_lexicon() -> Lexicon {
        Lexicon::builder()
            .entry(Category::Location, "Delhi", &["new delhi"], &["india_df0"])
            .entry(Category::Location, "Dhaka", &[], &["bangladesh_df0"])
            .entry(
                Category::IncidentType,
                "Hurricane",
                &["hurricanes"],
                &["disaster_dollar_db"],
            )
            .entry(
                Category::IncidentType,
                "Severe Storm",
                &["storm"],
                &["disaster_dollar_db"],
            )
            .build()
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let lex = test_lexicon();
        let outcome = lex.resolve("DELHI", Category::Location);
        match outcome {
            ResolveOutcome::Match(r) => {
                assert_eq!(r.canonical_id, "Delhi");
                assert_eq!(r.confidence, 1.0);
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_fuzzy_match_within_threshold() {
        let lex = test_lexicon();
        // One dropped letter stays well above the Jaro-Winkler threshold.
        match lex.resolve("delhhi", Category::Location) {
            ResolveOutcome::Match(r) => {
                assert_eq!(r.canonical_id, "Delhi");
                assert!(r.confidence < 1.0);
            }
            other => panic!("expected fuzzy match, got {:?}", other),
        }
    }

    #[test]
    fn test_no_match_beyond_threshold() {
        let lex = test_lexicon();
        assert_eq!(
            lex.resolve("reykjavik", Category::Location),
            ResolveOutcome::NoMatch
        );
    }

    #[test]
    fn test_equidistant_candidates_are_ambiguous() {
        let lex = Lexicon::builder()
            .entry(Category::Location, "Mardan", &[], &["t1"])
            .entry(Category::Location, "Marden", &[], &["t1"])
            .build();
        // One substitution away from both canonical forms.
        match lex.resolve("mardin", Category::Location) {
            ResolveOutcome::Ambiguous { candidates } => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_fuzzy_requires_matching_word_count() {
        let lex = test_lexicon();
        // "severe" scores 0.9 against "severe storm" on the shared prefix
        // alone; a one-word text must not resolve to a two-word surface.
        assert_eq!(
            lex.resolve("severe", Category::IncidentType),
            ResolveOutcome::NoMatch
        );
    }

    #[test]
    fn test_fuzzy_rejects_length_mismatch() {
        let lex = Lexicon::builder()
            .entry(
                Category::IncidentType,
                "Flood",
                &["floods", "flooding"],
                &["t1"],
            )
            .build();
        // "florida" sits at 0.853 against "flood" with the prefix boost.
        assert_eq!(
            lex.resolve("florida", Category::IncidentType),
            ResolveOutcome::NoMatch
        );
    }

    #[test]
    fn test_category_isolation() {
        let lex = test_lexicon();
        assert_eq!(
            lex.resolve("Delhi", Category::IncidentType),
            ResolveOutcome::NoMatch
        );
    }

    #[test]
    fn test_tables_for() {
        let lex = test_lexicon();
        let tables = lex.tables_for("Delhi");
        assert!(tables.contains("india_df0"));
        assert!(lex.tables_for("Atlantis").is_empty());
    }

    #[test]
    fn test_normalize_strips_punctuation_keeps_hyphens() {
        assert_eq!(normalize("  Mazar-i-Sharif,  please? "), "mazar-i-sharif please");
        assert_eq!(normalize("What's up"), "what s up");
    }

    #[test]
    fn test_seeded_surfaces_resolve() {
        let lex = Lexicon::builder()
            .entry(Category::Location, "Delhi", &[], &["india_df0"])
            .seed_surfaces(
                Category::Location,
                "Delhi",
                &["dilli".to_string()],
                &["india_df1".to_string()],
            )
            .build();
        assert!(matches!(
            lex.resolve("dilli", Category::Location),
            ResolveOutcome::Match(_)
        ));
        assert!(lex.tables_for("Delhi").contains("india_df1"));
    }
}
