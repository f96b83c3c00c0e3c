//! Domain profiles for the four supported datasets.
//!
//! Each domain shares the same engine (lexicon, extractor, builder, service)
//! and differs only in vocabulary, schema, year bounds and the minimum set of
//! filters a question must resolve before a query can be built.

use serde::{Deserialize, Serialize};

use crate::lexicon::Category;

/// The dataset domain a question is asked against.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "kebab-case")]
pub enum Domain {
    /// Billion-dollar disaster counts and costs per year.
    DisasterCosts,
    /// FEMA/HUD disaster assistance records.
    Assistance,
    /// ERA5 monthly climate reanalysis for South Asia.
    Reanalysis,
    /// EDGAR greenhouse-gas emissions per gas and country.
    Emissions,
}

impl Domain {
    /// All supported domains.
    pub const ALL: [Domain; 4] = [
        Domain::DisasterCosts,
        Domain::Assistance,
        Domain::Reanalysis,
        Domain::Emissions,
    ];

    /// Inclusive year range accepted by the time extractor.
    pub fn year_bounds(&self) -> (u16, u16) {
        match self {
            Domain::DisasterCosts => (1980, 2024),
            Domain::Assistance => (1980, 2024),
            Domain::Reanalysis => (1940, 2024),
            Domain::Emissions => (1970, 2024),
        }
    }

    /// The category the domain's metric vocabulary lives in.
    pub fn primary_category(&self) -> Category {
        match self {
            Domain::Emissions => Category::Gas,
            _ => Category::Metric,
        }
    }

    /// Whether the domain's date column stores `YYYY-MM-DD` text, so point
    /// years and months become prefix matches instead of equality.
    pub fn uses_date_text(&self) -> bool {
        matches!(self, Domain::Reanalysis)
    }

    /// Configuration key and default file name for the domain's dataset.
    pub fn dataset_key(&self) -> &'static str {
        match self {
            Domain::DisasterCosts => "disaster_costs",
            Domain::Assistance => "assistance",
            Domain::Reanalysis => "reanalysis",
            Domain::Emissions => "emissions",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Domain::DisasterCosts => "Disaster Costs",
            Domain::Assistance => "Disaster Assistance",
            Domain::Reanalysis => "Climate Reanalysis",
            Domain::Emissions => "GHG Emissions",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dataset_key())
    }
}
