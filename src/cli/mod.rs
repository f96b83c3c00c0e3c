//! Command handlers for the climaql command-line interface.
//!
//! Commands execute either locally (opening the datasets in-process) or
//! remotely (spawning a query service and talking MCP over its stdio).

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::warn;

use climaql::config::Config;
use climaql::domain::Domain;
use climaql::geocode::NominatimGeocoder;
use climaql::lexicon::vocab::{builder_for, EMISSION_TABLES, REANALYSIS_COUNTRIES};
use climaql::lexicon::{lexicon_for, Category, Lexicon};
use climaql::query::QuestionPipeline;
use climaql::render::ChatCompletionsRenderer;
use climaql::session::{LocalSession, McpSession, QuerySession};
use climaql::store::DatasetStore;

/// Where commands execute.
pub enum ExecutionMode {
    /// Open the configured datasets in-process.
    Local(Box<Config>),
    /// Spawn `command` (whitespace-split) as a query service child process.
    Remote(Box<Config>, String),
}

impl ExecutionMode {
    fn config(&self) -> &Config {
        match self {
            ExecutionMode::Local(config) | ExecutionMode::Remote(config, _) => config,
        }
    }

    async fn session(&self) -> Result<Arc<dyn QuerySession>> {
        match self {
            ExecutionMode::Local(config) => {
                let stores = open_stores(config)?;
                if stores.is_empty() {
                    return Err(anyhow!("no datasets configured; add a [datasets] section"));
                }
                Ok(Arc::new(LocalSession::new(stores)))
            }
            ExecutionMode::Remote(_, command) => {
                let mut parts = command.split_whitespace();
                let program = parts.next().ok_or_else(|| anyhow!("empty remote command"))?;
                let args: Vec<String> = parts.map(str::to_string).collect();
                let session = McpSession::spawn(program, &args).await?;
                Ok(Arc::new(session))
            }
        }
    }
}

/// Open a store for every configured domain.
pub fn open_stores(config: &Config) -> Result<HashMap<Domain, Arc<DatasetStore>>> {
    let mut stores = HashMap::new();
    for domain in config.configured_domains() {
        let path = config.dataset_path(domain)?;
        let lexicon = Arc::new(lexicon_for(
            domain,
            config.extraction.similarity_threshold,
            config.extraction.ambiguity_margin,
        ));
        let store = DatasetStore::open(domain, &path, lexicon, config.service.row_ceiling)
            .with_context(|| format!("opening {domain} dataset"))?;
        stores.insert(domain, Arc::new(store));
    }
    Ok(stores)
}

/// Build the extraction lexicon, optionally widened with location names read
/// from the dataset (country names for emissions, city names for
/// reanalysis). Seeding failures fall back to the static vocabulary.
async fn seeded_lexicon(
    domain: Domain,
    config: &Config,
    session: &Arc<dyn QuerySession>,
) -> Lexicon {
    let threshold = config.extraction.similarity_threshold;
    let margin = config.extraction.ambiguity_margin;
    if !config.extraction.seed_locations {
        return lexicon_for(domain, threshold, margin);
    }

    let mut builder = builder_for(domain, threshold, margin);
    let seeds: Vec<(String, &str)> = match domain {
        Domain::Emissions => EMISSION_TABLES
            .iter()
            .map(|t| (t.to_string(), "Name"))
            .collect(),
        Domain::Reanalysis => REANALYSIS_COUNTRIES
            .iter()
            .flat_map(|c| [(format!("{c}_df0"), "City"), (format!("{c}_df1"), "City")])
            .collect(),
        _ => Vec::new(),
    };
    for (table, column) in seeds {
        match session.distinct_values(domain, &table, column).await {
            Ok(values) => {
                for value in values {
                    builder = builder.seed_surfaces(
                        Category::Location,
                        &value,
                        &[],
                        &[table.clone()],
                    );
                }
            }
            Err(err) => {
                warn!(%table, %err, "location seeding skipped");
            }
        }
    }
    builder.build()
}

async fn pipeline_for(
    domain: Domain,
    config: &Config,
    session: Arc<dyn QuerySession>,
) -> Result<QuestionPipeline> {
    let lexicon = Arc::new(seeded_lexicon(domain, config, &session).await);
    let mut pipeline =
        QuestionPipeline::new(domain, lexicon, session, config.service.row_ceiling);

    if config.render.enabled {
        let (user, key) = config.render.credentials()?;
        let renderer = ChatCompletionsRenderer::new(
            &config.render.url,
            &config.render.model,
            user,
            key,
            config.render.timeout_secs,
        )?;
        pipeline = pipeline.with_renderer(Arc::new(renderer));
    }
    if config.geocode.enabled && domain == Domain::Reanalysis {
        let geocoder = NominatimGeocoder::new(
            &config.geocode.url,
            &config.geocode.user_agent,
            config.geocode.timeout_secs,
        )?;
        pipeline = pipeline.with_geocoder(Arc::new(geocoder));
    }
    Ok(pipeline)
}

/// Ask a question against one domain.
pub async fn run_ask(mode: ExecutionMode, domain: Domain, question: &str, json: bool) -> Result<()> {
    let session = mode.session().await?;
    let pipeline = pipeline_for(domain, mode.config(), session).await?;
    let answer = pipeline.answer(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }
    if let Some(message) = &answer.clarification {
        println!("{message}");
        return Ok(());
    }
    if let Some(prose) = &answer.prose {
        println!("{prose}");
    }
    println!(
        "({} queries, {} rows, {} ms)",
        answer.queries.len(),
        answer.results.iter().map(|r| r.row_count).sum::<usize>(),
        answer.stats.total_ms
    );
    Ok(())
}

/// List the tables a domain serves.
pub async fn run_tables(mode: ExecutionMode, domain: Domain, json: bool) -> Result<()> {
    let session = mode.session().await?;
    let tables = session.list_tables(domain).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
    } else {
        for table in tables {
            println!("{table}");
        }
    }
    Ok(())
}

/// Describe one table's columns.
pub async fn run_describe(mode: ExecutionMode, domain: Domain, table: &str, json: bool) -> Result<()> {
    let session = mode.session().await?;
    let schema = session.describe_table(domain, table).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else {
        println!("{}", schema.name);
        for column in &schema.columns {
            println!("  {} {}", column.name, column.ty.sql_name());
        }
    }
    Ok(())
}

/// Print the first rows of a table.
pub async fn run_sample(
    mode: ExecutionMode,
    domain: Domain,
    table: &str,
    count: u32,
    json: bool,
) -> Result<()> {
    let session = mode.session().await?;
    let result = session.sample(domain, table, count).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", climaql::render::degraded_rendering(std::slice::from_ref(&result)));
    }
    Ok(())
}
