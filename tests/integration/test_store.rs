//! Storage-layer tests over the wide and split table layouts.

use std::sync::Arc;

use climaql::lexicon::{builder_for, lexicon_for};
use climaql::query::{Aggregation, Predicate, PredicateValue, ResolvedQuery};
use climaql::{Category, DatasetStore, Domain, ResolveOutcome};

/// Emissions tables carry one REAL column per year; only the years a test
/// touches need values, the rest stay NULL.
fn emissions_store() -> DatasetStore {
    let year_columns: Vec<String> = (1970..=2024).map(|y| format!("\"{y}\" REAL")).collect();
    let seed = format!(
        r#"
        CREATE TABLE ch4_emissions (
            "Name" TEXT, "Country_code_A3" TEXT, "Substance" TEXT, {columns}
        );
        INSERT INTO ch4_emissions ("Name", "Country_code_A3", "Substance", "2019", "2020")
        VALUES ('India', 'IND', 'CH4', 31.0, 33.5),
               ('China', 'CHN', 'CH4', 55.2, 54.8);
        "#,
        columns = year_columns.join(", ")
    );
    let lexicon = Arc::new(lexicon_for(Domain::Emissions, 0.85, 0.02));
    DatasetStore::open_in_memory(Domain::Emissions, lexicon, &seed, 100).unwrap()
}

fn reanalysis_store() -> DatasetStore {
    let seed = r#"
        CREATE TABLE nepal_df0 (
            "City" TEXT, "date" TEXT, "latitude" REAL, "longitude" REAL,
            "high_vegetation_cover" REAL, "surface_pressure" REAL,
            "total_ozone" REAL, "wind_speed" REAL, "skin_temperature" REAL
        );
        INSERT INTO nepal_df0 ("City", "date", "skin_temperature")
        VALUES ('Kathmandu', '1998-03-01', 288.4),
               ('Kathmandu', '1998-04-01', 291.0),
               ('Kathmandu', '1999-03-01', 287.9),
               ('Birgunj', '1998-03-01', 295.1);
    "#;
    let lexicon = Arc::new(lexicon_for(Domain::Reanalysis, 0.85, 0.02));
    DatasetStore::open_in_memory(Domain::Reanalysis, lexicon, seed, 100).unwrap()
}

#[test]
fn sum_over_year_columns_labels_each_column() {
    let store = emissions_store();
    let query = ResolvedQuery::new("ch4_emissions", vec!["2019".into(), "2020".into()])
        .with_predicate(Predicate::eq("Name", PredicateValue::Text("India".into())))
        .with_aggregation(Aggregation::Sum);
    let result = store.run_query(&query).unwrap();
    assert_eq!(result.columns, vec!["sum_2019", "sum_2020"]);
    assert_eq!(result.rows[0], vec![serde_json::json!(31.0), serde_json::json!(33.5)]);
}

#[test]
fn null_year_values_come_back_as_null() {
    let store = emissions_store();
    let query = ResolvedQuery::new("ch4_emissions", vec!["1970".into()])
        .with_predicate(Predicate::eq("Name", PredicateValue::Text("India".into())));
    let result = store.run_query(&query).unwrap();
    assert_eq!(result.rows[0][0], serde_json::Value::Null);
}

#[test]
fn date_prefix_narrows_to_one_month() {
    let store = reanalysis_store();
    let query = ResolvedQuery::new(
        "nepal_df0",
        vec!["City".into(), "date".into(), "skin_temperature".into()],
    )
    .with_predicate(Predicate::eq("City", PredicateValue::Text("Kathmandu".into())))
    .with_predicate(Predicate::like_prefix("date", "1998-03"));
    let result = store.run_query(&query).unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][2], serde_json::json!(288.4));
}

#[test]
fn year_prefix_spans_the_whole_year() {
    let store = reanalysis_store();
    let query = ResolvedQuery::new("nepal_df0", vec!["skin_temperature".into()])
        .with_predicate(Predicate::eq("City", PredicateValue::Text("Kathmandu".into())))
        .with_predicate(Predicate::like_prefix("date", "1998-"));
    let result = store.run_query(&query).unwrap();
    assert_eq!(result.row_count, 2);
}

#[test]
fn distinct_city_values_seed_the_lexicon() {
    let store = reanalysis_store();
    let cities = store.distinct_values("nepal_df0", "City").unwrap();
    assert_eq!(cities, vec!["Birgunj", "Kathmandu"]);

    // Birgunj is not in the static vocabulary; after seeding it resolves.
    let mut builder = builder_for(Domain::Reanalysis, 0.85, 0.02);
    for city in &cities {
        builder = builder.seed_surfaces(
            Category::Location,
            city,
            &[],
            &["nepal_df0".to_string(), "nepal_df1".to_string()],
        );
    }
    let lexicon = builder.build();
    match lexicon.resolve("birgunj", Category::Location) {
        ResolveOutcome::Match(r) => assert_eq!(r.canonical_id, "Birgunj"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(lexicon.tables_for("Birgunj").contains("nepal_df0"));
}

#[test]
fn open_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let lexicon = Arc::new(lexicon_for(Domain::Emissions, 0.85, 0.02));
    let result = DatasetStore::open(
        Domain::Emissions,
        dir.path().join("missing.db"),
        lexicon,
        100,
    );
    assert!(result.is_err());
}
