//! End-to-end question flows: free text in, rows out.

use std::collections::HashMap;
use std::sync::Arc;

use climaql::lexicon::lexicon_for;
use climaql::{DatasetStore, Domain, LocalSession, QuestionPipeline};

fn pipeline(domain: Domain, seed: &str) -> QuestionPipeline {
    let lexicon = Arc::new(lexicon_for(domain, 0.85, 0.02));
    let store = DatasetStore::open_in_memory(domain, lexicon.clone(), seed, 100).unwrap();
    let mut stores = HashMap::new();
    stores.insert(domain, Arc::new(store));
    QuestionPipeline::new(domain, lexicon, Arc::new(LocalSession::new(stores)), 100)
}

fn costs_pipeline() -> QuestionPipeline {
    let seed = r#"
        CREATE TABLE disaster_records (
            "Year" INTEGER,
            "Drought Count" INTEGER, "Drought Cost" REAL,
            "Flooding Count" INTEGER, "Flooding Cost" REAL,
            "Freeze Count" INTEGER, "Freeze Cost" REAL,
            "Severe Storm Count" INTEGER, "Severe Storm Cost" REAL,
            "Tropical Cyclone Count" INTEGER, "Tropical Cyclone Cost" REAL,
            "Wildfire Count" INTEGER, "Wildfire Cost" REAL,
            "Winter Storm Count" INTEGER, "Winter Storm Cost" REAL,
            "Total_Disaster_Count" INTEGER, "Total_Disaster_Cost" REAL
        );
        INSERT INTO disaster_records
            ("Year", "Tropical Cyclone Count", "Tropical Cyclone Cost",
             "Wildfire Count", "Wildfire Cost",
             "Total_Disaster_Count", "Total_Disaster_Cost")
        VALUES
            (1992, 1, 27.0, 0, 0.0, 4, 31.3),
            (2000, 0, 0.0, 1, 2.0, 3, 8.0),
            (2005, 3, 115.0, 1, 3.5, 9, 160.0),
            (2010, 0, 0.0, 2, 4.5, 5, 12.0),
            (2011, 1, 10.0, 3, 9.9, 14, 55.0);
    "#;
    pipeline(Domain::DisasterCosts, seed)
}

fn assistance_pipeline() -> QuestionPipeline {
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
    pipeline(Domain::Assistance, seed)
}

#[tokio::test]
async fn costs_count_question_reads_the_year_row() {
    let answer = costs_pipeline()
        .answer("How many hurricanes were there in 1992?")
        .await
        .unwrap();
    assert!(answer.clarification.is_none());
    assert_eq!(answer.queries.len(), 1);
    // A point year reads the row as-is: Year plus the count column.
    assert_eq!(answer.results[0].rows[0][0], serde_json::json!(1992));
    assert_eq!(answer.results[0].rows[0][1], serde_json::json!(1));
}

#[tokio::test]
async fn costs_range_sums_the_cost_column() {
    let answer = costs_pipeline()
        .answer("What was the total wildfire damage from 2000 to 2010?")
        .await
        .unwrap();
    assert!(answer.clarification.is_none());
    let query = &answer.queries[0];
    assert_eq!(query.table, "disaster_records");
    assert_eq!(query.columns, vec!["Wildfire Cost"]);
    // 2.0 + 3.5 + 4.5; the 2011 row falls outside the range.
    assert_eq!(answer.results[0].rows[0][0], serde_json::json!(10.0));
}

#[tokio::test]
async fn assistance_sum_combines_all_predicates() {
    let answer = assistance_pipeline()
        .answer("What was the total IHP total for hurricanes in Texas in 2017?")
        .await
        .unwrap();
    assert!(answer.clarification.is_none());
    assert_eq!(
        answer.results[0].rows[0][0],
        serde_json::json!(1_500_000_000.0)
    );
    // The metric carries its unit through to the degraded rendering path.
    assert!(answer.prose.is_some());
}

#[tokio::test]
async fn assistance_compare_fans_out_per_state() {
    let answer = assistance_pipeline()
        .answer("Compare public assistance total for hurricanes in Texas versus Florida")
        .await
        .unwrap();
    assert!(answer.clarification.is_none());
    assert_eq!(answer.queries.len(), 2);
    let totals: Vec<&serde_json::Value> = answer
        .results
        .iter()
        .map(|r| &r.rows[0][4])
        .collect();
    assert!(totals.contains(&&serde_json::json!(2_300_000_000.0)));
    assert!(totals.contains(&&serde_json::json!(1_900_000_000.0)));
}

fn emissions_pipeline(rows: &str) -> QuestionPipeline {
    let year_columns: Vec<String> = (1970..=2024).map(|y| format!("\"{y}\" REAL")).collect();
    let seed = format!(
        r#"
        CREATE TABLE ch4_emissions (
            "Name" TEXT, "Country_code_A3" TEXT, "Substance" TEXT, {columns}
        );
        {rows}
        "#,
        columns = year_columns.join(", ")
    );
    pipeline(Domain::Emissions, &seed)
}

#[tokio::test]
async fn emissions_point_year_sums_the_country_rows() {
    let answer = emissions_pipeline(
        r#"INSERT INTO ch4_emissions ("Name", "Country_code_A3", "Substance", "2020")
           VALUES ('India', 'IND', 'CH4', 33.5);"#,
    )
    .answer("What were the total methane emissions for India in 2020?")
    .await
    .unwrap();
    assert!(answer.clarification.is_none());
    assert_eq!(answer.queries[0].table, "ch4_emissions");
    assert_eq!(answer.queries[0].columns, vec!["2020"]);
    assert_eq!(answer.results[0].rows[0][0], serde_json::json!(33.5));
}

#[tokio::test]
async fn emissions_compare_queries_each_country() {
    let answer = emissions_pipeline(
        r#"INSERT INTO ch4_emissions ("Name", "Country_code_A3", "Substance", "2019")
           VALUES ('India', 'IND', 'CH4', 30.0), ('China', 'CHN', 'CH4', 55.0);"#,
    )
    .answer("Compare methane emissions of India and China in 2019")
    .await
    .unwrap();
    assert!(answer.clarification.is_none());
    assert_eq!(answer.queries.len(), 2);
    assert!(answer.queries.iter().all(|q| q.columns == vec!["2019"]));
    let values: Vec<&serde_json::Value> = answer.results.iter().map(|r| &r.rows[0][0]).collect();
    assert!(values.contains(&&serde_json::json!(30.0)));
    assert!(values.contains(&&serde_json::json!(55.0)));
}

#[tokio::test]
async fn assistance_sum_across_two_states_keeps_both() {
    let answer = assistance_pipeline()
        .answer("What was the total IHP total for hurricanes in Texas and Florida in 2017?")
        .await
        .unwrap();
    assert!(answer.clarification.is_none());
    // One sum per state, never Texas alone.
    assert_eq!(answer.queries.len(), 2);
    let sums: Vec<&serde_json::Value> = answer.results.iter().map(|r| &r.rows[0][0]).collect();
    assert!(sums.contains(&&serde_json::json!(1_500_000_000.0)));
    assert!(sums.contains(&&serde_json::json!(1_000_000_000.0)));
}

#[tokio::test]
async fn reanalysis_month_question_narrows_by_prefix() {
    let seed = r#"
        CREATE TABLE nepal_df0 (
            "City" TEXT, "date" TEXT, "latitude" REAL, "longitude" REAL,
            "high_vegetation_cover" REAL, "surface_pressure" REAL,
            "total_ozone" REAL, "wind_speed" REAL, "skin_temperature" REAL
        );
        INSERT INTO nepal_df0 ("City", "date", "skin_temperature")
        VALUES ('Kathmandu', '1998-03-01', 288.4),
               ('Kathmandu', '1998-04-01', 291.0);
    "#;
    let answer = pipeline(Domain::Reanalysis, seed)
        .answer("What was the temperature in Kathmandu in March 1998?")
        .await
        .unwrap();
    assert!(answer.clarification.is_none());
    assert_eq!(answer.queries[0].table, "nepal_df0");
    assert_eq!(answer.results[0].row_count, 1);
    assert_eq!(answer.results[0].rows[0][2], serde_json::json!(288.4));
}

#[tokio::test]
async fn reanalysis_average_over_a_year() {
    let seed = r#"
        CREATE TABLE bangladesh_df1 (
            "City" TEXT, "date" TEXT, "latitude" REAL, "longitude" REAL,
            "uv_radiation" REAL, "snowfall" REAL, "net_thermal_radiation" REAL,
            "total_precipitation" REAL, "convective_rain_rate" REAL,
            "mean_evaporation_rate" REAL, "mean_moisture_divergence" REAL,
            "mean_precipitation_rate" REAL
        );
        INSERT INTO bangladesh_df1 ("City", "date", "total_precipitation")
        VALUES ('Dhaka', '1998-01-01', 0.25),
               ('Dhaka', '1998-07-01', 0.75),
               ('Dhaka', '1999-01-01', 9.0);
    "#;
    let answer = pipeline(Domain::Reanalysis, seed)
        .answer("What was the average rainfall in Dhaka in 1998?")
        .await
        .unwrap();
    assert!(answer.clarification.is_none());
    assert_eq!(answer.queries[0].table, "bangladesh_df1");
    assert_eq!(answer.results[0].columns, vec!["avg_total_precipitation"]);
    assert_eq!(answer.results[0].rows[0][0], serde_json::json!(0.5));
}

#[tokio::test]
async fn small_talk_gets_a_clarification_not_an_error() {
    let answer = assistance_pipeline().answer("good morning").await.unwrap();
    assert!(answer.clarification.is_some());
    assert!(answer.queries.is_empty());
    assert!(answer.results.is_empty());
}

#[tokio::test]
async fn unanchored_question_names_whats_missing() {
    let answer = assistance_pipeline()
        .answer("what happened in 2017")
        .await
        .unwrap();
    let message = answer.clarification.unwrap();
    assert!(message.contains("state") || message.contains("incident"));
}
