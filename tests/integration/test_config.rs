//! Configuration loading against real files.

use std::fs;

use climaql::{Config, Domain};

#[test]
fn file_round_trip_with_tilde_expansion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        [datasets]
        reanalysis = "~/data/era5.db"
        emissions = "/data/edgar.db"

        [extraction]
        similarity_threshold = 0.9
        seed_locations = false

        [service]
        row_ceiling = 25

        [geocode]
        enabled = true
        user_agent = "climaql-test"
        "#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.service.row_ceiling, 25);
    assert!(!config.extraction.seed_locations);
    assert!(config.geocode.enabled);
    assert_eq!(
        config.configured_domains(),
        vec![Domain::Reanalysis, Domain::Emissions]
    );
    let expanded = config.dataset_path(Domain::Reanalysis).unwrap();
    assert!(!expanded.to_string_lossy().starts_with('~'));
}

#[test]
fn invalid_values_are_rejected_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[service]\nrow_ceiling = 0\n").unwrap();
    let err = Config::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("row_ceiling"));
}

#[test]
fn unreadable_file_is_a_config_error() {
    assert!(Config::from_file("/nonexistent/climaql.toml").is_err());
}
