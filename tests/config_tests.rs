// Config loading and validation tests

use voldash::config::AppConfig;

const VALID_CONFIG: &str = r#"
[server]
port = 8000
host = "0.0.0.0"

[database]
path = "data/voldash.db"
max_pool_size = 5
retention_days = 90

[seed]
demo_data = true
badges = true
rng_seed = 42

[sampler]
enabled = true
interval_secs = 30

[maintenance]
prune_interval_secs = 600
vacuum_schedule = "0 0 3 * * *"

[analytics]
peak_threshold = 75.0
peak_limit = 5
ranking_limit = 20
report_top_volunteers = 3
"#;

const MINIMAL_CONFIG: &str = r#"
[server]
port = 8000
host = "0.0.0.0"

[database]
path = "data/voldash.db"
max_pool_size = 5
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.database.path, "data/voldash.db");
    assert_eq!(config.database.retention_days, 90);
    assert_eq!(config.seed.rng_seed, Some(42));
    assert!(config.sampler.enabled);
    assert_eq!(config.sampler.interval_secs, 30);
    assert_eq!(
        config.maintenance.vacuum_schedule.as_deref(),
        Some("0 0 3 * * *")
    );
    assert_eq!(config.analytics.peak_threshold, 75.0);
    assert_eq!(config.analytics.report_top_volunteers, 3);
}

#[test]
fn test_optional_sections_use_defaults() {
    let config = AppConfig::load_from_str(MINIMAL_CONFIG).expect("load_from_str");
    assert_eq!(config.database.retention_days, 365);
    assert!(config.seed.demo_data);
    assert!(config.seed.badges);
    assert_eq!(config.seed.rng_seed, None);
    assert!(!config.sampler.enabled);
    assert_eq!(config.sampler.interval_secs, 60);
    assert_eq!(config.maintenance.prune_interval_secs, 3600);
    assert_eq!(config.maintenance.vacuum_schedule, None);
    assert_eq!(config.maintenance.vacuum_interval_secs, 86400);
    assert_eq!(config.analytics.peak_threshold, 80.0);
    assert_eq!(config.analytics.peak_limit, 10);
    assert_eq!(config.analytics.ranking_limit, 10);
    assert_eq!(config.analytics.report_top_volunteers, 5);
}

#[test]
fn test_validation_rejects_port_zero() {
    let bad = MINIMAL_CONFIG.replace("port = 8000", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"), "{}", err);
}

#[test]
fn test_validation_rejects_empty_database_path() {
    let bad = MINIMAL_CONFIG.replace("path = \"data/voldash.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"), "{}", err);
}

#[test]
fn test_validation_rejects_zero_pool_size() {
    let bad = MINIMAL_CONFIG.replace("max_pool_size = 5", "max_pool_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_pool_size"), "{}", err);
}

#[test]
fn test_validation_rejects_zero_retention() {
    let bad = VALID_CONFIG.replace("retention_days = 90", "retention_days = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("retention_days"), "{}", err);
}

#[test]
fn test_validation_rejects_bad_cron() {
    let bad = VALID_CONFIG.replace("0 0 3 * * *", "every night");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(
        err.to_string().contains("maintenance.vacuum_schedule"),
        "{}",
        err
    );
}

#[test]
fn test_validation_rejects_zero_peak_limit() {
    let bad = VALID_CONFIG.replace("peak_limit = 5", "peak_limit = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("analytics.peak_limit"), "{}", err);
}

#[test]
fn test_missing_server_section_fails() {
    let bad = r#"
[database]
path = "data/voldash.db"
max_pool_size = 5
"#;
    assert!(AppConfig::load_from_str(bad).is_err());
}

#[test]
fn test_sample_config_file_is_valid() {
    let s = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml"))
        .expect("read config.toml");
    AppConfig::load_from_str(&s).expect("config.toml validates");
}
