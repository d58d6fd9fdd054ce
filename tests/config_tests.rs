// Config loading and validation tests

use std::time::Duration;
use telemetry_rollup::config::AppConfig;
use telemetry_rollup::models::MetricKind;

const VALID_CONFIG: &str = r#"
[database]
path = "data/metrics.db"
max_pool_size = 10

[rollup]
schedule = "5 * * * *"
lookback_hours = 24
batch_size = 100
timezone = "+08:00"
timeout_secs = 300

[retention]
retention_days = 30
disk_schedule = "2 0 * * *"
cpu_schedule = "3 1 * * *"
mem_schedule = "4 2 * * *"

[cron]
enable = true
"#;

const MINIMAL_CONFIG: &str = r#"
[database]
path = "data/metrics.db"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.database.path, "data/metrics.db");
    assert_eq!(config.database.max_pool_size, 10);
    assert_eq!(config.rollup.schedule, "5 * * * *");
    assert_eq!(config.rollup.timeout_secs, 300);
    assert_eq!(config.retention.cpu_schedule, "3 1 * * *");
    assert!(config.cron.enable);
    assert_eq!(config.timezone().unwrap().local_minus_utc(), 8 * 3600);
}

#[test]
fn test_config_defaults_when_sections_omitted() {
    let config = AppConfig::load_from_str(MINIMAL_CONFIG).expect("minimal");
    assert_eq!(config.database.max_pool_size, 5);
    assert_eq!(config.rollup.lookback_hours, 24);
    assert_eq!(config.rollup.batch_size, 100);
    assert_eq!(config.rollup.timezone, "+00:00");
    assert!(!config.rollup.run_on_startup);
    assert_eq!(config.retention.retention_days, 30);
    assert_eq!(config.retention.disk_schedule, "2 0 * * *");
    assert_eq!(config.retention.mem_schedule, "4 2 * * *");
    assert!(config.cron.enable);
}

#[test]
fn test_config_resolves_rollup_and_scheduler_settings() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    let rollup = config.rollup_config().unwrap();
    assert_eq!(rollup.lookback_hours, 24);
    assert_eq!(rollup.batch_size, 100);
    assert_eq!(rollup.timezone.local_minus_utc(), 8 * 3600);

    let sched = config.scheduler_config().unwrap();
    assert!(sched.enabled);
    assert_eq!(sched.job_timeout, Duration::from_secs(300));
    assert_eq!(sched.retention_days, 30);
    let kinds: Vec<MetricKind> = sched.retention_schedules.iter().map(|(k, _)| *k).collect();
    assert_eq!(kinds, vec![MetricKind::Disk, MetricKind::Cpu, MetricKind::Mem]);
    assert_eq!(sched.retention_schedules[1].1, "3 1 * * *");
}

#[test]
fn test_config_net_has_no_retention_schedule() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    assert_eq!(config.retention.schedule_for(MetricKind::Mem), Some("4 2 * * *"));
    assert_eq!(config.retention.schedule_for(MetricKind::Net), None);
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/metrics.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_max_pool_size_zero() {
    let bad = VALID_CONFIG.replace("max_pool_size = 10", "max_pool_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_pool_size"));
}

#[test]
fn test_config_validation_rejects_lookback_zero() {
    let bad = VALID_CONFIG.replace("lookback_hours = 24", "lookback_hours = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("lookback_hours"));
}

#[test]
fn test_config_validation_rejects_batch_size_zero() {
    let bad = VALID_CONFIG.replace("batch_size = 100", "batch_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("batch_size"));
}

#[test]
fn test_config_validation_rejects_timeout_zero() {
    let bad = VALID_CONFIG.replace("timeout_secs = 300", "timeout_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("timeout_secs"));
}

#[test]
fn test_config_validation_rejects_retention_days_zero() {
    let bad = VALID_CONFIG.replace("retention_days = 30", "retention_days = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("retention_days"));
}

#[test]
fn test_config_validation_rejects_bad_timezone() {
    let bad = VALID_CONFIG.replace("timezone = \"+08:00\"", "timezone = \"Asia/Shanghai\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("rollup.timezone"));
}

#[test]
fn test_config_validation_rejects_bad_cron() {
    let bad = VALID_CONFIG.replace("cpu_schedule = \"3 1 * * *\"", "cpu_schedule = \"3 1 * *\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("retention.cpu_schedule"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.database.path, "data/metrics.db");
}
