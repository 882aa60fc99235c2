//! Integration tests for CLI configuration loading and the collect flow.

use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

use depsweep_cli::cli::{CollectArgs, OutputFormat};
use depsweep_cli::commands::collect::{CollectReport, build_collector_config};
use depsweep_cli::commands::load_config;
use depsweep_cli::output::OutputWriter;
use depsweep_collector::CollectionDriver;

#[tokio::test]
#[serial]
async fn test_missing_config_falls_back_to_defaults() {
    // Given: A path that does not exist
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("depsweep.toml");

    // When: Loading the config
    let loaded = load_config(&config_path).await.expect("defaults should load");

    // Then: Defaults are used and no source is recorded
    assert!(loaded.source.is_none());
    assert_eq!(loaded.config.general.log_level, "info");
    assert!(!loaded.config.collect.strict_mode);
}

#[tokio::test]
#[serial]
async fn test_env_override_applies_without_config_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("missing.toml");

    // SAFETY: serialized with other env-touching tests
    unsafe { std::env::set_var("DEPSWEEP_COLLECT_STRICT_MODE", "true") };
    let loaded = load_config(&config_path).await;
    unsafe { std::env::remove_var("DEPSWEEP_COLLECT_STRICT_MODE") };

    assert!(loaded.expect("defaults should load").config.collect.strict_mode);
}

#[tokio::test]
#[serial]
async fn test_existing_config_is_loaded() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("depsweep.toml");
    fs::write(
        &config_path,
        r#"
[general]
log_level = "debug"
log_format = "pretty"

[collect]
strict_mode = true
enabled_collectors = ["npm"]
"#,
    )
    .expect("should write config");

    let loaded = load_config(&config_path).await.expect("config should load");

    assert_eq!(loaded.source.as_deref(), Some(config_path.as_path()));
    assert_eq!(loaded.config.general.log_level, "debug");
    assert!(loaded.config.collect.strict_mode);
    assert_eq!(loaded.config.collect.enabled_collectors, vec!["npm"]);
}

#[tokio::test]
#[serial]
async fn test_malformed_config_is_a_config_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[collect\nstrict_mode = true\n").expect("should write config");

    let err = load_config(&config_path)
        .await
        .expect_err("malformed TOML should fail");

    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
#[serial]
async fn test_collect_flow_produces_json_report() {
    // Given: A project with a lockfile and a requirements file
    let project = TempDir::new().expect("should create temp dir");
    fs::write(
        project.path().join("Cargo.lock"),
        r#"
[[package]]
name = "app"
version = "0.1.0"
dependencies = ["anyhow"]

[[package]]
name = "anyhow"
version = "1.0.86"
"#,
    )
    .expect("should write lockfile");
    fs::write(project.path().join("requirements.txt"), "flask\nrequests==2.31.0\n")
        .expect("should write requirements");

    let loaded = load_config(&project.path().join("none.toml"))
        .await
        .expect("defaults should load");
    let args = CollectArgs {
        path: PathBuf::from(project.path()),
        strict: true,
        ignore: Vec::new(),
        collectors: Vec::new(),
        external_tools: false,
        strip_prefix: None,
    };

    // When: Running the driver with the merged configuration
    let driver = CollectionDriver::builder()
        .config(build_collector_config(&args, &loaded.config))
        .builtin_collectors()
        .build()
        .expect("driver should build");
    let packages = driver.collect(&args.path).await.expect("collect should succeed");
    let report = CollectReport::new(args.path.display().to_string(), packages);

    let mut buffer = Vec::new();
    OutputWriter::new(OutputFormat::Json)
        .render_to(&report, &mut buffer)
        .expect("render should succeed");
    let json: serde_json::Value = serde_json::from_slice(&buffer).expect("valid JSON");

    // Then: Strict mode dropped the unpinned requirement, output is sorted by purl
    let purls: Vec<&str> = json["packages"]
        .as_array()
        .expect("packages array")
        .iter()
        .map(|p| p["purl"].as_str().expect("purl string"))
        .collect();
    assert_eq!(
        purls,
        vec![
            "pkg:cargo/anyhow@1.0.86",
            "pkg:cargo/app@0.1.0",
            "pkg:pypi/requests@2.31.0",
        ]
    );
    assert_eq!(json["total"], 3);
    assert_eq!(json["by_type"]["cargo"], 2);
    assert_eq!(json["packages"][2]["sourceLocation"], "requirements.txt");
}
