//! Integration tests for the collection driver
//!
//! Builds throwaway project trees with tempfile and runs the full
//! walk -> concurrent collect -> consolidate -> prefix strip pipeline.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use depsweep_collector::{
    CollectionDriver, Collector, CollectorConfig, CollectorConfigBuilder, CollectorError,
    FileMatcher, Package, PackageParser,
};

const CARGO_LOCK: &str = r#"
version = 3

[[package]]
name = "app"
version = "0.1.0"
dependencies = ["serde"]

[[package]]
name = "serde"
version = "1.0.204"
source = "registry+https://github.com/rust-lang/crates.io-index"
"#;

const CARGO_TOML: &str = r#"
[package]
name = "app"
version = "0.1.0"
license = "MIT"
authors = ["Jane Doe <jane@example.com>"]

[dependencies]
serde = "1.0"
"#;

const REQUIREMENTS: &str = "requests==2.31.0\nflask\n";

const PACKAGE_LOCK: &str = r#"{
  "name": "web",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "web", "version": "1.0.0", "dependencies": { "left-pad": "^1.3.0" } },
    "node_modules/left-pad": { "version": "1.3.0", "license": "WTFPL" }
  }
}"#;

const PACKAGE_JSON: &str = r#"{
  "name": "web",
  "version": "1.0.0",
  "license": "MIT",
  "author": "Web Team <web@example.com>",
  "dependencies": { "left-pad": "^1.3.0" }
}"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn builtin_driver(config: CollectorConfig) -> CollectionDriver {
    CollectionDriver::builder()
        .config(config)
        .builtin_collectors()
        .build()
        .unwrap()
}

fn purls(packages: &[Package]) -> Vec<&str> {
    packages.iter().map(|p| p.purl.as_str()).collect()
}

fn find<'a>(packages: &'a [Package], purl: &str) -> &'a Package {
    packages
        .iter()
        .find(|p| p.purl == purl)
        .unwrap_or_else(|| panic!("{purl} missing"))
}

/// Two collectors claiming files in the same directory contribute to one sorted list
#[tokio::test]
async fn test_two_collectors_same_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Cargo.lock", CARGO_LOCK);
    write(dir.path(), "requirements.txt", REQUIREMENTS);

    let driver = builtin_driver(CollectorConfig::default());
    let packages = driver.collect(dir.path()).await.unwrap();

    assert_eq!(
        purls(&packages),
        vec![
            "pkg:cargo/app@0.1.0",
            "pkg:cargo/serde@1.0.204",
            "pkg:pypi/flask",
            "pkg:pypi/requests@2.31.0",
        ]
    );
    assert!(
        find(&packages, "pkg:cargo/app@0.1.0")
            .dependencies
            .contains("pkg:cargo/serde@1.0.204")
    );
    assert_eq!(
        find(&packages, "pkg:pypi/requests@2.31.0").source_location,
        "requirements.txt"
    );
}

/// Full tree: lockfiles linked with their main manifests, across ecosystems
#[tokio::test]
async fn test_multi_ecosystem_tree() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Cargo.lock", CARGO_LOCK);
    write(dir.path(), "Cargo.toml", CARGO_TOML);
    write(dir.path(), "web/package-lock.json", PACKAGE_LOCK);
    write(dir.path(), "web/package.json", PACKAGE_JSON);
    write(dir.path(), "tools/requirements-dev.txt", REQUIREMENTS);

    let driver = builtin_driver(CollectorConfig::default());
    let packages = driver.collect(dir.path()).await.unwrap();

    assert_eq!(
        purls(&packages),
        vec![
            "pkg:cargo/app@0.1.0",
            "pkg:cargo/serde@1.0.204",
            "pkg:npm/left-pad@1.3.0",
            "pkg:npm/web@1.0.0",
            "pkg:pypi/flask",
            "pkg:pypi/requests@2.31.0",
        ]
    );

    let app = find(&packages, "pkg:cargo/app@0.1.0");
    assert!(app.license_declared.contains("MIT"));
    assert_eq!(app.supplier.as_deref(), Some("Jane Doe"));
    assert_eq!(app.source_location, "Cargo.lock");

    let web = find(&packages, "pkg:npm/web@1.0.0");
    assert_eq!(web.supplier.as_deref(), Some("Web Team"));
    assert!(web.dependencies.contains("pkg:npm/left-pad@1.3.0"));
    assert_eq!(
        Path::new(&web.source_location),
        Path::new("web").join("package-lock.json")
    );
}

/// Running twice over the same tree gives the same answer
#[tokio::test]
async fn test_collect_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Cargo.lock", CARGO_LOCK);
    write(dir.path(), "a/requirements.txt", "requests==2.31.0\n");
    write(dir.path(), "b/requirements.txt", "requests==2.31.0\nflask==3.0.0\n");
    write(dir.path(), "web/package-lock.json", PACKAGE_LOCK);

    let driver = builtin_driver(CollectorConfig::default());
    let first = driver.collect(dir.path()).await.unwrap();
    let second = driver.collect(dir.path()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        find(&first, "pkg:pypi/requests@2.31.0").source_location,
        Path::new("a").join("requirements.txt").display().to_string()
    );
}

/// Ignored directories are pruned before any collector sees them
#[tokio::test]
async fn test_ignore_patterns_prune_directories() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "requirements.txt", "requests==2.31.0\n");
    write(dir.path(), "node_modules/dep/package-lock.json", PACKAGE_LOCK);
    write(dir.path(), "vendor/requirements.txt", "flask==3.0.0\n");

    let config = CollectorConfigBuilder::new()
        .ignore_pattern("node_modules")
        .ignore_pattern("vendor")
        .build()
        .unwrap();
    let packages = builtin_driver(config).collect(dir.path()).await.unwrap();

    assert_eq!(purls(&packages), vec!["pkg:pypi/requests@2.31.0"]);
}

/// A broken manifest is skipped while the rest of the tree is still collected
#[tokio::test]
async fn test_parse_error_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken/Cargo.lock", "this is [[not toml");
    write(dir.path(), "broken/package-lock.json", "{ not json");
    write(dir.path(), "ok/Cargo.lock", CARGO_LOCK);
    write(dir.path(), "requirements.txt", "flask==3.0.0\n");

    let packages = builtin_driver(CollectorConfig::default())
        .collect(dir.path())
        .await
        .unwrap();

    assert_eq!(
        purls(&packages),
        vec![
            "pkg:cargo/app@0.1.0",
            "pkg:cargo/serde@1.0.204",
            "pkg:pypi/flask@3.0.0",
        ]
    );
}

/// Only enabled collectors run
#[tokio::test]
async fn test_enabled_collectors_filter() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Cargo.lock", CARGO_LOCK);
    write(dir.path(), "requirements.txt", REQUIREMENTS);

    let config = CollectorConfigBuilder::new()
        .enabled_collectors(vec!["python".to_owned()])
        .build()
        .unwrap();
    let driver = builtin_driver(config);
    assert_eq!(driver.collector_names(), vec!["pypi"]);

    let packages = driver.collect(dir.path()).await.unwrap();
    assert!(packages.iter().all(|p| p.purl_type == "pypi"));
    assert_eq!(packages.len(), 2);
}

/// Strict mode drops records whose version could not be determined
#[tokio::test]
async fn test_strict_mode_drops_unversioned() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "requirements.txt", REQUIREMENTS);

    let config = CollectorConfigBuilder::new().strict_mode(true).build().unwrap();
    let packages = builtin_driver(config).collect(dir.path()).await.unwrap();

    assert_eq!(purls(&packages), vec!["pkg:pypi/requests@2.31.0"]);
}

/// An explicit strip prefix replaces the default walk root
#[tokio::test]
async fn test_explicit_strip_prefix() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "svc/requirements.txt", "flask==3.0.0\n");

    let prefix = dir.path().join("svc");
    let config = CollectorConfigBuilder::new()
        .strip_prefix(prefix.display().to_string())
        .build()
        .unwrap();
    let packages = builtin_driver(config).collect(dir.path()).await.unwrap();

    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0].source_location, "requirements.txt");
}

/// A missing root is a fatal walk error
#[tokio::test]
async fn test_missing_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let result = builtin_driver(CollectorConfig::default())
        .collect(&missing)
        .await;

    assert!(matches!(result, Err(CollectorError::Walk { .. })));
}

/// A token cancelled before the walk stops the run without dispatching collectors
#[tokio::test]
async fn test_cancel_before_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "requirements.txt", REQUIREMENTS);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = builtin_driver(CollectorConfig::default())
        .collect_with_cancel(dir.path(), cancel)
        .await;

    assert!(matches!(result, Err(CollectorError::Cancelled)));
}

/// Plain-text list parser used to register a custom collector
struct DepsListParser {
    matcher: FileMatcher,
}

impl PackageParser for DepsListParser {
    fn matcher(&self) -> &FileMatcher {
        &self.matcher
    }

    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Package>, CollectorError> {
        Ok(content
            .lines()
            .filter_map(|line| line.split_once('@'))
            .map(|(name, version)| {
                Package::new("generic", name.trim(), version.trim()).with_source(source_path)
            })
            .collect())
    }
}

/// Custom collectors run next to the built-in ones and go through the same consolidation
#[tokio::test]
async fn test_custom_collector_registration() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "deps.list", "zlib@1.3\nzlib@1.3\nopenssl@3.0.13\n");
    write(dir.path(), "requirements.txt", "flask==3.0.0\n");

    let custom = Collector::new("deps-list", "generic").manifest(DepsListParser {
        matcher: FileMatcher::file_name("deps.list"),
    });
    let driver = CollectionDriver::builder()
        .builtin_collectors()
        .collector(custom)
        .build()
        .unwrap();

    assert_eq!(
        driver.collector_names(),
        vec!["npm", "cargo", "pypi", "deps-list"]
    );

    let packages = driver.collect(dir.path()).await.unwrap();
    assert_eq!(
        purls(&packages),
        vec![
            "pkg:generic/openssl@3.0.13",
            "pkg:generic/zlib@1.3",
            "pkg:pypi/flask@3.0.0",
        ]
    );
}

/// Parser that fails hard on any input
struct PanickingParser {
    matcher: FileMatcher,
}

impl PackageParser for PanickingParser {
    fn matcher(&self) -> &FileMatcher {
        &self.matcher
    }

    fn parse(&self, _content: &str, source_path: &str) -> Result<Vec<Package>, CollectorError> {
        panic!("corrupt manifest: {source_path}");
    }
}

/// A panicking collector contributes nothing while the others still deliver (unwind builds)
#[tokio::test]
async fn test_panicking_collector_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.list", "anything\n");
    write(dir.path(), "requirements.txt", "flask==3.0.0\n");

    let broken = Collector::new("broken", "generic").manifest(PanickingParser {
        matcher: FileMatcher::file_name("broken.list"),
    });
    let driver = CollectionDriver::builder()
        .builtin_collectors()
        .collector(broken)
        .build()
        .unwrap();

    let packages = driver.collect(dir.path()).await.unwrap();
    assert_eq!(purls(&packages), vec!["pkg:pypi/flask@3.0.0"]);
}
