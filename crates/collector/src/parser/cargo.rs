//! Cargo.lock / Cargo.toml 파서
//!
//! [`CargoLockParser`]는 Cargo.lock (v1-v4)을, [`CargoManifestParser`]는 Cargo.toml을
//! 파싱합니다. Cargo.lock에는 라이선스 정보가 없으므로 외부 도구가 허용되면
//! `cargo metadata` 결과로 보강합니다 ([`enrich_from_metadata`]).
//!
//! # Cargo.lock 형식 예시
//!
//! ```toml
//! version = 3
//!
//! [[package]]
//! name = "serde"
//! version = "1.0.204"
//! source = "registry+https://github.com/rust-lang/crates.io-index"
//! dependencies = ["serde_derive"]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::consolidate::ConsolidateOptions;
use crate::error::CollectorError;
use crate::graph::DependencyGraph;
use crate::matcher::FileMatcher;
use crate::parser::{MainPackageParser, PackageParser, exact_version, strip_contact};
use crate::tool;
use crate::types::{Ecosystem, Package};

/// Cargo.lock 파서
pub struct CargoLockParser {
    matcher: FileMatcher,
}

/// Cargo.lock 구조 (파싱용)
#[derive(Deserialize)]
struct CargoLockFile {
    #[serde(default)]
    package: Vec<CargoLockPackage>,
}

/// Cargo.lock 내 개별 패키지 (파싱용)
#[derive(Deserialize)]
struct CargoLockPackage {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

impl CargoLockParser {
    /// 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            matcher: FileMatcher::file_name("Cargo.lock"),
        }
    }
}

impl Default for CargoLockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageParser for CargoLockParser {
    fn matcher(&self) -> &FileMatcher {
        &self.matcher
    }

    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Package>, CollectorError> {
        let lock_file: CargoLockFile =
            toml::from_str(content).map_err(|e| CollectorError::ManifestParse {
                path: source_path.to_owned(),
                reason: e.to_string(),
            })?;

        let mut graph = DependencyGraph::new();
        let mut purls = Vec::with_capacity(lock_file.package.len());
        for entry in &lock_file.package {
            let pkg = Package::new(
                Ecosystem::Cargo.purl_type(),
                entry.name.as_str(),
                entry.version.as_str(),
            )
            .with_source(source_path);
            purls.push(graph.add_package(pkg));
        }

        for (entry, from) in lock_file.package.iter().zip(purls) {
            let Some(from) = from else {
                continue;
            };
            for dep in &entry.dependencies {
                let (name, version) = parse_lock_dependency(dep);
                let target = match version {
                    Some(v) => graph.find_by_name_version(name, v),
                    None => graph.find_by_name(name),
                }
                .map(|p| p.purl.clone());

                match target {
                    Some(to) => {
                        graph.add_dependency(&from, &to);
                    }
                    None => debug!(dependency = %dep, source = %source_path, "unresolved Cargo.lock dependency"),
                }
            }
        }

        Ok(graph.into_list(&ConsolidateOptions::lenient()))
    }
}

/// `"name"`, `"name version"`, `"name version (source)"` 형식 분리
fn parse_lock_dependency(dep: &str) -> (&str, Option<&str>) {
    let mut parts = dep.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let version = parts.next().filter(|v| !v.starts_with('('));
    (name, version)
}

/// Cargo.toml 파서
pub struct CargoManifestParser {
    matcher: FileMatcher,
}

/// Cargo.toml 구조 (파싱용)
#[derive(Deserialize)]
struct CargoManifest {
    #[serde(default)]
    package: Option<ManifestPackage>,
    #[serde(default)]
    workspace: Option<ManifestWorkspace>,
    #[serde(default)]
    dependencies: BTreeMap<String, toml::Value>,
}

#[derive(Deserialize)]
struct ManifestPackage {
    name: String,
    #[serde(default)]
    version: Option<toml::Value>,
    #[serde(default)]
    license: Option<toml::Value>,
    #[serde(default)]
    authors: Option<toml::Value>,
}

#[derive(Deserialize)]
struct ManifestWorkspace {
    #[serde(default)]
    package: Option<WorkspacePackage>,
}

#[derive(Deserialize)]
struct WorkspacePackage {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    license: Option<String>,
}

impl CargoManifestParser {
    /// 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            matcher: FileMatcher::file_name("Cargo.toml"),
        }
    }

    fn read(content: &str, source_path: &str) -> Result<CargoManifest, CollectorError> {
        toml::from_str(content).map_err(|e| CollectorError::ManifestParse {
            path: source_path.to_owned(),
            reason: e.to_string(),
        })
    }

    fn main_package(manifest: &CargoManifest, source_path: &str) -> Option<Package> {
        let package = manifest.package.as_ref()?;
        let inherited = manifest.workspace.as_ref().and_then(|w| w.package.as_ref());

        let version = inherit_string(package.version.as_ref(), || {
            inherited.and_then(|w| w.version.clone())
        });
        let license = inherit_string(package.license.as_ref(), || {
            inherited.and_then(|w| w.license.clone())
        });

        let mut pkg = Package::new(Ecosystem::Cargo.purl_type(), package.name.as_str(), version)
            .with_source(source_path)
            .with_license(license);

        let first_author = package
            .authors
            .as_ref()
            .and_then(toml::Value::as_array)
            .and_then(|a| a.first())
            .and_then(toml::Value::as_str);
        if let Some(author) = first_author {
            pkg = pkg.with_supplier(strip_contact(author));
        }
        Some(pkg)
    }
}

impl Default for CargoManifestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageParser for CargoManifestParser {
    fn matcher(&self) -> &FileMatcher {
        &self.matcher
    }

    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Package>, CollectorError> {
        let manifest = Self::read(content, source_path)?;
        let mut graph = DependencyGraph::new();
        let main = Self::main_package(&manifest, source_path).and_then(|p| graph.add_package(p));

        for (key, spec) in &manifest.dependencies {
            let (name, version) = match spec {
                toml::Value::String(req) => (key.as_str(), pinned_version(req)),
                toml::Value::Table(table) => (
                    table
                        .get("package")
                        .and_then(toml::Value::as_str)
                        .unwrap_or(key.as_str()),
                    table
                        .get("version")
                        .and_then(toml::Value::as_str)
                        .map(pinned_version)
                        .unwrap_or_default(),
                ),
                _ => (key.as_str(), String::new()),
            };
            let pkg =
                Package::new(Ecosystem::Cargo.purl_type(), name, version).with_source(source_path);
            if let (Some(from), Some(to)) = (main.as_deref(), graph.add_package(pkg)) {
                graph.add_dependency(from, &to);
            }
        }

        Ok(graph.into_list(&ConsolidateOptions::lenient()))
    }
}

impl MainPackageParser for CargoManifestParser {
    fn parse_main(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Option<Package>, CollectorError> {
        let manifest = Self::read(content, source_path)?;
        Ok(Self::main_package(&manifest, source_path))
    }
}

/// Cargo 요구사항은 `=`로 고정된 경우에만 정확한 버전입니다 (`1.0`은 `^1.0`).
fn pinned_version(req: &str) -> String {
    if req.trim_start().starts_with('=') {
        exact_version(req)
    } else {
        String::new()
    }
}

/// 문자열이면 그대로, `{ workspace = true }`이면 워크스페이스 값을 사용합니다.
fn inherit_string(value: Option<&toml::Value>, inherited: impl FnOnce() -> Option<String>) -> String {
    match value {
        Some(toml::Value::String(s)) => s.clone(),
        Some(toml::Value::Table(t))
            if t.get("workspace").and_then(toml::Value::as_bool) == Some(true) =>
        {
            inherited().unwrap_or_default()
        }
        _ => String::new(),
    }
}

// ─── cargo metadata 보강 ────────────────────────────────────────────

/// `cargo metadata` 출력 구조 (파싱용)
#[derive(Deserialize)]
struct CargoMetadata {
    #[serde(default)]
    packages: Vec<MetadataPackage>,
}

#[derive(Deserialize)]
struct MetadataPackage {
    name: String,
    version: String,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
}

/// `(name, version)`별 보강 정보
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataInfo {
    /// SPDX 라이선스 표현식
    pub license: Option<String>,
    /// 첫 번째 작성자 (연락처 제거)
    pub supplier: Option<String>,
}

/// `cargo metadata --format-version 1` JSON에서 패키지별 보강 정보를 추출합니다.
pub fn parse_metadata(
    json: &str,
) -> Result<HashMap<(String, String), MetadataInfo>, CollectorError> {
    let metadata: CargoMetadata =
        serde_json::from_str(json).map_err(|e| CollectorError::ManifestParse {
            path: "cargo metadata".to_owned(),
            reason: e.to_string(),
        })?;

    Ok(metadata
        .packages
        .into_iter()
        .map(|p| {
            let supplier = p
                .authors
                .first()
                .map(|a| strip_contact(a))
                .filter(|a| !a.is_empty());
            let info = MetadataInfo {
                license: p.license.filter(|l| !l.trim().is_empty()),
                supplier,
            };
            ((p.name, p.version), info)
        })
        .collect())
}

/// 각 디렉토리에서 `cargo metadata`를 실행하여 cargo 패키지의 라이선스와 공급자를 채웁니다.
///
/// 실행 실패나 제한 시간 초과는 경고 후 무시하며, 패키지 목록은 그대로 반환됩니다.
pub async fn enrich_from_metadata(
    mut packages: Vec<Package>,
    dirs: &[PathBuf],
    timeout: Duration,
) -> Vec<Package> {
    let mut infos: HashMap<(String, String), MetadataInfo> = HashMap::new();

    for dir in dirs {
        if !dir.join("Cargo.toml").is_file() {
            continue;
        }
        let Some(output) = tool::run_bounded(
            "cargo",
            &["metadata", "--format-version", "1", "--offline"],
            dir,
            timeout,
        )
        .await
        else {
            continue;
        };
        match parse_metadata(&output) {
            Ok(found) => infos.extend(found),
            Err(e) => warn!(dir = %dir.display(), error = %e, "failed to parse cargo metadata output"),
        }
    }

    if infos.is_empty() {
        return packages;
    }

    let mut enriched = 0_usize;
    for pkg in packages
        .iter_mut()
        .filter(|p| p.purl_type == Ecosystem::Cargo.purl_type())
    {
        let Some(info) = infos.get(&(pkg.name.clone(), pkg.version.clone())) else {
            continue;
        };
        if let Some(license) = &info.license {
            pkg.license_declared.insert(license.clone());
        }
        if pkg.supplier.is_none() {
            pkg.supplier = info.supplier.clone();
        }
        enriched += 1;
    }
    debug!(enriched, "cargo metadata enrichment applied");

    packages
}
