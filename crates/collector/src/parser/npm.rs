//! package-lock.json / package.json 파서
//!
//! [`NpmLockParser`]는 NPM의 package-lock.json (v2/v3) 및 npm-shrinkwrap.json을
//! 파싱하고, [`NpmManifestParser`]는 프로젝트의 package.json을 파싱합니다.
//!
//! # package-lock.json v3 형식 예시
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "lockfileVersion": 3,
//!   "packages": {
//!     "": { "name": "my-app", "version": "1.0.0", "dependencies": { "lodash": "^4.17.21" } },
//!     "node_modules/lodash": { "version": "4.17.21", "license": "MIT" }
//!   }
//! }
//! ```
//!
//! 의존성 이름은 Node의 모듈 해석 규칙대로 가장 가까운 `node_modules`부터
//! 상위로 올라가며 찾습니다.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;

use crate::consolidate::ConsolidateOptions;
use crate::error::CollectorError;
use crate::graph::DependencyGraph;
use crate::matcher::FileMatcher;
use crate::parser::{MainPackageParser, PackageParser, exact_version, strip_contact};
use crate::types::{Ecosystem, Package};

const NODE_MODULES: &str = "node_modules/";

/// package-lock.json 파서
pub struct NpmLockParser {
    matcher: FileMatcher,
}

/// package-lock.json 구조 (파싱용)
#[derive(Deserialize)]
struct NpmLockFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    packages: BTreeMap<String, NpmPackageEntry>,
}

/// package-lock.json 내 개별 패키지 (파싱용)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NpmPackageEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    license: Option<Value>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    link: bool,
}

impl NpmLockParser {
    /// 파서를 생성합니다.
    pub fn new() -> Result<Self, CollectorError> {
        Ok(Self {
            matcher: FileMatcher::glob("{package-lock,npm-shrinkwrap}.json")?,
        })
    }
}

impl PackageParser for NpmLockParser {
    fn matcher(&self) -> &FileMatcher {
        &self.matcher
    }

    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Package>, CollectorError> {
        let lock_file: NpmLockFile =
            serde_json::from_str(content).map_err(|e| CollectorError::ManifestParse {
                path: source_path.to_owned(),
                reason: e.to_string(),
            })?;

        let mut graph = DependencyGraph::new();
        let mut key_to_purl: HashMap<&str, String> = HashMap::new();

        for (key, entry) in &lock_file.packages {
            if entry.link {
                continue;
            }

            let name = if key.is_empty() {
                entry.name.clone().or_else(|| lock_file.name.clone())
            } else {
                entry.name.clone().or_else(|| Some(extract_package_name(key)))
            };
            let Some(name) = name else {
                continue;
            };

            let version = entry
                .version
                .clone()
                .or_else(|| key.is_empty().then(|| lock_file.version.clone()).flatten())
                .unwrap_or_default();

            let mut pkg = Package::new(Ecosystem::Npm.purl_type(), name, version)
                .with_source(source_path);
            if let Some(license) = entry.license.as_ref().and_then(text_field) {
                pkg = pkg.with_license(license);
            }

            if let Some(purl) = graph.add_package(pkg) {
                key_to_purl.insert(key.as_str(), purl);
            }
        }

        for (key, entry) in &lock_file.packages {
            let Some(from) = key_to_purl.get(key.as_str()) else {
                continue;
            };
            for dep in entry
                .dependencies
                .keys()
                .chain(entry.optional_dependencies.keys())
            {
                let target = resolve_node_module(key, dep, &key_to_purl)
                    .or_else(|| graph.find_by_name(dep).map(|p| p.purl.clone()));
                if let Some(to) = target {
                    graph.add_dependency(from, &to);
                }
            }
        }

        Ok(graph.into_list(&ConsolidateOptions::lenient()))
    }
}

/// package.json 파서
pub struct NpmManifestParser {
    matcher: FileMatcher,
}

/// package.json 구조 (파싱용)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    license: Option<Value>,
    #[serde(default)]
    author: Option<Value>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
}

impl NpmManifestParser {
    /// 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            matcher: FileMatcher::file_name("package.json"),
        }
    }

    fn read(content: &str, source_path: &str) -> Result<PackageJson, CollectorError> {
        serde_json::from_str(content).map_err(|e| CollectorError::ManifestParse {
            path: source_path.to_owned(),
            reason: e.to_string(),
        })
    }

    fn main_package(manifest: &PackageJson, source_path: &str) -> Option<Package> {
        let name = manifest.name.as_deref().filter(|n| !n.is_empty())?;
        let mut pkg = Package::new(
            Ecosystem::Npm.purl_type(),
            name,
            manifest.version.clone().unwrap_or_default(),
        )
        .with_source(source_path);
        if let Some(license) = manifest.license.as_ref().and_then(text_field) {
            pkg = pkg.with_license(license);
        }
        if let Some(author) = manifest.author.as_ref().and_then(person_field) {
            pkg = pkg.with_supplier(author);
        }
        Some(pkg)
    }
}

impl Default for NpmManifestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageParser for NpmManifestParser {
    fn matcher(&self) -> &FileMatcher {
        &self.matcher
    }

    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Package>, CollectorError> {
        let manifest = Self::read(content, source_path)?;
        let mut graph = DependencyGraph::new();
        let main = Self::main_package(&manifest, source_path).and_then(|p| graph.add_package(p));

        for (dep, range) in manifest
            .dependencies
            .iter()
            .chain(manifest.optional_dependencies.iter())
        {
            let pkg = Package::new(Ecosystem::Npm.purl_type(), dep.as_str(), exact_version(range))
                .with_source(source_path);
            if let (Some(from), Some(to)) = (main.as_deref(), graph.add_package(pkg)) {
                graph.add_dependency(from, &to);
            }
        }

        Ok(graph.into_list(&ConsolidateOptions::lenient()))
    }
}

impl MainPackageParser for NpmManifestParser {
    fn parse_main(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Option<Package>, CollectorError> {
        let manifest = Self::read(content, source_path)?;
        Ok(Self::main_package(&manifest, source_path))
    }
}

/// "node_modules/@scope/name" 또는 "node_modules/name" 에서 패키지명 추출
///
/// `node_modules`가 없는 워크스페이스 경로는 마지막 경로 구성 요소를 사용합니다.
fn extract_package_name(key: &str) -> String {
    if let Some(pos) = key.rfind(NODE_MODULES) {
        key[pos + NODE_MODULES.len()..].to_owned()
    } else {
        key.rsplit('/').next().unwrap_or(key).to_owned()
    }
}

/// `from_key` 위치에서 `dep`를 Node 해석 규칙으로 찾습니다.
fn resolve_node_module(
    from_key: &str,
    dep: &str,
    key_to_purl: &HashMap<&str, String>,
) -> Option<String> {
    let mut base = from_key;
    loop {
        let candidate = if base.is_empty() {
            format!("{NODE_MODULES}{dep}")
        } else {
            format!("{base}/{NODE_MODULES}{dep}")
        };
        if let Some(purl) = key_to_purl.get(candidate.as_str()) {
            return Some(purl.clone());
        }
        if base.is_empty() {
            return None;
        }
        base = parent_key(base);
    }
}

/// 한 단계 위의 `node_modules` 소유자 키
///
/// `a/node_modules/b/node_modules/c` -> `a/node_modules/b`, `node_modules/x` -> ``
fn parent_key(key: &str) -> &str {
    match key.rfind(&format!("/{NODE_MODULES}")) {
        Some(idx) => &key[..idx],
        None => "",
    }
}

/// `"MIT"` 또는 `{ "type": "MIT" }` 형식에서 문자열 추출
fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("type").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

/// `"Name <mail>"` 또는 `{ "name": "Name" }` 형식에서 이름 추출
fn person_field(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("name").and_then(Value::as_str)?,
        _ => return None,
    };
    let name = strip_contact(raw);
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    const SAMPLE_PACKAGE_LOCK: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "packages": {
    "": {
      "name": "my-app",
      "version": "1.0.0",
      "license": "Apache-2.0",
      "dependencies": {
        "express": "^4.18.2",
        "lodash": "^4.17.21"
      }
    },
    "node_modules/lodash": {
      "version": "4.17.21",
      "resolved": "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz",
      "license": "MIT"
    },
    "node_modules/express": {
      "version": "4.18.2",
      "license": "MIT",
      "dependencies": {
        "debug": "2.6.9"
      }
    },
    "node_modules/debug": {
      "version": "4.3.4"
    },
    "node_modules/express/node_modules/debug": {
      "version": "2.6.9"
    }
  }
}"#;

    fn find<'a>(packages: &'a [Package], name: &str, version: &str) -> &'a Package {
        packages
            .iter()
            .find(|p| p.name == name && p.version == version)
            .unwrap_or_else(|| panic!("{name}@{version} missing"))
    }

    #[test]
    fn lock_matcher_accepts_lock_and_shrinkwrap() {
        let parser = NpmLockParser::new().unwrap();
        assert!(parser.matcher().matches(Path::new("/project/package-lock.json")));
        assert!(parser.matcher().matches(Path::new("npm-shrinkwrap.json")));
        assert!(!parser.matcher().matches(Path::new("package.json")));
        assert!(!parser.matcher().matches(Path::new("Cargo.lock")));
    }

    #[test]
    fn parse_sample_package_lock() {
        let parser = NpmLockParser::new().unwrap();
        let packages = parser
            .parse(SAMPLE_PACKAGE_LOCK, "/repo/package-lock.json")
            .unwrap();

        // root + lodash + express + 두 버전의 debug
        assert_eq!(packages.len(), 5);

        let root = find(&packages, "my-app", "1.0.0");
        assert!(root.license_declared.contains("Apache-2.0"));
        assert!(root.dependencies.contains("pkg:npm/express@4.18.2"));
        assert!(root.dependencies.contains("pkg:npm/lodash@4.17.21"));

        let lodash = find(&packages, "lodash", "4.17.21");
        assert_eq!(lodash.purl, "pkg:npm/lodash@4.17.21");
        assert!(lodash.license_declared.contains("MIT"));
        assert_eq!(lodash.source_location, "/repo/package-lock.json");
    }

    #[test]
    fn nested_node_modules_wins_over_hoisted() {
        let parser = NpmLockParser::new().unwrap();
        let packages = parser.parse(SAMPLE_PACKAGE_LOCK, "package-lock.json").unwrap();
        let express = find(&packages, "express", "4.18.2");
        assert_eq!(
            express.dependencies.iter().collect::<Vec<_>>(),
            vec!["pkg:npm/debug@2.6.9"]
        );
    }

    #[test]
    fn scoped_package_purl_is_encoded() {
        let json = r#"{ "packages": {
            "node_modules/@types/node": { "version": "20.1.0" }
        } }"#;
        let packages = NpmLockParser::new().unwrap().parse(json, "l").unwrap();
        assert_eq!(packages[0].name, "@types/node");
        assert_eq!(packages[0].purl, "pkg:npm/%40types/node@20.1.0");
    }

    #[test]
    fn link_entries_are_skipped() {
        let json = r#"{ "packages": {
            "": { "name": "mono", "dependencies": { "lib": "*" } },
            "node_modules/lib": { "resolved": "packages/lib", "link": true },
            "packages/lib": { "name": "lib", "version": "0.1.0" }
        } }"#;
        let packages = NpmLockParser::new().unwrap().parse(json, "l").unwrap();
        assert_eq!(packages.len(), 2);
        let root = find(&packages, "mono", "");
        // 링크 대상은 이름 조회로 연결됩니다.
        assert!(root.dependencies.contains("pkg:npm/lib@0.1.0"));
    }

    #[test]
    fn parse_empty_packages() {
        let packages = NpmLockParser::new()
            .unwrap()
            .parse(r#"{ "packages": {} }"#, "package-lock.json")
            .unwrap();
        assert!(packages.is_empty());
    }

    #[test]
    fn parse_invalid_json_returns_error() {
        let result = NpmLockParser::new().unwrap().parse("not json!", "package-lock.json");
        assert!(matches!(result, Err(CollectorError::ManifestParse { .. })));
    }

    const SAMPLE_PACKAGE_JSON: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "license": "Apache-2.0",
  "author": "Jane Doe <jane@example.com>",
  "dependencies": {
    "lodash": "4.17.21",
    "express": "^4.18.2"
  },
  "devDependencies": {
    "jest": "29.0.0"
  }
}"#;

    #[test]
    fn manifest_parse_main_only() {
        let parser = NpmManifestParser::new();
        let main = parser
            .parse_main(SAMPLE_PACKAGE_JSON, "package.json")
            .unwrap()
            .unwrap();
        assert_eq!(main.name, "my-app");
        assert_eq!(main.version, "1.0.0");
        assert_eq!(main.supplier.as_deref(), Some("Jane Doe"));
        assert!(main.license_declared.contains("Apache-2.0"));
        assert!(main.dependencies.is_empty());
    }

    #[test]
    fn manifest_full_parse_keeps_only_pinned_versions() {
        let parser = NpmManifestParser::new();
        let packages = parser.parse(SAMPLE_PACKAGE_JSON, "package.json").unwrap();
        assert_eq!(packages.len(), 3);

        let main = find(&packages, "my-app", "1.0.0");
        assert!(main.dependencies.contains("pkg:npm/lodash@4.17.21"));
        assert!(main.dependencies.contains("pkg:npm/express"));
        find(&packages, "express", "");
        assert!(packages.iter().all(|p| p.name != "jest"));
    }

    #[test]
    fn manifest_without_name_has_no_main() {
        let parser = NpmManifestParser::new();
        let json = r#"{ "private": true, "dependencies": { "a": "1.0.0" } }"#;
        assert!(parser.parse_main(json, "package.json").unwrap().is_none());
        let packages = parser.parse(json, "package.json").unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "a");
    }

    #[test]
    fn author_object_form() {
        let json = r#"{ "name": "x", "author": { "name": "Acme", "url": "https://acme.dev" } }"#;
        let main = NpmManifestParser::new().parse_main(json, "p").unwrap().unwrap();
        assert_eq!(main.supplier.as_deref(), Some("Acme"));
    }

    #[test]
    fn extract_package_name_simple() {
        assert_eq!(extract_package_name("node_modules/lodash"), "lodash");
    }

    #[test]
    fn extract_package_name_scoped() {
        assert_eq!(
            extract_package_name("node_modules/@types/node"),
            "@types/node"
        );
    }

    #[test]
    fn extract_package_name_nested() {
        assert_eq!(
            extract_package_name("node_modules/express/node_modules/debug"),
            "debug"
        );
    }

    #[test]
    fn extract_package_name_workspace_path() {
        assert_eq!(extract_package_name("packages/lib"), "lib");
    }

    #[test]
    fn parent_key_walks_up() {
        assert_eq!(
            parent_key("node_modules/a/node_modules/b"),
            "node_modules/a"
        );
        assert_eq!(parent_key("node_modules/a"), "");
    }
}
