//! 도메인 타입 -- 수집 엔진 전용 데이터 구조
//!
//! 패키지 레코드와 생태계 등 수집/통합 단계에서 공유하는 핵심 타입을 정의합니다.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::purl;

/// 패키지 생태계 (언어/패키지 관리자)
///
/// collector 이름과 PURL 타입의 대응 관계를 나타냅니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ecosystem {
    /// Rust (Cargo.lock, Cargo.toml)
    Cargo,
    /// JavaScript/TypeScript (package-lock.json, package.json)
    Npm,
    /// Go (go.mod)
    Golang,
    /// Python (requirements.txt)
    Pypi,
    /// Java (pom.xml)
    Maven,
    /// Ruby (Gemfile.lock)
    Gem,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cargo => write!(f, "cargo"),
            Self::Npm => write!(f, "npm"),
            Self::Golang => write!(f, "golang"),
            Self::Pypi => write!(f, "pypi"),
            Self::Maven => write!(f, "maven"),
            Self::Gem => write!(f, "gem"),
        }
    }
}

impl Ecosystem {
    /// 생태계에 대응하는 Package URL 타입을 반환합니다.
    ///
    /// 예: Cargo -> "cargo", Golang -> "golang"
    pub fn purl_type(&self) -> &'static str {
        match self {
            Self::Cargo => "cargo",
            Self::Npm => "npm",
            Self::Golang => "golang",
            Self::Pypi => "pypi",
            Self::Maven => "maven",
            Self::Gem => "gem",
        }
    }

    /// 문자열에서 생태계를 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cargo" | "rust" | "crate" | "crates" => Some(Self::Cargo),
            "npm" | "node" | "javascript" | "js" => Some(Self::Npm),
            "go" | "golang" => Some(Self::Golang),
            "pip" | "python" | "pypi" => Some(Self::Pypi),
            "maven" | "java" | "mvn" => Some(Self::Maven),
            "gem" | "ruby" | "rubygems" => Some(Self::Gem),
            _ => None,
        }
    }
}

/// 패키지 레코드
///
/// collector가 생성하고 통합 단계가 병합하는 단일 패키지 정보입니다.
/// `(purl_type, name, version)`이 identity key이며, `purl`이 비어 있으면
/// 통합 단계에서 identity로부터 채워집니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// 패키지 이름 (maven은 `group:artifact`, npm scope는 `@scope/name`)
    pub name: String,
    /// 패키지 버전 (알 수 없으면 빈 문자열)
    #[serde(default)]
    pub version: String,
    /// 생태계 식별자 (PURL type)
    #[serde(rename = "type")]
    pub purl_type: String,
    /// Package URL
    #[serde(default)]
    pub purl: String,
    /// 공급자 (작성자/조직)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    /// 선언된 라이선스 집합
    #[serde(default)]
    pub license_declared: BTreeSet<String>,
    /// 확정된 라이선스 집합
    #[serde(default)]
    pub license_concluded: BTreeSet<String>,
    /// 의존 대상 PURL 집합
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    /// 패키지를 발견한 매니페스트 경로
    #[serde(default)]
    pub source_location: String,
}

impl Package {
    /// 타입, 이름, 버전으로 새 레코드를 생성합니다. PURL은 비어 있습니다.
    pub fn new(
        purl_type: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            purl_type: purl_type.into(),
            ..Self::default()
        }
    }

    /// 미리 계산된 PURL을 지정합니다.
    pub fn with_purl(mut self, purl: impl Into<String>) -> Self {
        self.purl = purl.into();
        self
    }

    /// 공급자를 지정합니다. 빈 문자열은 무시합니다.
    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        let supplier = supplier.into();
        if !supplier.trim().is_empty() {
            self.supplier = Some(supplier.trim().to_owned());
        }
        self
    }

    /// 선언된 라이선스를 추가합니다. 빈 문자열은 무시합니다.
    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        let license = license.into();
        if !license.trim().is_empty() {
            self.license_declared.insert(license.trim().to_owned());
        }
        self
    }

    /// 발견 위치를 지정합니다.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_location = source.into();
        self
    }

    /// identity에서 유도한 PURL을 반환합니다. 이름이 비어 있으면 빈 문자열입니다.
    pub fn derived_purl(&self) -> String {
        let (namespace, name) = purl::split_name(&self.purl_type, &self.name);
        purl::derive_purl(&self.purl_type, &namespace, &name, &self.version)
    }

    /// PURL이 비어 있으면 identity에서 채웁니다.
    pub fn ensure_purl(&mut self) {
        if self.purl.is_empty() {
            self.purl = self.derived_purl();
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{} ({})", self.name, self.purl_type)
        } else {
            write!(f, "{}@{} ({})", self.name, self.version, self.purl_type)
        }
    }
}
