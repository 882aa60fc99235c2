//! Package URL 생성
//!
//! `pkg:<type>/<namespace>/<name>@<version>?<qualifiers>#<subpath>` 형식의 PURL을
//! 구성합니다. 파싱은 지원하지 않으며, 통합 단계는 PURL을 불투명한 문자열로
//! 비교합니다.
//!
//! # 정규화
//!
//! - type은 소문자로 변환하며, 비어 있으면 `generic`을 사용합니다.
//! - pypi 이름은 소문자로 변환하고 `_`를 `-`로 바꿉니다 (PURL 문자열에만 적용).
//! - qualifier는 키 순으로 정렬하며 값이 빈 항목은 생략합니다.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::Package;

/// PURL 구성 요소
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageUrl {
    /// 생태계 타입
    pub purl_type: String,
    /// 네임스페이스 (`/`로 구분된 세그먼트)
    pub namespace: String,
    /// 이름
    pub name: String,
    /// 버전
    pub version: String,
    /// qualifier (키 정렬)
    pub qualifiers: BTreeMap<String, String>,
    /// subpath
    pub subpath: String,
}

impl PackageUrl {
    /// 타입과 이름으로 생성합니다.
    pub fn new(purl_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            purl_type: purl_type.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// 네임스페이스를 지정합니다.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// 버전을 지정합니다.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// qualifier를 추가합니다. 키는 소문자로 저장됩니다.
    pub fn with_qualifier(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.qualifiers
            .insert(key.as_ref().to_lowercase(), value.into());
        self
    }

    /// subpath를 지정합니다.
    pub fn with_subpath(mut self, subpath: impl Into<String>) -> Self {
        self.subpath = subpath.into();
        self
    }

    fn normalized_type(&self) -> String {
        let t = self.purl_type.trim().to_lowercase();
        if t.is_empty() { "generic".to_owned() } else { t }
    }

    fn normalized_name(&self, purl_type: &str) -> String {
        match purl_type {
            "pypi" => self.name.to_lowercase().replace('_', "-"),
            _ => self.name.clone(),
        }
    }
}

impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let purl_type = self.normalized_type();
        write!(f, "pkg:{purl_type}/")?;

        for segment in self.namespace.split('/').filter(|s| !s.is_empty()) {
            write!(f, "{}/", encode(segment))?;
        }

        write!(f, "{}", encode(&self.normalized_name(&purl_type)))?;

        if !self.version.is_empty() {
            write!(f, "@{}", encode(&self.version))?;
        }

        let mut first = true;
        for (key, value) in self.qualifiers.iter().filter(|(_, v)| !v.is_empty()) {
            let sep = if first { '?' } else { '&' };
            write!(f, "{sep}{key}={}", encode(value))?;
            first = false;
        }

        let segments: Vec<String> = self
            .subpath
            .split('/')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .map(encode)
            .collect();
        if !segments.is_empty() {
            write!(f, "#{}", segments.join("/"))?;
        }

        Ok(())
    }
}

/// identity 필드로부터 PURL 문자열을 유도합니다.
///
/// 이름이 비어 있으면 빈 문자열을 반환합니다. 이름 없는 레코드는
/// PURL을 받지 않습니다.
pub fn derive_purl(purl_type: &str, namespace: &str, name: &str, version: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    PackageUrl::new(purl_type, name)
        .with_namespace(namespace)
        .with_version(version)
        .to_string()
}

/// 생태계별 규칙으로 패키지 이름을 (네임스페이스, 이름)으로 분리합니다.
///
/// - maven: 마지막 `:` 기준 (`group:artifact`)
/// - npm, golang 등 경로형 이름: 마지막 `/` 기준 (`@scope/name`)
/// - 그 외: 네임스페이스 없음
pub fn split_name(purl_type: &str, name: &str) -> (String, String) {
    let separator = match purl_type.to_lowercase().as_str() {
        "maven" => ':',
        "npm" | "golang" | "composer" | "github" | "bitbucket" | "swift" | "huggingface" => '/',
        _ => return (String::new(), name.to_owned()),
    };

    match name.rsplit_once(separator) {
        Some((ns, n)) if !n.is_empty() => (ns.to_owned(), n.to_owned()),
        _ => (String::new(), name.to_owned()),
    }
}

/// 레코드 비교에 쓰는 identity key `(type, name, version)`.
///
/// type은 대소문자를 구분하지 않습니다.
pub fn identity_key(pkg: &Package) -> (String, String, String) {
    (
        pkg.purl_type.to_lowercase(),
        pkg.name.clone(),
        pkg.version.clone(),
    )
}

/// PURL 세그먼트 percent-encoding (unreserved와 `:`는 유지)
fn encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b':' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
