//! 매니페스트 파서 -- package-lock.json, Cargo.lock, requirements.txt 등
//!
//! [`PackageParser`] trait은 각 매니페스트 형식의 파서가 구현해야 하는 인터페이스입니다.
//! [`MainPackageParser`]는 프로젝트 자신을 기술하는 매니페스트(package.json, Cargo.toml)를
//! 위해 "메인 패키지 하나만" 추출하는 연산을 추가합니다.
//!
//! # 지원 형식
//!
//! | collector | 파일 | 역할 | 파서 |
//! |-----------|------|------|------|
//! | npm | `package-lock.json`, `npm-shrinkwrap.json` | lock | [`NpmLockParser`](npm::NpmLockParser) |
//! | npm | `package.json` | main | [`NpmManifestParser`](npm::NpmManifestParser) |
//! | cargo | `Cargo.lock` | lock | [`CargoLockParser`](cargo::CargoLockParser) |
//! | cargo | `Cargo.toml` | main | [`CargoManifestParser`](cargo::CargoManifestParser) |
//! | pypi | `requirements*.txt`, `requirements*.in` | manifest | [`RequirementsParser`](pypi::RequirementsParser) |
//!
//! # 확장
//!
//! 새로운 형식을 지원하려면 `PackageParser` trait을 구현하고
//! [`Collector`](crate::collector::Collector)에 슬롯으로 등록합니다.

pub mod cargo;
pub mod npm;
pub mod pypi;

use std::fmt;
use std::sync::Arc;

use crate::error::CollectorError;
use crate::matcher::FileMatcher;
use crate::types::Package;

/// 매니페스트 파서 trait
pub trait PackageParser: Send + Sync {
    /// 이 파서가 담당하는 파일 규칙
    fn matcher(&self) -> &FileMatcher;

    /// 매니페스트 내용을 파싱하여 패키지 목록을 반환합니다.
    ///
    /// # Arguments
    ///
    /// - `content`: 파일 내용 (UTF-8 문자열)
    /// - `source_path`: 원본 파일 경로 (`source_location` 및 에러 메시지용)
    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Package>, CollectorError>;
}

/// 메인 매니페스트 파서 trait
///
/// 같은 디렉토리에 lockfile이 있으면 collector는 이 매니페스트에서 메인 패키지만
/// 추출하여 lockfile의 루트들과 연결합니다.
pub trait MainPackageParser: PackageParser {
    /// 프로젝트 자신을 나타내는 패키지를 반환합니다. 이름이 없으면 `None`입니다.
    fn parse_main(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Option<Package>, CollectorError>;
}

/// 요청 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestKind {
    /// lockfile (해석된 전체 의존성)
    Lock,
    /// 일반 매니페스트
    Manifest,
    /// 메인 매니페스트
    Main,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => write!(f, "lock"),
            Self::Manifest => write!(f, "manifest"),
            Self::Main => write!(f, "main"),
        }
    }
}

/// collector에 등록되는 파서 슬롯
#[derive(Clone)]
pub enum ParserSlot {
    /// lockfile 파서
    Lock(Arc<dyn PackageParser>),
    /// 일반 매니페스트 파서
    Manifest(Arc<dyn PackageParser>),
    /// 메인 매니페스트 파서
    Main(Arc<dyn MainPackageParser>),
}

impl ParserSlot {
    /// 슬롯의 요청 종류
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Lock(_) => RequestKind::Lock,
            Self::Manifest(_) => RequestKind::Manifest,
            Self::Main(_) => RequestKind::Main,
        }
    }

    /// 슬롯 파서의 파일 규칙
    pub fn matcher(&self) -> &FileMatcher {
        match self {
            Self::Lock(p) | Self::Manifest(p) => p.matcher(),
            Self::Main(p) => p.matcher(),
        }
    }

    /// 전체 파싱
    pub fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Package>, CollectorError> {
        match self {
            Self::Lock(p) | Self::Manifest(p) => p.parse(content, source_path),
            Self::Main(p) => p.parse(content, source_path),
        }
    }

    /// 메인 패키지만 파싱합니다. 메인 슬롯이 아니면 `None`입니다.
    pub fn parse_main(
        &self,
        content: &str,
        source_path: &str,
    ) -> Result<Option<Package>, CollectorError> {
        match self {
            Self::Main(p) => p.parse_main(content, source_path),
            Self::Lock(_) | Self::Manifest(_) => Ok(None),
        }
    }
}

impl fmt::Debug for ParserSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParserSlot({}, {})", self.kind(), self.matcher())
    }
}

/// 라이선스/작성자 문자열에서 `<email>`, `(url)` 부분을 제거합니다.
pub(crate) fn strip_contact(person: &str) -> String {
    let end = person
        .find(['<', '('])
        .unwrap_or(person.len());
    person[..end].trim().to_owned()
}

/// 범위가 아닌 정확한 버전만 추출합니다. 범위이면 빈 문자열입니다.
///
/// 허용: `1.2.3`, `=1.2.3`, `==1.2.3`, `v1.2.3-rc.1`
pub(crate) fn exact_version(spec: &str) -> String {
    let v = spec.trim().trim_start_matches('=').trim();
    let v = v.strip_prefix('v').unwrap_or(v);
    let mut parts = v.splitn(2, ['-', '+']);
    let core = parts.next().unwrap_or_default();
    let is_exact = !core.is_empty()
        && core.split('.').all(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    if is_exact { v.to_owned() } else { String::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_contact_removes_email_and_url() {
        assert_eq!(strip_contact("Jane Doe <jane@example.com>"), "Jane Doe");
        assert_eq!(strip_contact("Acme (https://acme.dev)"), "Acme");
        assert_eq!(strip_contact("  Plain  "), "Plain");
        assert_eq!(strip_contact("<only@mail>"), "");
    }

    #[test]
    fn exact_version_accepts_pins_only() {
        assert_eq!(exact_version("1.2.3"), "1.2.3");
        assert_eq!(exact_version("=1.2.3"), "1.2.3");
        assert_eq!(exact_version("==2.0"), "2.0");
        assert_eq!(exact_version("1.0.0-beta.1"), "1.0.0-beta.1");
        assert_eq!(exact_version("v2.1.0"), "2.1.0");
        assert_eq!(exact_version("^1.2.3"), "");
        assert_eq!(exact_version("~1.2"), "");
        assert_eq!(exact_version(">=1, <2"), "");
        assert_eq!(exact_version("1.x"), "");
        assert_eq!(exact_version("*"), "");
        assert_eq!(exact_version("latest"), "");
        assert_eq!(exact_version(""), "");
    }

    #[test]
    fn request_kind_display() {
        assert_eq!(RequestKind::Lock.to_string(), "lock");
        assert_eq!(RequestKind::Main.to_string(), "main");
    }

    #[test]
    fn manifest_slot_has_no_main_package() {
        let slot = ParserSlot::Manifest(Arc::new(pypi::RequirementsParser::new().unwrap()));
        assert_eq!(slot.kind(), RequestKind::Manifest);
        assert!(slot.parse_main("requests==2.0", "requirements.txt").unwrap().is_none());
    }
}
