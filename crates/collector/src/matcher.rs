//! 파일 매처
//!
//! collector의 파서가 어떤 파일을 담당할지 결정합니다. 이름 기반 매처는 경로의
//! 마지막 구성 요소만 검사하며, MIME 매처는 파일 앞부분의 magic byte를 읽습니다.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::error::CollectorError;

/// magic byte로 식별하는 바이너리 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeKind {
    /// ELF 실행 파일/공유 라이브러리
    Elf,
    /// Mach-O 바이너리
    MachO,
    /// Windows PE
    Pe,
    /// ZIP 아카이브 (jar, wheel 포함)
    Zip,
    /// gzip 아카이브
    Gzip,
    /// RPM 패키지
    Rpm,
}

impl MimeKind {
    /// MIME 타입 문자열
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Elf => "application/x-executable",
            Self::MachO => "application/x-mach-binary",
            Self::Pe => "application/vnd.microsoft.portable-executable",
            Self::Zip => "application/zip",
            Self::Gzip => "application/gzip",
            Self::Rpm => "application/x-rpm",
        }
    }

    /// 파일 앞부분 바이트로 형식을 판별합니다.
    pub fn sniff(head: &[u8]) -> Option<Self> {
        const MACHO: [[u8; 4]; 4] = [
            [0xFE, 0xED, 0xFA, 0xCE],
            [0xFE, 0xED, 0xFA, 0xCF],
            [0xCE, 0xFA, 0xED, 0xFE],
            [0xCF, 0xFA, 0xED, 0xFE],
        ];

        if head.starts_with(&[0x7F, b'E', b'L', b'F']) {
            Some(Self::Elf)
        } else if MACHO.iter().any(|magic| head.starts_with(magic)) {
            Some(Self::MachO)
        } else if head.starts_with(&[0xED, 0xAB, 0xEE, 0xDB]) {
            Some(Self::Rpm)
        } else if head.starts_with(b"PK\x03\x04") || head.starts_with(b"PK\x05\x06") {
            Some(Self::Zip)
        } else if head.starts_with(&[0x1F, 0x8B]) {
            Some(Self::Gzip)
        } else if head.starts_with(b"MZ") {
            Some(Self::Pe)
        } else {
            None
        }
    }

    /// 파일을 열어 형식을 판별합니다. 읽기 실패는 `None`입니다.
    pub fn sniff_file(path: &Path) -> Option<Self> {
        let file = File::open(path).ok()?;
        let mut head = Vec::with_capacity(8);
        file.take(8).read_to_end(&mut head).ok()?;
        Self::sniff(&head)
    }
}

impl fmt::Display for MimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// 파일 매칭 규칙
#[derive(Debug, Clone)]
pub enum FileMatcher {
    /// 정확한 파일 이름
    FileName(String),
    /// 파일 이름 glob
    Glob {
        /// 원본 패턴
        pattern: String,
        /// 컴파일된 매처
        matcher: GlobMatcher,
    },
    /// 파일 이름 정규식
    Regex(Regex),
    /// 파일 내용 기반 MIME 판별
    Mime(MimeKind),
}

impl FileMatcher {
    /// 정확한 파일 이름 매처
    pub fn file_name(name: impl Into<String>) -> Self {
        Self::FileName(name.into())
    }

    /// 파일 이름 glob 매처
    pub fn glob(pattern: &str) -> Result<Self, CollectorError> {
        let glob = Glob::new(pattern).map_err(|e| CollectorError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self::Glob {
            pattern: pattern.to_owned(),
            matcher: glob.compile_matcher(),
        })
    }

    /// 파일 이름 정규식 매처
    pub fn regex(pattern: &str) -> Result<Self, CollectorError> {
        let re = Regex::new(pattern).map_err(|e| CollectorError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self::Regex(re))
    }

    /// MIME 매처
    pub fn mime(kind: MimeKind) -> Self {
        Self::Mime(kind)
    }

    /// 경로가 이 규칙에 맞는지 검사합니다.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        match self {
            Self::FileName(expected) => name == expected,
            Self::Glob { matcher, .. } => matcher.is_match(name),
            Self::Regex(re) => re.is_match(name),
            Self::Mime(kind) => MimeKind::sniff_file(path) == Some(*kind),
        }
    }

    /// 로그와 목록 출력용 설명 (`glob:*.lock` 형식)
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FileMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileName(name) => write!(f, "name:{name}"),
            Self::Glob { pattern, .. } => write!(f, "glob:{pattern}"),
            Self::Regex(re) => write!(f, "regex:{}", re.as_str()),
            Self::Mime(kind) => write!(f, "mime:{kind}"),
        }
    }
}
