//! requirements.txt 파서
//!
//! pip requirements 형식에서 패키지 이름과 `==`로 고정된 버전을 추출합니다.
//! 범위 지정자는 해석하지 않으며 버전 없는 레코드가 됩니다. `-r`, `-e`, `--hash` 같은
//! 옵션 줄과 URL 요구사항은 건너뜁니다.

use regex::Regex;

use crate::consolidate::ConsolidateOptions;
use crate::error::CollectorError;
use crate::graph::DependencyGraph;
use crate::matcher::FileMatcher;
use crate::parser::{PackageParser, exact_version};
use crate::types::{Ecosystem, Package};

/// requirements 파일 이름 패턴 (`requirements.txt`, `requirements-dev.in` 등)
const FILE_PATTERN: &str = r"^requirements([-_.][A-Za-z0-9_.-]+)?\.(txt|in)$";

/// 요구사항 한 줄: 이름, extras, 나머지 지정자
const LINE_PATTERN: &str = r"^([A-Za-z0-9][A-Za-z0-9._-]*)\s*(\[[^\]]*\])?\s*(.*)$";

/// requirements.txt 파서
pub struct RequirementsParser {
    matcher: FileMatcher,
    line: Regex,
}

impl RequirementsParser {
    /// 파서를 생성합니다.
    pub fn new() -> Result<Self, CollectorError> {
        let line = Regex::new(LINE_PATTERN).map_err(|e| CollectorError::InvalidPattern {
            pattern: LINE_PATTERN.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            matcher: FileMatcher::regex(FILE_PATTERN)?,
            line,
        })
    }

    /// 한 줄을 (이름, 버전)으로 해석합니다. 요구사항이 아니면 `None`입니다.
    fn parse_line(&self, raw: &str) -> Option<(String, String)> {
        let without_comment = match raw.find(" #") {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        let line = without_comment.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') || line.contains("://")
        {
            return None;
        }

        // 환경 마커와 줄 끝 옵션(--hash 등) 제거
        let line = line.split(';').next().unwrap_or(line);
        let line = line.split(" --").next().unwrap_or(line).trim();

        let caps = self.line.captures(line)?;
        let name = caps.get(1)?.as_str().to_owned();
        let spec = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();

        let version = match spec.strip_prefix("===").or_else(|| spec.strip_prefix("==")) {
            Some(pinned) if !pinned.contains([',', '*']) => exact_version(pinned),
            _ => String::new(),
        };
        Some((name, version))
    }
}

impl PackageParser for RequirementsParser {
    fn matcher(&self) -> &FileMatcher {
        &self.matcher
    }

    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Package>, CollectorError> {
        let mut graph = DependencyGraph::new();

        // 백슬래시 줄 이어쓰기를 먼저 합칩니다.
        let joined = content.replace("\\\r\n", " ").replace("\\\n", " ");
        for raw in joined.lines() {
            if let Some((name, version)) = self.parse_line(raw) {
                graph.add_package(
                    Package::new(Ecosystem::Pypi.purl_type(), name, version)
                        .with_source(source_path),
                );
            }
        }

        Ok(graph.into_list(&ConsolidateOptions::lenient()))
    }
}
