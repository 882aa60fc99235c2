//! 수집 엔진 설정
//!
//! [`CollectorConfig`]는 core의 [`CollectConfig`](depsweep_core::config::CollectConfig)에서
//! 파생되며, 드라이버 구성에 필요한 검증 로직을 추가합니다.
//!
//! # 사용 예시
//!
//! ```
//! use depsweep_collector::CollectorConfigBuilder;
//!
//! let config = CollectorConfigBuilder::new()
//!     .strict_mode(true)
//!     .enabled_collectors(vec!["npm".to_owned()])
//!     .build()
//!     .unwrap();
//! assert!(config.is_collector_enabled("npm"));
//! assert!(!config.is_collector_enabled("cargo"));
//! ```

use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::consolidate::ConsolidateOptions;
use crate::error::CollectorError;
use crate::types::Ecosystem;

/// 설정 상한값 상수
const MAX_FILE_SIZE: usize = 100 * 1024 * 1024; // 100 MB
const MAX_TOOL_TIMEOUT_SECS: u64 = 600;

/// 수집 엔진 설정
///
/// # 필드
///
/// - **strict_mode**: 버전 없는 레코드 제거 여부
/// - **ignore_patterns**: 탐색에서 제외할 glob 패턴
/// - **enabled_collectors**: 활성화할 collector 이름 (`*`는 전체)
/// - **strip_prefix**: `source_location`에서 제거할 접두어 (비어 있으면 루트)
/// - **max_file_size**: 파싱할 매니페스트 최대 크기 (바이트)
/// - **external_tools**: 외부 도구 기반 보강 허용 여부
/// - **tool_timeout_secs**: 외부 도구 실행 제한 시간
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// 버전 없는 레코드 제거 여부
    pub strict_mode: bool,
    /// 탐색 제외 glob 패턴
    pub ignore_patterns: Vec<String>,
    /// 활성화할 collector 이름
    pub enabled_collectors: Vec<String>,
    /// `source_location` 접두어
    pub strip_prefix: String,
    /// 매니페스트 최대 크기 (바이트)
    pub max_file_size: usize,
    /// 외부 도구 허용 여부
    pub external_tools: bool,
    /// 외부 도구 제한 시간 (초)
    pub tool_timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::from_core(&depsweep_core::config::CollectConfig::default())
    }
}

impl CollectorConfig {
    /// core의 `CollectConfig`에서 수집 엔진 설정을 생성합니다.
    pub fn from_core(core: &depsweep_core::config::CollectConfig) -> Self {
        Self {
            strict_mode: core.strict_mode,
            ignore_patterns: core.ignore_patterns.clone(),
            enabled_collectors: core.enabled_collectors.clone(),
            strip_prefix: core.strip_prefix.clone(),
            max_file_size: core.max_file_size,
            external_tools: core.external_tools,
            tool_timeout_secs: core.tool_timeout_secs,
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `max_file_size`: 1-104857600 (100MB)
    /// - `tool_timeout_secs`: 1-600
    /// - `ignore_patterns`: 모든 패턴이 glob으로 컴파일되어야 함
    /// - `enabled_collectors`: 빈 이름 불가
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE {
            return Err(CollectorError::Config {
                field: "max_file_size".to_owned(),
                reason: format!("must be 1-{MAX_FILE_SIZE}"),
            });
        }

        if self.tool_timeout_secs == 0 || self.tool_timeout_secs > MAX_TOOL_TIMEOUT_SECS {
            return Err(CollectorError::Config {
                field: "tool_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TOOL_TIMEOUT_SECS}"),
            });
        }

        if self.enabled_collectors.iter().any(|n| n.trim().is_empty()) {
            return Err(CollectorError::Config {
                field: "enabled_collectors".to_owned(),
                reason: "collector name must not be empty".to_owned(),
            });
        }

        self.ignore_set()?;
        Ok(())
    }

    /// ignore 패턴을 하나의 `GlobSet`으로 컴파일합니다.
    pub fn ignore_set(&self) -> Result<GlobSet, CollectorError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| CollectorError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| CollectorError::InvalidPattern {
            pattern: self.ignore_patterns.join(","),
            reason: e.to_string(),
        })
    }

    /// 해당 이름의 collector가 활성화되었는지 확인합니다 (대소문자 무시, 별칭 허용).
    pub fn is_collector_enabled(&self, name: &str) -> bool {
        if self.enabled_collectors.is_empty() {
            return true;
        }
        self.enabled_collectors.iter().any(|entry| {
            let entry = entry.trim();
            entry == "*"
                || entry.eq_ignore_ascii_case(name)
                || Ecosystem::from_str_loose(entry)
                    .is_some_and(|eco| eco.to_string().eq_ignore_ascii_case(name))
        })
    }

    /// 통합 옵션
    pub fn consolidate_options(&self) -> ConsolidateOptions {
        ConsolidateOptions {
            strict: self.strict_mode,
        }
    }

    /// 외부 도구 제한 시간. 외부 도구가 비활성화되어 있으면 `None`입니다.
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.external_tools
            .then(|| Duration::from_secs(self.tool_timeout_secs))
    }
}

/// [`CollectorConfig`] 빌더
///
/// 유연한 설정 구성 및 빌드 시 유효성 검증을 제공합니다.
#[derive(Default)]
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// strict 모드를 설정합니다.
    pub fn strict_mode(mut self, strict: bool) -> Self {
        self.config.strict_mode = strict;
        self
    }

    /// ignore 패턴 목록을 설정합니다.
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.ignore_patterns = patterns;
        self
    }

    /// ignore 패턴을 하나 추가합니다.
    pub fn ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.ignore_patterns.push(pattern.into());
        self
    }

    /// 활성화할 collector 목록을 설정합니다.
    pub fn enabled_collectors(mut self, names: Vec<String>) -> Self {
        self.config.enabled_collectors = names;
        self
    }

    /// `source_location` 접두어를 설정합니다.
    pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.strip_prefix = prefix.into();
        self
    }

    /// 최대 파일 크기(바이트)를 설정합니다.
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.config.max_file_size = size;
        self
    }

    /// 외부 도구 허용 여부를 설정합니다.
    pub fn external_tools(mut self, enabled: bool) -> Self {
        self.config.external_tools = enabled;
        self
    }

    /// 외부 도구 제한 시간(초)을 설정합니다.
    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `CollectorError::Config` 또는 `InvalidPattern` 반환
    pub fn build(self) -> Result<CollectorConfig, CollectorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
