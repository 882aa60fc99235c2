//! 설정 관리 — depsweep.toml 파싱 및 런타임 설정
//!
//! [`DepsweepConfig`]는 모든 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DEPSWEEP_COLLECT_STRICT_MODE=true` 형식)
//! 3. 설정 파일 (`depsweep.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! 환경변수는 프로세스 시작 시 한 번만 읽습니다. 이후 설정은 값으로
//! 전달되며, 전역 상태로 남지 않습니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), depsweep_core::error::DepsweepError> {
//! use depsweep_core::config::DepsweepConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DepsweepConfig::load("depsweep.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DepsweepConfig::parse("[collect]\nstrict_mode = true")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DepsweepError};

/// 허용되는 로그 레벨
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// 허용되는 로그 형식
const VALID_LOG_FORMATS: [&str; 2] = ["json", "pretty"];

/// depsweep 통합 설정
///
/// `depsweep.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepsweepConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집 설정
    #[serde(default)]
    pub collect: CollectConfig,
}

impl DepsweepConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DepsweepError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DepsweepError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DepsweepError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DepsweepError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DepsweepError> {
        toml::from_str(toml_str).map_err(|e| {
            DepsweepError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DEPSWEEP_{SECTION}_{FIELD}`
    /// 예: `DEPSWEEP_COLLECT_ENABLED_COLLECTORS=npm,cargo`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DEPSWEEP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DEPSWEEP_GENERAL_LOG_FORMAT");

        // Collect
        override_bool(&mut self.collect.strict_mode, "DEPSWEEP_COLLECT_STRICT_MODE");
        override_csv(
            &mut self.collect.ignore_patterns,
            "DEPSWEEP_COLLECT_IGNORE_PATTERNS",
        );
        override_csv(
            &mut self.collect.enabled_collectors,
            "DEPSWEEP_COLLECT_ENABLED_COLLECTORS",
        );
        override_string(&mut self.collect.strip_prefix, "DEPSWEEP_COLLECT_STRIP_PREFIX");
        override_usize(
            &mut self.collect.max_file_size,
            "DEPSWEEP_COLLECT_MAX_FILE_SIZE",
        );
        override_bool(
            &mut self.collect.external_tools,
            "DEPSWEEP_COLLECT_EXTERNAL_TOOLS",
        );
        override_u64(
            &mut self.collect.tool_timeout_secs,
            "DEPSWEEP_COLLECT_TOOL_TIMEOUT_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DepsweepError> {
        if !VALID_LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", VALID_LOG_LEVELS.join(", ")),
            }
            .into());
        }

        if !VALID_LOG_FORMATS.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", VALID_LOG_FORMATS.join(", ")),
            }
            .into());
        }

        if self.collect.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collect.max_file_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.collect.tool_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collect.tool_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.collect.enabled_collectors.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "collect.enabled_collectors".to_owned(),
                reason: "collector names must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 수집 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// strict 모드: 버전이 비어 있는 패키지도 제거
    pub strict_mode: bool,
    /// 탐색에서 제외할 glob 패턴 (디렉토리는 하위 전체가 제외됨)
    pub ignore_patterns: Vec<String>,
    /// 활성화할 collector 이름 목록 (`*` 또는 빈 목록이면 전체)
    pub enabled_collectors: Vec<String>,
    /// `source_location`에서 제거할 경로 접두사 (비어 있으면 탐색 루트)
    pub strip_prefix: String,
    /// 매니페스트 최대 허용 크기 (바이트)
    pub max_file_size: usize,
    /// 외부 도구(예: `cargo metadata`) 호출 허용 여부
    pub external_tools: bool,
    /// 외부 도구 실행 제한 시간 (초)
    pub tool_timeout_secs: u64,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            ignore_patterns: vec![
                ".git".to_owned(),
                ".hg".to_owned(),
                ".svn".to_owned(),
                "node_modules".to_owned(),
            ],
            enabled_collectors: vec!["*".to_owned()],
            strip_prefix: String::new(),
            max_file_size: 10 * 1024 * 1024, // 10 MB
            external_tools: false,
            tool_timeout_secs: 30,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match parse_env_bool(&val) {
            Some(parsed) => *target = parsed,
            None => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

/// 환경변수 스타일 불리언을 파싱합니다.
fn parse_env_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = DepsweepConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "pretty");
        assert!(!config.collect.strict_mode);
        assert_eq!(config.collect.enabled_collectors, vec!["*"]);
        assert!(config.collect.ignore_patterns.contains(&".git".to_owned()));
        assert_eq!(config.collect.max_file_size, 10 * 1024 * 1024);
        assert!(!config.collect.external_tools);
        config.validate().unwrap();
    }

    #[test]
    fn parse_partial_config_fills_defaults() {
        let config = DepsweepConfig::parse("[collect]\nstrict_mode = true\n").unwrap();
        assert!(config.collect.strict_mode);
        assert_eq!(config.collect.tool_timeout_secs, 30);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "json"

[collect]
strict_mode = true
ignore_patterns = ["vendor", "**/testdata"]
enabled_collectors = ["npm", "cargo"]
strip_prefix = "/src"
max_file_size = 1024
external_tools = true
tool_timeout_secs = 5
"#;
        let config = DepsweepConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.collect.ignore_patterns, vec!["vendor", "**/testdata"]);
        assert_eq!(config.collect.enabled_collectors, vec!["npm", "cargo"]);
        assert_eq!(config.collect.strip_prefix, "/src");
        assert_eq!(config.collect.max_file_size, 1024);
        assert!(config.collect.external_tools);
        assert_eq!(config.collect.tool_timeout_secs, 5);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = DepsweepConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            DepsweepError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = DepsweepConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = DepsweepConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_max_file_size() {
        let mut config = DepsweepConfig::default();
        config.collect.max_file_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_file_size"));
    }

    #[test]
    fn validate_rejects_zero_tool_timeout() {
        let mut config = DepsweepConfig::default();
        config.collect.tool_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_collector_name_in_list() {
        let mut config = DepsweepConfig::default();
        config.collect.enabled_collectors = vec!["npm".to_owned(), String::new()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("enabled_collectors"));
    }

    #[test]
    fn parse_env_bool_accepts_common_spellings() {
        assert_eq!(parse_env_bool("true"), Some(true));
        assert_eq!(parse_env_bool("1"), Some(true));
        assert_eq!(parse_env_bool("YES"), Some(true));
        assert_eq!(parse_env_bool(" on "), Some(true));
        assert_eq!(parse_env_bool("false"), Some(false));
        assert_eq!(parse_env_bool("0"), Some(false));
        assert_eq!(parse_env_bool("off"), Some(false));
        assert_eq!(parse_env_bool("maybe"), None);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = DepsweepConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = DepsweepConfig::parse(&toml_str).unwrap();
        assert_eq!(parsed.collect.ignore_patterns, config.collect.ignore_patterns);
        assert_eq!(parsed.collect.max_file_size, config.collect.max_file_size);
    }
}
