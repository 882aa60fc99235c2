//! 수집 엔진 에러 타입
//!
//! [`CollectorError`]는 수집 엔진 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<CollectorError> for DepsweepError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **매니페스트 파싱**: `ManifestParse` (collector 내부에서 로그 후 흡수)
//! - **패턴**: `InvalidPattern`
//! - **파일시스템 탐색**: `Walk` (치명적)
//! - **설정**: `Config`
//! - **파일 I/O**: `Io`, `FileTooBig`
//! - **워커**: `Worker`, `Cancelled`

use depsweep_core::error::{CollectError, ConfigError, DepsweepError};

/// 수집 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// 매니페스트/lockfile 파싱 실패
    #[error("manifest parse error: {path}: {reason}")]
    ManifestParse {
        /// 파싱 대상 파일 경로
        path: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// glob/정규식 패턴 컴파일 실패
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// 원본 패턴
        pattern: String,
        /// 실패 사유
        reason: String,
    },

    /// 파일시스템 탐색 실패
    #[error("walk error: {path}: {source}")]
    Walk {
        /// 실패한 경로
        path: String,
        /// 원본 walkdir 에러
        #[source]
        source: walkdir::Error,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 파일 크기 초과
    #[error("file too large: {path}: {size} bytes (max: {max})")]
    FileTooBig {
        /// 파일 경로
        path: String,
        /// 실제 파일 크기 (바이트)
        size: usize,
        /// 최대 허용 크기 (바이트)
        max: usize,
    },

    /// collector 워커 실패 (join 실패 등)
    #[error("worker error: {0}")]
    Worker(String),

    /// 탐색 도중 취소됨
    #[error("collection cancelled")]
    Cancelled,
}

impl From<CollectorError> for DepsweepError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::ManifestParse { path, reason } => DepsweepError::Collect(
                CollectError::ParseFailed(format!("{path}: {reason}")),
            ),
            CollectorError::InvalidPattern { pattern, reason } => {
                DepsweepError::Config(ConfigError::InvalidValue {
                    field: "collect.ignore_patterns".to_owned(),
                    reason: format!("'{pattern}': {reason}"),
                })
            }
            CollectorError::Walk { path, source } => {
                DepsweepError::Collect(CollectError::Walk(format!("{path}: {source}")))
            }
            CollectorError::Config { field, reason } => {
                DepsweepError::Config(ConfigError::InvalidValue { field, reason })
            }
            CollectorError::Io { path, source } => {
                DepsweepError::Collect(CollectError::Walk(format!("{path}: {source}")))
            }
            CollectorError::FileTooBig { path, size, max } => DepsweepError::Collect(
                CollectError::ParseFailed(format!("file too large: {path}: {size} bytes (max: {max})")),
            ),
            CollectorError::Worker(msg) => DepsweepError::Collect(CollectError::Worker(msg)),
            CollectorError::Cancelled => DepsweepError::Collect(CollectError::Cancelled),
        }
    }
}
