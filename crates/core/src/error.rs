//! 에러 타입 — 도메인별 에러 정의
//!
//! 수집 과정의 에러는 네 가지로 나뉩니다.
//!
//! - 파일시스템 탐색 실패: 치명적, 호출자에게 전파 ([`CollectError::Walk`])
//! - 단일 파일 파싱 실패: 로그 후 해당 파일은 0개 패키지로 취급
//! - 필수 필드가 없는 레코드: 통합 단계에서 조용히 제거 (에러 아님)
//! - 모호한 병합 (같은 이름, 서로 다른 버전): 에러 아님, 두 레코드 유지
//!
//! 호출자에게 도달하는 것은 첫 번째 범주와 설정 에러뿐입니다.

/// depsweep 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DepsweepError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 수집 처리 에러
    #[error("collect error: {0}")]
    Collect(#[from] CollectError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 수집 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// 파일시스템 탐색 실패 (치명적)
    #[error("walk failed: {0}")]
    Walk(String),

    /// 매니페스트 파싱 실패
    #[error("parse failed: {0}")]
    ParseFailed(String),

    /// 수집 워커 실패
    #[error("worker failed: {0}")]
    Worker(String),

    /// 취소됨
    #[error("collection cancelled")]
    Cancelled,
}
