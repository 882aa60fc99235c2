#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{CollectError, ConfigError, DepsweepError};

// 설정
pub use config::{CollectConfig, DepsweepConfig, GeneralConfig};
