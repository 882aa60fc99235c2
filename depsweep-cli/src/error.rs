//! CLI-specific error types and exit code mapping

use depsweep_collector::CollectorError;
use depsweep_core::error::DepsweepError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The collection run failed (walk error, invalid collector setup).
    #[error("collect error: {0}")]
    Collect(String),

    /// The run was interrupted before collectors were dispatched.
    #[error("collection cancelled")]
    Cancelled,

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from depsweep-core.
    #[error("{0}")]
    Core(#[from] DepsweepError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Collection failed                |
    /// | 10   | IO error                         |
    /// | 130  | Interrupted (Ctrl-C)             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(DepsweepError::Config(_)) => 2,
            Self::Collect(_) | Self::Core(DepsweepError::Collect(_)) => 3,
            Self::Io(_) | Self::Core(DepsweepError::Io(_)) => 10,
            Self::Cancelled => 130,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<CollectorError> for CliError {
    fn from(e: CollectorError) -> Self {
        match e {
            CollectorError::Cancelled => Self::Cancelled,
            CollectorError::Config { .. } | CollectorError::InvalidPattern { .. } => {
                Self::Config(e.to_string())
            }
            other => Self::Collect(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depsweep_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = DepsweepError::Config(ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_collect_error() {
        let err = CliError::Collect("walk failed".to_owned());
        assert_eq!(err.exit_code(), 3, "collect error should return exit code 3");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_cancelled() {
        assert_eq!(CliError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1, "command error should return exit code 1");
    }

    #[test]
    fn test_from_collector_cancelled() {
        let err: CliError = CollectorError::Cancelled.into();
        assert!(matches!(err, CliError::Cancelled));
    }

    #[test]
    fn test_from_collector_invalid_pattern_is_config() {
        let err: CliError = CollectorError::InvalidPattern {
            pattern: "[".to_owned(),
            reason: "unclosed class".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("["));
    }

    #[test]
    fn test_from_collector_worker_is_collect() {
        let err: CliError = CollectorError::Worker("join failed".to_owned()).into();
        assert!(matches!(err, CliError::Collect(_)));
        assert!(err.to_string().contains("join failed"));
    }

    #[test]
    fn test_error_display_command() {
        let err = CliError::Command("execution failed".to_owned());
        assert_eq!(err.to_string(), "execution failed");
    }
}
