//! 외부 도구 실행
//!
//! 패키지 관리자 CLI(`cargo metadata` 등)를 제한 시간 안에서 실행합니다.
//! 실패, 비정상 종료, 시간 초과는 모두 경고 로그 후 `None`으로 처리되며
//! 호출자에게 에러로 전파되지 않습니다.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use metrics::counter;
use tokio::process::Command;
use tracing::{debug, warn};

use depsweep_core::metrics as m;

/// stderr 로그에 남길 최대 길이
const STDERR_SNIPPET_LEN: usize = 512;

/// 외부 명령을 실행하고 성공 시 stdout을 반환합니다.
///
/// 제한 시간이 지나면 프로세스를 종료하고 `None`을 반환합니다.
pub async fn run_bounded(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Option<String> {
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(program, cwd = %cwd.display(), error = %e, "failed to spawn external tool");
            counter!(m::TOOL_RUNS_TOTAL, m::LABEL_RESULT => "failure").increment(1);
            return None;
        }
    };

    // 시간 초과 시 future가 drop되면서 kill_on_drop으로 프로세스가 종료됩니다.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(program, error = %e, "failed to wait for external tool");
            counter!(m::TOOL_RUNS_TOTAL, m::LABEL_RESULT => "failure").increment(1);
            return None;
        }
        Err(_) => {
            warn!(
                program,
                timeout_secs = timeout.as_secs_f64(),
                "external tool timed out, process killed"
            );
            counter!(m::TOOL_RUNS_TOTAL, m::LABEL_RESULT => "timeout").increment(1);
            return None;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let snippet: String = stderr.chars().take(STDERR_SNIPPET_LEN).collect();
        warn!(program, status = %output.status, stderr = %snippet.trim(), "external tool failed");
        counter!(m::TOOL_RUNS_TOTAL, m::LABEL_RESULT => "failure").increment(1);
        return None;
    }

    match String::from_utf8(output.stdout) {
        Ok(stdout) => {
            debug!(program, bytes = stdout.len(), "external tool finished");
            counter!(m::TOOL_RUNS_TOTAL, m::LABEL_RESULT => "success").increment(1);
            Some(stdout)
        }
        Err(e) => {
            warn!(program, error = %e, "external tool produced non-UTF-8 output");
            counter!(m::TOOL_RUNS_TOTAL, m::LABEL_RESULT => "failure").increment(1);
            None
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_bounded("echo", &["hello"], dir.path(), Duration::from_secs(5)).await;
        assert_eq!(out.as_deref().map(str::trim), Some("hello"));
    }

    #[tokio::test]
    async fn missing_program_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_bounded(
            "depsweep-definitely-not-installed",
            &[],
            dir.path(),
            Duration::from_secs(5),
        )
        .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn non_zero_exit_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_bounded("sh", &["-c", "echo oops >&2; exit 3"], dir.path(), Duration::from_secs(5)).await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn timeout_kills_and_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let started = std::time::Instant::now();
        let out = run_bounded("sleep", &["10"], dir.path(), Duration::from_millis(200)).await;
        assert!(out.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
