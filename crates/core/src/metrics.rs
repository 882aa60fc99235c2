//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 수집 엔진은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않은 경우 모든 호출은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `depsweep_`
//! - 단계명: `walk_`, `collect_`, `consolidate_`, `tool_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(depsweep_core::metrics::COLLECT_PARSE_ERRORS_TOTAL,
//!     depsweep_core::metrics::LABEL_COLLECTOR => "npm").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// collector 레이블 키 (npm, cargo, pypi, ...)
pub const LABEL_COLLECTOR: &str = "collector";

/// 제거 사유 레이블 키 (empty_name, empty_version)
pub const LABEL_REASON: &str = "reason";

/// 결과 레이블 키 (success, failure, timeout)
pub const LABEL_RESULT: &str = "result";

// ─── Walk 메트릭 ───────────────────────────────────────────────────

/// Walk: 탐색한 일반 파일 수 (counter)
pub const WALK_FILES_TOTAL: &str = "depsweep_walk_files_total";

/// Walk: ignore 패턴으로 제외된 항목 수 (counter)
pub const WALK_IGNORED_TOTAL: &str = "depsweep_walk_ignored_total";

// ─── Collect 메트릭 ────────────────────────────────────────────────

/// Collect: collector에 할당된 파일 수 (counter, label: collector)
pub const COLLECT_FILES_MATCHED_TOTAL: &str = "depsweep_collect_files_matched_total";

/// Collect: 파싱 실패 수 (counter, label: collector)
pub const COLLECT_PARSE_ERRORS_TOTAL: &str = "depsweep_collect_parse_errors_total";

/// Collect: collector가 반환한 패키지 수 (counter, label: collector)
pub const COLLECT_PACKAGES_TOTAL: &str = "depsweep_collect_packages_total";

/// Collect: 동시에 실행된 collector 워커 수 (gauge)
pub const COLLECT_ACTIVE_WORKERS: &str = "depsweep_collect_active_workers";

/// Collect: 전체 수집 소요 시간 (histogram, 초)
pub const COLLECT_DURATION_SECONDS: &str = "depsweep_collect_duration_seconds";

// ─── Consolidate 메트릭 ────────────────────────────────────────────

/// Consolidate: 유효성 필터로 제거된 레코드 수 (counter, label: reason)
pub const CONSOLIDATE_DROPPED_TOTAL: &str = "depsweep_consolidate_dropped_total";

/// Consolidate: 병합으로 흡수된 레코드 수 (counter)
pub const CONSOLIDATE_MERGED_TOTAL: &str = "depsweep_consolidate_merged_total";

// ─── Tool 메트릭 ───────────────────────────────────────────────────

/// Tool: 외부 도구 실행 수 (counter, label: result)
pub const TOOL_RUNS_TOTAL: &str = "depsweep_tool_runs_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_metrics() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(WALK_FILES_TOTAL, "Total number of regular files visited");
    describe_counter!(
        WALK_IGNORED_TOTAL,
        "Total number of entries pruned by ignore patterns"
    );

    describe_counter!(
        COLLECT_FILES_MATCHED_TOTAL,
        "Files claimed by a collector, per collector"
    );
    describe_counter!(
        COLLECT_PARSE_ERRORS_TOTAL,
        "Manifest parse failures, per collector"
    );
    describe_counter!(
        COLLECT_PACKAGES_TOTAL,
        "Package records returned by collectors before consolidation"
    );
    describe_gauge!(
        COLLECT_ACTIVE_WORKERS,
        "Number of collector workers dispatched in the last run"
    );
    describe_histogram!(
        COLLECT_DURATION_SECONDS,
        "End-to-end collection latency in seconds"
    );

    describe_counter!(
        CONSOLIDATE_DROPPED_TOTAL,
        "Records dropped by the validity filter, per reason"
    );
    describe_counter!(
        CONSOLIDATE_MERGED_TOTAL,
        "Records folded into another record during consolidation"
    );

    describe_counter!(TOOL_RUNS_TOTAL, "External tool invocations, per result");
}
