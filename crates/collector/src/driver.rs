//! 수집 드라이버 -- 탐색, 병렬 수집, 전역 통합
//!
//! [`CollectionDriver`]는 다음 순서로 동작합니다.
//!
//! 1. 루트 디렉토리를 한 번 탐색하며 ignore 패턴에 맞는 항목은 하위까지 건너뜁니다.
//!    탐색은 blocking 스레드에서 수행됩니다.
//! 2. 일반 파일마다 등록된 collector에 [`Collector::claim`]을 물어 요청을 모읍니다.
//! 3. 요청이 하나 이상인 collector만 각각 tokio task로 실행하고, 결과를 mpsc 채널로 모읍니다.
//! 4. 모든 결과를 전역 통합한 뒤 `source_location`에서 접두어를 제거합니다.
//!
//! 탐색 실패와 탐색 중 취소만 호출자에게 에러로 전달됩니다. collector 하나의 실패는
//! 경고 로그 후 0개 패키지로 취급됩니다.
//!
//! collector 패닉의 격리는 `panic = "unwind"`로 빌드된 경우에만 적용됩니다.
//! 워크스페이스의 dev/release 프로파일은 `panic = "abort"`이므로 패닉 시 프로세스가 종료됩니다.
//!
//! ```no_run
//! # async fn example() -> Result<(), depsweep_collector::CollectorError> {
//! use depsweep_collector::CollectionDriver;
//!
//! let driver = CollectionDriver::builder().builtin_collectors().build()?;
//! let packages = driver.collect("/path/to/repo").await?;
//! println!("{} packages", packages.len());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use globset::GlobSet;
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use depsweep_core::metrics as m;

use crate::collector::{CollectContext, CollectRequest, Collector, builtin_collectors};
use crate::config::CollectorConfig;
use crate::consolidate::consolidate;
use crate::error::CollectorError;
use crate::types::{Ecosystem, Package};

/// collector 단위 수집 결과
type WorkerResult = (String, Vec<Package>);

/// 병렬 수집 드라이버
pub struct CollectionDriver {
    config: CollectorConfig,
    collectors: Vec<Arc<Collector>>,
    ignore: GlobSet,
}

impl CollectionDriver {
    /// 새 빌더를 생성합니다.
    pub fn builder() -> CollectionDriverBuilder {
        CollectionDriverBuilder::new()
    }

    /// 활성화된 collector 이름 (등록 순서)
    pub fn collector_names(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// 드라이버 설정
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// 루트 디렉토리에서 패키지를 수집합니다.
    pub async fn collect(&self, root: impl AsRef<Path>) -> Result<Vec<Package>, CollectorError> {
        self.collect_with_cancel(root, CancellationToken::new()).await
    }

    /// 취소 토큰을 받아 수집합니다.
    ///
    /// 탐색 중이나 탐색 직후에 취소되면 collector를 실행하지 않고
    /// [`CollectorError::Cancelled`]를 반환합니다. 이미 실행 중인 collector는
    /// 끝까지 실행됩니다.
    pub async fn collect_with_cancel(
        &self,
        root: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> Result<Vec<Package>, CollectorError> {
        let root = root.as_ref().to_path_buf();
        let run_id = Uuid::new_v4();
        let span = info_span!("collect", %run_id, root = %root.display());
        self.run(root, cancel).instrument(span).await
    }

    async fn run(
        &self,
        root: PathBuf,
        cancel: CancellationToken,
    ) -> Result<Vec<Package>, CollectorError> {
        let started = Instant::now();
        info!(collectors = self.collectors.len(), "collection started");

        // 1-2. 탐색 및 요청 분배
        let plan = {
            let root = root.clone();
            let collectors = self.collectors.clone();
            let ignore = self.ignore.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || walk(&root, &collectors, &ignore, &cancel))
                .await
                .map_err(|e| CollectorError::Worker(format!("spawn_blocking failed: {e}")))??
        };

        if cancel.is_cancelled() {
            info!("collection cancelled before dispatch");
            return Err(CollectorError::Cancelled);
        }

        // 3. 요청이 있는 collector만 병렬 실행
        let ctx = CollectContext::from_config(&self.config);
        let (tx, mut rx) = mpsc::channel::<WorkerResult>(self.collectors.len().max(1));
        let mut handles = Vec::new();

        for (collector, requests) in self.collectors.iter().zip(plan) {
            if requests.is_empty() {
                continue;
            }
            let collector = Arc::clone(collector);
            let tx = tx.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(
                async move {
                    let name = collector.name().to_owned();
                    let files = requests.len();
                    let packages = match collector.collect(requests, ctx).await {
                        Ok(packages) => packages,
                        Err(e) => {
                            warn!(collector = %name, error = %e, "collector failed, contributing no packages");
                            Vec::new()
                        }
                    };
                    debug!(collector = %name, files, packages = packages.len(), "collector finished");
                    counter!(m::COLLECT_PACKAGES_TOTAL, m::LABEL_COLLECTOR => name.clone())
                        .increment(packages.len() as u64);
                    if tx.send((name, packages)).await.is_err() {
                        warn!("result channel closed before collector finished");
                    }
                }
                .in_current_span(),
            ));
        }
        drop(tx);
        gauge!(m::COLLECT_ACTIVE_WORKERS).set(handles.len() as f64);

        let mut combined = Vec::new();
        while let Some((_, packages)) = rx.recv().await {
            combined.extend(packages);
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "collector task panicked");
            }
        }
        gauge!(m::COLLECT_ACTIVE_WORKERS).set(0.0);

        // 4. 전역 통합 및 접두어 제거
        let raw = combined.len();
        let mut packages = consolidate(combined, &ctx.options);
        let prefix = if self.config.strip_prefix.is_empty() {
            root
        } else {
            PathBuf::from(&self.config.strip_prefix)
        };
        for pkg in &mut packages {
            pkg.source_location = strip_source_prefix(&pkg.source_location, &prefix);
        }

        let elapsed = started.elapsed();
        histogram!(m::COLLECT_DURATION_SECONDS).record(elapsed.as_secs_f64());
        info!(
            raw,
            packages = packages.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "collection completed"
        );
        Ok(packages)
    }
}

/// 루트를 탐색하여 collector별 요청 목록을 만듭니다.
///
/// `tokio::task::spawn_blocking` 내에서 호출되어야 합니다.
fn walk(
    root: &Path,
    collectors: &[Arc<Collector>],
    ignore: &GlobSet,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<CollectRequest>>, CollectorError> {
    let mut plan: Vec<Vec<CollectRequest>> = vec![Vec::new(); collectors.len()];

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored(ignore, root, entry.path()));

    for entry in walker {
        if cancel.is_cancelled() {
            return Err(CollectorError::Cancelled);
        }

        let entry = entry.map_err(|e| CollectorError::Walk {
            path: e
                .path()
                .unwrap_or(root)
                .display()
                .to_string(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        counter!(m::WALK_FILES_TOTAL).increment(1);

        for (idx, collector) in collectors.iter().enumerate() {
            if let Some(request) = collector.claim(entry.path()) {
                counter!(m::COLLECT_FILES_MATCHED_TOTAL, m::LABEL_COLLECTOR => collector.name().to_owned())
                    .increment(1);
                plan[idx].push(request);
            }
        }
    }

    Ok(plan)
}

/// 루트 기준 상대 경로 또는 항목 이름이 ignore 패턴에 맞는지 검사합니다.
fn is_ignored(ignore: &GlobSet, root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let ignored = ignore.is_match(relative)
        || path
            .file_name()
            .is_some_and(|name| ignore.is_match(Path::new(name)));
    if ignored {
        debug!(path = %path.display(), "ignored");
        counter!(m::WALK_IGNORED_TOTAL).increment(1);
    }
    ignored
}

/// `source_location`에서 접두어를 제거합니다. 접두어가 아니면 그대로 둡니다.
fn strip_source_prefix(location: &str, prefix: &Path) -> String {
    if location.is_empty() || prefix.as_os_str().is_empty() {
        return location.to_owned();
    }
    match Path::new(location).strip_prefix(prefix) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_owned(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => location.to_owned(),
    }
}

/// [`CollectionDriver`] 빌더
#[derive(Default)]
pub struct CollectionDriverBuilder {
    config: CollectorConfig,
    collectors: Vec<Collector>,
    builtin: bool,
}

impl CollectionDriverBuilder {
    /// 기본 설정을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 수집 엔진 설정을 지정합니다.
    pub fn config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// 기본 제공 collector(npm, cargo, pypi)를 등록합니다.
    pub fn builtin_collectors(mut self) -> Self {
        self.builtin = true;
        self
    }

    /// collector를 등록합니다. 기본 제공 collector 뒤에 배치됩니다.
    pub fn collector(mut self, collector: Collector) -> Self {
        self.collectors.push(collector);
        self
    }

    /// 설정을 검증하고 드라이버를 생성합니다.
    ///
    /// # Errors
    ///
    /// 설정 검증 실패 또는 ignore 패턴 컴파일 실패 시 에러 반환
    pub fn build(self) -> Result<CollectionDriver, CollectorError> {
        self.config.validate()?;
        let ignore = self.config.ignore_set()?;

        let mut all = if self.builtin {
            builtin_collectors()?
        } else {
            Vec::new()
        };
        all.extend(self.collectors);

        let (enabled, disabled): (Vec<_>, Vec<_>) = all
            .into_iter()
            .partition(|c| self.config.is_collector_enabled(c.name()));
        for c in &disabled {
            debug!(collector = %c.name(), "collector disabled by configuration");
        }

        for requested in &self.config.enabled_collectors {
            let requested = requested.trim();
            let known = requested == "*"
                || enabled.iter().any(|c| {
                    c.name().eq_ignore_ascii_case(requested)
                        || Ecosystem::from_str_loose(requested)
                            .is_some_and(|e| e.to_string() == c.name())
                });
            if !known {
                warn!(collector = %requested, "enabled collector is not registered");
            }
        }

        Ok(CollectionDriver {
            config: self.config,
            collectors: enabled.into_iter().map(Arc::new).collect(),
            ignore,
        })
    }
}
