//! Collector -- 생태계별 파서 묶음과 합성 정책
//!
//! [`Collector`]는 하나의 생태계(npm, cargo, pypi, ...)에 속한 파서 슬롯을 등록 순서대로
//! 보관합니다. 드라이버는 탐색 중 발견한 파일마다 [`Collector::claim`]을 호출하고,
//! 탐색이 끝나면 요청 목록을 [`Collector::collect`]에 넘깁니다.
//!
//! # 디렉토리 단위 합성
//!
//! 요청은 부모 디렉토리별로 묶여 처리됩니다.
//!
//! 1. [`ComposePolicy`]에 따라 lock/manifest 요청을 파싱합니다.
//! 2. 같은 디렉토리에 패키지를 낸 lockfile이 있으면 메인 매니페스트에서는 메인 패키지만
//!    추출하여 lockfile 그래프의 루트들과 연결합니다. lockfile이 없으면 메인 매니페스트
//!    전체를 파싱합니다.
//! 3. [`Enrichment`]가 지정되어 있고 외부 도구가 허용되면 결과를 보강합니다.
//!
//! 파일 하나의 읽기/파싱 실패는 경고 로그 후 해당 파일을 0개 패키지로 취급합니다.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use metrics::counter;
use tracing::{debug, warn};

use depsweep_core::metrics as m;

use crate::config::CollectorConfig;
use crate::consolidate::ConsolidateOptions;
use crate::error::CollectorError;
use crate::graph::DependencyGraph;
use crate::parser::cargo::{self, CargoLockParser, CargoManifestParser};
use crate::parser::npm::{NpmLockParser, NpmManifestParser};
use crate::parser::pypi::RequirementsParser;
use crate::parser::{MainPackageParser, PackageParser, ParserSlot, RequestKind};
use crate::types::{Ecosystem, Package};

/// 같은 디렉토리의 lock/manifest 요청을 어떻게 조합할지 결정합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComposePolicy {
    /// 모든 요청을 파싱합니다.
    #[default]
    All,
    /// lockfile이 여러 개면 수정 시각이 가장 최근인 것만 파싱합니다.
    LatestLockfile,
    /// 모든 요청을 파싱한 뒤 패키지가 가장 많은 결과 하나만 사용합니다.
    RichestSource,
}

/// 합성 이후 적용할 보강 단계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Enrichment {
    /// 보강 없음
    #[default]
    None,
    /// `cargo metadata`로 라이선스/공급자 보강
    CargoMetadata,
}

/// collector가 처리할 파일 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectRequest {
    /// 파일 경로
    pub path: PathBuf,
    /// 요청 종류
    pub kind: RequestKind,
    slot: usize,
}

/// collector 실행에 필요한 값
#[derive(Debug, Clone)]
pub struct CollectContext {
    /// 통합 옵션
    pub options: ConsolidateOptions,
    /// 매니페스트 최대 크기 (바이트)
    pub max_file_size: usize,
    /// 외부 도구 제한 시간 (`None`이면 외부 도구 비활성)
    pub tool_timeout: Option<Duration>,
}

impl Default for CollectContext {
    fn default() -> Self {
        Self::from_config(&CollectorConfig::default())
    }
}

impl CollectContext {
    /// 수집 엔진 설정에서 생성합니다.
    pub fn from_config(config: &CollectorConfig) -> Self {
        Self {
            options: config.consolidate_options(),
            max_file_size: config.max_file_size,
            tool_timeout: config.tool_timeout(),
        }
    }
}

/// 생태계별 collector
#[derive(Debug)]
pub struct Collector {
    name: String,
    purl_type: String,
    slots: Vec<ParserSlot>,
    policy: ComposePolicy,
    enrichment: Enrichment,
}

impl Collector {
    /// 이름과 PURL 타입으로 빈 collector를 생성합니다.
    pub fn new(name: impl Into<String>, purl_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purl_type: purl_type.into(),
            slots: Vec::new(),
            policy: ComposePolicy::default(),
            enrichment: Enrichment::default(),
        }
    }

    /// 생태계 이름과 PURL 타입을 그대로 사용하는 collector를 생성합니다.
    pub fn for_ecosystem(ecosystem: Ecosystem) -> Self {
        Self::new(ecosystem.to_string(), ecosystem.purl_type())
    }

    /// lockfile 파서를 등록합니다.
    pub fn lockfile(mut self, parser: impl PackageParser + 'static) -> Self {
        self.slots.push(ParserSlot::Lock(Arc::new(parser)));
        self
    }

    /// 일반 매니페스트 파서를 등록합니다.
    pub fn manifest(mut self, parser: impl PackageParser + 'static) -> Self {
        self.slots.push(ParserSlot::Manifest(Arc::new(parser)));
        self
    }

    /// 메인 매니페스트 파서를 등록합니다.
    pub fn main_manifest(mut self, parser: impl MainPackageParser + 'static) -> Self {
        self.slots.push(ParserSlot::Main(Arc::new(parser)));
        self
    }

    /// 합성 정책을 지정합니다.
    pub fn policy(mut self, policy: ComposePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 보강 단계를 지정합니다.
    pub fn enrichment(mut self, enrichment: Enrichment) -> Self {
        self.enrichment = enrichment;
        self
    }

    /// collector 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 생성하는 패키지의 PURL 타입
    pub fn purl_type(&self) -> &str {
        &self.purl_type
    }

    /// 등록된 파서 슬롯
    pub fn slots(&self) -> &[ParserSlot] {
        &self.slots
    }

    /// 파일을 담당할 첫 번째 슬롯을 찾아 요청으로 만듭니다.
    pub fn claim(&self, path: &Path) -> Option<CollectRequest> {
        self.slots
            .iter()
            .position(|slot| slot.matcher().matches(path))
            .map(|slot| CollectRequest {
                path: path.to_path_buf(),
                kind: self.slots[slot].kind(),
                slot,
            })
    }

    /// 요청 목록을 처리하여 패키지 목록을 반환합니다.
    ///
    /// 파싱은 blocking 스레드에서 수행하며, 보강 단계는 비동기로 실행됩니다.
    pub async fn collect(
        self: Arc<Self>,
        requests: Vec<CollectRequest>,
        ctx: CollectContext,
    ) -> Result<Vec<Package>, CollectorError> {
        let worker = Arc::clone(&self);
        let blocking_ctx = ctx.clone();
        let (packages, dirs) =
            tokio::task::spawn_blocking(move || worker.compose(requests, &blocking_ctx))
                .await
                .map_err(|e| CollectorError::Worker(format!("spawn_blocking failed: {e}")))?;

        match (self.enrichment, ctx.tool_timeout) {
            (Enrichment::CargoMetadata, Some(timeout)) => {
                Ok(cargo::enrich_from_metadata(packages, &dirs, timeout).await)
            }
            _ => Ok(packages),
        }
    }

    /// 디렉토리별 합성 (blocking)
    fn compose(
        &self,
        requests: Vec<CollectRequest>,
        ctx: &CollectContext,
    ) -> (Vec<Package>, Vec<PathBuf>) {
        let mut by_dir: BTreeMap<PathBuf, Vec<CollectRequest>> = BTreeMap::new();
        for req in requests {
            let dir = req.path.parent().map(Path::to_path_buf).unwrap_or_default();
            by_dir.entry(dir).or_default().push(req);
        }

        let dirs: Vec<PathBuf> = by_dir.keys().cloned().collect();
        let mut packages = Vec::new();

        for (dir, mut reqs) in by_dir {
            reqs.sort_by(|a, b| a.path.cmp(&b.path));
            let (mains, sources): (Vec<_>, Vec<_>) =
                reqs.into_iter().partition(|r| r.kind == RequestKind::Main);

            let parsed = self.parse_sources(sources, ctx);
            let has_lock = parsed
                .iter()
                .any(|(kind, pkgs)| *kind == RequestKind::Lock && !pkgs.is_empty());
            let mut dir_packages: Vec<Package> =
                parsed.into_iter().flat_map(|(_, pkgs)| pkgs).collect();

            for main in mains {
                if has_lock {
                    if let Some(main_pkg) = self.parse_main_request(&main, ctx) {
                        dir_packages = link_main(dir_packages, main_pkg);
                    }
                } else {
                    dir_packages.extend(self.parse_request(&main, ctx));
                }
            }

            debug!(
                collector = %self.name,
                dir = %dir.display(),
                packages = dir_packages.len(),
                "directory composed"
            );
            packages.extend(dir_packages);
        }

        (packages, dirs)
    }

    /// 정책에 따라 lock/manifest 요청을 파싱합니다.
    fn parse_sources(
        &self,
        sources: Vec<CollectRequest>,
        ctx: &CollectContext,
    ) -> Vec<(RequestKind, Vec<Package>)> {
        match self.policy {
            ComposePolicy::All => sources
                .iter()
                .map(|req| (req.kind, self.parse_request(req, ctx)))
                .collect(),
            ComposePolicy::LatestLockfile => {
                let (locks, others): (Vec<_>, Vec<_>) = sources
                    .into_iter()
                    .partition(|r| r.kind == RequestKind::Lock);

                let latest = locks
                    .iter()
                    .map(|req| (modified_time(&req.path), req))
                    // 시각이 같으면 경로가 작은 쪽
                    .max_by(|(ta, a), (tb, b)| ta.cmp(tb).then_with(|| b.path.cmp(&a.path)))
                    .map(|(_, req)| req);

                for skipped in locks.iter().filter(|r| Some(*r) != latest) {
                    debug!(
                        collector = %self.name,
                        path = %skipped.path.display(),
                        "older lockfile skipped"
                    );
                }

                latest
                    .into_iter()
                    .chain(others.iter())
                    .map(|req| (req.kind, self.parse_request(req, ctx)))
                    .collect()
            }
            ComposePolicy::RichestSource => sources
                .iter()
                .map(|req| (req.kind, self.parse_request(req, ctx)))
                .fold(None, |best: Option<(RequestKind, Vec<Package>)>, candidate| {
                    match best {
                        Some(current) if current.1.len() >= candidate.1.len() => Some(current),
                        _ => Some(candidate),
                    }
                })
                .into_iter()
                .collect(),
        }
    }

    fn parse_request(&self, req: &CollectRequest, ctx: &CollectContext) -> Vec<Package> {
        let Some((slot, content, source)) = self.read_request(req, ctx) else {
            return Vec::new();
        };
        match slot.parse(&content, &source) {
            Ok(packages) => {
                debug!(
                    collector = %self.name,
                    path = %source,
                    kind = %req.kind,
                    packages = packages.len(),
                    "manifest parsed"
                );
                packages
            }
            Err(e) => {
                self.record_parse_failure(&source, &e);
                Vec::new()
            }
        }
    }

    fn parse_main_request(&self, req: &CollectRequest, ctx: &CollectContext) -> Option<Package> {
        let (slot, content, source) = self.read_request(req, ctx)?;
        match slot.parse_main(&content, &source) {
            Ok(main) => main,
            Err(e) => {
                self.record_parse_failure(&source, &e);
                None
            }
        }
    }

    fn read_request(
        &self,
        req: &CollectRequest,
        ctx: &CollectContext,
    ) -> Option<(&ParserSlot, String, String)> {
        let slot = self.slots.get(req.slot)?;
        let source = req.path.display().to_string();
        match read_manifest(&req.path, ctx.max_file_size) {
            Ok(content) => Some((slot, content, source)),
            Err(e) => {
                self.record_parse_failure(&source, &e);
                None
            }
        }
    }

    fn record_parse_failure(&self, path: &str, error: &CollectorError) {
        warn!(collector = %self.name, path = %path, error = %error, "failed to parse manifest, skipping");
        counter!(m::COLLECT_PARSE_ERRORS_TOTAL, m::LABEL_COLLECTOR => self.name.clone())
            .increment(1);
    }
}

/// 메인 패키지를 lockfile 그래프의 루트들과 연결합니다.
fn link_main(packages: Vec<Package>, main: Package) -> Vec<Package> {
    let mut graph = DependencyGraph::from_packages(packages);
    let roots: Vec<String> = graph
        .root_packages()
        .into_iter()
        .map(|p| p.purl.clone())
        .collect();

    if let Some(main_purl) = graph.add_package(main) {
        for root in &roots {
            graph.add_dependency(&main_purl, root);
        }
    }
    graph.into_list(&ConsolidateOptions::lenient())
}

/// 크기 제한을 확인한 뒤 매니페스트를 읽습니다.
fn read_manifest(path: &Path, max_file_size: usize) -> Result<String, CollectorError> {
    let io_err = |source| CollectorError::Io {
        path: path.display().to_string(),
        source,
    };
    let metadata = std::fs::metadata(path).map_err(io_err)?;
    let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
    if size > max_file_size {
        return Err(CollectorError::FileTooBig {
            path: path.display().to_string(),
            size,
            max: max_file_size,
        });
    }
    std::fs::read_to_string(path).map_err(io_err)
}

fn modified_time(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// 기본 제공 collector 목록 (npm, cargo, pypi)
pub fn builtin_collectors() -> Result<Vec<Collector>, CollectorError> {
    Ok(vec![
        Collector::for_ecosystem(Ecosystem::Npm)
            .lockfile(NpmLockParser::new()?)
            .main_manifest(NpmManifestParser::new())
            .policy(ComposePolicy::LatestLockfile),
        Collector::for_ecosystem(Ecosystem::Cargo)
            .lockfile(CargoLockParser::new())
            .main_manifest(CargoManifestParser::new())
            .enrichment(Enrichment::CargoMetadata),
        Collector::for_ecosystem(Ecosystem::Pypi).manifest(RequirementsParser::new()?),
    ])
}
