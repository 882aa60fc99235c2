//! 의존성 그래프
//!
//! 단일 매니페스트를 파싱하는 동안 패키지를 PURL 기준으로 모으고 간선을 기록합니다.
//! 들어오는 간선이 없는 패키지가 루트입니다.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::consolidate::{ConsolidateOptions, combine_into, consolidate};
use crate::types::Package;

/// PURL을 키로 하는 패키지 그래프
///
/// 단일 소유자 전용이며 I/O를 하지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    packages: HashMap<String, Package>,
    incoming: HashSet<String>,
}

impl DependencyGraph {
    /// 빈 그래프를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 평탄한 목록으로부터 그래프를 재구성합니다.
    ///
    /// 각 레코드의 `dependencies`도 들어오는 간선으로 기록됩니다.
    pub fn from_packages(packages: impl IntoIterator<Item = Package>) -> Self {
        let mut graph = Self::new();
        for pkg in packages {
            graph.add_package(pkg);
        }
        graph
    }

    /// 패키지를 추가합니다. 같은 PURL이 있으면 필드를 결합합니다.
    ///
    /// 저장된 PURL을 반환하며, 이름이 없는 레코드는 `None`입니다.
    pub fn add_package(&mut self, mut pkg: Package) -> Option<String> {
        if pkg.name.is_empty() {
            debug!(purl = %pkg.purl, "skipping package without name");
            return None;
        }
        pkg.ensure_purl();
        let purl = pkg.purl.clone();

        for dep in &pkg.dependencies {
            if !dep.is_empty() && *dep != purl {
                self.incoming.insert(dep.clone());
            }
        }
        pkg.dependencies.remove(&purl);

        match self.packages.get_mut(&purl) {
            Some(existing) => combine_into(existing, pkg),
            None => {
                self.packages.insert(purl.clone(), pkg);
            }
        }
        Some(purl)
    }

    /// `from -> to` 간선을 기록합니다.
    ///
    /// 빈 PURL, 자기 참조, 존재하지 않는 `from`이면 아무것도 하지 않고 `false`를 반환합니다.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> bool {
        if from.is_empty() || to.is_empty() || from == to {
            return false;
        }
        let Some(pkg) = self.packages.get_mut(from) else {
            return false;
        };
        pkg.dependencies.insert(to.to_owned());
        self.incoming.insert(to.to_owned());
        true
    }

    /// PURL로 패키지를 조회합니다.
    pub fn get_package(&self, purl: &str) -> Option<&Package> {
        self.packages.get(purl)
    }

    /// 이름이 같은 패키지를 PURL 순으로 반환합니다.
    pub fn get_packages_by_name(&self, name: &str) -> Vec<&Package> {
        let mut found: Vec<&Package> = self.packages.values().filter(|p| p.name == name).collect();
        found.sort_by(|a, b| a.purl.cmp(&b.purl));
        found
    }

    /// 이름으로 패키지 하나를 찾습니다. 여러 개면 PURL이 가장 작은 것입니다.
    pub fn find_by_name(&self, name: &str) -> Option<&Package> {
        self.packages
            .values()
            .filter(|p| p.name == name)
            .min_by(|a, b| a.purl.cmp(&b.purl))
    }

    /// 이름과 버전으로 패키지 하나를 찾습니다.
    pub fn find_by_name_version(&self, name: &str, version: &str) -> Option<&Package> {
        self.packages
            .values()
            .filter(|p| p.name == name && p.version == version)
            .min_by(|a, b| a.purl.cmp(&b.purl))
    }

    /// 들어오는 간선이 없는 패키지를 PURL 순으로 반환합니다.
    pub fn root_packages(&self) -> Vec<&Package> {
        let mut roots: Vec<&Package> = self
            .packages
            .iter()
            .filter(|(purl, _)| !self.incoming.contains(*purl))
            .map(|(_, p)| p)
            .collect();
        roots.sort_by(|a, b| a.purl.cmp(&b.purl));
        roots
    }

    /// 저장된 패키지 수
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// 해당 PURL이 있는지 여부
    pub fn contains(&self, purl: &str) -> bool {
        self.packages.contains_key(purl)
    }

    /// 그래프를 평탄화하고 통합한 목록을 반환합니다. 그래프는 유지됩니다.
    pub fn to_list(&self, options: &ConsolidateOptions) -> Vec<Package> {
        consolidate(self.packages.values().cloned().collect(), options)
    }

    /// 그래프를 소비하여 통합한 목록을 반환합니다.
    pub fn into_list(self, options: &ConsolidateOptions) -> Vec<Package> {
        consolidate(self.packages.into_values().collect(), options)
    }
}
