//! 전역 통합 (Global Consolidation Pass)
//!
//! 여러 collector가 만든 레코드를 PURL 기준으로 하나의 목록으로 합칩니다.
//!
//! # 단계
//!
//! 1. 유효성 필터: 이름 없는 레코드 제거, strict 모드에서는 버전 없는 레코드도 제거
//! 2. PURL 보충: 비어 있는 PURL을 identity에서 유도
//! 3. `(type, name)` 그룹 내 병합: 같은 버전끼리, 버전 없는 레코드는 가장 낮은 버전으로
//! 4. 의존성 참조 재작성: 흡수된 PURL을 살아남은 PURL로 교체
//! 5. PURL 순 정렬
//!
//! 결과는 입력 순서와 무관하며, 같은 결과를 다시 통합해도 변하지 않습니다.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use metrics::counter;
use tracing::debug;

use depsweep_core::metrics as m;

use crate::types::Package;

/// 통합 옵션
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidateOptions {
    /// true이면 버전 없는 레코드를 제거합니다.
    pub strict: bool,
}

impl ConsolidateOptions {
    /// strict 모드 옵션
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// 기본(lenient) 옵션
    pub fn lenient() -> Self {
        Self { strict: false }
    }
}

/// 두 레코드를 하나로 병합합니다.
///
/// - PURL이 같으면 필드를 결합합니다.
/// - type(대소문자 무시)과 이름이 같고 버전이 같거나 한쪽이 비어 있으면 병합합니다.
///   버전이 있는 쪽의 identity를 유지합니다.
/// - 그 외에는 병합하지 않고 두 레코드를 그대로 돌려줍니다.
///
/// 필드 결합 규칙은 인자 순서와 무관합니다.
pub fn merge(a: Package, b: Package) -> Result<Package, (Package, Package)> {
    if !a.purl.is_empty() && a.purl == b.purl {
        return Ok(absorb_pair(a, b));
    }

    if !a.purl_type.eq_ignore_ascii_case(&b.purl_type) || a.name != b.name {
        return Err((a, b));
    }

    match (a.version.is_empty(), b.version.is_empty()) {
        (false, false) if a.version != b.version => Err((a, b)),
        (false, true) => Ok(absorb(a, b)),
        (true, false) => Ok(absorb(b, a)),
        _ => Ok(absorb_pair(a, b)),
    }
}

/// 같은 우선순위의 두 레코드 중 기준 레코드를 골라 결합합니다.
fn absorb_pair(a: Package, b: Package) -> Package {
    if prefer(&a, &b) == Ordering::Less {
        absorb(b, a)
    } else {
        absorb(a, b)
    }
}

/// 기준 레코드 선택 순서: 더 긴 PURL, 같으면 사전순으로 큰 PURL,
/// PURL까지 같으면 identity가 작은 쪽.
///
/// `Greater`이면 `a`가 기준입니다.
fn prefer(a: &Package, b: &Package) -> Ordering {
    a.purl
        .len()
        .cmp(&b.purl.len())
        .then_with(|| a.purl.cmp(&b.purl))
        .then_with(|| identity_order(b, a))
}

/// `base`의 identity를 유지하면서 `other`의 필드를 흡수합니다.
pub(crate) fn absorb(mut base: Package, other: Package) -> Package {
    combine_into(&mut base, other);
    base
}

/// 필드 결합: 라이선스/의존성은 합집합, supplier와 source는 비어 있지 않은 값 중 최소값.
pub(crate) fn combine_into(target: &mut Package, other: Package) {
    if target.version.is_empty() {
        target.version = other.version;
    }

    target.supplier = match (target.supplier.take(), other.supplier) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    target.license_declared.extend(other.license_declared);
    target.license_concluded.extend(other.license_concluded);
    target.dependencies.extend(other.dependencies);

    if target.source_location.is_empty()
        || (!other.source_location.is_empty() && other.source_location < target.source_location)
    {
        target.source_location = other.source_location;
    }
}

/// 레코드 목록을 통합합니다.
pub fn consolidate(packages: Vec<Package>, options: &ConsolidateOptions) -> Vec<Package> {
    let input_len = packages.len();

    // 1. 유효성 필터
    let mut valid = Vec::with_capacity(input_len);
    for pkg in packages {
        if pkg.name.is_empty() {
            counter!(m::CONSOLIDATE_DROPPED_TOTAL, m::LABEL_REASON => "empty_name").increment(1);
            continue;
        }
        if options.strict && pkg.version.is_empty() {
            counter!(m::CONSOLIDATE_DROPPED_TOTAL, m::LABEL_REASON => "empty_version")
                .increment(1);
            continue;
        }
        valid.push(pkg);
    }

    // 2. PURL 보충 + 3. (type, name) 그룹핑
    let mut groups: BTreeMap<(String, String), BTreeMap<String, Vec<Package>>> = BTreeMap::new();
    for mut pkg in valid {
        pkg.ensure_purl();
        groups
            .entry((pkg.purl_type.to_lowercase(), pkg.name.clone()))
            .or_default()
            .entry(pkg.version.clone())
            .or_default()
            .push(pkg);
    }

    let mut aliases: HashMap<String, String> = HashMap::new();
    let mut merged_count = 0_u64;
    let mut out = Vec::new();

    for (_, mut by_version) in groups {
        let unversioned = by_version.remove("");
        let mut folded: Vec<Package> = by_version
            .into_values()
            .map(|members| fold(members, &mut aliases, &mut merged_count))
            .collect();

        if let Some(members) = unversioned {
            let loose = fold(members, &mut aliases, &mut merged_count);
            // 버전 없는 레코드는 가장 낮은 버전 레코드로 흡수됩니다.
            match folded.first_mut() {
                Some(lowest) => {
                    record_alias(&mut aliases, &loose.purl, &lowest.purl);
                    merged_count += 1;
                    combine_into(lowest, loose);
                }
                None => folded.push(loose),
            }
        }

        out.extend(folded);
    }

    // 정규화된 이름(pypi 등)으로 서로 다른 그룹이 같은 PURL을 가질 수 있습니다.
    let mut by_purl: BTreeMap<String, Package> = BTreeMap::new();
    for pkg in out {
        match by_purl.remove(&pkg.purl) {
            Some(existing) => {
                merged_count += 1;
                let (base, other) = if identity_order(&existing, &pkg) == Ordering::Greater {
                    (pkg, existing)
                } else {
                    (existing, pkg)
                };
                by_purl.insert(base.purl.clone(), absorb(base, other));
            }
            None => {
                by_purl.insert(pkg.purl.clone(), pkg);
            }
        }
    }
    let mut out: Vec<Package> = by_purl.into_values().collect();

    // 4. 의존성 참조 재작성
    if !aliases.is_empty() {
        for pkg in &mut out {
            let deps = std::mem::take(&mut pkg.dependencies);
            pkg.dependencies = deps
                .into_iter()
                .map(|d| resolve_alias(&aliases, &d).to_owned())
                .collect();
        }
    }
    for pkg in &mut out {
        let own = pkg.purl.clone();
        pkg.dependencies.remove(&own);
    }

    // 5. 정렬
    out.sort_by(|a, b| a.purl.cmp(&b.purl).then_with(|| identity_order(a, b)));

    if merged_count > 0 {
        counter!(m::CONSOLIDATE_MERGED_TOTAL).increment(merged_count);
    }
    debug!(
        input = input_len,
        output = out.len(),
        merged = merged_count,
        strict = options.strict,
        "consolidation finished"
    );

    out
}

/// 같은 버전 버킷의 레코드를 하나로 접습니다.
///
/// 기준 레코드를 먼저 고른 뒤 나머지를 흡수하므로 입력 순서와 무관합니다.
fn fold(
    mut members: Vec<Package>,
    aliases: &mut HashMap<String, String>,
    merged_count: &mut u64,
) -> Package {
    members.sort_by(|a, b| prefer(b, a));
    let mut iter = members.into_iter();
    let Some(mut acc) = iter.next() else {
        return Package::default();
    };

    for next in iter {
        record_alias(aliases, &next.purl, &acc.purl);
        *merged_count += 1;
        combine_into(&mut acc, next);
    }
    acc
}

fn identity_order(a: &Package, b: &Package) -> Ordering {
    a.purl_type
        .cmp(&b.purl_type)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.version.cmp(&b.version))
}

/// 별칭을 끝까지 따라가 살아남은 PURL을 반환합니다.
///
/// 흡수된 레코드가 다시 흡수되면 별칭이 연쇄됩니다.
fn resolve_alias<'a>(aliases: &'a HashMap<String, String>, purl: &'a str) -> &'a str {
    let mut current = purl;
    for _ in 0..=aliases.len() {
        match aliases.get(current) {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

fn record_alias(aliases: &mut HashMap<String, String>, from: &str, to: &str) {
    if from != to {
        aliases.insert(from.to_owned(), to.to_owned());
    }
}
