#![no_main]

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use depsweep_collector::{ConsolidateOptions, Package, consolidate};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    strict: bool,
    records: Vec<FuzzRecord>,
}

#[derive(Arbitrary, Debug)]
struct FuzzRecord {
    ecosystem: FuzzEcosystem,
    /// 작은 이름 공간에서 골라 충돌이 자주 나도록 한다
    name: u8,
    version: Option<u8>,
    license: Option<u8>,
    supplier: Option<u8>,
    depends_on: Option<(u8, Option<u8>)>,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzEcosystem {
    Cargo,
    Npm,
    NpmUpper,
    Pypi,
    Maven,
}

impl FuzzEcosystem {
    fn purl_type(self) -> &'static str {
        match self {
            FuzzEcosystem::Cargo => "cargo",
            FuzzEcosystem::Npm => "npm",
            FuzzEcosystem::NpmUpper => "NPM",
            FuzzEcosystem::Pypi => "pypi",
            FuzzEcosystem::Maven => "maven",
        }
    }
}

fn name_of(eco: FuzzEcosystem, n: u8) -> String {
    match (eco, n % 4) {
        (_, 0) => String::new(),
        (FuzzEcosystem::Pypi, 1) => format!("Pkg_{}", n % 8),
        (FuzzEcosystem::Maven, _) => format!("org.example:lib{}", n % 8),
        (FuzzEcosystem::Npm | FuzzEcosystem::NpmUpper, 3) => format!("@scope/p{}", n % 8),
        _ => format!("pkg_{}", n % 8),
    }
}

fn to_package(record: &FuzzRecord) -> Package {
    let eco = record.ecosystem;
    let version = record
        .version
        .map(|v| format!("1.{}.0", v % 4))
        .unwrap_or_default();
    let mut pkg = Package::new(eco.purl_type(), name_of(eco, record.name), version);
    if let Some(l) = record.license {
        pkg = pkg.with_license(format!("LIC-{}", l % 3));
    }
    if let Some(s) = record.supplier {
        pkg = pkg.with_supplier(format!("supplier-{}", s % 3));
    }
    if let Some((n, v)) = record.depends_on {
        let dep = Package::new(
            eco.purl_type(),
            name_of(eco, n),
            v.map(|v| format!("1.{}.0", v % 4)).unwrap_or_default(),
        );
        let purl = dep.derived_purl();
        if !purl.is_empty() {
            pkg.dependencies.insert(purl);
        }
    }
    pkg
}

fuzz_target!(|input: FuzzInput| {
    let options = if input.strict {
        ConsolidateOptions::strict()
    } else {
        ConsolidateOptions::lenient()
    };
    let records: Vec<Package> = input.records.iter().take(64).map(to_package).collect();

    let out = consolidate(records.clone(), &options);

    // 이름 없는 레코드는 남지 않는다
    assert!(out.iter().all(|p| !p.name.is_empty() && !p.purl.is_empty()));
    if input.strict {
        assert!(out.iter().all(|p| !p.version.is_empty()));
    }

    // PURL은 유일하고 정렬되어 있다
    let purls: Vec<&str> = out.iter().map(|p| p.purl.as_str()).collect();
    let unique: BTreeSet<&str> = purls.iter().copied().collect();
    assert_eq!(purls.len(), unique.len());
    assert!(purls.windows(2).all(|w| w[0] < w[1]));

    // 자기 참조 없음
    assert!(out.iter().all(|p| !p.dependencies.contains(&p.purl)));

    // 멱등성
    assert_eq!(consolidate(out.clone(), &options), out);

    // 입력 순서 무관
    let mut reversed = records;
    reversed.reverse();
    assert_eq!(consolidate(reversed, &options), out);
});
