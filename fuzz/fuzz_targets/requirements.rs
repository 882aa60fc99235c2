#![no_main]

use depsweep_collector::{PackageParser, RequirementsParser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(parser) = RequirementsParser::new() {
            // 파싱 결과는 항상 이름이 있어야 한다
            if let Ok(packages) = parser.parse(content, "fuzz/requirements.txt") {
                assert!(packages.iter().all(|p| !p.name.is_empty()));
            }
        }
    }
});
