#![no_main]

use depsweep_collector::{MainPackageParser, NpmLockParser, NpmManifestParser, PackageParser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(parser) = NpmLockParser::new() {
            let _ = parser.parse(content, "fuzz/package-lock.json");
        }

        let manifest = NpmManifestParser::new();
        let _ = manifest.parse(content, "fuzz/package.json");
        let _ = manifest.parse_main(content, "fuzz/package.json");
    }
});
