#![no_main]

use depsweep_collector::{CargoLockParser, CargoManifestParser, MainPackageParser, PackageParser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let _ = CargoLockParser::new().parse(content, "fuzz/Cargo.lock");

        // 같은 입력을 Cargo.toml로도 해석해 본다
        let manifest = CargoManifestParser::new();
        let _ = manifest.parse(content, "fuzz/Cargo.toml");
        let _ = manifest.parse_main(content, "fuzz/Cargo.toml");
    }
});
