#![no_main]

use libfuzzer_sys::fuzz_target;
use ocppj::endpoint::Endpoint;

// The codec must be total over arbitrary byte input: every outcome is a
// typed decode error, never a panic. Profile lookups must likewise tolerate
// arbitrary strings.
fuzz_target!(|data: &[u8]| {
    let _ = ocppj::parse_raw_message(data);

    let endpoint = Endpoint::new(Vec::new());
    let action = String::from_utf8_lossy(data);
    let _ = endpoint.get_profile(&action);
    let _ = endpoint.get_profile_for_feature(&action);
});
