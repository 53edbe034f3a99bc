#![no_main]
use colloquy::cache::CacheStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    // arbitrary JSON values must read back unchanged
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else { return };
    let cache = CacheStore::with_defaults();
    if cache.set("fuzz", &value).is_err() { return; }
    assert_eq!(cache.get::<serde_json::Value>("fuzz"), Some(value));
});
