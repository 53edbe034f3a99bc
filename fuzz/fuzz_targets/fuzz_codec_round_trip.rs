#![no_main]
use colloquy::codec::{AlgorithmChoice, CodecConfig, CompressionCodec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 65536 { return; }
    let s = match std::str::from_utf8(data) { Ok(x) => x, Err(_) => return };
    for algorithm in [AlgorithmChoice::Simple, AlgorithmChoice::Zstd] {
        let codec = CompressionCodec::new(CodecConfig { algorithm, min_size_for_compression: 0, ..Default::default() });
        let payload = codec.encode(s);
        assert_eq!(codec.decode(&payload).ok().as_deref(), Some(s));
    }
});
