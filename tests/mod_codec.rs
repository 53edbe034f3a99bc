use colloquy::codec::{Algorithm, AlgorithmChoice, CodecConfig, CompressedPayload, CompressionCodec};
use colloquy::errors::DataError;

fn chat_transcript(turns: usize) -> String {
    (0..turns)
        .map(|i| format!("{{\"role\":\"assistant\",\"content\":\"Here is step {i} of the plan, as discussed.\"}}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[test]
fn short_text_is_stored_verbatim() {
    let codec = CompressionCodec::new(CodecConfig::default());
    let payload = codec.encode("hi there");
    assert_eq!(payload.algorithm, Algorithm::None);
    assert_eq!(payload.encoded, b"hi there");
    assert_eq!(codec.stats().compressions_performed, 0);
}

#[test]
fn repetitive_text_compresses_and_round_trips() {
    for algorithm in [AlgorithmChoice::Simple, AlgorithmChoice::Zstd] {
        let codec = CompressionCodec::new(CodecConfig { algorithm, ..Default::default() });
        let text = chat_transcript(200);
        let payload = codec.encode(&text);
        assert!(payload.is_compressed(), "{algorithm:?} did not compress");
        assert!((payload.compressed_size_bytes as f64) < 0.9 * payload.original_size_bytes as f64);
        assert_eq!(codec.decode(&payload).unwrap(), text);
    }
}

#[test]
fn incompressible_text_is_skipped() {
    // pseudo-random printable bytes from a linear congruential generator
    let mut state: u32 = 12345;
    let text: String = (0..4096)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            char::from(b'!' + u8::try_from((state >> 16) % 94).unwrap())
        })
        .collect();
    let codec = CompressionCodec::new(CodecConfig::default());
    let payload = codec.encode(&text);
    assert_eq!(payload.algorithm, Algorithm::None);
    assert_eq!(codec.decode(&payload).unwrap(), text);
    assert_eq!(codec.stats().compressions_skipped, 1);
}

#[test]
fn external_payloads_decode_with_simple_primary() {
    let zstd = CompressionCodec::new(CodecConfig { algorithm: AlgorithmChoice::Zstd, ..Default::default() });
    let simple = CompressionCodec::new(CodecConfig::default());
    let text = chat_transcript(50);
    let payload = zstd.encode(&text);
    assert_eq!(payload.algorithm, Algorithm::External);
    assert_eq!(simple.decode(&payload).unwrap(), text);
}

#[test]
fn inconsistent_payloads_are_decode_errors() {
    let codec = CompressionCodec::new(CodecConfig::default());
    let mut payload = codec.encode(&chat_transcript(50));
    payload.original_size_bytes += 1;
    assert!(matches!(codec.decode(&payload), Err(DataError::Decode(_))));

    let truncated = CompressedPayload {
        encoded: vec![0x85, 0x01],
        algorithm: Algorithm::Simple,
        original_size_bytes: 9,
        compressed_size_bytes: 2,
    };
    assert!(matches!(codec.decode(&truncated), Err(DataError::Decode(_))));

    let bad_utf8 = CompressedPayload {
        encoded: vec![0xff, 0xfe],
        algorithm: Algorithm::None,
        original_size_bytes: 2,
        compressed_size_bytes: 2,
    };
    assert!(matches!(codec.decode(&bad_utf8), Err(DataError::Decode(_))));
}

#[test]
fn stats_accumulate_and_reset() {
    let codec = CompressionCodec::new(CodecConfig::default());
    codec.encode(&chat_transcript(100));
    codec.encode(&chat_transcript(100));
    let stats = codec.stats();
    assert_eq!(stats.compressions_performed, 2);
    assert!(stats.space_saved_percentage() > 10.0);
    assert!(stats.total_compressed_bytes < stats.total_original_bytes);
    codec.reset_stats();
    assert_eq!(codec.stats().compressions_performed, 0);
    assert_eq!(codec.stats().space_saved_percentage(), 0.0);
}
