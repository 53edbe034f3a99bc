#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 || data.len() > 16384 { return; }
    // first two bytes pick the claimed original length
    let claimed = usize::from(u16::from_le_bytes([data[0], data[1]]));
    let _ = colloquy::codec::SimpleLz::decompress_bytes(&data[2..], claimed);
});
