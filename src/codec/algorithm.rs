use crate::codec::payload::Algorithm;
use crate::errors::DataError;

/// A reversible byte transform the codec can be built with.
pub trait CompressionAlgorithm: Send + Sync {
    fn kind(&self) -> Algorithm;

    /// # Errors
    /// Implementations return an error instead of panicking on internal failure.
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, DataError>;

    /// # Errors
    /// Returns `DataError::Decode` when `input` is not a valid stream of this algorithm
    /// or does not expand to exactly `original_len` bytes.
    fn decompress(&self, input: &[u8], original_len: usize) -> Result<Vec<u8>, DataError>;
}

const MIN_MATCH: usize = 4;
const MAX_MATCH: usize = MIN_MATCH + 0x7F;
const MAX_LITERAL_RUN: usize = 0x80;
const WINDOW: usize = u16::MAX as usize;
const HASH_BITS: u32 = 14;
const EMPTY_SLOT: usize = usize::MAX;

/// Built-in LZ77 coder; always available.
///
/// Stream layout is a sequence of tokens led by a control byte:
/// - `0x00..=0x7F`: literal run of `ctrl + 1` bytes follows
/// - `0x80..=0xFF`: back-reference of `(ctrl & 0x7F) + 4` bytes, then a little-endian `u16` distance
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleLz;

#[inline]
fn hash4(b: &[u8]) -> usize {
    let v = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    (v.wrapping_mul(2_654_435_761) >> (32 - HASH_BITS)) as usize
}

fn flush_literals(out: &mut Vec<u8>, literals: &[u8]) {
    for chunk in literals.chunks(MAX_LITERAL_RUN) {
        // chunk is 1..=128 bytes long
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
}

impl SimpleLz {
    #[must_use]
    pub fn compress_bytes(input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len() / 2 + 16);
        let mut table = vec![EMPTY_SLOT; 1 << HASH_BITS];
        let mut literal_start = 0usize;
        let mut i = 0usize;
        while i + MIN_MATCH <= input.len() {
            let h = hash4(&input[i..]);
            let candidate = table[h];
            table[h] = i;
            if candidate != EMPTY_SLOT
                && i - candidate <= WINDOW
                && input[candidate..candidate + MIN_MATCH] == input[i..i + MIN_MATCH]
            {
                let mut len = MIN_MATCH;
                while len < MAX_MATCH && i + len < input.len() && input[candidate + len] == input[i + len]
                {
                    len += 1;
                }
                flush_literals(&mut out, &input[literal_start..i]);
                out.push(0x80 | (len - MIN_MATCH) as u8);
                out.extend_from_slice(&((i - candidate) as u16).to_le_bytes());
                i += len;
                literal_start = i;
            } else {
                i += 1;
            }
        }
        flush_literals(&mut out, &input[literal_start..]);
        out
    }

    /// # Errors
    /// Returns `DataError::Decode` on truncated tokens, out-of-window distances or a length mismatch.
    pub fn decompress_bytes(input: &[u8], original_len: usize) -> Result<Vec<u8>, DataError> {
        let mut out: Vec<u8> = Vec::with_capacity(original_len);
        let mut i = 0usize;
        while i < input.len() {
            let ctrl = input[i];
            i += 1;
            if ctrl & 0x80 == 0 {
                let end = i + usize::from(ctrl) + 1;
                let literals = input
                    .get(i..end)
                    .ok_or_else(|| DataError::Decode("truncated literal run".into()))?;
                out.extend_from_slice(literals);
                i = end;
            } else {
                let len = usize::from(ctrl & 0x7F) + MIN_MATCH;
                let dist = input
                    .get(i..i + 2)
                    .map(|b| usize::from(u16::from_le_bytes([b[0], b[1]])))
                    .ok_or_else(|| DataError::Decode("truncated back-reference".into()))?;
                i += 2;
                if dist == 0 || dist > out.len() {
                    return Err(DataError::Decode(format!(
                        "back-reference distance {dist} outside window of {}",
                        out.len()
                    )));
                }
                let start = out.len() - dist;
                // byte-wise so overlapping references replicate correctly
                for k in 0..len {
                    let b = out[start + k];
                    out.push(b);
                }
            }
            if out.len() > original_len {
                return Err(DataError::Decode("stream expands past recorded length".into()));
            }
        }
        if out.len() != original_len {
            return Err(DataError::Decode(format!(
                "expanded to {} bytes, expected {original_len}",
                out.len()
            )));
        }
        Ok(out)
    }
}

impl CompressionAlgorithm for SimpleLz {
    fn kind(&self) -> Algorithm {
        Algorithm::Simple
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, DataError> {
        Ok(Self::compress_bytes(input))
    }

    fn decompress(&self, input: &[u8], original_len: usize) -> Result<Vec<u8>, DataError> {
        Self::decompress_bytes(input, original_len)
    }
}

/// zstd, reported as `Algorithm::External`.
#[derive(Debug, Clone, Copy)]
pub struct Zstd {
    pub level: i32,
}

impl Default for Zstd {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl CompressionAlgorithm for Zstd {
    fn kind(&self) -> Algorithm {
        Algorithm::External
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, DataError> {
        zstd::bulk::compress(input, self.level).map_err(|e| DataError::Io(e.to_string()))
    }

    fn decompress(&self, input: &[u8], original_len: usize) -> Result<Vec<u8>, DataError> {
        let out = zstd::bulk::decompress(input, original_len)
            .map_err(|e| DataError::Decode(e.to_string()))?;
        if out.len() != original_len {
            return Err(DataError::Decode(format!(
                "zstd expanded to {} bytes, expected {original_len}",
                out.len()
            )));
        }
        Ok(out)
    }
}
