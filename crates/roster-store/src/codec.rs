//! Blob encoding for the `identities.encoding` column.
//!
//! D little-endian IEEE-754 `f64` values, 8·D bytes, no header. Matches the
//! raw buffer layout older databases were written with, so they load as-is.

use roster_core::Embedding;

const F64_WIDTH: usize = std::mem::size_of::<f64>();

pub fn encode(embedding: &Embedding) -> Vec<u8> {
    let mut out = Vec::with_capacity(embedding.dim() * F64_WIDTH);
    for v in &embedding.values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Decode a blob, requiring exactly `dim` values.
///
/// On length mismatch returns the number of whole values the blob would hold
/// (or `usize::MAX` if the length is not a multiple of 8).
pub fn decode(blob: &[u8], dim: usize) -> Result<Embedding, usize> {
    if blob.len() % F64_WIDTH != 0 {
        return Err(usize::MAX);
    }
    let actual = blob.len() / F64_WIDTH;
    if actual != dim {
        return Err(actual);
    }
    let values = blob
        .chunks_exact(F64_WIDTH)
        .map(|chunk| {
            let mut bytes = [0u8; F64_WIDTH];
            bytes.copy_from_slice(chunk);
            f64::from_le_bytes(bytes)
        })
        .collect();
    Ok(Embedding::new(values))
}
