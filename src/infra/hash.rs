//! Streaming content digests for file records.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Result;
use blake3::Hasher as Blake3;

use crate::core::error::{ClipseqError, Phase};

/// Stream a file into a blake3 digest as `blake3:<hex>`.
pub fn stream_blake3(path: &Path) -> Result<String> {
    let mut f = File::open(path).map_err(|e| ClipseqError::io(Phase::Hash, path, e))?;
    let mut hasher = Blake3::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f
            .read(&mut buf)
            .map_err(|e| ClipseqError::io(Phase::Hash, path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}
