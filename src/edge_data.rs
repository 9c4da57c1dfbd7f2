/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Block-compressed edge-value directory: writer and reader.
//!
//! The raw, per-shard edge-value bytes (already sorted into final adjacency
//! order) are split into `block_size`-byte chunks, each deflated
//! independently into its own file inside a directory, plus a `.size`
//! sidecar recording the uncompressed payload length.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Default block size used when a caller doesn't request a specific one.
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 20;

fn block_file_path(dir: &Path, block_index: usize) -> PathBuf {
    dir.join(block_index.to_string())
}

/// Deflates `payload` into `block_size`-byte chunks under `dir`, one file
/// per chunk named by its zero-based index, and writes the `.size` sidecar
/// at `size_path` with the decimal uncompressed length.
pub fn write_block_directory(
    dir: &Path,
    size_path: &Path,
    payload: &[u8],
    block_size: usize,
) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating block directory {}", dir.display()))?;

    for (index, chunk) in payload.chunks(block_size.max(1)).enumerate() {
        let path = block_file_path(dir, index);
        let file = fs::File::create(&path)
            .with_context(|| format!("creating block file {}", path.display()))?;
        let mut encoder = ZlibEncoder::new(file, Compression::default());
        encoder
            .write_all(chunk)
            .with_context(|| format!("compressing block {index} of {}", dir.display()))?;
        encoder
            .finish()
            .with_context(|| format!("finishing block {index} of {}", dir.display()))?;
    }

    // An empty payload still gets a directory (possibly with zero block
    // files) and a "0" sidecar, so downstream readers never special-case
    // a missing directory for a zero-out-degree shard.
    fs::write(size_path, payload.len().to_string())
        .with_context(|| format!("writing size sidecar {}", size_path.display()))?;
    Ok(())
}

/// Reads the decimal uncompressed length out of a `.size` sidecar.
pub fn read_payload_size(size_path: &Path) -> Result<usize> {
    let text = fs::read_to_string(size_path)
        .with_context(|| format!("reading size sidecar {}", size_path.display()))?;
    text.trim()
        .parse()
        .with_context(|| format!("size sidecar {} is not a decimal integer", size_path.display()))
}

/// Inflates every block file in `dir` back into the original contiguous
/// payload, truncated to the length recorded in the `.size` sidecar.
pub fn read_block_directory(dir: &Path, size_path: &Path, block_size: usize) -> Result<Vec<u8>> {
    let total_len = read_payload_size(size_path)?;
    let mut payload = Vec::with_capacity(total_len);

    let mut index = 0;
    loop {
        let path = block_file_path(dir, index);
        if !path.exists() {
            break;
        }
        let file = fs::File::open(&path)
            .with_context(|| format!("opening block file {}", path.display()))?;
        let mut decoder = ZlibDecoder::new(file);
        let mut chunk = Vec::with_capacity(block_size);
        decoder
            .read_to_end(&mut chunk)
            .with_context(|| format!("decompressing block {index} of {}", dir.display()))?;
        payload.extend_from_slice(&chunk);
        index += 1;
    }

    payload.truncate(total_len);
    Ok(payload)
}

/// Reads only the byte range `[offset, offset + len)` of the original
/// payload, decompressing just the blocks that range overlaps. Mirrors the
/// random-access read pattern a downstream engine uses when it only needs
/// one vertex's edge values.
pub fn read_block_directory_range(
    dir: &Path,
    block_size: usize,
    offset: usize,
    len: usize,
) -> Result<Vec<u8>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    let first_block = offset / block_size;
    let last_block = (offset + len - 1) / block_size;

    let mut out = Vec::with_capacity(len);
    for block_index in first_block..=last_block {
        let path = block_file_path(dir, block_index);
        let file = fs::File::open(&path)
            .with_context(|| format!("opening block file {}", path.display()))?;
        let mut decoder = ZlibDecoder::new(file);
        let mut chunk = Vec::with_capacity(block_size);
        decoder
            .read_to_end(&mut chunk)
            .with_context(|| format!("decompressing block {block_index} of {}", dir.display()))?;

        let block_start = block_index * block_size;
        let lo = offset.max(block_start) - block_start;
        let hi = (offset + len).min(block_start + chunk.len()) - block_start;
        out.extend_from_slice(&chunk[lo..hi]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_multi_block_payload() {
        let dir = tempfile::tempdir().unwrap();
        let block_dir = dir.path().join("blocks");
        let size_path = dir.path().join("blocks.size");

        let payload: Vec<u8> = (0u32..10_000).flat_map(|v| v.to_le_bytes()).collect();
        write_block_directory(&block_dir, &size_path, &payload, 4096).unwrap();

        assert_eq!(read_payload_size(&size_path).unwrap(), payload.len());
        let roundtrip = read_block_directory(&block_dir, &size_path, 4096).unwrap();
        assert_eq!(roundtrip, payload);
    }

    #[test]
    fn empty_payload_still_writes_a_valid_zero_size_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let block_dir = dir.path().join("blocks");
        let size_path = dir.path().join("blocks.size");

        write_block_directory(&block_dir, &size_path, &[], 4096).unwrap();
        assert_eq!(read_payload_size(&size_path).unwrap(), 0);
        assert!(read_block_directory(&block_dir, &size_path, 4096)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn ranged_read_matches_the_full_round_trip_slice() {
        let dir = tempfile::tempdir().unwrap();
        let block_dir = dir.path().join("blocks");
        let size_path = dir.path().join("blocks.size");

        let payload: Vec<u8> = (0..5000u32).map(|v| (v % 256) as u8).collect();
        write_block_directory(&block_dir, &size_path, &payload, 1024).unwrap();

        let slice = read_block_directory_range(&block_dir, 1024, 1500, 2000).unwrap();
        assert_eq!(slice, payload[1500..3500]);
    }
}
