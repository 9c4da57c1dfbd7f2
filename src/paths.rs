/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Output filename construction, shared by the shovel writer, the
//! shard encoder, the degree accumulator, and the adjacency decoder.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

fn with_suffix(base: &Path, suffix: impl AsRef<str>) -> PathBuf {
    let mut s: OsString = base.as_os_str().to_owned();
    s.push(".");
    s.push(suffix.as_ref());
    PathBuf::from(s)
}

/// `<base>.shovel.<k>` -- pass-1 scratch file, deleted once pass 2 consumes it.
pub fn shovel_path(base: &Path, shard: u32) -> PathBuf {
    with_suffix(base, format!("shovel.{shard}"))
}

/// `<base>.<k>.<P>.adj` -- the adjacency stream of shard `k`.
pub fn adjacency_path(base: &Path, shard: u32, num_shards: u32) -> PathBuf {
    with_suffix(base, format!("{shard}.{num_shards}.adj"))
}

/// `<base>.<P>.intervals` -- one decimal upper bound per shard.
pub fn intervals_path(base: &Path, num_shards: u32) -> PathBuf {
    with_suffix(base, format!("{num_shards}.intervals"))
}

/// `<base>.<P>.vtranslate` -- the two decimal numbers of `finalIdTranslate`.
pub fn translate_path(base: &Path, num_shards: u32) -> PathBuf {
    with_suffix(base, format!("{num_shards}.vtranslate"))
}

/// `<base>.degrees.bin` -- dense degree table.
pub fn dense_degrees_path(base: &Path) -> PathBuf {
    with_suffix(base, "degrees.bin")
}

/// `<base>.degreesSparse.bin` -- sparse degree table.
pub fn sparse_degrees_path(base: &Path) -> PathBuf {
    with_suffix(base, "degreesSparse.bin")
}

/// `<base>.edata_java.<V>B.<k>.<P>_blockdir_<B>/` -- the compressed
/// edge-value block directory of shard `k`.
pub fn edge_data_dir_path(
    base: &Path,
    shard: u32,
    num_shards: u32,
    value_width: usize,
    block_size: usize,
) -> PathBuf {
    with_suffix(
        base,
        format!("edata_java.{value_width}B.{shard}.{num_shards}_blockdir_{block_size}"),
    )
}

/// The `.size` sidecar adjacent to (a sibling of, not inside) the block
/// directory, carrying the decimal uncompressed payload length `E`.
pub fn edge_data_size_path(
    base: &Path,
    shard: u32,
    num_shards: u32,
    value_width: usize,
    block_size: usize,
) -> PathBuf {
    let dir = edge_data_dir_path(base, shard, num_shards, value_width, block_size);
    let mut s = dir.into_os_string();
    s.push(".size");
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_the_spec_grammar() {
        let base = Path::new("/tmp/graph");
        assert_eq!(shovel_path(base, 3).to_str().unwrap(), "/tmp/graph.shovel.3");
        assert_eq!(
            adjacency_path(base, 2, 8).to_str().unwrap(),
            "/tmp/graph.2.8.adj"
        );
        assert_eq!(
            intervals_path(base, 8).to_str().unwrap(),
            "/tmp/graph.8.intervals"
        );
        assert_eq!(
            translate_path(base, 8).to_str().unwrap(),
            "/tmp/graph.8.vtranslate"
        );
        assert_eq!(
            dense_degrees_path(base).to_str().unwrap(),
            "/tmp/graph.degrees.bin"
        );
        assert_eq!(
            sparse_degrees_path(base).to_str().unwrap(),
            "/tmp/graph.degreesSparse.bin"
        );
        assert_eq!(
            edge_data_dir_path(base, 1, 8, 4, 1024)
                .to_str()
                .unwrap(),
            "/tmp/graph.edata_java.4B.1.8_blockdir_1024"
        );
        assert_eq!(
            edge_data_size_path(base, 1, 8, 4, 1024).to_str().unwrap(),
            "/tmp/graph.edata_java.4B.1.8_blockdir_1024.size"
        );
    }
}
