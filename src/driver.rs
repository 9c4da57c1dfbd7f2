/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The two-pass orchestrator tying every component together into one
//! sharding run (component G).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::adjacency::{decode_adjacency, encode_adjacency};
use crate::config::SharderConfig;
use crate::degree::{self, DegreeStrategy, DegreeTable};
use crate::edge_data::write_block_directory;
use crate::edge_value::{EdgeProcessor, EdgeValueCodec};
use crate::id_translate::IdTranslate;
use crate::paths::{
    adjacency_path, dense_degrees_path, edge_data_dir_path, edge_data_size_path, intervals_path,
    sparse_degrees_path, translate_path,
};
use crate::shovel::ShovelWriter;
use crate::sort::{check_shard_size, quicksort_copermuted};

/// Summary of everything a successful [`GraphSharder::process`] wrote to
/// disk, handed back so a caller (or the CLI) can report it without
/// re-deriving filenames.
#[derive(Debug, Clone)]
pub struct ShardingManifest {
    pub base: PathBuf,
    pub num_shards: u32,
    pub max_vertex_id: u64,
    pub num_edges: u64,
    pub final_translate: IdTranslate,
    pub used_sparse_degrees: bool,
    pub degree_strategy: DegreeStrategy,
}

/// Drives one full ingest-then-process sharding run for a graph supplied
/// edge-by-edge through [`GraphSharder::add_edge`].
pub struct GraphSharder<Proc, Codec: EdgeValueCodec> {
    base: PathBuf,
    config: SharderConfig,
    shovel: ShovelWriter<Proc, Codec>,
    codec: Codec,
}

impl<Proc, Codec> GraphSharder<Proc, Codec>
where
    Codec: EdgeValueCodec + Clone,
    Proc: EdgeProcessor<Codec::Value>,
{
    /// Opens a new sharding run, creating the `P` shovel scratch files
    /// under `base` up front.
    pub fn new(base: impl Into<PathBuf>, config: SharderConfig, codec: Codec, processor: Proc) -> Result<Self> {
        let base = base.into();
        let pre_translate = IdTranslate::pre_layout(config.num_shards() as u64)
            .context("building the pre-ingest id translator")?;
        let shovel = ShovelWriter::new(
            &base,
            config.num_shards(),
            pre_translate,
            codec.clone(),
            processor,
        )
        .context("opening shovel scratch files")?;
        Ok(GraphSharder {
            base,
            config,
            shovel,
            codec,
        })
    }

    /// Ingests one edge, partitioning it into its shovel file by
    /// `dst mod num_shards`.
    pub fn add_edge(&mut self, src: u64, dst: u64, token: Option<&str>) -> Result<()> {
        self.shovel.add_edge(src, dst, token)
    }

    /// Closes ingest and runs pass 2: per-shard sort, adjacency encode,
    /// edge-value compression, degree accumulation, then the shared
    /// manifest files.
    pub fn process(self) -> Result<ShardingManifest> {
        let num_shards = self.config.num_shards();
        let value_width = self.codec.byte_width();
        let max_vertex_id = self.shovel.max_vertex_id();
        let num_edges = self.shovel.num_edges();

        let pre_translate = IdTranslate::pre_layout(num_shards as u64)
            .context("rebuilding the pre-ingest id translator")?;
        let shovel_paths = self
            .shovel
            .finalize()
            .context("flushing shovel scratch files")?;
        log::debug!("{} shovel files flushed and closed ({num_edges} edges, max vertex id {max_vertex_id})", shovel_paths.len());

        let final_translate = IdTranslate::final_layout(max_vertex_id, num_shards as u64)
            .context("building the final id translator")?;

        let padded_len = IdTranslate::padded_len(max_vertex_id, num_shards as u64) as usize;
        let use_sparse = self.config.force_sparse_degrees()
            || degree::should_use_sparse(max_vertex_id, num_edges);
        let strategy = degree::choose_strategy(self.config.ram_budget_bytes(), max_vertex_id);
        log::debug!("shard {num_shards}-way pass 2 starting, degree strategy {strategy:?}");

        let ctx = ShardContext {
            base: &self.base,
            num_shards,
            value_width,
            block_size: self.config.block_size(),
            pre_translate,
            final_translate,
            accumulate_in_ram: strategy == DegreeStrategy::InRam,
            padded_len,
        };

        let (mut degree_table, written_adjacency_paths) = run_shards(&ctx, &shovel_paths, &self.config)?;

        if strategy == DegreeStrategy::Replay {
            log::debug!("replaying {} adjacency streams to accumulate degrees", written_adjacency_paths.len());
            degree_table = degree::replay_degrees_in_range(
                &written_adjacency_paths,
                0..(padded_len as u64),
                padded_len,
            )
            .context("replaying adjacency streams to accumulate degrees")?;
        }

        if use_sparse {
            degree_table
                .write_sparse(&sparse_degrees_path(&self.base))
                .context("writing sparse degree table")?;
        } else {
            degree_table
                .write_dense(&dense_degrees_path(&self.base))
                .context("writing dense degree table")?;
        }
        log::debug!("degree table written ({})", if use_sparse { "sparse" } else { "dense" });

        write_intervals(&self.base, num_shards, &final_translate)
            .context("writing the intervals file")?;
        fs::write(
            translate_path(&self.base, num_shards),
            final_translate.to_string_repr(),
        )
        .context("writing the vtranslate file")?;

        Ok(ShardingManifest {
            base: self.base,
            num_shards,
            max_vertex_id,
            num_edges,
            final_translate,
            used_sparse_degrees: use_sparse,
            degree_strategy: strategy,
        })
    }
}

/// Deterministic, shard-local seed so a re-run of the same input on the
/// same shard plan produces byte-identical adjacency output; distinct
/// shards still draw independent pivot sequences.
fn seed_for_shard(shard: u32) -> u64 {
    0x9E37_79B9_7F4A_7C15u64 ^ (shard as u64)
}

fn split_key(key: u64) -> (u32, u32) {
    ((key >> 32) as u32, (key & 0xFFFF_FFFF) as u32)
}

/// The immutable, per-run state every shard's pass-2 processing needs,
/// gathered so the sequential and `parallel_encode` code paths can share
/// one [`process_one_shard`] implementation.
struct ShardContext<'a> {
    base: &'a Path,
    num_shards: u32,
    value_width: usize,
    block_size: usize,
    pre_translate: IdTranslate,
    final_translate: IdTranslate,
    accumulate_in_ram: bool,
    padded_len: usize,
}

/// Runs pass 2 over every shard's shovel, sequentially by default or,
/// behind the opt-in `parallel_encode` feature and config flag, with one
/// rayon task per shard. Returns the accumulated in-RAM degree
/// table (empty/unused when the replay strategy was chosen) plus the
/// adjacency stream paths written, in shard order.
#[cfg(feature = "parallel_encode")]
fn run_shards(
    ctx: &ShardContext,
    shovel_paths: &[PathBuf],
    config: &SharderConfig,
) -> Result<(DegreeTable, Vec<PathBuf>)> {
    if config.parallel_encode() {
        run_shards_parallel(ctx, shovel_paths)
    } else {
        run_shards_sequential(ctx, shovel_paths)
    }
}

#[cfg(not(feature = "parallel_encode"))]
fn run_shards(
    ctx: &ShardContext,
    shovel_paths: &[PathBuf],
    _config: &SharderConfig,
) -> Result<(DegreeTable, Vec<PathBuf>)> {
    run_shards_sequential(ctx, shovel_paths)
}

fn run_shards_sequential(
    ctx: &ShardContext,
    shovel_paths: &[PathBuf],
) -> Result<(DegreeTable, Vec<PathBuf>)> {
    let mut degree_table = DegreeTable::new(if ctx.accumulate_in_ram { ctx.padded_len } else { 0 });
    let mut written_adjacency_paths = Vec::with_capacity(shovel_paths.len());

    for (shard, shovel_path) in shovel_paths.iter().enumerate() {
        let shard = shard as u32;
        let outcome = process_one_shard(ctx, shard, shovel_path)?;
        if let Some(local) = outcome.local_degrees {
            degree_table.merge_from(&local);
        }
        written_adjacency_paths.push(outcome.adjacency_path);
    }
    Ok((degree_table, written_adjacency_paths))
}

#[cfg(feature = "parallel_encode")]
fn run_shards_parallel(
    ctx: &ShardContext,
    shovel_paths: &[PathBuf],
) -> Result<(DegreeTable, Vec<PathBuf>)> {
    use rayon::prelude::*;

    log::debug!("encoding {} shards in parallel (parallel_encode)", shovel_paths.len());
    let outcomes: Vec<ShardOutcome> = shovel_paths
        .par_iter()
        .enumerate()
        .map(|(shard, shovel_path)| process_one_shard(ctx, shard as u32, shovel_path))
        .collect::<Result<Vec<_>>>()?;

    let mut degree_table = DegreeTable::new(if ctx.accumulate_in_ram { ctx.padded_len } else { 0 });
    let mut written_adjacency_paths = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        if let Some(local) = outcome.local_degrees {
            degree_table.merge_from(&local);
        }
        written_adjacency_paths.push(outcome.adjacency_path);
    }
    Ok((degree_table, written_adjacency_paths))
}

/// What processing one shard's shovel through sort + encode + compress
/// produces: the adjacency stream it wrote, and (when the in-RAM degree
/// strategy is active) that shard's own full-length partial degree table,
/// ready to be folded into the run's total with [`DegreeTable::merge_from`].
struct ShardOutcome {
    adjacency_path: PathBuf,
    local_degrees: Option<DegreeTable>,
}

/// Reads, re-translates, sorts, and encodes one shard's shovel, then
/// deletes the shovel once consumed. Shared by the sequential
/// and `parallel_encode` pass-2 loops.
fn process_one_shard(ctx: &ShardContext, shard: u32, shovel_path: &Path) -> Result<ShardOutcome> {
    let (mut keys, mut values) = read_shovel_records(shovel_path, ctx.value_width)
        .with_context(|| format!("reading shovel records for shard {shard}"))?;

    check_shard_size(keys.len() as u64, shard)?;

    retranslate_keys(&mut keys, &ctx.pre_translate, &ctx.final_translate);

    let mut rng = SmallRng::seed_from_u64(seed_for_shard(shard));
    quicksort_copermuted(&mut keys, &mut values, ctx.value_width, &mut rng);
    log::debug!("shard {shard}: sorted {} records", keys.len());

    let local_degrees = if ctx.accumulate_in_ram {
        let mut table = DegreeTable::new(ctx.padded_len);
        for &key in &keys {
            let (src, dst) = split_key(key);
            debug_assert!((src as usize) < ctx.padded_len && (dst as usize) < ctx.padded_len);
            table.record_edge(src as u64, dst as u64);
        }
        Some(table)
    } else {
        None
    };

    let adj_path = adjacency_path(ctx.base, shard, ctx.num_shards);
    let mut adj_writer = BufWriter::new(
        File::create(&adj_path).with_context(|| format!("creating {}", adj_path.display()))?,
    );
    encode_adjacency(&keys, &mut adj_writer)
        .with_context(|| format!("encoding adjacency stream for shard {shard}"))?;
    adj_writer
        .flush()
        .with_context(|| format!("flushing {}", adj_path.display()))?;
    log::debug!("shard {shard}: adjacency stream written to {}", adj_path.display());

    if ctx.value_width > 0 {
        let dir_path = edge_data_dir_path(ctx.base, shard, ctx.num_shards, ctx.value_width, ctx.block_size);
        let size_path = edge_data_size_path(ctx.base, shard, ctx.num_shards, ctx.value_width, ctx.block_size);
        write_block_directory(&dir_path, &size_path, &values, ctx.block_size)
            .with_context(|| format!("writing edge-value blocks for shard {shard}"))?;
    }

    fs::remove_file(shovel_path)
        .with_context(|| format!("removing consumed shovel {}", shovel_path.display()))?;

    Ok(ShardOutcome {
        adjacency_path: adj_path,
        local_degrees,
    })
}

/// Reads a shovel file's fixed-width `(u64 key, V-byte value)` records
/// back into a parallel key array and a flat value byte array. Memory-maps
/// the file read-only rather than buffering a full copy.
fn read_shovel_records(path: &Path, width: usize) -> Result<(Vec<u64>, Vec<u8>)> {
    let record_len = 8 + width;
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let file_len = file
        .metadata()
        .with_context(|| format!("statting {}", path.display()))?
        .len() as usize;

    if file_len == 0 {
        return Ok((Vec::new(), Vec::new()));
    }

    let mmap = unsafe {
        mmap_rs::MmapOptions::new(file_len)
            .with_context(|| format!("preparing mmap options for {}", path.display()))?
            .with_file(file, 0)
            .map()
            .with_context(|| format!("mmapping {}", path.display()))?
    };
    let bytes: &[u8] = &mmap;

    let count = bytes.len() / record_len;
    let mut keys = Vec::with_capacity(count);
    let mut values = Vec::with_capacity(count * width);

    for record in bytes.chunks_exact(record_len) {
        let key = u64::from_be_bytes(record[..8].try_into().unwrap());
        keys.push(key);
        values.extend_from_slice(&record[8..]);
    }
    Ok((keys, values))
}

/// Converts every shovel key from pre-layout `(pre_src, pre_dst)` space
/// back to original vertex ids and forward again into final-layout space.
fn retranslate_keys(keys: &mut [u64], pre: &IdTranslate, fin: &IdTranslate) {
    for key in keys.iter_mut() {
        let (pre_src, pre_dst) = split_key(*key);
        let src = pre.backward(pre_src as u64);
        let dst = pre.backward(pre_dst as u64);
        let final_src = fin.forward(src);
        let final_dst = fin.forward(dst);
        *key = (final_src << 32) | final_dst;
    }
}

/// Writes the per-shard upper-bound-vertex-id file consumed by the
/// downstream engine to map a final vertex id back to its owning shard.
fn write_intervals(base: &Path, num_shards: u32, fin: &IdTranslate) -> Result<()> {
    let path = intervals_path(base, num_shards);
    let mut out = String::new();
    for shard in 0..num_shards as u64 {
        let upper = (shard + 1) * fin.interval_length() - 1;
        out.push_str(&upper.to_string());
        out.push('\n');
    }
    fs::write(&path, out).with_context(|| format!("writing {}", path.display()))
}

/// Decodes shard `k`'s adjacency stream back into `(src, dst)` pairs in
/// final vertex-id space, for tests and tooling that need to inspect what
/// [`GraphSharder::process`] produced.
pub fn read_adjacency_shard(base: &Path, shard: u32, num_shards: u32) -> Result<Vec<(u32, u32)>> {
    let path = adjacency_path(base, shard, num_shards);
    let mut reader = BufReader::new(
        File::open(&path).with_context(|| format!("opening {}", path.display()))?,
    );
    decode_adjacency(&mut reader).with_context(|| format!("decoding {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_value::{EmptyCodec, NoOpProcessor};

    #[test]
    fn end_to_end_run_preserves_every_edge() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("g");
        let config = SharderConfig::new(4);

        let mut sharder =
            GraphSharder::new(&base, config, EmptyCodec, NoOpProcessor).unwrap();

        let edges = [(0u64, 1u64), (1, 2), (2, 3), (3, 0), (5, 5), (4, 1), (0, 4)];
        for (src, dst) in edges {
            sharder.add_edge(src, dst, None).unwrap();
        }

        let manifest = sharder.process().unwrap();
        assert_eq!(manifest.num_edges, 6); // the (5, 5) self-loop is diverted
        assert_eq!(manifest.max_vertex_id, 5);

        let mut seen = Vec::new();
        for shard in 0..manifest.num_shards {
            let fin = manifest.final_translate;
            for (src, dst) in read_adjacency_shard(&base, shard, manifest.num_shards).unwrap() {
                seen.push((fin.backward(src as u64), fin.backward(dst as u64)));
            }
        }
        seen.sort();

        let mut expected: Vec<(u64, u64)> = edges
            .into_iter()
            .filter(|(s, d)| s != d)
            .collect();
        expected.sort();

        assert_eq!(seen, expected);
        assert!(dense_degrees_path(&base).exists() || sparse_degrees_path(&base).exists());
        assert!(translate_path(&base, manifest.num_shards).exists());
        assert!(intervals_path(&base, manifest.num_shards).exists());
    }

    #[test]
    fn shovel_files_are_removed_after_processing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("g");
        let config = SharderConfig::new(2);
        let mut sharder = GraphSharder::new(&base, config, EmptyCodec, NoOpProcessor).unwrap();
        sharder.add_edge(1, 2, None).unwrap();
        sharder.process().unwrap();

        assert!(!crate::paths::shovel_path(&base, 0).exists());
        assert!(!crate::paths::shovel_path(&base, 1).exists());
    }
}
