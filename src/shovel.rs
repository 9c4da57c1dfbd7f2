/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Partitions incoming edges by destination shard and spills fixed-width
//! records to per-shard scratch files (component C).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::edge_value::{EdgeProcessor, EdgeValueCodec};
use crate::id_translate::IdTranslate;
use crate::paths::shovel_path;

/// One buffered appender per shard. Appends within a shard are unordered;
/// the writer never sorts, deduplicates, or acknowledges.
pub struct ShovelWriter<Proc, Codec: EdgeValueCodec> {
    writers: Vec<BufWriter<File>>,
    paths: Vec<PathBuf>,
    pre_translate: IdTranslate,
    num_shards: u64,
    codec: Codec,
    processor: Proc,
    value_buf: Vec<u8>,
    max_vertex_id: u64,
    num_edges: u64,
}

impl<Proc, Codec> ShovelWriter<Proc, Codec>
where
    Codec: EdgeValueCodec,
    Proc: EdgeProcessor<Codec::Value>,
{
    pub fn new(
        base: &Path,
        num_shards: u32,
        pre_translate: IdTranslate,
        codec: Codec,
        processor: Proc,
    ) -> Result<Self> {
        let width = codec.byte_width();
        let mut writers = Vec::with_capacity(num_shards as usize);
        let mut paths = Vec::with_capacity(num_shards as usize);
        for k in 0..num_shards {
            let path = shovel_path(base, k);
            let file = File::create(&path)
                .with_context(|| format!("creating shovel {}", path.display()))?;
            writers.push(BufWriter::with_capacity(1 << 16, file));
            paths.push(path);
        }
        Ok(ShovelWriter {
            writers,
            paths,
            pre_translate,
            num_shards: num_shards as u64,
            codec,
            processor,
            value_buf: vec![0u8; width],
            max_vertex_id: 0,
            num_edges: 0,
        })
    }

    pub fn max_vertex_id(&self) -> u64 {
        self.max_vertex_id
    }

    pub fn num_edges(&self) -> u64 {
        self.num_edges
    }

    pub fn value_width(&self) -> usize {
        self.codec.byte_width()
    }

    /// Adds one edge, diverting self-loops to the processor's side channel
    /// instead of shoveling them.
    pub fn add_edge(&mut self, src: u64, dst: u64, token: Option<&str>) -> Result<()> {
        if src == dst {
            self.processor.on_self_loop(src, token);
            return Ok(());
        }

        self.max_vertex_id = self.max_vertex_id.max(src).max(dst);

        let u = self.pre_translate.forward(src);
        let v = self.pre_translate.forward(dst);
        let shard = (dst % self.num_shards) as usize;

        let value = self.processor.parse_token(token, src, dst);
        self.codec.write_into(&mut self.value_buf, &value);

        let key = (u << 32) | v;
        let writer = &mut self.writers[shard];
        writer
            .write_all(&key.to_be_bytes())
            .with_context(|| format!("writing shovel {shard} key"))?;
        writer
            .write_all(&self.value_buf)
            .with_context(|| format!("writing shovel {shard} value"))?;

        self.num_edges += 1;
        Ok(())
    }

    /// Flushes and closes every shovel appender, returning the paths in
    /// shard order for pass 2 to consume and delete.
    pub fn finalize(mut self) -> Result<Vec<PathBuf>> {
        for (k, writer) in self.writers.iter_mut().enumerate() {
            writer
                .flush()
                .with_context(|| format!("flushing shovel {k}"))?;
        }
        Ok(self.paths)
    }
}
