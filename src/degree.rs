/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Per-vertex in/out degree accumulation and its on-disk table formats
//! (component F).
//!
//! Degrees can be accumulated two ways: directly in RAM while the shard
//! encoder runs, or by replaying the just-written adjacency streams in
//! bounded-memory vertex-id windows when the in-RAM arrays would not fit
//! the configured RAM budget.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};

use crate::adjacency::decode_adjacency;

/// One in/out degree pair per vertex id, dense-indexed.
#[derive(Debug, Clone)]
pub struct DegreeTable {
    in_degree: Vec<u32>,
    out_degree: Vec<u32>,
}

impl DegreeTable {
    /// Allocates a table covering `len` vertex ids (see
    /// [`crate::id_translate::IdTranslate::padded_len`] for how callers
    /// size this).
    pub fn new(len: usize) -> Self {
        DegreeTable {
            in_degree: vec![0; len],
            out_degree: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.in_degree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_degree.is_empty()
    }

    #[inline]
    pub fn record_edge(&mut self, src: u64, dst: u64) {
        self.out_degree[src as usize] += 1;
        self.in_degree[dst as usize] += 1;
    }

    /// Adds another table's counts into `self`, entry by entry. Used to
    /// fold the per-shard partial tables the `parallel_encode` feature
    /// produces back into one table, since each shard's table
    /// only carries nonzero counts for the vertices that shard touched.
    pub fn merge_from(&mut self, other: &DegreeTable) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.in_degree.iter_mut().zip(other.in_degree.iter()) {
            *a += b;
        }
        for (a, b) in self.out_degree.iter_mut().zip(other.out_degree.iter()) {
            *a += b;
        }
    }

    #[inline]
    pub fn in_degree(&self, vertex: u64) -> u32 {
        self.in_degree[vertex as usize]
    }

    #[inline]
    pub fn out_degree(&self, vertex: u64) -> u32 {
        self.out_degree[vertex as usize]
    }

    /// Dense on-disk layout: for every vertex id in `[0, len)`, an LE `u32`
    /// in-degree followed by an LE `u32` out-degree.
    pub fn write_dense(&self, path: &Path) -> Result<()> {
        let mut out = std::io::BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        for i in 0..self.in_degree.len() {
            out.write_all(&self.in_degree[i].to_le_bytes())?;
            out.write_all(&self.out_degree[i].to_le_bytes())?;
        }
        out.flush().with_context(|| format!("flushing {}", path.display()))?;
        Ok(())
    }

    /// Sparse on-disk layout: only vertices with nonzero in- or out-degree
    /// are recorded, as `(vertex_id: u32, in_degree: u32, out_degree: u32)`
    /// triples in ascending vertex-id order.
    pub fn write_sparse(&self, path: &Path) -> Result<()> {
        let mut out = std::io::BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        for (i, (&id, &od)) in self.in_degree.iter().zip(self.out_degree.iter()).enumerate() {
            if id != 0 || od != 0 {
                out.write_all(&(i as u32).to_le_bytes())?;
                out.write_all(&id.to_le_bytes())?;
                out.write_all(&od.to_le_bytes())?;
            }
        }
        out.flush().with_context(|| format!("flushing {}", path.display()))?;
        Ok(())
    }

    pub fn read_dense(path: &Path) -> Result<Self> {
        let mut bytes = Vec::new();
        File::open(path)
            .with_context(|| format!("opening {}", path.display()))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("reading {}", path.display()))?;
        let len = bytes.len() / 8;
        let mut table = DegreeTable::new(len);
        for i in 0..len {
            let base = i * 8;
            table.in_degree[i] = u32::from_le_bytes(bytes[base..base + 4].try_into().unwrap());
            table.out_degree[i] = u32::from_le_bytes(bytes[base + 4..base + 8].try_into().unwrap());
        }
        Ok(table)
    }

    pub fn read_sparse(path: &Path, len: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        File::open(path)
            .with_context(|| format!("opening {}", path.display()))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut table = DegreeTable::new(len);
        for chunk in bytes.chunks(12) {
            let id = u32::from_le_bytes(chunk[0..4].try_into().unwrap()) as usize;
            table.in_degree[id] = u32::from_le_bytes(chunk[4..8].try_into().unwrap());
            table.out_degree[id] = u32::from_le_bytes(chunk[8..12].try_into().unwrap());
        }
        Ok(table)
    }
}

/// Chooses the dense format unless the vertex-id space is sparser than the
/// edge count, in which case the sparse table is both smaller and faster
/// to write.
pub fn should_use_sparse(max_vertex_id: u64, num_edges: u64) -> bool {
    max_vertex_id > num_edges
}

/// The two strategies for turning edges into a [`DegreeTable`]: accumulate
/// every count in one resident array, or replay the shard encoder's own
/// adjacency output in bounded-memory vertex-id windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegreeStrategy {
    InRam,
    Replay,
}

/// Picks [`DegreeStrategy::Replay`] once a fifth of the configured RAM
/// budget can no longer hold two `u32` arrays spanning `max_vertex_id`
/// entries, matching the heuristic.
pub fn choose_strategy(ram_budget_bytes: u64, max_vertex_id: u64) -> DegreeStrategy {
    if ram_budget_bytes / 5 < max_vertex_id * 8 {
        DegreeStrategy::Replay
    } else {
        DegreeStrategy::InRam
    }
}

/// Replays a set of already-written adjacency streams into a
/// [`DegreeTable`] window covering only `vertex_range`, the bounded-memory
/// counterpart of recording degrees while encoding. A caller with a tight
/// RAM budget invokes this once per sub-interval chunk of the vertex-id
/// space and writes each chunk's slice out before moving to the next,
/// rather than holding the whole table resident at once.
pub fn replay_degrees_in_range(
    adjacency_paths: &[impl AsRef<Path>],
    vertex_range: Range<u64>,
    full_len: usize,
) -> Result<DegreeTable> {
    let mut table = DegreeTable::new(full_len);
    for path in adjacency_paths {
        let path = path.as_ref();
        let mut reader = BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        );
        let pairs = decode_adjacency(&mut reader)
            .with_context(|| format!("replaying adjacency stream {}", path.display()))?;
        for (src, dst) in pairs {
            let (src, dst) = (src as u64, dst as u64);
            if vertex_range.contains(&src) {
                table.out_degree[src as usize] += 1;
            }
            if vertex_range.contains(&dst) {
                table.in_degree[dst as usize] += 1;
            }
        }
    }
    Ok(table)
}
