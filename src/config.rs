/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Tunable knobs for a sharding run, gathered into one value object passed
//! down through the driver.

use sysinfo::System;

use crate::edge_data::DEFAULT_BLOCK_SIZE;

/// Fraction of total system memory used as the default RAM budget when the
/// caller doesn't set one explicitly.
const DEFAULT_RAM_BUDGET_FRACTION: f64 = 0.5;

/// Configuration for one [`crate::driver::GraphSharder`] run.
///
/// Built with [`SharderConfig::new`] plus builder-style setters, the same
/// plain-value-object convention used for `clap::Args` structs that are
/// also constructed outside the CLI layer.
#[derive(Debug, Clone)]
pub struct SharderConfig {
    num_shards: u32,
    value_width: usize,
    force_sparse_degrees: bool,
    ram_budget_bytes: u64,
    block_size: usize,
    parallel_encode: bool,
}

impl SharderConfig {
    pub fn new(num_shards: u32) -> Self {
        SharderConfig {
            num_shards,
            value_width: 0,
            force_sparse_degrees: false,
            ram_budget_bytes: default_ram_budget(),
            block_size: DEFAULT_BLOCK_SIZE,
            parallel_encode: false,
        }
    }

    pub fn with_value_width(mut self, value_width: usize) -> Self {
        self.value_width = value_width;
        self
    }

    pub fn with_sparse_degrees(mut self, force: bool) -> Self {
        self.force_sparse_degrees = force;
        self
    }

    pub fn with_ram_budget_bytes(mut self, bytes: u64) -> Self {
        self.ram_budget_bytes = bytes;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Opts into the `parallel_encode` feature's per-shard parallel
    /// sort/encode. A no-op unless the crate was built with the
    /// `parallel_encode` feature; defaults to off either way, so a run is
    /// single-threaded and deterministic unless this is set.
    pub fn with_parallel_encode(mut self, enabled: bool) -> Self {
        self.parallel_encode = enabled;
        self
    }

    pub fn num_shards(&self) -> u32 {
        self.num_shards
    }

    pub fn value_width(&self) -> usize {
        self.value_width
    }

    pub fn force_sparse_degrees(&self) -> bool {
        self.force_sparse_degrees
    }

    pub fn ram_budget_bytes(&self) -> u64 {
        self.ram_budget_bytes
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn parallel_encode(&self) -> bool {
        self.parallel_encode
    }
}

/// Half of total system memory, refreshed fresh on every call since a
/// single sharding run only calls this once at startup.
fn default_ram_budget() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    let total = sys.total_memory();
    ((total as f64) * DEFAULT_RAM_BUDGET_FRACTION) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_reasonable() {
        let config = SharderConfig::new(8);
        assert_eq!(config.num_shards(), 8);
        assert_eq!(config.value_width(), 0);
        assert!(!config.force_sparse_degrees());
        assert!(config.ram_budget_bytes() > 0);
        assert_eq!(config.block_size(), DEFAULT_BLOCK_SIZE);
        assert!(!config.parallel_encode());
    }

    #[test]
    fn builder_setters_override_defaults() {
        let config = SharderConfig::new(4)
            .with_value_width(8)
            .with_sparse_degrees(true)
            .with_ram_budget_bytes(1 << 20)
            .with_block_size(4096)
            .with_parallel_encode(true);
        assert_eq!(config.value_width(), 8);
        assert!(config.force_sparse_degrees());
        assert_eq!(config.ram_budget_bytes(), 1 << 20);
        assert_eq!(config.block_size(), 4096);
        assert!(config.parallel_encode());
    }
}
