/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgMatches, Args, Command, FromArgMatches};
use dsi_progress_logger::prelude::*;

use crate::config::SharderConfig;
use crate::driver::GraphSharder;
use crate::edge_value::{RawBytesCodec, TextTokenProcessor};
use crate::text_input::parse_line;

pub const COMMAND_NAME: &str = "shard";

#[derive(Args, Debug)]
#[command(
    about = "Shard an edge-list graph read from stdin into the interval/shovel/adjacency layout an out-of-core streaming engine expects.",
    long_about = None
)]
struct CliArgs {
    /// The basename every output file is derived from.
    basename: PathBuf,

    #[arg(long, short = 'p')]
    /// The number of shards to partition the graph into.
    num_shards: u32,

    #[arg(long, default_value_t = 0)]
    /// Fixed byte width of the optional trailing edge-value token. 0 means
    /// the input carries no edge values.
    value_width: usize,

    #[arg(long)]
    /// Force the sparse degree table format regardless of the
    /// max-vertex-id-versus-edge-count heuristic.
    sparse_degrees: bool,

    #[arg(long)]
    /// Override the RAM budget (bytes) used to pick the degree
    /// accumulation strategy. Defaults to half of total system memory.
    ram_budget: Option<u64>,

    #[arg(long, default_value_t = crate::edge_data::DEFAULT_BLOCK_SIZE)]
    /// Size, in bytes, of each compressed edge-value block.
    block_size: usize,

    #[arg(long)]
    /// Sort and encode shards concurrently with rayon instead of one at a
    /// time. Requires the crate to be built with the `parallel_encode`
    /// feature; otherwise this is a no-op.
    parallel_encode: bool,
}

pub fn cli(command: Command) -> Command {
    command.subcommand(CliArgs::augment_args(Command::new(COMMAND_NAME)))
}

pub fn main(submatches: &ArgMatches) -> Result<()> {
    let args = CliArgs::from_arg_matches(submatches)?;

    let mut config = SharderConfig::new(args.num_shards)
        .with_value_width(args.value_width)
        .with_sparse_degrees(args.sparse_degrees)
        .with_block_size(args.block_size)
        .with_parallel_encode(args.parallel_encode);
    if let Some(ram_budget) = args.ram_budget {
        config = config.with_ram_budget_bytes(ram_budget);
    }

    let mut sharder = GraphSharder::new(
        &args.basename,
        config,
        RawBytesCodec::new(args.value_width),
        TextTokenProcessor,
    )
    .context("opening sharder")?;

    let stdin = std::io::stdin();
    let mut pl = ProgressLogger::default();
    pl.display_memory(true).item_name("edges");
    pl.start("Reading edge list from stdin");

    for line in stdin.lock().lines() {
        let line = line.context("reading a line from stdin")?;
        if let Some(edge) = parse_line(&line)? {
            sharder
                .add_edge(edge.src, edge.dst, edge.value)
                .with_context(|| format!("ingesting edge {} -> {}", edge.src, edge.dst))?;
        }
        pl.light_update();
    }
    pl.done();

    let manifest = sharder.process().context("processing shards")?;
    log::info!(
        "sharded {} edges across {} vertices into {} shards ({} degree table, {:?} strategy)",
        manifest.num_edges,
        manifest.max_vertex_id + 1,
        manifest.num_shards,
        if manifest.used_sparse_degrees { "sparse" } else { "dense" },
        manifest.degree_strategy,
    );
    Ok(())
}
