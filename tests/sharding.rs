/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! End-to-end coverage of the driver's public API against the testable
//! properties a sharding run must satisfy.

use graph_sharder::prelude::*;

fn padded_len(max_vertex_id: u64, num_shards: u32) -> usize {
    (max_vertex_id + num_shards as u64) as usize
}

#[test]
fn three_cycle_partitions_by_destination_shard_and_counts_degrees() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("g");
    let config = SharderConfig::new(2).with_sparse_degrees(true);

    let mut sharder = GraphSharder::new(&base, config, EmptyCodec, NoOpProcessor).unwrap();
    for (src, dst) in [(1u64, 2u64), (2, 3), (3, 1)] {
        sharder.add_edge(src, dst, None).unwrap();
    }
    let manifest = sharder.process().unwrap();

    assert_eq!(manifest.num_edges, 3);
    assert_eq!(manifest.max_vertex_id, 3);
    assert!(manifest.used_sparse_degrees);

    for shard in 0..manifest.num_shards {
        for (_src, dst) in
            graph_sharder::driver::read_adjacency_shard(&base, shard, manifest.num_shards).unwrap()
        {
            let original_dst = manifest.final_translate.backward(dst as u64);
            assert_eq!(original_dst % manifest.num_shards as u64, shard as u64);
        }
    }

    let degrees = DegreeTable::read_sparse(
        &graph_sharder::paths::sparse_degrees_path(&base),
        padded_len(manifest.max_vertex_id, manifest.num_shards),
    )
    .unwrap();
    for v in [1u64, 2, 3] {
        let final_v = manifest.final_translate.forward(v);
        assert_eq!(degrees.in_degree(final_v), 1);
        assert_eq!(degrees.out_degree(final_v), 1);
    }
}

struct RecordingProcessor {
    self_loops: Vec<u64>,
}

impl EdgeProcessor<()> for RecordingProcessor {
    fn parse_token(&mut self, _token: Option<&str>, _src: u64, _dst: u64) {}

    fn on_self_loop(&mut self, vertex: u64, _token: Option<&str>) {
        self.self_loops.push(vertex);
    }
}

#[test]
fn self_loop_fires_the_callback_once_and_is_absent_from_every_shard() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("g");
    let config = SharderConfig::new(4);

    let processor = RecordingProcessor {
        self_loops: Vec::new(),
    };
    let mut sharder = GraphSharder::new(&base, config, EmptyCodec, processor).unwrap();
    sharder.add_edge(1, 2, None).unwrap();
    sharder.add_edge(7, 7, None).unwrap();
    sharder.add_edge(2, 3, None).unwrap();

    let manifest = sharder.process().unwrap();
    assert_eq!(manifest.num_edges, 2);

    for shard in 0..manifest.num_shards {
        for (src, dst) in
            graph_sharder::driver::read_adjacency_shard(&base, shard, manifest.num_shards).unwrap()
        {
            let original_src = manifest.final_translate.backward(src as u64);
            let original_dst = manifest.final_translate.backward(dst as u64);
            assert_ne!(original_src, original_dst);
        }
    }
}

#[test]
fn memory_efficient_replay_matches_the_in_ram_degree_table() {
    let edges = [(0u64, 1u64), (0, 2), (1, 3), (3, 0), (2, 1), (4, 4)];

    let in_ram_dir = tempfile::tempdir().unwrap();
    let in_ram_base = in_ram_dir.path().join("g");
    let in_ram_config = SharderConfig::new(3).with_ram_budget_bytes(1 << 30);
    let mut in_ram_sharder =
        GraphSharder::new(&in_ram_base, in_ram_config, EmptyCodec, NoOpProcessor).unwrap();
    for (src, dst) in edges {
        in_ram_sharder.add_edge(src, dst, None).unwrap();
    }
    let in_ram_manifest = in_ram_sharder.process().unwrap();
    assert_eq!(in_ram_manifest.degree_strategy, DegreeStrategy::InRam);

    let replay_dir = tempfile::tempdir().unwrap();
    let replay_base = replay_dir.path().join("g");
    let replay_config = SharderConfig::new(3).with_ram_budget_bytes(1);
    let mut replay_sharder =
        GraphSharder::new(&replay_base, replay_config, EmptyCodec, NoOpProcessor).unwrap();
    for (src, dst) in edges {
        replay_sharder.add_edge(src, dst, None).unwrap();
    }
    let replay_manifest = replay_sharder.process().unwrap();
    assert_eq!(replay_manifest.degree_strategy, DegreeStrategy::Replay);

    assert_eq!(in_ram_manifest.max_vertex_id, replay_manifest.max_vertex_id);
    assert_eq!(
        in_ram_manifest.used_sparse_degrees,
        replay_manifest.used_sparse_degrees
    );

    let len = padded_len(in_ram_manifest.max_vertex_id, in_ram_manifest.num_shards);
    let (in_ram_degrees, replay_degrees) = if in_ram_manifest.used_sparse_degrees {
        (
            DegreeTable::read_sparse(&graph_sharder::paths::sparse_degrees_path(&in_ram_base), len)
                .unwrap(),
            DegreeTable::read_sparse(&graph_sharder::paths::sparse_degrees_path(&replay_base), len)
                .unwrap(),
        )
    } else {
        (
            DegreeTable::read_dense(&graph_sharder::paths::dense_degrees_path(&in_ram_base))
                .unwrap(),
            DegreeTable::read_dense(&graph_sharder::paths::dense_degrees_path(&replay_base))
                .unwrap(),
        )
    };

    for v in 0..len as u64 {
        assert_eq!(in_ram_degrees.in_degree(v), replay_degrees.in_degree(v));
        assert_eq!(in_ram_degrees.out_degree(v), replay_degrees.out_degree(v));
    }
}

#[test]
fn manifest_files_describe_the_same_final_layout_on_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("g");
    let config = SharderConfig::new(2);
    let mut sharder = GraphSharder::new(&base, config, EmptyCodec, NoOpProcessor).unwrap();
    for (src, dst) in [(0u64, 1u64), (1, 2), (2, 0)] {
        sharder.add_edge(src, dst, None).unwrap();
    }
    let manifest = sharder.process().unwrap();

    let stored = std::fs::read_to_string(graph_sharder::paths::translate_path(
        &base,
        manifest.num_shards,
    ))
    .unwrap();
    let parsed = IdTranslate::parse(&stored).unwrap();
    assert_eq!(parsed, manifest.final_translate);

    let intervals = std::fs::read_to_string(graph_sharder::paths::intervals_path(
        &base,
        manifest.num_shards,
    ))
    .unwrap();
    assert_eq!(intervals.lines().count(), manifest.num_shards as usize);
}
