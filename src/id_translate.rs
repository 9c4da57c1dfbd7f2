/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Bijection between original vertex ids and permuted ids over a fixed
//! interval layout (component A).

use anyhow::{anyhow, Context, Result};

/// Upper bound on an input vertex id, matching the `INT_MAX` of a signed
/// 32-bit integer: the largest interval length the pre-layout can afford
/// while still addressing every plausible input id.
const INT_MAX: u64 = i32::MAX as u64;

/// A value object parameterized by `(interval_length, num_shards)` that
/// spreads vertex-id locality across shards.
///
/// `forward` interleaves ids so that a contiguous run in the original space
/// lands one-per-shard; `backward` is its exact inverse. Two independent
/// instances exist in a sharder run: the generous `pre` layout built before
/// ingest, and the tight `final` layout built once `maxVertexId` is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdTranslate {
    interval_length: u64,
    num_shards: u64,
}

impl IdTranslate {
    /// Builds a translator directly from its two defining numbers.
    pub fn new(interval_length: u64, num_shards: u64) -> Result<Self> {
        if num_shards == 0 {
            return Err(anyhow!("num_shards must be positive"));
        }
        if interval_length == 0 {
            return Err(anyhow!("interval_length must be positive"));
        }
        Ok(IdTranslate {
            interval_length,
            num_shards,
        })
    }

    /// The generous pre-ingest layout: `L_pre = floor(INT_MAX / P)`.
    pub fn pre_layout(num_shards: u64) -> Result<Self> {
        Self::new(INT_MAX / num_shards, num_shards)
    }

    /// The tight post-ingest layout: `L_fin = floor((1 + maxVertexId) / P) + 1`.
    pub fn final_layout(max_vertex_id: u64, num_shards: u64) -> Result<Self> {
        Self::new((1 + max_vertex_id) / num_shards + 1, num_shards)
    }

    #[inline]
    pub fn interval_length(&self) -> u64 {
        self.interval_length
    }

    #[inline]
    pub fn num_shards(&self) -> u64 {
        self.num_shards
    }

    /// `forward(v) = (v mod P)*L + floor(v/P)`.
    #[inline]
    pub fn forward(&self, v: u64) -> u64 {
        (v % self.num_shards) * self.interval_length + v / self.num_shards
    }

    /// `backward(w) = (w mod L)*P + floor(w/L)`, the exact inverse of `forward`.
    #[inline]
    pub fn backward(&self, w: u64) -> u64 {
        (w % self.interval_length) * self.num_shards + w / self.interval_length
    }

    /// The padded length of a degree array sized to safely hold every
    /// translated id this layout can produce: `finalIdTranslate` can
    /// overshoot `maxVertexId` slightly, so arrays are always sized
    /// `max_vertex_id + num_shards` rather than `max_vertex_id` alone.
    pub fn padded_len(max_vertex_id: u64, num_shards: u64) -> u64 {
        max_vertex_id + num_shards
    }

    /// Canonical textual encoding consumed by the engine: the two
    /// defining numbers, one per line.
    pub fn to_string_repr(&self) -> String {
        format!("{}\n{}\n", self.interval_length, self.num_shards)
    }

    /// Parses the textual encoding produced by [`IdTranslate::to_string_repr`].
    pub fn parse(s: &str) -> Result<Self> {
        let mut tokens = s.split_whitespace();
        let interval_length: u64 = tokens
            .next()
            .context("missing interval length")?
            .parse()
            .context("interval length is not a number")?;
        let num_shards: u64 = tokens
            .next()
            .context("missing shard count")?
            .parse()
            .context("shard count is not a number")?;
        Self::new(interval_length, num_shards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijection_holds_across_the_whole_layout() {
        let t = IdTranslate::new(7, 4).unwrap();
        for v in 0..(7 * 4) {
            assert_eq!(t.backward(t.forward(v)), v);
            assert_eq!(t.forward(t.backward(v)), v);
        }
    }

    #[test]
    fn pre_layout_is_generous() {
        let t = IdTranslate::pre_layout(16).unwrap();
        assert_eq!(t.interval_length(), INT_MAX / 16);
        // A very large plausible id round-trips.
        let v = 1_000_000_000u64;
        assert_eq!(t.backward(t.forward(v)), v);
    }

    #[test]
    fn final_layout_matches_formula() {
        let t = IdTranslate::final_layout(99, 4).unwrap();
        assert_eq!(t.interval_length(), (1 + 99) / 4 + 1);
    }

    #[test]
    fn string_round_trip() {
        let t = IdTranslate::new(123, 7).unwrap();
        let parsed = IdTranslate::parse(&t.to_string_repr()).unwrap();
        assert_eq!(t, parsed);
    }

    #[test]
    fn rejects_zero_shard_count() {
        assert!(IdTranslate::new(10, 0).is_err());
    }
}
