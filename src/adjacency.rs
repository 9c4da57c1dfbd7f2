/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The run-length adjacency stream: encoder (component E) and its
//! decoding counterpart (component H).
//!
//! Sorted edge keys are packed as `(src << 32) | dst`. For each run of
//! edges sharing a source, the encoder writes a count prefix followed by
//! the destinations; gaps of zero-out-degree vertices between sources are
//! covered by `(0, k)` zero-gap tokens.

use std::io::{Read, Write};

use anyhow::{Context, Result};

const ZERO_GAP_MAX_RUN: u64 = 254;
const LARGE_COUNT_MARKER: u8 = 0xFF;
const SMALL_COUNT_LIMIT: u64 = 255;

fn split_key(key: u64) -> (u32, u32) {
    ((key >> 32) as u32, (key & 0xFFFF_FFFF) as u32)
}

/// Writes the zero-gap token sequence covering `gap` zero-out-degree
/// vertices,.
fn write_gap_tokens<W: Write>(out: &mut W, mut gap: u64) -> Result<()> {
    while gap > 0 {
        out.write_all(&[0u8])?;
        gap -= 1;
        let t = gap.min(ZERO_GAP_MAX_RUN);
        out.write_all(&[t as u8])?;
        gap -= t;
    }
    Ok(())
}

fn write_count_prefix<W: Write>(out: &mut W, count: u64) -> Result<()> {
    if count < SMALL_COUNT_LIMIT {
        out.write_all(&[count as u8])?;
    } else {
        out.write_all(&[LARGE_COUNT_MARKER])?;
        out.write_all(&(count as u32).to_le_bytes())?;
    }
    Ok(())
}

/// Encodes the sorted `(src, dst)` key array into the adjacency stream
/// format. `keys` must already be sorted ascending.
pub fn encode_adjacency<W: Write>(keys: &[u64], out: &mut W) -> Result<()> {
    let mut prev_source: Option<u64> = None;
    let mut i = 0;
    while i < keys.len() {
        let (src, _) = split_key(keys[i]);
        let src = src as u64;
        let mut j = i + 1;
        while j < keys.len() && split_key(keys[j]).0 as u64 == src {
            j += 1;
        }
        let count = (j - i) as u64;

        let gap = match prev_source {
            None => src,
            Some(prev) => src - prev - 1,
        };
        write_gap_tokens(out, gap).context("writing zero-gap tokens")?;
        write_count_prefix(out, count).context("writing count prefix")?;
        for key in &keys[i..j] {
            let (_, dst) = split_key(*key);
            out.write_all(&dst.to_le_bytes())
                .context("writing destination id")?;
        }

        prev_source = Some(src);
        i = j;
    }
    Ok(())
}

/// Reads back an adjacency stream into the exact multiset of `(src, dst)`
/// pairs the encoder consumed (component H). Zero-gap tokens are skipped;
/// they carry no edges, only vertex-id bookkeeping.
pub fn decode_adjacency<R: Read>(input: &mut R) -> Result<Vec<(u32, u32)>> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes).context("reading adjacency stream")?;

    let mut pairs = Vec::new();
    let mut next_vertex: u64 = 0;
    let mut pos = 0usize;

    while pos < bytes.len() {
        let b0 = bytes[pos];
        pos += 1;
        if b0 == 0 {
            let k = *bytes
                .get(pos)
                .context("truncated zero-gap token")? as u64;
            pos += 1;
            next_vertex += 1 + k;
            continue;
        }

        let count = if b0 == LARGE_COUNT_MARKER {
            let raw: [u8; 4] = bytes
                .get(pos..pos + 4)
                .context("truncated large count prefix")?
                .try_into()
                .unwrap();
            pos += 4;
            u32::from_le_bytes(raw) as u64
        } else {
            b0 as u64
        };

        for _ in 0..count {
            let raw: [u8; 4] = bytes
                .get(pos..pos + 4)
                .context("truncated destination id")?
                .try_into()
                .unwrap();
            pos += 4;
            let dst = u32::from_le_bytes(raw);
            pairs.push((next_vertex as u32, dst));
        }
        next_vertex += 1;
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(src: u32, dst: u32) -> u64 {
        ((src as u64) << 32) | dst as u64
    }

    #[test]
    fn round_trips_a_small_graph() {
        let keys = vec![pack(0, 5), pack(0, 2), pack(0, 5)];
        // keys must already be sorted by the caller; this input is already
        // grouped by source (the single source 0), matching post-sort order.
        let mut buf = Vec::new();
        encode_adjacency(&keys, &mut buf).unwrap();
        let decoded = decode_adjacency(&mut &buf[..]).unwrap();
        assert_eq!(decoded, vec![(0, 5), (0, 2), (0, 5)]);
    }

    #[test]
    fn gap_of_four_between_sources_zero_and_five() {
        let keys = vec![pack(0, 1), pack(5, 2)];
        let mut buf = Vec::new();
        encode_adjacency(&keys, &mut buf).unwrap();
        // source 0: count=1, dst=1 -> bytes [1, 1,0,0,0]
        // gap of 4 zero-degree vertices (1,2,3,4): one token pair (0,3)
        // source 5: count=1, dst=2 -> bytes [1, 2,0,0,0]
        assert_eq!(buf, vec![1, 1, 0, 0, 0, 0, 3, 1, 2, 0, 0, 0]);

        let decoded = decode_adjacency(&mut &buf[..]).unwrap();
        assert_eq!(decoded, vec![(0, 1), (5, 2)]);
    }

    #[test]
    fn large_run_uses_the_0xff_marker() {
        let mut keys = Vec::new();
        for d in 0..300u32 {
            keys.push(pack(0, d));
        }
        let mut buf = Vec::new();
        encode_adjacency(&keys, &mut buf).unwrap();
        assert_eq!(buf[0], 0xFF);
        assert_eq!(u32::from_le_bytes(buf[1..5].try_into().unwrap()), 300);

        let decoded = decode_adjacency(&mut &buf[..]).unwrap();
        assert_eq!(decoded.len(), 300);
        assert!(decoded.iter().all(|(s, _)| *s == 0));
    }

    #[test]
    fn initial_gap_before_the_first_source() {
        let keys = vec![pack(3, 9)];
        let mut buf = Vec::new();
        encode_adjacency(&keys, &mut buf).unwrap();
        // initial gap of 3 vertices (0,1,2): one token pair (0,2)
        assert_eq!(buf, vec![0, 2, 1, 9, 0, 0, 0]);
        let decoded = decode_adjacency(&mut &buf[..]).unwrap();
        assert_eq!(decoded, vec![(3, 9)]);
    }

    #[test]
    fn empty_shard_encodes_to_nothing() {
        let keys: Vec<u64> = vec![];
        let mut buf = Vec::new();
        encode_adjacency(&keys, &mut buf).unwrap();
        assert!(buf.is_empty());
        assert!(decode_adjacency(&mut &buf[..]).unwrap().is_empty());
    }
}
