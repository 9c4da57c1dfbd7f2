/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! In-memory quicksort of a 64-bit key array co-permuted with a parallel
//! byte array of equal-rank records (component D).

use anyhow::{anyhow, Result};
use rand::Rng;

/// Above this many records a shovel cannot safely be loaded and co-sorted
/// in RAM in one go.
pub const MAX_SHARD_RECORDS: u64 = 500_000_000;

/// Fails fast if a shard's record count exceeds [`MAX_SHARD_RECORDS`].
pub fn check_shard_size(num_records: u64, shard: u32) -> Result<()> {
    if num_records > MAX_SHARD_RECORDS {
        return Err(anyhow!(
            "shard {shard} has {num_records} records, exceeding the {MAX_SHARD_RECORDS} record ceiling for in-RAM co-sort"
        ));
    }
    Ok(())
}

/// Sorts `keys` ascending, swapping the matching `width`-byte slice of
/// `values` whenever two key slots are swapped. Uses a recursive,
/// random-pivot partitioning scheme; not a stable sort, admissible for any
/// comparison sort that yields the same key permutation with the same byte
/// co-permutation.
pub fn quicksort_copermuted(keys: &mut [u64], values: &mut [u8], width: usize, rng: &mut impl Rng) {
    assert_eq!(
        values.len(),
        keys.len() * width,
        "values buffer must hold exactly one width-byte record per key"
    );
    if keys.len() < 2 {
        return;
    }
    quicksort_range(keys, values, width, 0, keys.len() - 1, rng);
}

fn quicksort_range(
    keys: &mut [u64],
    values: &mut [u8],
    width: usize,
    left: usize,
    right: usize,
    rng: &mut impl Rng,
) {
    if left >= right {
        return;
    }
    let idx = partition(keys, values, width, left, right, rng);
    if left + 1 < idx {
        quicksort_range(keys, values, width, left, idx - 1, rng);
    }
    if idx + 1 < right {
        quicksort_range(keys, values, width, idx + 1, right, rng);
    }
}

/// Lomuto-style partition around a uniformly random pivot in `[left, right]`.
/// Returns the split index `idx` such that `[left, idx)` holds elements
/// `< pivot` and `[idx, right]` holds elements `>= pivot`.
fn partition(
    keys: &mut [u64],
    values: &mut [u8],
    width: usize,
    left: usize,
    right: usize,
    rng: &mut impl Rng,
) -> usize {
    let pivot_pos = rng.random_range(left..=right);
    let pivot = keys[pivot_pos];
    swap_record(keys, values, width, pivot_pos, right);

    let mut store = left;
    for i in left..right {
        if keys[i] < pivot {
            swap_record(keys, values, width, i, store);
            store += 1;
        }
    }
    swap_record(keys, values, width, store, right);
    store
}

fn swap_record(keys: &mut [u64], values: &mut [u8], width: usize, a: usize, b: usize) {
    if a == b {
        return;
    }
    keys.swap(a, b);
    if width == 0 {
        return;
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let (left_part, right_part) = values.split_at_mut(hi * width);
    let lo_slice = &mut left_part[lo * width..lo * width + width];
    let hi_slice = &mut right_part[..width];
    lo_slice.swap_with_slice(hi_slice);
}
