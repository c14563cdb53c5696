// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use consensus_suite_primitives::{BigUint, EMPTY_UNCLE_HASH, Header};
use num_bigint::BigInt;

/// Lower bound of the adjustment factor.
const MIN_SIGN_TERM: i64 = -99;

/// Difficulty of a block created at `time` on top of `parent`.
///
/// `parent + parent / sensitivity * max(y - elapsed / block_time, -99)`
/// where `y` is 2 if the parent has uncles and 1 otherwise, floored at
/// `minimum`.
pub fn calc_difficulty(
    time: u64,
    parent: &Header,
    block_generation_time: u64,
    sensitivity: u64,
    minimum: &BigUint,
) -> BigUint {
    let elapsed = time.saturating_sub(parent.time) / block_generation_time.max(1);
    let y: i64 = if parent.uncle_hash == EMPTY_UNCLE_HASH {
        1
    } else {
        2
    };
    let sign_term = y
        .saturating_sub(i64::try_from(elapsed).unwrap_or(i64::MAX))
        .max(MIN_SIGN_TERM);

    let parent_difficulty = BigInt::from(parent.difficulty.clone());
    let step = &parent_difficulty / BigInt::from(sensitivity.max(1));
    let next = parent_difficulty + step * BigInt::from(sign_term);
    next.to_biguint()
        .filter(|next| next >= minimum)
        .unwrap_or_else(|| minimum.clone())
}
