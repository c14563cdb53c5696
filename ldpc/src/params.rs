// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Difficulty levels and code parameters.

use crate::LdpcError;
use consensus_suite_primitives::{BigUint, H256, Header};
use num_traits::ToPrimitive;

/// One row of the difficulty level table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelSpec {
    /// Codeword length in bits
    pub n: usize,
    /// Ones per column
    pub wc: usize,
    /// Ones per row
    pub wr: usize,
    /// Smallest accepted Hamming weight
    pub decision_from: usize,
    /// Largest accepted Hamming weight
    pub decision_to: usize,
    /// Accepted weights are multiples of this
    pub decision_step: usize,
    /// Probability that a single nonce succeeds at this level
    pub mining_prob: f64,
}

const fn level(n: usize, from: usize, to: usize, step: usize, prob: f64) -> LevelSpec {
    LevelSpec {
        n,
        wc: 3,
        wr: 4,
        decision_from: from,
        decision_to: to,
        decision_step: step,
        mining_prob: prob,
    }
}

/// Level table in order of decreasing success probability.
pub const DEFAULT_TABLE: [LevelSpec; 23] = [
    level(32, 16, 16, 1, 0.289792),
    level(36, 14, 18, 2, 0.289792),
    level(40, 16, 24, 2, 0.20865),
    level(44, 18, 26, 2, 0.150228),
    level(48, 20, 28, 2, 0.108164),
    level(52, 22, 30, 2, 0.077878),
    level(56, 24, 32, 2, 0.056072),
    level(60, 26, 34, 2, 0.040372),
    level(64, 28, 36, 2, 0.029068),
    level(68, 30, 38, 2, 0.020929),
    level(72, 32, 40, 2, 0.015069),
    level(76, 34, 42, 2, 0.01085),
    level(80, 36, 44, 2, 0.007812),
    level(84, 38, 46, 2, 0.005624),
    level(88, 40, 48, 2, 0.00405),
    level(92, 42, 50, 2, 0.002916),
    level(96, 44, 52, 2, 0.002099),
    level(100, 46, 54, 2, 0.001511),
    level(104, 48, 56, 2, 0.001088),
    level(108, 50, 58, 2, 0.000784),
    level(112, 52, 60, 2, 0.000564),
    level(116, 54, 62, 2, 0.000406),
    level(120, 56, 64, 2, 0.000292),
];

/// Largest codeword the 512 bit wide hash can feed.
const MAX_N: usize = 512;

/// Checks that every row describes a constructible code and that success
/// probabilities never increase with the level.
pub fn validate_table(table: &[LevelSpec]) -> Result<(), LdpcError> {
    if table.is_empty() {
        return Err(LdpcError::InvalidTable("empty table".into()));
    }
    for (index, spec) in table.iter().enumerate() {
        if spec.wc == 0 || spec.wr == 0 || spec.n == 0 || spec.n > MAX_N {
            return Err(LdpcError::InvalidTable(
                format!("level {index}: degenerate dimensions").into(),
            ));
        }
        if spec.n % spec.wr != 0 {
            return Err(LdpcError::InvalidTable(
                format!("level {index}: n={} not divisible by wr={}", spec.n, spec.wr).into(),
            ));
        }
        if spec.decision_step == 0 || spec.decision_from > spec.decision_to {
            return Err(LdpcError::InvalidTable(
                format!("level {index}: empty decision window").into(),
            ));
        }
        if !(spec.mining_prob > 0.0 && spec.mining_prob <= 1.0) {
            return Err(LdpcError::InvalidTable(
                format!("level {index}: probability out of range").into(),
            ));
        }
    }
    if table
        .windows(2)
        .any(|pair| pair[1].mining_prob > pair[0].mining_prob)
    {
        return Err(LdpcError::InvalidTable(
            "probabilities must not increase".into(),
        ));
    }
    Ok(())
}

/// Shape and seed of the parity-check code for one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Parameters {
    pub n: usize,
    pub m: usize,
    pub wc: usize,
    pub wr: usize,
    /// Seed of the column shuffle, decremented once per layer
    pub seed: i64,
    /// Row of the level table the shape was read from
    pub level: usize,
}

/// Sum of the parent hash bytes. Only shapes the matrix, it carries no
/// security.
pub fn generate_seed(parent_hash: &H256) -> i64 {
    parent_hash.as_bytes().iter().map(|b| i64::from(*b)).sum()
}

pub fn difficulty_to_prob(difficulty: &BigUint) -> f64 {
    1.0 / difficulty.to_f64().unwrap_or(f64::INFINITY)
}

pub fn prob_to_difficulty(prob: f64) -> BigUint {
    BigUint::from((1.0 / prob).ceil() as u64)
}

/// Lowest difficulty the table admits.
pub fn minimum_difficulty(table: &[LevelSpec]) -> BigUint {
    table
        .first()
        .map(|spec| prob_to_difficulty(spec.mining_prob))
        .unwrap_or_else(|| BigUint::from(1u32))
}

/// Finds the table row whose probability is closest to that of
/// `difficulty`.
///
/// Scans from the easiest level and stops at the first row that is further
/// away than the best so far; equal distances move on to the harder row.
pub fn search_level(table: &[LevelSpec], difficulty: &BigUint) -> usize {
    let prob = difficulty_to_prob(difficulty);
    let mut distance = 1.0;
    let mut level = 0;
    for (index, spec) in table.iter().enumerate() {
        let candidate = (prob - spec.mining_prob).abs();
        if candidate > distance {
            break;
        }
        level = index;
        distance = candidate;
    }
    level
}

/// Parameters of the code that seals `header`.
pub fn derive_parameters(table: &[LevelSpec], header: &Header) -> Parameters {
    let level = search_level(table, &header.difficulty);
    let spec = &table[level];
    Parameters {
        n: spec.n,
        m: spec.n * spec.wc / spec.wr,
        wc: spec.wc,
        wr: spec.wr,
        seed: generate_seed(&header.parent_hash),
        level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        validate_table(&DEFAULT_TABLE).unwrap();
        for spec in DEFAULT_TABLE {
            assert_eq!(spec.n * spec.wc % spec.wr, 0);
        }
    }

    #[test]
    fn test_validate_table_rejects_bad_rows() {
        assert!(validate_table(&[]).is_err());
        assert!(validate_table(&[level(30, 10, 20, 2, 0.5)]).is_err());
        assert!(validate_table(&[level(32, 20, 10, 2, 0.5)]).is_err());
        assert!(validate_table(&[level(32, 10, 20, 2, 0.1), level(32, 10, 20, 2, 0.2)]).is_err());
    }

    #[test]
    fn test_generate_seed_sums_bytes() {
        assert_eq!(generate_seed(&H256::zero()), 0);
        assert_eq!(generate_seed(&H256::repeat_byte(0xff)), 255 * 32);
    }

    #[test]
    fn test_prob_difficulty_conversions() {
        assert_eq!(prob_to_difficulty(0.5), BigUint::from(2u32));
        assert_eq!(prob_to_difficulty(0.289792), BigUint::from(4u32));
        assert_eq!(minimum_difficulty(&DEFAULT_TABLE), BigUint::from(4u32));
        assert_eq!(difficulty_to_prob(&BigUint::from(4u32)), 0.25);
    }

    #[test]
    fn test_search_level() {
        // ties between the first two rows advance to the second
        assert_eq!(search_level(&DEFAULT_TABLE, &BigUint::from(4u32)), 1);
        // 1/50 = 0.02 is closest to 0.020929
        assert_eq!(search_level(&DEFAULT_TABLE, &BigUint::from(50u32)), 9);
        // beyond the hardest row the scan runs to the end
        assert_eq!(search_level(&DEFAULT_TABLE, &BigUint::from(1u64 << 40)), 22);
        // difficulty zero has infinite probability, nothing is close
        assert_eq!(search_level(&DEFAULT_TABLE, &BigUint::from(0u32)), 0);
    }

    #[test]
    fn test_derive_parameters() {
        let header = Header {
            parent_hash: H256::repeat_byte(1),
            difficulty: BigUint::from(50u32),
            ..Default::default()
        };
        let params = derive_parameters(&DEFAULT_TABLE, &header);
        assert_eq!(
            params,
            Parameters {
                n: 68,
                m: 51,
                wc: 3,
                wr: 4,
                seed: 32,
                level: 9,
            }
        );
    }
}
