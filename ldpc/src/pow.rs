// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{IndexMaps, LevelSpec, PRE_IMAGE_LEN, ParityCode, decode};
use consensus_suite_primitives::H256;
use sha3::{Digest, Keccak512};

/// Outcome of checking a decoded word against a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Some parity check is violated
    ParityFailure,
    /// A codeword, but its weight is outside the level's window
    Rejected { weight: usize },
    Accepted { weight: usize },
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted { .. })
    }

    /// Hamming weight of the word, if it was a codeword.
    pub fn weight(&self) -> Option<usize> {
        match self {
            Decision::ParityFailure => None,
            Decision::Rejected { weight } | Decision::Accepted { weight } => Some(*weight),
        }
    }
}

/// Block hash followed by the little-endian nonce.
pub fn pre_image(hash_no_nonce: &H256, nonce: u64) -> [u8; PRE_IMAGE_LEN] {
    let mut seed = [0u8; PRE_IMAGE_LEN];
    seed[..32].copy_from_slice(hash_no_nonce.as_bytes());
    seed[32..].copy_from_slice(&nonce.to_le_bytes());
    seed
}

/// Keccak-512 of the pre-image.
pub fn wide_hash(pre_image: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Keccak512::digest(pre_image));
    out
}

/// Unpacks the first `n / 8` digest bytes MSB first into an `n` bit vector.
/// Bits past the last whole byte stay zero.
pub fn hash_vector(digest: &[u8], n: usize) -> Vec<u8> {
    let mut bits = vec![0u8; n];
    for (i, byte) in digest.iter().take(n / 8).enumerate() {
        for j in 0..8 {
            bits[i * 8 + j] = (byte >> (7 - j)) & 1;
        }
    }
    bits
}

/// Packs bits MSB first, zero-padding the final byte.
pub fn pack_codeword(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (j, bit)| acc | ((bit & 1) << (7 - j)))
        })
        .collect()
}

/// Every check must have even parity; then the weight must sit in the
/// level's window on a multiple of its step.
pub fn decide(maps: &IndexMaps, word: &[u8], spec: &LevelSpec) -> Decision {
    let rows = maps.col_in_row.first().map_or(0, Vec::len);
    for row in 0..rows {
        let parity = maps
            .col_in_row
            .iter()
            .fold(0u8, |acc, cols| acc ^ word[cols[row]]);
        if parity != 0 {
            return Decision::ParityFailure;
        }
    }

    let weight = word.iter().filter(|bit| **bit == 1).count();
    if (spec.decision_from..=spec.decision_to).contains(&weight) && weight % spec.decision_step == 0
    {
        Decision::Accepted { weight }
    } else {
        Decision::Rejected { weight }
    }
}

/// Decodes the word a nonce yields and judges it.
pub(crate) fn attempt(
    code: &ParityCode,
    spec: &LevelSpec,
    hash_no_nonce: &H256,
    nonce: u64,
) -> (Decision, Vec<u8>) {
    let digest = wide_hash(&pre_image(hash_no_nonce, nonce));
    let hv = hash_vector(&digest, code.params.n);
    let word = decode(&code.params, &hv, &code.maps);
    (decide(&code.maps, &word, spec), word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parameters;

    fn spec(from: usize, to: usize, step: usize) -> LevelSpec {
        LevelSpec {
            n: 8,
            wc: 3,
            wr: 4,
            decision_from: from,
            decision_to: to,
            decision_step: step,
            mining_prob: 0.5,
        }
    }

    fn code8() -> ParityCode {
        ParityCode::generate(Parameters {
            n: 8,
            m: 6,
            wc: 3,
            wr: 4,
            seed: 0,
            level: 0,
        })
    }

    #[test]
    fn test_pre_image_layout() {
        let hash = H256::repeat_byte(0xab);
        let seed = pre_image(&hash, 0x0102);
        assert_eq!(&seed[..32], hash.as_bytes());
        assert_eq!(&seed[32..], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_hash_vector_is_msb_first() {
        let bits = hash_vector(&[0b1010_0001, 0xff], 12);
        assert_eq!(bits, vec![1, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(hash_vector(&[0xff; 2], 16), vec![1; 16]);
    }

    #[test]
    fn test_pack_codeword() {
        assert_eq!(pack_codeword(&[1, 0, 1, 0, 0, 0, 0, 1]), vec![0b1010_0001]);
        assert_eq!(pack_codeword(&[1, 1, 0, 0, 1]), vec![0b1100_1000]);
        assert!(pack_codeword(&[]).is_empty());
    }

    #[test]
    fn test_decide() {
        let code = code8();
        let zero = vec![0u8; 8];
        // the zero word is always a codeword of weight zero
        assert_eq!(
            decide(&code.maps, &zero, &spec(0, 8, 1)),
            Decision::Accepted { weight: 0 }
        );
        assert_eq!(
            decide(&code.maps, &zero, &spec(2, 8, 1)),
            Decision::Rejected { weight: 0 }
        );
        // so is the all-ones word, since every row has four ones
        let ones = vec![1u8; 8];
        assert_eq!(
            decide(&code.maps, &ones, &spec(0, 8, 4)),
            Decision::Accepted { weight: 8 }
        );
        assert_eq!(
            decide(&code.maps, &ones, &spec(0, 8, 3)),
            Decision::Rejected { weight: 8 }
        );
        // a single one breaks the checks it takes part in
        let mut single = zero.clone();
        single[3] = 1;
        let decision = decide(&code.maps, &single, &spec(0, 8, 1));
        assert_eq!(decision, Decision::ParityFailure);
        assert_eq!(decision.weight(), None);
    }
}
