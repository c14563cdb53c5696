// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! LDPC proof-of-work.
//!
//! A block is sealed by finding a nonce whose wide hash, read as a noisy
//! received word, decodes under a pseudo-random low-density parity-check code
//! into a valid codeword of an acceptable Hamming weight. The code is derived
//! deterministically from the parent hash and the block difficulty, so every
//! node can rebuild it to check a seal.
//!
//! Key components:
//! - [`params`]: the difficulty level table and [`Parameters`] derivation
//! - [`ParityCheckMatrix`] and [`IndexMaps`]: the code and its adjacency lists
//! - [`decode`]: fixed-budget belief-propagation decoder
//! - [`decide`] and [`Miner`]: the acceptance predicate and the parallel search
//! - [`Ldpc`]: header preparation, sealing and verification

mod decoder;
mod difficulty;
mod engine;
mod error;
mod matrix;
mod mining;
pub mod params;
mod pow;

pub use decoder::decode;
pub use difficulty::calc_difficulty;
pub use engine::{Ldpc, LdpcShared};
pub use error::LdpcError;
pub use matrix::{IndexMaps, ParityCheckMatrix, ParityCode};
pub use mining::{Miner, Solution};
pub use params::{LevelSpec, Parameters};
pub use pow::{Decision, decide, hash_vector, pack_codeword, pre_image, wide_hash};

/// Assumed crossover probability of the virtual binary symmetric channel.
pub const CROSS_ERR: f64 = 0.01;

/// Decoder rounds; the decoder always runs all of them.
pub const MAX_ITER: usize = 20;

/// Magnitude bound for every log-likelihood ratio.
pub const LLR_LIMIT: f64 = 64.0;

/// Saturation point of the `f` transform.
pub const BIG_INFINITY: f64 = 1e6;

/// Length in bytes of the mining pre-image: block hash and nonce.
pub const PRE_IMAGE_LEN: usize = 40;

/// Number of recently generated codes kept by a shared engine.
pub const SHARED_CODE_CACHE_SIZE: usize = 16;
