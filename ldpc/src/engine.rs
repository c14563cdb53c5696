// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::error::Result;
use crate::params::{DEFAULT_TABLE, derive_parameters, minimum_difficulty, validate_table};
use crate::pow::attempt;
use crate::{
    LdpcError, LevelSpec, Miner, Parameters, ParityCode, SHARED_CODE_CACHE_SIZE, calc_difficulty,
    pack_codeword, pre_image,
};
use consensus_suite_primitives::{Address, BigUint, BlockNonce, ChainReader, Header, LdpcConfig};
use crossbeam::channel::Receiver;
use hashlink::LruCache;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Maximum size of the extra-data field.
const MAXIMUM_EXTRA_DATA_SIZE: usize = 32;

/// Generated codes shared by every engine handle built with it.
///
/// Only sealing reads from it; verification always regenerates the code from
/// the header under test.
pub struct LdpcShared {
    codes: Mutex<LruCache<Parameters, Arc<ParityCode>>>,
}

impl Default for LdpcShared {
    fn default() -> Self {
        Self::new(SHARED_CODE_CACHE_SIZE)
    }
}

impl LdpcShared {
    pub fn new(capacity: usize) -> Self {
        Self {
            codes: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the cached code for `params`, generating it on a miss.
    pub fn code(&self, params: Parameters) -> Arc<ParityCode> {
        if let Some(code) = self.codes.lock().get(&params) {
            return code.clone();
        }
        let code = Arc::new(ParityCode::generate(params));
        self.codes.lock().insert(params, code.clone());
        code
    }

    pub fn len(&self) -> usize {
        self.codes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// LDPC proof-of-work engine.
pub struct Ldpc {
    config: LdpcConfig,
    table: Vec<LevelSpec>,
    minimum: BigUint,
    shared: Option<Arc<LdpcShared>>,
}

impl Ldpc {
    /// Engine over the built-in level table.
    pub fn new(config: LdpcConfig) -> Self {
        Self {
            config,
            table: DEFAULT_TABLE.to_vec(),
            minimum: minimum_difficulty(&DEFAULT_TABLE),
            shared: None,
        }
    }

    /// Engine whose sealing reuses codes from `shared`.
    pub fn new_shared(config: LdpcConfig, shared: Arc<LdpcShared>) -> Self {
        Self::new(config).with_shared(shared)
    }

    /// Engine over a custom level table.
    pub fn with_table(config: LdpcConfig, table: Vec<LevelSpec>) -> Result<Self> {
        validate_table(&table)?;
        Ok(Self {
            config,
            minimum: minimum_difficulty(&table),
            table,
            shared: None,
        })
    }

    pub fn with_shared(mut self, shared: Arc<LdpcShared>) -> Self {
        self.shared = Some(shared);
        self
    }

    pub fn config(&self) -> &LdpcConfig {
        &self.config
    }

    pub fn table(&self) -> &[LevelSpec] {
        &self.table
    }

    pub fn minimum_difficulty(&self) -> &BigUint {
        &self.minimum
    }

    /// Blocks are credited to their coinbase.
    pub fn author(&self, header: &Header) -> Address {
        header.coinbase
    }

    /// Code parameters for sealing or verifying `header`.
    pub fn parameters(&self, header: &Header) -> Parameters {
        derive_parameters(&self.table, header)
    }

    fn code(&self, params: Parameters) -> Arc<ParityCode> {
        match &self.shared {
            Some(shared) => shared.code(params),
            None => Arc::new(ParityCode::generate(params)),
        }
    }

    /// Difficulty a block created at `time` on top of `parent` must carry.
    pub fn calc_difficulty(&self, time: u64, parent: &Header) -> BigUint {
        calc_difficulty(
            time,
            parent,
            self.config.block_generation_time,
            self.config.sensitivity,
            &self.minimum,
        )
    }

    fn parent(&self, chain: &dyn ChainReader, header: &Header) -> Result<Header> {
        let number = header.number.checked_sub(1).ok_or(LdpcError::Genesis)?;
        chain
            .get_header(&header.parent_hash, number)
            .ok_or(LdpcError::UnknownAncestor {
                number,
                hash: header.parent_hash,
            })
    }

    /// Checks the header fields against its parent, then the seal.
    pub fn verify_header(&self, chain: &dyn ChainReader, header: &Header) -> Result<()> {
        let parent = self.parent(chain, header)?;

        if header.extra.len() > MAXIMUM_EXTRA_DATA_SIZE {
            return Err(LdpcError::ExtraTooLong(header.extra.len()));
        }
        let limit = unix_now() + self.config.allowed_future_time;
        if header.time > limit {
            return Err(LdpcError::FutureBlock {
                time: header.time,
                limit,
            });
        }
        if header.time <= parent.time {
            return Err(LdpcError::OlderBlockTime);
        }
        let expected = self.calc_difficulty(header.time, &parent);
        if header.difficulty != expected {
            return Err(LdpcError::InvalidDifficulty {
                expected,
                actual: header.difficulty.clone(),
            });
        }
        if header.number != parent.number + 1 {
            return Err(LdpcError::InvalidNumber {
                expected: parent.number + 1,
                actual: header.number,
            });
        }
        self.verify_seal(header)
    }

    /// Re-runs the decoder for the header's nonce on a freshly generated code
    /// and checks every sealed field against the result.
    pub fn verify_seal(&self, header: &Header) -> Result<()> {
        if header.number == 0 {
            return Err(LdpcError::Genesis);
        }
        let params = self.parameters(header);
        if header.code_length != params.n as u64 {
            return Err(LdpcError::InvalidCodeLength {
                expected: params.n as u64,
                actual: header.code_length,
            });
        }
        let hash = header.hash_no_nonce();
        let nonce = header.nonce.as_u64();
        if header.mix_digest[..] != pre_image(&hash, nonce)[..] {
            return Err(LdpcError::InvalidMixDigest);
        }

        let code = ParityCode::generate(params);
        let (decision, word) = attempt(&code, &self.table[params.level], &hash, nonce);
        if !decision.is_accepted() {
            return Err(LdpcError::InvalidPoW(decision));
        }
        if header.codeword != pack_codeword(&word) {
            return Err(LdpcError::InvalidCodeword);
        }
        Ok(())
    }

    /// Sets the difficulty of `header` from its parent and timestamp.
    pub fn prepare(&self, chain: &dyn ChainReader, header: &mut Header) -> Result<()> {
        let parent = self.parent(chain, header)?;
        header.difficulty = self.calc_difficulty(header.time, &parent);
        Ok(())
    }

    /// Searches for a nonce until one is found or `stop` fires.
    ///
    /// Returns the sealed header carrying nonce, pre-image, packed codeword
    /// and code length, or `None` when stopped.
    pub fn seal(&self, header: &Header, stop: &Receiver<()>) -> Result<Option<Header>> {
        if header.number == 0 {
            return Err(LdpcError::Genesis);
        }
        let params = self.parameters(header);
        let mut sealed = header.clone();
        sealed.code_length = params.n as u64;
        let hash = sealed.hash_no_nonce();

        let miner = Miner::new(
            self.code(params),
            self.table[params.level],
            hash,
            self.config.max_attempts,
            self.config.workers,
        );
        let Some(solution) = miner.mine(stop) else {
            debug!(number = header.number, "ldpc sealing stopped");
            return Ok(None);
        };

        sealed.nonce = BlockNonce::from_u64(solution.nonce);
        sealed.mix_digest = solution.pre_image.to_vec();
        sealed.codeword = solution.packed_codeword();
        info!(
            number = sealed.number,
            level = params.level,
            weight = solution.weight,
            "sealed ldpc block"
        );
        Ok(Some(sealed))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
