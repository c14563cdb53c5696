// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::pow::attempt;
use crate::{LevelSpec, PRE_IMAGE_LEN, ParityCode, pack_codeword, pre_image};
use consensus_suite_primitives::H256;
use crossbeam::channel::{Receiver, TryRecvError, bounded};
use crossbeam::select;
use rand::Rng;
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace};

/// A nonce whose decoded word passed the level's decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    pub pre_image: [u8; PRE_IMAGE_LEN],
    /// Decoded word, one bit per byte
    pub codeword: Vec<u8>,
    pub weight: usize,
}

impl Solution {
    pub fn packed_codeword(&self) -> Vec<u8> {
        pack_codeword(&self.codeword)
    }
}

/// Parallel nonce search over one code.
pub struct Miner {
    code: Arc<ParityCode>,
    spec: LevelSpec,
    hash_no_nonce: H256,
    /// Nonces each worker tries per round
    attempts: usize,
    workers: usize,
}

impl Miner {
    pub fn new(
        code: Arc<ParityCode>,
        spec: LevelSpec,
        hash_no_nonce: H256,
        attempts: usize,
        workers: usize,
    ) -> Self {
        let workers = if workers == 0 {
            thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            workers
        };
        Self {
            code,
            spec,
            hash_no_nonce,
            attempts: attempts.max(1),
            workers,
        }
    }

    /// Tries `attempts` random nonces. `None` means no solution this round,
    /// not a failure.
    pub fn search_round<R: Rng>(&self, rng: &mut R) -> Option<Solution> {
        for _ in 0..self.attempts {
            let nonce = rng.r#gen::<u64>();
            let (decision, codeword) = attempt(&self.code, &self.spec, &self.hash_no_nonce, nonce);
            if let crate::Decision::Accepted { weight } = decision {
                return Some(Solution {
                    nonce,
                    pre_image: pre_image(&self.hash_no_nonce, nonce),
                    codeword,
                    weight,
                });
            }
        }
        None
    }

    /// Runs rounds on every worker until one finds a solution or `stop`
    /// fires. Dropping the stop sender counts as a stop.
    ///
    /// The first success and an external stop both close the shared abort
    /// channel; workers notice it between rounds.
    pub fn mine(&self, stop: &Receiver<()>) -> Option<Solution> {
        let (abort_tx, abort_rx) = bounded::<()>(0);
        let (found_tx, found_rx) = bounded::<Solution>(self.workers);

        thread::scope(|s| {
            for worker in 0..self.workers {
                let abort = abort_rx.clone();
                let found = found_tx.clone();
                s.spawn(move || {
                    let mut rng = rand::thread_rng();
                    let mut rounds = 0u64;
                    while matches!(abort.try_recv(), Err(TryRecvError::Empty)) {
                        rounds += 1;
                        if let Some(solution) = self.search_round(&mut rng) {
                            debug!(worker, rounds, nonce = solution.nonce, "found ldpc solution");
                            let _ = found.send(solution);
                            return;
                        }
                        trace!(worker, rounds, "no solution this round");
                    }
                });
            }
            drop(found_tx);

            let solution = select! {
                recv(found_rx) -> solution => solution.ok(),
                recv(stop) -> _ => None,
            };
            drop(abort_tx);
            solution
        })
    }
}
