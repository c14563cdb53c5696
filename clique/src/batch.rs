// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Clique, CliqueError, Result};
use consensus_suite_primitives::{ChainReader, Header};
use crossbeam::channel::{Receiver, Sender, TryRecvError, bounded, unbounded};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Cancels a running batch verification when aborted or dropped.
pub struct AbortHandle {
    _abort: Sender<()>,
}

impl AbortHandle {
    pub fn abort(self) {}
}

fn aborted(abort: &Receiver<()>) -> bool {
    !matches!(abort.try_recv(), Err(TryRecvError::Empty))
}

impl Clique {
    /// Verifies a contiguous, ascending batch of headers concurrently.
    ///
    /// Each header is checked with the headers before it in the batch as its
    /// ancestry, so the batch may extend past the local chain head. Results
    /// are delivered in input order, one per header, no matter which worker
    /// finishes first; a header left unchecked by a dead worker is reported
    /// as [`CliqueError::VerificationInterrupted`]. Dropping the
    /// [`AbortHandle`] stops the workers and closes the result channel early.
    pub fn verify_headers(
        self: &Arc<Self>,
        chain: Arc<dyn ChainReader>,
        headers: Vec<Header>,
    ) -> (AbortHandle, Receiver<Result<()>>) {
        let (abort_tx, abort_rx) = bounded::<()>(0);
        let (out_tx, out_rx) = unbounded();
        let total = headers.len();
        if total == 0 {
            return (AbortHandle { _abort: abort_tx }, out_rx);
        }

        let headers = Arc::new(headers);
        let (jobs_tx, jobs_rx) = unbounded::<usize>();
        for index in 0..total {
            // receiver is alive, sending cannot fail
            let _ = jobs_tx.send(index);
        }
        drop(jobs_tx);

        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(total);
        let (done_tx, done_rx) = unbounded::<(usize, Result<()>)>();
        for _ in 0..workers {
            let engine = Arc::clone(self);
            let chain = Arc::clone(&chain);
            let headers = Arc::clone(&headers);
            let jobs = jobs_rx.clone();
            let done = done_tx.clone();
            let abort = abort_rx.clone();
            thread::spawn(move || {
                for index in jobs.iter() {
                    if aborted(&abort) {
                        return;
                    }
                    let result = engine.verify_header_with_parents(
                        chain.as_ref(),
                        &headers[index],
                        &headers[..index],
                    );
                    if done.send((index, result)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(done_tx);

        thread::spawn(move || {
            let mut pending = BTreeMap::new();
            let mut next = 0;
            for (index, result) in done_rx.iter() {
                if aborted(&abort_rx) {
                    debug!(delivered = next, total, "header verification aborted");
                    return;
                }
                pending.insert(index, result);
                while let Some(result) = pending.remove(&next) {
                    if out_tx.send(result).is_err() {
                        return;
                    }
                    next += 1;
                }
            }
            if next == total || aborted(&abort_rx) {
                return;
            }
            warn!(delivered = next, total, "header verification workers exited early");
            for index in next..total {
                let result = pending
                    .remove(&index)
                    .unwrap_or(Err(CliqueError::VerificationInterrupted));
                if out_tx.send(result).is_err() {
                    return;
                }
            }
        });

        (AbortHandle { _abort: abort_tx }, out_rx)
    }
}

#[cfg(test)]
mod tests {
    use crate::tester::{TesterAccountPool, chain_config, chain_with_genesis};
    use crate::{Clique, CliqueError, DIFF_IN_TURN, MemoryStore};
    use consensus_suite_primitives::test_utils::MemoryChain;
    use consensus_suite_primitives::{ChainConfig, ChainReader, H256, Header};
    use crossbeam::channel::bounded;
    use std::sync::Arc;

    /// Chain reader running `hook` before every header lookup.
    struct HookedChain<F> {
        inner: MemoryChain,
        hook: F,
    }

    impl<F: Fn() + Send + Sync> ChainReader for HookedChain<F> {
        fn config(&self) -> &ChainConfig {
            self.inner.config()
        }

        fn current_header(&self) -> Option<Header> {
            (self.hook)();
            self.inner.current_header()
        }

        fn get_header(&self, hash: &H256, number: u64) -> Option<Header> {
            (self.hook)();
            self.inner.get_header(hash, number)
        }

        fn get_header_by_hash(&self, hash: &H256) -> Option<Header> {
            (self.hook)();
            self.inner.get_header_by_hash(hash)
        }

        fn get_header_by_number(&self, number: u64) -> Option<Header> {
            (self.hook)();
            self.inner.get_header_by_number(number)
        }
    }

    fn lost_backend() {
        panic!("chain backend lost");
    }

    fn engine() -> Arc<Clique> {
        Arc::new(Clique::new(
            chain_config(1, 30000).clique.unwrap(),
            Arc::new(MemoryStore::default()),
        ))
    }

    fn memory_chain(genesis: &Header) -> MemoryChain {
        chain_with_genesis(chain_config(1, 30000), genesis.clone())
    }

    fn setup() -> (TesterAccountPool, Header, Arc<dyn ChainReader>, Arc<Clique>) {
        let mut accounts = TesterAccountPool::default();
        let genesis = accounts.genesis(&["A"]);
        let chain: Arc<dyn ChainReader> = Arc::new(memory_chain(&genesis));
        (accounts, genesis, chain, engine())
    }

    fn headers(accounts: &mut TesterAccountPool, genesis: &Header, signers: &[&str]) -> Vec<Header> {
        let mut parent = genesis.clone();
        signers
            .iter()
            .map(|signer| {
                let header = accounts.block(&parent, signer, DIFF_IN_TURN);
                parent = header.clone();
                header
            })
            .collect()
    }

    #[test]
    fn test_batch_results_in_order() {
        let (mut accounts, genesis, chain, clique) = setup();
        let batch = headers(&mut accounts, &genesis, &["A"; 8]);

        let (_abort, results) = clique.verify_headers(chain, batch);
        let results: Vec<_> = results.iter().collect();
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_batch_reports_failure_at_its_index() {
        let (mut accounts, genesis, chain, clique) = setup();
        let batch = headers(&mut accounts, &genesis, &["A", "A", "X", "A", "A"]);

        let (_abort, results) = clique.verify_headers(chain, batch);
        let results: Vec<_> = results.iter().collect();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0], Ok(()));
        assert_eq!(results[1], Ok(()));
        assert_eq!(
            results[2],
            Err(CliqueError::UnauthorizedSigner(accounts.address("X")))
        );
        // later headers replay the bad one as ancestry
        assert!(results[3..].iter().all(|r| r.is_err()));
    }

    #[test]
    fn test_batch_parent_time_overflow_is_an_error() {
        let (mut accounts, genesis, chain, clique) = setup();
        let mut first = accounts.block(&genesis, "A", DIFF_IN_TURN);
        first.time = u64::MAX;
        accounts.sign(&mut first, "A");
        let mut second = accounts.block(&genesis, "A", DIFF_IN_TURN);
        second.number = 2;
        second.parent_hash = first.hash();
        second.time = 5;
        accounts.sign(&mut second, "A");

        let (_abort, results) = clique.verify_headers(chain, vec![first, second]);
        let results: Vec<_> = results.iter().collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(CliqueError::FutureBlock { .. })));
        assert_eq!(results[1], Err(CliqueError::InvalidTimestamp));
    }

    #[test]
    fn test_batch_reports_headers_of_dead_workers() {
        let mut accounts = TesterAccountPool::default();
        let genesis = accounts.genesis(&["A"]);
        let batch = headers(&mut accounts, &genesis, &["A"; 4]);
        let chain: Arc<dyn ChainReader> = Arc::new(HookedChain {
            inner: memory_chain(&genesis),
            hook: lost_backend,
        });

        let (_abort, results) = engine().verify_headers(chain, batch);
        let results: Vec<_> = results.iter().collect();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0], Err(CliqueError::VerificationInterrupted));
    }

    #[test]
    fn test_batch_abort_closes_results() {
        let mut accounts = TesterAccountPool::default();
        let genesis = accounts.genesis(&["A"]);
        let batch = headers(&mut accounts, &genesis, &["A"; 16]);
        // lookups block until the gate sender is dropped
        let (gate_tx, gate) = bounded::<()>(0);
        let chain: Arc<dyn ChainReader> = Arc::new(HookedChain {
            inner: memory_chain(&genesis),
            hook: move || {
                let _ = gate.recv();
            },
        });

        let (abort, results) = engine().verify_headers(chain, batch);
        abort.abort();
        drop(gate_tx);

        // the first header needs the chain, so nothing is releasable before
        // the abort and the channel disconnects without a result
        let delivered: Vec<_> = results.iter().collect();
        assert!(delivered.is_empty(), "{delivered:?}");
    }

    #[test]
    fn test_empty_batch() {
        let (_, _, chain, clique) = setup();
        let (_abort, results) = clique.verify_headers(chain, Vec::new());
        assert_eq!(results.iter().count(), 0);
    }
}
