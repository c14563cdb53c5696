// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::verify::checkpoint_signers;
use crate::{CHECKPOINT_INTERVAL, CliqueError, IN_MEMORY_SNAPSHOTS, Result, Snapshot, SnapshotStore};
use ahash::HashMap;
use consensus_suite_primitives::config::DEFAULT_EPOCH;
use consensus_suite_primitives::{Address, ChainReader, CliqueConfig, H256, Header, Signer};
use consensus_suite_sealsig::SignatureCache;
use hashlink::LruCache;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Local sealing identity and the backend that signs for it.
#[derive(Clone)]
pub(crate) struct Sealer {
    pub(crate) address: Address,
    pub(crate) signer: Arc<dyn Signer>,
}

/// Proof-of-authority consensus engine.
///
/// The only cross-call mutable state is the snapshot and signature caches,
/// both guarded by short locks around map access; snapshot replay itself runs
/// without holding any lock, so concurrent callers asking for different
/// blocks proceed in parallel.
pub struct Clique {
    pub(crate) config: CliqueConfig,
    store: Arc<dyn SnapshotStore>,
    /// Snapshots for recent blocks to speed up reorgs
    recents: Mutex<LruCache<H256, Arc<Snapshot>>>,
    /// Signatures of recent blocks to speed up mining
    pub(crate) signatures: SignatureCache,
    /// Current list of proposals we are pushing
    pub(crate) proposals: RwLock<HashMap<Address, bool>>,
    pub(crate) sealer: RwLock<Option<Sealer>>,
}

impl Clique {
    /// Creates an engine persisting checkpoint snapshots into `store`.
    ///
    /// An epoch of zero is replaced by the default epoch length.
    pub fn new(mut config: CliqueConfig, store: Arc<dyn SnapshotStore>) -> Self {
        if config.epoch == 0 {
            config.epoch = DEFAULT_EPOCH;
        }
        Self {
            config,
            store,
            recents: Mutex::new(LruCache::new(IN_MEMORY_SNAPSHOTS)),
            signatures: SignatureCache::default(),
            proposals: RwLock::new(HashMap::default()),
            sealer: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &CliqueConfig {
        &self.config
    }

    /// Retrieves the account that sealed `header`.
    pub fn author(&self, header: &Header) -> Result<Address> {
        Ok(self.signatures.recover(header)?)
    }

    /// Injects the local sealing identity.
    pub fn authorize(&self, address: Address, signer: Arc<dyn Signer>) {
        *self.sealer.write() = Some(Sealer { address, signer });
    }

    /// Address of the local sealing identity, if one is installed.
    pub fn signer(&self) -> Option<Address> {
        self.sealer.read().as_ref().map(|sealer| sealer.address)
    }

    /// Adds a new authorization proposal that the local signer will attempt to
    /// push through in the blocks it prepares.
    pub fn propose(&self, address: Address, authorize: bool) {
        self.proposals.write().insert(address, authorize);
    }

    /// Drops a currently running proposal, stopping the signer from casting
    /// further votes (either for or against).
    pub fn discard(&self, address: &Address) {
        self.proposals.write().remove(address);
    }

    /// Current proposals, keyed by target.
    pub fn proposals(&self) -> HashMap<Address, bool> {
        self.proposals.read().clone()
    }

    /// Retrieves the authorization snapshot as of block `(number, hash)`.
    ///
    /// Walks back through `parents` (an ascending batch of headers not yet in
    /// the chain, ending with the block itself) and then the chain reader,
    /// until it finds a cached snapshot, a stored checkpoint, or genesis.
    /// The collected headers are then replayed forward.
    pub fn snapshot(
        &self,
        chain: &dyn ChainReader,
        number: u64,
        hash: H256,
        parents: &[Header],
    ) -> Result<Arc<Snapshot>> {
        let (mut number, mut hash, mut parents) = (number, hash, parents);
        let mut headers: Vec<Header> = Vec::new();

        let base = loop {
            if let Some(snap) = self.recents.lock().get(&hash) {
                break snap.clone();
            }
            if number % CHECKPOINT_INTERVAL == 0 {
                if let Some(snap) = self.store.load(&hash)? {
                    trace!(number, ?hash, "loaded voting snapshot from store");
                    break Arc::new(snap);
                }
            }
            if number == 0 {
                break Arc::new(self.genesis_snapshot(chain, hash)?);
            }

            let header = match parents.split_last() {
                Some((last, rest)) => {
                    if last.number != number || last.hash() != hash {
                        return Err(CliqueError::UnknownAncestor { number, hash });
                    }
                    parents = rest;
                    last.clone()
                }
                None => chain
                    .get_header(&hash, number)
                    .ok_or(CliqueError::UnknownAncestor { number, hash })?,
            };
            number -= 1;
            hash = header.parent_hash;
            headers.push(header);
        };

        if headers.is_empty() {
            return Ok(base);
        }
        headers.reverse();
        let snap = Arc::new(base.apply(&headers, self.config.epoch, &self.signatures)?);
        self.recents.lock().insert(snap.hash, snap.clone());

        if snap.number % CHECKPOINT_INTERVAL == 0 {
            self.store.store(&snap)?;
            debug!(number = snap.number, hash = ?snap.hash, "stored voting snapshot");
        }
        Ok(snap)
    }

    /// Builds the very first snapshot from the signer list embedded in the
    /// genesis extra-data.
    fn genesis_snapshot(&self, chain: &dyn ChainReader, hash: H256) -> Result<Snapshot> {
        let genesis = chain
            .get_header_by_number(0)
            .ok_or(CliqueError::UnknownBlock)?;
        if genesis.hash() != hash {
            return Err(CliqueError::UnknownAncestor { number: 0, hash });
        }
        let signers = checkpoint_signers(&genesis.extra)?;
        let snap = Snapshot::new(0, hash, signers);
        self.store.store(&snap)?;
        info!(signers = snap.signers.len(), "stored genesis voting snapshot");
        Ok(snap)
    }
}
