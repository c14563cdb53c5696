// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Result, Snapshot};
use ahash::HashMap;
use consensus_suite_primitives::H256;
use parking_lot::RwLock;

/// Durable storage for checkpoint snapshots, keyed by block hash.
///
/// Written at checkpoint granularity only; the hot path reads it when a
/// snapshot walk reaches a checkpoint height.
pub trait SnapshotStore: Send + Sync {
    /// Loads the snapshot taken at block `hash`, if one was stored
    fn load(&self, hash: &H256) -> Result<Option<Snapshot>>;

    /// Persists `snapshot` under its block hash
    fn store(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Snapshot store keeping the serialized blobs in memory.
#[derive(Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<H256, Vec<u8>>>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, hash: &H256) -> bool {
        self.blobs.read().contains_key(hash)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, hash: &H256) -> Result<Option<Snapshot>> {
        self.blobs
            .read()
            .get(hash)
            .map(|blob| Snapshot::from_bytes(blob))
            .transpose()
    }

    fn store(&self, snapshot: &Snapshot) -> Result<()> {
        let blob = snapshot.to_bytes()?;
        self.blobs.write().insert(snapshot.hash, blob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tally, Vote};
    use consensus_suite_primitives::Address;

    #[test]
    fn test_memory_store_roundtrip() {
        let a = Address([1; 20]);
        let b = Address([2; 20]);
        let mut snap = Snapshot::new(1024, H256::repeat_byte(7), [a, b]);
        snap.recents.insert(1024, a);
        snap.votes.push(Vote {
            signer: a,
            block: 1024,
            address: Address([3; 20]),
            authorize: true,
        });
        snap.tally.insert(
            Address([3; 20]),
            Tally {
                authorize: true,
                votes: 1,
            },
        );

        let store = MemoryStore::default();
        assert_eq!(store.load(&snap.hash).unwrap(), None);
        store.store(&snap).unwrap();
        assert!(store.contains(&snap.hash));
        assert_eq!(store.load(&snap.hash).unwrap(), Some(snap));
    }

    #[test]
    fn test_corrupt_blob_is_a_serialization_error() {
        assert!(matches!(
            Snapshot::from_bytes(b"not json"),
            Err(crate::CliqueError::Serialization(_))
        ));
    }
}
