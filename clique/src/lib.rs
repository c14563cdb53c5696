// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Proof-of-authority consensus engine.
//!
//! A fixed set of authorized signers takes turns sealing blocks. Membership
//! changes through votes carried in ordinary headers: the coinbase names the
//! target and the nonce the direction. The [`Snapshot`] ledger replays those
//! votes header by header and is the single source of truth for who may sign.
//!
//! Key components:
//! - [`Snapshot`]: signer set, recent signers and pending votes as of one block
//! - [`Clique`]: snapshot reconstruction with caching and checkpoint persistence,
//!   header validation, preparation and sealing
//! - [`CliqueApi`]: the read/propose surface exposed to RPC collaborators
//!
//! Every node derives the same signer set purely by replaying the same header
//! sequence; there is no other coordination.

mod api;
mod batch;
mod engine;
mod error;
mod seal;
mod snapshot;
mod store;
mod verify;

#[cfg(test)]
mod tester;

pub use api::{BlockRef, CliqueApi, Status};
pub use batch::AbortHandle;
pub use engine::Clique;
pub use error::{CliqueError, ErrorKind, Result};
pub use seal::{calc_difficulty, seal_delay};
pub use snapshot::{Snapshot, Tally, Vote};
pub use store::{MemoryStore, SnapshotStore};
pub use verify::{HeaderState, checkpoint_signers};

use std::time::Duration;

/// Number of blocks after which to save the vote snapshot to the store
pub const CHECKPOINT_INTERVAL: u64 = 1024;

/// Number of recent vote snapshots to keep in memory
pub const IN_MEMORY_SNAPSHOTS: usize = 128;

/// Block difficulty for in-turn signatures
pub const DIFF_IN_TURN: u64 = 2;

/// Block difficulty for out-of-turn signatures
pub const DIFF_NO_TURN: u64 = 1;

/// Random delay (per signer) to allow concurrent signers
pub const WIGGLE_TIME: Duration = Duration::from_millis(500);
