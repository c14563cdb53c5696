// Copyright 2019-2024 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::verify::{checkpoint_signers, unix_now};
use crate::{Clique, CliqueError, DIFF_IN_TURN, DIFF_NO_TURN, Result, Snapshot, WIGGLE_TIME};
use consensus_suite_primitives::{
    Address, BigUint, BlockNonce, ChainReader, EMPTY_UNCLE_HASH, EXTRA_SEAL, EXTRA_VANITY,
    Header,
};
use consensus_suite_sealsig::seal_hash;
use crossbeam::channel::{Receiver, after};
use crossbeam::select;
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, info, trace};

/// Difficulty a block signed by `signer` should carry on top of `snap`.
pub fn calc_difficulty(snap: &Snapshot, signer: &Address) -> BigUint {
    if snap.inturn(snap.number + 1, signer) {
        BigUint::from(DIFF_IN_TURN)
    } else {
        BigUint::from(DIFF_NO_TURN)
    }
}

/// Time to wait before releasing a block stamped `header_time`.
///
/// Out-of-turn signers add a random wiggle of up to `(signers / 2 + 1)`
/// times [`WIGGLE_TIME`], so the in-turn signer usually wins the race.
pub fn seal_delay<R: Rng>(
    header_time: u64,
    now: Duration,
    out_of_turn: bool,
    signers: usize,
    rng: &mut R,
) -> Duration {
    let mut delay = Duration::from_secs(header_time).saturating_sub(now);
    if out_of_turn {
        let wiggle = WIGGLE_TIME * (signers as u32 / 2 + 1);
        delay += Duration::from_nanos(rng.gen_range(0..wiggle.as_nanos() as u64));
    }
    delay
}

impl Clique {
    /// Difficulty the local signer's next block on top of `parent` should have.
    pub fn calc_difficulty(&self, chain: &dyn ChainReader, parent: &Header) -> Result<BigUint> {
        let snap = self.snapshot(chain, parent.number, parent.hash(), &[])?;
        let signer = self.signer().unwrap_or_default();
        Ok(calc_difficulty(&snap, &signer))
    }

    /// Fills in the consensus fields of `header` so it is ready for sealing.
    ///
    /// One pending proposal (chosen at random) is turned into this block's
    /// vote, unless the block is a checkpoint, which instead embeds the
    /// current signer list.
    pub fn prepare(&self, chain: &dyn ChainReader, header: &mut Header) -> Result<()> {
        let number = header.number;
        if number == 0 {
            return Err(CliqueError::UnknownBlock);
        }
        header.coinbase = Address::zero();
        header.nonce = BlockNonce::DROP;

        let snap = self.snapshot(chain, number - 1, header.parent_hash, &[])?;
        let checkpoint = number % self.config.epoch == 0;
        if !checkpoint {
            let proposals = self.proposals.read();
            let candidates: Vec<(Address, bool)> = proposals
                .iter()
                .filter(|(address, authorize)| snap.valid_vote(address, **authorize))
                .map(|(address, authorize)| (*address, *authorize))
                .collect();
            if let Some((address, authorize)) = candidates.choose(&mut rand::thread_rng()) {
                header.coinbase = *address;
                header.nonce = if *authorize {
                    BlockNonce::AUTH
                } else {
                    BlockNonce::DROP
                };
                debug!(number, target = %address, authorize, "casting vote in prepared block");
            }
        }

        let signer = self.signer().unwrap_or_default();
        header.difficulty = calc_difficulty(&snap, &signer);

        let vanity_len = header.extra.len().min(EXTRA_VANITY);
        let mut extra = Vec::with_capacity(EXTRA_VANITY + EXTRA_SEAL);
        extra.extend_from_slice(&header.extra[..vanity_len]);
        extra.resize(EXTRA_VANITY, 0);
        if checkpoint {
            for signer in snap.signers() {
                extra.extend_from_slice(signer.as_bytes());
            }
        }
        extra.extend_from_slice(&[0u8; EXTRA_SEAL]);
        header.extra = extra;

        header.mix_digest = vec![0u8; 32];
        header.uncle_hash = EMPTY_UNCLE_HASH;

        let parent = chain
            .get_header(&header.parent_hash, number - 1)
            .ok_or(CliqueError::UnknownAncestor {
                number: number - 1,
                hash: header.parent_hash,
            })?;
        let earliest = parent
            .time
            .checked_add(self.config.period)
            .ok_or(CliqueError::InvalidTimestamp)?;
        header.time = earliest.max(unix_now());
        Ok(())
    }

    /// Signs `header` with the local identity and holds it back until its
    /// release time.
    ///
    /// Returns `Ok(None)` when the local signer is not allowed to seal this
    /// block yet, or when `stop` fires (or is dropped) before the delay
    /// elapses.
    pub fn seal(
        &self,
        chain: &dyn ChainReader,
        header: &Header,
        stop: &Receiver<()>,
    ) -> Result<Option<Header>> {
        let number = header.number;
        if number == 0 {
            return Err(CliqueError::UnknownBlock);
        }
        let Some(sealer) = self.sealer.read().clone() else {
            return Err(CliqueError::Unsupported("no sealing identity configured".into()));
        };

        let snap = self.snapshot(chain, number - 1, header.parent_hash, &[])?;
        if !snap.signers.contains(&sealer.address) {
            return Err(CliqueError::UnauthorizedSigner(sealer.address));
        }
        if snap.recently_signed(number, &sealer.address) {
            info!(number, signer = %sealer.address, "signed recently, must wait for others");
            return Ok(None);
        }
        if number % self.config.epoch == 0
            && checkpoint_signers(&header.extra)? != snap.signers()
        {
            return Err(CliqueError::MismatchingCheckpointSigners);
        }

        let mut sealed = header.clone();
        let digest = seal_hash(&sealed)?;
        let signature = sealer
            .signer
            .sign(&sealer.address, &digest)
            .map_err(|e| CliqueError::Signing(e.to_string()))?;
        if signature.len() != EXTRA_SEAL {
            return Err(CliqueError::Signing(format!(
                "signature of {} bytes, expected {EXTRA_SEAL}",
                signature.len()
            )));
        }
        let len = sealed.extra.len();
        sealed.extra[len - EXTRA_SEAL..].copy_from_slice(&signature);

        let now = UNIX_EPOCH.elapsed().unwrap_or_default();
        let out_of_turn = sealed.difficulty == BigUint::from(DIFF_NO_TURN);
        let delay = seal_delay(
            sealed.time,
            now,
            out_of_turn,
            snap.signers.len(),
            &mut rand::thread_rng(),
        );
        trace!(number, ?delay, out_of_turn, "waiting for slot to sign and propagate");

        select! {
            recv(stop) -> _ => {
                debug!(number, "sealing aborted");
                Ok(None)
            }
            recv(after(delay)) -> _ => Ok(Some(sealed)),
        }
    }
}
