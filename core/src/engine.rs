//! Shielded Pool Engine
//!
//! Owns every piece of pool state and applies one operation at a time.
//!
//! ```text
//!  deposit ──► CommitmentRegistry ──► custody.transfer_in ──► MembershipHistory
//!
//!  withdraw ─┐                              ┌─► custody.release
//!            ├─► nullifier / root / proof ──┤
//!  wrap ─────┘                              └─► ledger.mint
//!
//!  begin_unwrap ──► ledger.oblivious_transfer(owner → pool) ──► disclose ──► pending
//!  finalize_unwrap ──► check disclosure ──┬─ amount > 0 ─► burn escrow + insert note
//!                                         └─ amount = 0 ─► drop record
//! ```
//!
//! Every operation evaluates all of its preconditions before the first
//! mutation; a failed operation leaves the pool exactly as it found it.
//!
//! The pool principal's confidential balance is unwrap escrow and nothing
//! else: it is credited only by `begin_unwrap` and debited only by
//! `finalize_unwrap` burning that record's own amount. It therefore always
//! holds at least the sum of the live records' amounts.

use anyhow::Context;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use cipherpool_config::CipherpoolConfig;
use cipherpool_confidential::{
    ConfidentialLedger, DisclosureProof, DisclosureVerifier, Ed25519DisclosureVerifier,
    OpaqueAmount, SecureArithmetic, TransferFaultPolicy, decode_clear_amount,
};
use cipherpool_privacy::{
    Address, Commitment, CommitmentRegistry, FieldError, MembershipHistory, MerkleRoot,
    NullifierHash, NullifierRegistry,
};

use crate::custody::AssetCustody;
use crate::error::PoolError;
use crate::events::{Applied, PoolEvent};
use crate::pending::{PendingUnwrap, PendingUnwrapRegistry};
use crate::proof::{Groth16Verifier, Proof, ProofVerifier, PublicSignals};

// ============================================================================
// Parameters
// ============================================================================

/// Fixed parameters of a pool instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolParams {
    pub levels: usize,
    pub root_history_size: usize,
    /// Amount every note is worth
    pub denomination: u64,
    /// The pool's own principal; holds unwrap escrow in the ledger
    pub pool_address: Address,
    pub fault_policy: TransferFaultPolicy,
}

impl PoolParams {
    pub fn new(
        levels: usize,
        root_history_size: usize,
        denomination: u64,
        pool_address: Address,
    ) -> Self {
        Self {
            levels,
            root_history_size,
            denomination,
            pool_address,
            fault_policy: TransferFaultPolicy::default(),
        }
    }

    pub fn with_fault_policy(mut self, policy: TransferFaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    pub fn from_config(config: &CipherpoolConfig) -> anyhow::Result<Self> {
        Ok(Self {
            levels: config.pool.levels,
            root_history_size: config.pool.root_history_size,
            denomination: config.pool.denomination,
            pool_address: config.pool_address()?,
            fault_policy: config.ledger.transfer_fault_policy,
        })
    }
}

/// Public inputs of a wrap or withdraw, everything except the proof itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub root: MerkleRoot,
    pub recipient: Address,
    pub nullifier_hash: NullifierHash,
    pub relayer: Address,
    pub fee: u64,
    pub refund: u64,
}

impl Claim {
    pub fn public_signals(&self) -> Result<PublicSignals, FieldError> {
        PublicSignals::new(
            &self.root,
            &self.recipient,
            &self.nullifier_hash,
            &self.relayer,
            self.fee,
            self.refund,
        )
    }
}

/// How a finalized unwrap ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrapOutcome {
    /// The escrow held the full amount; the new note sits at `leaf_index`
    Credited { leaf_index: u64 },
    /// Nothing was escrowed; no note was created
    Failed,
}

// ============================================================================
// Engine
// ============================================================================

pub struct ShieldedPoolEngine<B: SecureArithmetic, C: AssetCustody> {
    params: PoolParams,
    tree: MembershipHistory,
    commitments: CommitmentRegistry,
    nullifiers: NullifierRegistry,
    pending: PendingUnwrapRegistry,
    ledger: ConfidentialLedger<B>,
    custody: C,
    verifier: Box<dyn ProofVerifier + Send>,
    disclosure: Box<dyn DisclosureVerifier + Send>,
    events: Vec<PoolEvent>,
}

impl<B: SecureArithmetic, C: AssetCustody> ShieldedPoolEngine<B, C> {
    pub fn new(
        params: PoolParams,
        backend: B,
        custody: C,
        verifier: impl ProofVerifier + Send + 'static,
        disclosure: impl DisclosureVerifier + Send + 'static,
    ) -> Result<Self, PoolError> {
        if params.denomination == 0 {
            return Err(PoolError::InvalidParameters(
                "denomination must be non-zero".into(),
            ));
        }
        let tree = MembershipHistory::new(params.levels, params.root_history_size)?;
        let ledger =
            ConfidentialLedger::with_policy(backend, params.pool_address, params.fault_policy);

        info!(
            "Shielded pool {} ready: levels={}, root_history={}, denomination={}",
            params.pool_address, params.levels, params.root_history_size, params.denomination
        );

        Ok(Self {
            params,
            tree,
            commitments: CommitmentRegistry::new(),
            nullifiers: NullifierRegistry::new(),
            pending: PendingUnwrapRegistry::new(),
            ledger,
            custody,
            verifier: Box::new(verifier),
            disclosure: Box::new(disclosure),
            events: Vec::new(),
        })
    }

    /// Build a pool from configuration: Groth16 verifying key from
    /// `verifier.verifying_key_path`, oracle key from `disclosure.oracle_public_key`
    pub fn from_config(config: &CipherpoolConfig, backend: B, custody: C) -> anyhow::Result<Self> {
        let params = PoolParams::from_config(config)?;

        let vk_path = config
            .verifier
            .verifying_key_path
            .as_deref()
            .context("verifier.verifying_key_path is not configured")?;
        let verifier = Groth16Verifier::from_file(vk_path)?;

        let oracle_key = config
            .oracle_public_key()?
            .context("disclosure.oracle_public_key is not configured")?;
        let disclosure = Ed25519DisclosureVerifier::from_bytes(&oracle_key)?;

        Ok(Self::new(params, backend, custody, verifier, disclosure)?)
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Lock `denomination` from `depositor` behind `commitment`
    ///
    /// Returns the leaf index of the commitment.
    pub fn deposit(
        &mut self,
        depositor: Address,
        commitment: Commitment,
    ) -> Result<Applied<u64>, PoolError> {
        let leaf = commitment.to_field()?;
        self.tree.ensure_capacity()?;
        self.ensure_unclaimed(&commitment)?;

        self.custody
            .transfer_in(depositor, self.params.denomination)?;

        self.commitments.insert(commitment)?;
        let leaf_index = self.tree.insert(leaf)?;
        info!("deposit: {} at leaf {}", commitment, leaf_index);

        let event = PoolEvent::Deposited {
            commitment,
            leaf_index,
            timestamp: unix_now(),
        };
        Ok(self.record(leaf_index, vec![event]))
    }

    /// Spend a note and release the underlying asset
    ///
    /// `denomination - fee` goes to the recipient and `fee` to the relayer.
    /// `refund` is bound by the proof and reported, but not paid by the pool.
    pub fn withdraw(&mut self, proof: &Proof, claim: &Claim) -> Result<Applied<()>, PoolError> {
        self.check_claim(proof, claim)?;

        let denomination = self.params.denomination;
        let available = self.custody.available();
        if available < denomination {
            return Err(PoolError::InsufficientCustody {
                available,
                required: denomination,
            });
        }

        let mut payouts = vec![(claim.recipient, denomination - claim.fee)];
        if claim.fee > 0 {
            payouts.push((claim.relayer, claim.fee));
        }
        // check_claim saw the nullifier unspent under this same borrow
        self.custody.release(&payouts)?;
        self.nullifiers.insert(claim.nullifier_hash)?;
        info!("withdraw: nullifier {} spent", claim.nullifier_hash);

        let event = PoolEvent::Withdrawn {
            recipient: claim.recipient,
            nullifier_hash: claim.nullifier_hash,
            relayer: claim.relayer,
            fee: claim.fee,
            refund: claim.refund,
        };
        Ok(self.record((), vec![event]))
    }

    /// Spend a note and credit `denomination` to the recipient's confidential
    /// balance
    ///
    /// Returns the handle of the minted amount.
    pub fn wrap(
        &mut self,
        proof: &Proof,
        claim: &Claim,
    ) -> Result<Applied<OpaqueAmount>, PoolError> {
        self.ensure_not_pool(claim.recipient)?;
        self.check_claim(proof, claim)?;

        let amount = self.ledger.encrypt_constant(self.params.denomination);
        let minted = self.ledger.mint(claim.recipient, &amount)?;
        self.nullifiers.insert(claim.nullifier_hash)?;
        info!("wrap: nullifier {} spent", claim.nullifier_hash);

        let event = PoolEvent::Wrapped {
            recipient: claim.recipient,
            nullifier_hash: claim.nullifier_hash,
            relayer: claim.relayer,
            fee: claim.fee,
        };
        Ok(self.record(minted, vec![event]))
    }

    /// First half of an unwrap: move up to `denomination` of `owner`'s
    /// confidential balance into escrow and request its disclosure
    ///
    /// Whether the balance sufficed is not known until the escrowed amount is
    /// disclosed. Returns the pending record index. The pool principal
    /// cannot unwrap.
    pub fn begin_unwrap(
        &mut self,
        owner: Address,
        commitment: Commitment,
    ) -> Result<Applied<u64>, PoolError> {
        self.ensure_not_pool(owner)?;
        commitment.to_field()?;
        self.tree.ensure_capacity()?;
        self.ensure_unclaimed(&commitment)?;

        let requested = self.ledger.encrypt_constant(self.params.denomination);
        let amount = self
            .ledger
            .oblivious_transfer(owner, self.params.pool_address, &requested)?;
        self.ledger.request_disclosure(&amount)?;
        let index = self.pending.create(owner, commitment, amount)?;
        info!("unwrap {} started by {}", index, owner);

        let event = PoolEvent::PendingUnwrap {
            owner,
            commitment,
            amount,
            index,
        };
        Ok(self.record(index, vec![event]))
    }

    /// Second half of an unwrap, given the oracle's decryption of the
    /// escrowed amount
    ///
    /// A non-zero amount burns the escrow and inserts the new commitment;
    /// zero means the owner's balance was short and only the record is
    /// dropped. Either way the record can never be finalized again.
    ///
    /// A non-zero unwrap needs a free leaf. If the tree filled up after
    /// `begin_unwrap`, this returns `StructureFull` and the record stays
    /// live with its escrow locked; the tree never shrinks, so it cannot be
    /// finalized later either.
    pub fn finalize_unwrap(
        &mut self,
        index: u64,
        clear_bytes: &[u8],
        disclosure_proof: &DisclosureProof,
    ) -> Result<Applied<UnwrapOutcome>, PoolError> {
        let record = *self.pending.live(index)?;

        if !self
            .disclosure
            .verify(&record.amount, clear_bytes, disclosure_proof)
        {
            warn!("unwrap {}: disclosure proof rejected", index);
            return Err(PoolError::InvalidDisclosureProof(index));
        }
        let clear_amount = decode_clear_amount(clear_bytes).map_err(|e| {
            warn!("unwrap {}: {}", index, e);
            PoolError::InvalidDisclosureProof(index)
        })?;

        if clear_amount == 0 {
            self.pending.finalize(index)?;
            info!("unwrap {} failed: nothing was escrowed", index);
            let event = PoolEvent::UnwrapFailed {
                index,
                owner: record.owner,
                commitment: record.commitment,
            };
            return Ok(self.record(UnwrapOutcome::Failed, vec![event]));
        }

        let leaf = record.commitment.to_field()?;
        self.tree.ensure_capacity()?;
        let pool = self.params.pool_address;
        if self.ledger.balance_of(&pool).is_none() {
            return Err(PoolError::ZeroBalance(pool));
        }

        // The escrow covers every live record, so this burns `record.amount`
        self.ledger.burn(pool, &record.amount)?;
        self.pending.finalize(index)?;
        self.commitments.insert(record.commitment)?;
        let leaf_index = self.tree.insert(leaf)?;
        info!(
            "unwrap {} finalized: {} at leaf {}",
            index, record.commitment, leaf_index
        );

        let event = PoolEvent::UnwrapFinalized {
            index,
            owner: record.owner,
            commitment: record.commitment,
            leaf_index,
        };
        Ok(self.record(UnwrapOutcome::Credited { leaf_index }, vec![event]))
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn is_spent(&self, nullifier_hash: &NullifierHash) -> bool {
        self.nullifiers.contains(nullifier_hash)
    }

    pub fn is_known_root(&self, root: &MerkleRoot) -> bool {
        self.tree.is_known_root(root)
    }

    pub fn is_committed(&self, commitment: &Commitment) -> bool {
        self.commitments.contains(commitment)
    }

    /// Live pending unwrap; `None` once finalized
    pub fn get_pending_unwrap(&self, index: u64) -> Option<PendingUnwrap> {
        self.pending.get(index).copied()
    }

    pub fn current_root(&self) -> MerkleRoot {
        self.tree.root()
    }

    pub fn next_leaf_index(&self) -> u64 {
        self.tree.next_index()
    }

    pub fn denomination(&self) -> u64 {
        self.params.denomination
    }

    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    pub fn ledger(&self) -> &ConfidentialLedger<B> {
        &self.ledger
    }

    /// Move up to `amount` between two confidential accounts
    ///
    /// Same oblivious semantics as the ledger transfer: the returned handle
    /// is `amount` or zero. Neither side may be the pool principal.
    pub fn confidential_transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<OpaqueAmount, PoolError> {
        self.ensure_not_pool(from)?;
        self.ensure_not_pool(to)?;
        if self.ledger.balance_of(&from).is_none()
            && self.ledger.policy() == TransferFaultPolicy::Reject
        {
            return Err(PoolError::ZeroBalance(from));
        }

        let requested = self.ledger.encrypt_constant(amount);
        Ok(self.ledger.oblivious_transfer(from, to, &requested)?)
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    /// Every event produced so far, in order
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Preconditions shared by wrap and withdraw
    fn check_claim(&self, proof: &Proof, claim: &Claim) -> Result<(), PoolError> {
        if claim.fee > self.params.denomination {
            return Err(PoolError::FeeExceedsDenomination {
                fee: claim.fee,
                denomination: self.params.denomination,
            });
        }
        if self.nullifiers.contains(&claim.nullifier_hash) {
            return Err(PoolError::AlreadySpent(claim.nullifier_hash));
        }
        if !self.tree.is_known_root(&claim.root) {
            return Err(PoolError::UnknownRoot(claim.root));
        }
        let signals = claim.public_signals()?;
        if !self.verifier.verify(proof, &signals) {
            debug!("claim proof rejected for nullifier {}", claim.nullifier_hash);
            return Err(PoolError::InvalidProof);
        }
        Ok(())
    }

    /// A commitment may enter the tree only once, and not while a pending
    /// unwrap holds it
    fn ensure_unclaimed(&self, commitment: &Commitment) -> Result<(), PoolError> {
        if self.commitments.contains(commitment) || self.pending.is_reserved(commitment) {
            return Err(PoolError::AlreadyPresent(commitment.to_string()));
        }
        Ok(())
    }

    fn ensure_not_pool(&self, account: Address) -> Result<(), PoolError> {
        if account == self.params.pool_address {
            return Err(PoolError::ReservedAccount(account));
        }
        Ok(())
    }

    fn record<T>(&mut self, output: T, events: Vec<PoolEvent>) -> Applied<T> {
        self.events.extend(events.iter().cloned());
        Applied::new(output, events)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
