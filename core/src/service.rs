//! Pool Service
//!
//! Runs a [`ShieldedPoolEngine`] on its own thread. Callers on any task
//! submit operations through a bounded channel and await a oneshot reply;
//! the channel order is the pool's total order, and each operation is
//! applied in full before the next one is received.

use log::info;
use tokio::sync::{mpsc, oneshot};

use cipherpool_confidential::{DisclosureProof, OpaqueAmount, SecureArithmetic};
use cipherpool_privacy::{Address, Commitment, MerkleRoot, NullifierHash};

use crate::custody::AssetCustody;
use crate::engine::{Claim, ShieldedPoolEngine, UnwrapOutcome};
use crate::error::PoolError;
use crate::events::Applied;
use crate::pending::PendingUnwrap;
use crate::proof::Proof;

/// Requests queued before submitters start waiting
const REQUEST_QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<Result<Applied<T>, PoolError>>;
type Inspector<B, C> = Box<dyn FnOnce(&ShieldedPoolEngine<B, C>) + Send>;

enum PoolRequest<B: SecureArithmetic, C: AssetCustody> {
    Deposit {
        depositor: Address,
        commitment: Commitment,
        reply: Reply<u64>,
    },
    Withdraw {
        proof: Proof,
        claim: Claim,
        reply: Reply<()>,
    },
    Wrap {
        proof: Proof,
        claim: Claim,
        reply: Reply<OpaqueAmount>,
    },
    BeginUnwrap {
        owner: Address,
        commitment: Commitment,
        reply: Reply<u64>,
    },
    FinalizeUnwrap {
        index: u64,
        clear_bytes: Vec<u8>,
        proof: DisclosureProof,
        reply: Reply<UnwrapOutcome>,
    },
    Inspect(Inspector<B, C>),
}

impl<B: SecureArithmetic, C: AssetCustody> PoolRequest<B, C> {
    fn apply(self, engine: &mut ShieldedPoolEngine<B, C>) {
        // A dropped receiver only means the caller stopped waiting
        match self {
            Self::Deposit {
                depositor,
                commitment,
                reply,
            } => {
                let _ = reply.send(engine.deposit(depositor, commitment));
            }
            Self::Withdraw {
                proof,
                claim,
                reply,
            } => {
                let _ = reply.send(engine.withdraw(&proof, &claim));
            }
            Self::Wrap {
                proof,
                claim,
                reply,
            } => {
                let _ = reply.send(engine.wrap(&proof, &claim));
            }
            Self::BeginUnwrap {
                owner,
                commitment,
                reply,
            } => {
                let _ = reply.send(engine.begin_unwrap(owner, commitment));
            }
            Self::FinalizeUnwrap {
                index,
                clear_bytes,
                proof,
                reply,
            } => {
                let _ = reply.send(engine.finalize_unwrap(index, &clear_bytes, &proof));
            }
            Self::Inspect(inspect) => inspect(engine),
        }
    }
}

/// Handle to a pool running on a dedicated thread
pub struct PoolService<B: SecureArithmetic, C: AssetCustody> {
    request_tx: mpsc::Sender<PoolRequest<B, C>>,
}

impl<B: SecureArithmetic, C: AssetCustody> Clone for PoolService<B, C> {
    fn clone(&self) -> Self {
        Self {
            request_tx: self.request_tx.clone(),
        }
    }
}

impl<B, C> PoolService<B, C>
where
    B: SecureArithmetic + Send + 'static,
    C: AssetCustody + Send + 'static,
{
    /// Move `engine` onto its own thread and start serving requests
    ///
    /// The thread exits once every handle has been dropped.
    pub fn start(engine: ShieldedPoolEngine<B, C>) -> Self {
        let (request_tx, mut request_rx) = mpsc::channel::<PoolRequest<B, C>>(REQUEST_QUEUE_DEPTH);

        std::thread::spawn(move || {
            let mut engine = engine;
            while let Some(request) = request_rx.blocking_recv() {
                request.apply(&mut engine);
            }
            info!("pool service stopped");
        });

        Self { request_tx }
    }

    pub async fn deposit(
        &self,
        depositor: Address,
        commitment: Commitment,
    ) -> Result<Applied<u64>, PoolError> {
        self.call(|reply| PoolRequest::Deposit {
            depositor,
            commitment,
            reply,
        })
        .await
    }

    pub async fn withdraw(&self, proof: Proof, claim: Claim) -> Result<Applied<()>, PoolError> {
        self.call(|reply| PoolRequest::Withdraw {
            proof,
            claim,
            reply,
        })
        .await
    }

    pub async fn wrap(&self, proof: Proof, claim: Claim) -> Result<Applied<OpaqueAmount>, PoolError> {
        self.call(|reply| PoolRequest::Wrap {
            proof,
            claim,
            reply,
        })
        .await
    }

    pub async fn begin_unwrap(
        &self,
        owner: Address,
        commitment: Commitment,
    ) -> Result<Applied<u64>, PoolError> {
        self.call(|reply| PoolRequest::BeginUnwrap {
            owner,
            commitment,
            reply,
        })
        .await
    }

    pub async fn finalize_unwrap(
        &self,
        index: u64,
        clear_bytes: Vec<u8>,
        proof: DisclosureProof,
    ) -> Result<Applied<UnwrapOutcome>, PoolError> {
        self.call(|reply| PoolRequest::FinalizeUnwrap {
            index,
            clear_bytes,
            proof,
            reply,
        })
        .await
    }

    /// Run a read-only closure against the engine, in order with every
    /// other request
    pub async fn inspect<R, F>(&self, f: F) -> Result<R, PoolError>
    where
        R: Send + 'static,
        F: FnOnce(&ShieldedPoolEngine<B, C>) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let inspect: Inspector<B, C> = Box::new(move |engine| {
            let _ = reply_tx.send(f(engine));
        });

        self.request_tx
            .send(PoolRequest::Inspect(inspect))
            .await
            .map_err(|_| PoolError::ServiceStopped)?;
        reply_rx.await.map_err(|_| PoolError::ServiceStopped)
    }

    pub async fn current_root(&self) -> Result<MerkleRoot, PoolError> {
        self.inspect(|engine| engine.current_root()).await
    }

    pub async fn is_spent(&self, nullifier_hash: NullifierHash) -> Result<bool, PoolError> {
        self.inspect(move |engine| engine.is_spent(&nullifier_hash))
            .await
    }

    pub async fn get_pending_unwrap(&self, index: u64) -> Result<Option<PendingUnwrap>, PoolError> {
        self.inspect(move |engine| engine.get_pending_unwrap(index))
            .await
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(Reply<T>) -> PoolRequest<B, C>,
    ) -> Result<Applied<T>, PoolError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.request_tx
            .send(request(reply_tx))
            .await
            .map_err(|_| PoolError::ServiceStopped)?;

        reply_rx.await.map_err(|_| PoolError::ServiceStopped)?
    }
}
