//! Cipherpool Core
//!
//! The shielded pool state machine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     ShieldedPoolEngine                          │
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │  │  Membership  │  │ Commitments  │  │      Nullifiers       │  │
//! │  │   History    │  │  (registry)  │  │ (shared: wrap+withdr) │  │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │  │ Confidential │  │   Pending    │  │    ProofVerifier /    │  │
//! │  │    Ledger    │  │   Unwraps    │  │  DisclosureVerifier   │  │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘  │
//! │                          │                                      │
//! │                          ▼                                      │
//! │                    AssetCustody                                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ mpsc + oneshot
//!                       PoolService
//! ```

pub mod custody;
pub mod engine;
pub mod error;
pub mod events;
pub mod pending;
pub mod proof;
pub mod service;

pub use custody::{AssetCustody, CustodyError, InMemoryCustody};
pub use engine::{Claim, PoolParams, ShieldedPoolEngine, UnwrapOutcome};
pub use error::PoolError;
pub use events::{Applied, PoolEvent};
pub use pending::{PendingUnwrap, PendingUnwrapRegistry};
pub use proof::{Groth16Verifier, PUBLIC_SIGNALS, Proof, ProofVerifier, PublicSignals};
pub use service::PoolService;
