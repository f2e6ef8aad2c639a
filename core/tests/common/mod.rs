#![allow(dead_code)]

use ark_std::rand::{SeedableRng, rngs::StdRng};

use cipherpool_confidential::{
    DecryptionOracle, DisclosedAmount, OpaqueAmount, PlaintextBackend, TransferFaultPolicy,
};
use cipherpool_core::{
    Claim, InMemoryCustody, PoolParams, Proof, ProofVerifier, PublicSignals, ShieldedPoolEngine,
};
use cipherpool_privacy::{Address, Note};

pub const DENOMINATION: u64 = 1_000;
pub const ROOT_HISTORY: usize = 30;
pub const POOL: Address = Address([0xcc; 20]);
pub const ORACLE_SEED: [u8; 32] = [42u8; 32];

pub type TestEngine = ShieldedPoolEngine<PlaintextBackend, InMemoryCustody>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Verifier stub that accepts every proof
pub fn accept_all(_: &Proof, _: &PublicSignals) -> bool {
    true
}

pub fn engine_with(
    params: PoolParams,
    verifier: impl ProofVerifier + Send + 'static,
) -> TestEngine {
    init_logger();
    let backend = PlaintextBackend::new(ORACLE_SEED);
    let disclosure = backend.disclosure_verifier();
    ShieldedPoolEngine::new(params, backend, InMemoryCustody::new(), verifier, disclosure).unwrap()
}

pub fn engine(levels: usize) -> TestEngine {
    engine_with(
        PoolParams::new(levels, ROOT_HISTORY, DENOMINATION, POOL),
        accept_all,
    )
}

pub fn lenient_engine(levels: usize) -> TestEngine {
    engine_with(
        PoolParams::new(levels, ROOT_HISTORY, DENOMINATION, POOL)
            .with_fault_policy(TransferFaultPolicy::ZeroAmount),
        accept_all,
    )
}

pub fn empty_proof() -> Proof {
    Proof {
        a: vec![],
        b: vec![],
        c: vec![],
    }
}

pub fn notes(seed: u64, count: usize) -> Vec<Note> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| Note::random(&mut rng)).collect()
}

pub fn note(seed: u64) -> Note {
    notes(seed, 1)[0]
}

/// Fund `depositor` with one denomination and deposit `note`
pub fn fund_and_deposit(engine: &mut TestEngine, depositor: Address, note: &Note) -> u64 {
    engine.custody_mut().fund(depositor, DENOMINATION);
    engine.deposit(depositor, note.commitment()).unwrap().output
}

/// Claim of `note` against the current root
pub fn claim_for(engine: &TestEngine, note: &Note, recipient: Address) -> Claim {
    Claim {
        root: engine.current_root(),
        recipient,
        nullifier_hash: note.nullifier_hash(),
        relayer: Address::ZERO,
        fee: 0,
        refund: 0,
    }
}

/// Ask the oracle for the cleartext of a disclosed handle
pub fn disclose(engine: &TestEngine, handle: &OpaqueAmount) -> DisclosedAmount {
    engine.ledger().backend().public_decrypt(handle).unwrap()
}

/// Cleartext of a handle, read as the pool operator
pub fn reveal(engine: &TestEngine, handle: &OpaqueAmount) -> u64 {
    engine.ledger().backend().user_decrypt(handle, &POOL).unwrap()
}

pub fn balance(engine: &TestEngine, account: &Address) -> u64 {
    engine
        .ledger()
        .balance_of(account)
        .map(|handle| reveal(engine, &handle))
        .unwrap_or(0)
}
