mod common;

use std::sync::{Arc, Mutex};

use cipherpool_core::{AssetCustody, PoolError, PoolEvent, PoolParams, Proof, PublicSignals};
use cipherpool_privacy::{Address, MerkleRoot};

use common::*;

#[test]
fn deposit_withdraw_and_replay_at_depth_31() {
    let mut engine = engine(31);
    let depositor = Address::from_low_u64(1);
    let recipient = Address::from_low_u64(2);
    let note = note(1);

    let leaf_index = fund_and_deposit(&mut engine, depositor, &note);
    assert_eq!(leaf_index, 0);
    let root = engine.current_root();
    assert!(engine.is_known_root(&root));

    let claim = claim_for(&engine, &note, recipient);
    let applied = engine.withdraw(&empty_proof(), &claim).unwrap();

    assert!(engine.is_spent(&note.nullifier_hash()));
    assert_eq!(engine.custody().balance_of(&recipient), DENOMINATION);
    assert_eq!(engine.custody().available(), 0);
    assert!(matches!(
        applied.events.as_slice(),
        [PoolEvent::Withdrawn { fee: 0, refund: 0, .. }]
    ));

    assert_eq!(
        engine.withdraw(&empty_proof(), &claim),
        Err(PoolError::AlreadySpent(note.nullifier_hash()))
    );
}

#[test]
fn leaf_indices_are_sequential_and_roots_known() {
    let mut engine = engine(8);
    let depositor = Address::from_low_u64(1);

    for (expected, note) in notes(7, 6).iter().enumerate() {
        let index = fund_and_deposit(&mut engine, depositor, note);
        assert_eq!(index, expected as u64);
        assert!(engine.is_known_root(&engine.current_root()));
    }
    assert_eq!(engine.next_leaf_index(), 6);
    assert_eq!(engine.events().len(), 6);
}

#[test]
fn duplicate_commitment_rejected() {
    let mut engine = engine(8);
    let depositor = Address::from_low_u64(1);
    let note = note(3);

    fund_and_deposit(&mut engine, depositor, &note);
    engine.custody_mut().fund(depositor, DENOMINATION);

    assert!(matches!(
        engine.deposit(depositor, note.commitment()),
        Err(PoolError::AlreadyPresent(_))
    ));
    // the second deposit never pulled funds
    assert_eq!(engine.custody().balance_of(&depositor), DENOMINATION);
    assert_eq!(engine.next_leaf_index(), 1);
}

#[test]
fn nullifier_is_shared_between_wrap_and_withdraw() {
    let mut engine = engine(8);
    let depositor = Address::from_low_u64(1);
    let recipient = Address::from_low_u64(2);
    let [first, second] = [note(10), note(11)];
    fund_and_deposit(&mut engine, depositor, &first);
    fund_and_deposit(&mut engine, depositor, &second);

    // wrapped first, withdraw attempt fails
    let claim = claim_for(&engine, &first, recipient);
    engine.wrap(&empty_proof(), &claim).unwrap();
    assert_eq!(
        engine.withdraw(&empty_proof(), &claim),
        Err(PoolError::AlreadySpent(first.nullifier_hash()))
    );

    // withdrawn first, wrap attempt fails
    let claim = claim_for(&engine, &second, recipient);
    engine.withdraw(&empty_proof(), &claim).unwrap();
    assert_eq!(
        engine.wrap(&empty_proof(), &claim),
        Err(PoolError::AlreadySpent(second.nullifier_hash()))
    );

    assert_eq!(balance(&engine, &recipient), DENOMINATION);
    assert_eq!(engine.custody().balance_of(&recipient), DENOMINATION);
}

#[test]
fn unknown_root_rejected_without_effect() {
    let mut engine = engine(8);
    let depositor = Address::from_low_u64(1);
    let note = note(4);
    fund_and_deposit(&mut engine, depositor, &note);

    let mut claim = claim_for(&engine, &note, Address::from_low_u64(2));
    claim.root = MerkleRoot([0x11; 32]);

    assert_eq!(
        engine.withdraw(&empty_proof(), &claim),
        Err(PoolError::UnknownRoot(claim.root))
    );
    claim.root = MerkleRoot([0u8; 32]);
    assert!(matches!(
        engine.wrap(&empty_proof(), &claim),
        Err(PoolError::UnknownRoot(_))
    ));
    assert!(!engine.is_spent(&note.nullifier_hash()));
    assert_eq!(engine.custody().available(), DENOMINATION);
}

#[test]
fn rejected_proof_leaves_pool_untouched() {
    let reject_all = |_: &Proof, _: &PublicSignals| false;
    let mut engine = engine_with(PoolParams::new(8, ROOT_HISTORY, DENOMINATION, POOL), reject_all);
    let depositor = Address::from_low_u64(1);
    let recipient = Address::from_low_u64(2);
    let note = note(5);
    fund_and_deposit(&mut engine, depositor, &note);

    let claim = claim_for(&engine, &note, recipient);
    assert_eq!(
        engine.withdraw(&empty_proof(), &claim),
        Err(PoolError::InvalidProof)
    );
    assert_eq!(
        engine.wrap(&empty_proof(), &claim),
        Err(PoolError::InvalidProof)
    );

    assert!(!engine.is_spent(&note.nullifier_hash()));
    assert!(engine.ledger().balance_of(&recipient).is_none());
    assert_eq!(engine.custody().available(), DENOMINATION);
}

#[test]
fn verifier_sees_signals_in_circuit_order() {
    let seen: Arc<Mutex<Vec<PublicSignals>>> = Arc::default();
    let recorder = {
        let seen = Arc::clone(&seen);
        move |_: &Proof, signals: &PublicSignals| {
            seen.lock().unwrap().push(*signals);
            true
        }
    };
    let mut engine = engine_with(PoolParams::new(8, ROOT_HISTORY, DENOMINATION, POOL), recorder);
    let depositor = Address::from_low_u64(1);
    let note = note(6);
    fund_and_deposit(&mut engine, depositor, &note);

    let mut claim = claim_for(&engine, &note, Address::from_low_u64(2));
    claim.relayer = Address::from_low_u64(3);
    claim.fee = 10;
    claim.refund = 20;
    engine.withdraw(&empty_proof(), &claim).unwrap();

    let expected = PublicSignals::new(
        &claim.root,
        &claim.recipient,
        &claim.nullifier_hash,
        &claim.relayer,
        10,
        20,
    )
    .unwrap();
    assert_eq!(seen.lock().unwrap().as_slice(), &[expected]);

    // the same values in another order are a different statement
    let swapped = PublicSignals::new(
        &claim.root,
        &claim.relayer,
        &claim.nullifier_hash,
        &claim.recipient,
        10,
        20,
    )
    .unwrap();
    assert_ne!(expected, swapped);
}

#[test]
fn wrap_credits_denomination_and_emits_event() {
    let mut engine = engine(8);
    let depositor = Address::from_low_u64(1);
    let recipient = Address::from_low_u64(2);
    let note = note(8);
    fund_and_deposit(&mut engine, depositor, &note);

    let mut claim = claim_for(&engine, &note, recipient);
    claim.relayer = Address::from_low_u64(3);
    claim.fee = 5;
    let applied = engine.wrap(&empty_proof(), &claim).unwrap();

    assert_eq!(reveal(&engine, &applied.output), DENOMINATION);
    assert_eq!(balance(&engine, &recipient), DENOMINATION);
    assert_eq!(
        applied.events,
        vec![PoolEvent::Wrapped {
            recipient,
            nullifier_hash: note.nullifier_hash(),
            relayer: claim.relayer,
            fee: 5,
        }]
    );
    // the underlying asset stays locked
    assert_eq!(engine.custody().available(), DENOMINATION);
}
