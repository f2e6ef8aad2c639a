mod common;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError, Variable};
use ark_serialize::CanonicalSerialize;
use ark_snark::SNARK;
use ark_std::rand::{SeedableRng, rngs::StdRng};

use cipherpool_config::CipherpoolConfig;
use cipherpool_confidential::PlaintextBackend;
use cipherpool_core::{
    Claim, Groth16Verifier, InMemoryCustody, PUBLIC_SIGNALS, PoolError, PoolParams, Proof,
    ProofVerifier, PublicSignals, ShieldedPoolEngine,
};
use cipherpool_privacy::{Address, MerkleRoot};

use common::*;

/// Exposes six values as public inputs, each bound to a private copy
#[derive(Clone)]
struct SignalCircuit {
    values: [Option<Fr>; PUBLIC_SIGNALS],
}

impl ConstraintSynthesizer<Fr> for SignalCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        for value in self.values {
            let input = cs.new_input_variable(|| value.ok_or(SynthesisError::AssignmentMissing))?;
            let witness =
                cs.new_witness_variable(|| value.ok_or(SynthesisError::AssignmentMissing))?;
            cs.enforce_constraint(lc!() + input, lc!() + Variable::One, lc!() + witness)?;
        }
        Ok(())
    }
}

fn setup() -> (ProvingKey<Bn254>, VerifyingKey<Bn254>) {
    let mut rng = StdRng::seed_from_u64(7);
    let circuit = SignalCircuit {
        values: [None; PUBLIC_SIGNALS],
    };
    Groth16::<Bn254>::circuit_specific_setup(circuit, &mut rng).unwrap()
}

fn prove(pk: &ProvingKey<Bn254>, signals: &PublicSignals) -> Proof {
    let mut rng = StdRng::seed_from_u64(11);
    let circuit = SignalCircuit {
        values: (*signals.as_fields()).map(Some),
    };
    let proof = Groth16::<Bn254>::prove(pk, circuit, &mut rng).unwrap();
    Proof::from_groth16(&proof).unwrap()
}

fn vk_bytes(vk: &VerifyingKey<Bn254>) -> Vec<u8> {
    let mut bytes = Vec::new();
    vk.serialize_compressed(&mut bytes).unwrap();
    bytes
}

fn sample_claim(root: MerkleRoot) -> Claim {
    Claim {
        root,
        recipient: Address::from_low_u64(0xabc),
        nullifier_hash: note(3).nullifier_hash(),
        relayer: Address::from_low_u64(0xdef),
        fee: 10,
        refund: 0,
    }
}

#[test]
fn permuted_signals_fail_verification() {
    let (pk, vk) = setup();
    let verifier = Groth16Verifier::from_bytes(&vk_bytes(&vk)).unwrap();

    let claim = sample_claim(MerkleRoot(note(1).commitment().0));
    let signals = claim.public_signals().unwrap();
    let proof = prove(&pk, &signals);
    assert!(verifier.verify(&proof, &signals));

    // recipient and relayer swapped
    let swapped = PublicSignals::new(
        &claim.root,
        &claim.relayer,
        &claim.nullifier_hash,
        &claim.recipient,
        claim.fee,
        claim.refund,
    )
    .unwrap();
    assert!(!verifier.verify(&proof, &swapped));

    // fee changed
    let mut other = claim;
    other.fee = 11;
    assert!(!verifier.verify(&proof, &other.public_signals().unwrap()));
}

#[test]
fn malformed_proof_is_rejected_not_panicking() {
    let (_, vk) = setup();
    let verifier = Groth16Verifier::from_bytes(&vk_bytes(&vk)).unwrap();
    let signals = sample_claim(MerkleRoot(note(1).commitment().0))
        .public_signals()
        .unwrap();

    assert!(!verifier.verify(&empty_proof(), &signals));
    let truncated = Proof {
        a: vec![1u8; 5],
        b: vec![2u8; 64],
        c: vec![3u8; 32],
    };
    assert!(!verifier.verify(&truncated, &signals));
}

#[test]
fn verifying_key_must_match_claim_arity() {
    let mut rng = StdRng::seed_from_u64(3);
    let (_, vk) = Groth16::<Bn254>::circuit_specific_setup(
        SignalCircuit {
            values: [None; PUBLIC_SIGNALS],
        },
        &mut rng,
    )
    .unwrap();
    let mut short = vk.clone();
    short.gamma_abc_g1.pop();
    assert!(Groth16Verifier::new(&short).is_err());
    assert!(Groth16Verifier::from_bytes(&[0u8; 16]).is_err());
}

#[test]
fn engine_withdraw_with_real_proof() {
    let (pk, vk) = setup();
    let verifier = Groth16Verifier::new(&vk).unwrap();
    let mut engine = engine_with(PoolParams::new(10, ROOT_HISTORY, DENOMINATION, POOL), verifier);

    let note = note(1);
    fund_and_deposit(&mut engine, Address::from_low_u64(1), &note);
    let claim = claim_for(&engine, &note, Address::from_low_u64(2));
    let proof = prove(&pk, &claim.public_signals().unwrap());

    // a proof for other signals is refused
    let mut other = claim;
    other.refund = 1;
    assert_eq!(
        engine.withdraw(&proof, &other),
        Err(PoolError::InvalidProof)
    );

    engine.withdraw(&proof, &claim).unwrap();
    assert!(engine.is_spent(&note.nullifier_hash()));
}

#[test]
fn engine_from_config_loads_keys() {
    let (_, vk) = setup();
    let dir = tempfile::tempdir().unwrap();
    let vk_path = dir.path().join("claim_vk.bin");
    std::fs::write(&vk_path, vk_bytes(&vk)).unwrap();

    let backend = PlaintextBackend::new(ORACLE_SEED);
    let config = CipherpoolConfig::from_toml(&format!(
        r#"
        [pool]
        levels = 12
        denomination = 55

        [verifier]
        verifying_key_path = "{}"

        [disclosure]
        oracle_public_key = "{}"
        "#,
        vk_path.display(),
        hex::encode(backend.oracle_public_key())
    ))
    .unwrap();

    let engine = ShieldedPoolEngine::from_config(&config, backend, InMemoryCustody::new()).unwrap();
    assert_eq!(engine.denomination(), 55);
    assert_eq!(engine.params().levels, 12);

    let mut missing = config.clone();
    missing.verifier.verifying_key_path = None;
    let backend = PlaintextBackend::new(ORACLE_SEED);
    assert!(ShieldedPoolEngine::from_config(&missing, backend, InMemoryCustody::new()).is_err());
}
