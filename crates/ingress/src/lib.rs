//! `Ingress` — end-to-end admission orchestration for `POST /votes`
//! (`spec.md` §4.9). A single function walks the ten-step check order,
//! short-circuiting on the first typed failure.

use sequencer_ballot_hash::ballot_inputs_hash;
use sequencer_ballot_queue::{BallotQueue, PushError};
use sequencer_census::verify_census;
use sequencer_proof_adapter::VerifyingKeyCache;
use sequencer_process_store::ProcessStore;
use sequencer_sigverify::{framed_digest, verify, RawSignature};
use sequencer_types::{Ballot, CoreError, CoreResult, QueuedBallot};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Ingress<S: ProcessStore> {
    process_store: Arc<S>,
    ballot_queue: Arc<BallotQueue>,
    vk_cache: VerifyingKeyCache,
    raw_verification_key: Vec<u8>,
}

impl<S: ProcessStore> Ingress<S> {
    pub fn new(
        process_store: Arc<S>,
        ballot_queue: Arc<BallotQueue>,
        raw_verification_key: Vec<u8>,
    ) -> Self {
        Self {
            process_store,
            ballot_queue,
            vk_cache: VerifyingKeyCache::new(),
            raw_verification_key,
        }
    }

    /// Admit `ballot`, stamping it with `ingress_timestamp` for FIFO
    /// ordering in `BallotQueue`. `now` is a caller-supplied logical clock
    /// so the pipeline stays executor-agnostic (`spec.md` §5) — production
    /// callers pass wall-clock millis, tests pass a monotonic counter.
    #[tracing::instrument(skip(self, ballot), fields(vote_id = %ballot.vote_id))]
    pub fn submit(&self, ballot: Ballot, now: u64) -> CoreResult<()> {
        // 1. Structural checks that do not require process metadata.
        if ballot.vote_id.0.is_empty() {
            return Err(CoreError::malformed_body("vote_id must not be empty"));
        }
        if ballot.ciphertexts.is_empty() {
            return Err(CoreError::malformed_body("ciphertexts must not be empty"));
        }

        // 2. Resolve the process.
        let process = self
            .process_store
            .get(&ballot.process_id)
            .map_err(CoreError::from)?;

        // 1 (continued). Ciphertext count must match the process's ballot mode.
        if ballot.ciphertexts.len() != process.ballot_mode.num_fields as usize {
            return Err(CoreError::malformed_body(format!(
                "expected {} ciphertexts, got {}",
                process.ballot_mode.num_fields,
                ballot.ciphertexts.len()
            )));
        }

        // 3. Origin downgrade protection: `verify_census` below rejects any
        // proof whose tagged origin does not match `process.census.origin`.

        // 4. Acceptance gate.
        if !process.accepting_votes || !self.process_store.is_accepting_votes(&process.id) {
            return Err(CoreError::not_accepting_votes());
        }

        // 5. Overwrite classification and voter-limit check.
        let is_overwrite = self.process_store.has_address_voted(
            &process.id,
            &process.current_state_root,
            &ballot.voter,
        );
        if !is_overwrite && self.process_store.max_voters_reached(&process.id) {
            return Err(CoreError::max_voters_reached());
        }

        // 6. Census verification — authoritative weight, never the client's.
        let authoritative_weight = verify_census(&process, &ballot.census_proof).map_err(|e| {
            warn!(error = %e, "census verification failed");
            CoreError::from(e)
        })?;

        // 7. Recompute and compare the ballot-inputs hash.
        let recomputed = ballot_inputs_hash(
            &process.id,
            &process.ballot_mode,
            &process.encryption_public_key,
            &ballot.voter,
            &ballot.vote_id,
            &ballot.ciphertexts,
            authoritative_weight,
        )
        .map_err(|e| CoreError::internal(format!("ballot hash computation failed: {e}")))?;

        if recomputed != ballot.ballot_inputs_hash {
            return Err(CoreError::hash_mismatch());
        }

        // 8. ZK proof verification.
        let vk = self
            .vk_cache
            .get_or_init(&self.raw_verification_key)
            .map_err(|e| CoreError::internal(format!("verification key init failed: {e}")))?;
        let (proof_ok, transformed) = sequencer_proof_adapter::verify(
            vk,
            &ballot.proof,
            &[ballot.ballot_inputs_hash],
        )
        .map_err(|e| CoreError::internal(format!("proof verification error: {e}")))?;
        if !proof_ok {
            return Err(CoreError::bad_proof());
        }

        // 9. Voter signature recovery.
        let digest = framed_digest(&process.chain_id, &ballot.vote_id.0);
        let raw_sig = RawSignature::from_bytes(&ballot.signature)
            .map_err(|_| CoreError::bad_signature())?;
        let (sig_ok, recovered_key) =
            verify(&digest, &raw_sig, &ballot.voter).map_err(|_| CoreError::bad_signature())?;
        if !sig_ok {
            return Err(CoreError::bad_signature());
        }

        // 10. Build the queue record and push it.
        let recovered_pubkey: [u8; 33] = recovered_key
            .to_encoded_point(true)
            .as_bytes()
            .try_into()
            .expect("compressed secp256k1 point is always 33 bytes");

        let queued = QueuedBallot {
            process_id: process.id,
            voter: ballot.voter,
            vote_id: ballot.vote_id,
            ciphertexts: ballot.ciphertexts,
            authoritative_weight,
            ballot_inputs_hash: ballot.ballot_inputs_hash,
            transformed_proof: transformed.canonical_proof_bytes,
            recovered_pubkey,
            ingress_timestamp: now,
            state: sequencer_types::BallotState::Pending,
            error_reason: None,
            verified_artifact: None,
        };

        self.ballot_queue.push(queued).map_err(|e| match e {
            PushError::AlreadyExists => CoreError::already_queued(),
            PushError::AddressBusy => CoreError::address_busy(),
        })?;

        info!("ballot admitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{Bn254, Fr};
    use ark_groth16::Groth16;
    use ark_relations::lc;
    use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError, Variable};
    use ark_serialize::CanonicalSerialize;
    use ark_snark::SNARK;
    use ark_std::rand::rngs::StdRng;
    use ark_std::rand::SeedableRng;
    use k256::ecdsa::SigningKey;
    use rand::rngs::OsRng;
    use sequencer_process_store::InMemoryProcessStore;
    use sequencer_sigverify::{address_from_verifying_key, sign};
    use sequencer_types::{
        BallotMode, CensusConfig, CensusOrigin, CensusProof, Ciphertext, Process, ProcessId,
        VoterAddress, VoteId,
    };

    /// Enforces `x == y` (via `x * 1 = y`) for an arbitrary field element,
    /// letting the circuit's single public input be set to whatever value
    /// a test needs without requiring a quadratic residue — unlike a
    /// `x*x=y` circuit, any value is satisfiable.
    #[derive(Clone)]
    struct IdentityCircuit {
        value: Option<Fr>,
    }

    impl ConstraintSynthesizer<Fr> for IdentityCircuit {
        fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
            let x = cs.new_witness_variable(|| self.value.ok_or(SynthesisError::AssignmentMissing))?;
            let y = cs.new_input_variable(|| self.value.ok_or(SynthesisError::AssignmentMissing))?;
            let one = lc!() + (Fr::from(1u64), Variable::One);
            cs.enforce_constraint(lc!() + x, one, lc!() + y)?;
            Ok(())
        }
    }

    struct Fixture {
        ingress: Ingress<InMemoryProcessStore>,
        store: Arc<InMemoryProcessStore>,
        process_id: ProcessId,
        signing_key: SigningKey,
        voter: VoterAddress,
        proving_key: ark_groth16::ProvingKey<Bn254>,
    }

    const BALLOT_MODE: BallotMode = BallotMode {
        num_fields: 1,
        min_value: 0,
        max_value: 1,
        cost_exponent: 2,
        unique_values: false,
        cost_from_weight: false,
        min_value_sum: 0,
        max_value_sum: 1,
    };
    const ENCRYPTION_KEY: [u8; 32] = [1u8; 32];

    fn build_fixture() -> Fixture {
        let mut rng = StdRng::seed_from_u64(42);
        let circuit = IdentityCircuit { value: None };
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, &mut rng).unwrap();
        let mut raw_vk = Vec::new();
        vk.serialize_compressed(&mut raw_vk).unwrap();

        let signing_key = SigningKey::random(&mut OsRng);
        let voter = address_from_verifying_key(&k256::ecdsa::VerifyingKey::from(&signing_key));
        let process_id = ProcessId([3u8; 32]);

        let store = Arc::new(InMemoryProcessStore::new());
        store.insert(Process {
            id: process_id,
            chain_id: "vocdoni-1".into(),
            encryption_public_key: ENCRYPTION_KEY,
            census: CensusConfig {
                origin: CensusOrigin::MerkleTree,
                root: [0u8; 32],
                uri: "ipfs://census".into(),
                max_voters: 10,
            },
            ballot_mode: BALLOT_MODE,
            current_state_root: [9u8; 32],
            vote_count: 0,
            accepting_votes: true,
        });

        let queue = Arc::new(BallotQueue::new());
        let ingress = Ingress::new(Arc::clone(&store), queue, raw_vk);

        Fixture {
            ingress,
            store,
            process_id,
            signing_key,
            voter,
            proving_key: pk,
        }
    }

    /// Publishes a single-leaf Merkle census (root == leaf, empty sibling
    /// path) attesting `fixture.voter` at `weight`, and returns a fully
    /// valid, correctly-proved, correctly-signed `Ballot` referencing it.
    fn valid_ballot(fixture: &Fixture, vote_id: Vec<u8>, weight: u64) -> Ballot {
        let weight_bytes = {
            let mut b = [0u8; 32];
            b[24..].copy_from_slice(&weight.to_be_bytes());
            b
        };
        let root = sequencer_census::leaf_hash(&fixture.voter.0, &weight_bytes).unwrap();

        fixture.store.insert(Process {
            id: fixture.process_id,
            chain_id: "vocdoni-1".into(),
            encryption_public_key: ENCRYPTION_KEY,
            census: CensusConfig {
                origin: CensusOrigin::MerkleTree,
                root,
                uri: "ipfs://census".into(),
                max_voters: 10,
            },
            ballot_mode: BALLOT_MODE,
            current_state_root: [9u8; 32],
            vote_count: 0,
            accepting_votes: true,
        });

        let ciphertexts = vec![Ciphertext {
            c1: [2u8; 32],
            c2: [3u8; 32],
        }];
        let vote_id = VoteId(vote_id);

        let hash = ballot_inputs_hash(
            &fixture.process_id,
            &BALLOT_MODE,
            &ENCRYPTION_KEY,
            &fixture.voter,
            &vote_id,
            &ciphertexts,
            weight,
        )
        .unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let circuit = IdentityCircuit {
            value: Some(hash.inner()),
        };
        let proof = Groth16::<Bn254>::prove(&fixture.proving_key, circuit, &mut rng).unwrap();
        let mut proof_bytes = Vec::new();
        proof.serialize_compressed(&mut proof_bytes).unwrap();

        let digest = framed_digest("vocdoni-1", &vote_id.0);
        let signature = sign(&digest, &fixture.signing_key).0;

        Ballot {
            process_id: fixture.process_id,
            voter: fixture.voter,
            vote_id,
            ciphertexts,
            ballot_inputs_hash: hash,
            proof: proof_bytes,
            signature,
            census_proof: CensusProof::MerkleTree {
                root,
                voter: fixture.voter,
                siblings: vec![],
                leaf_index: 0,
                value: weight_bytes,
                declared_weight: weight,
            },
        }
    }

    #[test]
    fn happy_path_merkle_admits_the_ballot() {
        let fixture = build_fixture();
        let ballot = valid_ballot(&fixture, b"deadbeef".to_vec(), 100);
        assert!(fixture.ingress.submit(ballot, 1).is_ok());
    }

    #[test]
    fn malformed_body_on_empty_ciphertexts() {
        let fixture = build_fixture();
        let mut ballot = valid_ballot(&fixture, b"v1".to_vec(), 100);
        ballot.ciphertexts.clear();
        let err = fixture.ingress.submit(ballot, 1).unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput(_, _)));
    }

    #[test]
    fn unknown_process_is_rejected() {
        let fixture = build_fixture();
        let mut ballot = valid_ballot(&fixture, b"v1".to_vec(), 100);
        ballot.process_id = ProcessId([0xFFu8; 32]);
        let err = fixture.ingress.submit(ballot, 1).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn tree_mismatch_fails_at_census_step() {
        let fixture = build_fixture();
        let mut ballot = valid_ballot(&fixture, b"v1".to_vec(), 100);
        if let CensusProof::MerkleTree { value, .. } = &mut ballot.census_proof {
            value[31] ^= 0xFF;
        }
        let err = fixture.ingress.submit(ballot, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::CryptographicFailure(sequencer_types::error::CryptoFailureKind::CensusMiss)
        ));
    }

    #[test]
    fn duplicate_vote_id_is_rejected_on_second_submit() {
        let fixture = build_fixture();
        let ballot1 = valid_ballot(&fixture, b"dup".to_vec(), 100);
        let ballot2 = valid_ballot(&fixture, b"dup".to_vec(), 100);

        assert!(fixture.ingress.submit(ballot1, 1).is_ok());
        let err = fixture.ingress.submit(ballot2, 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(sequencer_types::error::ConflictKind::AlreadyQueued)
        ));
    }

    #[test]
    fn not_accepting_votes_is_rejected() {
        let fixture = build_fixture();
        let ballot = valid_ballot(&fixture, b"v1".to_vec(), 100);
        fixture.store.set_accepting_votes(&fixture.process_id, false);
        let err = fixture.ingress.submit(ballot, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::RejectedByPolicy(sequencer_types::error::PolicyKind::NotAcceptingVotes)
        ));
    }
}
