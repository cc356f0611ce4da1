use crate::*;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Server-resident running sum of encrypted votes.
///
/// The service starts uninitialized. Registering a public key starts a new
/// epoch with the running sum set to an encryption of zero; registering
/// another key discards the current sum and starts over. Every read-modify-write
/// of the sum happens under one lock, so concurrent submissions are never lost
/// and no caller ever sees a sum paired with a stale key.
///
/// Votes are not deduplicated here. One vote per voter is enforced by the
/// authentication layer in front of this service.
pub struct AggregationService {
    min_key_bits: usize,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    epochs: u64,
    current: Option<Epoch>,
}

struct Epoch {
    number: u64,
    public_key: PublicKey,
    running_sum: EncryptedValue,
    accepted: u64,
}

/// Acknowledgement of an accepted vote
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReceipt {
    pub epoch: u64,
    pub accepted_votes: u64,
}

/// Snapshot of the service state
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationStatus {
    pub key_set: bool,
    pub epoch: u64,
    pub accepted_votes: u64,
}

impl Default for AggregationService {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationService {
    pub fn new() -> Self {
        Self::with_min_key_bits(MIN_MODULUS_BITS)
    }

    /// Reject registered keys smaller than `min_key_bits`.
    pub fn with_min_key_bits(min_key_bits: usize) -> Self {
        AggregationService {
            min_key_bits: min_key_bits.max(MIN_MODULUS_BITS),
            state: Mutex::new(State::default()),
        }
    }

    // Writers assign the whole epoch at once, so a poisoned lock still guards a
    // consistent state.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse and install a public key from its wire form.
    pub fn register_public_key(&self, wire: &PublicKeyWire) -> Result<u64> {
        let public_key = PublicKey::import_with_min_bits(wire, self.min_key_bits)?;
        self.set_public_key(public_key)
    }

    /// Install a public key and reset the running sum to an encryption of
    /// zero. Any sum accumulated under a previous key is discarded.
    ///
    /// Returns the new epoch number.
    pub fn set_public_key(&self, public_key: PublicKey) -> Result<u64> {
        if public_key.bits() < self.min_key_bits {
            return Err(Error::InvalidKeyData(format!(
                "modulus is {} bits, at least {} required",
                public_key.bits(),
                self.min_key_bits
            )));
        }

        let zero = public_key.encrypt(0)?;

        let mut state = self.lock();
        state.epochs += 1;
        let number = state.epochs;

        let previous = state.current.replace(Epoch {
            number,
            public_key,
            running_sum: zero,
            accepted: 0,
        });

        match previous {
            Some(previous) => warn!(
                "public key replaced: epoch {} ended, discarding {} accepted vote(s); epoch {} started",
                previous.number, previous.accepted, number
            ),
            None => info!("public key registered: epoch {} started", number),
        }

        Ok(number)
    }

    /// Fold a vote in wire form into the running sum.
    ///
    /// The ciphertext is reconstructed under the current key. On any error the
    /// running sum is left untouched.
    pub fn submit_vote(&self, voter_id: &str, ciphertext: &EncryptedWire) -> Result<VoteReceipt> {
        let mut state = self.lock();
        let epoch = state.current.as_mut().ok_or(Error::KeyNotSet)?;

        let vote = EncryptedValue::from_wire(ciphertext, &epoch.public_key)?;
        Self::accumulate(epoch, voter_id, &vote)
    }

    /// Fold an already reconstructed vote into the running sum. Fails with
    /// `MismatchedKey` if it was encrypted under a key other than the current one.
    pub fn submit_encrypted(&self, vote: &Vote) -> Result<VoteReceipt> {
        let mut state = self.lock();
        let epoch = state.current.as_mut().ok_or(Error::KeyNotSet)?;

        Self::accumulate(epoch, &vote.voter_id, &vote.encrypted)
    }

    fn accumulate(epoch: &mut Epoch, voter_id: &str, vote: &EncryptedValue) -> Result<VoteReceipt> {
        let running_sum = epoch.running_sum.add(vote)?;
        epoch.running_sum = running_sum;
        epoch.accepted += 1;

        info!(
            "vote from '{}' added to running sum (epoch {}, {} accepted)",
            voter_id, epoch.number, epoch.accepted
        );

        Ok(VoteReceipt {
            epoch: epoch.number,
            accepted_votes: epoch.accepted,
        })
    }

    /// The current running sum, an encryption of zero if no vote has arrived yet.
    pub fn get_tally(&self) -> Result<EncryptedValue> {
        let state = self.lock();
        let epoch = state.current.as_ref().ok_or(Error::KeyNotSet)?;
        Ok(epoch.running_sum.clone())
    }

    /// The key of the current epoch
    pub fn public_key(&self) -> Result<PublicKey> {
        let state = self.lock();
        let epoch = state.current.as_ref().ok_or(Error::KeyNotSet)?;
        Ok(epoch.public_key.clone())
    }

    pub fn status(&self) -> AggregationStatus {
        let state = self.lock();
        match &state.current {
            Some(epoch) => AggregationStatus {
                key_set: true,
                epoch: epoch.number,
                accepted_votes: epoch.accepted,
            },
            None => AggregationStatus {
                key_set: false,
                epoch: state.epochs,
                accepted_votes: 0,
            },
        }
    }
}
