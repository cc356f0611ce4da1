use crate::*;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Bytes of entropy in a commitment salt, before hex encoding.
pub const SALT_BYTES: usize = 16;

/// A hash commitment to a single yes/no vote.
///
/// `commitment = hex(sha256(str(plaintext) ++ salt))`, where `salt` is the
/// hex encoding of fresh random bytes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    pub voter_id: String,
    pub commitment: String,
    pub salt: String,
}

impl Commitment {
    /// Commit to a vote with a fresh salt.
    pub fn commit(voter_id: &str, vote: &SecretVote) -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self::commit_with_rng(&mut csprng, voter_id, vote)
    }

    pub fn commit_with_rng<R: RngCore + CryptoRng + ?Sized>(
        rng: &mut R,
        voter_id: &str,
        vote: &SecretVote,
    ) -> Self {
        let mut salt = Zeroizing::new([0u8; SALT_BYTES]);
        rng.fill_bytes(&mut salt[..]);
        let salt = hex::encode(&salt[..]);

        let digest = commitment_digest(vote.plaintext(), &salt);

        Commitment {
            voter_id: voter_id.to_owned(),
            commitment: hex::encode(digest),
            salt,
        }
    }

    /// True only if `(revealed, revealed_salt)` is exactly the pair this
    /// commitment was made from.
    pub fn verify(&self, revealed: BallotChoice, revealed_salt: &str) -> bool {
        let stored = match hex::decode(self.commitment.trim()) {
            Ok(stored) => stored,
            Err(_) => return false,
        };
        let recomputed = commitment_digest(revealed.plaintext(), revealed_salt);

        recomputed[..].ct_eq(&stored[..]).into()
    }

    /// Like `verify`, but a failed reveal is a `CommitmentMismatch` error.
    pub fn check(&self, vote_id: &str, revealed: BallotChoice, revealed_salt: &str) -> Result<()> {
        if self.verify(revealed, revealed_salt) {
            Ok(())
        } else {
            Err(Error::CommitmentMismatch(vote_id.to_owned()))
        }
    }
}

/// sha256 over the decimal plaintext followed by the salt's hex string
pub fn commitment_digest(plaintext: u8, salt_hex: &str) -> [u8; 32] {
    let preimage = Zeroizing::new(format!("{}{}", plaintext, salt_hex));
    let digest = Sha256::digest(preimage.as_bytes());

    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Append-only store of commitments, verified later against a voter's reveal.
///
/// Records are keyed by the voter id they were submitted with, or by an
/// explicit vote identifier. The first record stored under a key is the
/// binding one; later submissions for that key are kept but never replace it.
/// Nothing here checks that a commitment matches a vote actually cast.
#[derive(Default)]
pub struct CommitmentService {
    log: RwLock<CommitmentLog>,
}

#[derive(Default)]
struct CommitmentLog {
    entries: Vec<Commitment>,
    index: HashMap<String, usize>,
}

impl CommitmentService {
    pub fn new() -> Self {
        Self::default()
    }

    // The log is append-only, a poisoned lock cannot expose a half-written entry
    fn read(&self) -> RwLockReadGuard<'_, CommitmentLog> {
        self.log.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CommitmentLog> {
        self.log.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a commitment under its voter id.
    pub fn submit_commitment(&self, commitment: Commitment) -> usize {
        let key = commitment.voter_id.clone();
        self.submit_commitment_as(&key, commitment)
    }

    /// Store a commitment under an explicit vote identifier. Returns the
    /// number of commitments held.
    pub fn submit_commitment_as(&self, vote_id: &str, commitment: Commitment) -> usize {
        let mut log = self.write();
        let position = log.entries.len();
        let voter_id = commitment.voter_id.clone();
        log.entries.push(commitment);

        if log.index.contains_key(vote_id) {
            warn!(
                "duplicate commitment for '{}' from '{}' recorded; the first one stays binding",
                vote_id, voter_id
            );
        } else {
            log.index.insert(vote_id.to_owned(), position);
            info!("stored commitment for '{}' from '{}'", vote_id, voter_id);
        }

        log.entries.len()
    }

    /// Verify a reveal against the binding commitment for `vote_id`.
    pub fn verify(&self, vote_id: &str, revealed: BallotChoice, revealed_salt: &str) -> Result<bool> {
        let log = self.read();
        let position = log
            .index
            .get(vote_id)
            .ok_or_else(|| Error::CommitmentNotFound(vote_id.to_owned()))?;

        Ok(log.entries[*position].verify(revealed, revealed_salt))
    }

    /// The binding commitment for `vote_id`
    pub fn get(&self, vote_id: &str) -> Option<Commitment> {
        let log = self.read();
        log.index
            .get(vote_id)
            .map(|position| log.entries[*position].clone())
    }

    /// Number of commitments held, duplicates included
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
