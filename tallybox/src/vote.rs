use crate::*;
use rand::{CryptoRng, Rng};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use zeroize::Zeroizing;

/// A yes/no ballot choice. Yes encodes to 1, No to 0.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BallotChoice {
    No,
    Yes,
}

impl BallotChoice {
    pub fn plaintext(self) -> u8 {
        match self {
            BallotChoice::No => 0,
            BallotChoice::Yes => 1,
        }
    }

    pub fn from_plaintext(plaintext: u8) -> Option<Self> {
        match plaintext {
            0 => Some(BallotChoice::No),
            1 => Some(BallotChoice::Yes),
            _ => None,
        }
    }

    /// The opposite choice
    pub fn flip(self) -> Self {
        match self {
            BallotChoice::No => BallotChoice::Yes,
            BallotChoice::Yes => BallotChoice::No,
        }
    }
}

impl FromStr for BallotChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "1" => Ok(BallotChoice::Yes),
            "no" | "0" => Ok(BallotChoice::No),
            _ => Err(Error::InvalidBallotChoice(s.to_owned())),
        }
    }
}

impl fmt::Display for BallotChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BallotChoice::No => write!(f, "no"),
            BallotChoice::Yes => write!(f, "yes"),
        }
    }
}

/// A plaintext vote held only for as long as it takes to encrypt and commit.
/// The backing memory is wiped on drop.
pub struct SecretVote {
    plaintext: Zeroizing<u8>,
}

impl SecretVote {
    pub fn new(choice: BallotChoice) -> Self {
        SecretVote {
            plaintext: Zeroizing::new(choice.plaintext()),
        }
    }

    pub fn plaintext(&self) -> u8 {
        *self.plaintext
    }
}

impl fmt::Debug for SecretVote {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("SecretVote(..)")
    }
}

/// An encrypted vote together with the voter who cast it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub voter_id: String,
    pub encrypted: EncryptedValue,
}

/// Wire and on-disk form of a vote: `{voter_id, ciphertext, exponent}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    pub voter_id: String,
    pub ciphertext: String,
    pub exponent: i32,
}

impl VoteRecord {
    pub fn encrypted_wire(&self) -> EncryptedWire {
        EncryptedWire {
            ciphertext: self.ciphertext.clone(),
            exponent: self.exponent,
        }
    }
}

impl Vote {
    pub fn to_record(&self) -> VoteRecord {
        let EncryptedWire {
            ciphertext,
            exponent,
        } = self.encrypted.to_wire();

        VoteRecord {
            voter_id: self.voter_id.clone(),
            ciphertext,
            exponent,
        }
    }

    pub fn from_record(record: &VoteRecord, public_key: &PublicKey) -> Result<Self> {
        Ok(Vote {
            voter_id: record.voter_id.clone(),
            encrypted: EncryptedValue::from_wire(&record.encrypted_wire(), public_key)?,
        })
    }
}

/// Everything a voter produces when casting: the encrypted vote, the
/// commitment to the same plaintext, and the identifier tying the two together.
#[derive(Debug, Clone)]
pub struct CastBallot {
    pub vote_id: String,
    pub vote: Vote,
    pub commitment: Commitment,
}

/// Encrypt a choice and commit to it in one step.
pub fn cast_ballot(
    public_key: &PublicKey,
    voter_id: &str,
    choice: BallotChoice,
) -> Result<CastBallot> {
    let mut csprng = rand::rngs::OsRng;
    cast_ballot_with_rng(&mut csprng, public_key, voter_id, choice)
}

pub fn cast_ballot_with_rng<R: Rng + CryptoRng + ?Sized>(
    rng: &mut R,
    public_key: &PublicKey,
    voter_id: &str,
    choice: BallotChoice,
) -> Result<CastBallot> {
    let secret = SecretVote::new(choice);

    let encrypted = public_key.encrypt_with_rng(rng, i64::from(secret.plaintext()))?;
    let commitment = Commitment::commit_with_rng(rng, voter_id, &secret);

    Ok(CastBallot {
        vote_id: Uuid::new_v4().to_simple().to_string(),
        vote: Vote {
            voter_id: voter_id.to_owned(),
            encrypted,
        },
        commitment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::keypair;

    #[test]
    fn test_parse_choice() {
        assert_eq!("yes".parse::<BallotChoice>().unwrap(), BallotChoice::Yes);
        assert_eq!(" No ".parse::<BallotChoice>().unwrap(), BallotChoice::No);
        assert_eq!("1".parse::<BallotChoice>().unwrap(), BallotChoice::Yes);
        assert!(matches!(
            "maybe".parse::<BallotChoice>(),
            Err(Error::InvalidBallotChoice(_))
        ));
        assert_eq!(BallotChoice::from_plaintext(2), None);
    }

    #[test]
    fn test_cast_ballot() {
        let (public_key, private_key) = keypair();
        let cast = cast_ballot(public_key, "voter001", BallotChoice::Yes).unwrap();

        assert_eq!(cast.vote_id.len(), 32);
        assert_eq!(cast.vote.voter_id, "voter001");
        assert_eq!(cast.commitment.voter_id, "voter001");
        assert_eq!(private_key.decrypt(&cast.vote.encrypted).unwrap(), 1);
        assert!(cast
            .commitment
            .verify(BallotChoice::Yes, &cast.commitment.salt));
    }

    #[test]
    fn test_record_roundtrip() {
        let (public_key, _) = keypair();
        let cast = cast_ballot(public_key, "voter002", BallotChoice::No).unwrap();

        let json = serde_json::to_string(&cast.vote.to_record()).unwrap();
        let record: VoteRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(Vote::from_record(&record, public_key).unwrap(), cast.vote);
    }
}
