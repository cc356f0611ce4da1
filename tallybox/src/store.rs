use crate::messages::VerifyRequest;
use crate::*;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name suffix of commitment records
pub const COMMITMENT_SUFFIX: &str = "_commit.json";

const VOTE_SUFFIX: &str = ".json";

/// Result of checking one stored commitment against a reveal
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RevealCheck {
    Passed,
    Failed,
    /// No reveal was offered for this commitment
    Missing,
}

impl fmt::Display for RevealCheck {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RevealCheck::Passed => write!(f, "PASSED"),
            RevealCheck::Failed => write!(f, "FAILED"),
            RevealCheck::Missing => write!(f, "MISSING"),
        }
    }
}

/// Backup copies of cast votes and commitments on disk.
///
/// Each cast ballot produces `<vote_id>.json` in the votes directory and
/// `<vote_id>_commit.json` in the commitments directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    votes_dir: PathBuf,
    commitments_dir: PathBuf,
}

impl RecordStore {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(votes_dir: P, commitments_dir: Q) -> Self {
        RecordStore {
            votes_dir: votes_dir.into(),
            commitments_dir: commitments_dir.into(),
        }
    }

    pub fn votes_dir(&self) -> &Path {
        &self.votes_dir
    }

    pub fn commitments_dir(&self) -> &Path {
        &self.commitments_dir
    }

    /// Write both records of a cast ballot. Returns the paths written.
    pub fn save(&self, cast: &CastBallot) -> Result<(PathBuf, PathBuf)> {
        let vote_path = self.save_vote(&cast.vote_id, &cast.vote.to_record())?;
        let commitment_path = self.save_commitment(&cast.vote_id, &cast.commitment)?;
        Ok((vote_path, commitment_path))
    }

    pub fn save_vote(&self, vote_id: &str, record: &VoteRecord) -> Result<PathBuf> {
        let path = record_path(&self.votes_dir, vote_id, VOTE_SUFFIX)?;
        write_json(&path, record)?;
        Ok(path)
    }

    pub fn save_commitment(&self, vote_id: &str, commitment: &Commitment) -> Result<PathBuf> {
        let path = record_path(&self.commitments_dir, vote_id, COMMITMENT_SUFFIX)?;
        write_json(&path, commitment)?;
        Ok(path)
    }

    /// Every vote record in the votes directory, ordered by vote id.
    pub fn load_votes(&self) -> Result<Vec<(String, VoteRecord)>> {
        let mut votes = Vec::new();
        for (vote_id, path) in list_records(&self.votes_dir, VOTE_SUFFIX)? {
            if vote_id.ends_with(COMMITMENT_SUFFIX.trim_end_matches(VOTE_SUFFIX)) {
                continue;
            }
            votes.push((vote_id, read_json(&path)?));
        }
        Ok(votes)
    }

    /// The commitment record for one vote id
    pub fn load_commitment(&self, vote_id: &str) -> Result<Commitment> {
        let path = record_path(&self.commitments_dir, vote_id, COMMITMENT_SUFFIX)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::CommitmentNotFound(vote_id.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every commitment record, ordered by vote id.
    pub fn load_commitments(&self) -> Result<Vec<(String, Commitment)>> {
        list_records(&self.commitments_dir, COMMITMENT_SUFFIX)?
            .into_iter()
            .map(|(vote_id, path)| Ok((vote_id, read_json(&path)?)))
            .collect()
    }

    /// Check reveals against every stored commitment, ordered by vote id.
    ///
    /// A reveal whose vote is not 0 or 1 fails. Reveals for vote ids with no
    /// stored commitment are skipped with a warning.
    pub fn verify_all(&self, reveals: &[VerifyRequest]) -> Result<Vec<(String, RevealCheck)>> {
        let commitments = self.load_commitments()?;

        let mut by_id: HashMap<&str, &VerifyRequest> = HashMap::new();
        for reveal in reveals {
            if by_id.insert(reveal.vote_id.as_str(), reveal).is_some() {
                warn!("more than one reveal for '{}', using the last", reveal.vote_id);
            }
        }

        let results = commitments
            .into_iter()
            .map(|(vote_id, commitment)| {
                let check = match by_id.remove(vote_id.as_str()) {
                    None => RevealCheck::Missing,
                    Some(reveal) => match BallotChoice::from_plaintext(reveal.vote) {
                        Some(choice) if commitment.verify(choice, &reveal.salt) => {
                            RevealCheck::Passed
                        }
                        _ => RevealCheck::Failed,
                    },
                };
                (vote_id, check)
            })
            .collect();

        for vote_id in by_id.keys() {
            warn!("reveal for '{}' has no stored commitment", vote_id);
        }

        Ok(results)
    }

    /// Fold every stored vote under `public_key`, exactly as the tally
    /// service would have. Returns the encrypted sum and the number of votes.
    pub fn tally_votes(&self, public_key: &PublicKey) -> Result<(EncryptedValue, usize)> {
        let aggregation = AggregationService::new();
        aggregation.set_public_key(public_key.clone())?;

        let votes = self.load_votes()?;
        for (vote_id, record) in &votes {
            aggregation
                .submit_vote(&record.voter_id, &record.encrypted_wire())
                .map_err(|e| {
                    error!("vote record {} rejected: {}", vote_id, e);
                    e
                })?;
        }

        Ok((aggregation.get_tally()?, votes.len()))
    }
}

// Vote ids become file names, so only allow characters that cannot escape the directory
fn record_path(dir: &Path, vote_id: &str, suffix: &str) -> Result<PathBuf> {
    let valid = !vote_id.is_empty()
        && vote_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid vote id {:?}", vote_id),
        )
        .into());
    }
    Ok(dir.join(format!("{}{}", vote_id, suffix)))
}

fn list_records(dir: &Path, suffix: &str) -> Result<Vec<(String, PathBuf)>> {
    let mut records = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if let Some(vote_id) = name.strip_suffix(suffix) {
            records.push((vote_id.to_owned(), path.clone()));
        }
    }
    records.sort();
    Ok(records)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{keypair, scratch_dir};

    #[test]
    fn test_save_and_load() {
        let (public_key, _) = keypair();
        let dir = scratch_dir();
        let store = RecordStore::new(dir.join("votes"), dir.join("commitments"));

        let cast = cast_ballot(public_key, "voter001", BallotChoice::No).unwrap();
        let (vote_path, commitment_path) = store.save(&cast).unwrap();

        assert!(vote_path.ends_with(format!("{}.json", cast.vote_id)));
        assert!(commitment_path.ends_with(format!("{}_commit.json", cast.vote_id)));

        let votes = store.load_votes().unwrap();
        assert_eq!(votes, vec![(cast.vote_id.clone(), cast.vote.to_record())]);

        let commitment = store.load_commitment(&cast.vote_id).unwrap();
        assert_eq!(commitment, cast.commitment);
        assert!(commitment.verify(BallotChoice::No, &commitment.salt));

        let all = store.load_commitments().unwrap();
        assert_eq!(all, vec![(cast.vote_id.clone(), cast.commitment.clone())]);
    }

    #[test]
    fn test_verify_all() {
        let (public_key, _) = keypair();
        let dir = scratch_dir();
        let store = RecordStore::new(dir.join("votes"), dir.join("commitments"));

        let yes = cast_ballot(public_key, "voter001", BallotChoice::Yes).unwrap();
        let no = cast_ballot(public_key, "voter002", BallotChoice::No).unwrap();
        let silent = cast_ballot(public_key, "voter003", BallotChoice::Yes).unwrap();
        for cast in &[&yes, &no, &silent] {
            store.save(cast).unwrap();
        }

        let reveal = |cast: &CastBallot, vote: u8| VerifyRequest {
            vote_id: cast.vote_id.clone(),
            vote,
            salt: cast.commitment.salt.clone(),
        };
        let reveals = vec![
            reveal(&yes, 1),
            // Lies about the vote
            reveal(&no, 1),
            VerifyRequest {
                vote_id: "0da34f57521d4f28a6a8be4cd6b1d065".to_owned(),
                vote: 1,
                salt: "00".to_owned(),
            },
        ];

        let mut expected = vec![
            (yes.vote_id.clone(), RevealCheck::Passed),
            (no.vote_id.clone(), RevealCheck::Failed),
            (silent.vote_id.clone(), RevealCheck::Missing),
        ];
        expected.sort();

        assert_eq!(store.verify_all(&reveals).unwrap(), expected);

        // A vote outside 0/1 never passes
        let bad = vec![reveal(&yes, 7)];
        let results = store.verify_all(&bad).unwrap();
        assert!(results.contains(&(yes.vote_id.clone(), RevealCheck::Failed)));
    }

    #[test]
    fn test_missing_commitment() {
        let dir = scratch_dir();
        let store = RecordStore::new(dir.join("votes"), dir.join("commitments"));

        assert!(matches!(
            store.load_commitment("0da34f57521d4f28a6a8be4cd6b1d065"),
            Err(Error::CommitmentNotFound(_))
        ));
    }

    #[test]
    fn test_rejects_path_like_vote_ids() {
        let dir = scratch_dir();
        let store = RecordStore::new(dir.join("votes"), dir.join("commitments"));

        for bad in &["../secret", "", "a/b", "."] {
            assert!(matches!(store.load_commitment(bad), Err(Error::Io(_))));
        }
    }

    #[test]
    fn test_tally_votes_from_files() {
        let (public_key, private_key) = keypair();
        let dir = scratch_dir();
        // One directory for both kinds, as a careless operator might set it up
        let store = RecordStore::new(dir.clone(), dir.clone());

        for (voter, choice) in &[
            ("voter001", BallotChoice::Yes),
            ("voter002", BallotChoice::Yes),
            ("voter003", BallotChoice::No),
        ] {
            let cast = cast_ballot(public_key, voter, *choice).unwrap();
            store.save(&cast).unwrap();
        }

        let (sum, count) = store.tally_votes(public_key).unwrap();
        assert_eq!(count, 3);
        assert_eq!(private_key.decrypt(&sum).unwrap(), 2);
    }

    #[test]
    fn test_tally_rejects_corrupt_record() {
        let (public_key, _) = keypair();
        let dir = scratch_dir();
        let store = RecordStore::new(dir.join("votes"), dir.join("commitments"));

        let record = VoteRecord {
            voter_id: "voter001".to_owned(),
            ciphertext: "12x".to_owned(),
            exponent: 0,
        };
        store.save_vote("bad", &record).unwrap();

        assert!(matches!(
            store.tally_votes(public_key),
            Err(Error::InvalidCiphertext(_))
        ));
    }
}
