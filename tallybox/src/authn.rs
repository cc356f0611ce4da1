use crate::*;
use indexmap::IndexMap;
use std::path::Path;
use subtle::ConstantTimeEq;

/// Decides whether a voter may cast a ballot.
pub trait VoterRegistry {
    /// Check a voter's credential
    fn authenticate(&self, voter_id: &str, credential: &str) -> bool;

    /// Number of registered voters
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct RegisteredVoter {
    pub name: String,
    pub pin: String,
}

/// A registry held in memory, typically loaded from a JSON file of the form
/// `{"voter001": {"name": "Alice", "pin": "..."}, ...}`.
#[derive(Serialize, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct MemRegistry {
    voters: IndexMap<String, RegisteredVoter>,
}

impl MemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn insert(&mut self, voter_id: &str, name: &str, pin: &str) {
        self.voters.insert(
            voter_id.to_owned(),
            RegisteredVoter {
                name: name.to_owned(),
                pin: pin.to_owned(),
            },
        );
    }

    pub fn get(&self, voter_id: &str) -> Option<&RegisteredVoter> {
        self.voters.get(voter_id)
    }

    /// Voter ids in registration order
    pub fn voter_ids(&self) -> impl Iterator<Item = &str> {
        self.voters.keys().map(String::as_str)
    }

    /// Authenticate, turning a refusal into `AuthenticationFailed`.
    pub fn require(&self, voter_id: &str, credential: &str) -> Result<&RegisteredVoter> {
        if !self.authenticate(voter_id, credential) {
            return Err(Error::AuthenticationFailed(voter_id.to_owned()));
        }
        self.get(voter_id)
            .ok_or_else(|| Error::AuthenticationFailed(voter_id.to_owned()))
    }
}

impl VoterRegistry for MemRegistry {
    fn authenticate(&self, voter_id: &str, credential: &str) -> bool {
        match self.voters.get(voter_id) {
            Some(voter) => voter.pin.as_bytes().ct_eq(credential.as_bytes()).into(),
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.voters.len()
    }
}
