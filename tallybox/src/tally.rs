use crate::*;
use std::cmp::Ordering;
use std::fmt;

/// Which side won
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Yes,
    No,
    Tie,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Yes => write!(f, "Majority chose 'Yes'"),
            Outcome::No => write!(f, "Majority chose 'No'"),
            Outcome::Tie => write!(f, "It's a tie"),
        }
    }
}

/// Final yes/no count of an election
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TallyResult {
    pub yes_count: u64,
    pub no_count: u64,
    pub total_voters: u64,
    pub outcome: Outcome,
}

impl TallyResult {
    /// Decrypt the running sum and derive the counts.
    ///
    /// `no_count` is `total_voters - yes_count`: this assumes every registered
    /// voter cast exactly one binary vote. An abstention or a double vote skews
    /// the no-count without being detected here. A yes-count outside
    /// `[0, total_voters]` is reported as `TallyOutOfRange`, never clamped.
    pub fn compute(
        private_key: &PrivateKey,
        running_sum: &EncryptedValue,
        total_voters: u64,
    ) -> Result<Self> {
        let yes_count = private_key.decrypt(running_sum)?;

        if yes_count < 0 || yes_count as u64 > total_voters {
            return Err(Error::TallyOutOfRange {
                yes_count,
                total_voters,
            });
        }

        Ok(Self::from_counts(yes_count as u64, total_voters))
    }

    fn from_counts(yes_count: u64, total_voters: u64) -> Self {
        let no_count = total_voters - yes_count;
        let outcome = match yes_count.cmp(&no_count) {
            Ordering::Greater => Outcome::Yes,
            Ordering::Less => Outcome::No,
            Ordering::Equal => Outcome::Tie,
        };

        TallyResult {
            yes_count,
            no_count,
            total_voters,
            outcome,
        }
    }
}

impl fmt::Display for TallyResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Yes = {}, No = {} (out of {} voters). {}.",
            self.yes_count, self.no_count, self.total_voters, self.outcome
        )
    }
}
