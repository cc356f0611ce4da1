use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("tallybox: invalid public key data: {0}")]
    InvalidKeyData(String),

    #[error("tallybox: public key has not been set")]
    KeyNotSet,

    #[error("tallybox: invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("tallybox: failed to encrypt value: {0}")]
    EncryptionError(String),

    #[error("tallybox: failed to decrypt value: {0}")]
    DecryptionError(String),

    #[error("tallybox: encrypted values were produced under different public keys")]
    MismatchedKey,

    #[error("tallybox: no commitment found for {0}")]
    CommitmentNotFound(String),

    #[error("tallybox: revealed vote does not match the commitment for {0}")]
    CommitmentMismatch(String),

    #[error("tallybox: decrypted yes-count {yes_count} is outside [0, {total_voters}]")]
    TallyOutOfRange { yes_count: i64, total_voters: u64 },

    #[error("tallybox: invalid ballot choice {0:?}, expected 'yes' or 'no'")]
    InvalidBallotChoice(String),

    #[error("tallybox: authentication failed for voter {0}")]
    AuthenticationFailed(String),

    #[error("tallybox: JSON error: {0}")]
    JSON(#[from] serde_json::Error),

    #[error("tallybox: IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
