//! Request and response bodies exchanged with the tally service.
//!
//! | Operation            | Request          | Response                         |
//! |----------------------|------------------|----------------------------------|
//! | register public key  | `PublicKeyWire`  | `StatusResponse`                 |
//! | submit vote          | `VoteRecord`     | `StatusResponse`                 |
//! | submit commitment    | `Commitment`     | `StatusResponse`                 |
//! | get encrypted tally  |                  | `EncryptedWire`                  |
//! | verify commitment    | `VerifyRequest`  | `VerifyResponse`                 |
//!
//! Failures are answered with an `ErrorResponse`.

pub const STATUS_KEY_STORED: &str = "public key stored";
pub const STATUS_VOTE_RECORDED: &str = "vote recorded";
pub const STATUS_COMMITMENT_RECORDED: &str = "commitment recorded";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: &str) -> Self {
        StatusResponse {
            status: status.to_owned(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        ErrorResponse {
            error: error.to_owned(),
        }
    }
}

impl From<crate::Error> for ErrorResponse {
    fn from(e: crate::Error) -> Self {
        ErrorResponse {
            error: e.to_string(),
        }
    }
}

/// A voter's reveal: the plaintext vote (0 or 1) and the salt it was committed with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    pub vote_id: String,
    pub vote: u8,
    pub salt: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyResponse {
    pub verified: bool,
}
