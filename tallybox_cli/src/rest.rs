use serde::de::DeserializeOwned;
use serde::Serialize;
use tallybox::messages::*;
use tallybox::{Commitment, EncryptedWire, PublicKeyWire, VoteRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("tally service answered {status}: {message}")]
    Rejected { status: u16, message: String },
}

fn decode<T: DeserializeOwned>(res: reqwest::blocking::Response) -> Result<T, RestError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json()?);
    }

    let body = res.text()?;
    let message = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) => error.error,
        Err(_) => body,
    };
    Err(RestError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn post<Req: Serialize, Resp: DeserializeOwned>(
    base_uri: &str,
    path: &str,
    body: &Req,
) -> Result<Resp, RestError> {
    let full_uri = format!("{}/{}", base_uri, path);
    let client = reqwest::blocking::Client::new();
    let res = client.post(&full_uri).json(body).send()?;

    decode(res)
}

pub fn set_public_key(base_uri: &str, key: &PublicKeyWire) -> Result<StatusResponse, RestError> {
    post(base_uri, "set_public_key", key)
}

pub fn submit_vote(base_uri: &str, vote: &VoteRecord) -> Result<StatusResponse, RestError> {
    post(base_uri, "submit_vote", vote)
}

pub fn submit_commitment(
    base_uri: &str,
    commitment: &Commitment,
) -> Result<StatusResponse, RestError> {
    post(base_uri, "submit_commitment", commitment)
}

pub fn verify_commitment(
    base_uri: &str,
    reveal: &VerifyRequest,
) -> Result<VerifyResponse, RestError> {
    post(base_uri, "verify_commitment", reveal)
}

pub fn get_encrypted_tally(base_uri: &str) -> Result<EncryptedWire, RestError> {
    let full_uri = format!("{}/get_encrypted_tally", base_uri);
    let client = reqwest::blocking::Client::new();
    let res = client.get(&full_uri).send()?;

    decode(res)
}
