use config::Config;
use log::{error, info};
use rocket::fairing::AdHoc;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::{self, Json};
use rocket::tokio::task;
use rocket::{Build, Rocket, State};
use tallybox::messages::*;
use std::sync::Arc;
use tallybox::*;

#[macro_use]
extern crate rocket;

mod config;

#[cfg(test)]
mod tests;

type Rejection = status::Custom<Json<ErrorResponse>>;

type Response<T> = Result<Json<T>, Rejection>;

type Aggregation = Arc<AggregationService>;

fn reject(e: Error) -> Rejection {
    let status = match e {
        Error::CommitmentNotFound(_) => Status::NotFound,
        _ => Status::BadRequest,
    };
    status::Custom(status, Json(e.into()))
}

// Missing fields, wrong types and unparseable bodies all land here
fn malformed(e: json::Error<'_>) -> Rejection {
    let message = match e {
        json::Error::Io(e) => format!("tallybox: unreadable request body: {}", e),
        json::Error::Parse(_, e) => format!("tallybox: malformed request body: {}", e),
    };
    status::Custom(Status::BadRequest, Json(ErrorResponse::new(&message)))
}

// Folding a vote is a modpow over n^2 under the aggregation lock, so it runs
// on the blocking pool rather than on an async worker.
async fn blocking<T, F>(aggregation: &State<Aggregation>, work: F) -> Result<T, Rejection>
where
    T: Send + 'static,
    F: FnOnce(&AggregationService) -> tallybox::Result<T> + Send + 'static,
{
    let aggregation = Arc::clone(aggregation.inner());
    match task::spawn_blocking(move || work(&aggregation)).await {
        Ok(result) => result.map_err(reject),
        Err(e) => {
            error!("aggregation task failed: {}", e);
            let body = ErrorResponse::new("tallybox: internal error");
            Err(status::Custom(Status::InternalServerError, Json(body)))
        }
    }
}

#[post("/set_public_key", data = "<key>")]
async fn set_public_key(
    aggregation: &State<Aggregation>,
    key: Result<Json<PublicKeyWire>, json::Error<'_>>,
) -> Response<StatusResponse> {
    let key = key.map_err(malformed)?.into_inner();
    blocking(aggregation, move |service| service.register_public_key(&key)).await?;

    Ok(Json(StatusResponse::new(STATUS_KEY_STORED)))
}

#[post("/submit_vote", data = "<vote>")]
async fn submit_vote(
    aggregation: &State<Aggregation>,
    vote: Result<Json<VoteRecord>, json::Error<'_>>,
) -> Response<StatusResponse> {
    let vote = vote.map_err(malformed)?.into_inner();
    blocking(aggregation, move |service| {
        service.submit_vote(&vote.voter_id, &vote.encrypted_wire())
    })
    .await?;

    Ok(Json(StatusResponse::new(STATUS_VOTE_RECORDED)))
}

#[post("/submit_commitment", data = "<commitment>")]
fn submit_commitment(
    commitments: &State<CommitmentService>,
    commitment: Result<Json<Commitment>, json::Error<'_>>,
) -> Response<StatusResponse> {
    let commitment = commitment.map_err(malformed)?;
    commitments.submit_commitment(commitment.into_inner());

    Ok(Json(StatusResponse::new(STATUS_COMMITMENT_RECORDED)))
}

#[get("/get_encrypted_tally")]
fn get_encrypted_tally(aggregation: &State<Aggregation>) -> Response<EncryptedWire> {
    let tally = aggregation.get_tally().map_err(reject)?;
    Ok(Json(tally.to_wire()))
}

#[post("/verify_commitment", data = "<reveal>")]
fn verify_commitment(
    commitments: &State<CommitmentService>,
    reveal: Result<Json<VerifyRequest>, json::Error<'_>>,
) -> Response<VerifyResponse> {
    let reveal = reveal.map_err(malformed)?;
    let choice = BallotChoice::from_plaintext(reveal.vote)
        .ok_or_else(|| reject(Error::InvalidBallotChoice(reveal.vote.to_string())))?;

    let verified = commitments
        .verify(&reveal.vote_id, choice, &reveal.salt)
        .map_err(reject)?;

    Ok(Json(VerifyResponse { verified }))
}

#[get("/status")]
fn get_status(aggregation: &State<Aggregation>) -> Json<AggregationStatus> {
    Json(aggregation.status())
}

pub fn build(config: &Config) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("address", config.address))
        .merge(("port", config.port));

    let min_key_bits = config.min_key_bits;

    rocket::custom(figment)
        .attach(AdHoc::on_liftoff("Key Policy", move |_| {
            Box::pin(async move {
                info!(
                    "tally service accepting public keys of at least {} bits",
                    min_key_bits
                );
            })
        }))
        .manage(Arc::new(AggregationService::with_min_key_bits(
            config.min_key_bits,
        )))
        .manage(CommitmentService::new())
        .mount(
            "/",
            routes![
                set_public_key,
                submit_vote,
                submit_commitment,
                get_encrypted_tally,
                verify_commitment,
                get_status
            ],
        )
}

#[launch]
fn rocket() -> _ {
    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("tallyboxd: {}", e);
        std::process::exit(1);
    });

    build(&config)
}
