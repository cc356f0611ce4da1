use super::*;
use rocket::http::ContentType;
use rocket::local::blocking::Client;
use serde_json::json;

lazy_static::lazy_static! {
    static ref KEYPAIR: (PublicKey, PrivateKey) =
        generate_keypair_with_bits(MIN_MODULUS_BITS).unwrap();
}

fn client() -> Client {
    let config = Config {
        min_key_bits: MIN_MODULUS_BITS,
        ..Config::default()
    };
    Client::tracked(build(&config)).unwrap()
}

fn register(client: &Client) {
    let (public_key, _) = &*KEYPAIR;
    let response = client
        .post("/set_public_key")
        .json(&public_key.export())
        .dispatch();

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.into_json::<StatusResponse>().unwrap(),
        StatusResponse::new(STATUS_KEY_STORED)
    );
}

fn error_of(response: rocket::local::blocking::LocalResponse<'_>) -> String {
    response.into_json::<ErrorResponse>().unwrap().error
}

#[test]
fn test_full_round() {
    let client = client();
    let (public_key, private_key) = &*KEYPAIR;
    register(&client);

    for (voter_id, choice) in &[
        ("voter001", BallotChoice::Yes),
        ("voter002", BallotChoice::No),
        ("voter003", BallotChoice::Yes),
    ] {
        let cast = cast_ballot(public_key, voter_id, *choice).unwrap();

        let response = client
            .post("/submit_vote")
            .json(&cast.vote.to_record())
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.into_json::<StatusResponse>().unwrap(),
            StatusResponse::new(STATUS_VOTE_RECORDED)
        );

        let response = client
            .post("/submit_commitment")
            .json(&cast.commitment)
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.into_json::<StatusResponse>().unwrap(),
            StatusResponse::new(STATUS_COMMITMENT_RECORDED)
        );

        let response = client
            .post("/verify_commitment")
            .json(&VerifyRequest {
                vote_id: voter_id.to_string(),
                vote: choice.plaintext(),
                salt: cast.commitment.salt.clone(),
            })
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert!(response.into_json::<VerifyResponse>().unwrap().verified);
    }

    let response = client.get("/get_encrypted_tally").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let wire: EncryptedWire = response.into_json().unwrap();

    let running_sum = EncryptedValue::from_wire(&wire, public_key).unwrap();
    let result = TallyResult::compute(private_key, &running_sum, 3).unwrap();
    assert_eq!(result.yes_count, 2);
    assert_eq!(result.no_count, 1);
    assert_eq!(result.outcome, Outcome::Yes);

    let status: AggregationStatus = client.get("/status").dispatch().into_json().unwrap();
    assert!(status.key_set);
    assert_eq!(status.accepted_votes, 3);
}

#[test]
fn test_tally_before_key() {
    let client = client();

    let response = client.get("/get_encrypted_tally").dispatch();
    assert_eq!(response.status(), Status::BadRequest);
    assert!(error_of(response).contains("public key"));

    let (public_key, _) = &*KEYPAIR;
    let cast = cast_ballot(public_key, "voter001", BallotChoice::Yes).unwrap();
    let response = client
        .post("/submit_vote")
        .json(&cast.vote.to_record())
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);
}

#[test]
fn test_empty_tally_is_zero() {
    let client = client();
    let (public_key, private_key) = &*KEYPAIR;
    register(&client);

    let wire: EncryptedWire = client
        .get("/get_encrypted_tally")
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(wire.exponent, 0);

    let running_sum = EncryptedValue::from_wire(&wire, public_key).unwrap();
    assert_eq!(private_key.decrypt(&running_sum).unwrap(), 0);
}

#[test]
fn test_malformed_requests() {
    let client = client();

    // Missing n
    let response = client
        .post("/set_public_key")
        .json(&json!({}))
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    // Non-integer n
    let response = client
        .post("/set_public_key")
        .json(&json!({"n": "twelve"}))
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    // Not JSON at all
    let response = client
        .post("/set_public_key")
        .header(ContentType::JSON)
        .body("n=12")
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    register(&client);

    // Missing exponent
    let response = client
        .post("/submit_vote")
        .json(&json!({"voter_id": "voter001", "ciphertext": "12345"}))
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    // Ciphertext that is not a number
    let response = client
        .post("/submit_vote")
        .json(&json!({"voter_id": "voter001", "ciphertext": "abc", "exponent": 0}))
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);
    assert!(!error_of(response).is_empty());

    // Exponent at the edge of i32
    let (public_key, _) = &*KEYPAIR;
    let ciphertext = public_key.encrypt(1).unwrap().to_wire().ciphertext;
    let response = client
        .post("/submit_vote")
        .json(&json!({"voter_id": "voter001", "ciphertext": ciphertext, "exponent": i32::MIN}))
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    // Missing salt
    let response = client
        .post("/submit_commitment")
        .json(&json!({"voter_id": "voter001", "commitment": "00"}))
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    // None of it reached the running sum
    let status: AggregationStatus = client.get("/status").dispatch().into_json().unwrap();
    assert_eq!(status.accepted_votes, 0);
}

#[test]
fn test_undersized_key_is_rejected() {
    let client = Client::tracked(build(&Config::default())).unwrap();
    let (public_key, _) = &*KEYPAIR;

    let response = client
        .post("/set_public_key")
        .json(&public_key.export())
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let status: AggregationStatus = client.get("/status").dispatch().into_json().unwrap();
    assert!(!status.key_set);
}

#[test]
fn test_verify_commitment() {
    let client = client();
    let commitment = Commitment::commit("voter002", &SecretVote::new(BallotChoice::No));

    // Unknown id
    let response = client
        .post("/verify_commitment")
        .json(&VerifyRequest {
            vote_id: "voter002".to_owned(),
            vote: 0,
            salt: commitment.salt.clone(),
        })
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);

    client
        .post("/submit_commitment")
        .json(&commitment)
        .dispatch();

    let reveal = |vote: u8| {
        client
            .post("/verify_commitment")
            .json(&VerifyRequest {
                vote_id: "voter002".to_owned(),
                vote,
                salt: commitment.salt.clone(),
            })
            .dispatch()
    };

    assert!(reveal(0).into_json::<VerifyResponse>().unwrap().verified);
    assert!(!reveal(1).into_json::<VerifyResponse>().unwrap().verified);
    assert_eq!(reveal(2).status(), Status::BadRequest);
}

#[test]
fn test_key_replacement_resets_tally() {
    let client = client();
    let (public_key, private_key) = &*KEYPAIR;
    register(&client);

    let cast = cast_ballot(public_key, "voter001", BallotChoice::Yes).unwrap();
    client
        .post("/submit_vote")
        .json(&cast.vote.to_record())
        .dispatch();

    register(&client);

    let wire: EncryptedWire = client
        .get("/get_encrypted_tally")
        .dispatch()
        .into_json()
        .unwrap();
    let running_sum = EncryptedValue::from_wire(&wire, public_key).unwrap();
    assert_eq!(private_key.decrypt(&running_sum).unwrap(), 0);

    let status: AggregationStatus = client.get("/status").dispatch().into_json().unwrap();
    assert_eq!(status.epoch, 2);
    assert_eq!(status.accepted_votes, 0);
}

#[rocket::async_test]
async fn test_concurrent_submissions() {
    use rocket::futures::future::join_all;
    use rocket::local::asynchronous::Client;

    let config = Config {
        min_key_bits: MIN_MODULUS_BITS,
        ..Config::default()
    };
    let client = Client::tracked(build(&config)).await.unwrap();
    let (public_key, private_key) = &*KEYPAIR;

    let response = client
        .post("/set_public_key")
        .json(&public_key.export())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let records: Vec<VoteRecord> = (0..6)
        .map(|i| {
            let choice = BallotChoice::from_plaintext((i % 2) as u8).unwrap();
            let voter_id = format!("voter{:03}", i);
            cast_ballot(public_key, &voter_id, choice)
                .unwrap()
                .vote
                .to_record()
        })
        .collect();

    let responses = join_all(
        records
            .iter()
            .map(|record| client.post("/submit_vote").json(record).dispatch()),
    )
    .await;
    for response in responses {
        assert_eq!(response.status(), Status::Ok);
    }

    let wire: EncryptedWire = client
        .get("/get_encrypted_tally")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    let running_sum = EncryptedValue::from_wire(&wire, public_key).unwrap();
    assert_eq!(private_key.decrypt(&running_sum).unwrap(), 3);
}
