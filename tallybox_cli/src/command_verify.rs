use crate::{arg, expand, rest, OrExit};
use tallybox::messages::VerifyRequest;
use tallybox::{BallotChoice, RecordStore};

pub fn command_verify(matches: &clap::ArgMatches, uri: &str) {
    let vote_id = arg(matches, "VOTE-ID");
    let choice: BallotChoice = arg(matches, "VOTE").parse().or_exit("verify");
    let salt = arg(matches, "SALT");

    let verified = if matches.is_present("remote") {
        let reveal = VerifyRequest {
            vote_id: vote_id.to_owned(),
            vote: choice.plaintext(),
            salt: salt.to_owned(),
        };
        rest::verify_commitment(uri, &reveal)
            .or_exit("verify")
            .verified
    } else {
        let commitments_dir = expand(arg(matches, "commitments-dir"));
        let store = RecordStore::new(&commitments_dir, &commitments_dir);
        store
            .load_commitment(vote_id)
            .or_exit("verify")
            .verify(choice, salt)
    };

    if verified {
        println!("verified: {} voted {}", vote_id, choice);
    } else {
        eprintln!("tallybox verify: {} does not match the commitment", choice);
        std::process::exit(1);
    }
}
