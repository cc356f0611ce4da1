use crate::{arg, expand, read_json, OrExit};
use std::io::{self, BufRead, Write};
use tallybox::messages::VerifyRequest;
use tallybox::{BallotChoice, RecordStore, RevealCheck};

pub fn command_verify_all(matches: &clap::ArgMatches) {
    let commitments_dir = expand(arg(matches, "commitments-dir"));
    let store = RecordStore::new(&commitments_dir, &commitments_dir);

    let reveals: Vec<VerifyRequest> = match matches.value_of("reveals") {
        Some(path) => read_json(expand(path)).or_exit("verify-all"),
        None => prompt_reveals(&store),
    };

    let results = store.verify_all(&reveals).or_exit("verify-all");
    if results.is_empty() {
        eprintln!(
            "tallybox verify-all: no commitment records found in {}",
            commitments_dir
        );
        std::process::exit(1);
    }

    let mut all_passed = true;
    for (vote_id, check) in &results {
        println!("Proof for {}: {}", vote_id, check);
        all_passed &= *check == RevealCheck::Passed;
    }

    if !all_passed {
        std::process::exit(1);
    }
}

// Ask the operator for each voter's vote and salt, one commitment at a time
fn prompt_reveals(store: &RecordStore) -> Vec<VerifyRequest> {
    let commitments = store.load_commitments().or_exit("verify-all");
    println!("Found {} commitment record(s) to verify.", commitments.len());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut ask = |prompt: &str| -> String {
        print!("  {}: ", prompt);
        io::stdout().flush().or_exit("verify-all");
        match lines.next() {
            Some(line) => line.or_exit("verify-all").trim().to_owned(),
            None => {
                eprintln!("tallybox verify-all: unexpected end of input");
                std::process::exit(1);
            }
        }
    };

    let mut reveals = Vec::with_capacity(commitments.len());
    for (vote_id, _) in commitments {
        println!("Verifying vote id {}", vote_id);
        let choice = loop {
            match ask("vote (yes or no)").parse::<BallotChoice>() {
                Ok(choice) => break choice,
                Err(e) => eprintln!("  {}", e),
            }
        };
        let salt = ask("salt");

        reveals.push(VerifyRequest {
            vote_id,
            vote: choice.plaintext(),
            salt,
        });
    }
    reveals
}
