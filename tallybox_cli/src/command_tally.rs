use crate::{arg, expand, read_json, rest, total_voters, OrExit};
use log::info;
use tallybox::{EncryptedValue, PrivateKey, PrivateKeyWire, RecordStore, TallyResult};

fn load_private_key(matches: &clap::ArgMatches, command: &str) -> PrivateKey {
    let wire: PrivateKeyWire = read_json(expand(arg(matches, "private-key"))).or_exit(command);
    PrivateKey::import(&wire).or_exit(command)
}

pub fn command_tally(matches: &clap::ArgMatches, uri: &str) {
    let private_key = load_private_key(matches, "tally");
    let total_voters = total_voters(matches)
        .or_exit("tally")
        .unwrap_or_else(|| {
            eprintln!("tallybox tally: provide --total-voters or --registry");
            std::process::exit(1);
        });

    let wire = rest::get_encrypted_tally(uri).or_exit("tally");
    let running_sum = EncryptedValue::from_wire(&wire, private_key.public_key()).or_exit("tally");

    let result = TallyResult::compute(&private_key, &running_sum, total_voters).or_exit("tally");
    println!("{}", result);
}

pub fn command_tally_files(matches: &clap::ArgMatches) {
    let private_key = load_private_key(matches, "tally-files");

    let votes_dir = expand(arg(matches, "votes-dir"));
    // Commitments play no part in the tally
    let store = RecordStore::new(&votes_dir, &votes_dir);
    let (running_sum, count) = store
        .tally_votes(private_key.public_key())
        .or_exit("tally-files");
    info!("folded {} vote record(s) from {}", count, votes_dir);

    let total_voters = total_voters(matches)
        .or_exit("tally-files")
        .unwrap_or(count as u64);

    let result =
        TallyResult::compute(&private_key, &running_sum, total_voters).or_exit("tally-files");
    println!("{}", result);
}
