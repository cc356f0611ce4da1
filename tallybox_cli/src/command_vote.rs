use crate::{arg, expand, read_json, rest, OrExit};
use log::info;
use tallybox::{BallotChoice, MemRegistry, PublicKey, PublicKeyWire, RecordStore};

pub fn command_vote(matches: &clap::ArgMatches, uri: &str) {
    let choice: BallotChoice = arg(matches, "VOTE").parse().or_exit("vote");
    let voter_id = arg(matches, "voter-id");
    let pin = arg(matches, "pin");

    let registry = MemRegistry::load(expand(arg(matches, "registry"))).or_exit("vote");
    let voter = registry.require(voter_id, pin).or_exit("vote");
    info!("authenticated voter '{}'", voter_id);

    let wire: PublicKeyWire = read_json(expand(arg(matches, "public-key"))).or_exit("vote");
    let public_key = PublicKey::import(&wire).or_exit("vote");

    let cast = tallybox::cast_ballot(&public_key, voter_id, choice).or_exit("vote");

    let store = RecordStore::new(
        expand(arg(matches, "votes-dir")),
        expand(arg(matches, "commitments-dir")),
    );
    let (vote_path, commitment_path) = store.save(&cast).or_exit("vote");
    info!(
        "vote written to {}, commitment to {}",
        vote_path.display(),
        commitment_path.display()
    );

    if matches.is_present("post") {
        rest::submit_vote(uri, &cast.vote.to_record()).or_exit("vote");
        rest::submit_commitment(uri, &cast.commitment).or_exit("vote");
        info!("vote and commitment submitted to {}", uri);
    }

    // The voter's receipt: keep the salt to prove this vote later
    println!("Thank you, {}. Your vote has been cast.", voter.name);
    println!("vote-id: {}", cast.vote_id);
    println!("commitment: {}", cast.commitment.commitment);
    println!("salt: {}", cast.commitment.salt);
}
