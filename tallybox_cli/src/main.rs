use clap::{App, AppSettings, Arg, SubCommand};
use log::{debug, LevelFilter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

mod command_keygen;
mod command_register;
mod command_tally;
mod command_verify;
mod command_verify_all;
mod command_vote;
mod rest;

use command_keygen::command_keygen;
use command_register::command_register;
use command_tally::{command_tally, command_tally_files};
use command_verify::command_verify;
use command_verify_all::command_verify_all;
use command_vote::command_vote;

fn main() {
    let matches = App::new("tallybox")
        .version("0.1.0")
        .about("Casts and tallies encrypted yes/no votes against a tally service")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("uri")
                .long("uri")
                .takes_value(true)
                .global(true)
                .help("Set the tally service uri - can also be set with TALLYBOX_URI"),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(
            SubCommand::with_name("keygen")
                .about("Generate a Paillier keypair for the tallying authority")
                .arg(
                    Arg::with_name("bits")
                        .long("bits")
                        .takes_value(true)
                        .default_value("2048")
                        .help("Modulus size in bits"),
                )
                .arg(
                    Arg::with_name("public-key")
                        .long("public-key")
                        .takes_value(true)
                        .default_value("public_key.json")
                        .help("Where to write the public key"),
                )
                .arg(
                    Arg::with_name("private-key")
                        .long("private-key")
                        .takes_value(true)
                        .default_value("private_key.json")
                        .help("Where to write the private key"),
                ),
        )
        .subcommand(
            SubCommand::with_name("register-key")
                .about("Register a public key with the tally service, starting a new tally")
                .arg(
                    Arg::with_name("PUBLIC-KEY")
                        .index(1)
                        .required(true)
                        .help("Public key file written by keygen"),
                ),
        )
        .subcommand(
            SubCommand::with_name("vote")
                .about("Authenticate, then encrypt and commit to a yes/no vote")
                .arg(
                    Arg::with_name("VOTE")
                        .index(1)
                        .required(true)
                        .help("yes or no"),
                )
                .arg(
                    Arg::with_name("voter-id")
                        .long("voter-id")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("pin")
                        .long("pin")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("registry")
                        .long("registry")
                        .takes_value(true)
                        .default_value("voters.json")
                        .help("Voter registry file"),
                )
                .arg(
                    Arg::with_name("public-key")
                        .long("public-key")
                        .takes_value(true)
                        .default_value("public_key.json"),
                )
                .arg(
                    Arg::with_name("votes-dir")
                        .long("votes-dir")
                        .takes_value(true)
                        .default_value("votes"),
                )
                .arg(
                    Arg::with_name("commitments-dir")
                        .long("commitments-dir")
                        .takes_value(true)
                        .default_value("commitments"),
                )
                .arg(
                    Arg::with_name("post")
                        .long("post")
                        .help("Also submit the vote and commitment to the tally service"),
                ),
        )
        .subcommand(
            SubCommand::with_name("tally")
                .about("Decrypt the tally service's running sum")
                .arg(
                    Arg::with_name("private-key")
                        .long("private-key")
                        .takes_value(true)
                        .default_value("private_key.json"),
                )
                .arg(
                    Arg::with_name("total-voters")
                        .long("total-voters")
                        .takes_value(true)
                        .help("Number of voters, defaults to the size of the registry"),
                )
                .arg(
                    Arg::with_name("registry")
                        .long("registry")
                        .takes_value(true)
                        .default_value("voters.json"),
                ),
        )
        .subcommand(
            SubCommand::with_name("tally-files")
                .about("Tally the vote records on disk without the tally service")
                .arg(
                    Arg::with_name("private-key")
                        .long("private-key")
                        .takes_value(true)
                        .default_value("private_key.json"),
                )
                .arg(
                    Arg::with_name("votes-dir")
                        .long("votes-dir")
                        .takes_value(true)
                        .default_value("votes"),
                )
                .arg(
                    Arg::with_name("total-voters")
                        .long("total-voters")
                        .takes_value(true)
                        .help("Number of voters, defaults to the registry size, then to the record count"),
                )
                .arg(
                    Arg::with_name("registry")
                        .long("registry")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Check a revealed vote and salt against a stored commitment")
                .arg(
                    Arg::with_name("VOTE-ID")
                        .index(1)
                        .required(true)
                        .help("vote-id from the voting receipt, or the voter id with --remote"),
                )
                .arg(
                    Arg::with_name("VOTE")
                        .index(2)
                        .required(true)
                        .help("yes or no"),
                )
                .arg(Arg::with_name("SALT").index(3).required(true))
                .arg(
                    Arg::with_name("commitments-dir")
                        .long("commitments-dir")
                        .takes_value(true)
                        .default_value("commitments"),
                )
                .arg(
                    Arg::with_name("remote")
                        .long("remote")
                        .help("Verify against the tally service instead of local records"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify-all")
                .about("Check a reveal against every commitment record in a directory")
                .arg(
                    Arg::with_name("commitments-dir")
                        .long("commitments-dir")
                        .takes_value(true)
                        .default_value("commitments"),
                )
                .arg(
                    Arg::with_name("reveals")
                        .long("reveals")
                        .takes_value(true)
                        .help("JSON list of {vote_id, vote, salt}; prompts for each vote id when absent"),
                ),
        )
        .get_matches();

    let level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("TALLYBOX_LOG")
        .init();

    let env_var = std::env::var("TALLYBOX_URI");
    let uri = match matches.value_of("uri") {
        Some(uri) => uri,
        None => env_var.as_deref().unwrap_or("http://localhost:5000"),
    };
    let uri = uri.trim_end_matches('/');
    debug!("tally service at {}", uri);

    // Subcommands
    match matches.subcommand() {
        ("keygen", Some(matches)) => command_keygen(matches),
        ("register-key", Some(matches)) => command_register(matches, uri),
        ("vote", Some(matches)) => command_vote(matches, uri),
        ("tally", Some(matches)) => command_tally(matches, uri),
        ("tally-files", Some(matches)) => command_tally_files(matches),
        ("verify", Some(matches)) => command_verify(matches, uri),
        ("verify-all", Some(matches)) => command_verify_all(matches),
        _ => {}
    }
}

/// Expand `~` and environment variables in a path argument.
pub fn expand(input: &str) -> String {
    match shellexpand::full(input) {
        Ok(expanded) => expanded.into_owned(),
        Err(_) => input.to_owned(),
    }
}

/// Print the error and exit with status 1.
pub trait OrExit<T> {
    fn or_exit(self, command: &str) -> T;
}

impl<T, E: Display> OrExit<T> for Result<T, E> {
    fn or_exit(self, command: &str) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                eprintln!("tallybox {}: {}", command, e);
                std::process::exit(1);
            }
        }
    }
}

/// The value of an argument that has a default or is required.
pub fn arg<'a>(matches: &'a clap::ArgMatches, name: &str) -> &'a str {
    matches.value_of(name).unwrap_or_default()
}

pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> tallybox::Result<T> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> tallybox::Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Total voters from `--total-voters`, or else the size of `--registry`.
pub fn total_voters(matches: &clap::ArgMatches) -> Result<Option<u64>, String> {
    if let Some(total) = matches.value_of("total-voters") {
        return total
            .parse()
            .map(Some)
            .map_err(|e| format!("invalid --total-voters {:?}: {}", total, e));
    }

    match matches.value_of("registry") {
        Some(path) => {
            use tallybox::VoterRegistry;
            let registry = tallybox::MemRegistry::load(expand(path)).map_err(|e| e.to_string())?;
            Ok(Some(registry.len() as u64))
        }
        None => Ok(None),
    }
}
