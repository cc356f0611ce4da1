use crate::{arg, expand, read_json, rest, OrExit};
use tallybox::{PublicKey, PublicKeyWire};

pub fn command_register(matches: &clap::ArgMatches, uri: &str) {
    let path = expand(arg(matches, "PUBLIC-KEY"));
    let wire: PublicKeyWire = read_json(&path).or_exit("register-key");

    // Catch a malformed key before the service does
    let public_key = PublicKey::import(&wire).or_exit("register-key");

    let res = rest::set_public_key(uri, &public_key.export()).or_exit("register-key");
    println!("{} ({}-bit modulus)", res.status, public_key.bits());
}
