use crate::{arg, expand, write_json, OrExit};
use log::info;
use std::path::Path;

pub fn command_keygen(matches: &clap::ArgMatches) {
    let bits: usize = arg(matches, "bits").parse().or_exit("keygen");
    let public_path = expand(arg(matches, "public-key"));
    let private_path = expand(arg(matches, "private-key"));

    let (public, private) = tallybox::generate_keypair_with_bits(bits).or_exit("keygen");

    write_json(&public_path, &public.export()).or_exit("keygen");
    write_private(Path::new(&private_path), &private).or_exit("keygen");
    info!("generated a {}-bit keypair", public.bits());

    println!("public-key: {}", public_path);
    println!("private-key: {}", private_path);
}

// Private keys are readable by the owner only
#[cfg(unix)]
fn write_private(path: &Path, private: &tallybox::PrivateKey) -> tallybox::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let json = serde_json::to_string_pretty(&private.export())?;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, private: &tallybox::PrivateKey) -> tallybox::Result<()> {
    write_json(path, &private.export())
}
