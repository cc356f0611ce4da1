use crate::*;
use std::path::PathBuf;

// Key generation dominates test time, so each test binary makes two keys once.
lazy_static! {
    static ref KEYPAIR: (PublicKey, PrivateKey) =
        generate_keypair_with_bits(MIN_MODULUS_BITS).unwrap();
    static ref OTHER_KEYPAIR: (PublicKey, PrivateKey) =
        generate_keypair_with_bits(MIN_MODULUS_BITS).unwrap();
}

pub fn keypair() -> &'static (PublicKey, PrivateKey) {
    &KEYPAIR
}

pub fn other_keypair() -> &'static (PublicKey, PrivateKey) {
    &OTHER_KEYPAIR
}

/// A fresh empty directory under the system temp dir
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tallybox-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
