//! Homomorphic yes/no tallying.
//!
//! Voters encrypt a 0/1 vote under a Paillier public key and submit it to an
//! untrusted [`AggregationService`], which only ever multiplies ciphertexts
//! into a running sum. The key-holder decrypts that single sum into a
//! [`TallyResult`]. Alongside each vote a voter publishes a hash
//! [`Commitment`] that can later be opened to prove what they voted, without
//! that proof touching the tally.

#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate lazy_static;

mod aggregation;
mod authn;
mod ciphertext;
mod commitment;
mod error;
mod keygen;
pub mod messages;
pub mod serde_dec;
mod store;
mod tally;
mod vote;

pub use aggregation::*;
pub use authn::*;
pub use ciphertext::*;
pub use commitment::*;
pub use error::*;
pub use keygen::*;
pub use store::*;
pub use tally::*;
pub use vote::*;

#[cfg(test)]
mod testutil;
