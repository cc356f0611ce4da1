use crate::*;
use num_bigint_dig::prime::probably_prime;
use num_bigint_dig::{BigInt, BigUint, ModInverse, RandPrime, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroize;

/// Smallest modulus accepted anywhere, generated or imported.
pub const MIN_MODULUS_BITS: usize = 1024;

/// Modulus size used by `generate_keypair`.
pub const DEFAULT_MODULUS_BITS: usize = 2048;

const PRIMALITY_ROUNDS: usize = 20;

/// Paillier public key.
///
/// Only the modulus `n` is stored; the generator is always `n + 1`. Cloning
/// is cheap, the key parameters are shared.
#[derive(Clone)]
pub struct PublicKey {
    inner: Arc<KeyParams>,
}

struct KeyParams {
    n: BigUint,
    n_squared: BigUint,
    max_int: BigUint,
}

/// Wire form of a public key: `{"n": "<decimal>"}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyWire {
    pub n: String,
}

impl PublicKey {
    /// Build a public key from its modulus, enforcing the library's minimum size.
    pub fn from_modulus(n: BigUint) -> Result<Self> {
        Self::from_modulus_with_min_bits(n, MIN_MODULUS_BITS)
    }

    /// Build a public key from its modulus, enforcing a caller-chosen minimum size.
    ///
    /// `min_bits` is raised to `MIN_MODULUS_BITS` if it is lower.
    pub fn from_modulus_with_min_bits(n: BigUint, min_bits: usize) -> Result<Self> {
        let min_bits = min_bits.max(MIN_MODULUS_BITS);

        if n.is_zero() {
            return Err(Error::InvalidKeyData("modulus must be positive".to_owned()));
        }
        if n.bits() < min_bits {
            return Err(Error::InvalidKeyData(format!(
                "modulus is {} bits, at least {} required",
                n.bits(),
                min_bits
            )));
        }
        if n.is_even() {
            return Err(Error::InvalidKeyData("modulus must be odd".to_owned()));
        }

        Ok(Self::new_unchecked(n))
    }

    fn new_unchecked(n: BigUint) -> Self {
        let n_squared = &n * &n;
        let max_int = &n / BigUint::from(3u32) - BigUint::one();

        PublicKey {
            inner: Arc::new(KeyParams {
                n,
                n_squared,
                max_int,
            }),
        }
    }

    /// Parse the wire form. Fails with `InvalidKeyData` if `n` is not a
    /// positive decimal integer or is smaller than `MIN_MODULUS_BITS`.
    pub fn import(wire: &PublicKeyWire) -> Result<Self> {
        Self::import_with_min_bits(wire, MIN_MODULUS_BITS)
    }

    pub fn import_with_min_bits(wire: &PublicKeyWire, min_bits: usize) -> Result<Self> {
        let n = serde_dec::parse(wire.n.trim()).ok_or_else(|| {
            Error::InvalidKeyData("'n' must be a positive integer string".to_owned())
        })?;
        Self::from_modulus_with_min_bits(n, min_bits)
    }

    /// Serialize to the wire form. The generator is not transmitted.
    pub fn export(&self) -> PublicKeyWire {
        PublicKeyWire {
            n: self.inner.n.to_str_radix(10),
        }
    }

    /// The modulus `n`
    pub fn n(&self) -> &BigUint {
        &self.inner.n
    }

    /// The generator, always `n + 1`
    pub fn g(&self) -> BigUint {
        &self.inner.n + BigUint::one()
    }

    /// Size of the modulus in bits
    pub fn bits(&self) -> usize {
        self.inner.n.bits()
    }

    pub(crate) fn n_squared(&self) -> &BigUint {
        &self.inner.n_squared
    }

    /// Largest magnitude that can be encoded as a plaintext.
    pub(crate) fn max_int(&self) -> &BigUint {
        &self.inner.max_int
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.n == other.inner.n
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let digits = self.inner.n.to_str_radix(16);
        let fingerprint = &digits[..digits.len().min(16)];
        f.debug_struct("PublicKey")
            .field("bits", &self.bits())
            .field("n", &format_args!("{}…", fingerprint))
            .finish()
    }
}

/// Paillier private key.
///
/// Holds the factorization of `n` and the derived decryption constants. All
/// secret values are wiped when the key is dropped.
pub struct PrivateKey {
    public_key: PublicKey,
    p: BigUint,
    q: BigUint,
    lambda: BigUint,
    mu: BigUint,
}

/// Persisted form of a private key: the two primes as decimal strings.
#[derive(Serialize, Deserialize, Clone)]
pub struct PrivateKeyWire {
    #[serde(with = "serde_dec")]
    pub p: BigUint,

    #[serde(with = "serde_dec")]
    pub q: BigUint,
}

impl Zeroize for PrivateKeyWire {
    fn zeroize(&mut self) {
        self.p.zeroize();
        self.q.zeroize();
    }
}

impl Drop for PrivateKeyWire {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl PrivateKey {
    /// Rebuild a private key from its primes.
    ///
    /// The primes must be distinct, probably prime, and give a modulus of at
    /// least `MIN_MODULUS_BITS`.
    pub fn from_primes(p: BigUint, q: BigUint) -> Result<Self> {
        if p == q {
            return Err(Error::InvalidKeyData("p and q must be distinct".to_owned()));
        }
        if !probably_prime(&p, PRIMALITY_ROUNDS) || !probably_prime(&q, PRIMALITY_ROUNDS) {
            return Err(Error::InvalidKeyData("p and q must be prime".to_owned()));
        }

        let n = &p * &q;
        if n.bits() < MIN_MODULUS_BITS {
            return Err(Error::InvalidKeyData(format!(
                "modulus is {} bits, at least {} required",
                n.bits(),
                MIN_MODULUS_BITS
            )));
        }

        Self::derive(p, q)
    }

    fn derive(p: BigUint, q: BigUint) -> Result<Self> {
        let n = &p * &q;
        let p_minus_one = &p - BigUint::one();
        let q_minus_one = &q - BigUint::one();

        if !n.gcd(&(&p_minus_one * &q_minus_one)).is_one() {
            return Err(Error::InvalidKeyData(
                "gcd(n, (p-1)(q-1)) must be 1".to_owned(),
            ));
        }

        // With g = n + 1, L(g^lambda mod n^2) = lambda mod n, so mu = lambda^-1 mod n
        let lambda = p_minus_one.lcm(&q_minus_one);
        let modulus = BigInt::from_biguint(Sign::Plus, n.clone());
        let mu = lambda
            .clone()
            .mod_inverse(&n)
            .map(|inverse| inverse.mod_floor(&modulus))
            .and_then(|inverse| inverse.to_biguint())
            .ok_or_else(|| Error::InvalidKeyData("lambda is not invertible mod n".to_owned()))?;

        Ok(PrivateKey {
            public_key: PublicKey::new_unchecked(n),
            p,
            q,
            lambda,
            mu,
        })
    }

    /// The public key this private key decrypts for
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn import(wire: &PrivateKeyWire) -> Result<Self> {
        Self::from_primes(wire.p.clone(), wire.q.clone())
    }

    pub fn export(&self) -> PrivateKeyWire {
        PrivateKeyWire {
            p: self.p.clone(),
            q: self.q.clone(),
        }
    }

    pub(crate) fn lambda(&self) -> &BigUint {
        &self.lambda
    }

    pub(crate) fn mu(&self) -> &BigUint {
        &self.mu
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.p.zeroize();
        self.q.zeroize();
        self.lambda.zeroize();
        self.mu.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Generate a fresh keypair with a `DEFAULT_MODULUS_BITS` modulus.
pub fn generate_keypair() -> Result<(PublicKey, PrivateKey)> {
    generate_keypair_with_bits(DEFAULT_MODULUS_BITS)
}

pub fn generate_keypair_with_bits(bits: usize) -> Result<(PublicKey, PrivateKey)> {
    let mut csprng = rand::rngs::OsRng;
    generate_keypair_with_rng(&mut csprng, bits)
}

/// Generate a keypair from the given randomness source, which must be
/// cryptographically secure outside of tests.
pub fn generate_keypair_with_rng<R: Rng + ?Sized>(
    rng: &mut R,
    bits: usize,
) -> Result<(PublicKey, PrivateKey)> {
    if bits < MIN_MODULUS_BITS {
        return Err(Error::InvalidKeyData(format!(
            "requested {} bit modulus, at least {} required",
            bits, MIN_MODULUS_BITS
        )));
    }

    loop {
        let p = rng.gen_prime(bits / 2);
        let q = rng.gen_prime(bits - bits / 2);
        if p == q || (&p * &q).bits() != bits {
            continue;
        }

        let private_key = PrivateKey::derive(p, q)?;
        let public_key = private_key.public_key().clone();
        debug!("generated {} bit keypair", bits);

        return Ok((public_key, private_key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::keypair;

    #[test]
    fn test_generated_key_size() {
        let (public_key, private_key) = keypair();
        assert_eq!(public_key.bits(), MIN_MODULUS_BITS);
        assert_eq!(private_key.public_key(), public_key);
        assert_eq!(public_key.g(), public_key.n() + BigUint::one());
    }

    #[test]
    fn test_public_key_wire() {
        let (public_key, _) = keypair();
        let wire = public_key.export();
        let json = serde_json::to_string(&wire).unwrap();
        let parsed: PublicKeyWire = serde_json::from_str(&json).unwrap();

        assert_eq!(&PublicKey::import(&parsed).unwrap(), public_key);
    }

    #[test]
    fn test_import_rejects_bad_modulus() {
        let bad = |n: &str| PublicKey::import(&PublicKeyWire { n: n.to_owned() });

        assert!(matches!(bad("abc"), Err(Error::InvalidKeyData(_))));
        assert!(matches!(bad("-17"), Err(Error::InvalidKeyData(_))));
        assert!(matches!(bad(""), Err(Error::InvalidKeyData(_))));
        assert!(matches!(bad("0"), Err(Error::InvalidKeyData(_))));
        assert!(matches!(bad("3233"), Err(Error::InvalidKeyData(_))));
    }

    #[test]
    fn test_import_enforces_caller_minimum() {
        let (public_key, _) = keypair();
        let wire = public_key.export();

        assert!(PublicKey::import_with_min_bits(&wire, 1024).is_ok());
        assert!(matches!(
            PublicKey::import_with_min_bits(&wire, 2048),
            Err(Error::InvalidKeyData(_))
        ));
    }

    #[test]
    fn test_private_key_roundtrip() {
        let (public_key, private_key) = keypair();
        let json = serde_json::to_string(&private_key.export()).unwrap();
        let wire: PrivateKeyWire = serde_json::from_str(&json).unwrap();
        let restored = PrivateKey::import(&wire).unwrap();

        assert_eq!(restored.public_key(), public_key);
        assert_eq!(restored.lambda(), private_key.lambda());
        assert_eq!(restored.mu(), private_key.mu());
    }

    #[test]
    fn test_from_primes_rejects_bad_primes() {
        let (_, private_key) = keypair();
        let wire = private_key.export();

        let same = PrivateKey::from_primes(wire.p.clone(), wire.p.clone());
        assert!(matches!(same, Err(Error::InvalidKeyData(_))));

        let composite = &wire.p + BigUint::one();
        let not_prime = PrivateKey::from_primes(composite, wire.q.clone());
        assert!(matches!(not_prime, Err(Error::InvalidKeyData(_))));

        let small = PrivateKey::from_primes(BigUint::from(61u32), BigUint::from(53u32));
        assert!(matches!(small, Err(Error::InvalidKeyData(_))));
    }

    #[test]
    fn test_rejects_small_generation() {
        assert!(matches!(
            generate_keypair_with_bits(512),
            Err(Error::InvalidKeyData(_))
        ));
    }
}
