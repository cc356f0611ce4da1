use crate::*;
use num_bigint_dig::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand::{CryptoRng, Rng};
use std::fmt;
use zeroize::Zeroizing;

/// Base of the scaling exponent: a value is `mantissa * EXPONENT_BASE^exponent`
pub const EXPONENT_BASE: u32 = 16;

/// Largest exponent magnitude accepted from the wire.
pub const MAX_EXPONENT: i32 = 128;

fn exponent_in_range(exponent: i32) -> bool {
    (-MAX_EXPONENT..=MAX_EXPONENT).contains(&exponent)
}

/// A value encrypted under a specific public key.
///
/// The plaintext is `mantissa * 16^exponent`, where the mantissa is what the
/// ciphertext actually hides.
#[derive(Clone)]
pub struct EncryptedValue {
    public_key: PublicKey,
    ciphertext: BigUint,
    exponent: i32,
}

/// Wire form of an encrypted value.
///
/// The ciphertext travels as a decimal string so no precision is lost.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EncryptedWire {
    pub ciphertext: String,
    pub exponent: i32,
}

impl PublicKey {
    /// Encrypt an integer using the operating system's randomness.
    pub fn encrypt(&self, plaintext: i64) -> Result<EncryptedValue> {
        let mut csprng = rand::rngs::OsRng;
        self.encrypt_with_rng(&mut csprng, plaintext)
    }

    pub fn encrypt_with_rng<R: Rng + CryptoRng + ?Sized>(
        &self,
        rng: &mut R,
        plaintext: i64,
    ) -> Result<EncryptedValue> {
        self.encrypt_scaled_with_rng(rng, plaintext, 0)
    }

    /// Encrypt `mantissa * 16^exponent` without folding the scale into the mantissa.
    pub fn encrypt_scaled_with_rng<R: Rng + CryptoRng + ?Sized>(
        &self,
        rng: &mut R,
        mantissa: i64,
        exponent: i32,
    ) -> Result<EncryptedValue> {
        if !exponent_in_range(exponent) {
            return Err(Error::EncryptionError(format!(
                "exponent {} outside [-{max}, {max}]",
                exponent,
                max = MAX_EXPONENT
            )));
        }

        let encoded = Zeroizing::new(self.encode(mantissa)?);
        let ciphertext = self.raw_encrypt(rng, &encoded);

        Ok(EncryptedValue {
            public_key: self.clone(),
            ciphertext,
            exponent,
        })
    }

    /// Map a signed integer into Z_n, negatives wrapping to `n - |x|`.
    fn encode(&self, value: i64) -> Result<BigUint> {
        let magnitude = BigUint::from(value.unsigned_abs());
        if &magnitude > self.max_int() {
            return Err(Error::EncryptionError(
                "plaintext is out of range for this modulus".to_owned(),
            ));
        }

        if value < 0 {
            Ok(self.n() - magnitude)
        } else {
            Ok(magnitude)
        }
    }

    /// c = (1 + n*m) * r^n mod n^2
    fn raw_encrypt<R: Rng + CryptoRng + ?Sized>(&self, rng: &mut R, m: &BigUint) -> BigUint {
        let n = self.n();
        let n_squared = self.n_squared();

        // g^m mod n^2 collapses to 1 + n*m because g = n + 1
        let nude = (n * m + BigUint::one()) % n_squared;

        let r = loop {
            let candidate = rng.gen_biguint_below(n);
            if !candidate.is_zero() && candidate.gcd(n).is_one() {
                break candidate;
            }
        };
        let obfuscator = r.modpow(n, n_squared);

        (nude * obfuscator) % n_squared
    }

    /// A valid ciphertext is a unit of Z_{n^2}.
    pub(crate) fn is_valid_ciphertext(&self, c: &BigUint) -> bool {
        !c.is_zero() && c < self.n_squared() && c.gcd(self.n()).is_one()
    }
}

impl EncryptedValue {
    /// Reconstruct an encrypted value from its wire form under the given key.
    ///
    /// Fails with `InvalidCiphertext` if the ciphertext is not a decimal
    /// integer, is not a unit modulo n^2, or the exponent is out of range.
    pub fn from_wire(wire: &EncryptedWire, public_key: &PublicKey) -> Result<Self> {
        let ciphertext = serde_dec::parse(wire.ciphertext.trim()).ok_or_else(|| {
            Error::InvalidCiphertext("ciphertext must be a decimal integer string".to_owned())
        })?;

        if !public_key.is_valid_ciphertext(&ciphertext) {
            return Err(Error::InvalidCiphertext(
                "ciphertext is not a valid residue modulo n^2".to_owned(),
            ));
        }

        if !exponent_in_range(wire.exponent) {
            return Err(Error::InvalidCiphertext(format!(
                "exponent {} outside [-{max}, {max}]",
                wire.exponent,
                max = MAX_EXPONENT
            )));
        }

        Ok(EncryptedValue {
            public_key: public_key.clone(),
            ciphertext,
            exponent: wire.exponent,
        })
    }

    pub fn to_wire(&self) -> EncryptedWire {
        EncryptedWire {
            ciphertext: self.ciphertext.to_str_radix(10),
            exponent: self.exponent,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn ciphertext(&self) -> &BigUint {
        &self.ciphertext
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Homomorphic addition.
    ///
    /// The operand with the larger exponent is rescaled down to the smaller
    /// one first, so both sides encode the same scale.
    pub fn add(&self, other: &EncryptedValue) -> Result<EncryptedValue> {
        if self.public_key != other.public_key {
            return Err(Error::MismatchedKey);
        }

        let (a, b) = match self.exponent.cmp(&other.exponent) {
            std::cmp::Ordering::Greater => (self.decrease_exponent_to(other.exponent)?, other.clone()),
            std::cmp::Ordering::Less => (self.clone(), other.decrease_exponent_to(self.exponent)?),
            std::cmp::Ordering::Equal => (self.clone(), other.clone()),
        };

        let sum = (&a.ciphertext * &b.ciphertext) % self.public_key.n_squared();

        Ok(EncryptedValue {
            public_key: a.public_key,
            ciphertext: sum,
            exponent: a.exponent,
        })
    }

    /// Re-express this value at a lower exponent by multiplying the hidden
    /// mantissa by `16^(exponent - new_exponent)`.
    pub fn decrease_exponent_to(&self, new_exponent: i32) -> Result<EncryptedValue> {
        if new_exponent > self.exponent {
            return Err(Error::EncryptionError(format!(
                "cannot raise exponent from {} to {}",
                self.exponent, new_exponent
            )));
        }
        if !exponent_in_range(new_exponent) {
            return Err(Error::EncryptionError(format!(
                "exponent {} outside [-{max}, {max}]",
                new_exponent,
                max = MAX_EXPONENT
            )));
        }

        // No legal pair of exponents is further apart than 2 * MAX_EXPONENT
        let steps = self
            .exponent
            .checked_sub(new_exponent)
            .filter(|steps| *steps <= 2 * MAX_EXPONENT)
            .ok_or_else(|| {
                Error::EncryptionError(format!(
                    "cannot rescale from exponent {} to {}",
                    self.exponent, new_exponent
                ))
            })? as usize;
        let factor = num_traits::pow(BigUint::from(EXPONENT_BASE), steps);
        let ciphertext = self
            .ciphertext
            .modpow(&factor, self.public_key.n_squared());

        Ok(EncryptedValue {
            public_key: self.public_key.clone(),
            ciphertext,
            exponent: new_exponent,
        })
    }
}

impl PartialEq for EncryptedValue {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
            && self.exponent == other.exponent
            && self.ciphertext == other.ciphertext
    }
}

impl Eq for EncryptedValue {}

impl fmt::Debug for EncryptedValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EncryptedValue")
            .field("public_key", &self.public_key)
            .field("ciphertext_bits", &self.ciphertext.bits())
            .field("exponent", &self.exponent)
            .finish()
    }
}

impl PrivateKey {
    /// Decrypt to an integer.
    ///
    /// Fails with `MismatchedKey` if the value belongs to another key, and with
    /// `DecryptionError` if the ciphertext is not a valid residue, the mantissa
    /// overflowed, or the scaled result is not an integer that fits an `i64`.
    pub fn decrypt(&self, value: &EncryptedValue) -> Result<i64> {
        if value.public_key() != self.public_key() {
            return Err(Error::MismatchedKey);
        }

        let mantissa = Zeroizing::new(self.raw_decrypt(value.ciphertext())?);
        let mantissa = self.decode(&mantissa)?;

        let scale = num_traits::pow(
            BigInt::from(EXPONENT_BASE),
            value.exponent().unsigned_abs() as usize,
        );
        let scaled = if value.exponent() >= 0 {
            mantissa * scale
        } else {
            if !mantissa.is_multiple_of(&scale) {
                return Err(Error::DecryptionError(
                    "decrypted value is not an integer".to_owned(),
                ));
            }
            mantissa / scale
        };

        scaled.to_i64().ok_or_else(|| {
            Error::DecryptionError("decrypted value does not fit in 64 bits".to_owned())
        })
    }

    /// m = L(c^lambda mod n^2) * mu mod n, where L(u) = (u - 1) / n
    fn raw_decrypt(&self, c: &BigUint) -> Result<BigUint> {
        let public_key = self.public_key();
        if !public_key.is_valid_ciphertext(c) {
            return Err(Error::DecryptionError(
                "ciphertext is not a valid residue modulo n^2".to_owned(),
            ));
        }

        let n = public_key.n();
        let u = c.modpow(self.lambda(), public_key.n_squared());
        let l = (u - BigUint::one()) / n;

        Ok((l * self.mu()) % n)
    }

    /// Inverse of `PublicKey::encode`
    fn decode(&self, m: &BigUint) -> Result<BigInt> {
        let public_key = self.public_key();
        let max_int = public_key.max_int();
        let n = public_key.n();

        if m <= max_int {
            Ok(BigInt::from_biguint(Sign::Plus, m.clone()))
        } else if m >= &(n - max_int) {
            Ok(-BigInt::from_biguint(Sign::Plus, n - m))
        } else {
            Err(Error::DecryptionError(
                "decrypted mantissa overflowed the encodable range".to_owned(),
            ))
        }
    }
}
