//! Account key generation.
//!
//! The legacy scheme derives a 16-character seed from the wall clock and a
//! small random draw, then encrypts it with AES-256-CBC under a static IV.
//! The result is unique in practice but not secret: the seed is guessable
//! from the creation time and equal seeds give equal keys. `KeyScheme::Secure`
//! draws the seed from the OS generator and uses a fresh IV per key.

mod cipher;
mod secret;

pub use cipher::{AccountKeyCipher, Aes256CbcCipher, IV_LEN, LEGACY_IV};
pub use secret::{SecretKey, SecretSource};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde::Deserialize;
use tracing::warn;

use crate::error::KeyError;

/// Number of characters kept from the seed
pub const SEED_LEN: usize = 16;

const DRAW_LOW: u32 = 1000;
const DRAW_HIGH: u32 = 9999;

/// How new account keys are produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScheme {
    /// Time-based seed, static IV
    #[default]
    Legacy,
    /// Random seed, per-key IV stored in front of the ciphertext
    Secure,
}

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of random values for seeds and IVs
pub trait RandomSource: Send + Sync {
    /// Uniform integer in `low..=high`
    fn draw(&self, low: u32, high: u32) -> u32;

    fn fill_bytes(&self, buf: &mut [u8]);

    /// `len` random ASCII letters and digits
    fn alphanumeric(&self, len: usize) -> String;
}

/// Thread-local generator for the seed draw, OS generator for key material
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&self, low: u32, high: u32) -> u32 {
        rand::thread_rng().gen_range(low..=high)
    }

    fn fill_bytes(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }

    fn alphanumeric(&self, len: usize) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }
}

/// Produces encrypted account keys for new clients
pub struct KeyGenerator {
    scheme: KeyScheme,
    clock: Box<dyn Clock>,
    random: Box<dyn RandomSource>,
    cipher: Box<dyn AccountKeyCipher>,
}

impl KeyGenerator {
    /// Generator backed by the system clock, thread RNG, and AES-256-CBC
    pub fn new(scheme: KeyScheme, secret: SecretKey) -> Self {
        if secret.source() == SecretSource::Fallback {
            warn!("No SECRET_KEY configured, account keys use the built-in fallback secret");
        }
        if scheme == KeyScheme::Legacy {
            warn!("Legacy account key scheme in use: keys are predictable from their creation time");
        }

        Self::with_sources(
            scheme,
            Box::new(SystemClock),
            Box::new(ThreadRandom),
            Box::new(Aes256CbcCipher::new(&secret)),
        )
    }

    pub fn with_sources(
        scheme: KeyScheme,
        clock: Box<dyn Clock>,
        random: Box<dyn RandomSource>,
        cipher: Box<dyn AccountKeyCipher>,
    ) -> Self {
        Self {
            scheme,
            clock,
            random,
            cipher,
        }
    }

    /// Timestamp digits (seconds plus four fractional digits, no point)
    /// followed by a draw from 1000..=9999, cut to 16 characters
    pub fn generate_seed(&self) -> String {
        let now = self.clock.now();
        let fraction = now.timestamp_subsec_micros() / 100;
        let draw = self.random.draw(DRAW_LOW, DRAW_HIGH);

        let mut seed = format!("{}{:04}{}", now.timestamp(), fraction, draw);
        seed.truncate(SEED_LEN);
        seed
    }

    /// Generate a seed and encrypt it into a base64 account key
    pub fn encrypt_account_key(&self) -> Result<String, KeyError> {
        match self.scheme {
            KeyScheme::Legacy => {
                let seed = self.generate_seed();
                let ciphertext = self.cipher.encrypt(seed.as_bytes(), &LEGACY_IV)?;
                Ok(STANDARD.encode(ciphertext))
            }
            KeyScheme::Secure => {
                let seed = self.random.alphanumeric(SEED_LEN);
                let mut iv = [0u8; IV_LEN];
                self.random.fill_bytes(&mut iv);

                let ciphertext = self.cipher.encrypt(seed.as_bytes(), &iv)?;

                let mut stored = Vec::with_capacity(IV_LEN + ciphertext.len());
                stored.extend_from_slice(&iv);
                stored.extend_from_slice(&ciphertext);
                Ok(STANDARD.encode(stored))
            }
        }
    }
}

/// Recover the seed behind an account key produced under `scheme`
pub fn reveal_seed(
    cipher: &Aes256CbcCipher,
    scheme: KeyScheme,
    account_key: &str,
) -> Result<String, KeyError> {
    let bytes = STANDARD.decode(account_key)?;

    let plaintext = match scheme {
        KeyScheme::Legacy => cipher.decrypt(&bytes, &LEGACY_IV)?,
        KeyScheme::Secure => {
            if bytes.len() <= IV_LEN {
                return Err(KeyError::Decryption("account key too short".to_string()));
            }
            let (iv, ciphertext) = bytes.split_at(IV_LEN);
            let mut iv_block = [0u8; IV_LEN];
            iv_block.copy_from_slice(iv);
            cipher.decrypt(ciphertext, &iv_block)?
        }
    };

    String::from_utf8(plaintext).map_err(|e| KeyError::Decryption(e.to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Clock that starts at a fixed instant and advances by `step` on each read
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: chrono::Duration,
    }

    impl SteppingClock {
        pub fn new(secs: i64, micros: u32, step: chrono::Duration) -> Self {
            let start = Utc.timestamp_opt(secs, micros * 1000).unwrap();
            Self {
                next: Mutex::new(start),
                step,
            }
        }

        pub fn fixed(secs: i64, micros: u32) -> Self {
            Self::new(secs, micros, chrono::Duration::zero())
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap();
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// Always draws the same number and byte
    pub struct FixedRandom(pub u32);

    impl RandomSource for FixedRandom {
        fn draw(&self, _low: u32, _high: u32) -> u32 {
            self.0
        }

        fn fill_bytes(&self, buf: &mut [u8]) {
            buf.fill(7);
        }

        fn alphanumeric(&self, len: usize) -> String {
            "A".repeat(len)
        }
    }

    pub struct FailingCipher;

    impl AccountKeyCipher for FailingCipher {
        fn encrypt(&self, _plaintext: &[u8], _iv: &[u8; IV_LEN]) -> Result<Vec<u8>, KeyError> {
            Err(KeyError::Encryption("cipher unavailable".to_string()))
        }
    }

    pub fn test_secret() -> SecretKey {
        SecretKey::new("test-secret", SecretSource::Environment)
    }

    pub fn legacy_generator(clock: SteppingClock, draw: u32) -> KeyGenerator {
        KeyGenerator::with_sources(
            KeyScheme::Legacy,
            Box::new(clock),
            Box::new(FixedRandom(draw)),
            Box::new(Aes256CbcCipher::new(&test_secret())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn seed_is_timestamp_then_draw_cut_to_sixteen() {
        let generator = legacy_generator(SteppingClock::fixed(1_700_000_000, 123_456), 4242);

        // "1700000000" + "1234" + "4242", first 16 characters
        assert_eq!(generator.generate_seed(), "1700000000123442");
    }

    #[test]
    fn seed_fraction_is_zero_padded() {
        let generator = legacy_generator(SteppingClock::fixed(1_700_000_000, 5_000), 9999);
        assert_eq!(generator.generate_seed(), "1700000000005099");
    }

    #[test]
    fn seed_draw_stays_in_range() {
        let random = ThreadRandom;
        for _ in 0..1000 {
            let n = random.draw(DRAW_LOW, DRAW_HIGH);
            assert!((1000..=9999).contains(&n));
        }
    }

    #[test]
    fn quick_successive_keys_differ_even_with_same_draw() {
        let clock = SteppingClock::new(1_700_000_000, 0, chrono::Duration::milliseconds(1));
        let generator = legacy_generator(clock, 1234);

        let first = generator.encrypt_account_key().unwrap();
        let second = generator.encrypt_account_key().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn legacy_key_is_deterministic_for_fixed_inputs() {
        let a = legacy_generator(SteppingClock::fixed(1_700_000_000, 123_456), 4242)
            .encrypt_account_key()
            .unwrap();
        let b = legacy_generator(SteppingClock::fixed(1_700_000_000, 123_456), 4242)
            .encrypt_account_key()
            .unwrap();

        assert_eq!(a, b);
        // Two cipher blocks, base64 encoded
        assert_eq!(a.len(), 44);

        let cipher = Aes256CbcCipher::new(&test_secret());
        assert_eq!(
            reveal_seed(&cipher, KeyScheme::Legacy, &a).unwrap(),
            "1700000000123442"
        );
    }

    #[test]
    fn secure_key_carries_its_iv() {
        let generator = KeyGenerator::with_sources(
            KeyScheme::Secure,
            Box::new(SteppingClock::fixed(1_700_000_000, 0)),
            Box::new(FixedRandom(1000)),
            Box::new(Aes256CbcCipher::new(&test_secret())),
        );

        let key = generator.encrypt_account_key().unwrap();
        let bytes = STANDARD.decode(&key).unwrap();
        assert_eq!(bytes.len(), IV_LEN + 32);
        assert_eq!(&bytes[..IV_LEN], &[7u8; IV_LEN]);

        let cipher = Aes256CbcCipher::new(&test_secret());
        assert_eq!(
            reveal_seed(&cipher, KeyScheme::Secure, &key).unwrap(),
            "A".repeat(SEED_LEN)
        );
    }

    #[test]
    fn secure_keys_are_distinct_with_real_randomness() {
        let generator = KeyGenerator::new(KeyScheme::Secure, test_secret());

        let first = generator.encrypt_account_key().unwrap();
        let second = generator.encrypt_account_key().unwrap();
        assert_ne!(first, second);

        let cipher = Aes256CbcCipher::new(&test_secret());
        let seed = reveal_seed(&cipher, KeyScheme::Secure, &first).unwrap();
        assert_eq!(seed.len(), SEED_LEN);
        assert!(seed.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn cipher_failure_surfaces_as_encryption_error() {
        let generator = KeyGenerator::with_sources(
            KeyScheme::Legacy,
            Box::new(SystemClock),
            Box::new(ThreadRandom),
            Box::new(FailingCipher),
        );

        let err = generator.encrypt_account_key().unwrap_err();
        assert!(matches!(err, KeyError::Encryption(_)));
    }

    #[test]
    fn reveal_rejects_garbage() {
        let cipher = Aes256CbcCipher::new(&test_secret());
        assert!(matches!(
            reveal_seed(&cipher, KeyScheme::Legacy, "not base64!"),
            Err(KeyError::Encoding(_))
        ));
        assert!(matches!(
            reveal_seed(&cipher, KeyScheme::Secure, "AAAA"),
            Err(KeyError::Decryption(_))
        ));
    }
}
