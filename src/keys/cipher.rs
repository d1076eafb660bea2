use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use super::secret::{KEY_LEN, SecretKey};
use crate::error::KeyError;

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

/// AES block and IV length in bytes
pub const IV_LEN: usize = 16;

/// Static IV of the legacy key scheme. Identical seeds therefore encrypt to
/// identical account keys.
pub const LEGACY_IV: [u8; IV_LEN] = *b"1234567890123456";

/// Symmetric cipher used to turn a seed into an account key
pub trait AccountKeyCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>, KeyError>;
}

/// AES-256 in CBC mode with PKCS#7 padding
pub struct Aes256CbcCipher {
    key: [u8; KEY_LEN],
}

impl Aes256CbcCipher {
    pub fn new(secret: &SecretKey) -> Self {
        Self {
            key: secret.key_bytes(),
        }
    }

    pub fn decrypt(&self, ciphertext: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>, KeyError> {
        let decryptor = Decryptor::new_from_slices(&self.key, iv)
            .map_err(|e| KeyError::Decryption(e.to_string()))?;

        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| KeyError::Decryption(e.to_string()))
    }
}

impl AccountKeyCipher for Aes256CbcCipher {
    fn encrypt(&self, plaintext: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>, KeyError> {
        let encryptor = Encryptor::new_from_slices(&self.key, iv)
            .map_err(|e| KeyError::Encryption(e.to_string()))?;

        Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }
}
