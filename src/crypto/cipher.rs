use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;

// 256-bit symmetric key
pub const CIPHER_KEY_SIZE: usize = 32;
// 128-bit initialization vector
pub const CIPHER_IV_SIZE: usize = 16;

type Aes256Ctr = Ctr128BE<Aes256>;

/// Fixed key/IV symmetric context over a byte buffer.
///
/// AES-256-CTR: ciphertext length equals plaintext length and there is no
/// authentication tag. Tampering is caught downstream by the per-entry
/// validity checks on the decrypted payload.
pub struct CipherContext {
    key: [u8; CIPHER_KEY_SIZE],
    iv: [u8; CIPHER_IV_SIZE],
}

impl CipherContext {
    pub fn new(key: [u8; CIPHER_KEY_SIZE], iv: [u8; CIPHER_IV_SIZE]) -> Self {
        CipherContext { key, iv }
    }

    // A fresh keystream for every call keeps encrypt/decrypt deterministic
    fn apply(&self, data: &[u8]) -> Vec<u8> {
        let mut buffer = data.to_vec();
        let mut cipher = Aes256Ctr::new(&self.key.into(), &self.iv.into());
        cipher.apply_keystream(&mut buffer);
        buffer
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        self.apply(plaintext)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8> {
        self.apply(ciphertext)
    }

    pub fn iv(&self) -> [u8; CIPHER_IV_SIZE] {
        self.iv
    }
}
