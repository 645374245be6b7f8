use super::cipher::{CipherContext, CIPHER_IV_SIZE, CIPHER_KEY_SIZE};
use super::key::{PrivateKey, PublicKey};
use super::random::secure_random_bytes;

/// Confidential channel between two key pairs.
///
/// The ECDH shared secret of one party's private key and the other's
/// public key feeds a [`CipherContext`]; symmetry of the exchange means
/// both ends derive the same context from opposite halves. The IV is not
/// part of the exchange and travels with the message.
pub struct Ecies {
    cipher: CipherContext,
}

impl Ecies {
    /// Fresh random key and IV, no counterparty. Used when the symmetric
    /// session is distributed by some other means.
    pub fn new_random() -> Self {
        let key: [u8; CIPHER_KEY_SIZE] = secure_random_bytes();
        let iv: [u8; CIPHER_IV_SIZE] = secure_random_bytes();
        Ecies {
            cipher: CipherContext::new(key, iv),
        }
    }

    /// Sender mode: derive the shared secret and generate a random IV to
    /// be transmitted alongside the message.
    pub fn new(private_key: &PrivateKey, counterparty: &PublicKey) -> Self {
        let secret = private_key.shared_secret(counterparty);
        Ecies {
            cipher: CipherContext::new(secret, secure_random_bytes()),
        }
    }

    /// Receiver mode: derive the shared secret and reuse the IV that came
    /// with the message.
    pub fn new_with_iv(
        private_key: &PrivateKey,
        counterparty: &PublicKey,
        iv: [u8; CIPHER_IV_SIZE],
    ) -> Self {
        let secret = private_key.shared_secret(counterparty);
        Ecies {
            cipher: CipherContext::new(secret, iv),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        self.cipher.encrypt(plaintext)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8> {
        self.cipher.decrypt(ciphertext)
    }

    pub fn iv(&self) -> [u8; CIPHER_IV_SIZE] {
        self.cipher.iv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::KeyPair;

    #[test]
    fn test_two_party_exchange() {
        let authority = KeyPair::generate();
        let client = KeyPair::generate();

        // Client encrypts towards the authority
        let sender = Ecies::new(client.get_private_key(), authority.get_public_key());
        let message = b"20 byte address here + 33 byte pubkey follows";
        let ciphertext = sender.encrypt(message);
        assert_ne!(&ciphertext[..], &message[..]);

        // Authority decrypts with its own private key and the client's public key
        let receiver = Ecies::new_with_iv(
            authority.get_private_key(),
            client.get_public_key(),
            sender.iv(),
        );
        assert_eq!(receiver.decrypt(&ciphertext), message);
    }

    #[test]
    fn test_wrong_key_produces_garbage() {
        let authority = KeyPair::generate();
        let client = KeyPair::generate();
        let stranger = KeyPair::generate();

        let sender = Ecies::new(client.get_private_key(), authority.get_public_key());
        let ciphertext = sender.encrypt(b"not for strangers");

        let eavesdropper = Ecies::new_with_iv(
            stranger.get_private_key(),
            client.get_public_key(),
            sender.iv(),
        );
        assert_ne!(eavesdropper.decrypt(&ciphertext), b"not for strangers");
    }

    #[test]
    fn test_random_session_roundtrip() {
        let session = Ecies::new_random();
        let message = b"bootstrap";
        assert_eq!(session.decrypt(&session.encrypt(message)), message);
    }
}
