use std::collections::HashMap;

use crate::crypto::{KeyId, PrivateKey, PublicKey};

/// Access to the node's own private keys during registration decoding.
///
/// A KYC authority node holds the KYC private keys and decrypts payloads
/// addressed to it. A client node holds its onboarding keys instead and
/// uses them to recognize its own registrations.
pub trait KeyStore {
    /// Private key whose public key hashes to the given address, if held.
    fn get_key(&self, key_id: &KeyId) -> Option<PrivateKey>;

    /// The KYC public key this node registers under, when configured.
    fn kyc_pub_key(&self) -> Option<PublicKey>;
}

#[derive(Default)]
pub struct MemoryKeyStore {
    keys: HashMap<KeyId, PrivateKey>,
    kyc_pub_key: Option<PublicKey>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Keys are indexed by the identity of their public key
    pub fn insert(&mut self, key: PrivateKey) {
        self.keys.insert(key.public_key().key_id(), key);
    }

    pub fn set_kyc_pub_key(&mut self, pub_key: PublicKey) {
        self.kyc_pub_key = Some(pub_key);
    }
}

impl KeyStore for MemoryKeyStore {
    fn get_key(&self, key_id: &KeyId) -> Option<PrivateKey> {
        self.keys.get(key_id).cloned()
    }

    fn kyc_pub_key(&self) -> Option<PublicKey> {
        self.kyc_pub_key.clone()
    }
}
