use k256::{
    ecdh::diffie_hellman,
    elliptic_curve::{sec1::ToEncodedPoint, PrimeField},
    FieldBytes, ProjectivePoint, Scalar,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize};

use super::{CryptoError, Hash, KeyId};
use crate::serializer::{Reader, ReaderError, Serializer, Writer};

// Compressed SEC1 point size in bytes
pub const PUBLIC_KEY_SIZE: usize = 33;
// Scalar size in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
// ECDH shared secret size in bytes
pub const SHARED_SECRET_SIZE: usize = 32;

/// A secp256k1 public key, canonically valid by construction.
///
/// Parsing through [`PublicKey::from_bytes`] is the full-validity gate:
/// anything that survives it is a point on the curve and not the identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(k256::PublicKey);

#[derive(Clone)]
pub struct PrivateKey(k256::SecretKey);

#[derive(Clone)]
pub struct KeyPair {
    public_key: PublicKey,
    private_key: PrivateKey,
}

impl PublicKey {
    // Parse a 33-byte compressed point, rejecting anything off-curve
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(CryptoError::InvalidLength {
                len: bytes.len(),
                expected: PUBLIC_KEY_SIZE,
            });
        }

        let key = k256::PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(key))
    }

    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let point = self.0.to_encoded_point(true);
        let mut bytes = [0u8; PUBLIC_KEY_SIZE];
        bytes.copy_from_slice(point.as_bytes());
        bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    // The address identity of this key
    pub fn key_id(&self) -> KeyId {
        KeyId::from_pubkey_bytes(&self.to_bytes())
    }

    /// Additive tweak: `P + t*G` where `t` is the contract hash read as a
    /// scalar. Fails if the hash is not a canonical scalar or the result
    /// is the identity point.
    pub fn add_tweak(&self, contract: &Hash) -> Result<PublicKey, CryptoError> {
        let repr = FieldBytes::from(*contract.as_bytes());
        let tweak: Option<Scalar> = Scalar::from_repr(repr).into();
        let tweak = tweak.ok_or(CryptoError::InvalidTweak)?;

        let point = ProjectivePoint::from(*self.0.as_affine()) + ProjectivePoint::GENERATOR * tweak;
        k256::PublicKey::from_affine(point.to_affine())
            .map(Self)
            .map_err(|_| CryptoError::InvalidTweak)
    }
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(CryptoError::InvalidLength {
                len: bytes.len(),
                expected: PRIVATE_KEY_SIZE,
            });
        }

        let key = k256::SecretKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self(key))
    }

    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes().into()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.public_key())
    }

    /// ECDH against a counterparty public key: the X coordinate of
    /// `priv * Pub`. Symmetric: `a.shared_secret(B) == b.shared_secret(A)`.
    pub fn shared_secret(&self, counterparty: &PublicKey) -> [u8; SHARED_SECRET_SIZE] {
        let shared = diffie_hellman(self.0.to_nonzero_scalar(), counterparty.0.as_affine());
        let mut secret = [0u8; SHARED_SECRET_SIZE];
        secret.copy_from_slice(shared.raw_secret_bytes());
        secret
    }
}

impl KeyPair {
    // Generate a random new KeyPair
    pub fn generate() -> Self {
        let private_key = PrivateKey(k256::SecretKey::random(&mut OsRng));
        Self::from_private_key(private_key)
    }

    pub fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            public_key,
            private_key,
        }
    }

    pub fn get_public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn get_private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    // The address identity of the public half
    pub fn key_id(&self) -> KeyId {
        self.public_key.key_id()
    }

    // Split the KeyPair into its components
    pub fn split(self) -> (PublicKey, PrivateKey) {
        (self.public_key, self.private_key)
    }
}

impl Serializer for PublicKey {
    fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.to_bytes());
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let bytes = reader.read_bytes_ref(PUBLIC_KEY_SIZE)?;
        PublicKey::from_bytes(bytes).map_err(|_| ReaderError::InvalidValue)
    }

    fn size(&self) -> usize {
        PUBLIC_KEY_SIZE
    }
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for PublicKey {
    fn deserialize<D: Deserializer<'a>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        PublicKey::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}
