use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use ripemd::Ripemd160;
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt::{Display, Error, Formatter},
    str::FromStr,
};

pub const KEY_ID_SIZE: usize = 20; // RIPEMD160 output

/// The address identity tracked by every policy list: the 20-byte
/// `RIPEMD160(SHA256(pubkey))` digest of a compressed public key.
#[derive(Eq, PartialEq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct KeyId([u8; KEY_ID_SIZE]);

impl KeyId {
    pub const fn new(bytes: [u8; KEY_ID_SIZE]) -> Self {
        KeyId(bytes)
    }

    pub const fn zero() -> Self {
        KeyId::new([0; KEY_ID_SIZE])
    }

    // Identity of a serialized compressed public key
    pub fn from_pubkey_bytes(bytes: &[u8]) -> Self {
        let sha = Sha256::digest(bytes);
        let ripe = Ripemd160::digest(sha);
        KeyId(ripe.into())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_ID_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for KeyId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| "Invalid hex string")?;
        let bytes: [u8; KEY_ID_SIZE] = bytes.try_into().map_err(|_| "Invalid key id")?;
        Ok(KeyId::new(bytes))
    }
}

impl Serializer for KeyId {
    fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(KeyId::new(reader.read_bytes_array::<KEY_ID_SIZE>()?))
    }

    fn size(&self) -> usize {
        KEY_ID_SIZE
    }
}

impl AsRef<[u8]> for KeyId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for KeyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", &self.to_hex())
    }
}

impl Serialize for KeyId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for KeyId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let hex = String::deserialize(deserializer)?;
        KeyId::from_str(&hex).map_err(SerdeError::custom)
    }
}
