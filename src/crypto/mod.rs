mod hash;
mod key;
mod key_id;

pub mod cipher;
pub mod ecies;
pub mod error;
pub mod random;

pub use cipher::{CipherContext, CIPHER_IV_SIZE, CIPHER_KEY_SIZE};
pub use ecies::Ecies;
pub use error::CryptoError;
pub use hash::{hash, Hash, Hashable, HASH_SIZE};
pub use key::{KeyPair, PrivateKey, PublicKey, PUBLIC_KEY_SIZE};
pub use key_id::{KeyId, KEY_ID_SIZE};
