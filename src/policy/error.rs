use thiserror::Error;

use crate::crypto::CryptoError;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid address or key")]
    InvalidAddressOrKey,
    #[error("kyc key is not authorized")]
    NotAuthorized,
    #[error("address is already registered")]
    AlreadyRegistered,
    #[error("malformed policy payload")]
    MalformedPayload,
}

impl From<CryptoError> for PolicyError {
    fn from(_: CryptoError) -> Self {
        PolicyError::InvalidAddressOrKey
    }
}
