// Cryptographically secure random number generation.
//
// All key and IV material comes from the operating system CSPRNG; nothing
// in this crate uses thread-local RNGs.
use rand::rngs::OsRng;
use rand::RngCore;

/// Generate cryptographically secure random bytes
pub fn secure_random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}
