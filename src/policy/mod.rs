mod error;
mod list;
mod whitelist;

pub use error::PolicyError;
pub use list::{PolicyGuard, PolicyList};
pub use whitelist::{
    Whitelist, REGISTRATION_ENTRY_SIZE, REGISTRATION_HEADER_SIZE, ROTATION_KEY_INDEX,
    ROTATION_OPERAND_COUNT,
};

use crate::transaction::{CoinsView, Transaction};

/// Applies a confirmed transaction's policy effects to a list.
///
/// Implementations scan the transaction's spent outputs and new outputs
/// and mutate their list accordingly. An `Err` marks the transaction as
/// policy-invalid; callers decide whether that rejects the block.
pub trait PolicyUpdater {
    fn update(&self, tx: &Transaction, view: &dyn CoinsView) -> Result<(), PolicyError>;
}
