use crate::crypto::Hash;
use crate::transaction::AssetId;

/// Upper bound accepted for a register-address payload. Larger payloads
/// are ignored rather than parsed.
pub const MAX_REGISTRATION_PAYLOAD_SIZE: usize = 8192;

/// Per-call policy context supplied by the node.
///
/// The contract hash changes at most once per block; callers read it when
/// they process a transaction and pass it down explicitly.
#[derive(Clone, Debug, Default)]
pub struct PolicyConfig {
    pub asset: AssetId,
    pub contract: Option<Hash>,
}

impl PolicyConfig {
    pub fn new(asset: AssetId) -> Self {
        PolicyConfig {
            asset,
            contract: None,
        }
    }

    pub fn with_contract(mut self, contract: Hash) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn contract(&self) -> Option<&Hash> {
        self.contract.as_ref()
    }
}
