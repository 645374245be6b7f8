use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use crate::config::{PolicyConfig, MAX_REGISTRATION_PAYLOAD_SIZE};
use crate::crypto::{
    Ecies, Hash, KeyId, PrivateKey, PublicKey, CIPHER_IV_SIZE, KEY_ID_SIZE, PUBLIC_KEY_SIZE,
};
use crate::keystore::KeyStore;
use crate::policy::{PolicyError, PolicyList, PolicyUpdater};
use crate::transaction::{AssetId, CoinsView, Script, Transaction};

/// Cleartext prefix of a registration payload: claimed KYC pubkey,
/// onboarding pubkey, then the cipher IV.
pub const REGISTRATION_HEADER_SIZE: usize = 2 * PUBLIC_KEY_SIZE + CIPHER_IV_SIZE;
/// One decrypted registration record: address identity then pubkey.
pub const REGISTRATION_ENTRY_SIZE: usize = KEY_ID_SIZE + PUBLIC_KEY_SIZE;
/// Multisig operand count that marks a KYC rotation output.
pub const ROTATION_OPERAND_COUNT: usize = 4;
/// Operand carrying the byte-reversed rotation key.
pub const ROTATION_KEY_INDEX: usize = 2;

/// Engine state living under the whitelist's lock alongside the entry set.
#[derive(Default)]
struct WhitelistSide {
    // address -> the KYC identity that vetted it
    kyc_map: HashMap<KeyId, KeyId>,
    // address -> pubkey already adjusted by the contract tweak
    tweaked_keys: HashMap<KeyId, PublicKey>,
    // currently authorized KYC authorities
    kyc_set: HashSet<KeyId>,
}

/// Parsed header of a register-address byte string. Either claimed key
/// may fail to parse; role resolution decides whether that matters.
struct RegistrationPayload<'a> {
    kyc_pub: Option<PublicKey>,
    onboard_pub: Option<PublicKey>,
    iv: [u8; CIPHER_IV_SIZE],
    ciphertext: &'a [u8],
}

impl<'a> RegistrationPayload<'a> {
    fn parse(payload: &'a [u8]) -> Result<Self, PolicyError> {
        if payload.len() < REGISTRATION_HEADER_SIZE
            || payload.len() > MAX_REGISTRATION_PAYLOAD_SIZE
        {
            return Err(PolicyError::MalformedPayload);
        }

        let mut iv = [0u8; CIPHER_IV_SIZE];
        iv.copy_from_slice(&payload[2 * PUBLIC_KEY_SIZE..REGISTRATION_HEADER_SIZE]);
        Ok(RegistrationPayload {
            kyc_pub: PublicKey::from_bytes(&payload[..PUBLIC_KEY_SIZE]).ok(),
            onboard_pub: PublicKey::from_bytes(&payload[PUBLIC_KEY_SIZE..2 * PUBLIC_KEY_SIZE])
                .ok(),
            iv,
            ciphertext: &payload[REGISTRATION_HEADER_SIZE..],
        })
    }
}

/// KYC-backed address whitelist.
///
/// Addresses enter through confidential onboarding payloads carried in
/// register-address outputs, or through direct administrative calls. The
/// set of trusted KYC authorities is driven by rotation markers observed
/// in confirmed transactions.
pub struct Whitelist {
    list: PolicyList<WhitelistSide>,
}

impl Whitelist {
    pub fn new(asset: AssetId) -> Self {
        Whitelist {
            list: PolicyList::new(asset),
        }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Whitelist::new(config.asset)
    }

    pub fn asset(&self) -> &AssetId {
        self.list.asset()
    }

    pub fn add(&self, address: KeyId) -> bool {
        self.list.add(address)
    }

    pub fn remove(&self, address: &KeyId) -> bool {
        self.list.remove(address)
    }

    pub fn is_whitelisted(&self, address: &KeyId) -> bool {
        self.list.contains(address)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn snapshot(&self) -> Vec<KeyId> {
        self.list.snapshot()
    }

    /// Drop every entry, including the engine's maps and KYC set.
    pub fn clear(&self) {
        let guard = self.list.lock();
        guard.with_state(|entries, side| {
            entries.clear();
            side.kyc_map.clear();
            side.tweaked_keys.clear();
            side.kyc_set.clear();
        });
    }

    pub fn add_kyc(&self, kyc: KeyId) -> bool {
        self.list.lock().side_mut(|side| side.kyc_set.insert(kyc))
    }

    pub fn remove_kyc(&self, kyc: &KeyId) -> bool {
        self.list.lock().side_mut(|side| side.kyc_set.remove(kyc))
    }

    pub fn is_kyc(&self, kyc: &KeyId) -> bool {
        self.list.lock().side(|side| side.kyc_set.contains(kyc))
    }

    /// KYC identity that vetted an onboarded address.
    pub fn lookup_kyc_key(&self, address: &KeyId) -> Option<KeyId> {
        self.list
            .lock()
            .side(|side| side.kyc_map.get(address).copied())
    }

    /// Contract-tweaked pubkey recorded for an onboarded address.
    pub fn lookup_tweaked_key(&self, address: &KeyId) -> Option<PublicKey> {
        self.list
            .lock()
            .side(|side| side.tweaked_keys.get(address).cloned())
    }

    /// Register one address under a KYC identity.
    ///
    /// The address must be the identity of the pubkey after applying the
    /// contract tweak, when one is given. Passing no KYC identity is the
    /// bootstrap path: the address is whitelisted without an authority
    /// check and without a KYC map entry.
    pub fn add_derived(
        &self,
        address: KeyId,
        pub_key: &PublicKey,
        kyc: Option<&KeyId>,
        contract: Option<&Hash>,
    ) -> Result<(), PolicyError> {
        let effective = match contract {
            Some(contract) => pub_key.add_tweak(contract)?,
            None => pub_key.clone(),
        };
        if effective.key_id() != address {
            return Err(PolicyError::InvalidAddressOrKey);
        }

        let guard = self.list.lock();
        guard.with_state(|entries, side| {
            if side.kyc_map.contains_key(&address) {
                return Err(PolicyError::AlreadyRegistered);
            }
            if let Some(kyc) = kyc {
                if !side.kyc_set.contains(kyc) {
                    return Err(PolicyError::NotAuthorized);
                }
                side.kyc_map.insert(address, *kyc);
            }
            entries.insert(address);
            side.tweaked_keys.insert(address, effective);
            Ok(())
        })
    }

    /// Hex entry point for administrative registration.
    pub fn add_derived_hex(
        &self,
        address: &str,
        pub_key: &str,
        kyc: Option<&str>,
        contract: Option<&str>,
    ) -> Result<(), PolicyError> {
        let address = KeyId::from_str(address).map_err(|_| PolicyError::InvalidAddressOrKey)?;
        let pub_key = PublicKey::from_hex(pub_key)?;
        let kyc = kyc
            .map(KeyId::from_str)
            .transpose()
            .map_err(|_| PolicyError::InvalidAddressOrKey)?;
        let contract = contract
            .map(Hash::from_str)
            .transpose()
            .map_err(|_| PolicyError::InvalidAddressOrKey)?;
        self.add_derived(address, &pub_key, kyc.as_ref(), contract.as_ref())
    }

    /// Process a transaction's confidential onboarding payload.
    ///
    /// Returns true when at least one address was registered. Bad entries
    /// inside an otherwise valid batch are skipped, not fatal.
    pub fn register_address(
        &self,
        tx: &Transaction,
        view: &dyn CoinsView,
        keystore: &dyn KeyStore,
        contract: Option<&Hash>,
    ) -> bool {
        let Some(raw) = tx.registration_payload(Some(self.asset())) else {
            return false;
        };
        let payload = match RegistrationPayload::parse(raw) {
            Ok(payload) => payload,
            Err(err) => {
                debug!("rejecting registration payload: {}", err);
                return false;
            }
        };

        // Hold the lock across candidate resolution and registration so
        // the whole attempt observes one consistent state.
        let _guard = self.list.lock();

        let (decrypt_key, counterparty, kyc_identity) = match self.resolve_decrypt_context(
            tx,
            view,
            keystore,
            &payload.kyc_pub,
            &payload.onboard_pub,
        ) {
            Some(context) => context,
            None => {
                debug!("registration payload has no locally decryptable party");
                return false;
            }
        };

        let channel = Ecies::new_with_iv(&decrypt_key, &counterparty, payload.iv);
        let plaintext = channel.decrypt(payload.ciphertext);

        // Trailing bytes short of a full record end the walk silently
        let mut registered = 0;
        for entry in plaintext.chunks_exact(REGISTRATION_ENTRY_SIZE) {
            let mut address_bytes = [0u8; KEY_ID_SIZE];
            address_bytes.copy_from_slice(&entry[..KEY_ID_SIZE]);
            let address = KeyId::new(address_bytes);
            let pub_key = match PublicKey::from_bytes(&entry[KEY_ID_SIZE..]) {
                Ok(pub_key) => pub_key,
                Err(_) => {
                    debug!("skipping registration entry with invalid pubkey");
                    continue;
                }
            };
            match self.add_derived(address, &pub_key, Some(&kyc_identity), contract) {
                Ok(()) => registered += 1,
                Err(err) => debug!("skipping registration entry for {}: {}", address, err),
            }
        }

        registered > 0
    }

    /// Pick the private key to decrypt with and the counterparty pubkey,
    /// along with the KYC identity new entries register under.
    fn resolve_decrypt_context(
        &self,
        tx: &Transaction,
        view: &dyn CoinsView,
        keystore: &dyn KeyStore,
        kyc_pub: &Option<PublicKey>,
        onboard_pub: &Option<PublicKey>,
    ) -> Option<(PrivateKey, PublicKey, KeyId)> {
        // Authority view: we hold the claimed KYC key and it is trusted
        if let (Some(kyc), Some(onboard)) = (kyc_pub, onboard_pub) {
            let kyc_id = kyc.key_id();
            if self.is_kyc(&kyc_id) {
                if let Some(private_key) = keystore.get_key(&kyc_id) {
                    return Some((private_key, onboard.clone(), kyc_id));
                }
            }
        }

        // Client view: this is our own onboarding request
        if let (Some(kyc), Some(onboard)) = (kyc_pub, onboard_pub) {
            if let Some(private_key) = keystore.get_key(&onboard.key_id()) {
                return Some((private_key, kyc.clone(), kyc.key_id()));
            }
        }

        // Neither party is local. Infer the sender from the spent inputs:
        // an onboarded input address still vetted by a trusted authority
        // contributes its tweaked key as a candidate counterparty.
        let mut candidates: Vec<(PublicKey, KeyId)> = Vec::new();
        let guard = self.list.lock();
        for input in &tx.inputs {
            let Some(spent) = view.output_for(input) else {
                continue;
            };
            let Some(address) = spent.script.destination() else {
                continue;
            };
            guard.side(|side| {
                let Some(kyc_id) = side.kyc_map.get(&address) else {
                    return;
                };
                if !side.kyc_set.contains(kyc_id) {
                    return;
                }
                if let Some(tweaked) = side.tweaked_keys.get(&address) {
                    if !candidates.iter().any(|(key, _)| key == tweaked) {
                        candidates.push((tweaked.clone(), *kyc_id));
                    }
                }
            });
        }

        // Ambiguous or unknown origin is rejected outright
        if candidates.len() != 1 {
            return None;
        }
        let (candidate, kyc_id) = candidates.remove(0);

        let local_kyc = keystore.kyc_pub_key()?;
        if let Some(private_key) = keystore.get_key(&local_kyc.key_id()) {
            return Some((private_key, candidate, kyc_id));
        }
        if let Some(private_key) = keystore.get_key(&candidate.key_id()) {
            return Some((private_key, local_kyc, kyc_id));
        }
        None
    }

    // Leading bytes of the marker operand, byte-reversed, are the key
    fn rotation_identity(script: &Script) -> Result<Option<KeyId>, PolicyError> {
        let operands = match script.multisig_operands() {
            Some(operands) if operands.len() == ROTATION_OPERAND_COUNT => operands,
            _ => return Ok(None),
        };
        let operand = &operands[ROTATION_KEY_INDEX];
        if operand.len() < PUBLIC_KEY_SIZE {
            return Err(PolicyError::InvalidAddressOrKey);
        }
        let mut bytes = operand[..PUBLIC_KEY_SIZE].to_vec();
        bytes.reverse();
        let key = PublicKey::from_bytes(&bytes)?;
        Ok(Some(key.key_id()))
    }
}

impl PolicyUpdater for Whitelist {
    /// Apply a confirmed transaction's KYC rotations: spent rotation
    /// markers revoke their authority, new ones authorize. A marker that
    /// does not decode to a valid key fails the whole call.
    fn update(&self, tx: &Transaction, view: &dyn CoinsView) -> Result<(), PolicyError> {
        if tx.is_coinbase() {
            return Ok(());
        }

        let guard = self.list.lock();

        for input in &tx.inputs {
            let Some(spent) = view.output_for(input) else {
                continue;
            };
            if !self.list.is_asset_relevant(spent) {
                continue;
            }
            if let Some(kyc) = Self::rotation_identity(&spent.script)? {
                // Removing an unknown authority is a no-op
                guard.side_mut(|side| side.kyc_set.remove(&kyc));
            }
        }

        for output in &tx.outputs {
            if !self.list.is_asset_relevant(output) {
                continue;
            }
            if let Some(kyc) = Self::rotation_identity(&output.script)? {
                if guard.side_mut(|side| side.kyc_set.insert(kyc)) {
                    debug!("authorized kyc identity {}", kyc);
                } else {
                    warn!("kyc identity {} was already authorized", kyc);
                }
            }
        }

        Ok(())
    }
}
