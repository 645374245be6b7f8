use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::crypto::{
    Ecies, Hash, Hashable, KeyId, KeyPair, PublicKey, CIPHER_IV_SIZE, KEY_ID_SIZE,
    PUBLIC_KEY_SIZE,
};
use crate::serializer::{Reader, ReaderError, Serializer, Writer};

mod script;

pub use script::Script;

pub const ASSET_ID_SIZE: usize = 32;

/// Tag of the fungible asset class an output carries. Policy lists are
/// scoped to a single asset; outputs of other assets are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId([u8; ASSET_ID_SIZE]);

impl AssetId {
    pub const fn new(bytes: [u8; ASSET_ID_SIZE]) -> Self {
        AssetId(bytes)
    }

    // The ledger's base asset
    pub const fn base() -> Self {
        AssetId([0; ASSET_ID_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8; ASSET_ID_SIZE] {
        &self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        AssetId::base()
    }
}

impl Serializer for AssetId {
    fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(AssetId::new(reader.read_bytes_32()?))
    }

    fn size(&self) -> usize {
        ASSET_ID_SIZE
    }
}

/// Reference to the output a transaction input spends.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, index: u32) -> Self {
        OutPoint { txid, index }
    }

    // Coinbase inputs spend nothing
    pub fn null() -> Self {
        OutPoint {
            txid: Hash::zero(),
            index: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.index == u32::MAX
    }
}

impl Serializer for OutPoint {
    fn write(&self, writer: &mut Writer) {
        self.txid.write(writer);
        writer.write_u32(self.index);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let txid = Hash::read(reader)?;
        let index = reader.read_u32()?;
        Ok(OutPoint { txid, index })
    }

    fn size(&self) -> usize {
        self.txid.size() + 4
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
}

impl TxIn {
    pub fn new(prevout: OutPoint) -> Self {
        TxIn { prevout }
    }
}

impl Serializer for TxIn {
    fn write(&self, writer: &mut Writer) {
        self.prevout.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(TxIn {
            prevout: OutPoint::read(reader)?,
        })
    }

    fn size(&self) -> usize {
        self.prevout.size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub asset: AssetId,
    pub script: Script,
}

impl TxOut {
    pub fn new(asset: AssetId, script: Script) -> Self {
        TxOut { asset, script }
    }
}

impl Serializer for TxOut {
    fn write(&self, writer: &mut Writer) {
        self.asset.write(writer);
        self.script.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let asset = AssetId::read(reader)?;
        let script = Script::read(reader)?;
        Ok(TxOut { asset, script })
    }

    fn size(&self) -> usize {
        self.asset.size() + self.script.size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Transaction { inputs, outputs }
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// Byte string of the first register-address output, optionally
    /// restricted to outputs of a given asset.
    pub fn registration_payload(&self, asset: Option<&AssetId>) -> Option<&[u8]> {
        self.outputs
            .iter()
            .filter(|out| asset.map_or(true, |a| out.asset == *a))
            .find_map(|out| out.script.registration_data())
    }
}

impl Serializer for Transaction {
    fn write(&self, writer: &mut Writer) {
        debug_assert!(self.inputs.len() <= u16::MAX as usize);
        writer.write_u16(self.inputs.len() as u16);
        for input in &self.inputs {
            input.write(writer);
        }
        debug_assert!(self.outputs.len() <= u16::MAX as usize);
        writer.write_u16(self.outputs.len() as u16);
        for output in &self.outputs {
            output.write(writer);
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let input_count = reader.read_u16()? as usize;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TxIn::read(reader)?);
        }

        let output_count = reader.read_u16()? as usize;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TxOut::read(reader)?);
        }

        Ok(Transaction { inputs, outputs })
    }

    fn size(&self) -> usize {
        2 + self.inputs.iter().map(|i| i.size()).sum::<usize>()
            + 2
            + self.outputs.iter().map(|o| o.size()).sum::<usize>()
    }
}

impl Hashable for Transaction {}

/// Build the confidential payload of a register-address output.
///
/// The client encrypts its `(address, pubkey)` entries against the KYC
/// authority's public key and prefixes the cleartext header the decoding
/// side expects: claimed KYC pubkey, onboarding pubkey, then the IV.
pub fn build_registration_payload(
    client: &KeyPair,
    kyc_pub: &PublicKey,
    entries: &[(KeyId, PublicKey)],
) -> Vec<u8> {
    let mut plaintext = Vec::with_capacity(entries.len() * (KEY_ID_SIZE + PUBLIC_KEY_SIZE));
    for (address, pubkey) in entries {
        plaintext.extend_from_slice(address.as_bytes());
        plaintext.extend_from_slice(&pubkey.to_bytes());
    }

    let ecies = Ecies::new(client.get_private_key(), kyc_pub);
    let ciphertext = ecies.encrypt(&plaintext);

    let mut payload = Vec::with_capacity(2 * PUBLIC_KEY_SIZE + CIPHER_IV_SIZE + ciphertext.len());
    payload.extend_from_slice(&kyc_pub.to_bytes());
    payload.extend_from_slice(&client.get_public_key().to_bytes());
    payload.extend_from_slice(&ecies.iv());
    payload.extend_from_slice(&ciphertext);
    payload
}

/// View of the outputs a transaction's inputs spend.
///
/// The ledger owns the real UTXO set; the policy engine only needs to map
/// an input back to the output it consumes.
pub trait CoinsView {
    fn output_for(&self, input: &TxIn) -> Option<&TxOut>;
}

/// In-memory coins view backing tests and mempool-side callers.
#[derive(Default)]
pub struct MemoryCoinsView {
    outputs: HashMap<OutPoint, TxOut>,
}

impl MemoryCoinsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, outpoint: OutPoint, output: TxOut) {
        self.outputs.insert(outpoint, output);
    }
}

impl CoinsView for MemoryCoinsView {
    fn output_for(&self, input: &TxIn) -> Option<&TxOut> {
        self.outputs.get(&input.prevout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{hash, KeyId};

    fn sample_transaction() -> Transaction {
        Transaction::new(
            vec![TxIn::new(OutPoint::new(hash(b"prev"), 1))],
            vec![
                TxOut::new(
                    AssetId::base(),
                    Script::PayToPubKeyHash(KeyId::new([9; 20])),
                ),
                TxOut::new(AssetId::base(), Script::RegisterAddress(vec![1, 2, 3])),
            ],
        )
    }

    #[test]
    fn test_transaction_roundtrip() {
        let tx = sample_transaction();
        let decoded = Transaction::from_bytes(&tx.to_bytes()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(tx.size(), tx.to_bytes().len());
    }

    #[test]
    fn test_transaction_id_is_wire_hash() {
        let tx = sample_transaction();
        assert_eq!(tx.hash(), hash(&tx.to_bytes()));

        let mut changed = tx.clone();
        changed.outputs.pop();
        assert_ne!(changed.hash(), tx.hash());
    }

    #[test]
    fn test_coinbase_detection() {
        let coinbase = Transaction::new(vec![TxIn::new(OutPoint::null())], vec![]);
        assert!(coinbase.is_coinbase());
        assert!(!sample_transaction().is_coinbase());
    }

    #[test]
    fn test_registration_payload_lookup() {
        let tx = sample_transaction();
        assert_eq!(tx.registration_payload(None), Some(&[1u8, 2, 3][..]));
        assert_eq!(
            tx.registration_payload(Some(&AssetId::base())),
            Some(&[1u8, 2, 3][..])
        );

        // A different asset filter sees nothing
        let other = AssetId::new([5; ASSET_ID_SIZE]);
        assert_eq!(tx.registration_payload(Some(&other)), None);
    }

    #[test]
    fn test_build_registration_payload_layout() {
        let client = KeyPair::generate();
        let authority = KeyPair::generate();

        let addressed = KeyPair::generate();
        let entries = vec![(addressed.key_id(), addressed.get_public_key().clone())];
        let payload =
            build_registration_payload(&client, authority.get_public_key(), &entries);

        assert_eq!(
            payload.len(),
            2 * PUBLIC_KEY_SIZE + CIPHER_IV_SIZE + KEY_ID_SIZE + PUBLIC_KEY_SIZE
        );
        assert_eq!(&payload[..PUBLIC_KEY_SIZE], &authority.get_public_key().to_bytes());
        assert_eq!(
            &payload[PUBLIC_KEY_SIZE..2 * PUBLIC_KEY_SIZE],
            &client.get_public_key().to_bytes()
        );

        // The authority can recover the entries with its private key
        let iv: [u8; CIPHER_IV_SIZE] = payload[2 * PUBLIC_KEY_SIZE..2 * PUBLIC_KEY_SIZE + CIPHER_IV_SIZE]
            .try_into()
            .unwrap();
        let ecies = Ecies::new_with_iv(
            authority.get_private_key(),
            client.get_public_key(),
            iv,
        );
        let plaintext = ecies.decrypt(&payload[2 * PUBLIC_KEY_SIZE + CIPHER_IV_SIZE..]);
        assert_eq!(&plaintext[..KEY_ID_SIZE], addressed.key_id().as_bytes());
        assert_eq!(
            &plaintext[KEY_ID_SIZE..],
            &addressed.get_public_key().to_bytes()
        );
    }

    #[test]
    fn test_memory_coins_view() {
        let outpoint = OutPoint::new(hash(b"prev"), 0);
        let output = TxOut::new(AssetId::base(), Script::Null);

        let mut view = MemoryCoinsView::new();
        view.insert(outpoint.clone(), output.clone());

        let input = TxIn::new(outpoint);
        assert_eq!(view.output_for(&input), Some(&output));
        assert!(view
            .output_for(&TxIn::new(OutPoint::new(hash(b"missing"), 0)))
            .is_none());
    }
}
