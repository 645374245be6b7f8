use serde::{Deserialize, Serialize};

use crate::crypto::KeyId;
use crate::serializer::{Reader, ReaderError, Serializer, Writer};

// Script discriminators on the wire
const SCRIPT_NULL: u8 = 0x00;
const SCRIPT_P2PKH: u8 = 0x01;
const SCRIPT_MULTISIG: u8 = 0x02;
const SCRIPT_REGISTER_ADDRESS: u8 = 0x03;

/// A spending condition, already classified.
///
/// This is the narrow seam to the ledger's script machinery: the policy
/// engine never sees raw script bytes, only the solved pattern and its
/// operands. Multisig operands are kept as raw byte blobs because the
/// rotation protocol deliberately stores a non-key in one of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    Null,
    PayToPubKeyHash(KeyId),
    Multisig {
        required: u8,
        operands: Vec<Vec<u8>>,
    },
    RegisterAddress(Vec<u8>),
}

impl Script {
    // The destination identity of a single-key output
    pub fn destination(&self) -> Option<KeyId> {
        match self {
            Script::PayToPubKeyHash(key_id) => Some(*key_id),
            _ => None,
        }
    }

    // Operand list of a multisig condition
    pub fn multisig_operands(&self) -> Option<&[Vec<u8>]> {
        match self {
            Script::Multisig { operands, .. } => Some(operands),
            _ => None,
        }
    }

    // Byte string attached to a register-address output
    pub fn registration_data(&self) -> Option<&[u8]> {
        match self {
            Script::RegisterAddress(data) => Some(data),
            _ => None,
        }
    }
}

impl Serializer for Script {
    fn write(&self, writer: &mut Writer) {
        match self {
            Script::Null => writer.write_u8(SCRIPT_NULL),
            Script::PayToPubKeyHash(key_id) => {
                writer.write_u8(SCRIPT_P2PKH);
                key_id.write(writer);
            }
            Script::Multisig { required, operands } => {
                debug_assert!(operands.len() <= u8::MAX as usize);
                writer.write_u8(SCRIPT_MULTISIG);
                writer.write_u8(*required);
                writer.write_u8(operands.len() as u8);
                for operand in operands {
                    debug_assert!(operand.len() <= u16::MAX as usize);
                    writer.write_u16(operand.len() as u16);
                    writer.write_bytes(operand);
                }
            }
            Script::RegisterAddress(data) => {
                debug_assert!(data.len() <= u16::MAX as usize);
                writer.write_u8(SCRIPT_REGISTER_ADDRESS);
                writer.write_u16(data.len() as u16);
                writer.write_bytes(data);
            }
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        match reader.read_u8()? {
            SCRIPT_NULL => Ok(Script::Null),
            SCRIPT_P2PKH => Ok(Script::PayToPubKeyHash(KeyId::read(reader)?)),
            SCRIPT_MULTISIG => {
                let required = reader.read_u8()?;
                let count = reader.read_u8()? as usize;
                let mut operands = Vec::with_capacity(count);
                for _ in 0..count {
                    let len = reader.read_u16()? as usize;
                    operands.push(reader.read_bytes(len)?);
                }
                Ok(Script::Multisig { required, operands })
            }
            SCRIPT_REGISTER_ADDRESS => {
                let len = reader.read_u16()? as usize;
                Ok(Script::RegisterAddress(reader.read_bytes(len)?))
            }
            _ => Err(ReaderError::InvalidValue),
        }
    }

    fn size(&self) -> usize {
        match self {
            Script::Null => 1,
            Script::PayToPubKeyHash(key_id) => 1 + key_id.size(),
            Script::Multisig { operands, .. } => {
                1 + 1 + 1 + operands.iter().map(|o| 2 + o.len()).sum::<usize>()
            }
            Script::RegisterAddress(data) => 1 + 2 + data.len(),
        }
    }
}
