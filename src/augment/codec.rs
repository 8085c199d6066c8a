//! Wire codec for v0 transactions
//!
//! Layout of a serialized transaction:
//!
//! ```text
//! compact-u16 num_signatures | 64-byte signature * n | message
//!
//! message:
//!   0x80                                   version prefix (v0)
//!   u8 num_required_signatures
//!   u8 num_readonly_signed_accounts
//!   u8 num_readonly_unsigned_accounts
//!   compact-u16 n | 32-byte key * n        static account keys
//!   32-byte recent blockhash
//!   compact-u16 n | instruction * n
//!       u8 program_id_index
//!       compact-u16 n | u8 * n             account indexes
//!       compact-u16 n | u8 * n             data
//!   compact-u16 n | lookup * n
//!       32-byte table address
//!       compact-u16 n | u8 * n             writable indexes
//!       compact-u16 n | u8 * n             readonly indexes
//! ```
//!
//! Decoding is strict: every declared length is checked against the bytes
//! that remain, and leftover bytes after the message are rejected.

use crate::augment::errors::{AugmentError, DecodeError};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    hash::Hash,
    instruction::CompiledInstruction,
    message::{
        v0::{Message, MessageAddressTableLookup},
        MessageHeader,
    },
    pubkey::Pubkey,
    signature::Signature,
};

/// High bit marks a versioned message; the low 7 bits carry the version
pub const MESSAGE_VERSION_PREFIX: u8 = 0x80;

const PUBKEY_BYTES: usize = 32;
const HASH_BYTES: usize = 32;
const SIGNATURE_BYTES: usize = 64;

/// A decoded transaction: signature array plus v0 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

/// Text encodings used to transport serialized transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportEncoding {
    #[default]
    Base58,
    Base64,
}

impl TransportEncoding {
    pub fn decode(self, text: &str) -> Result<Vec<u8>, DecodeError> {
        let text = text.trim();
        match self {
            Self::Base58 => bs58::decode(text)
                .into_vec()
                .map_err(|e| DecodeError::Encoding {
                    encoding: "base58",
                    reason: e.to_string(),
                }),
            Self::Base64 => base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|e| DecodeError::Encoding {
                    encoding: "base64",
                    reason: e.to_string(),
                }),
        }
    }

    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            Self::Base58 => bs58::encode(bytes).into_string(),
            Self::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Bounds-checked cursor over the input bytes
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn ensure(&self, needed: usize, field: &'static str) -> Result<(), DecodeError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(DecodeError::Truncated {
                field,
                needed,
                remaining,
            });
        }
        Ok(())
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        self.ensure(len, field)?;
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(1, field)?[0])
    }

    fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    fn read_pubkey(&mut self, field: &'static str) -> Result<Pubkey, DecodeError> {
        Ok(Pubkey::new_from_array(self.read_array::<PUBKEY_BYTES>(field)?))
    }

    /// Little-endian base-128, at most 3 bytes, minimal encoding only
    fn read_compact_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        let start = self.offset;
        let mut value = 0u32;
        for i in 0..3 {
            let byte = self.read_u8(field)?;
            // non-minimal encoding or overflow
            if (i > 0 && byte == 0) || (i == 2 && byte > 3) {
                return Err(DecodeError::InvalidCompactU16 { offset: start });
            }
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value as u16);
            }
        }
        Err(DecodeError::InvalidCompactU16 { offset: start })
    }

    fn read_len_prefixed_bytes(&mut self, field: &'static str) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_compact_u16(field)?;
        Ok(self.take(usize::from(len), field)?.to_vec())
    }

    fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

/// Decode a full serialized transaction
pub fn decode_transaction(bytes: &[u8]) -> Result<DecodedTransaction, DecodeError> {
    let mut reader = Reader::new(bytes);

    let num_signatures = usize::from(reader.read_compact_u16("signature count")?);
    reader.ensure(num_signatures * SIGNATURE_BYTES, "signatures")?;
    let mut signatures = Vec::with_capacity(num_signatures);
    for _ in 0..num_signatures {
        signatures.push(Signature::from(
            reader.read_array::<SIGNATURE_BYTES>("signatures")?,
        ));
    }

    let message = read_message(&mut reader)?;
    reader.finish()?;

    Ok(DecodedTransaction {
        signatures,
        message,
    })
}

/// Decode a bare v0 message (no signature array)
pub fn decode_message(bytes: &[u8]) -> Result<Message, DecodeError> {
    let mut reader = Reader::new(bytes);
    let message = read_message(&mut reader)?;
    reader.finish()?;
    Ok(message)
}

fn read_message(reader: &mut Reader<'_>) -> Result<Message, DecodeError> {
    let prefix = reader.read_u8("message version")?;
    if prefix & MESSAGE_VERSION_PREFIX == 0 {
        return Err(DecodeError::LegacyMessage);
    }
    let version = prefix & !MESSAGE_VERSION_PREFIX;
    if version != 0 {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let header = MessageHeader {
        num_required_signatures: reader.read_u8("message header")?,
        num_readonly_signed_accounts: reader.read_u8("message header")?,
        num_readonly_unsigned_accounts: reader.read_u8("message header")?,
    };

    let num_keys = usize::from(reader.read_compact_u16("static account keys")?);
    reader.ensure(num_keys * PUBKEY_BYTES, "static account keys")?;
    let mut account_keys = Vec::with_capacity(num_keys);
    for _ in 0..num_keys {
        account_keys.push(reader.read_pubkey("static account keys")?);
    }
    validate_header(&header, account_keys.len())?;

    let recent_blockhash = Hash::new_from_array(reader.read_array::<HASH_BYTES>("recent blockhash")?);

    let num_instructions = usize::from(reader.read_compact_u16("instructions")?);
    // Each instruction takes at least 3 bytes: program index and two empty lengths
    reader.ensure(num_instructions * 3, "instructions")?;
    let mut instructions = Vec::with_capacity(num_instructions);
    for _ in 0..num_instructions {
        let program_id_index = reader.read_u8("instruction program index")?;
        let accounts = reader.read_len_prefixed_bytes("instruction account indexes")?;
        let data = reader.read_len_prefixed_bytes("instruction data")?;
        instructions.push(CompiledInstruction {
            program_id_index,
            accounts,
            data,
        });
    }

    let num_lookups = usize::from(reader.read_compact_u16("address table lookups")?);
    // 32-byte address plus two empty lengths
    reader.ensure(num_lookups * (PUBKEY_BYTES + 2), "address table lookups")?;
    let mut address_table_lookups = Vec::with_capacity(num_lookups);
    for _ in 0..num_lookups {
        let account_key = reader.read_pubkey("lookup table address")?;
        let writable_indexes = reader.read_len_prefixed_bytes("lookup writable indexes")?;
        let readonly_indexes = reader.read_len_prefixed_bytes("lookup readonly indexes")?;
        address_table_lookups.push(MessageAddressTableLookup {
            account_key,
            writable_indexes,
            readonly_indexes,
        });
    }

    Ok(Message {
        header,
        account_keys,
        recent_blockhash,
        instructions,
        address_table_lookups,
    })
}

fn validate_header(header: &MessageHeader, num_static: usize) -> Result<(), DecodeError> {
    let signers = usize::from(header.num_required_signatures);
    if signers == 0 {
        return Err(DecodeError::InvalidHeader(
            "no required signatures, fee payer missing".to_string(),
        ));
    }
    if signers > num_static {
        return Err(DecodeError::InvalidHeader(format!(
            "{} required signatures but only {} static keys",
            signers, num_static
        )));
    }
    if header.num_readonly_signed_accounts >= header.num_required_signatures {
        return Err(DecodeError::InvalidHeader(
            "fee payer must be a writable signer".to_string(),
        ));
    }
    if usize::from(header.num_readonly_unsigned_accounts) > num_static - signers {
        return Err(DecodeError::InvalidHeader(format!(
            "{} readonly unsigned accounts but only {} non-signer static keys",
            header.num_readonly_unsigned_accounts,
            num_static - signers
        )));
    }
    Ok(())
}

/// Append `value` as compact-u16
pub fn write_compact_u16(buf: &mut Vec<u8>, mut value: u16) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

fn write_len(buf: &mut Vec<u8>, len: usize, field: &str) -> Result<(), AugmentError> {
    let len = u16::try_from(len).map_err(|_| {
        AugmentError::invariant(format!("{} length {} exceeds compact-u16 range", field, len))
    })?;
    write_compact_u16(buf, len);
    Ok(())
}

fn write_len_prefixed_bytes(buf: &mut Vec<u8>, bytes: &[u8], field: &str) -> Result<(), AugmentError> {
    write_len(buf, bytes.len(), field)?;
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Encode a v0 message, inverse of [`decode_message`]
pub fn encode_message(message: &Message) -> Result<Vec<u8>, AugmentError> {
    let mut buf = Vec::with_capacity(
        4 + 3 + message.account_keys.len() * PUBKEY_BYTES + HASH_BYTES + 64,
    );

    buf.push(MESSAGE_VERSION_PREFIX);
    buf.push(message.header.num_required_signatures);
    buf.push(message.header.num_readonly_signed_accounts);
    buf.push(message.header.num_readonly_unsigned_accounts);

    write_len(&mut buf, message.account_keys.len(), "static account keys")?;
    for key in &message.account_keys {
        buf.extend_from_slice(key.as_ref());
    }

    buf.extend_from_slice(message.recent_blockhash.as_ref());

    write_len(&mut buf, message.instructions.len(), "instructions")?;
    for ix in &message.instructions {
        buf.push(ix.program_id_index);
        write_len_prefixed_bytes(&mut buf, &ix.accounts, "instruction account indexes")?;
        write_len_prefixed_bytes(&mut buf, &ix.data, "instruction data")?;
    }

    write_len(&mut buf, message.address_table_lookups.len(), "address table lookups")?;
    for lookup in &message.address_table_lookups {
        buf.extend_from_slice(lookup.account_key.as_ref());
        write_len_prefixed_bytes(&mut buf, &lookup.writable_indexes, "lookup writable indexes")?;
        write_len_prefixed_bytes(&mut buf, &lookup.readonly_indexes, "lookup readonly indexes")?;
    }

    Ok(buf)
}

/// Encode a transaction with the given signature array
pub fn encode_transaction(signatures: &[Signature], message: &Message) -> Result<Vec<u8>, AugmentError> {
    let message_bytes = encode_message(message)?;
    let mut buf = Vec::with_capacity(3 + signatures.len() * SIGNATURE_BYTES + message_bytes.len());
    write_len(&mut buf, signatures.len(), "signatures")?;
    for signature in signatures {
        buf.extend_from_slice(signature.as_ref());
    }
    buf.extend_from_slice(&message_bytes);
    Ok(buf)
}

/// Encode with one zeroed signature slot per required signer
pub fn encode_unsigned_transaction(message: &Message) -> Result<Vec<u8>, AugmentError> {
    let slots = vec![Signature::default(); usize::from(message.header.num_required_signatures)];
    encode_transaction(&slots, message)
}
