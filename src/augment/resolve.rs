//! Account resolution and instruction reconstruction
//!
//! A v0 message indexes into one canonical key list:
//!
//! ```text
//! static keys
//! ++ writable picks of every table, in lookup declaration order
//! ++ readonly picks of every table, in lookup declaration order
//! ```
//!
//! [`ResolvedKeys`] builds that list once; signer/writable flags and
//! instruction reconstruction are plain lookups into it.

use crate::augment::errors::ResolutionError;
use crate::compat;
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    instruction::{AccountMeta, Instruction},
    message::{v0, MessageHeader},
    pubkey::Pubkey,
};

/// Canonical ordered key list of a v0 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKeys {
    keys: Vec<Pubkey>,
    header: MessageHeader,
    num_static: usize,
    num_lookup_writable: usize,
}

impl ResolvedKeys {
    /// Resolve `message`'s keys against the fetched `tables`
    ///
    /// Tables are matched to lookups by address. Every lookup must have a
    /// matching table; "zero lookups" is the only case where `tables` may
    /// be empty.
    pub fn new(
        message: &v0::Message,
        tables: &[AddressLookupTableAccount],
    ) -> Result<Self, ResolutionError> {
        let mut writable = Vec::new();
        let mut readonly = Vec::new();

        for lookup in &message.address_table_lookups {
            let table = tables
                .iter()
                .find(|table| table.key == lookup.account_key)
                .ok_or(ResolutionError::TableNotFound(lookup.account_key))?;

            let pick = |index: &u8| {
                table
                    .addresses
                    .get(usize::from(*index))
                    .copied()
                    .ok_or(ResolutionError::LookupIndexOutOfRange {
                        table: table.key,
                        index: *index,
                        len: table.addresses.len(),
                    })
            };

            for index in &lookup.writable_indexes {
                writable.push(pick(index)?);
            }
            for index in &lookup.readonly_indexes {
                readonly.push(pick(index)?);
            }
        }

        let num_static = message.account_keys.len();
        let num_lookup_writable = writable.len();

        let mut keys = Vec::with_capacity(num_static + writable.len() + readonly.len());
        keys.extend_from_slice(&message.account_keys);
        keys.extend(writable);
        keys.extend(readonly);

        Ok(Self {
            keys,
            header: message.header,
            num_static,
            num_lookup_writable,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pubkey> {
        self.keys.get(index)
    }

    pub fn as_slice(&self) -> &[Pubkey] {
        &self.keys
    }

    pub fn static_keys(&self) -> &[Pubkey] {
        &self.keys[..self.num_static]
    }

    /// Keys contributed by lookup tables' writable indexes
    pub fn lookup_writable_keys(&self) -> &[Pubkey] {
        &self.keys[self.num_static..self.num_static + self.num_lookup_writable]
    }

    /// Keys contributed by lookup tables' readonly indexes
    pub fn lookup_readonly_keys(&self) -> &[Pubkey] {
        &self.keys[self.num_static + self.num_lookup_writable..]
    }

    /// Only the leading static slots can sign
    pub fn is_signer(&self, index: usize) -> bool {
        index < self.num_static && compat::is_static_signer(&self.header, index)
    }

    pub fn is_writable(&self, index: usize) -> bool {
        if index < self.num_static {
            compat::is_static_writable(&self.header, self.num_static, index)
        } else {
            index < self.num_static + self.num_lookup_writable
        }
    }

    /// Account meta for the key at `index`, with its positional flags
    pub fn account_meta(&self, index: usize) -> Option<AccountMeta> {
        self.keys.get(index).map(|pubkey| AccountMeta {
            pubkey: *pubkey,
            is_signer: self.is_signer(index),
            is_writable: self.is_writable(index),
        })
    }
}

/// Replace compiled indexes with concrete addresses and flags
///
/// Each reference keeps the flags of its own position; an address that
/// appears both statically and through a table is not merged.
pub fn resolve_instructions(
    message: &v0::Message,
    keys: &ResolvedKeys,
) -> Result<Vec<Instruction>, ResolutionError> {
    message
        .instructions
        .iter()
        .enumerate()
        .map(|(position, ix)| {
            let out_of_range = |index: u8| ResolutionError::AccountIndexOutOfRange {
                instruction: position,
                index,
                len: keys.len(),
            };

            let program_id = *keys
                .get(usize::from(ix.program_id_index))
                .ok_or_else(|| out_of_range(ix.program_id_index))?;

            let accounts = ix
                .accounts
                .iter()
                .map(|index| {
                    keys.account_meta(usize::from(*index))
                        .ok_or_else(|| out_of_range(*index))
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Instruction {
                program_id,
                accounts,
                data: ix.data.clone(),
            })
        })
        .collect()
}

/// Resolve keys and instructions in one step
pub fn resolve_message(
    message: &v0::Message,
    tables: &[AddressLookupTableAccount],
) -> Result<(ResolvedKeys, Vec<Instruction>), ResolutionError> {
    let keys = ResolvedKeys::new(message, tables)?;
    let instructions = resolve_instructions(message, &keys)?;
    Ok((keys, instructions))
}
