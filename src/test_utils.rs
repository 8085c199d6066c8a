//! Test Utilities Module
//!
//! Deterministic message fixtures shared by the unit tests of the codec,
//! resolution and recompilation modules.

#![cfg(test)]

use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    hash::Hash,
    instruction::{AccountMeta, CompiledInstruction, Instruction},
    message::{v0, MessageHeader},
    pubkey::Pubkey,
};

/// A v0 message with one lookup table and the keys it resolves to
pub struct Fixture {
    pub message: v0::Message,
    pub table: AddressLookupTableAccount,
    /// `[payer, writable account, program]`
    pub static_keys: Vec<Pubkey>,
    pub lookup_writable: Vec<Pubkey>,
    pub lookup_readonly: Vec<Pubkey>,
}

/// 3 static keys (payer, one writable account, program) and one table
/// contributing 2 writable and 1 readonly address.
///
/// The table interleaves filler addresses so that table indexes differ
/// from resolved positions.
pub fn fixture_message() -> Fixture {
    let payer = Pubkey::new_unique();
    let writable_account = Pubkey::new_unique();
    let program = Pubkey::new_unique();

    let lookup_writable = vec![Pubkey::new_unique(), Pubkey::new_unique()];
    let lookup_readonly = vec![Pubkey::new_unique()];

    let table = AddressLookupTableAccount {
        key: Pubkey::new_unique(),
        addresses: vec![
            Pubkey::new_unique(),
            lookup_writable[0],
            lookup_readonly[0],
            lookup_writable[1],
            Pubkey::new_unique(),
        ],
    };

    let message = v0::Message {
        header: MessageHeader {
            num_required_signatures: 1,
            num_readonly_signed_accounts: 0,
            num_readonly_unsigned_accounts: 1,
        },
        account_keys: vec![payer, writable_account, program],
        recent_blockhash: Hash::new_from_array([3u8; 32]),
        instructions: vec![CompiledInstruction {
            program_id_index: 2,
            accounts: vec![0, 1, 3, 4, 5],
            data: vec![9, 8, 7],
        }],
        address_table_lookups: vec![v0::MessageAddressTableLookup {
            account_key: table.key,
            writable_indexes: vec![1, 3],
            readonly_indexes: vec![2],
        }],
    };

    Fixture {
        message,
        table,
        static_keys: vec![payer, writable_account, program],
        lookup_writable,
        lookup_readonly,
    }
}

/// The fixture's message alone
pub fn sample_message() -> v0::Message {
    fixture_message().message
}

/// An instruction in the shape of an idempotent token account creation
pub fn injected_instruction(payer: Pubkey) -> Instruction {
    Instruction::new_with_bytes(
        Pubkey::new_unique(),
        &[1],
        vec![
            AccountMeta::new(payer, true),
            AccountMeta::new(Pubkey::new_unique(), false),
            AccountMeta::new_readonly(Pubkey::new_unique(), false),
        ],
    )
}
