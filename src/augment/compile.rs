//! Recompilation of resolved instructions into a v0 message
//!
//! Compilation is `v0::Message::try_compile`; key placement is:
//! - the payer is the first writable signer, program ids are invoked
//! - static keys are grouped as writable signers, readonly signers,
//!   writable non-signers, readonly non-signers
//! - each table, in order, takes the non-signer, non-invoked keys it holds
//!   out of the static groups; a table that takes nothing is omitted
//!
//! The resulting key list follows the same ordering rule the decoder
//! resolves, so resolving the output reproduces the instructions.

use crate::augment::errors::AugmentError;
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    hash::Hash,
    instruction::Instruction,
    message::v0::Message,
    pubkey::Pubkey,
};

/// Compile `instructions` into a v0 message paid by `payer`
///
/// `tables` are offered in order; only those that end up serving at least
/// one account appear in the message's lookups. Account or table index
/// overflow and keys missing from the compiled list are invariant
/// violations.
pub fn compile_message(
    payer: &Pubkey,
    instructions: &[Instruction],
    tables: &[AddressLookupTableAccount],
    recent_blockhash: Hash,
) -> Result<Message, AugmentError> {
    Message::try_compile(payer, instructions, tables, recent_blockhash)
        .map_err(|e| AugmentError::invariant(format!("Cannot compile v0 message: {}", e)))
}
