//! tx-augment - v0 transaction augmentation library
//!
//! Prepends an instruction to an already-built Solana v0 transaction that
//! may load accounts through address lookup tables, and returns an unsigned
//! transaction that reuses those tables with a fresh blockhash.

pub mod augment;
pub mod compat;
pub mod config;
pub mod metrics;
pub mod observability;
pub mod referral;
pub mod rpc;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use augment::{augment, augment_bytes, AugmentError, AugmentOutput, Augmenter};
pub use solana_sdk::{instruction::Instruction, message::v0, pubkey::Pubkey, signature::Signature};
