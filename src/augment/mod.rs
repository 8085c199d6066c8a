//! v0 transaction augmentation
//!
//! Takes a serialized v0 transaction that may load accounts through address
//! lookup tables, prepends one instruction, and produces an unsigned v0
//! transaction that reuses the same tables.
//!
//! Modules, in pipeline order:
//! - `codec`: wire format decode/encode
//! - `lookup`: batched lookup table fetch and parsing
//! - `resolve`: canonical key list and instruction reconstruction
//! - `compile`: key placement and instruction recompilation
//! - `engine`: the end-to-end pipeline and the [`Augmenter`] service

pub mod codec;
pub mod compile;
pub mod engine;
pub mod errors;
pub mod lookup;
pub mod resolve;

pub use codec::{
    decode_message, decode_transaction, encode_message, encode_transaction,
    encode_unsigned_transaction, DecodedTransaction, TransportEncoding,
};
pub use compile::compile_message;
pub use engine::{augment, augment_bytes, AugmentOutput, Augmenter};
pub use errors::{AugmentError, DecodeError, ResolutionError};
pub use lookup::{parse_lookup_table, referenced_tables, resolve_lookup_tables};
pub use resolve::{resolve_instructions, resolve_message, ResolvedKeys};
