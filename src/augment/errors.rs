//! Error types for the augmentation engine
//!
//! Errors are split by the pipeline stage that produces them:
//! - [`DecodeError`]: the input bytes are not a well-formed v0 transaction
//! - [`ResolutionError`]: lookup tables or account indexes cannot be resolved
//! - [`AugmentError`]: the top-level error returned by the pipeline, which
//!   wraps the two above and adds recompilation and collaborator failures
//!
//! None of these are retried inside the engine. `is_retryable()` is a hint
//! for the caller, who may re-run the whole operation with a fresh base
//! transaction.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Malformed or unsupported input transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Text transport encoding (base-58 / base-64) could not be decoded
    #[error("Invalid {encoding} transaction encoding: {reason}")]
    Encoding {
        encoding: &'static str,
        reason: String,
    },

    /// A declared length points past the end of the input
    #[error("Truncated input while reading {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// compact-u16 length prefix is non-minimal or overflows
    #[error("Invalid compact-u16 length at offset {offset}")]
    InvalidCompactU16 { offset: usize },

    /// The message is a legacy (unversioned) message
    #[error("Legacy messages are not supported, expected a v0 message")]
    LegacyMessage,

    /// The message carries a version other than v0
    #[error("Unsupported message version: {0}")]
    UnsupportedVersion(u8),

    /// Header counts are inconsistent with the static account keys
    #[error("Invalid message header: {0}")]
    InvalidHeader(String),

    /// Bytes left over after the message was fully decoded
    #[error("Over-long input: {0} trailing bytes after message")]
    TrailingBytes(usize),
}

/// Lookup table or account index resolution failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// A referenced lookup table returned no account data
    ///
    /// Never skipped: dropping a table would shift every index that
    /// follows it in the resolved key list.
    #[error("Address lookup table not found: {0}")]
    TableNotFound(Pubkey),

    /// Table account data does not follow the lookup table layout
    #[error("Malformed address lookup table {table}: {reason}")]
    MalformedTable { table: Pubkey, reason: String },

    /// A lookup references a slot beyond the table's address list
    #[error("Lookup index {index} out of range for table {table} ({len} addresses)")]
    LookupIndexOutOfRange { table: Pubkey, index: u8, len: usize },

    /// A compiled instruction references an account beyond the resolved key list
    #[error("Instruction {instruction} references account index {index}, but only {len} keys resolved")]
    AccountIndexOutOfRange {
        instruction: usize,
        index: u8,
        len: usize,
    },

    /// The table fetch returned a different number of results than requested
    #[error("Lookup table fetch returned {returned} results for {requested} tables")]
    FetchMismatch { requested: usize, returned: usize },

    /// Transport failure while fetching tables
    #[error("Lookup table fetch failed: {0}")]
    Fetch(String),
}

/// Top-level error for the augmentation pipeline
#[derive(Error, Debug)]
pub enum AugmentError {
    /// Input transaction could not be decoded
    #[error("Cannot process this transaction: {0}")]
    Decode(#[from] DecodeError),

    /// Lookup tables or account indexes could not be resolved
    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// Recompilation contract broken by the caller
    ///
    /// Examples: an injected instruction pushing the message past 256
    /// accounts, or an account assigned to a table that does not hold it.
    /// This is a programming defect, not a runtime condition.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Fresh blockhash could not be obtained
    #[error("Blockhash error: {0}")]
    Blockhash(String),

    /// Account fetch failure outside lookup table resolution
    #[error("RPC error: {0}")]
    Rpc(String),
}

impl AugmentError {
    /// Whether re-running the whole operation might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Blockhash(_) => true,
            Self::Rpc(_) => true,
            Self::Resolution(ResolutionError::Fetch(_)) => true,

            Self::Decode(_) => false,
            Self::Resolution(_) => false,
            Self::InvariantViolation(_) => false,
        }
    }

    /// Error category for metrics labels
    pub fn category(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Resolution(_) => "resolution",
            Self::InvariantViolation(_) => "invariant",
            Self::Blockhash(_) => "blockhash",
            Self::Rpc(_) => "rpc",
        }
    }
}

// Convenience constructors
impl AugmentError {
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation(reason.into())
    }

    pub fn blockhash_unavailable(reason: impl Into<String>) -> Self {
        Self::Blockhash(reason.into())
    }

    pub fn rpc(reason: impl Into<String>) -> Self {
        Self::Rpc(reason.into())
    }
}
