//! Compatibility helpers over Solana SDK message types
//!
//! The protocol header stores *readonly* counts, while account flag
//! derivation and recompilation both need *writable* counts. These helpers
//! keep that arithmetic in one place so decode, resolution and compile
//! agree on it.

use solana_sdk::{
    message::{v0, MessageHeader},
    pubkey::Pubkey,
};

/// Accounts that must sign: the first `num_required_signatures` static keys
///
/// # Example
///
/// ```rust,no_run
/// use solana_sdk::{message::VersionedMessage, pubkey::Pubkey};
/// use tx_augment::compat;
///
/// fn fee_payer(message: &VersionedMessage) -> Option<Pubkey> {
///     match message {
///         VersionedMessage::V0(message) => compat::required_signers(message).first().copied(),
///         VersionedMessage::Legacy(_) => None,
///     }
/// }
/// ```
#[inline]
#[must_use]
pub fn required_signers(message: &v0::Message) -> &[Pubkey] {
    let num_signers = usize::from(message.header.num_required_signatures);
    &message.account_keys[..num_signers.min(message.account_keys.len())]
}

/// Number of writable signer slots at the front of the static keys
#[inline]
#[must_use]
pub fn num_writable_signers(header: &MessageHeader) -> usize {
    usize::from(
        header
            .num_required_signatures
            .saturating_sub(header.num_readonly_signed_accounts),
    )
}

/// Number of writable non-signer slots following the signers
#[inline]
#[must_use]
pub fn num_writable_non_signers(header: &MessageHeader, num_static: usize) -> usize {
    num_static
        .saturating_sub(usize::from(header.num_required_signatures))
        .saturating_sub(usize::from(header.num_readonly_unsigned_accounts))
}

/// Whether static slot `index` is a signer
#[inline]
#[must_use]
pub fn is_static_signer(header: &MessageHeader, index: usize) -> bool {
    index < usize::from(header.num_required_signatures)
}

/// Whether static slot `index` is writable
#[inline]
#[must_use]
pub fn is_static_writable(header: &MessageHeader, num_static: usize, index: usize) -> bool {
    let num_signers = usize::from(header.num_required_signatures);
    if index < num_signers {
        index < num_writable_signers(header)
    } else {
        index < num_signers + num_writable_non_signers(header, num_static)
    }
}
