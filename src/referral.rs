//! Referral token account planning
//!
//! Before a position is opened, the referral owner's associated token
//! account for the traded mint is created if it does not exist yet. The
//! creation instruction is what gets prepended to the base transaction.
//! Mints owned by Token-2022 are skipped and the transaction is used as is.

use crate::augment::{AugmentError, Augmenter};
use crate::metrics::metrics;
use crate::rpc::AccountFetcher;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};
use tracing::{debug, info};

/// Token-2022 program; referral accounts are not created for its mints
pub const TOKEN_2022_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

/// What has to happen for the referral token account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralPlan {
    /// Mint is owned by Token-2022
    Skipped,
    /// Account already exists at this address
    Exists(Pubkey),
    /// Account must be created with `instruction`
    Create {
        address: Pubkey,
        instruction: Instruction,
    },
}

impl ReferralPlan {
    /// Referral token account address, when one applies
    pub fn address(&self) -> Option<Pubkey> {
        match self {
            Self::Skipped => None,
            Self::Exists(address) | Self::Create { address, .. } => Some(*address),
        }
    }

    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            Self::Create { instruction, .. } => Some(instruction),
            _ => None,
        }
    }
}

/// Decide whether the referral token account for `mint` needs creating
///
/// The token program is taken from the mint account's owner; any owner other
/// than SPL Token or Token-2022 is rejected.
pub async fn plan_referral_instruction(
    accounts: &dyn AccountFetcher,
    payer: &Pubkey,
    referral_owner: &Pubkey,
    mint: &Pubkey,
) -> Result<ReferralPlan, AugmentError> {
    let mint_account = accounts
        .get_account(mint)
        .await?
        .ok_or_else(|| AugmentError::rpc(format!("Mint account {} not found", mint)))?;
    let token_program = mint_account.owner;

    if token_program == TOKEN_2022_PROGRAM_ID {
        debug!(%mint, "Token-2022 mint, no referral account");
        return Ok(ReferralPlan::Skipped);
    }
    if token_program != spl_token::id() {
        return Err(AugmentError::rpc(format!(
            "Account {} is not a token mint (owner {})",
            mint, token_program
        )));
    }

    let address = get_associated_token_address_with_program_id(referral_owner, mint, &token_program);
    if accounts.get_account(&address).await?.is_some() {
        debug!(%address, "Referral token account exists");
        return Ok(ReferralPlan::Exists(address));
    }

    Ok(ReferralPlan::Create {
        address,
        instruction: create_associated_token_account_idempotent(
            payer,
            referral_owner,
            mint,
            &token_program,
        ),
    })
}

/// Result of [`augment_with_referral`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralOutcome {
    /// Base-58 transaction to sign
    pub transaction: String,
    /// Referral token account, if the mint has one
    pub referral_account: Option<Pubkey>,
    /// Whether a creation instruction was prepended
    pub created: bool,
}

/// Prepend the referral account creation to `encoded_tx` when needed
///
/// When nothing has to be created the input is returned untouched, keeping
/// its blockhash and signatures.
pub async fn augment_with_referral(
    augmenter: &Augmenter,
    accounts: &dyn AccountFetcher,
    encoded_tx: &str,
    payer: &Pubkey,
    referral_owner: &Pubkey,
    mint: &Pubkey,
) -> Result<ReferralOutcome, AugmentError> {
    match plan_referral_instruction(accounts, payer, referral_owner, mint).await? {
        ReferralPlan::Create {
            address,
            instruction,
        } => {
            let transaction = augmenter.augment(encoded_tx, payer, instruction).await?;
            metrics().referral_instructions_created.inc();
            info!(%address, %mint, "Referral token account creation prepended");
            Ok(ReferralOutcome {
                transaction,
                referral_account: Some(address),
                created: true,
            })
        }
        plan => Ok(ReferralOutcome {
            transaction: encoded_tx.to_string(),
            referral_account: plan.address(),
            created: false,
        }),
    }
}
