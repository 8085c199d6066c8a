//! External collaborators of the augmentation engine
//!
//! The engine suspends on exactly two network calls: a batched lookup table
//! fetch and a fresh blockhash fetch. Both are abstracted behind traits so
//! the pipeline stays independent of the transport. Implementations are
//! provided for the nonblocking `RpcClient` and for an in-memory account
//! store used in tests and offline runs.
//!
//! No implementation retries or backs off; the first failure is returned.

use crate::augment::errors::{AugmentError, ResolutionError};
use crate::augment::lookup::encode_lookup_table_data;
use crate::config::RpcConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{account::Account, hash::Hash, pubkey::Pubkey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Owner of every address lookup table account
pub const ADDRESS_LOOKUP_TABLE_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("AddressLookupTab1e1111111111111111111111111");

/// Batched lookup table fetch
#[async_trait]
pub trait LookupTableFetcher: Send + Sync {
    /// Fetch raw account data for every address in one round trip
    ///
    /// Returns one entry per requested address, in request order; `None`
    /// means the table does not exist.
    async fn fetch_tables(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, ResolutionError>;
}

/// Source of fresh recent blockhashes
#[async_trait]
pub trait BlockhashProvider: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash, AugmentError>;
}

/// Single account lookup
#[async_trait]
pub trait AccountFetcher: Send + Sync {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, AugmentError>;
}

/// Accounts not owned by the lookup table program are reported as absent
fn lookup_table_payload(account: Option<Account>) -> Option<Vec<u8>> {
    account
        .filter(|account| account.owner == ADDRESS_LOOKUP_TABLE_PROGRAM_ID)
        .map(|account| account.data)
}

/// Build a nonblocking RPC client from configuration
pub fn rpc_client(config: &RpcConfig) -> anyhow::Result<RpcClient> {
    Ok(RpcClient::new_with_timeout_and_commitment(
        config.url.clone(),
        Duration::from_secs(config.timeout_secs),
        config.commitment_config()?,
    ))
}

#[async_trait]
impl LookupTableFetcher for RpcClient {
    async fn fetch_tables(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, ResolutionError> {
        let accounts = self
            .get_multiple_accounts(addresses)
            .await
            .map_err(|e| ResolutionError::Fetch(e.to_string()))?;
        Ok(accounts.into_iter().map(lookup_table_payload).collect())
    }
}

#[async_trait]
impl BlockhashProvider for RpcClient {
    async fn latest_blockhash(&self) -> Result<Hash, AugmentError> {
        // Expiry (last valid block height) is the caller's concern
        let (blockhash, _last_valid_block_height) = self
            .get_latest_blockhash_with_commitment(self.commitment())
            .await
            .map_err(|e| AugmentError::blockhash_unavailable(e.to_string()))?;
        Ok(blockhash)
    }
}

#[async_trait]
impl AccountFetcher for RpcClient {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, AugmentError> {
        self.get_account_with_commitment(address, self.commitment())
            .await
            .map(|response| response.value)
            .map_err(|e| AugmentError::rpc(format!("get_account {}: {}", address, e)))
    }
}

/// In-memory account store
///
/// Counts batched table fetches so callers can assert the round-trip bound.
#[derive(Debug, Default)]
pub struct InMemoryAccounts {
    accounts: RwLock<HashMap<Pubkey, Account>>,
    table_fetches: AtomicUsize,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, address: Pubkey, account: Account) {
        self.accounts.write().insert(address, account);
    }

    pub fn remove(&self, address: &Pubkey) -> Option<Account> {
        self.accounts.write().remove(address)
    }

    /// Store a lookup table at `key`
    pub fn insert_lookup_table(&self, key: Pubkey, addresses: &[Pubkey]) {
        self.insert(
            key,
            Account {
                lamports: 1,
                data: encode_lookup_table_data(None, addresses),
                owner: ADDRESS_LOOKUP_TABLE_PROGRAM_ID,
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    /// Store a lookup table at a fresh address and return that address
    pub fn add_lookup_table(&self, addresses: &[Pubkey]) -> Pubkey {
        let key = Pubkey::new_unique();
        self.insert_lookup_table(key, addresses);
        key
    }

    /// Number of `fetch_tables` calls served so far
    pub fn table_fetch_count(&self) -> usize {
        self.table_fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LookupTableFetcher for InMemoryAccounts {
    async fn fetch_tables(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, ResolutionError> {
        self.table_fetches.fetch_add(1, Ordering::Relaxed);
        let accounts = self.accounts.read();
        Ok(addresses
            .iter()
            .map(|address| lookup_table_payload(accounts.get(address).cloned()))
            .collect())
    }
}

#[async_trait]
impl AccountFetcher for InMemoryAccounts {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, AugmentError> {
        Ok(self.accounts.read().get(address).cloned())
    }
}

/// Blockhash provider returning a fixed value
#[derive(Debug, Clone, Copy)]
pub struct FixedBlockhash(pub Hash);

#[async_trait]
impl BlockhashProvider for FixedBlockhash {
    async fn latest_blockhash(&self) -> Result<Hash, AugmentError> {
        Ok(self.0)
    }
}
