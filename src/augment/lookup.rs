//! Address lookup table resolution
//!
//! Lookup table account data is a fixed 56-byte metadata prefix followed by
//! densely packed 32-byte addresses:
//!
//! ```text
//! u32  state discriminator (1 = lookup table)
//! u64  deactivation slot
//! u64  last extended slot
//! u8   last extended slot start index
//! u8 + [u8; 32]  optional authority
//! u16  padding
//! [u8; 32] * n   addresses
//! ```

use crate::augment::errors::ResolutionError;
use crate::rpc::LookupTableFetcher;
use solana_sdk::{
    address_lookup_table::{
        state::{AddressLookupTable, LOOKUP_TABLE_META_SIZE},
        AddressLookupTableAccount,
    },
    message::v0,
    pubkey::Pubkey,
};
use tracing::debug;

/// Discriminator of an initialized lookup table
const LOOKUP_TABLE_DISCRIMINATOR: u32 = 1;

const PUBKEY_BYTES: usize = 32;

/// Table addresses referenced by a message, in declaration order
pub fn referenced_tables(message: &v0::Message) -> Vec<Pubkey> {
    message
        .address_table_lookups
        .iter()
        .map(|lookup| lookup.account_key)
        .collect()
}

/// Parse raw lookup table account data into its address list
pub fn parse_lookup_table(
    key: Pubkey,
    data: &[u8],
) -> Result<AddressLookupTableAccount, ResolutionError> {
    let state = AddressLookupTable::deserialize(data).map_err(|e| {
        ResolutionError::MalformedTable {
            table: key,
            reason: format!("{} ({} bytes of account data)", e, data.len()),
        }
    })?;

    Ok(AddressLookupTableAccount {
        key,
        addresses: state.addresses.to_vec(),
    })
}

/// Serialize an active lookup table's account data
///
/// Produces the same layout [`parse_lookup_table`] reads; used to seed
/// in-memory account stores.
pub fn encode_lookup_table_data(authority: Option<Pubkey>, addresses: &[Pubkey]) -> Vec<u8> {
    let mut data = Vec::with_capacity(LOOKUP_TABLE_META_SIZE + addresses.len() * PUBKEY_BYTES);
    data.extend_from_slice(&LOOKUP_TABLE_DISCRIMINATOR.to_le_bytes());
    data.extend_from_slice(&u64::MAX.to_le_bytes()); // deactivation slot: active
    data.extend_from_slice(&0u64.to_le_bytes()); // last extended slot
    data.push(0); // last extended slot start index
    match authority {
        Some(authority) => {
            data.push(1);
            data.extend_from_slice(authority.as_ref());
        }
        None => data.extend_from_slice(&[0u8; 1 + PUBKEY_BYTES]),
    }
    data.resize(LOOKUP_TABLE_META_SIZE, 0);
    for address in addresses {
        data.extend_from_slice(address.as_ref());
    }
    data
}

/// Fetch and parse every table in `addresses` with a single batched call
///
/// Fails on the first table that returned no data. An empty address list
/// succeeds without touching the fetcher.
pub async fn resolve_lookup_tables(
    fetcher: &dyn LookupTableFetcher,
    addresses: &[Pubkey],
) -> Result<Vec<AddressLookupTableAccount>, ResolutionError> {
    if addresses.is_empty() {
        return Ok(Vec::new());
    }

    let results = fetcher.fetch_tables(addresses).await?;
    if results.len() != addresses.len() {
        return Err(ResolutionError::FetchMismatch {
            requested: addresses.len(),
            returned: results.len(),
        });
    }

    let tables = addresses
        .iter()
        .zip(results)
        .map(|(address, data)| match data {
            Some(data) => parse_lookup_table(*address, &data),
            None => Err(ResolutionError::TableNotFound(*address)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        table_count = tables.len(),
        address_count = tables.iter().map(|t| t.addresses.len()).sum::<usize>(),
        "Resolved address lookup tables"
    );
    Ok(tables)
}
