//! Augmentation pipeline
//!
//! decode → fetch tables → resolve → fresh blockhash → prepend → recompile
//! → encode with zeroed signature slots.
//!
//! The pipeline is stateless; its only suspension points are the batched
//! table fetch and the blockhash fetch. Dropping the future at either point
//! leaves nothing behind.

use crate::augment::codec::{
    decode_transaction, encode_unsigned_transaction, DecodedTransaction, TransportEncoding,
};
use crate::augment::compile::compile_message;
use crate::augment::errors::AugmentError;
use crate::augment::lookup::{referenced_tables, resolve_lookup_tables};
use crate::augment::resolve::resolve_message;
use crate::compat;
use crate::metrics::{metrics, Timer};
use crate::observability::CorrelationId;
use crate::rpc::{BlockhashProvider, LookupTableFetcher};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Unsigned augmented transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentOutput {
    /// Recompiled message
    pub message: v0::Message,
    /// Wire bytes with one zeroed signature slot per required signer
    pub bytes: Vec<u8>,
    /// Lookup tables fetched while resolving the input
    pub fetched_tables: usize,
}

impl AugmentOutput {
    /// Keys whose signatures the output still needs, in slot order
    pub fn required_signers(&self) -> &[Pubkey] {
        compat::required_signers(&self.message)
    }

    pub fn encode(&self, encoding: TransportEncoding) -> String {
        encoding.encode(&self.bytes)
    }

    pub fn to_base58(&self) -> String {
        self.encode(TransportEncoding::Base58)
    }

    /// SDK form of the output, ready for signing
    pub fn to_versioned_transaction(&self) -> VersionedTransaction {
        VersionedTransaction {
            signatures: vec![Signature::default(); self.required_signers().len()],
            message: VersionedMessage::V0(self.message.clone()),
        }
    }
}

/// Prepend `injected` to the transaction in `tx_bytes`
///
/// The result is paid by `payer`, carries a fresh blockhash and reuses the
/// input's lookup tables. Input signatures are discarded.
#[instrument(skip(tx_bytes, injected, blockhash_provider, table_fetcher), fields(payer = %payer))]
pub async fn augment_bytes(
    tx_bytes: &[u8],
    payer: &Pubkey,
    injected: Instruction,
    blockhash_provider: &dyn BlockhashProvider,
    table_fetcher: &dyn LookupTableFetcher,
) -> Result<AugmentOutput, AugmentError> {
    let DecodedTransaction {
        signatures,
        message,
    } = decode_transaction(tx_bytes)?;
    debug!(
        signature_count = signatures.len(),
        instruction_count = message.instructions.len(),
        "Decoded base transaction"
    );

    let table_addresses = referenced_tables(&message);
    let tables = resolve_lookup_tables(table_fetcher, &table_addresses).await?;

    let (keys, original) = resolve_message(&message, &tables)?;
    debug!(
        resolved_keys = keys.len(),
        table_count = tables.len(),
        "Resolved base transaction accounts"
    );

    let recent_blockhash = blockhash_provider.latest_blockhash().await?;

    let mut instructions = Vec::with_capacity(original.len() + 1);
    instructions.push(injected);
    instructions.extend(original);

    let augmented = compile_message(payer, &instructions, &tables, recent_blockhash)?;
    let bytes = encode_unsigned_transaction(&augmented)?;

    debug!(
        instruction_count = augmented.instructions.len(),
        static_keys = augmented.account_keys.len(),
        lookups = augmented.address_table_lookups.len(),
        tx_len = bytes.len(),
        "Recompiled augmented transaction"
    );

    Ok(AugmentOutput {
        message: augmented,
        bytes,
        fetched_tables: tables.len(),
    })
}

/// Base-58 in, base-58 out variant of [`augment_bytes`]
pub async fn augment(
    encoded_tx: &str,
    payer: &Pubkey,
    injected: Instruction,
    blockhash_provider: &dyn BlockhashProvider,
    table_fetcher: &dyn LookupTableFetcher,
) -> Result<String, AugmentError> {
    let bytes = TransportEncoding::Base58.decode(encoded_tx)?;
    let output = augment_bytes(&bytes, payer, injected, blockhash_provider, table_fetcher).await?;
    Ok(output.to_base58())
}

/// Augmentation service with shared collaborators
///
/// Cheap to clone; each call runs in its own correlated span and is
/// recorded in the global metrics.
#[derive(Clone)]
pub struct Augmenter {
    tables: Arc<dyn LookupTableFetcher>,
    blockhash: Arc<dyn BlockhashProvider>,
}

impl Augmenter {
    pub fn new(tables: Arc<dyn LookupTableFetcher>, blockhash: Arc<dyn BlockhashProvider>) -> Self {
        Self { tables, blockhash }
    }

    /// Use one RPC client for both table and blockhash fetches
    pub fn from_rpc(client: Arc<RpcClient>) -> Self {
        Self::new(client.clone(), client)
    }

    #[instrument(
        skip(self, tx_bytes, injected),
        fields(correlation_id = %CorrelationId::new(), payer = %payer)
    )]
    pub async fn augment_bytes(
        &self,
        tx_bytes: &[u8],
        payer: &Pubkey,
        injected: Instruction,
    ) -> Result<AugmentOutput, AugmentError> {
        let m = metrics();
        m.augment_total.inc();
        let timer = Timer::new();

        let result = augment_bytes(
            tx_bytes,
            payer,
            injected,
            self.blockhash.as_ref(),
            self.tables.as_ref(),
        )
        .await;
        timer.observe_duration(&m.augment_latency);

        match &result {
            Ok(output) => {
                m.augment_success.inc();
                m.lookup_tables_resolved.inc_by(output.fetched_tables as u64);
                info!(
                    signers = output.required_signers().len(),
                    tx_len = output.bytes.len(),
                    elapsed_ms = timer.elapsed_secs() * 1000.0,
                    "Transaction augmented"
                );
            }
            Err(e) => {
                m.record_failure(e.category());
                warn!(error = %e, retryable = e.is_retryable(), "Augmentation failed");
            }
        }

        result
    }

    pub async fn augment(
        &self,
        encoded_tx: &str,
        payer: &Pubkey,
        injected: Instruction,
    ) -> Result<String, AugmentError> {
        let bytes = TransportEncoding::Base58.decode(encoded_tx)?;
        Ok(self.augment_bytes(&bytes, payer, injected).await?.to_base58())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::codec::{decode_transaction, encode_transaction};
    use crate::augment::errors::{DecodeError, ResolutionError};
    use crate::rpc::{FixedBlockhash, InMemoryAccounts};
    use crate::test_utils::{fixture_message, injected_instruction, Fixture};
    use async_trait::async_trait;
    use solana_sdk::{address_lookup_table::AddressLookupTableAccount, hash::Hash};

    struct NoBlockhash;

    #[async_trait]
    impl BlockhashProvider for NoBlockhash {
        async fn latest_blockhash(&self) -> Result<Hash, AugmentError> {
            Err(AugmentError::blockhash_unavailable("node is behind"))
        }
    }

    fn setup() -> (Fixture, InMemoryAccounts, String) {
        let fixture = fixture_message();
        let accounts = InMemoryAccounts::new();
        accounts.insert_lookup_table(fixture.table.key, &fixture.table.addresses);
        let bytes = encode_transaction(&[Signature::new_unique()], &fixture.message).unwrap();
        (fixture, accounts, bs58::encode(bytes).into_string())
    }

    fn resolve_output(
        encoded: &str,
        table: &AddressLookupTableAccount,
    ) -> (Vec<Signature>, v0::Message, Vec<Instruction>) {
        let decoded =
            decode_transaction(&TransportEncoding::Base58.decode(encoded).unwrap()).unwrap();
        let (_, instructions) =
            resolve_message(&decoded.message, std::slice::from_ref(table)).unwrap();
        (decoded.signatures, decoded.message, instructions)
    }

    #[tokio::test]
    async fn test_augment_prepends_instruction() {
        let (fixture, accounts, encoded) = setup();
        let payer = fixture.static_keys[0];
        let injected = injected_instruction(payer);
        let blockhash = Hash::new_unique();

        let (_, original) = resolve_message(&fixture.message, &[fixture.table.clone()]).unwrap();

        let out = augment(
            &encoded,
            &payer,
            injected.clone(),
            &FixedBlockhash(blockhash),
            &accounts,
        )
        .await
        .unwrap();

        let (signatures, message, instructions) = resolve_output(&out, &fixture.table);
        assert_eq!(instructions.len(), original.len() + 1);
        assert_eq!(instructions[0], injected);
        assert_eq!(&instructions[1..], &original[..]);
        assert_eq!(message.recent_blockhash, blockhash);
        assert_eq!(message.account_keys[0], payer);
        assert_eq!(
            signatures,
            vec![Signature::default(); usize::from(message.header.num_required_signatures)]
        );
        assert_eq!(message.address_table_lookups.len(), 1);
        assert_eq!(message.address_table_lookups[0].account_key, fixture.table.key);
        assert_eq!(accounts.table_fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_new_fee_payer_keeps_original_signer() {
        let (fixture, accounts, encoded) = setup();
        let new_payer = Pubkey::new_unique();

        let bytes = TransportEncoding::Base58.decode(&encoded).unwrap();
        let output = augment_bytes(
            &bytes,
            &new_payer,
            injected_instruction(new_payer),
            &FixedBlockhash(Hash::new_unique()),
            &accounts,
        )
        .await
        .unwrap();

        let signers = output.required_signers();
        assert_eq!(signers.len(), 2);
        assert_eq!(signers[0], new_payer);
        assert!(signers.contains(&fixture.static_keys[0]));
        assert_eq!(output.fetched_tables, 1);
        assert_eq!(output.to_versioned_transaction().signatures.len(), 2);
    }

    #[tokio::test]
    async fn test_augment_is_deterministic_apart_from_blockhash() {
        let (fixture, accounts, encoded) = setup();
        let payer = fixture.static_keys[0];
        let injected = injected_instruction(payer);

        let first = augment(
            &encoded,
            &payer,
            injected.clone(),
            &FixedBlockhash(Hash::new_unique()),
            &accounts,
        )
        .await
        .unwrap();
        let second = augment(
            &encoded,
            &payer,
            injected,
            &FixedBlockhash(Hash::new_unique()),
            &accounts,
        )
        .await
        .unwrap();

        let (_, mut first, _) = resolve_output(&first, &fixture.table);
        let (_, mut second, _) = resolve_output(&second, &fixture.table);
        assert_ne!(first.recent_blockhash, second.recent_blockhash);
        first.recent_blockhash = Hash::default();
        second.recent_blockhash = Hash::default();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_table_fails_without_output() {
        let (fixture, accounts, encoded) = setup();
        accounts.remove(&fixture.table.key);
        let payer = fixture.static_keys[0];

        let result = augment(
            &encoded,
            &payer,
            injected_instruction(payer),
            &FixedBlockhash(Hash::new_unique()),
            &accounts,
        )
        .await;

        assert!(matches!(
            result,
            Err(AugmentError::Resolution(ResolutionError::TableNotFound(key))) if key == fixture.table.key
        ));
    }

    #[tokio::test]
    async fn test_blockhash_failure_is_propagated() {
        let (fixture, accounts, encoded) = setup();
        let payer = fixture.static_keys[0];

        let result = augment(&encoded, &payer, injected_instruction(payer), &NoBlockhash, &accounts).await;
        let err = result.unwrap_err();
        assert_eq!(err.category(), "blockhash");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_encoding_is_decode_error() {
        let accounts = InMemoryAccounts::new();
        let payer = Pubkey::new_unique();

        let result = augment(
            "0OIl not base58",
            &payer,
            injected_instruction(payer),
            &FixedBlockhash(Hash::default()),
            &accounts,
        )
        .await;

        assert!(matches!(
            result,
            Err(AugmentError::Decode(DecodeError::Encoding { .. }))
        ));
        assert_eq!(accounts.table_fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_augmenter_records_metrics() {
        let (fixture, accounts, encoded) = setup();
        let payer = fixture.static_keys[0];
        let augmenter = Augmenter::new(Arc::new(accounts), Arc::new(FixedBlockhash(Hash::new_unique())));

        let before = metrics().augment_success.get();
        augmenter
            .augment(&encoded, &payer, injected_instruction(payer))
            .await
            .unwrap();
        assert!(metrics().augment_success.get() > before);

        let failed_before = metrics().augment_failed.with_label_values(&["decode"]).get();
        assert!(augmenter
            .augment("", &payer, injected_instruction(payer))
            .await
            .is_err());
        assert!(metrics().augment_failed.with_label_values(&["decode"]).get() > failed_before);
    }
}
