//! Benchmark for decode and augmentation performance

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use tx_augment::augment::{augment_bytes, decode_transaction, TransportEncoding};
use tx_augment::rpc::{FixedBlockhash, InMemoryAccounts};

/// A base transaction loading 32 accounts from each of two tables
fn fixture() -> (Pubkey, Vec<u8>, InMemoryAccounts) {
    let accounts = InMemoryAccounts::new();
    let payer = Pubkey::new_unique();

    let mut tables = Vec::new();
    let mut metas = vec![AccountMeta::new(payer, true)];
    for _ in 0..2 {
        let addresses: Vec<Pubkey> = (0..32).map(|_| Pubkey::new_unique()).collect();
        let key = accounts.add_lookup_table(&addresses);
        metas.extend(addresses.iter().map(|a| AccountMeta::new_readonly(*a, false)));
        tables.push(AddressLookupTableAccount { key, addresses });
    }

    let ix = Instruction::new_with_bytes(Pubkey::new_unique(), &[0; 64], metas);
    let message = v0::Message::try_compile(&payer, &[ix], &tables, Hash::new_unique()).unwrap();
    let tx = VersionedTransaction {
        signatures: vec![Signature::default()],
        message: VersionedMessage::V0(message),
    };
    (payer, bincode::serialize(&tx).unwrap(), accounts)
}

fn bench_decode(c: &mut Criterion) {
    let (_, bytes, _) = fixture();

    c.bench_function("decode_transaction", |b| {
        b.iter(|| decode_transaction(black_box(&bytes)).unwrap());
    });

    let encoded = TransportEncoding::Base58.encode(&bytes);
    c.bench_function("decode_base58_transaction", |b| {
        b.iter(|| {
            let bytes = TransportEncoding::Base58.decode(black_box(&encoded)).unwrap();
            decode_transaction(&bytes).unwrap()
        });
    });
}

fn bench_augment(c: &mut Criterion) {
    let (payer, bytes, accounts) = fixture();
    let blockhash = FixedBlockhash(Hash::new_unique());
    let injected = Instruction::new_with_bytes(
        Pubkey::new_unique(),
        &[1],
        vec![AccountMeta::new(payer, true)],
    );
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("augment_bytes", |b| {
        b.iter(|| {
            runtime
                .block_on(augment_bytes(
                    black_box(&bytes),
                    &payer,
                    injected.clone(),
                    &blockhash,
                    &accounts,
                ))
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_decode, bench_augment);
criterion_main!(benches);
