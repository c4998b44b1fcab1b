//! The harness' record of every blob transaction it has sent.
//!
//! This is not a mempool. It never orders or evicts; it only remembers which
//! wrap data backs which transaction hash, the order transactions were
//! submitted in, and the counters parallel senders draw from.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use alloy_primitives::{Address, B256};
use cobalt_blob_engine::BlobId;
use cobalt_types::transaction::TransactionWithBlobData;
use tracing::debug;

use crate::error::PoolError;

#[derive(Debug, Default)]
struct PoolState {
    transactions: HashMap<B256, Arc<TransactionWithBlobData>>,
    hash_by_index: BTreeMap<u64, B256>,
    next_blob_id: BlobId,
    next_tx_index: u64,
    nonces: HashMap<Address, u64>,
}

/// Shared, lock-guarded transaction record.
///
/// Every method takes the lock only for the duration of one mutation or one
/// snapshot read, never across an await point.
#[derive(Debug, Default)]
pub struct TestBlobTxPool {
    state: Mutex<PoolState>,
}

impl TestBlobTxPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool whose first reserved blob identifier is `first`.
    pub fn starting_at(first: BlobId) -> Self {
        Self { state: Mutex::new(PoolState { next_blob_id: first, ..Default::default() }) }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // State is only ever mutated in single statements, a panic elsewhere
        // cannot leave it half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves `count` consecutive blob identifiers and returns the first.
    pub fn reserve_blob_ids(&self, count: u64) -> Result<BlobId, PoolError> {
        let mut state = self.lock();
        let first = state.next_blob_id;
        state.next_blob_id =
            first.checked_offset(count).ok_or(PoolError::BlobIdsExhausted { first, count })?;
        Ok(first)
    }

    /// The identifier the next reservation will start at.
    pub fn next_blob_id(&self) -> BlobId {
        self.lock().next_blob_id
    }

    /// Records a sent transaction and returns its submission index.
    ///
    /// The wrap data must line up with the transaction's blob hash list;
    /// a mismatch is reported, never truncated.
    pub fn add_transaction(&self, tx: TransactionWithBlobData) -> Result<u64, PoolError> {
        tx.validate()?;
        let hash = tx.hash();

        let mut state = self.lock();
        let index = state.next_tx_index;
        state.next_tx_index += 1;
        state.hash_by_index.insert(index, hash);
        state.transactions.insert(hash, Arc::new(tx));
        drop(state);

        debug!(%hash, index, "Added blob transaction to test pool");
        Ok(index)
    }

    pub fn get(&self, hash: &B256) -> Option<Arc<TransactionWithBlobData>> {
        self.lock().transactions.get(hash).cloned()
    }

    pub fn contains(&self, hash: &B256) -> bool {
        self.lock().transactions.contains_key(hash)
    }

    /// Hash of the `index`-th submitted transaction.
    pub fn hash_by_index(&self, index: u64) -> Option<B256> {
        self.lock().hash_by_index.get(&index).copied()
    }

    /// Number of transactions submitted so far.
    pub fn transaction_count(&self) -> u64 {
        self.lock().next_tx_index
    }

    /// Allocates the nonce for a new transaction from `address`.
    pub fn next_nonce(&self, address: Address) -> u64 {
        let mut state = self.lock();
        let nonce = state.nonces.entry(address).or_insert(0);
        let current = *nonce;
        *nonce += 1;
        current
    }

    /// Hands back `nonce` after its transaction was rejected.
    ///
    /// Only the newest allocation can be returned. Returns `false` when a
    /// later nonce was handed out meanwhile, leaving a gap.
    pub fn release_nonce(&self, address: Address, nonce: u64) -> bool {
        let mut state = self.lock();
        match state.nonces.get_mut(&address) {
            Some(next) if *next == nonce + 1 => {
                *next = nonce;
                true
            }
            _ => false,
        }
    }

    /// The most recently allocated nonce of `address`, for replacements.
    pub fn last_nonce(&self, address: Address) -> Result<u64, PoolError> {
        match self.lock().nonces.get(&address) {
            Some(next) if *next > 0 => Ok(next - 1),
            _ => Err(PoolError::NoPreviousNonce { address }),
        }
    }
}
