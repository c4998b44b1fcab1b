//! In-memory execution client.
//!
//! Implements just enough of an execution layer to answer the Engine API and
//! the transaction RPC calls the way a conforming client would: parameter and
//! fork checks with the Engine API error codes, a mempool with fee-bump
//! replacement, payload building with the blob gas fee market, and receipts
//! once a block becomes canonical. There is no EVM and no reorg handling.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use alloy_consensus::{Transaction, transaction::SignerRecoverable};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, B256, U256};
use alloy_rpc_types_engine::{
    ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadId, PayloadStatus,
    PayloadStatusEnum,
};
use async_trait::async_trait;
use cobalt_blob_engine::CommitmentEngine;
use cobalt_execution::{EngineApi, EthRpc, ExecutionError, ReceiptSummary};
use cobalt_types::{
    aliases::{TxEnvelope, TxHash, VersionedHash},
    blob::{BlobTxWrapData, BlobsBundle},
    constants::{
        BLOB_COMMITMENT_VERSION_KZG, GAS_PER_BLOB, INVALID_PARAMS_ERROR, MAX_BLOBS_PER_BLOCK,
        UNKNOWN_PAYLOAD_ERROR, UNSUPPORTED_FORK_ERROR,
    },
    fees::{blob_gas_price, calc_excess_blob_gas},
    fork::{Fork, ForkConfig},
    payload::{BuiltPayload, ExecutableData},
    transaction::TransactionWithBlobData,
};
use color_eyre::eyre;
use tracing::debug;

const GAS_LIMIT: u64 = 30_000_000;
const BASE_FEE: u64 = 7;
const TX_GAS: u64 = 21_000;
/// Fee caps of a replacement must at least double, as in a blob pool.
const REPLACEMENT_BUMP: u128 = 2;

/// Generic "transaction rejected" code used by execution clients.
pub const TX_REJECTED_ERROR: i64 = -32000;
/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND_ERROR: i64 = -32601;

/// Mutates the bundle returned by `getPayload`, to simulate a faulty client.
pub type BundleTamper = Arc<dyn Fn(&mut BlobsBundle) + Send + Sync>;

/// One `newPayload` call as the client saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPayloadCall {
    pub version: u8,
    pub block_hash: B256,
    pub versioned_hashes: Option<Vec<VersionedHash>>,
    pub status: PayloadStatus,
}

#[derive(Default)]
struct ChainState {
    blocks: HashMap<B256, ExecutableData>,
    canonical: HashSet<B256>,
    head: B256,
    mempool: BTreeMap<(Address, u64), TransactionWithBlobData>,
    nonces: HashMap<Address, u64>,
    included: HashMap<TxHash, TxEnvelope>,
    receipts: HashMap<TxHash, ReceiptSummary>,
    payloads: HashMap<PayloadId, BuiltPayload>,
    next_payload_id: u64,
    new_payload_calls: Vec<NewPayloadCall>,
    forkchoice_calls: Vec<ForkchoiceState>,
}

impl ChainState {
    /// Makes `head` canonical, replaying every not yet canonical ancestor.
    fn set_head(&mut self, head: B256) {
        let mut pending = Vec::new();
        let mut cursor = head;
        while !self.canonical.contains(&cursor) {
            let Some(block) = self.blocks.get(&cursor) else { break };
            pending.push(cursor);
            cursor = block.parent_hash;
        }
        for hash in pending.into_iter().rev() {
            self.canonicalize(hash);
        }
        self.head = head;
    }

    fn canonicalize(&mut self, hash: B256) {
        let Some(block) = self.blocks.get(&hash).cloned() else { return };
        let Ok(txs) = block.decode_transactions() else { return };
        let price = blob_gas_price(block.excess_blob_gas.unwrap_or_default());

        for tx in txs {
            let tx_hash = *tx.tx_hash();
            let blobs = tx.blob_versioned_hashes().map(|hashes| hashes.len() as u64);
            self.receipts.insert(
                tx_hash,
                ReceiptSummary {
                    tx_hash,
                    block_hash: hash,
                    block_number: block.block_number,
                    blob_gas_used: blobs.map(|n| n * GAS_PER_BLOB),
                    blob_gas_price: blobs.map(|_| price),
                },
            );
            if let Ok(sender) = tx.recover_signer() {
                let nonce = tx.nonce();
                self.nonces.insert(sender, nonce + 1);
                self.mempool.retain(|(s, n), _| *s != sender || *n > nonce);
            }
            self.included.insert(tx_hash, tx);
        }
        self.canonical.insert(hash);
        debug!(%hash, number = block.block_number, "Block canonical");
    }

    /// Assembles a payload on top of the head from the executable part of
    /// the mempool.
    fn build(
        &self,
        fork_config: &ForkConfig,
        attrs: &PayloadAttributes,
    ) -> eyre::Result<BuiltPayload> {
        let parent = self
            .blocks
            .get(&self.head)
            .ok_or_else(|| eyre::eyre!("head block {} unknown", self.head))?;
        let cancun = fork_config.is_cancun(attrs.timestamp);
        let excess_blob_gas = cancun.then(|| {
            calc_excess_blob_gas(
                parent.excess_blob_gas.unwrap_or_default(),
                parent.blob_gas_used.unwrap_or_default(),
            )
        });
        let price = blob_gas_price(excess_blob_gas.unwrap_or_default());

        let mut wrap = BlobTxWrapData::default();
        let mut transactions = Vec::new();
        let mut next_nonce: HashMap<Address, u64> = HashMap::new();
        for ((sender, nonce), tx) in &self.mempool {
            let expected = *next_nonce
                .entry(*sender)
                .or_insert_with(|| self.nonces.get(sender).copied().unwrap_or_default());
            if *nonce != expected || tx.tx.max_fee_per_gas() < u128::from(BASE_FEE) {
                continue;
            }
            if tx.tx.is_eip4844() {
                let fits = wrap.len() + tx.blob_data.len() <= MAX_BLOBS_PER_BLOCK as usize;
                if !cancun || !fits || tx.tx.max_fee_per_blob_gas().unwrap_or_default() < price {
                    continue;
                }
            }
            wrap.extend_from(&tx.blob_data);
            transactions.push(tx.tx.encoded_2718().into());
            next_nonce.insert(*sender, expected + 1);
        }

        let mut payload = ExecutableData {
            parent_hash: parent.block_hash,
            fee_recipient: attrs.suggested_fee_recipient,
            prev_randao: attrs.prev_randao,
            block_number: parent.block_number + 1,
            gas_limit: GAS_LIMIT,
            gas_used: TX_GAS * transactions.len() as u64,
            timestamp: attrs.timestamp,
            base_fee_per_gas: U256::from(BASE_FEE),
            transactions,
            withdrawals: attrs.withdrawals.clone(),
            blob_gas_used: cancun.then(|| wrap.len() as u64 * GAS_PER_BLOB),
            excess_blob_gas,
            parent_beacon_block_root: attrs.parent_beacon_block_root,
            ..Default::default()
        };
        payload.reseal()?;

        Ok(BuiltPayload {
            payload,
            block_value: U256::ZERO,
            blobs_bundle: cancun.then(|| BlobsBundle::from(wrap)),
            should_override_builder: false,
        })
    }
}

/// An execution client held entirely in memory.
pub struct MockExecutionClient {
    fork_config: ForkConfig,
    genesis: ExecutableData,
    commitments: Option<CommitmentEngine>,
    bundle_tamper: Option<BundleTamper>,
    chain: Mutex<ChainState>,
}

fn rpc_error(code: i64, message: impl Into<String>) -> eyre::Report {
    ExecutionError::json_rpc(code, message).into()
}

fn invalid(reason: impl Into<String>, latest_valid_hash: Option<B256>) -> PayloadStatus {
    PayloadStatus::new(
        PayloadStatusEnum::Invalid { validation_error: reason.into() },
        latest_valid_hash,
    )
}

fn outbids(new: &TxEnvelope, old: &TxEnvelope) -> bool {
    let bumped = |new: u128, old: u128| new >= old.saturating_mul(REPLACEMENT_BUMP);
    bumped(new.max_fee_per_gas(), old.max_fee_per_gas())
        && bumped(
            new.max_priority_fee_per_gas().unwrap_or_default(),
            old.max_priority_fee_per_gas().unwrap_or_default(),
        )
        && bumped(
            new.max_fee_per_blob_gas().unwrap_or_default(),
            old.max_fee_per_blob_gas().unwrap_or_default(),
        )
}

impl MockExecutionClient {
    /// Starts a chain whose genesis has `genesis_timestamp`.
    ///
    /// Two clients built with the same arguments share the genesis hash.
    pub fn new(fork_config: ForkConfig, genesis_timestamp: u64) -> eyre::Result<Self> {
        let cancun = fork_config.is_cancun(genesis_timestamp);
        let mut genesis = ExecutableData {
            gas_limit: GAS_LIMIT,
            timestamp: genesis_timestamp,
            base_fee_per_gas: U256::from(BASE_FEE),
            withdrawals: fork_config.is_shanghai(genesis_timestamp).then(Vec::new),
            blob_gas_used: cancun.then_some(0),
            excess_blob_gas: cancun.then_some(0),
            parent_beacon_block_root: cancun.then_some(B256::ZERO),
            ..Default::default()
        };
        genesis.reseal()?;

        let mut chain = ChainState::default();
        chain.blocks.insert(genesis.block_hash, genesis.clone());
        chain.set_head(genesis.block_hash);

        Ok(Self {
            fork_config,
            genesis,
            commitments: None,
            bundle_tamper: None,
            chain: Mutex::new(chain),
        })
    }

    /// Verifies the KZG proofs of every submitted blob transaction.
    pub fn with_commitment_check(mut self, engine: CommitmentEngine) -> Self {
        self.commitments = Some(engine);
        self
    }

    pub fn with_bundle_tamper(
        mut self,
        tamper: impl Fn(&mut BlobsBundle) + Send + Sync + 'static,
    ) -> Self {
        self.bundle_tamper = Some(Arc::new(tamper));
        self
    }

    pub fn genesis(&self) -> &ExecutableData {
        &self.genesis
    }

    pub fn head(&self) -> B256 {
        self.lock().head
    }

    pub fn block(&self, hash: &B256) -> Option<ExecutableData> {
        self.lock().blocks.get(hash).cloned()
    }

    pub fn mempool_len(&self) -> usize {
        self.lock().mempool.len()
    }

    pub fn new_payload_calls(&self) -> Vec<NewPayloadCall> {
        self.lock().new_payload_calls.clone()
    }

    pub fn forkchoice_calls(&self) -> Vec<ForkchoiceState> {
        self.lock().forkchoice_calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_attributes(&self, version: u8, attrs: &PayloadAttributes) -> eyre::Result<()> {
        let cancun = self.fork_config.is_cancun(attrs.timestamp);
        let has_beacon_root = attrs.parent_beacon_block_root.is_some();
        match version {
            3 => {
                if !has_beacon_root {
                    return Err(rpc_error(INVALID_PARAMS_ERROR, "missing parentBeaconBlockRoot"));
                }
                if !cancun {
                    return Err(rpc_error(UNSUPPORTED_FORK_ERROR, "Unsupported fork"));
                }
            }
            1 | 2 => {
                if has_beacon_root {
                    return Err(rpc_error(INVALID_PARAMS_ERROR, "unexpected parentBeaconBlockRoot"));
                }
                if version == 1 && attrs.withdrawals.is_some() {
                    return Err(rpc_error(INVALID_PARAMS_ERROR, "unexpected withdrawals"));
                }
                if cancun {
                    return Err(rpc_error(UNSUPPORTED_FORK_ERROR, "Unsupported fork"));
                }
            }
            _ => {
                return Err(rpc_error(
                    METHOD_NOT_FOUND_ERROR,
                    format!("engine_forkchoiceUpdatedV{version} not available"),
                ));
            }
        }
        Ok(())
    }

    fn check_new_payload_params(
        &self,
        version: u8,
        payload: &ExecutableData,
        versioned_hashes: Option<&[VersionedHash]>,
    ) -> eyre::Result<()> {
        let fork = self.fork_config.fork_at(payload.timestamp);
        let blob_fields = payload.blob_gas_used.is_some() || payload.excess_blob_gas.is_some();
        let missing = |field: &str| rpc_error(INVALID_PARAMS_ERROR, format!("missing {field}"));
        let unsupported = || rpc_error(UNSUPPORTED_FORK_ERROR, "Unsupported fork");

        match version {
            1 | 2 => {
                if blob_fields {
                    return Err(rpc_error(INVALID_PARAMS_ERROR, "unexpected blob gas fields"));
                }
                if version == 1 && payload.withdrawals.is_some() {
                    return Err(rpc_error(INVALID_PARAMS_ERROR, "unexpected withdrawals"));
                }
                if fork > Fork::Shanghai || (version == 1 && fork == Fork::Shanghai) {
                    return Err(unsupported());
                }
            }
            3 | 4 => {
                if versioned_hashes.is_none() {
                    return Err(missing("expectedBlobVersionedHashes"));
                }
                if payload.parent_beacon_block_root.is_none() {
                    return Err(missing("parentBeaconBlockRoot"));
                }
                if payload.blob_gas_used.is_none() {
                    return Err(missing("blobGasUsed"));
                }
                if payload.excess_blob_gas.is_none() {
                    return Err(missing("excessBlobGas"));
                }
                if payload.withdrawals.is_none() {
                    return Err(missing("withdrawals"));
                }
                if version == 4 && payload.execution_requests.is_none() {
                    return Err(missing("executionRequests"));
                }
                if fork.payload_version() != version {
                    return Err(unsupported());
                }
            }
            _ => {
                return Err(rpc_error(
                    METHOD_NOT_FOUND_ERROR,
                    format!("engine_newPayloadV{version} not available"),
                ));
            }
        }
        Ok(())
    }

    /// Content checks. Everything that does not need the parent runs first,
    /// so a syncing client still rejects malformed payloads.
    fn validate_payload(
        &self,
        payload: &ExecutableData,
        versioned_hashes: Option<&[VersionedHash]>,
    ) -> PayloadStatus {
        let txs = match payload.decode_transactions() {
            Ok(txs) => txs,
            Err(e) => return invalid(e.to_string(), None),
        };
        match payload.compute_block_hash() {
            Ok(hash) if hash == payload.block_hash => {}
            _ => return invalid("invalid block hash", None),
        }

        let body_hashes: Vec<VersionedHash> = txs
            .iter()
            .flat_map(|tx| tx.blob_versioned_hashes().unwrap_or_default().iter().copied())
            .collect();
        if let Some(hashes) = versioned_hashes {
            if hashes != body_hashes.as_slice() {
                return invalid("invalid versioned hashes", None);
            }
        }
        if let Some(used) = payload.blob_gas_used {
            if used != body_hashes.len() as u64 * GAS_PER_BLOB {
                return invalid(format!("invalid blobGasUsed {used}"), None);
            }
        }
        if !self.fork_config.is_cancun(payload.timestamp) && !body_hashes.is_empty() {
            return invalid("blob transactions before Cancun", None);
        }

        let mut chain = self.lock();
        if chain.blocks.contains_key(&payload.block_hash) {
            return PayloadStatus::new(PayloadStatusEnum::Valid, Some(payload.block_hash));
        }
        let Some(parent) = chain.blocks.get(&payload.parent_hash) else {
            return PayloadStatus::from_status(PayloadStatusEnum::Syncing);
        };
        if payload.block_number != parent.block_number + 1 || payload.timestamp <= parent.timestamp
        {
            return invalid("invalid block number or timestamp", Some(parent.block_hash));
        }
        if let Some(excess) = payload.excess_blob_gas {
            let expected = calc_excess_blob_gas(
                parent.excess_blob_gas.unwrap_or_default(),
                parent.blob_gas_used.unwrap_or_default(),
            );
            if excess != expected {
                return invalid(
                    format!("invalid excessBlobGas: have {excess}, want {expected}"),
                    Some(parent.block_hash),
                );
            }
        }

        chain.blocks.insert(payload.block_hash, payload.clone());
        PayloadStatus::new(PayloadStatusEnum::Valid, Some(payload.block_hash))
    }
}

impl fmt::Debug for MockExecutionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockExecutionClient")
            .field("fork_config", &self.fork_config)
            .field("genesis", &self.genesis.block_hash)
            .field("head", &self.head())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EngineApi for MockExecutionClient {
    async fn forkchoice_updated(
        &self,
        version: u8,
        state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> eyre::Result<ForkchoiceUpdated> {
        if let Some(attrs) = &payload_attributes {
            self.check_attributes(version, attrs)?;
        }

        let mut chain = self.lock();
        chain.forkchoice_calls.push(state);
        if !chain.blocks.contains_key(&state.head_block_hash) {
            return Ok(ForkchoiceUpdated {
                payload_status: PayloadStatus::from_status(PayloadStatusEnum::Syncing),
                payload_id: None,
            });
        }
        chain.set_head(state.head_block_hash);

        let payload_id = match payload_attributes {
            Some(attrs) => {
                let built = chain.build(&self.fork_config, &attrs)?;
                let id = PayloadId::new(chain.next_payload_id.to_be_bytes());
                chain.next_payload_id += 1;
                debug!(
                    id = ?id,
                    number = built.payload.block_number,
                    txs = built.payload.transactions.len(),
                    "Built payload"
                );
                chain.payloads.insert(id, built);
                Some(id)
            }
            None => None,
        };

        Ok(ForkchoiceUpdated {
            payload_status: PayloadStatus::new(
                PayloadStatusEnum::Valid,
                Some(state.head_block_hash),
            ),
            payload_id,
        })
    }

    async fn get_payload(&self, version: u8, payload_id: PayloadId) -> eyre::Result<BuiltPayload> {
        let mut built = self
            .lock()
            .payloads
            .get(&payload_id)
            .cloned()
            .ok_or_else(|| rpc_error(UNKNOWN_PAYLOAD_ERROR, "Unknown payload"))?;

        let fork = self.fork_config.fork_at(built.payload.timestamp);
        let supported = fork.payload_version() == version || (version == 2 && fork == Fork::Paris);
        if !supported {
            return Err(rpc_error(UNSUPPORTED_FORK_ERROR, "Unsupported fork"));
        }

        if version < 3 {
            built.blobs_bundle = None;
        } else if let (Some(tamper), Some(bundle)) =
            (&self.bundle_tamper, built.blobs_bundle.as_mut())
        {
            tamper(bundle);
        }
        Ok(built)
    }

    async fn new_payload(
        &self,
        version: u8,
        payload: &ExecutableData,
        versioned_hashes: Option<Vec<VersionedHash>>,
    ) -> eyre::Result<PayloadStatus> {
        self.check_new_payload_params(version, payload, versioned_hashes.as_deref())?;
        let status = self.validate_payload(payload, versioned_hashes.as_deref());
        debug!(version, block_hash = %payload.block_hash, status = ?status.status, "newPayload");

        self.lock().new_payload_calls.push(NewPayloadCall {
            version,
            block_hash: payload.block_hash,
            versioned_hashes,
            status: status.clone(),
        });
        Ok(status)
    }
}

#[async_trait]
impl EthRpc for MockExecutionClient {
    async fn send_transaction(&self, tx: &TransactionWithBlobData) -> eyre::Result<TxHash> {
        let reject = |reason: String| rpc_error(TX_REJECTED_ERROR, reason);

        tx.validate().map_err(|e| reject(e.to_string()))?;
        if let Some(engine) = &self.commitments {
            engine
                .verify_proofs(&BlobsBundle::from(tx.blob_data.clone()))
                .map_err(|e| reject(e.to_string()))?;
        }
        if tx.versioned_hashes() != tx.blob_data.versioned_hashes(BLOB_COMMITMENT_VERSION_KZG) {
            return Err(reject("blob versioned hashes do not match commitments".into()));
        }

        let sender = tx.sender().map_err(|e| reject(e.to_string()))?;
        let nonce = tx.nonce();
        let mut chain = self.lock();
        if nonce < chain.nonces.get(&sender).copied().unwrap_or_default() {
            return Err(reject("nonce too low".into()));
        }
        if let Some(existing) = chain.mempool.get(&(sender, nonce)) {
            if !outbids(&tx.tx, &existing.tx) {
                return Err(reject("replacement transaction underpriced".into()));
            }
        }
        chain.mempool.insert((sender, nonce), tx.clone());
        debug!(tx_hash = %tx.hash(), %sender, nonce, "Transaction pooled");
        Ok(tx.hash())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> eyre::Result<Option<ReceiptSummary>> {
        Ok(self.lock().receipts.get(&hash).cloned())
    }

    async fn pooled_transaction(&self, hash: TxHash) -> eyre::Result<Option<TxEnvelope>> {
        let chain = self.lock();
        let pooled = chain.mempool.values().find(|tx| tx.hash() == hash).map(|tx| tx.tx.clone());
        Ok(pooled.or_else(|| chain.included.get(&hash).cloned()))
    }
}
