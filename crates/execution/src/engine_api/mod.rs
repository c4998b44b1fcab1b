// crates/execution/src/engine_api/mod.rs

pub mod capabilities;

use alloy_rpc_types_engine::{
    ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadId, PayloadStatus,
};
use async_trait::async_trait;
use color_eyre::eyre;
use cobalt_types::{
    aliases::VersionedHash,
    payload::{BuiltPayload, ExecutableData},
};

pub use capabilities::EngineMethod;

/// The Engine API as the harness drives it: every call names its version
/// explicitly so that tests can deliberately pick the wrong one.
///
/// A client that rejects a call answers with `Err` wrapping an
/// [`ExecutionError::JsonRpc`](crate::ExecutionError::JsonRpc) carrying the
/// protocol error code.
#[async_trait]
pub trait EngineApi: Send + Sync {
    async fn forkchoice_updated(
        &self,
        version: u8,
        state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> eyre::Result<ForkchoiceUpdated>;

    async fn get_payload(&self, version: u8, payload_id: PayloadId) -> eyre::Result<BuiltPayload>;

    /// `versioned_hashes` is `None` when the call must omit the parameter
    /// altogether, which differs from an empty list from V3 on.
    async fn new_payload(
        &self,
        version: u8,
        payload: &ExecutableData,
        versioned_hashes: Option<Vec<VersionedHash>>,
    ) -> eyre::Result<PayloadStatus>;
}
