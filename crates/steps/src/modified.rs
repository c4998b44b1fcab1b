use std::sync::Arc;

use async_trait::async_trait;
use cobalt_execution::EngineMethod;
use tracing::debug;

use crate::{
    context::BlobTestContext,
    error::StepError,
    expect::{NewPayloadExpectation, PayloadStatusKind},
    step::TestStep,
    versioned_hashes::VersionedHashes,
};

const NEW_PAYLOAD_VERSION: u8 = 3;

/// Re-sends the latest built payload to one client with a chosen hash list.
///
/// No block is produced. Used to feed a client that is not following the
/// producer the same malformed input the primary client saw.
#[derive(Clone, Debug)]
pub struct SendModifiedLatestPayload {
    pub client_index: usize,
    pub versioned_hashes: VersionedHashes,
    pub expected_status: PayloadStatusKind,
}

#[async_trait]
impl TestStep for SendModifiedLatestPayload {
    async fn execute(&self, ctx: &Arc<BlobTestContext>) -> Result<(), StepError> {
        let payload = ctx.producer.latest_payload_built().ok_or(StepError::NoPayloadAvailable)?;
        let hashes = self.versioned_hashes.versioned_hashes(&ctx.engine)?;
        let client = ctx.client(self.client_index)?;

        let call = EngineMethod::NewPayload.name(NEW_PAYLOAD_VERSION)?;
        debug!(
            call,
            client = client.name(),
            block_hash = %payload.block_hash,
            "Re-sending payload"
        );

        let result = ctx
            .guard(call, client.engine().new_payload(NEW_PAYLOAD_VERSION, &payload, hashes))
            .await?;
        NewPayloadExpectation::status(self.expected_status).check(call, result)
    }

    fn description(&self) -> String {
        format!(
            "SendModifiedLatestPayload: client {}, expected status {}, {}",
            self.client_index, self.expected_status, self.versioned_hashes
        )
    }
}
