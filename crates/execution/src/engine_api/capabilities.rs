// crates/execution/src/engine_api/capabilities.rs

use crate::error::ExecutionError;

pub const ENGINE_NEW_PAYLOAD_V1: &str = "engine_newPayloadV1";
pub const ENGINE_NEW_PAYLOAD_V2: &str = "engine_newPayloadV2";
pub const ENGINE_NEW_PAYLOAD_V3: &str = "engine_newPayloadV3";
pub const ENGINE_NEW_PAYLOAD_V4: &str = "engine_newPayloadV4";

pub const ENGINE_GET_PAYLOAD_V1: &str = "engine_getPayloadV1";
pub const ENGINE_GET_PAYLOAD_V2: &str = "engine_getPayloadV2";
pub const ENGINE_GET_PAYLOAD_V3: &str = "engine_getPayloadV3";
pub const ENGINE_GET_PAYLOAD_V4: &str = "engine_getPayloadV4";

pub const ENGINE_FORKCHOICE_UPDATED_V1: &str = "engine_forkchoiceUpdatedV1";
pub const ENGINE_FORKCHOICE_UPDATED_V2: &str = "engine_forkchoiceUpdatedV2";
pub const ENGINE_FORKCHOICE_UPDATED_V3: &str = "engine_forkchoiceUpdatedV3";

pub const ETH_SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";
pub const ETH_GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
pub const ETH_GET_TRANSACTION_BY_HASH: &str = "eth_getTransactionByHash";

/// The versioned Engine API method families the harness drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineMethod {
    NewPayload,
    GetPayload,
    ForkchoiceUpdated,
}

impl EngineMethod {
    /// Wire name of this method at `version`.
    pub fn name(self, version: u8) -> Result<&'static str, ExecutionError> {
        let name = match (self, version) {
            (Self::NewPayload, 1) => ENGINE_NEW_PAYLOAD_V1,
            (Self::NewPayload, 2) => ENGINE_NEW_PAYLOAD_V2,
            (Self::NewPayload, 3) => ENGINE_NEW_PAYLOAD_V3,
            (Self::NewPayload, 4) => ENGINE_NEW_PAYLOAD_V4,
            (Self::GetPayload, 1) => ENGINE_GET_PAYLOAD_V1,
            (Self::GetPayload, 2) => ENGINE_GET_PAYLOAD_V2,
            (Self::GetPayload, 3) => ENGINE_GET_PAYLOAD_V3,
            (Self::GetPayload, 4) => ENGINE_GET_PAYLOAD_V4,
            (Self::ForkchoiceUpdated, 1) => ENGINE_FORKCHOICE_UPDATED_V1,
            (Self::ForkchoiceUpdated, 2) => ENGINE_FORKCHOICE_UPDATED_V2,
            (Self::ForkchoiceUpdated, 3) => ENGINE_FORKCHOICE_UPDATED_V3,
            (method, version) => {
                return Err(ExecutionError::MethodNotSupported(format!("{method:?}V{version}")));
            }
        };
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_per_version() {
        assert_eq!(EngineMethod::NewPayload.name(3).unwrap(), "engine_newPayloadV3");
        assert_eq!(EngineMethod::GetPayload.name(4).unwrap(), "engine_getPayloadV4");
        assert_eq!(
            EngineMethod::ForkchoiceUpdated.name(1).unwrap(),
            "engine_forkchoiceUpdatedV1"
        );
        assert!(EngineMethod::ForkchoiceUpdated.name(4).is_err());
        assert!(EngineMethod::NewPayload.name(0).is_err());
    }
}
