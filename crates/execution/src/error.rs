#![allow(missing_docs)]

use color_eyre::eyre;
use thiserror::Error;

/// Defines the specific error types for the execution client.
///
/// This enum is used to classify errors, but collaborator traits return
/// `eyre::Result`. Steps that expect a particular JSON-RPC error recover the
/// code with [`rpc_error_code`].
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("JSON-RPC error (code {code}): {message}")]
    JsonRpc { code: i64, message: String },

    #[error("Method not supported: {0}")]
    MethodNotSupported(String),
}

impl ExecutionError {
    pub fn json_rpc(code: i64, message: impl Into<String>) -> Self {
        Self::JsonRpc { code, message: message.into() }
    }
}

/// JSON-RPC error code carried by `report`, if it wraps one anywhere in its
/// chain.
pub fn rpc_error_code(report: &eyre::Report) -> Option<i64> {
    report.chain().find_map(|cause| match cause.downcast_ref::<ExecutionError>() {
        Some(ExecutionError::JsonRpc { code, .. }) => Some(*code),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use color_eyre::eyre::WrapErr;

    use super::*;

    #[test]
    fn code_is_found_through_context() {
        let report: eyre::Report = ExecutionError::json_rpc(-38005, "Unsupported fork").into();
        assert_eq!(rpc_error_code(&report), Some(-38005));

        let wrapped = Err::<(), _>(report).wrap_err("engine_newPayloadV3").unwrap_err();
        assert_eq!(rpc_error_code(&wrapped), Some(-38005));

        let other = eyre::eyre!("connection refused");
        assert_eq!(rpc_error_code(&other), None);
    }
}
