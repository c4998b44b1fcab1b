//! Declared outcomes of Engine API calls.

use std::fmt;

use alloy_rpc_types_engine::{PayloadStatus, PayloadStatusEnum};
use cobalt_execution::rpc_error_code;
use color_eyre::eyre;

use crate::error::StepError;

/// Payload status without the validation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadStatusKind {
    Valid,
    Invalid,
    Syncing,
    Accepted,
}

impl From<&PayloadStatusEnum> for PayloadStatusKind {
    fn from(status: &PayloadStatusEnum) -> Self {
        match status {
            PayloadStatusEnum::Valid => Self::Valid,
            PayloadStatusEnum::Invalid { .. } => Self::Invalid,
            PayloadStatusEnum::Syncing => Self::Syncing,
            PayloadStatusEnum::Accepted => Self::Accepted,
        }
    }
}

impl fmt::Display for PayloadStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::Syncing => "SYNCING",
            Self::Accepted => "ACCEPTED",
        };
        f.write_str(s)
    }
}

/// What a `newPayload` call must return.
///
/// An expected error code takes precedence: the call must then fail with
/// exactly that code. Otherwise the call must succeed and, when a status is
/// given, report it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NewPayloadExpectation {
    pub error_code: Option<i64>,
    pub status: Option<PayloadStatusKind>,
}

impl NewPayloadExpectation {
    pub fn status(status: PayloadStatusKind) -> Self {
        Self { error_code: None, status: Some(status) }
    }

    pub fn error(code: i64) -> Self {
        Self { error_code: Some(code), status: None }
    }

    pub fn check(
        &self,
        call: &'static str,
        result: eyre::Result<PayloadStatus>,
    ) -> Result<(), StepError> {
        match (self.error_code, result) {
            (Some(expected), Ok(status)) => Err(StepError::Expectation {
                call,
                expected: format!("error code {expected}"),
                actual: format!("status {}", PayloadStatusKind::from(&status.status)),
            }),
            (Some(expected), Err(report)) => match rpc_error_code(&report) {
                Some(code) if code == expected => Ok(()),
                Some(code) => Err(StepError::Expectation {
                    call,
                    expected: format!("error code {expected}"),
                    actual: format!("error code {code}"),
                }),
                None => Err(StepError::Expectation {
                    call,
                    expected: format!("error code {expected}"),
                    actual: format!("{report:#}"),
                }),
            },
            (None, Err(report)) => Err(StepError::Rpc { call, report }),
            (None, Ok(status)) => {
                let actual = PayloadStatusKind::from(&status.status);
                match self.status {
                    Some(expected) if expected != actual => Err(StepError::Expectation {
                        call,
                        expected: format!("status {expected}"),
                        actual: format!("status {actual}"),
                    }),
                    _ => Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cobalt_execution::ExecutionError;

    use super::*;

    fn status(s: PayloadStatusEnum) -> eyre::Result<PayloadStatus> {
        Ok(PayloadStatus::from_status(s))
    }

    fn rpc_err(code: i64) -> eyre::Result<PayloadStatus> {
        Err(ExecutionError::json_rpc(code, "boom").into())
    }

    #[test]
    fn expected_error_code() {
        let exp = NewPayloadExpectation::error(-38005);
        assert!(exp.check("newPayload", rpc_err(-38005)).is_ok());
        assert!(matches!(
            exp.check("newPayload", rpc_err(-32602)),
            Err(StepError::Expectation { .. })
        ));
        assert!(matches!(
            exp.check("newPayload", status(PayloadStatusEnum::Valid)),
            Err(StepError::Expectation { .. })
        ));
    }

    #[test]
    fn expected_status() {
        let exp = NewPayloadExpectation::status(PayloadStatusKind::Invalid);
        let invalid = PayloadStatusEnum::Invalid { validation_error: "bad hashes".into() };
        assert!(exp.check("newPayload", status(invalid)).is_ok());

        let err = exp.check("newPayload", status(PayloadStatusEnum::Valid)).unwrap_err();
        assert_eq!(err.to_string(), "newPayload: expected status INVALID, got status VALID");
    }

    #[test]
    fn no_expectation_requires_success() {
        let exp = NewPayloadExpectation::default();
        assert!(exp.check("newPayload", status(PayloadStatusEnum::Syncing)).is_ok());
        assert!(matches!(exp.check("newPayload", rpc_err(-32602)), Err(StepError::Rpc { .. })));
    }
}
