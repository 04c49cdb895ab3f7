//! Errors - エラー型と分類
//!
//! host への呼び出しはすべて `HostFault` を返し、ここで `ErrorKind` に分類します。
//! リトライ判定は `ErrorKind` だけを見る純粋関数です（例外の中身を覗かない）。

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::ports::HostFault;

/// ErrorKind は実行エラーの分類（閉じた集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No running host instance. User-visible, not retried.
    ConnectionUnavailable,

    /// Several instances and none owns the target window. Degrades, never fails alone.
    InstanceAmbiguous,

    /// A live property or method call failed (busy, rejected, modal dialog).
    TransientComFailure,

    /// Readiness probe timed out.
    HostNotReady,

    /// Selection sheet did not match the live active sheet and correction failed.
    StaleSelection,

    /// Multi-cell selection; collapsed to its top-left cell.
    InvalidSelectionShape,

    /// The user is editing a cell. Retrying cannot clear a human-held state.
    EditModeActive,

    /// The task itself cannot be executed (e.g. prompted task without a prompt).
    MalformedTask,

    /// The content source failed.
    ContentFetch,
}

impl ErrorKind {
    /// Retry predicate for the backoff controller.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::TransientComFailure | ErrorKind::HostNotReady | ErrorKind::StaleSelection
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConnectionUnavailable => "connection_unavailable",
            ErrorKind::InstanceAmbiguous => "instance_ambiguous",
            ErrorKind::TransientComFailure => "transient_com_failure",
            ErrorKind::HostNotReady => "host_not_ready",
            ErrorKind::StaleSelection => "stale_selection",
            ErrorKind::InvalidSelectionShape => "invalid_selection_shape",
            ErrorKind::EditModeActive => "edit_mode_active",
            ErrorKind::MalformedTask => "malformed_task",
            ErrorKind::ContentFetch => "content_fetch",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every session-level operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SessionError {
    kind: ErrorKind,
    message: String,
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn connection_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionUnavailable, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientComFailure, message)
    }

    pub fn stale(expected: &str, actual: &str) -> Self {
        Self::new(
            ErrorKind::StaleSelection,
            format!("selection is on sheet '{expected}' but the active sheet is '{actual}'"),
        )
    }

    pub fn stale_document(expected: &str, actual: &str) -> Self {
        Self::new(
            ErrorKind::StaleSelection,
            format!("selection is in workbook '{expected}' but the active workbook is '{actual}'"),
        )
    }

    pub fn edit_mode() -> Self {
        Self::new(
            ErrorKind::EditModeActive,
            "a cell is being edited; press Esc in the spreadsheet and trigger again",
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedTask, message)
    }
}

/// Classify a raw host fault.
impl From<HostFault> for SessionError {
    fn from(fault: HostFault) -> Self {
        match fault {
            HostFault::EditMode => SessionError::edit_mode(),
            HostFault::CallRejected(msg) => SessionError::transient(format!("call rejected: {msg}")),
            HostFault::ModalDialog => {
                SessionError::transient("a modal dialog is blocking the host application")
            }
            HostFault::InvalidOperation(msg) => {
                SessionError::transient(format!("invalid operation: {msg}"))
            }
            HostFault::Disconnected => SessionError::transient("host instance disconnected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::TransientComFailure, true)]
    #[case(ErrorKind::HostNotReady, true)]
    #[case(ErrorKind::StaleSelection, true)]
    #[case(ErrorKind::ConnectionUnavailable, false)]
    #[case(ErrorKind::EditModeActive, false)]
    #[case(ErrorKind::MalformedTask, false)]
    #[case(ErrorKind::ContentFetch, false)]
    fn retry_predicate_depends_only_on_kind(#[case] kind: ErrorKind, #[case] retryable: bool) {
        assert_eq!(kind.is_retryable(), retryable);
        assert_eq!(SessionError::new(kind, "x").is_retryable(), retryable);
    }

    #[rstest]
    #[case(HostFault::CallRejected("busy".into()), ErrorKind::TransientComFailure)]
    #[case(HostFault::ModalDialog, ErrorKind::TransientComFailure)]
    #[case(HostFault::InvalidOperation("AddComment".into()), ErrorKind::TransientComFailure)]
    #[case(HostFault::Disconnected, ErrorKind::TransientComFailure)]
    #[case(HostFault::EditMode, ErrorKind::EditModeActive)]
    fn host_faults_are_classified(#[case] fault: HostFault, #[case] kind: ErrorKind) {
        assert_eq!(SessionError::from(fault).kind(), kind);
    }

    #[test]
    fn edit_mode_message_tells_user_what_to_do() {
        let err = SessionError::edit_mode();
        assert!(err.to_string().contains("Esc"));
    }
}
