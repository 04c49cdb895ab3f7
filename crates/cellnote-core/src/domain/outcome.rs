//! Outcome model: what the worker reports for each processed task.
//!
//! Failures are reported here, never raised past the worker.

use serde::{Deserialize, Serialize};

use super::{CellRef, ErrorKind, TaskId, TaskKind};

/// A unified classification of a task result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Success,
    Failure,
}

/// Something that went sideways but was corrected without failing the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Several host instances, none owning the target window.
    InstanceAmbiguous { candidates: usize, chosen_window: u64 },

    /// The held selection pointed at a sheet that is no longer active.
    StaleSelectionCorrected { from_sheet: String, to_sheet: String },

    /// A range was selected; only its top-left cell was annotated.
    SelectionCollapsed { range: String, cell: String },
}

/// Result of one annotation write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub document: String,
    pub sheet: String,
    pub cell: CellRef,
    /// The selection spanned more than one cell.
    pub collapsed: bool,
    /// An existing annotation was deleted first.
    pub replaced: bool,
    pub chars: usize,
}

/// Health-check output surfaced to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub detail: String,
}

impl HealthReport {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            ready: false,
            detail: detail.into(),
            ..Self::default()
        }
    }
}

/// Payload of a task result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskResult {
    Annotated(WriteReceipt),
    Health(HealthReport),
    Failed { error: ErrorKind, message: String },
}

/// One report per processed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_id: TaskId,
    pub kind: TaskKind,
    pub outcome: OutcomeKind,
    pub result: TaskResult,
    pub attempts: u32,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,
}

impl TaskReport {
    pub fn is_success(&self) -> bool {
        self.outcome == OutcomeKind::Success
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.result {
            TaskResult::Failed { error, .. } => Some(*error),
            _ => None,
        }
    }

    pub fn receipt(&self) -> Option<&WriteReceipt> {
        match &self.result {
            TaskResult::Annotated(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub fn health(&self) -> Option<&HealthReport> {
        match &self.result {
            TaskResult::Health(health) => Some(health),
            _ => None,
        }
    }
}
