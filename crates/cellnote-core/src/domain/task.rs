//! Task: the unit handed from the trigger surface to the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TaskId;

/// What a trigger asked the worker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Annotate the selected cell from its header context.
    AutoAnnotate,

    /// Same as `AutoAnnotate`, plus an analyst prompt appended to the note.
    PromptedAnnotate,

    /// Report host readiness and the resolved document/sheet; never writes.
    HealthCheck,

    /// Stop the worker once the in-flight task (if any) is done.
    Quit,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::AutoAnnotate => "auto_annotate",
            TaskKind::PromptedAnnotate => "prompted_annotate",
            TaskKind::HealthCheck => "health_check",
            TaskKind::Quit => "quit",
        }
    }

    /// Does this kind write an annotation?
    pub fn writes(self) -> bool {
        matches!(self, TaskKind::AutoAnnotate | TaskKind::PromptedAnnotate)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable trigger task. Consumed exactly once by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    kind: TaskKind,
    prompt: Option<String>,
    enqueued_at: DateTime<Utc>,
}

impl Task {
    pub fn new(kind: TaskKind, prompt: Option<String>) -> Self {
        Self {
            id: TaskId::generate(),
            kind,
            prompt,
            enqueued_at: Utc::now(),
        }
    }

    pub fn auto_annotate() -> Self {
        Self::new(TaskKind::AutoAnnotate, None)
    }

    pub fn prompted(prompt: impl Into<String>) -> Self {
        Self::new(TaskKind::PromptedAnnotate, Some(prompt.into()))
    }

    pub fn health_check() -> Self {
        Self::new(TaskKind::HealthCheck, None)
    }

    pub fn quit() -> Self {
        Self::new(TaskKind::Quit, None)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }
}
