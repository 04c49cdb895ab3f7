//! Domain model (ids, tasks, selections, errors, decisions, outcomes).

pub mod decision;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod selection;
pub mod task;

pub use decision::{Decider, Decision, DefaultDecider};
pub use errors::{ErrorKind, SessionError};
pub use ids::{SessionId, TaskId};
pub use outcome::{Degradation, HealthReport, OutcomeKind, TaskReport, TaskResult, WriteReceipt};
pub use selection::{CellRef, CellValue, Context, SelectionRef};
pub use task::{Task, TaskKind};
