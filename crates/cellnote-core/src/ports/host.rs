//! Host port - 外部スプレッドシートアプリのオブジェクトモデル
//!
//! ワーカースレッドだけがこの trait を呼びます。実装（COM など）は
//! スレッドに縛られるため、`Send` は要求しません。
//!
//! # 設計原則
//! - すべての呼び出しは `HostResult` を返す（閉じた `HostFault` 分類）
//! - `HostInstance` はキャッシュしない。1 attempt ごとに列挙し直す
//! - シートは常に名前で解決する

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::{CellRef, CellValue, SelectionRef};

pub type HostResult<T> = Result<T, HostFault>;

/// OS-level window identifier of a host instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hwnd:{:#x}", self.0)
    }
}

/// Raw failure of a host call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostFault {
    /// The host refused or could not service the call right now.
    #[error("call rejected: {0}")]
    CallRejected(String),

    #[error("modal dialog open")]
    ModalDialog,

    #[error("cell edit in progress")]
    EditMode,

    /// The call is not valid for the current object state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("instance disconnected")]
    Disconnected,
}

/// Process-level surface: thread attachment, message pump, instance registry.
pub trait HostApplication {
    /// Attach the calling thread to the host's messaging layer.
    fn attach_thread(&self) -> HostResult<()>;

    fn detach_thread(&self);

    /// Dispatch pending host messages without blocking. Returns how many were handled.
    fn drain_messages(&self) -> usize;

    /// Live instances straight from the OS registry of running instances.
    fn running_instances(&self) -> HostResult<Vec<Box<dyn HostInstance>>>;

    /// Window that currently owns foreground focus, if known.
    fn foreground_window(&self) -> HostResult<Option<WindowHandle>>;
}

/// One running host instance. Every getter reads live state.
pub trait HostInstance {
    fn window(&self) -> HostResult<WindowHandle>;

    fn version(&self) -> HostResult<String>;

    fn is_ready(&self) -> HostResult<bool>;

    fn is_editing(&self) -> HostResult<bool>;

    fn active_document(&self) -> HostResult<Option<String>>;

    fn active_sheet(&self) -> HostResult<Option<String>>;

    /// Current selection, tagged with the sheet it belongs to.
    fn selection(&self) -> HostResult<Option<SelectionRef>>;

    fn cell_value(&self, sheet: &str, cell: CellRef) -> HostResult<CellValue>;

    fn has_annotation(&self, sheet: &str, cell: CellRef) -> HostResult<bool>;

    fn delete_annotation(&self, sheet: &str, cell: CellRef) -> HostResult<()>;

    fn add_annotation(&self, sheet: &str, cell: CellRef, text: &str) -> HostResult<()>;
}
