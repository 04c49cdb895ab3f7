//! SimulatedHost - 開発・テスト用のスプレッドシートホスト
//!
//! 実アプリの代わりに、メモリ上のワークブックに対して `HostApplication` を実装します。
//!
//! # テストで再現できること
//! - 任意の呼び出しに対するフォールト注入（`fail_next`）
//! - シート切り替え直後の古い selection 読み取り（`activate_sheet_lagging`）
//! - メッセージ drain まで反映されないシート切り替え（`queue_sheet_switch`）
//! - 一定時間アクティブドキュメントが読めない状態（`document_unavailable_for`）
//! - 編集モード・モーダルダイアログ・ready フラグ

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::domain::{CellRef, CellValue, SelectionRef};
use crate::ports::{HostApplication, HostFault, HostInstance, HostResult, WindowHandle};

/// Host calls that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    Enumerate,
    Window,
    Version,
    IsReady,
    ActiveDocument,
    ActiveSheet,
    Selection,
    CellValue,
    HasAnnotation,
    DeleteAnnotation,
    AddAnnotation,
}

#[derive(Debug)]
struct ScriptedFault {
    op: HostOp,
    remaining: u32,
    fault: HostFault,
}

#[derive(Debug, Default)]
struct SimSheet {
    cells: HashMap<CellRef, CellValue>,
    /// A `Vec` so a double add would be visible.
    annotations: HashMap<CellRef, Vec<String>>,
}

#[derive(Debug, Clone)]
struct SimSelection {
    sheet: String,
    row: u32,
    col: u32,
    rows: u32,
    cols: u32,
}

#[derive(Debug)]
struct SimInstance {
    window: WindowHandle,
    version: String,
    ready: bool,
    editing: bool,
    modal: bool,
    document: Option<String>,
    document_available_at: Option<Instant>,
    active_sheet: String,
    sheets: BTreeMap<String, SimSheet>,
    selection: SimSelection,
    stale_sheet: String,
    stale_reads: u32,
}

impl SimInstance {
    fn new(window: u64, document: &str, sheets: &[&str]) -> Self {
        let first = sheets.first().copied().unwrap_or("Sheet1").to_string();
        let mut map: BTreeMap<String, SimSheet> = sheets
            .iter()
            .map(|name| (name.to_string(), SimSheet::default()))
            .collect();
        map.entry(first.clone()).or_default();
        Self {
            window: WindowHandle(window),
            version: "16.0".into(),
            ready: true,
            editing: false,
            modal: false,
            document: Some(document.to_string()),
            document_available_at: None,
            active_sheet: first.clone(),
            sheets: map,
            selection: SimSelection {
                sheet: first.clone(),
                row: 1,
                col: 1,
                rows: 1,
                cols: 1,
            },
            stale_sheet: first,
            stale_reads: 0,
        }
    }

    fn sheet(&self, name: &str) -> HostResult<&SimSheet> {
        self.sheets
            .get(name)
            .ok_or_else(|| HostFault::InvalidOperation(format!("no sheet named '{name}'")))
    }

    fn sheet_mut(&mut self, name: &str) -> HostResult<&mut SimSheet> {
        self.sheets
            .get_mut(name)
            .ok_or_else(|| HostFault::InvalidOperation(format!("no sheet named '{name}'")))
    }

    fn activate(&mut self, name: &str) {
        self.sheets.entry(name.to_string()).or_default();
        self.stale_sheet = self.active_sheet.clone();
        self.active_sheet = name.to_string();
        self.selection.sheet = name.to_string();
    }
}

#[derive(Debug, Default)]
struct SimState {
    instances: Vec<SimInstance>,
    foreground: Option<WindowHandle>,
    attached: bool,
    attach_fault: Option<HostFault>,
    drain_calls: usize,
    pending_switches: VecDeque<String>,
    faults: Vec<ScriptedFault>,
}

impl SimState {
    fn take_fault(&mut self, op: HostOp) -> HostResult<()> {
        if let Some(pos) = self.faults.iter().position(|f| f.op == op && f.remaining > 0) {
            let scripted = &mut self.faults[pos];
            scripted.remaining -= 1;
            let fault = scripted.fault.clone();
            if scripted.remaining == 0 {
                self.faults.remove(pos);
            }
            return Err(fault);
        }
        Ok(())
    }

    fn primary(&mut self) -> &mut SimInstance {
        if self.instances.is_empty() {
            self.instances
                .push(SimInstance::new(SimulatedHost::PRIMARY_WINDOW, "Book1", &["Sheet1"]));
        }
        &mut self.instances[0]
    }
}

/// In-memory host. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedHost {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedHost {
    pub const PRIMARY_WINDOW: u64 = 0x1001;

    /// No running instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// One instance with one workbook, focused, first sheet active, A1 selected.
    pub fn single(document: &str, sheets: &[&str]) -> Self {
        let host = Self::new();
        host.add_instance(Self::PRIMARY_WINDOW, document, sheets);
        host.set_foreground(Some(Self::PRIMARY_WINDOW));
        host
    }

    pub fn add_instance(&self, window: u64, document: &str, sheets: &[&str]) {
        self.state
            .lock()
            .instances
            .push(SimInstance::new(window, document, sheets));
    }

    pub fn close_all(&self) {
        self.state.lock().instances.clear();
    }

    pub fn set_foreground(&self, window: Option<u64>) {
        self.state.lock().foreground = window.map(WindowHandle);
    }

    pub fn fail_attach(&self, fault: HostFault) {
        self.state.lock().attach_fault = Some(fault);
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().attached
    }

    pub fn drain_calls(&self) -> usize {
        self.state.lock().drain_calls
    }

    /// The next `times` calls of `op` fail with `fault`.
    pub fn fail_next(&self, op: HostOp, times: u32, fault: HostFault) {
        if times > 0 {
            self.state.lock().faults.push(ScriptedFault {
                op,
                remaining: times,
                fault,
            });
        }
    }

    pub fn set_cell(&self, sheet: &str, row: u32, col: u32, value: CellValue) {
        let mut state = self.state.lock();
        state
            .primary()
            .sheets
            .entry(sheet.to_string())
            .or_default()
            .cells
            .insert(CellRef::new(row, col), value);
    }

    pub fn cell(&self, sheet: &str, row: u32, col: u32) -> CellValue {
        let mut state = self.state.lock();
        state
            .primary()
            .sheets
            .get(sheet)
            .and_then(|s| s.cells.get(&CellRef::new(row, col)).cloned())
            .unwrap_or_default()
    }

    /// Select a range on the active sheet of the primary instance.
    pub fn select(&self, row: u32, col: u32, rows: u32, cols: u32) {
        let mut state = self.state.lock();
        let instance = state.primary();
        instance.selection = SimSelection {
            sheet: instance.active_sheet.clone(),
            row,
            col,
            rows: rows.max(1),
            cols: cols.max(1),
        };
    }

    pub fn activate_sheet(&self, name: &str) {
        self.state.lock().primary().activate(name);
    }

    /// Switch sheets, but let the next `reads` selection reads still report the old sheet.
    pub fn activate_sheet_lagging(&self, name: &str, reads: u32) {
        let mut state = self.state.lock();
        let instance = state.primary();
        instance.activate(name);
        instance.stale_reads = reads;
    }

    /// Switch sheets once the worker drains host messages.
    pub fn queue_sheet_switch(&self, name: &str) {
        self.state.lock().pending_switches.push_back(name.to_string());
    }

    /// The primary instance now shows another workbook with the same sheet names.
    pub fn activate_document(&self, document: &str) {
        self.state.lock().primary().document = Some(document.to_string());
    }

    pub fn active_sheet_name(&self) -> String {
        self.state.lock().primary().active_sheet.clone()
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.lock().primary().ready = ready;
    }

    pub fn set_editing(&self, editing: bool) {
        self.state.lock().primary().editing = editing;
    }

    pub fn set_modal(&self, modal: bool) {
        self.state.lock().primary().modal = modal;
    }

    /// Active-document reads fail until `duration` has passed (tokio clock).
    pub fn document_unavailable_for(&self, duration: Duration) {
        self.state.lock().primary().document_available_at = Some(Instant::now() + duration);
    }

    pub fn annotations(&self, sheet: &str, row: u32, col: u32) -> Vec<String> {
        let mut state = self.state.lock();
        state
            .primary()
            .sheets
            .get(sheet)
            .and_then(|s| s.annotations.get(&CellRef::new(row, col)).cloned())
            .unwrap_or_default()
    }

    /// Every annotation across every instance and sheet.
    pub fn annotation_count(&self) -> usize {
        self.state
            .lock()
            .instances
            .iter()
            .flat_map(|i| i.sheets.values())
            .flat_map(|s| s.annotations.values())
            .map(Vec::len)
            .sum()
    }

    /// `(document, sheet, cell, text)` for every annotation, sorted.
    pub fn dump_annotations(&self) -> Vec<(String, String, CellRef, String)> {
        let state = self.state.lock();
        let mut out = Vec::new();
        for instance in &state.instances {
            let document = instance.document.clone().unwrap_or_default();
            for (sheet_name, sheet) in &instance.sheets {
                for (cell, notes) in &sheet.annotations {
                    for note in notes {
                        out.push((document.clone(), sheet_name.clone(), *cell, note.clone()));
                    }
                }
            }
        }
        out.sort_by(|a, b| (&a.0, &a.1, a.2).cmp(&(&b.0, &b.1, b.2)));
        out
    }

    /// Build a host from a fixture description.
    pub fn from_fixture(fixture: &HostFixture) -> Self {
        let host = Self::new();
        {
            let mut state = host.state.lock();
            for inst in &fixture.instances {
                let names: Vec<&str> = inst.sheets.keys().map(String::as_str).collect();
                let mut sim = SimInstance::new(inst.window, &inst.document, &names);
                if let Some(version) = &inst.version {
                    sim.version = version.clone();
                }
                for (name, sheet) in &inst.sheets {
                    let target = sim.sheets.entry(name.clone()).or_default();
                    for cell in &sheet.cells {
                        target
                            .cells
                            .insert(CellRef::new(cell.row, cell.col), cell.value.clone());
                    }
                }
                if let Some(active) = &inst.active_sheet {
                    sim.activate(active);
                    sim.stale_sheet = active.clone();
                }
                if let Some(sel) = &inst.selection {
                    sim.selection = SimSelection {
                        sheet: sim.active_sheet.clone(),
                        row: sel.row,
                        col: sel.col,
                        rows: sel.rows.max(1),
                        cols: sel.cols.max(1),
                    };
                }
                state.instances.push(sim);
            }
            state.foreground = fixture
                .foreground
                .or_else(|| fixture.instances.first().map(|i| i.window))
                .map(WindowHandle);
        }
        host
    }

    fn with_instance<R>(
        &self,
        window: WindowHandle,
        op: HostOp,
        f: impl FnOnce(&mut SimInstance) -> HostResult<R>,
    ) -> HostResult<R> {
        let mut state = self.state.lock();
        state.take_fault(op)?;
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.window == window)
            .ok_or(HostFault::Disconnected)?;
        if instance.modal {
            return Err(HostFault::ModalDialog);
        }
        f(instance)
    }
}

impl HostApplication for SimulatedHost {
    fn attach_thread(&self) -> HostResult<()> {
        let mut state = self.state.lock();
        if let Some(fault) = state.attach_fault.clone() {
            return Err(fault);
        }
        state.attached = true;
        Ok(())
    }

    fn detach_thread(&self) {
        self.state.lock().attached = false;
    }

    fn drain_messages(&self) -> usize {
        let mut state = self.state.lock();
        state.drain_calls += 1;
        let switches: Vec<String> = state.pending_switches.drain(..).collect();
        let handled = switches.len();
        for name in switches {
            state.primary().activate(&name);
        }
        handled
    }

    fn running_instances(&self) -> HostResult<Vec<Box<dyn HostInstance>>> {
        let mut state = self.state.lock();
        state.take_fault(HostOp::Enumerate)?;
        Ok(state
            .instances
            .iter()
            .map(|i| {
                Box::new(SimInstanceHandle {
                    host: self.clone(),
                    window: i.window,
                }) as Box<dyn HostInstance>
            })
            .collect())
    }

    fn foreground_window(&self) -> HostResult<Option<WindowHandle>> {
        Ok(self.state.lock().foreground)
    }
}

/// Handle to one simulated instance. Holds no state of its own; every call
/// reads the shared host.
struct SimInstanceHandle {
    host: SimulatedHost,
    window: WindowHandle,
}

impl HostInstance for SimInstanceHandle {
    fn window(&self) -> HostResult<WindowHandle> {
        self.host.with_instance(self.window, HostOp::Window, |i| Ok(i.window))
    }

    fn version(&self) -> HostResult<String> {
        self.host
            .with_instance(self.window, HostOp::Version, |i| Ok(i.version.clone()))
    }

    fn is_ready(&self) -> HostResult<bool> {
        self.host.with_instance(self.window, HostOp::IsReady, |i| Ok(i.ready))
    }

    fn is_editing(&self) -> HostResult<bool> {
        // 編集中でもこの問い合わせだけは応答する
        let state = self.host.state.lock();
        state
            .instances
            .iter()
            .find(|i| i.window == self.window)
            .map(|i| i.editing)
            .ok_or(HostFault::Disconnected)
    }

    fn active_document(&self) -> HostResult<Option<String>> {
        self.host
            .with_instance(self.window, HostOp::ActiveDocument, |i| {
                if let Some(at) = i.document_available_at {
                    if Instant::now() < at {
                        return Err(HostFault::CallRejected("workbook not available yet".into()));
                    }
                }
                Ok(i.document.clone())
            })
    }

    fn active_sheet(&self) -> HostResult<Option<String>> {
        self.host.with_instance(self.window, HostOp::ActiveSheet, |i| {
            Ok(Some(i.active_sheet.clone()))
        })
    }

    fn selection(&self) -> HostResult<Option<SelectionRef>> {
        self.host.with_instance(self.window, HostOp::Selection, |i| {
            let sheet = if i.stale_reads > 0 {
                i.stale_reads -= 1;
                i.stale_sheet.clone()
            } else {
                i.selection.sheet.clone()
            };
            Ok(Some(SelectionRef {
                document: i.document.clone().unwrap_or_default(),
                sheet,
                row: i.selection.row,
                col: i.selection.col,
                rows: i.selection.rows,
                cols: i.selection.cols,
            }))
        })
    }

    fn cell_value(&self, sheet: &str, cell: CellRef) -> HostResult<CellValue> {
        self.host.with_instance(self.window, HostOp::CellValue, |i| {
            Ok(i.sheet(sheet)?.cells.get(&cell).cloned().unwrap_or_default())
        })
    }

    fn has_annotation(&self, sheet: &str, cell: CellRef) -> HostResult<bool> {
        self.host.with_instance(self.window, HostOp::HasAnnotation, |i| {
            Ok(i.sheet(sheet)?
                .annotations
                .get(&cell)
                .is_some_and(|notes| !notes.is_empty()))
        })
    }

    fn delete_annotation(&self, sheet: &str, cell: CellRef) -> HostResult<()> {
        self.host.with_instance(self.window, HostOp::DeleteAnnotation, |i| {
            if i.editing {
                return Err(HostFault::EditMode);
            }
            i.sheet_mut(sheet)?.annotations.remove(&cell);
            Ok(())
        })
    }

    fn add_annotation(&self, sheet: &str, cell: CellRef, text: &str) -> HostResult<()> {
        self.host.with_instance(self.window, HostOp::AddAnnotation, |i| {
            if i.editing {
                return Err(HostFault::EditMode);
            }
            i.sheet_mut(sheet)?
                .annotations
                .entry(cell)
                .or_default()
                .push(text.to_string());
            Ok(())
        })
    }
}

// ========================================
// Fixture（CLI から JSON で読み込む）
// ========================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostFixture {
    #[serde(default)]
    pub foreground: Option<u64>,
    #[serde(default)]
    pub instances: Vec<InstanceFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceFixture {
    pub window: u64,
    pub document: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub active_sheet: Option<String>,
    #[serde(default)]
    pub selection: Option<SelectionFixture>,
    #[serde(default)]
    pub sheets: BTreeMap<String, SheetFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionFixture {
    pub row: u32,
    pub col: u32,
    #[serde(default = "one")]
    pub rows: u32,
    #[serde(default = "one")]
    pub cols: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetFixture {
    #[serde(default)]
    pub cells: Vec<CellFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellFixture {
    pub row: u32,
    pub col: u32,
    pub value: CellValue,
}
