//! Session adapter: fresh, never-cached access to the live host instance.
//!
//! Every call enumerates running instances again and reads document/sheet names
//! from the live object. Nothing obtained here outlives one attempt: a
//! `SessionHandle` is created per attempt and dropped with it.

use tracing::{debug, info, warn};

use crate::domain::{Degradation, ErrorKind, SelectionRef, SessionError, SessionId};
use crate::ports::{HostApplication, HostInstance, WindowHandle};

/// Instance picked by `locate`, not yet opened.
pub struct Located {
    instance: Box<dyn HostInstance>,
    window: WindowHandle,
    degradation: Option<Degradation>,
}

impl Located {
    pub fn instance(&self) -> &dyn HostInstance {
        self.instance.as_ref()
    }

    pub fn window(&self) -> WindowHandle {
        self.window
    }

    pub fn degradation(&self) -> Option<&Degradation> {
        self.degradation.as_ref()
    }
}

/// Short-lived handle to one host instance plus the names read when it was opened.
pub struct SessionHandle {
    id: SessionId,
    instance: Box<dyn HostInstance>,
    window: WindowHandle,
    document: String,
    sheet: String,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn instance(&self) -> &dyn HostInstance {
        self.instance.as_ref()
    }

    pub fn window(&self) -> WindowHandle {
        self.window
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// Active sheet at open time. Re-read the live value before mutating.
    pub fn sheet(&self) -> &str {
        &self.sheet
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("window", &self.window)
            .field("document", &self.document)
            .field("sheet", &self.sheet)
            .finish()
    }
}

pub struct SessionAdapter<'h> {
    host: &'h dyn HostApplication,
    target: Option<WindowHandle>,
    correction_passes: u32,
}

impl<'h> SessionAdapter<'h> {
    pub fn new(host: &'h dyn HostApplication) -> Self {
        Self {
            host,
            target: None,
            correction_passes: 3,
        }
    }

    /// Prefer this window over foreground focus.
    pub fn with_target(mut self, target: Option<WindowHandle>) -> Self {
        self.target = target;
        self
    }

    pub fn with_correction_passes(mut self, passes: u32) -> Self {
        self.correction_passes = passes;
        self
    }

    /// Pick the instance to talk to.
    pub fn locate(&self) -> Result<Located, SessionError> {
        let mut instances = self.host.running_instances()?;
        if instances.is_empty() {
            return Err(SessionError::connection_unavailable(
                "no running spreadsheet instance; open the application first",
            ));
        }

        if instances.len() == 1 {
            let instance = instances.remove(0);
            let window = instance.window()?;
            return Ok(Located {
                instance,
                window,
                degradation: None,
            });
        }

        let wanted = match self.target {
            Some(target) => Some(target),
            None => self.host.foreground_window().unwrap_or_else(|fault| {
                debug!(%fault, "foreground window unreadable");
                None
            }),
        };

        let candidates = instances.len();
        let mut readable = Vec::with_capacity(candidates);
        for instance in instances {
            match instance.window() {
                Ok(window) if Some(window) == wanted => {
                    debug!(%window, candidates, "instance matched target window");
                    return Ok(Located {
                        instance,
                        window,
                        degradation: None,
                    });
                }
                Ok(window) => readable.push((instance, window)),
                Err(fault) => debug!(%fault, "skipping instance with unreadable window"),
            }
        }

        if readable.is_empty() {
            return Err(SessionError::transient("no instance window could be read"));
        }

        let (instance, window) = readable.remove(0);
        warn!(
            kind = %ErrorKind::InstanceAmbiguous,
            candidates,
            wanted = ?wanted,
            chosen = %window,
            "no instance owns the target window; using best-effort match"
        );
        Ok(Located {
            instance,
            window,
            degradation: Some(Degradation::InstanceAmbiguous {
                candidates,
                chosen_window: window.0,
            }),
        })
    }

    /// Read document and sheet names fresh and refuse to work during a cell edit.
    pub fn open(&self, located: Located) -> Result<SessionHandle, SessionError> {
        let Located {
            instance, window, ..
        } = located;

        let document = instance
            .active_document()?
            .ok_or_else(|| SessionError::transient("no active document"))?;
        let sheet = instance
            .active_sheet()?
            .ok_or_else(|| SessionError::transient("no active sheet"))?;
        if instance.is_editing()? {
            return Err(SessionError::edit_mode());
        }

        let handle = SessionHandle {
            id: SessionId::generate(),
            instance,
            window,
            document,
            sheet,
        };
        debug!(session = %handle.id, %window, document = %handle.document, sheet = %handle.sheet, "session opened");
        Ok(handle)
    }

    /// `locate` + `open`, for callers that do not probe readiness in between.
    pub fn acquire(&self) -> Result<(SessionHandle, Option<Degradation>), SessionError> {
        let mut located = self.locate()?;
        let degradation = located.degradation.take();
        Ok((self.open(located)?, degradation))
    }

    /// The live selection, checked against the live active sheet.
    pub fn current_selection(
        &self,
        handle: &SessionHandle,
    ) -> Result<(SelectionRef, Option<Degradation>), SessionError> {
        let selection = read_selection(handle.instance())?;
        self.reconcile(handle, selection)
    }

    /// Validate `held` against the live active sheet; on mismatch discard it and
    /// re-resolve, up to `correction_passes` times.
    pub fn reconcile(
        &self,
        handle: &SessionHandle,
        held: SelectionRef,
    ) -> Result<(SelectionRef, Option<Degradation>), SessionError> {
        let from_sheet = held.sheet.clone();
        let mut current = held;
        let mut pass = 0;

        loop {
            let live_sheet = handle
                .instance()
                .active_sheet()?
                .ok_or_else(|| SessionError::transient("no active sheet"))?;

            if current.sheet == live_sheet {
                let degradation = (pass > 0).then(|| {
                    info!(from = %from_sheet, to = %live_sheet, passes = pass, "stale selection corrected");
                    Degradation::StaleSelectionCorrected {
                        from_sheet,
                        to_sheet: live_sheet,
                    }
                });
                return Ok((current, degradation));
            }

            if pass >= self.correction_passes {
                return Err(SessionError::stale(&current.sheet, &live_sheet));
            }
            pass += 1;
            warn!(
                selection_sheet = %current.sheet,
                active_sheet = %live_sheet,
                pass,
                "stale selection detected; re-resolving"
            );
            current = read_selection(handle.instance())?;
        }
    }
}

fn read_selection(instance: &dyn HostInstance) -> Result<SelectionRef, SessionError> {
    instance
        .selection()?
        .ok_or_else(|| SessionError::transient("nothing is selected"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellRef;
    use crate::impls::{HostOp, SimulatedHost};
    use crate::ports::HostFault;

    #[test]
    fn no_instance_is_connection_unavailable() {
        let host = SimulatedHost::new();
        let err = SessionAdapter::new(&host).locate().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ConnectionUnavailable);
        assert!(!err.is_retryable());
    }

    #[test]
    fn picks_instance_owning_foreground_window() {
        let host = SimulatedHost::single("A.xlsx", &["Sheet1"]);
        host.add_instance(0x2002, "B.xlsx", &["Data"]);
        host.set_foreground(Some(0x2002));

        let (handle, degradation) = SessionAdapter::new(&host).acquire().unwrap();
        assert_eq!(handle.window(), WindowHandle(0x2002));
        assert_eq!(handle.document(), "B.xlsx");
        assert!(degradation.is_none());
    }

    #[test]
    fn configured_target_beats_foreground() {
        let host = SimulatedHost::single("A.xlsx", &["Sheet1"]);
        host.add_instance(0x2002, "B.xlsx", &["Data"]);
        host.set_foreground(Some(0x2002));

        let (handle, _) = SessionAdapter::new(&host)
            .with_target(Some(WindowHandle(SimulatedHost::PRIMARY_WINDOW)))
            .acquire()
            .unwrap();
        assert_eq!(handle.document(), "A.xlsx");
    }

    #[test]
    fn ambiguous_match_degrades_and_continues() {
        let host = SimulatedHost::single("A.xlsx", &["Sheet1"]);
        host.add_instance(0x2002, "B.xlsx", &["Data"]);
        host.set_foreground(Some(0x9999));

        let (handle, degradation) = SessionAdapter::new(&host).acquire().unwrap();
        assert_eq!(handle.document(), "A.xlsx");
        assert_eq!(
            degradation,
            Some(Degradation::InstanceAmbiguous {
                candidates: 2,
                chosen_window: SimulatedHost::PRIMARY_WINDOW
            })
        );
    }

    #[test]
    fn names_are_read_fresh_on_every_call() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1", "Sheet2"]);
        let adapter = SessionAdapter::new(&host);

        let (first, _) = adapter.acquire().unwrap();
        let (sel1, _) = adapter.current_selection(&first).unwrap();
        assert_eq!(sel1.sheet, "Sheet1");

        host.activate_sheet("Sheet2");

        let (second, _) = adapter.acquire().unwrap();
        let (sel2, _) = adapter.current_selection(&second).unwrap();
        assert_eq!(second.sheet(), "Sheet2");
        assert_eq!(sel2.sheet, "Sheet2");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn held_reference_from_old_sheet_is_re_resolved() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1", "Sheet2"]);
        let adapter = SessionAdapter::new(&host);

        let (handle, _) = adapter.acquire().unwrap();
        let (held, _) = adapter.current_selection(&handle).unwrap();

        host.activate_sheet("Sheet2");
        host.select(4, 3, 1, 1);

        let (fixed, degradation) = adapter.reconcile(&handle, held.clone()).unwrap();
        assert_eq!(fixed.sheet, "Sheet2");
        assert_eq!(fixed.anchor(), CellRef::new(4, 3));
        assert_eq!(
            degradation,
            Some(Degradation::StaleSelectionCorrected {
                from_sheet: "Sheet1".into(),
                to_sheet: "Sheet2".into()
            })
        );

        // correcting again changes nothing
        for _ in 0..3 {
            let (again, degradation) = adapter.reconcile(&handle, fixed.clone()).unwrap();
            assert_eq!(again, fixed);
            assert!(degradation.is_none());
        }
        // and the stale one always lands on the live sheet
        for _ in 0..3 {
            let (again, _) = adapter.reconcile(&handle, held.clone()).unwrap();
            assert_eq!(again.sheet, "Sheet2");
        }
    }

    #[test]
    fn lagging_selection_reads_are_corrected() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1", "Sheet2"]);
        host.activate_sheet_lagging("Sheet2", 2);

        let adapter = SessionAdapter::new(&host);
        let (handle, _) = adapter.acquire().unwrap();
        let (sel, degradation) = adapter.current_selection(&handle).unwrap();
        assert_eq!(sel.sheet, "Sheet2");
        assert!(matches!(
            degradation,
            Some(Degradation::StaleSelectionCorrected { .. })
        ));
    }

    #[test]
    fn correction_escalates_when_it_cannot_converge() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1", "Sheet2"]);
        host.activate_sheet_lagging("Sheet2", 10);

        let adapter = SessionAdapter::new(&host).with_correction_passes(2);
        let (handle, _) = adapter.acquire().unwrap();
        let err = adapter.current_selection(&handle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StaleSelection);
        assert!(err.is_retryable());
    }

    #[test]
    fn edit_mode_is_declined() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1"]);
        host.set_editing(true);

        let err = SessionAdapter::new(&host).acquire().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EditModeActive);
    }

    #[test]
    fn live_property_fault_is_transient() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1"]);
        host.fail_next(HostOp::ActiveSheet, 1, HostFault::CallRejected("busy".into()));

        let err = SessionAdapter::new(&host).acquire().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientComFailure);
    }
}
