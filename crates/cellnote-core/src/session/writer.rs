//! Annotation writer: exactly one annotation on exactly one cell.

use tracing::{info, warn};

use crate::domain::{Degradation, ErrorKind, SelectionRef, SessionError, WriteReceipt};
use crate::session::SessionHandle;

#[derive(Debug, Clone, Copy)]
pub struct AnnotationWriter {
    max_chars: usize,
}

impl AnnotationWriter {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Collapse, re-validate the live workbook and sheet, delete any existing annotation, add the new one.
    ///
    /// Host faults are classified and returned; nothing is retried here.
    pub fn write(
        &self,
        handle: &SessionHandle,
        selection: &SelectionRef,
        text: &str,
    ) -> Result<(WriteReceipt, Option<Degradation>), SessionError> {
        let instance = handle.instance();

        let collapsed = selection.is_multi_cell();
        let target = selection.top_left();
        let cell = target.anchor();
        let degradation = collapsed.then(|| {
            warn!(
                kind = %ErrorKind::InvalidSelectionShape,
                range = %selection.address(),
                cell = %cell,
                "multi-cell selection; annotating its top-left cell"
            );
            Degradation::SelectionCollapsed {
                range: selection.address(),
                cell: cell.address(),
            }
        });

        let live_document = instance
            .active_document()?
            .ok_or_else(|| SessionError::transient("no active document"))?;
        if live_document != target.document {
            return Err(SessionError::stale_document(&target.document, &live_document));
        }
        let live_sheet = instance
            .active_sheet()?
            .ok_or_else(|| SessionError::transient("no active sheet"))?;
        if live_sheet != target.sheet {
            return Err(SessionError::stale(&target.sheet, &live_sheet));
        }

        let replaced = instance.has_annotation(&target.sheet, cell)?;
        if replaced {
            instance.delete_annotation(&target.sheet, cell)?;
        }

        let body = bounded(text, self.max_chars);
        instance.add_annotation(&target.sheet, cell, body)?;

        let receipt = WriteReceipt {
            document: target.document.clone(),
            sheet: target.sheet.clone(),
            cell,
            collapsed,
            replaced,
            chars: body.chars().count(),
        };
        info!(session = %handle.id(), sheet = %receipt.sheet, %cell, replaced, chars = receipt.chars, "annotation written");
        Ok((receipt, degradation))
    }
}

impl Default for AnnotationWriter {
    fn default() -> Self {
        Self::new(32_767)
    }
}

/// Longest prefix of `text` with at most `max_chars` chars.
fn bounded(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellRef;
    use crate::impls::{HostOp, SimulatedHost};
    use crate::ports::HostFault;
    use crate::session::SessionAdapter;
    use rstest::rstest;

    fn selection(row: u32, col: u32, rows: u32, cols: u32) -> SelectionRef {
        SelectionRef {
            document: "Model.xlsx".into(),
            sheet: "Sheet1".into(),
            row,
            col,
            rows,
            cols,
        }
    }

    #[rstest]
    #[case(selection(3, 2, 4, 1))]
    #[case(selection(3, 2, 1, 6))]
    #[case(selection(3, 2, 5, 5))]
    fn multi_cell_targets_top_left(#[case] sel: SelectionRef) {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1"]);
        let (handle, _) = SessionAdapter::new(&host).acquire().unwrap();

        let (receipt, degradation) = AnnotationWriter::default().write(&handle, &sel, "note").unwrap();
        assert_eq!(receipt.cell, CellRef::new(3, 2));
        assert!(receipt.collapsed);
        assert!(matches!(degradation, Some(Degradation::SelectionCollapsed { .. })));
        assert_eq!(host.annotations("Sheet1", 3, 2), vec!["note".to_string()]);
        assert_eq!(host.annotation_count(), 1);
    }

    #[test]
    fn overwrite_leaves_exactly_one() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1"]);
        let (handle, _) = SessionAdapter::new(&host).acquire().unwrap();
        let writer = AnnotationWriter::default();
        let sel = selection(2, 2, 1, 1);

        let (first, _) = writer.write(&handle, &sel, "old").unwrap();
        let (second, degradation) = writer.write(&handle, &sel, "new").unwrap();

        assert!(!first.replaced);
        assert!(second.replaced);
        assert!(degradation.is_none());
        assert_eq!(host.annotations("Sheet1", 2, 2), vec!["new".to_string()]);
    }

    #[test]
    fn refuses_to_write_on_a_sheet_that_is_no_longer_active() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1", "Sheet2"]);
        let (handle, _) = SessionAdapter::new(&host).acquire().unwrap();
        host.activate_sheet("Sheet2");

        let err = AnnotationWriter::default()
            .write(&handle, &selection(2, 2, 1, 1), "note")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StaleSelection);
        assert_eq!(host.annotation_count(), 0);
    }

    #[test]
    fn refuses_to_write_into_a_different_workbook() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1"]);
        let (handle, _) = SessionAdapter::new(&host).acquire().unwrap();
        host.activate_document("Other.xlsx");

        let err = AnnotationWriter::default()
            .write(&handle, &selection(2, 2, 1, 1), "note")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StaleSelection);
        assert!(err.is_retryable());
        assert!(err.message().contains("Other.xlsx"));
        assert_eq!(host.annotation_count(), 0);
    }

    #[test]
    fn modal_dialog_surfaces_as_transient() {
        let host = SimulatedHost::single("Model.xlsx", &["Sheet1"]);
        let (handle, _) = SessionAdapter::new(&host).acquire().unwrap();
        host.fail_next(HostOp::AddAnnotation, 1, HostFault::ModalDialog);

        let err = AnnotationWriter::default()
            .write(&handle, &selection(2, 2, 1, 1), "note")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientComFailure);
    }

    #[test]
    fn text_is_bounded_on_char_boundary() {
        assert_eq!(bounded("héllo", 2), "hé");
        assert_eq!(bounded("abc", 10), "abc");

        let host = SimulatedHost::single("Model.xlsx", &["Sheet1"]);
        let (handle, _) = SessionAdapter::new(&host).acquire().unwrap();
        let (receipt, _) = AnnotationWriter::new(4)
            .write(&handle, &selection(1, 2, 1, 1), "ümlauts")
            .unwrap();
        assert_eq!(receipt.chars, 4);
        assert_eq!(host.annotations("Sheet1", 1, 2), vec!["ümla".to_string()]);
    }
}
