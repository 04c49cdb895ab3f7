//! Selection context extractor: header cells around the target, read-only.
//!
//! Layout assumed by the scan:
//! - A1 holds the ticker
//! - the period header sits somewhere above the target in the same column
//! - the line-item label sits somewhere left of the target in the same row

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CellRef, CellValue, Context, SelectionRef, SessionError};
use crate::ports::HostInstance;

/// Which cells count as a header during the scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderRule {
    /// Any non-blank value.
    #[default]
    NonEmpty,

    /// Text that does not read as a number; skips numeric data between header and target.
    Label,
}

impl HeaderRule {
    fn accepts(self, value: &CellValue) -> bool {
        match self {
            HeaderRule::NonEmpty => value.display().is_some(),
            HeaderRule::Label => value.is_label(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextExtractor {
    rule: HeaderRule,
}

impl ContextExtractor {
    pub fn new(rule: HeaderRule) -> Self {
        Self { rule }
    }

    /// `target` must already be collapsed to one cell; only its anchor is used.
    pub fn extract(
        &self,
        instance: &dyn HostInstance,
        target: &SelectionRef,
    ) -> Result<Context, SessionError> {
        let sheet = target.sheet.as_str();
        let anchor = target.anchor();

        let ticker = instance
            .cell_value(sheet, CellRef::ORIGIN)?
            .display()
            .unwrap_or_default();

        let mut period = String::new();
        for row in (1..anchor.row).rev() {
            let value = instance.cell_value(sheet, CellRef::new(row, anchor.col))?;
            if self.rule.accepts(&value) {
                period = value.display().unwrap_or_default();
                break;
            }
        }

        let mut line_item = String::new();
        for col in (1..anchor.col).rev() {
            let value = instance.cell_value(sheet, CellRef::new(anchor.row, col))?;
            if self.rule.accepts(&value) {
                line_item = value.display().unwrap_or_default();
                break;
            }
        }

        let context = Context {
            ticker,
            period,
            line_item,
        };
        debug!(cell = %anchor, %context, "context extracted");
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::impls::{HostOp, SimulatedHost};
    use crate::ports::{HostApplication, HostFault};
    use rstest::rstest;

    fn sheet_with(cells: &[(u32, u32, CellValue)]) -> SimulatedHost {
        let host = SimulatedHost::single("Model.xlsx", &["IS"]);
        for (row, col, value) in cells {
            host.set_cell("IS", *row, *col, value.clone());
        }
        host
    }

    fn extract(host: &SimulatedHost, rule: HeaderRule, row: u32, col: u32) -> Result<Context, SessionError> {
        let instance = host.running_instances().unwrap().remove(0);
        let target = SelectionRef::single("Model.xlsx", "IS", CellRef::new(row, col));
        ContextExtractor::new(rule).extract(instance.as_ref(), &target)
    }

    #[test]
    fn headers_around_target() {
        let host = sheet_with(&[
            (1, 1, CellValue::text("AAPL")),
            (1, 2, CellValue::text("Q1 2024")),
            (2, 1, CellValue::text("Revenue")),
        ]);

        let ctx = extract(&host, HeaderRule::NonEmpty, 2, 2).unwrap();
        assert_eq!(
            ctx,
            Context {
                ticker: "AAPL".into(),
                period: "Q1 2024".into(),
                line_item: "Revenue".into(),
            }
        );
    }

    #[test]
    fn nearest_header_wins() {
        let host = sheet_with(&[
            (1, 1, CellValue::text("MSFT")),
            (1, 4, CellValue::text("FY 2023")),
            (3, 4, CellValue::text("Q3 2023")),
            (6, 1, CellValue::text("Income")),
            (6, 2, CellValue::text("Operating income")),
        ]);

        let ctx = extract(&host, HeaderRule::NonEmpty, 6, 4).unwrap();
        assert_eq!(ctx.period, "Q3 2023");
        assert_eq!(ctx.line_item, "Operating income");
    }

    #[rstest]
    #[case(1, 5)]
    #[case(5, 1)]
    #[case(1, 1)]
    fn edges_yield_empty_not_error(#[case] row: u32, #[case] col: u32) {
        let host = sheet_with(&[(1, 1, CellValue::text("AAPL"))]);
        let ctx = extract(&host, HeaderRule::NonEmpty, row, col).unwrap();
        if row == 1 {
            assert_eq!(ctx.period, "");
        }
        if col == 1 {
            assert_eq!(ctx.line_item, "");
        }
    }

    #[test]
    fn empty_sheet_gives_empty_context() {
        let host = sheet_with(&[]);
        assert_eq!(extract(&host, HeaderRule::NonEmpty, 7, 7).unwrap(), Context::default());
    }

    #[test]
    fn label_rule_skips_numbers() {
        let host = sheet_with(&[
            (1, 3, CellValue::text("Q2 2024")),
            (2, 3, CellValue::Number(1_200.0)),
            (3, 3, CellValue::text("$1,150")),
            (4, 1, CellValue::text("Gross margin")),
            (4, 2, CellValue::text("45%")),
        ]);

        let ctx = extract(&host, HeaderRule::Label, 4, 3).unwrap();
        assert_eq!(ctx.period, "Q2 2024");
        assert_eq!(ctx.line_item, "Gross margin");

        let ctx = extract(&host, HeaderRule::NonEmpty, 4, 3).unwrap();
        assert_eq!(ctx.period, "$1,150");
        assert_eq!(ctx.line_item, "45%");
    }

    #[test]
    fn never_mutates_the_sheet() {
        let host = sheet_with(&[(1, 1, CellValue::text("AAPL"))]);
        extract(&host, HeaderRule::NonEmpty, 3, 3).unwrap();
        assert_eq!(host.annotation_count(), 0);
        assert_eq!(host.cell("IS", 1, 1), CellValue::text("AAPL"));
    }

    #[test]
    fn unreadable_cell_is_a_classified_error() {
        let host = sheet_with(&[]);
        host.fail_next(HostOp::CellValue, 1, HostFault::CallRejected("busy".into()));
        let err = extract(&host, HeaderRule::NonEmpty, 2, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientComFailure);
    }
}
