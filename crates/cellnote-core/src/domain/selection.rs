//! Selection model: cell coordinates, selection references, header context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const ORIGIN: CellRef = CellRef { row: 1, col: 1 };

    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1-style address, e.g. `B2`, `AA10`.
    pub fn address(&self) -> String {
        let mut letters = Vec::new();
        let mut n = self.col;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        let column: String = letters.iter().rev().collect();
        format!("{column}{}", self.row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

/// The user's current selection as read from the live host.
///
/// `rows`/`cols` describe the extent anchored at (`row`, `col`), the top-left cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRef {
    pub document: String,
    pub sheet: String,
    pub row: u32,
    pub col: u32,
    pub rows: u32,
    pub cols: u32,
}

impl SelectionRef {
    pub fn single(document: impl Into<String>, sheet: impl Into<String>, cell: CellRef) -> Self {
        Self {
            document: document.into(),
            sheet: sheet.into(),
            row: cell.row,
            col: cell.col,
            rows: 1,
            cols: 1,
        }
    }

    pub fn anchor(&self) -> CellRef {
        CellRef::new(self.row, self.col)
    }

    pub fn is_multi_cell(&self) -> bool {
        self.rows > 1 || self.cols > 1
    }

    /// Same reference narrowed to its top-left cell.
    pub fn top_left(&self) -> SelectionRef {
        SelectionRef {
            rows: 1,
            cols: 1,
            ..self.clone()
        }
    }

    /// `B2` or `B2:D5`.
    pub fn address(&self) -> String {
        let start = self.anchor();
        if self.is_multi_cell() {
            let end = CellRef::new(
                self.row + self.rows.saturating_sub(1),
                self.col + self.cols.saturating_sub(1),
            );
            format!("{start}:{end}")
        } else {
            start.address()
        }
    }
}

impl fmt::Display for SelectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}!{}", self.document, self.sheet, self.address())
    }
}

/// Value held by a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Trimmed display text, `None` when blank.
    pub fn display(&self) -> Option<String> {
        let s = match self {
            CellValue::Empty => return None,
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(t) => t.trim().to_string(),
        };
        if s.is_empty() { None } else { Some(s) }
    }

    /// Text that does not read as a number (`$1,234`, `50%` are numbers).
    pub fn is_label(&self) -> bool {
        match self {
            CellValue::Text(t) => {
                let trimmed = t.trim();
                if trimmed.is_empty() {
                    return false;
                }
                let stripped: String = trimmed
                    .chars()
                    .filter(|c| !matches!(c, ',' | '$' | '%'))
                    .collect();
                stripped.parse::<f64>().is_err()
            }
            _ => false,
        }
    }
}

/// Header context inferred around a target cell. Empty fields mean "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub ticker: String,
    pub period: String,
    pub line_item: String,
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.ticker, self.period, self.line_item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 1, "A1")]
    #[case(2, 2, "B2")]
    #[case(10, 26, "Z10")]
    #[case(3, 27, "AA3")]
    #[case(7, 703, "AAA7")]
    fn a1_addresses(#[case] row: u32, #[case] col: u32, #[case] expected: &str) {
        assert_eq!(CellRef::new(row, col).address(), expected);
    }

    #[test]
    fn top_left_keeps_anchor_and_drops_extent() {
        let sel = SelectionRef {
            document: "Model.xlsx".into(),
            sheet: "IS".into(),
            row: 4,
            col: 3,
            rows: 5,
            cols: 2,
        };
        assert_eq!(sel.address(), "C4:D8");

        let cell = sel.top_left();
        assert!(!cell.is_multi_cell());
        assert_eq!(cell.anchor(), CellRef::new(4, 3));
        assert_eq!(cell.sheet, "IS");
    }

    #[rstest]
    #[case(CellValue::text("Revenue"), true)]
    #[case(CellValue::text("Q1 2024"), true)]
    #[case(CellValue::text("$1,234"), false)]
    #[case(CellValue::text("50%"), false)]
    #[case(CellValue::text("   "), false)]
    #[case(CellValue::Number(12.0), false)]
    #[case(CellValue::Empty, false)]
    fn label_detection(#[case] value: CellValue, #[case] label: bool) {
        assert_eq!(value.is_label(), label);
    }

    #[test]
    fn display_trims_and_hides_blank() {
        assert_eq!(CellValue::text("  AAPL ").display().as_deref(), Some("AAPL"));
        assert_eq!(CellValue::text("  ").display(), None);
        assert_eq!(CellValue::Empty.display(), None);
        assert_eq!(CellValue::Number(2.5).display().as_deref(), Some("2.5"));
    }
}
