//! Maps a transformed frame onto a concrete sheet plan.
//!
//! The plan is a flat list of cell writes; the workbook writer turns it
//! into an actual worksheet without knowing anything about templates.

use tabula_core::error::{Result, TabulaError};

use crate::frame::{Cell, Frame};
use crate::template::{Layout, LayoutKind};

/// An aggregate expression over one frame column, written as
/// `sum(col)`, `mean(col)`, `max(col)`, `min(col)`, or `count(col)`.
/// A bare name reads the first row's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellExpr {
    Column(String),
    Sum(String),
    Mean(String),
    Max(String),
    Min(String),
    Count(String),
}

impl CellExpr {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Some((func, rest)) = text.split_once('(') {
            let col = rest
                .strip_suffix(')')
                .ok_or_else(|| {
                    TabulaError::InvalidRequest(format!("malformed cell expression: {text}"))
                })?
                .trim()
                .to_string();
            return match func.trim() {
                "sum" => Ok(Self::Sum(col)),
                "mean" => Ok(Self::Mean(col)),
                "max" => Ok(Self::Max(col)),
                "min" => Ok(Self::Min(col)),
                "count" => Ok(Self::Count(col)),
                other => Err(TabulaError::InvalidRequest(format!(
                    "unknown aggregate function: {other}"
                ))),
            };
        }
        Ok(Self::Column(text.to_string()))
    }

    pub fn eval(&self, frame: &Frame) -> Result<Cell> {
        match self {
            Self::Column(col) => {
                let idx = frame.col_index(col)?;
                Ok(frame
                    .rows
                    .first()
                    .map(|r| r[idx].clone())
                    .unwrap_or(Cell::Null))
            }
            Self::Sum(col) => {
                let values = numeric(frame, col)?;
                Ok(Cell::Float(values.iter().sum()))
            }
            Self::Mean(col) => {
                let values = numeric(frame, col)?;
                if values.is_empty() {
                    return Ok(Cell::Null);
                }
                Ok(Cell::Float(values.iter().sum::<f64>() / values.len() as f64))
            }
            Self::Max(col) => {
                let values = numeric(frame, col)?;
                Ok(values
                    .into_iter()
                    .fold(None::<f64>, |acc, v| {
                        Some(acc.map_or(v, |a| a.max(v)))
                    })
                    .map(Cell::Float)
                    .unwrap_or(Cell::Null))
            }
            Self::Min(col) => {
                let values = numeric(frame, col)?;
                Ok(values
                    .into_iter()
                    .fold(None::<f64>, |acc, v| {
                        Some(acc.map_or(v, |a| a.min(v)))
                    })
                    .map(Cell::Float)
                    .unwrap_or(Cell::Null))
            }
            Self::Count(col) => {
                let idx = frame.col_index(col)?;
                let n = frame.rows.iter().filter(|r| !r[idx].is_null()).count();
                Ok(Cell::Int(n as i64))
            }
        }
    }
}

fn numeric(frame: &Frame, col: &str) -> Result<Vec<f64>> {
    Ok(frame
        .numeric_column(col)?
        .into_iter()
        .flatten()
        .collect())
}

/// Visual class of a planned cell; the writer maps each to a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Title,
    Label,
    Header,
    Data,
    Total,
}

#[derive(Debug, Clone)]
pub struct CellWrite {
    pub row: u32,
    pub col: u16,
    pub value: Cell,
    pub style: CellStyle,
}

/// Everything the workbook writer needs for one sheet.
#[derive(Debug)]
pub struct SheetPlan {
    pub sheet: String,
    pub writes: Vec<CellWrite>,
}

/// Lay the frame out per the template's layout spec. The date range, when
/// given, is appended to the title.
pub fn plan_sheet(layout: &Layout, frame: &Frame, date_range: Option<&str>) -> Result<SheetPlan> {
    let mut writes = Vec::new();

    let title = match date_range {
        Some(range) => format!("{} ({range})", layout.title),
        None => layout.title.to_string(),
    };
    writes.push(CellWrite {
        row: layout.title_row,
        col: layout.title_col,
        value: Cell::Str(title),
        style: CellStyle::Title,
    });
    for s in layout.statics {
        writes.push(CellWrite {
            row: s.row,
            col: s.col,
            value: Cell::Str(s.text.to_string()),
            style: CellStyle::Label,
        });
    }

    match layout.kind {
        LayoutKind::Rows => plan_rows(layout, frame, &mut writes),
        LayoutKind::Matrix => plan_matrix(layout, frame, &mut writes),
    }

    if layout.with_totals {
        plan_totals(layout, frame, &mut writes)?;
    }

    Ok(SheetPlan {
        sheet: layout.sheet.to_string(),
        writes,
    })
}

fn plan_rows(layout: &Layout, frame: &Frame, writes: &mut Vec<CellWrite>) {
    for (c, name) in frame.columns.iter().enumerate() {
        writes.push(CellWrite {
            row: layout.header_row,
            col: layout.data_col + c as u16,
            value: Cell::Str(name.clone()),
            style: CellStyle::Header,
        });
    }
    for (r, row) in frame.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            writes.push(CellWrite {
                row: layout.header_row + 1 + r as u32,
                col: layout.data_col + c as u16,
                value: cell.clone(),
                style: CellStyle::Data,
            });
        }
    }
}

/// Matrix layout: the frame's first column becomes row labels one column
/// to the left of the data region; the rest is the value grid.
fn plan_matrix(layout: &Layout, frame: &Frame, writes: &mut Vec<CellWrite>) {
    for (c, name) in frame.columns.iter().skip(1).enumerate() {
        writes.push(CellWrite {
            row: layout.header_row,
            col: layout.data_col + c as u16,
            value: Cell::Str(name.clone()),
            style: CellStyle::Header,
        });
    }
    for (r, row) in frame.rows.iter().enumerate() {
        let sheet_row = layout.header_row + 1 + r as u32;
        writes.push(CellWrite {
            row: sheet_row,
            col: layout.data_col - 1,
            value: row[0].clone(),
            style: CellStyle::Label,
        });
        for (c, cell) in row.iter().skip(1).enumerate() {
            writes.push(CellWrite {
                row: sheet_row,
                col: layout.data_col + c as u16,
                value: cell.clone(),
                style: CellStyle::Data,
            });
        }
    }
}

/// Totals block: one `sum()` per numeric column, two rows under the data.
fn plan_totals(layout: &Layout, frame: &Frame, writes: &mut Vec<CellWrite>) -> Result<()> {
    let row = layout.header_row + frame.len() as u32 + 2;
    writes.push(CellWrite {
        row,
        col: layout.data_col,
        value: Cell::Str("Total".to_string()),
        style: CellStyle::Label,
    });
    for (c, name) in frame.columns.iter().enumerate() {
        let has_numbers = frame.rows.iter().any(|r| r[c].as_f64().is_some());
        if !has_numbers {
            continue;
        }
        let total = CellExpr::Sum(name.clone()).eval(frame)?;
        writes.push(CellWrite {
            row,
            col: layout.data_col + c as u16,
            value: total,
            style: CellStyle::Total,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateId;

    fn frame() -> Frame {
        serde_json::from_str(
            r#"{"columns": ["region", "amount"], "rows": [["east", 130], ["west", 120]]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_expr_parse() {
        assert_eq!(
            CellExpr::parse("sum(amount)").unwrap(),
            CellExpr::Sum("amount".into())
        );
        assert_eq!(
            CellExpr::parse(" mean( amount ) ").unwrap(),
            CellExpr::Mean("amount".into())
        );
        assert_eq!(
            CellExpr::parse("region").unwrap(),
            CellExpr::Column("region".into())
        );
        assert!(CellExpr::parse("median(amount)").is_err());
        assert!(CellExpr::parse("sum(amount").is_err());
    }

    #[test]
    fn test_expr_eval() {
        let f = frame();
        assert_eq!(
            CellExpr::Sum("amount".into()).eval(&f).unwrap(),
            Cell::Float(250.0)
        );
        assert_eq!(
            CellExpr::Mean("amount".into()).eval(&f).unwrap(),
            Cell::Float(125.0)
        );
        assert_eq!(
            CellExpr::Max("amount".into()).eval(&f).unwrap(),
            Cell::Float(130.0)
        );
        assert_eq!(CellExpr::Count("region".into()).eval(&f).unwrap(), Cell::Int(2));
        assert_eq!(
            CellExpr::Column("region".into()).eval(&f).unwrap(),
            Cell::Str("east".into())
        );
        assert!(CellExpr::Sum("missing".into()).eval(&f).is_err());
    }

    #[test]
    fn test_rows_plan_places_header_and_data() {
        let layout = TemplateId::Grouped.layout();
        let plan = plan_sheet(layout, &frame(), None).unwrap();
        assert_eq!(plan.sheet, "Summary");

        let header: Vec<_> = plan
            .writes
            .iter()
            .filter(|w| w.style == CellStyle::Header)
            .collect();
        assert_eq!(header.len(), 2);
        assert_eq!(header[0].row, layout.header_row);

        let data: Vec<_> = plan
            .writes
            .iter()
            .filter(|w| w.style == CellStyle::Data)
            .collect();
        assert_eq!(data.len(), 4);
        assert_eq!(data[0].row, layout.header_row + 1);
    }

    #[test]
    fn test_matrix_plan_puts_labels_left_of_data() {
        let layout = TemplateId::Pivot.layout();
        let f: Frame = serde_json::from_str(
            r#"{"columns": ["date", "east", "west"], "rows": [["2025-04-14", 100, 50]]}"#,
        )
        .unwrap();
        let plan = plan_sheet(layout, &f, None).unwrap();
        let label = plan
            .writes
            .iter()
            .find(|w| w.value == Cell::Str("2025-04-14".into()))
            .unwrap();
        assert_eq!(label.col, layout.data_col - 1);
        // headers skip the date column
        let headers: Vec<_> = plan
            .writes
            .iter()
            .filter(|w| w.style == CellStyle::Header)
            .collect();
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_title_carries_date_range() {
        let layout = TemplateId::Grouped.layout();
        let plan = plan_sheet(layout, &frame(), Some("2025-04-14/19")).unwrap();
        assert_eq!(
            plan.writes[0].value,
            Cell::Str("Grouped Summary (2025-04-14/19)".into())
        );
    }

    #[test]
    fn test_totals_block() {
        let layout = TemplateId::Timeseries.layout();
        let f: Frame = serde_json::from_str(
            r#"{"columns": ["date", "amount"], "rows": [["2025-04-14", 180], ["2025-04-21", 70]]}"#,
        )
        .unwrap();
        let plan = plan_sheet(layout, &f, None).unwrap();
        let total = plan
            .writes
            .iter()
            .find(|w| w.style == CellStyle::Total)
            .unwrap();
        assert_eq!(total.value, Cell::Float(250.0));
        assert_eq!(total.row, layout.header_row + 2 + 2);
    }
}
