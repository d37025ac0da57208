//! Turns a sheet plan into xlsx bytes.

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};

use tabula_core::error::{Result, TabulaError};

use crate::frame::Cell;
use crate::mapping::{CellStyle, SheetPlan};

struct Formats {
    title: Format,
    label: Format,
    header: Format,
    data: Format,
    total: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(14),
            label: Format::new().set_italic(),
            header: Format::new()
                .set_bold()
                .set_background_color("#DCE6F1")
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Center),
            data: Format::new().set_border(FormatBorder::Thin),
            total: Format::new()
                .set_bold()
                .set_border(FormatBorder::Double)
                .set_num_format("#,##0.00"),
        }
    }

    fn for_style(&self, style: CellStyle) -> &Format {
        match style {
            CellStyle::Title => &self.title,
            CellStyle::Label => &self.label,
            CellStyle::Header => &self.header,
            CellStyle::Data => &self.data,
            CellStyle::Total => &self.total,
        }
    }
}

/// Render the plan into an in-memory workbook.
pub fn render(plan: &SheetPlan) -> Result<Vec<u8>> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name(&plan.sheet)
        .map_err(|e| TabulaError::Workbook(e.to_string()))?;

    for write in &plan.writes {
        let format = formats.for_style(write.style);
        let res = match &write.value {
            Cell::Null => Ok(&mut *sheet),
            Cell::Bool(v) => sheet.write_boolean_with_format(write.row, write.col, *v, format),
            Cell::Int(v) => {
                sheet.write_number_with_format(write.row, write.col, *v as f64, format)
            }
            Cell::Float(v) => sheet.write_number_with_format(write.row, write.col, *v, format),
            Cell::Str(v) => sheet.write_string_with_format(write.row, write.col, v, format),
        };
        res.map_err(|e| TabulaError::Workbook(e.to_string()))?;
    }

    // Readable default widths for the plan's columns.
    let max_col = plan.writes.iter().map(|w| w.col).max().unwrap_or(0);
    for col in 0..=max_col {
        sheet
            .set_column_width(col, 16)
            .map_err(|e| TabulaError::Workbook(e.to_string()))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| TabulaError::Workbook(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::CellWrite;

    #[test]
    fn test_render_produces_xlsx_bytes() {
        let plan = SheetPlan {
            sheet: "Test".into(),
            writes: vec![
                CellWrite {
                    row: 0,
                    col: 0,
                    value: Cell::Str("Title".into()),
                    style: CellStyle::Title,
                },
                CellWrite {
                    row: 2,
                    col: 0,
                    value: Cell::Float(1.5),
                    style: CellStyle::Data,
                },
                CellWrite {
                    row: 2,
                    col: 1,
                    value: Cell::Null,
                    style: CellStyle::Data,
                },
            ],
        };
        let bytes = render(&plan).unwrap();
        // xlsx files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_bad_sheet_name_is_workbook_error() {
        let plan = SheetPlan {
            sheet: "bad[name]".into(),
            writes: vec![],
        };
        let err = render(&plan).unwrap_err();
        assert!(matches!(err, TabulaError::Workbook(_)));
    }
}
