use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use tabula_report::{generate_report, ReportRequest, TemplateId};

fn request(template: &str) -> ReportRequest {
    let json = format!(
        r#"{{
            "data": {{
                "columns": ["date", "region", "amount", "total"],
                "rows": [
                    ["2025-04-14", "east", 100, 400],
                    ["2025-04-14", "west", 50, 400],
                    ["2025-04-15", "east", 30, 400],
                    ["2025-04-21", "west", 220, 400]
                ]
            }},
            "context": {{
                "template": "{template}",
                "date_range": "2025-04-14/21",
                "date_column": "date",
                "pivot_column": "region",
                "value_column": "amount",
                "group_columns": ["region"],
                "agg_columns": ["amount"],
                "sort_by": "amount",
                "freq": "W",
                "total_column": "total",
                "part_columns": ["amount"]
            }}
        }}"#
    );
    serde_json::from_str(&json).expect("request json")
}

fn open_workbook(bytes: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
    Xlsx::new(Cursor::new(bytes)).expect("decodable workbook")
}

#[test]
fn test_every_template_yields_a_wellformed_workbook() {
    for id in TemplateId::all() {
        let out = generate_report(request(id.as_str())).expect("report");
        let mut wb = open_workbook(out.bytes);

        let sheet = id.layout().sheet;
        let range = wb.worksheet_range(sheet).expect("named sheet exists");
        assert!(range.get_size().0 > 0, "{id}: sheet is empty");

        // Title lands at its layout position, date range appended.
        let title = range
            .get_value((id.layout().title_row, id.layout().title_col as u32))
            .expect("title cell");
        let expected = format!("{} (2025-04-14/21)", id.layout().title);
        assert_eq!(title, &Data::String(expected));
    }
}

#[test]
fn test_hangul_aliases_select_the_same_templates() {
    for (alias, canonical) in [("가", "pivot"), ("나", "grouped"), ("마", "share")] {
        let out = generate_report(request(alias)).expect("report");
        assert!(out.filename.starts_with(canonical));
    }
}

#[test]
fn test_unknown_template_is_a_client_error_and_no_file() {
    let err = generate_report(request("unknown-template")).unwrap_err();
    assert!(err.is_client_error());
}

#[test]
fn test_filtered_report_round_trips_rows_and_values() {
    let mut req = request("filtered");
    // Keep all rows, sorted by amount ascending.
    req.context.filter_column = None;
    req.context.filter_value = None;

    let out = generate_report(req).expect("report");
    let mut wb = open_workbook(out.bytes);
    let range = wb.worksheet_range("Detail").expect("sheet");

    let layout = TemplateId::Filtered.layout();
    let header_row = layout.header_row;

    // Header row carries the input columns.
    for (c, name) in ["date", "region", "amount", "total"].iter().enumerate() {
        let cell = range
            .get_value((header_row, c as u32))
            .expect("header cell");
        assert_eq!(cell, &Data::String(name.to_string()));
    }

    // All four input rows survive, ordered by amount: 30, 50, 100, 220.
    let expected_amounts = [30.0, 50.0, 100.0, 220.0];
    let expected_regions = ["east", "west", "east", "west"];
    for (r, (amount, region)) in expected_amounts.iter().zip(expected_regions).enumerate() {
        let row = header_row + 1 + r as u32;
        assert_eq!(
            range.get_value((row, 2)).expect("amount cell"),
            &Data::Float(*amount)
        );
        assert_eq!(
            range.get_value((row, 1)).expect("region cell"),
            &Data::String(region.to_string())
        );
    }
    assert!(range.get_value((header_row + 5, 0)).is_none());
}

#[test]
fn test_pivot_report_sums_into_the_matrix() {
    let out = generate_report(request("pivot")).expect("report");
    let mut wb = open_workbook(out.bytes);
    let range = wb.worksheet_range("Pivot").expect("sheet");

    let layout = TemplateId::Pivot.layout();
    // Columns: east, west under the header row; date labels to the left.
    assert_eq!(
        range.get_value((layout.header_row, layout.data_col as u32)),
        Some(&Data::String("east".to_string()))
    );
    assert_eq!(
        range.get_value((layout.header_row + 1, (layout.data_col - 1) as u32)),
        Some(&Data::String("2025-04-14".to_string()))
    );
    // 2025-04-14 east = 100, west = 50
    assert_eq!(
        range.get_value((layout.header_row + 1, layout.data_col as u32)),
        Some(&Data::Float(100.0))
    );
    assert_eq!(
        range.get_value((layout.header_row + 1, (layout.data_col + 1) as u32)),
        Some(&Data::Float(50.0))
    );
}

#[test]
fn test_filename_encodes_template_and_date_range() {
    let out = generate_report(request("timeseries")).expect("report");
    assert_eq!(out.filename, "timeseries_report_20250414_21.xlsx");
}
