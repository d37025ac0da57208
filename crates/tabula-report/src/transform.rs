//! Per-template frame transforms.
//!
//! Each transform takes the validated input frame plus the request context
//! and produces the frame the layout will render. Missing optional hints
//! leave the frame unchanged; a hint naming a column the frame does not
//! have is a client error.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};

use tabula_core::error::{Result, TabulaError};

use crate::frame::{cells_match, cmp_cells, Cell, Frame};
use crate::request::ReportContext;
use crate::template::TemplateId;

/// Run the transform for the given template.
pub fn apply(template: TemplateId, frame: &Frame, ctx: &ReportContext) -> Result<Frame> {
    match template {
        TemplateId::Pivot => pivot_sum(frame, ctx),
        TemplateId::Grouped => group_sum(frame, ctx),
        TemplateId::Filtered => filter_sort(frame, ctx),
        TemplateId::Timeseries => resample_sum(frame, ctx),
        TemplateId::Share => share_columns(frame, ctx),
    }
}

/// Pivot: rows keyed by the date column, one output column per distinct
/// value of the pivot column, cells summed from the value column.
pub fn pivot_sum(frame: &Frame, ctx: &ReportContext) -> Result<Frame> {
    let (Some(date_col), Some(pivot_col), Some(value_col)) = (
        ctx.date_column.as_deref(),
        ctx.pivot_column.as_deref(),
        ctx.value_column.as_deref(),
    ) else {
        return Ok(frame.clone());
    };

    let di = frame.col_index(date_col)?;
    let pi = frame.col_index(pivot_col)?;
    let vi = frame.col_index(value_col)?;

    // BTreeMaps keep dates and categories in stable sorted order. Slot
    // indices must follow that same sorted order, since the header row is
    // emitted from `categories.keys()`.
    let keys: BTreeSet<String> = frame.rows.iter().map(|row| row[pi].render()).collect();
    let categories: BTreeMap<String, usize> = keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| (key, i))
        .collect();

    let mut sums: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in &frame.rows {
        let date = row[di].render();
        let cat = row[pi].render();
        let value = row[vi].as_f64().unwrap_or(0.0);
        let slot = sums
            .entry(date)
            .or_insert_with(|| vec![0.0; categories.len()]);
        slot[categories[&cat]] += value;
    }

    let mut columns = vec![date_col.to_string()];
    columns.extend(categories.keys().cloned());
    let mut out = Frame::new(columns);
    for (date, values) in sums {
        let mut row = vec![Cell::Str(date)];
        row.extend(values.into_iter().map(Cell::Float));
        out.push_row(row);
    }
    Ok(out)
}

/// Group-by with summed aggregate columns.
pub fn group_sum(frame: &Frame, ctx: &ReportContext) -> Result<Frame> {
    let Some(group_cols) = ctx.group_columns.as_deref() else {
        return Ok(frame.clone());
    };
    if group_cols.is_empty() {
        return Ok(frame.clone());
    }

    let group_idx: Vec<usize> = group_cols
        .iter()
        .map(|c| frame.col_index(c))
        .collect::<Result<_>>()?;

    // Default to every numeric-looking column not used as a key.
    let agg_cols: Vec<String> = match ctx.agg_columns.as_deref() {
        Some(cols) => cols.to_vec(),
        None => frame
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| !group_idx.contains(i))
            .filter(|(i, _)| frame.rows.iter().any(|r| r[*i].as_f64().is_some()))
            .map(|(_, c)| c.clone())
            .collect(),
    };
    let agg_idx: Vec<usize> = agg_cols
        .iter()
        .map(|c| frame.col_index(c))
        .collect::<Result<_>>()?;

    let mut groups: BTreeMap<Vec<String>, Vec<f64>> = BTreeMap::new();
    for row in &frame.rows {
        let key: Vec<String> = group_idx.iter().map(|&i| row[i].render()).collect();
        let slot = groups.entry(key).or_insert_with(|| vec![0.0; agg_idx.len()]);
        for (s, &i) in slot.iter_mut().zip(&agg_idx) {
            *s += row[i].as_f64().unwrap_or(0.0);
        }
    }

    let mut columns = group_cols.to_vec();
    columns.extend(agg_cols);
    let mut out = Frame::new(columns);
    for (key, sums) in groups {
        let mut row: Vec<Cell> = key.into_iter().map(Cell::Str).collect();
        row.extend(sums.into_iter().map(Cell::Float));
        out.push_row(row);
    }
    Ok(out)
}

/// Equality filter on one column, then an optional ascending sort.
pub fn filter_sort(frame: &Frame, ctx: &ReportContext) -> Result<Frame> {
    let mut out = frame.clone();

    if let (Some(col), Some(value)) = (ctx.filter_column.as_deref(), ctx.filter_value.as_ref()) {
        let idx = out.col_index(col)?;
        out.rows.retain(|row| cells_match(&row[idx], value));
    }

    if let Some(sort_by) = ctx.sort_by.as_deref() {
        let idx = out.col_index(sort_by)?;
        out.rows.sort_by(|a, b| cmp_cells(&a[idx], &b[idx]));
    }

    Ok(out)
}

/// Resample: bucket rows by date (daily, week starting Monday, or first of
/// month) and sum the value column per bucket.
pub fn resample_sum(frame: &Frame, ctx: &ReportContext) -> Result<Frame> {
    let (Some(date_col), Some(value_col)) =
        (ctx.date_column.as_deref(), ctx.value_column.as_deref())
    else {
        return Ok(frame.clone());
    };
    let freq = ctx.freq.as_deref().unwrap_or("D");

    let di = frame.col_index(date_col)?;
    let vi = frame.col_index(value_col)?;

    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in &frame.rows {
        let raw = row[di].render();
        let date = parse_date(&raw)?;
        let bucket = bucket_start(date, freq)?;
        *buckets.entry(bucket).or_insert(0.0) += row[vi].as_f64().unwrap_or(0.0);
    }

    let mut out = Frame::new(vec![date_col.to_string(), value_col.to_string()]);
    for (bucket, sum) in buckets {
        out.push_row(vec![
            Cell::Str(bucket.format("%Y-%m-%d").to_string()),
            Cell::Float(sum),
        ]);
    }
    Ok(out)
}

/// Share: append a `{col}_pct` column per part column, each value as a
/// percentage of the same row's total column.
pub fn share_columns(frame: &Frame, ctx: &ReportContext) -> Result<Frame> {
    let (Some(total_col), Some(part_cols)) =
        (ctx.total_column.as_deref(), ctx.part_columns.as_deref())
    else {
        return Ok(frame.clone());
    };

    let ti = frame.col_index(total_col)?;
    let part_idx: Vec<usize> = part_cols
        .iter()
        .map(|c| frame.col_index(c))
        .collect::<Result<_>>()?;

    let mut out = frame.clone();
    for col in part_cols {
        out.columns.push(format!("{col}_pct"));
    }
    for row in &mut out.rows {
        let total = row[ti].as_f64().unwrap_or(0.0);
        for &i in &part_idx {
            let part = row[i].as_f64().unwrap_or(0.0);
            let pct = if total == 0.0 {
                0.0
            } else {
                (part / total * 10000.0).round() / 100.0
            };
            row.push(Cell::Float(pct));
        }
    }
    Ok(out)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    let text = raw.trim();
    // Timestamps are truncated to their date part.
    let date_part = text.split(['T', ' ']).next().unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y/%m/%d"))
        .map_err(|_| TabulaError::InvalidRequest(format!("unparseable date: {text}")))
}

fn bucket_start(date: NaiveDate, freq: &str) -> Result<NaiveDate> {
    match freq {
        "D" | "d" => Ok(date),
        "W" | "w" => {
            let back = date.weekday().num_days_from_monday() as i64;
            Ok(date - Duration::days(back))
        }
        "M" | "m" => date
            .with_day(1)
            .ok_or_else(|| TabulaError::InvalidRequest(format!("bad date {date}"))),
        other => Err(TabulaError::InvalidRequest(format!(
            "unsupported resample frequency: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Frame {
        let json = r#"{
            "columns": ["date", "region", "amount", "cost"],
            "rows": [
                ["2025-04-14", "east", 100, 40],
                ["2025-04-14", "west", 50, 20],
                ["2025-04-15", "east", 30, 10],
                ["2025-04-21", "west", 70, 35]
            ]
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_pivot_sum() {
        let ctx = ReportContext {
            template: "pivot".into(),
            date_column: Some("date".into()),
            pivot_column: Some("region".into()),
            value_column: Some("amount".into()),
            ..Default::default()
        };
        let out = pivot_sum(&sales(), &ctx).unwrap();
        assert_eq!(out.columns, vec!["date", "east", "west"]);
        assert_eq!(out.len(), 3);
        // 2025-04-14: east 100, west 50
        assert_eq!(out.rows[0][1], Cell::Float(100.0));
        assert_eq!(out.rows[0][2], Cell::Float(50.0));
        // 2025-04-15: no west rows
        assert_eq!(out.rows[1][2], Cell::Float(0.0));
    }

    #[test]
    fn test_pivot_sum_insertion_order_differs_from_sorted() {
        // "west" shows up before "east"; cells must still land under the
        // alphabetically sorted headers.
        let frame: Frame = serde_json::from_str(
            r#"{
                "columns": ["date", "region", "amount"],
                "rows": [
                    ["2025-04-14", "west", 50],
                    ["2025-04-14", "east", 100]
                ]
            }"#,
        )
        .unwrap();
        let ctx = ReportContext {
            template: "pivot".into(),
            date_column: Some("date".into()),
            pivot_column: Some("region".into()),
            value_column: Some("amount".into()),
            ..Default::default()
        };
        let out = pivot_sum(&frame, &ctx).unwrap();
        assert_eq!(out.columns, vec!["date", "east", "west"]);
        assert_eq!(out.rows[0][1], Cell::Float(100.0));
        assert_eq!(out.rows[0][2], Cell::Float(50.0));
    }

    #[test]
    fn test_group_sum_defaults_to_numeric_columns() {
        let ctx = ReportContext {
            template: "grouped".into(),
            group_columns: Some(vec!["region".into()]),
            ..Default::default()
        };
        let out = group_sum(&sales(), &ctx).unwrap();
        assert_eq!(out.columns, vec!["region", "amount", "cost"]);
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows[0][0], Cell::Str("east".into()));
        assert_eq!(out.rows[0][1], Cell::Float(130.0));
        assert_eq!(out.rows[1][1], Cell::Float(120.0));
    }

    #[test]
    fn test_filter_then_sort() {
        let ctx = ReportContext {
            template: "filtered".into(),
            filter_column: Some("region".into()),
            filter_value: Some(Cell::Str("east".into())),
            sort_by: Some("amount".into()),
            ..Default::default()
        };
        let out = filter_sort(&sales(), &ctx).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows[0][2], Cell::Int(30));
        assert_eq!(out.rows[1][2], Cell::Int(100));
    }

    #[test]
    fn test_resample_weekly() {
        let ctx = ReportContext {
            template: "timeseries".into(),
            date_column: Some("date".into()),
            value_column: Some("amount".into()),
            freq: Some("W".into()),
            ..Default::default()
        };
        let out = resample_sum(&sales(), &ctx).unwrap();
        // 2025-04-14 is a Monday, 2025-04-21 the next one.
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows[0][0], Cell::Str("2025-04-14".into()));
        assert_eq!(out.rows[0][1], Cell::Float(180.0));
        assert_eq!(out.rows[1][1], Cell::Float(70.0));
    }

    #[test]
    fn test_resample_monthly() {
        let ctx = ReportContext {
            template: "timeseries".into(),
            date_column: Some("date".into()),
            value_column: Some("amount".into()),
            freq: Some("M".into()),
            ..Default::default()
        };
        let out = resample_sum(&sales(), &ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows[0][0], Cell::Str("2025-04-01".into()));
        assert_eq!(out.rows[0][1], Cell::Float(250.0));
    }

    #[test]
    fn test_share_appends_pct_columns() {
        let frame: Frame = serde_json::from_str(
            r#"{"columns": ["total", "a", "b"], "rows": [[200, 50, 150], [0, 1, 2]]}"#,
        )
        .unwrap();
        let ctx = ReportContext {
            template: "share".into(),
            total_column: Some("total".into()),
            part_columns: Some(vec!["a".into(), "b".into()]),
            ..Default::default()
        };
        let out = share_columns(&frame, &ctx).unwrap();
        assert_eq!(out.columns, vec!["total", "a", "b", "a_pct", "b_pct"]);
        assert_eq!(out.rows[0][3], Cell::Float(25.0));
        assert_eq!(out.rows[0][4], Cell::Float(75.0));
        // zero total does not divide
        assert_eq!(out.rows[1][3], Cell::Float(0.0));
    }

    #[test]
    fn test_missing_hint_column_is_client_error() {
        let ctx = ReportContext {
            template: "filtered".into(),
            sort_by: Some("nope".into()),
            ..Default::default()
        };
        let err = filter_sort(&sales(), &ctx).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_missing_hints_pass_frame_through() {
        let ctx = ReportContext {
            template: "pivot".into(),
            ..Default::default()
        };
        let out = pivot_sum(&sales(), &ctx).unwrap();
        assert_eq!(out, sales());
    }
}
