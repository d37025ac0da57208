use tabula_core::error::{Result, TabulaError};

/// The fixed set of report layouts.
///
/// The original deployment named these 가/나/다/라/마; both those ids and
/// the canonical ascii ids are accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    /// Date × category pivot with summed values.
    Pivot,
    /// Group-by with summed aggregate columns.
    Grouped,
    /// Equality filter with optional sort.
    Filtered,
    /// Date-bucketed (D/W/M) sums of one value column.
    Timeseries,
    /// Percentage-of-total breakdown columns.
    Share,
}

impl TemplateId {
    pub fn parse(id: &str) -> Result<Self> {
        match id.trim() {
            "pivot" | "가" => Ok(Self::Pivot),
            "grouped" | "나" => Ok(Self::Grouped),
            "filtered" | "다" => Ok(Self::Filtered),
            "timeseries" | "라" => Ok(Self::Timeseries),
            "share" | "마" => Ok(Self::Share),
            other => Err(TabulaError::UnknownTemplate(other.to_string())),
        }
    }

    /// Canonical id used in filenames and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pivot => "pivot",
            Self::Grouped => "grouped",
            Self::Filtered => "filtered",
            Self::Timeseries => "timeseries",
            Self::Share => "share",
        }
    }

    pub fn all() -> [TemplateId; 5] {
        [
            Self::Pivot,
            Self::Grouped,
            Self::Filtered,
            Self::Timeseries,
            Self::Share,
        ]
    }

    pub fn layout(&self) -> &'static Layout {
        match self {
            Self::Pivot => &PIVOT_LAYOUT,
            Self::Grouped => &GROUPED_LAYOUT,
            Self::Filtered => &FILTERED_LAYOUT,
            Self::Timeseries => &TIMESERIES_LAYOUT,
            Self::Share => &SHARE_LAYOUT,
        }
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a layout places the transformed frame on its sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutKind {
    /// Pivoted grid: first frame column is the row-label column.
    Matrix,
    /// One sheet row per frame row under a header row.
    Rows,
}

/// A fixed label cell.
#[derive(Debug)]
pub struct StaticCell {
    pub row: u32,
    pub col: u16,
    pub text: &'static str,
}

/// Static presentation spec for one template: where the title, labels,
/// headers, and data region live.
#[derive(Debug)]
pub struct Layout {
    pub sheet: &'static str,
    pub title: &'static str,
    pub title_row: u32,
    pub title_col: u16,
    pub statics: &'static [StaticCell],
    /// Row the column headers are written to; data starts on the next row.
    pub header_row: u32,
    /// Leftmost column of the header/data region.
    pub data_col: u16,
    pub kind: LayoutKind,
    /// Append a summary block (totals) under the data region.
    pub with_totals: bool,
}

static PIVOT_LAYOUT: Layout = Layout {
    sheet: "Pivot",
    title: "Daily Breakdown",
    title_row: 0,
    title_col: 0,
    statics: &[StaticCell {
        row: 1,
        col: 0,
        text: "Values are summed per date and category",
    }],
    header_row: 3,
    data_col: 1,
    kind: LayoutKind::Matrix,
    with_totals: false,
};

static GROUPED_LAYOUT: Layout = Layout {
    sheet: "Summary",
    title: "Grouped Summary",
    title_row: 0,
    title_col: 0,
    statics: &[],
    header_row: 2,
    data_col: 0,
    kind: LayoutKind::Rows,
    with_totals: false,
};

static FILTERED_LAYOUT: Layout = Layout {
    sheet: "Detail",
    title: "Filtered Detail",
    title_row: 0,
    title_col: 0,
    statics: &[],
    header_row: 2,
    data_col: 0,
    kind: LayoutKind::Rows,
    with_totals: false,
};

static TIMESERIES_LAYOUT: Layout = Layout {
    sheet: "Series",
    title: "Time Series",
    title_row: 0,
    title_col: 0,
    statics: &[],
    header_row: 2,
    data_col: 0,
    kind: LayoutKind::Rows,
    with_totals: true,
};

static SHARE_LAYOUT: Layout = Layout {
    sheet: "Share",
    title: "Share of Total",
    title_row: 0,
    title_col: 0,
    statics: &[StaticCell {
        row: 1,
        col: 0,
        text: "Percentages are relative to the total column",
    }],
    header_row: 3,
    data_col: 0,
    kind: LayoutKind::Rows,
    with_totals: true,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_and_aliases() {
        assert_eq!(TemplateId::parse("pivot").unwrap(), TemplateId::Pivot);
        assert_eq!(TemplateId::parse("가").unwrap(), TemplateId::Pivot);
        assert_eq!(TemplateId::parse("나").unwrap(), TemplateId::Grouped);
        assert_eq!(TemplateId::parse("다").unwrap(), TemplateId::Filtered);
        assert_eq!(TemplateId::parse("라").unwrap(), TemplateId::Timeseries);
        assert_eq!(TemplateId::parse("마").unwrap(), TemplateId::Share);
        assert_eq!(TemplateId::parse(" share ").unwrap(), TemplateId::Share);
    }

    #[test]
    fn test_parse_unknown_is_error() {
        let err = TemplateId::parse("바").unwrap_err();
        assert!(err.is_client_error());
        assert!(TemplateId::parse("").is_err());
    }

    #[test]
    fn test_every_template_has_a_layout() {
        for id in TemplateId::all() {
            let layout = id.layout();
            assert!(!layout.sheet.is_empty());
            assert!(layout.header_row > layout.title_row);
        }
    }
}
