use serde::{Deserialize, Serialize};

use crate::frame::{Cell, Frame};

/// A report generation request: the dataset plus template-selection hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(alias = "df")]
    pub data: Frame,
    pub context: ReportContext,
}

/// Template-selection hints. Only `template` is required; the rest are
/// consumed by whichever preprocessing transform the template runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportContext {
    pub template: String,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub date_column: Option<String>,
    #[serde(default)]
    pub pivot_column: Option<String>,
    #[serde(default)]
    pub value_column: Option<String>,
    #[serde(default)]
    pub group_columns: Option<Vec<String>>,
    #[serde(default)]
    pub agg_columns: Option<Vec<String>>,
    #[serde(default)]
    pub filter_column: Option<String>,
    #[serde(default)]
    pub filter_value: Option<Cell>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub freq: Option<String>,
    #[serde(default)]
    pub total_column: Option<String>,
    #[serde(default)]
    pub part_columns: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request_parses() {
        let json = r#"{
            "data": {"columns": ["region", "amount"], "rows": [["east", 10]]},
            "context": {"template": "grouped"}
        }"#;
        let req: ReportRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.context.template, "grouped");
        assert!(req.context.date_range.is_none());
        assert_eq!(req.data.len(), 1);
    }

    #[test]
    fn test_df_alias_accepted() {
        let json = r#"{
            "df": {"columns": ["a"], "rows": [[1]]},
            "context": {"template": "가", "date_range": "2025-04-14/19"}
        }"#;
        let req: ReportRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.context.template, "가");
        assert_eq!(req.context.date_range.as_deref(), Some("2025-04-14/19"));
    }
}
