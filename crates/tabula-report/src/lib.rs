//! Fixed-stage Excel report pipeline.
//!
//! A request carries a small tabular frame plus a template id; the
//! pipeline validates it, runs the template's transform, lays the result
//! out on a sheet, and renders an in-memory xlsx artifact.

pub mod frame;
pub mod mapping;
pub mod pipeline;
pub mod request;
pub mod stages;
pub mod template;
pub mod transform;
pub mod workbook;

pub use frame::{Cell, Frame};
pub use pipeline::{Pipeline, PipelineOutput, StageReport};
pub use request::{ReportContext, ReportRequest};
pub use stages::{generate_report, report_pipeline};
pub use template::TemplateId;
