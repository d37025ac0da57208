//! Linear stage executor.
//!
//! Stages run strictly in order over a shared context; the first failure
//! aborts the run and no file is produced.

use std::time::Instant;

use tabula_core::error::Result;

use crate::frame::Frame;
use crate::mapping::SheetPlan;
use crate::request::ReportRequest;
use crate::template::{Layout, TemplateId};

/// Mutable state threaded through the stages. Each stage fills in the
/// piece it owns; later stages read what earlier ones wrote.
#[derive(Debug)]
pub struct PipelineContext {
    pub request: ReportRequest,
    pub template: Option<TemplateId>,
    pub layout: Option<&'static Layout>,
    pub transformed: Option<Frame>,
    pub plan: Option<SheetPlan>,
    pub bytes: Option<Vec<u8>>,
    pub filename: Option<String>,
}

impl PipelineContext {
    pub fn new(request: ReportRequest) -> Self {
        Self {
            request,
            template: None,
            layout: None,
            transformed: None,
            plan: None,
            bytes: None,
            filename: None,
        }
    }
}

pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &mut PipelineContext) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub name: &'static str,
    pub elapsed_ms: u64,
}

/// The finished artifact plus per-stage timings.
#[derive(Debug)]
pub struct PipelineOutput {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub stages: Vec<StageReport>,
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub fn run(&self, request: ReportRequest) -> Result<PipelineOutput> {
        let mut ctx = PipelineContext::new(request);
        let mut reports = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let started = Instant::now();
            if let Err(err) = stage.run(&mut ctx) {
                tracing::warn!(stage = stage.name(), error = %err, "pipeline stage failed");
                return Err(err);
            }
            let elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::debug!(stage = stage.name(), elapsed_ms, "pipeline stage done");
            reports.push(StageReport {
                name: stage.name(),
                elapsed_ms,
            });
        }

        let filename = ctx.filename.unwrap_or_else(|| "report.xlsx".to_string());
        let bytes = ctx.bytes.unwrap_or_default();
        Ok(PipelineOutput {
            filename,
            bytes,
            stages: reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::error::TabulaError;

    struct Tag(&'static str);

    impl Stage for Tag {
        fn name(&self) -> &'static str {
            self.0
        }
        fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
            let name = ctx.filename.take().unwrap_or_default();
            ctx.filename = Some(format!("{name}{}", self.0));
            Ok(())
        }
    }

    struct Boom;

    impl Stage for Boom {
        fn name(&self) -> &'static str {
            "boom"
        }
        fn run(&self, _ctx: &mut PipelineContext) -> Result<()> {
            Err(TabulaError::InvalidRequest("nope".into()))
        }
    }

    fn request() -> ReportRequest {
        serde_json::from_str(
            r#"{"data": {"columns": ["a"], "rows": []}, "context": {"template": "grouped"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_stages_run_in_order() {
        let pipeline = Pipeline::new(vec![Box::new(Tag("a")), Box::new(Tag("b"))]);
        let out = pipeline.run(request()).unwrap();
        assert_eq!(out.filename, "ab");
        assert_eq!(out.stages.len(), 2);
        assert_eq!(out.stages[0].name, "a");
    }

    #[test]
    fn test_failure_aborts_remaining_stages() {
        let pipeline = Pipeline::new(vec![Box::new(Tag("a")), Box::new(Boom), Box::new(Tag("c"))]);
        let err = pipeline.run(request()).unwrap_err();
        assert!(err.is_client_error());
    }
}
