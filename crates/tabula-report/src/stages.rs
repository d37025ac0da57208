//! The seven concrete report stages, in execution order.

use tabula_core::error::{Result, TabulaError};

use crate::mapping::plan_sheet;
use crate::pipeline::{Pipeline, PipelineContext, PipelineOutput, Stage};
use crate::request::ReportRequest;
use crate::template::TemplateId;
use crate::{transform, workbook};

/// Rejects structurally invalid requests before any work happens.
pub struct InputGateway;

impl Stage for InputGateway {
    fn name(&self) -> &'static str {
        "input_gateway"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        if ctx.request.context.template.trim().is_empty() {
            return Err(TabulaError::InvalidRequest("template is required".into()));
        }
        ctx.request.data.validate()
    }
}

/// Resolves the template id from the request context.
pub struct TemplateSelector;

impl Stage for TemplateSelector {
    fn name(&self) -> &'static str {
        "template_selector"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let template = TemplateId::parse(&ctx.request.context.template)?;
        tracing::debug!(template = %template, "template selected");
        ctx.template = Some(template);
        Ok(())
    }
}

/// Pins the layout spec for the selected template.
pub struct TemplateLoader;

impl Stage for TemplateLoader {
    fn name(&self) -> &'static str {
        "template_loader"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let template = ctx
            .template
            .ok_or_else(|| TabulaError::Stage {
                stage: self.name().into(),
                message: "template not selected".into(),
            })?;
        ctx.layout = Some(template.layout());
        Ok(())
    }
}

/// Runs the template's frame transform.
pub struct Preprocessor;

impl Stage for Preprocessor {
    fn name(&self) -> &'static str {
        "preprocessor"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let template = ctx
            .template
            .ok_or_else(|| TabulaError::Stage {
                stage: self.name().into(),
                message: "template not selected".into(),
            })?;
        let out = transform::apply(template, &ctx.request.data, &ctx.request.context)?;
        out.validate()?;
        tracing::debug!(rows_in = ctx.request.data.len(), rows_out = out.len(), "frame transformed");
        ctx.transformed = Some(out);
        Ok(())
    }
}

/// Maps the transformed frame onto the layout's cells.
pub struct Mapper;

impl Stage for Mapper {
    fn name(&self) -> &'static str {
        "mapper"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let layout = ctx.layout.ok_or_else(|| TabulaError::Stage {
            stage: self.name().into(),
            message: "layout not loaded".into(),
        })?;
        let frame = ctx.transformed.as_ref().ok_or_else(|| TabulaError::Stage {
            stage: self.name().into(),
            message: "frame not transformed".into(),
        })?;
        let date_range = ctx.request.context.date_range.as_deref();
        ctx.plan = Some(plan_sheet(layout, frame, date_range)?);
        Ok(())
    }
}

/// Renders the plan into xlsx bytes.
pub struct WorkbookWriter;

impl Stage for WorkbookWriter {
    fn name(&self) -> &'static str {
        "workbook_writer"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let plan = ctx.plan.as_ref().ok_or_else(|| TabulaError::Stage {
            stage: self.name().into(),
            message: "sheet not planned".into(),
        })?;
        let bytes = workbook::render(plan)?;
        tracing::debug!(size = bytes.len(), "workbook rendered");
        ctx.bytes = Some(bytes);
        Ok(())
    }
}

/// Names the artifact: `{template}_report[_{range}].xlsx` where the range
/// is the request's date_range with `-` removed and `/` turned into `_`.
pub struct Dispatcher;

impl Stage for Dispatcher {
    fn name(&self) -> &'static str {
        "dispatcher"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let template = ctx
            .template
            .ok_or_else(|| TabulaError::Stage {
                stage: self.name().into(),
                message: "template not selected".into(),
            })?;
        let filename = match ctx.request.context.date_range.as_deref() {
            Some(range) => {
                let range = range.replace('-', "").replace('/', "_");
                format!("{template}_report_{range}.xlsx")
            }
            None => format!("{template}_report.xlsx"),
        };
        ctx.filename = Some(filename);
        Ok(())
    }
}

/// The full report pipeline in its fixed order.
pub fn report_pipeline() -> Pipeline {
    Pipeline::new(vec![
        Box::new(InputGateway),
        Box::new(TemplateSelector),
        Box::new(TemplateLoader),
        Box::new(Preprocessor),
        Box::new(Mapper),
        Box::new(WorkbookWriter),
        Box::new(Dispatcher),
    ])
}

/// One-shot helper: request in, named xlsx artifact out.
pub fn generate_report(request: ReportRequest) -> Result<PipelineOutput> {
    report_pipeline().run(request)
}
