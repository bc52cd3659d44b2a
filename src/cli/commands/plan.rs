use super::super::{Ctx, PlanArgs, print_output, render};
use crate::Result;
use crate::pipeline::{self, PlanSettings};

/// Dry run: validate and summarize without opening a repository.
pub(crate) fn handle(ctx: &Ctx, args: PlanArgs) -> Result<()> {
    let config = ctx.config_with(&args.input, &Default::default());
    let settings = PlanSettings::from_config(&config, args.input.anchor.clone());
    let text = pipeline::read_plan(&args.input.plan)?;
    let plan = pipeline::prepare(&settings, &text)?;
    let summary = plan.summary();

    print_output(
        ctx,
        || render::render_summary(&summary),
        serde_json::json!({ "plan": summary }),
    );
    Ok(())
}
