use super::super::{Ctx, PublishArgs, print_output, render};
use crate::Result;
use crate::pipeline::{self, RunSettings, Synthesizer};

/// Push only; the plan must already be fully applied.
pub(crate) fn handle(ctx: &Ctx, args: PublishArgs) -> Result<()> {
    let config = ctx.config_with(&args.input, &args.repo);
    let settings = RunSettings::from_config(&config, args.input.anchor.clone());
    let text = pipeline::read_plan(&args.input.plan)?;
    let mut synth = Synthesizer::new(settings);
    let plan = synth.prepare(&text)?;
    let report = synth.publish(&plan, &ctx.cancel)?;

    print_output(
        ctx,
        || render::render_published(&report),
        serde_json::json!({
            "remote": report.remote,
            "attempts": report.attempts,
            "commits": plan.len(),
        }),
    );
    Ok(())
}
