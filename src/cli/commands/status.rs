use super::super::{Ctx, StatusArgs, print_output, render};
use crate::Result;
use crate::pipeline::{self, RunSettings, Synthesizer};

pub(crate) fn handle(ctx: &Ctx, args: StatusArgs) -> Result<()> {
    let config = ctx.config_with(&args.input, &args.repo);
    let settings = RunSettings::from_config(&config, args.input.anchor.clone());
    let text = pipeline::read_plan(&args.input.plan)?;
    let synth = Synthesizer::new(settings);
    let plan = synth.prepare(&text)?;
    let status = synth.status(&plan)?;

    print_output(
        ctx,
        || render::render_status(&status),
        serde_json::json!({ "status": status }),
    );
    Ok(())
}
