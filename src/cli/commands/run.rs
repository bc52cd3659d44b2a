use super::super::{Ctx, RunArgs, print_output, render};
use crate::Result;
use crate::pipeline::{self, RunSettings, Synthesizer};

pub(crate) fn handle(ctx: &Ctx, args: RunArgs) -> Result<()> {
    let mut config = ctx.config_with(&args.input, &args.repo);
    if let Some(email) = args.email {
        config.identity.email = Some(email);
    }
    if let Some(name) = args.name {
        config.identity.name = Some(name);
    }
    if args.no_push {
        config.publish.enabled = false;
    }

    let settings = RunSettings::from_config(&config, args.input.anchor.clone());
    let repo_path = settings.repo_path().to_path_buf();
    let text = pipeline::read_plan(&args.input.plan)?;
    let mut synth = Synthesizer::new(settings);
    let outcome = synth.run(&text, &ctx.cancel)?;

    let json = serde_json::json!({
        "repo": repo_path,
        "plan": outcome.summary,
        "skipped": outcome.execution.skipped,
        "applied": outcome.execution.applied.len(),
        "head": outcome.execution.head.map(|oid| oid.to_string()),
        "published": outcome.publish.as_ref().map(|report| serde_json::json!({
            "remote": report.remote,
            "attempts": report.attempts,
        })),
    });
    print_output(ctx, || render::render_outcome(&repo_path, &outcome), json);
    Ok(())
}
