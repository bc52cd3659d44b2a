use super::super::{ConfigArgs, Ctx, print_output};
use crate::Result;
use crate::config::{self, ConfigError};

pub(crate) fn handle(ctx: &Ctx, args: ConfigArgs) -> Result<()> {
    if let Some(target) = args.write {
        let path = target.unwrap_or_else(config::config_path);
        config::write_config(&path, &ctx.config)?;
        tracing::info!(path = %path.display(), "config written");
    }

    let rendered = toml::to_string_pretty(&ctx.config).map_err(ConfigError::from)?;
    let json = serde_json::to_value(&ctx.config).unwrap_or(serde_json::Value::Null);
    print_output(ctx, || rendered, json);
    Ok(())
}
