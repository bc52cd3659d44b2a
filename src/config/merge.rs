use super::{Config, ConfigLayer};

/// Apply layers lowest-precedence first on top of the defaults.
pub fn merge_layers(layers: impl IntoIterator<Item = Option<ConfigLayer>>) -> Config {
    let mut config = Config::default();
    for layer in layers.into_iter().flatten() {
        layer.apply_to(&mut config);
    }
    config
}

pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides_from(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| {
        lookup(key)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
    };

    if let Some(email) = var("CADENCE_EMAIL") {
        if email.contains('@') {
            config.identity.email = Some(email);
        } else {
            tracing::warn!("invalid CADENCE_EMAIL, ignoring: `{email}` has no `@`");
        }
    }

    if let Some(name) = var("CADENCE_NAME") {
        config.identity.name = Some(name);
    }

    if let Some(url) = var("CADENCE_REMOTE") {
        config.repository.remote_url = Some(url);
    }

    if let Some(branch) = var("CADENCE_BRANCH") {
        config.repository.branch = branch;
    }

    if let Some(raw) = var("CADENCE_ALLOW_FUTURE") {
        match parse_bool(&raw) {
            Some(allow) => config.calendar.allow_future_dates = allow,
            None => tracing::warn!("invalid CADENCE_ALLOW_FUTURE, ignoring: `{raw}`"),
        }
    }

    if let Some(raw) = var("CADENCE_PUBLISH_MAX_ATTEMPTS") {
        match raw.parse::<u32>() {
            Ok(0) => tracing::warn!("invalid CADENCE_PUBLISH_MAX_ATTEMPTS, ignoring: must be at least 1"),
            Ok(value) => config.publish.max_attempts = value,
            Err(err) => tracing::warn!("invalid CADENCE_PUBLISH_MAX_ATTEMPTS, ignoring: {err}"),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
