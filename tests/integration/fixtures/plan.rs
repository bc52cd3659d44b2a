use std::path::{Path, PathBuf};

use cadence_rs::RunSettings;
use cadence_rs::config::Config;
use time::macros::date;

/// A Sunday.
pub const ANCHOR: &str = "2024-03-03";

/// One week `[0,1,2,3,4,2,0]`: 23 commits on 5 dates with the default scale.
pub const SCENARIO_PLAN: &str = "\
# week 0
0:0 0
0:1 1
0:2 2
0:3 3
0:4 4
0:5 2
0:6 0
";

/// The first three lit days of `SCENARIO_PLAN`: a run stopped after date 3.
pub const SCENARIO_PREFIX: &str = "0:1 1\n0:2 2\n0:3 3\n";

pub fn write_plan(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("art.plan");
    std::fs::write(&path, text).expect("write plan");
    path
}

pub fn settings(repo: &Path, remote: Option<&Path>) -> RunSettings {
    let mut config = Config::default();
    config.identity.email = Some("painter@example.com".to_string());
    config.identity.name = Some("Painter".to_string());
    config.repository.path = Some(repo.to_path_buf());
    config.repository.remote_url = remote.map(|path| path.display().to_string());
    config.publish.enabled = remote.is_some();
    config.publish.max_attempts = 2;
    config.publish.backoff_base_ms = 1;
    config.publish.backoff_max_ms = 2;
    let mut settings = RunSettings::from_config(&config, ANCHOR);
    settings.plan.today = Some(date!(2024 - 12 - 31));
    settings
}
