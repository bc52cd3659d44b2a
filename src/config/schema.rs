use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::{IntensityScale, WeekStart};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub identity: IdentityConfig,
    pub repository: RepositoryConfig,
    pub calendar: CalendarConfig,
    pub commits: CommitsConfig,
    pub publish: PublishConfig,
    pub logging: LoggingConfig,
}

/// Commit author. Every field is optional so the same struct works as a layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl IdentityConfig {
    pub fn apply_to(&self, target: &mut IdentityConfig) {
        if self.email.is_some() {
            target.email = self.email.clone();
        }
        if self.name.is_some() {
            target.name = self.name.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Working repository; defaults to a workspace under the data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    pub remote_name: String,
    pub branch: String,
    pub content_file: String,
    pub message_prefix: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            remote_url: None,
            remote_name: "origin".to_string(),
            branch: "main".to_string(),
            content_file: "cadence.txt".to_string(),
            message_prefix: "cadence".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub week_start: WeekStart,
    /// `Z`, `UTC` or `±HH:MM`.
    pub utc_offset: String,
    pub allow_future_dates: bool,
    /// Widest grid accepted, in weeks. `0` disables the check.
    pub max_weeks: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            week_start: WeekStart::Sunday,
            utc_offset: "+00:00".to_string(),
            allow_future_dates: false,
            max_weeks: 53,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitsConfig {
    pub scale: IntensityScale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Push after executing. `--no-push` turns it off for one run.
    pub enabled: bool,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub timeout_ms: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            timeout_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Tree,
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogRotation {
    Daily,
    Hourly,
    Minutely,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub stdout: bool,
    pub stdout_format: LogFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub file: FileLoggingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stdout: true,
            stdout_format: LogFormat::Tree,
            filter: None,
            file: FileLoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub rotation: LogRotation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_max_age_days: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_max_files: Option<usize>,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: None,
            format: LogFormat::Json,
            rotation: LogRotation::Daily,
            retention_max_age_days: Some(7),
            retention_max_files: Some(10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RepositoryConfigOverride {
    pub path: Option<PathBuf>,
    pub remote_url: Option<String>,
    pub remote_name: Option<String>,
    pub branch: Option<String>,
    pub content_file: Option<String>,
    pub message_prefix: Option<String>,
}

impl RepositoryConfigOverride {
    pub fn apply_to(&self, target: &mut RepositoryConfig) {
        if let Some(path) = self.path.as_ref() {
            target.path = Some(path.clone());
        }
        if let Some(url) = self.remote_url.as_ref() {
            target.remote_url = Some(url.clone());
        }
        if let Some(name) = self.remote_name.as_ref() {
            target.remote_name = name.clone();
        }
        if let Some(branch) = self.branch.as_ref() {
            target.branch = branch.clone();
        }
        if let Some(file) = self.content_file.as_ref() {
            target.content_file = file.clone();
        }
        if let Some(prefix) = self.message_prefix.as_ref() {
            target.message_prefix = prefix.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CalendarConfigOverride {
    pub week_start: Option<WeekStart>,
    pub utc_offset: Option<String>,
    pub allow_future_dates: Option<bool>,
    pub max_weeks: Option<u32>,
}

impl CalendarConfigOverride {
    pub fn apply_to(&self, target: &mut CalendarConfig) {
        if let Some(week_start) = self.week_start {
            target.week_start = week_start;
        }
        if let Some(offset) = self.utc_offset.as_ref() {
            target.utc_offset = offset.clone();
        }
        if let Some(allow) = self.allow_future_dates {
            target.allow_future_dates = allow;
        }
        if let Some(weeks) = self.max_weeks {
            target.max_weeks = weeks;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CommitsConfigOverride {
    pub scale: Option<IntensityScale>,
}

impl CommitsConfigOverride {
    pub fn apply_to(&self, target: &mut CommitsConfig) {
        if let Some(scale) = self.scale {
            target.scale = scale;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PublishConfigOverride {
    pub enabled: Option<bool>,
    pub max_attempts: Option<u32>,
    pub backoff_base_ms: Option<u64>,
    pub backoff_max_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl PublishConfigOverride {
    pub fn apply_to(&self, target: &mut PublishConfig) {
        if let Some(enabled) = self.enabled {
            target.enabled = enabled;
        }
        if let Some(attempts) = self.max_attempts {
            target.max_attempts = attempts;
        }
        if let Some(base) = self.backoff_base_ms {
            target.backoff_base_ms = base;
        }
        if let Some(max) = self.backoff_max_ms {
            target.backoff_max_ms = max;
        }
        if let Some(timeout) = self.timeout_ms {
            target.timeout_ms = timeout;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfigOverride {
    pub stdout: Option<bool>,
    pub stdout_format: Option<LogFormat>,
    pub filter: Option<String>,
    pub file: Option<FileLoggingConfigOverride>,
}

impl LoggingConfigOverride {
    pub fn apply_to(&self, target: &mut LoggingConfig) {
        if let Some(stdout) = self.stdout {
            target.stdout = stdout;
        }
        if let Some(format) = self.stdout_format {
            target.stdout_format = format;
        }
        if let Some(filter) = self.filter.as_ref() {
            target.filter = Some(filter.clone());
        }
        if let Some(file) = self.file.as_ref() {
            file.apply_to(&mut target.file);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoggingConfigOverride {
    pub enabled: Option<bool>,
    pub dir: Option<PathBuf>,
    pub format: Option<LogFormat>,
    pub rotation: Option<LogRotation>,
    pub retention_max_age_days: Option<u64>,
    pub retention_max_files: Option<usize>,
}

impl FileLoggingConfigOverride {
    pub fn apply_to(&self, target: &mut FileLoggingConfig) {
        if let Some(enabled) = self.enabled {
            target.enabled = enabled;
        }
        if let Some(dir) = self.dir.as_ref() {
            target.dir = Some(dir.clone());
        }
        if let Some(format) = self.format {
            target.format = format;
        }
        if let Some(rotation) = self.rotation {
            target.rotation = rotation;
        }
        if let Some(days) = self.retention_max_age_days {
            target.retention_max_age_days = Some(days);
        }
        if let Some(files) = self.retention_max_files {
            target.retention_max_files = Some(files);
        }
    }
}

/// One config file. Absent keys leave the layer below untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfigLayer {
    pub identity: IdentityConfig,
    pub repository: RepositoryConfigOverride,
    pub calendar: CalendarConfigOverride,
    pub commits: CommitsConfigOverride,
    pub publish: PublishConfigOverride,
    pub logging: LoggingConfigOverride,
}

impl ConfigLayer {
    pub fn apply_to(&self, base: &mut Config) {
        self.identity.apply_to(&mut base.identity);
        self.repository.apply_to(&mut base.repository);
        self.calendar.apply_to(&mut base.calendar);
        self.commits.apply_to(&mut base.commits);
        self.publish.apply_to(&mut base.publish);
        self.logging.apply_to(&mut base.logging);
    }
}
