//! Tracing setup for the `cadence` binary.
//!
//! Human logs go to stderr so stdout stays clean for plan summaries and `--json`.
//! An optional rolling file sink keeps a bounded history of past runs.

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::metadata::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::{FileLoggingConfig, LogFormat, LogRotation, LoggingConfig};
use crate::paths;

const LOG_FILE_PREFIX: &str = "cadence.log";
const LOG_ENV_VAR: &str = "CADENCE_LOG";
const SECS_PER_DAY: u64 = 24 * 60 * 60;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// `-v` count.
    pub verbosity: u8,
    pub logging: LoggingConfig,
}

impl TelemetryConfig {
    pub fn new(verbosity: u8, logging: LoggingConfig) -> Self {
        Self { verbosity, logging }
    }
}

/// Flushes the file writer on drop; hold it for the life of the process.
pub struct TelemetryGuard {
    _file: Option<WorkerGuard>,
}

/// Things worth logging that happened before the subscriber existed.
enum SetupNote {
    Swept { dir: PathBuf, removed: usize, kept: usize },
    Failed(String),
}

pub fn init(config: TelemetryConfig) -> TelemetryGuard {
    let LoggingConfig {
        stdout,
        stdout_format,
        filter,
        file,
    } = config.logging;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if stdout {
        let ansi = std::io::stderr().is_terminal();
        layers.push(build_layer(stdout_format, std::io::stderr, ansi));
    }

    let mut notes = Vec::new();
    let mut file_guard = None;
    if file.enabled {
        match open_file_sink(&file, &mut notes) {
            Ok((layer, guard)) => {
                layers.push(layer);
                file_guard = Some(guard);
            }
            Err(note) => notes.push(note),
        }
    }

    let directive = select_directive(std::env::var(LOG_ENV_VAR).ok(), filter.as_deref());
    layers.push(Box::new(
        EnvFilter::builder()
            .with_default_directive(level_for(config.verbosity).into())
            .parse_lossy(directive.unwrap_or_default()),
    ));

    // A second init (tests driving `run` twice) keeps the first subscriber.
    if Registry::default().with(layers).try_init().is_ok() {
        for note in notes {
            match note {
                SetupNote::Swept { dir, removed, kept } => {
                    tracing::debug!(dir = %dir.display(), removed, kept, "old run logs swept");
                }
                SetupNote::Failed(reason) => tracing::warn!("file logging: {reason}"),
            }
        }
    }

    TelemetryGuard { _file: file_guard }
}

fn open_file_sink(
    file: &FileLoggingConfig,
    notes: &mut Vec<SetupNote>,
) -> Result<(BoxedLayer, WorkerGuard), SetupNote> {
    let dir = file.dir.clone().unwrap_or_else(paths::log_dir);
    fs::create_dir_all(&dir)
        .map_err(|err| SetupNote::Failed(format!("cannot create {}: {err}", dir.display())))?;

    let retention = LogRetention::from_config(file);
    if !retention.is_unbounded() {
        match retention.sweep(&dir, SystemTime::now()) {
            Ok((removed, kept)) => notes.push(SetupNote::Swept {
                dir: dir.clone(),
                removed,
                kept,
            }),
            Err(err) => notes.push(SetupNote::Failed(format!("retention sweep failed: {err}"))),
        }
    }

    let appender = RollingFileAppender::new(rotation_for(file.rotation), &dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((build_layer(file.format, writer, false), guard))
}

/// `CADENCE_LOG` wins over the configured filter; neither means verbosity only.
fn select_directive(env: Option<String>, configured: Option<&str>) -> Option<String> {
    env.filter(|raw| !raw.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
}

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn rotation_for(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Never => Rotation::NEVER,
    }
}

fn build_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if format == LogFormat::Tree {
        return Box::new(
            tracing_tree::HierarchicalLayer::new(2)
                .with_ansi(ansi)
                .with_targets(false)
                .with_writer(writer),
        );
    }

    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    match format {
        LogFormat::Pretty => Box::new(fmt.pretty()),
        LogFormat::Json => Box::new(
            fmt.json()
                .with_current_span(true)
                .with_span_list(true),
        ),
        LogFormat::Compact | LogFormat::Tree => Box::new(fmt.compact().with_target(false)),
    }
}

/// How many old log files to keep, by age and by count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct LogRetention {
    max_age: Option<Duration>,
    max_files: Option<usize>,
}

impl LogRetention {
    fn from_config(file: &FileLoggingConfig) -> Self {
        Self {
            max_age: file
                .retention_max_age_days
                .map(|days| Duration::from_secs(days.saturating_mul(SECS_PER_DAY))),
            max_files: file.retention_max_files,
        }
    }

    fn is_unbounded(&self) -> bool {
        self.max_age.is_none() && self.max_files.is_none()
    }

    /// Delete expired `cadence.log*` files in `dir`. Returns (removed, kept).
    fn sweep(&self, dir: &Path, now: SystemTime) -> std::io::Result<(usize, usize)> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let is_log = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
            let meta = entry.metadata()?;
            if is_log && meta.is_file() {
                files.push((entry.path(), meta.modified().unwrap_or(now)));
            }
        }

        let total = files.len();
        let mut removed = 0;
        for path in self.expired(files, now) {
            if fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok((removed, total - removed))
    }

    /// Files past `max_age`, then the oldest of the rest beyond `max_files`.
    fn expired(&self, mut files: Vec<(PathBuf, SystemTime)>, now: SystemTime) -> Vec<PathBuf> {
        files.sort_by(|a, b| b.1.cmp(&a.1));

        let mut expired = Vec::new();
        if let Some(max_age) = self.max_age {
            let (fresh, stale): (Vec<_>, Vec<_>) = files.into_iter().partition(|(_, modified)| {
                now.duration_since(*modified).unwrap_or(Duration::ZERO) <= max_age
            });
            expired.extend(stale.into_iter().map(|(path, _)| path));
            files = fresh;
        }
        if let Some(max_files) = self.max_files {
            expired.extend(files.into_iter().skip(max_files).map(|(path, _)| path));
        }
        expired
    }
}
