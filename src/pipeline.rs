//! The synthesis pipeline: validate → resolve → build → execute → publish.
//!
//! Settings are gathered once at the boundary into plain data. Everything up to and
//! including `prepare` is pure; the repository is only opened once a plan exists.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::config::{Config, ConfigError};
use crate::core::{
    AnchorDate, CommitPlan, DateMapper, DateMapperOptions, IntensityScale, PlanBuilder,
    PlanSummary, ValidationError, WeekStart, parse_plan, parse_utc_offset,
};
use crate::git::{
    BackoffPolicy, ExecutionReport, Executor, ExecutorSettings, Git2Transport, Identity,
    PublishError, PublishReport, PublishSettings, Publisher, PushTransport,
};
use crate::paths;

/// Inputs to `prepare`. No repository or identity involved.
#[derive(Clone, Debug)]
pub struct PlanSettings {
    /// Raw anchor as typed; parsed during validation.
    pub anchor: String,
    pub week_start: WeekStart,
    pub utc_offset: String,
    pub allow_future_dates: bool,
    pub max_weeks: Option<u32>,
    /// Reference day for the future-date check; `None` means today in `utc_offset`.
    pub today: Option<Date>,
    pub scale: IntensityScale,
}

impl PlanSettings {
    pub fn from_config(config: &Config, anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            week_start: config.calendar.week_start,
            utc_offset: config.calendar.utc_offset.clone(),
            allow_future_dates: config.calendar.allow_future_dates,
            max_weeks: (config.calendar.max_weeks > 0).then_some(config.calendar.max_weeks),
            today: None,
            scale: config.commits.scale,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunSettings {
    pub plan: PlanSettings,
    pub executor: ExecutorSettings,
    pub publish: PublishSettings,
    /// Push after executing.
    pub push: bool,
}

impl RunSettings {
    pub fn from_config(config: &Config, anchor: impl Into<String>) -> Self {
        let repository = &config.repository;
        let repo_path = repository.path.clone().unwrap_or_else(|| {
            paths::workspace_dir(&paths::workspace_slug(repository.remote_url.as_deref()))
        });
        let identity = config.identity.email.as_ref().map(|email| Identity {
            name: config
                .identity
                .name
                .clone()
                .unwrap_or_else(|| default_name(email)),
            email: email.clone(),
        });

        Self {
            plan: PlanSettings::from_config(config, anchor),
            executor: ExecutorSettings {
                repo_path,
                branch: repository.branch.clone(),
                identity,
                content_file: repository.content_file.clone(),
                message_prefix: repository.message_prefix.clone(),
            },
            publish: PublishSettings {
                remote_name: repository.remote_name.clone(),
                remote_url: repository.remote_url.clone(),
                branch: repository.branch.clone(),
                max_attempts: config.publish.max_attempts,
                backoff: BackoffPolicy {
                    base: Duration::from_millis(config.publish.backoff_base_ms),
                    max: Duration::from_millis(config.publish.backoff_max_ms),
                },
                attempt_timeout: Duration::from_millis(config.publish.timeout_ms),
            },
            push: config.publish.enabled,
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.executor.repo_path
    }
}

/// Name used when only an email is configured: its local part.
fn default_name(email: &str) -> String {
    email
        .split_once('@')
        .map(|(local, _)| local)
        .filter(|local| !local.is_empty())
        .unwrap_or(email)
        .to_string()
}

pub fn read_plan(path: &Path) -> Result<String, ValidationError> {
    std::fs::read_to_string(path).map_err(|source| ValidationError::ReadPlan {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse, validate, resolve and expand a plan. No side effects.
pub fn prepare(settings: &PlanSettings, plan_text: &str) -> crate::Result<CommitPlan> {
    let span = tracing::info_span!("prepare", anchor = %settings.anchor);
    let _guard = span.enter();

    let records = parse_plan(plan_text).map_err(ValidationError::from)?;
    let anchor = AnchorDate::parse(&settings.anchor, settings.week_start)?;
    let offset = parse_utc_offset(&settings.utc_offset)?;
    let today = settings
        .today
        .unwrap_or_else(|| OffsetDateTime::now_utc().to_offset(offset).date());

    let mapper = DateMapper::new(
        anchor,
        DateMapperOptions {
            allow_future_dates: settings.allow_future_dates,
            max_weeks: settings.max_weeks,
            today,
        },
    );
    let dated = mapper.resolve(&records)?;
    let plan = PlanBuilder::new(settings.scale, offset).build(&dated)?;
    if plan.is_empty() {
        return Err(ValidationError::NothingToCommit.into());
    }

    tracing::info!(
        records = records.len(),
        dates = dated.len(),
        commits = plan.len(),
        "plan prepared"
    );
    Ok(plan)
}

#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub summary: PlanSummary,
    pub execution: ExecutionReport,
    /// `None` when pushing was disabled.
    pub publish: Option<PublishReport>,
}

/// Repository progress against a plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub repo_path: PathBuf,
    pub repo_exists: bool,
    pub planned: usize,
    pub applied: usize,
    pub complete: bool,
    pub head: Option<String>,
    pub last_applied_date: Option<String>,
    pub next_date: Option<String>,
}

pub struct Synthesizer<T = Git2Transport> {
    settings: RunSettings,
    transport: T,
}

impl Synthesizer<Git2Transport> {
    pub fn new(settings: RunSettings) -> Self {
        Self::with_transport(settings, Git2Transport)
    }
}

impl<T: PushTransport> Synthesizer<T> {
    pub fn with_transport(settings: RunSettings, transport: T) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn prepare(&self, plan_text: &str) -> crate::Result<CommitPlan> {
        prepare(&self.settings.plan, plan_text)
    }

    /// Apply the plan to the working repository, creating it if needed.
    pub fn execute(&self, plan: &CommitPlan, cancel: &AtomicBool) -> crate::Result<ExecutionReport> {
        if self.settings.executor.identity.is_none() {
            return Err(ConfigError::Missing {
                field: "identity.email",
                hint: "pass --email, set CADENCE_EMAIL or identity.email",
            }
            .into());
        }

        let executor = Executor::open_or_init(self.settings.executor.clone())?;
        executor.apply(plan, cancel)
    }

    /// Push the branch; the local history must already hold the whole plan.
    /// A raised `cancel` stops before the next push attempt.
    pub fn publish(
        &mut self,
        plan: &CommitPlan,
        cancel: &AtomicBool,
    ) -> crate::Result<PublishReport> {
        let Some(executor) = Executor::open_existing(self.settings.executor.clone())? else {
            return Err(PublishError::Incomplete {
                applied: 0,
                planned: plan.len(),
            }
            .into());
        };
        let cursor = executor.cursor(plan)?;
        if !cursor.is_complete(plan) {
            return Err(PublishError::Incomplete {
                applied: cursor.position,
                planned: plan.len(),
            }
            .into());
        }

        let mut publisher = Publisher::new(&mut self.transport, self.settings.publish.clone());
        Ok(publisher.publish(executor.repo(), cancel)?)
    }

    /// Every stage in order. Nothing touches disk until the plan validated.
    pub fn run(&mut self, plan_text: &str, cancel: &AtomicBool) -> crate::Result<RunOutcome> {
        let plan = self.prepare(plan_text)?;
        let execution = self.execute(&plan, cancel)?;
        let publish = if self.settings.push {
            if cancel.load(Ordering::SeqCst) {
                tracing::warn!("interrupted after executing; not pushing");
                return Err(PublishError::Interrupted {
                    remote: self.settings.publish.remote_name.clone(),
                    attempts: 0,
                }
                .into());
            }
            Some(self.publish(&plan, cancel)?)
        } else {
            tracing::info!("push disabled; local history only");
            None
        };
        Ok(RunOutcome {
            summary: plan.summary(),
            execution,
            publish,
        })
    }

    /// Compare repository history with the plan without changing anything.
    pub fn status(&self, plan: &CommitPlan) -> crate::Result<StatusReport> {
        let repo_path = self.settings.executor.repo_path.clone();
        let Some(executor) = Executor::open_existing(self.settings.executor.clone())? else {
            return Ok(StatusReport {
                repo_path,
                repo_exists: false,
                planned: plan.len(),
                applied: 0,
                complete: plan.is_empty(),
                head: None,
                last_applied_date: None,
                next_date: plan.get(0).map(|d| d.date.to_string()),
            });
        };
        let cursor = executor.cursor(plan)?;
        Ok(StatusReport {
            repo_path,
            repo_exists: true,
            planned: plan.len(),
            applied: cursor.position,
            complete: cursor.is_complete(plan),
            head: cursor.head.map(|oid| oid.to_string()),
            last_applied_date: cursor.last_applied.map(|d| d.to_string()),
            next_date: plan.get(cursor.position).map(|d| d.date.to_string()),
        })
    }
}
