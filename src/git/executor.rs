//! Commit executor.
//!
//! Applies a commit plan to a local repository one directive at a time: append the
//! directive's token to the content file, stage it, and commit with author and committer
//! both forced to the directive's timestamp. The parent chain records creation order;
//! the forged time only lives inside each commit's signatures.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use git2::{ErrorCode, Oid, Repository, RepositoryInitOptions, Signature, Time};
use time::{Date, OffsetDateTime};

use super::cursor::{ExecutionCursor, derive_cursor};
use super::error::{ConsistencyError, ExecutionError};
use crate::core::{CommitDirective, CommitPlan};

/// Who the synthesized commits are attributed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct ExecutorSettings {
    pub repo_path: PathBuf,
    pub branch: String,
    /// Commit author; `None` falls back to the repository's git config.
    pub identity: Option<Identity>,
    /// Tracked file that receives one line per commit, relative to the workdir.
    pub content_file: String,
    pub message_prefix: String,
}

/// A commit created by this run.
///
/// `position` is structural (parent-chain order), `declared_at` is the forged
/// historical instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedCommit {
    pub position: usize,
    pub oid: Oid,
    pub date: Date,
    pub declared_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct ExecutionReport {
    pub total: usize,
    /// Directives already present in the repository before this run.
    pub skipped: usize,
    pub applied: Vec<AppliedCommit>,
    pub head: Option<Oid>,
}

impl ExecutionReport {
    pub fn is_complete(&self) -> bool {
        self.skipped + self.applied.len() == self.total
    }

    pub fn last_applied_date(&self) -> Option<Date> {
        self.applied.last().map(|commit| commit.date)
    }
}

pub struct Executor {
    repo: Repository,
    workdir: PathBuf,
    settings: ExecutorSettings,
}

impl Executor {
    /// Open the repository at the configured path, initializing it if the path is
    /// missing or an empty directory.
    pub fn open_or_init(settings: ExecutorSettings) -> Result<Self, ExecutionError> {
        let path = settings.repo_path.clone();
        let repo = match Repository::open(&path) {
            Ok(repo) => repo,
            Err(err) if err.code() == ErrorCode::NotFound => {
                if !is_missing_or_empty(&path) {
                    return Err(ExecutionError::NotARepository(path));
                }
                let mut opts = RepositoryInitOptions::new();
                opts.initial_head(&settings.branch);
                let repo = Repository::init_opts(&path, &opts)
                    .map_err(|e| ExecutionError::InitRepo(path.clone(), e))?;
                tracing::info!(path = %path.display(), branch = %settings.branch, "initialized repository");
                repo
            }
            Err(err) => return Err(ExecutionError::OpenRepo(path, err)),
        };
        Self::from_repo(repo, settings, true)
    }

    /// Open an existing repository without changing it; `None` if nothing has been
    /// created yet.
    pub fn open_existing(settings: ExecutorSettings) -> Result<Option<Self>, ExecutionError> {
        let path = settings.repo_path.clone();
        match Repository::open(&path) {
            Ok(repo) => Self::from_repo(repo, settings, false).map(Some),
            Err(err) if err.code() == ErrorCode::NotFound && is_missing_or_empty(&path) => {
                Ok(None)
            }
            Err(err) if err.code() == ErrorCode::NotFound => {
                Err(ExecutionError::NotARepository(path))
            }
            Err(err) => Err(ExecutionError::OpenRepo(path, err)),
        }
    }

    fn from_repo(
        repo: Repository,
        settings: ExecutorSettings,
        writable: bool,
    ) -> Result<Self, ExecutionError> {
        let path = settings.repo_path.clone();
        let workdir = repo
            .workdir()
            .ok_or_else(|| ExecutionError::NotARepository(path.clone()))?
            .to_path_buf();

        if writable && let Some(identity) = &settings.identity {
            configure_identity(&repo, identity)
                .map_err(|e| ExecutionError::OpenRepo(path.clone(), e))?;
        }
        ensure_branch(&repo, &settings.branch, &path, writable)?;

        Ok(Self {
            repo,
            workdir,
            settings,
        })
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    pub fn cursor(&self, plan: &CommitPlan) -> Result<ExecutionCursor, ConsistencyError> {
        derive_cursor(&self.repo, plan)
    }

    /// Apply every directive not yet in the repository, in plan order.
    ///
    /// `cancel` is checked between directives only; a commit in flight always finishes.
    pub fn apply(&self, plan: &CommitPlan, cancel: &AtomicBool) -> crate::Result<ExecutionReport> {
        let cursor = self.cursor(plan)?;
        let span = tracing::info_span!("execute", total = plan.len(), resume_at = cursor.position);
        let _guard = span.enter();

        if cursor.position > 0 {
            tracing::info!(
                skipped = cursor.position,
                last_applied = ?cursor.last_applied,
                "resuming from repository history"
            );
        }

        let mut content = self.head_content(cursor.head)?;
        let mut head = cursor.head;
        let mut last_applied = cursor.last_applied;
        let mut applied = Vec::with_capacity(plan.len() - cursor.position);

        for directive in &plan.directives()[cursor.position..] {
            if cancel.load(Ordering::SeqCst) {
                tracing::warn!(resume_at = directive.position, "interrupted");
                return Err(ExecutionError::Interrupted {
                    resume_at: directive.position,
                    last_applied,
                }
                .into());
            }

            let oid = self.commit_directive(directive, head, &mut content, last_applied)?;
            tracing::debug!(
                position = directive.position,
                date = %directive.date,
                ordinal = directive.ordinal,
                %oid,
                "committed"
            );
            applied.push(AppliedCommit {
                position: directive.position,
                oid,
                date: directive.date,
                declared_at: directive.timestamp,
            });
            head = Some(oid);
            last_applied = Some(directive.date);
        }

        tracing::info!(applied = applied.len(), skipped = cursor.position, "plan applied");
        Ok(ExecutionReport {
            total: plan.len(),
            skipped: cursor.position,
            applied,
            head,
        })
    }

    fn commit_directive(
        &self,
        directive: &CommitDirective,
        parent: Option<Oid>,
        content: &mut String,
        last_applied: Option<Date>,
    ) -> Result<Oid, ExecutionError> {
        content.push_str(&directive.content_line());
        content.push('\n');

        let path = self.workdir.join(&self.settings.content_file);
        let write = || -> std::io::Result<()> {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(&path, content.as_bytes())
        };
        write().map_err(|source| ExecutionError::Workdir {
            position: directive.position,
            date: directive.date,
            last_applied,
            source,
        })?;

        self.write_commit(directive, parent)
            .map_err(|source| ExecutionError::Commit {
                position: directive.position,
                date: directive.date,
                last_applied,
                source,
            })
    }

    fn write_commit(
        &self,
        directive: &CommitDirective,
        parent: Option<Oid>,
    ) -> Result<Oid, git2::Error> {
        let mut index = self.repo.index()?;
        index.add_path(Path::new(&self.settings.content_file))?;
        index.write()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        // Author and committer must carry the same forged instant.
        let when = Time::new(directive.unix_seconds(), directive.offset_minutes());
        let sig = match &self.settings.identity {
            Some(identity) => Signature::new(&identity.name, &identity.email, &when)?,
            None => {
                let configured = self.repo.signature()?;
                Signature::new(
                    configured.name().unwrap_or_default(),
                    configured.email().unwrap_or_default(),
                    &when,
                )?
            }
        };
        let message = directive.message(&self.settings.message_prefix);

        let parents = match parent {
            Some(oid) => vec![self.repo.find_commit(oid)?],
            None => Vec::new(),
        };
        let parent_refs: Vec<_> = parents.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, &message, &tree, &parent_refs)
    }

    fn head_content(&self, head: Option<Oid>) -> Result<String, ExecutionError> {
        let Some(oid) = head else {
            return Ok(String::new());
        };
        let file = Path::new(&self.settings.content_file);
        let read = || -> Result<Option<Vec<u8>>, git2::Error> {
            let tree = self.repo.find_commit(oid)?.tree()?;
            let entry = match tree.get_path(file) {
                Ok(entry) => entry,
                Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
                Err(err) => return Err(err),
            };
            let blob = self.repo.find_blob(entry.id())?;
            Ok(Some(blob.content().to_vec()))
        };
        let bytes = read().map_err(|source| ExecutionError::ReadContent {
            path: self.settings.content_file.clone(),
            source,
        })?;
        Ok(bytes
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default())
    }
}

fn is_missing_or_empty(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(err) => err.kind() == std::io::ErrorKind::NotFound,
    }
}

fn configure_identity(repo: &Repository, identity: &Identity) -> Result<(), git2::Error> {
    let mut cfg = repo.config()?;
    cfg.set_str("user.name", &identity.name)?;
    cfg.set_str("user.email", &identity.email)?;
    Ok(())
}

/// HEAD must point at the configured branch. An unborn HEAD is moved there when
/// `writable`, and left alone otherwise.
fn ensure_branch(
    repo: &Repository,
    branch: &str,
    path: &Path,
    writable: bool,
) -> Result<(), ExecutionError> {
    let expected = format!("refs/heads/{branch}");
    let head_ref = repo
        .find_reference("HEAD")
        .map_err(|e| ExecutionError::OpenRepo(path.to_path_buf(), e))?;
    let current = head_ref.symbolic_target().map(str::to_string);
    if current.as_deref() == Some(expected.as_str()) {
        return Ok(());
    }

    let unborn = matches!(repo.head(), Err(ref err) if err.code() == ErrorCode::UnbornBranch);
    if unborn && !writable {
        return Ok(());
    }
    if unborn {
        repo.set_head(&expected)
            .map_err(|e| ExecutionError::OpenRepo(path.to_path_buf(), e))?;
        return Ok(());
    }
    Err(ExecutionError::BranchMismatch {
        expected,
        found: current.unwrap_or_else(|| "detached HEAD".to_string()),
    })
}
