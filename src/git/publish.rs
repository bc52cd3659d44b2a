//! Publish the local branch to its remote.
//!
//! Pushing is the one stage that talks to the network, so it is the one stage that
//! retries: transient network failures back off exponentially, everything else fails
//! on the first attempt. Local commits are never rewritten or discarded here.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use git2::{ErrorClass, ErrorCode, Repository};

use super::error::{PublishError, PushFailure};

/// Credential attempts per push before giving up; libgit2 re-asks on every rejection.
const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// Longest uninterrupted sleep while backing off.
const CANCEL_POLL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug)]
struct Backoff {
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(policy: BackoffPolicy) -> Self {
        Self {
            max: policy.max,
            current: policy.base,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.current.checked_mul(2).unwrap_or(self.max);
        self.current = std::cmp::min(next, self.max);
        delay
    }
}

/// Moves a branch to a remote. One call is one attempt; a raised `cancel` should
/// end it early.
pub trait PushTransport {
    fn push(
        &mut self,
        repo: &Repository,
        remote: &str,
        refspec: &str,
        timeout: Duration,
        cancel: &AtomicBool,
    ) -> Result<(), PushFailure>;
}

impl<T: PushTransport + ?Sized> PushTransport for &mut T {
    fn push(
        &mut self,
        repo: &Repository,
        remote: &str,
        refspec: &str,
        timeout: Duration,
        cancel: &AtomicBool,
    ) -> Result<(), PushFailure> {
        (**self).push(repo, remote, refspec, timeout, cancel)
    }
}

/// Push through libgit2 using ssh-agent or the configured credential helper.
#[derive(Clone, Copy, Debug, Default)]
pub struct Git2Transport;

impl PushTransport for Git2Transport {
    fn push(
        &mut self,
        repo: &Repository,
        remote: &str,
        refspec: &str,
        timeout: Duration,
        cancel: &AtomicBool,
    ) -> Result<(), PushFailure> {
        let mut remote = repo.find_remote(remote).map_err(PushFailure::Git)?;

        let deadline = Instant::now() + timeout;
        let timed_out = Cell::new(false);
        let credential_attempts = Cell::new(0u32);
        let rejected: Cell<Option<String>> = Cell::new(None);
        let expired = || {
            if Instant::now() >= deadline {
                timed_out.set(true);
            }
            timed_out.get() || cancel.load(Ordering::SeqCst)
        };

        {
            let cfg = repo.config().ok();
            let mut callbacks = git2::RemoteCallbacks::new();
            callbacks.credentials(|url, username_from_url, allowed| {
                let attempts = credential_attempts.get() + 1;
                credential_attempts.set(attempts);
                if attempts > MAX_CREDENTIAL_ATTEMPTS {
                    return Err(git2::Error::new(
                        ErrorCode::Auth,
                        ErrorClass::Callback,
                        "credentials rejected by remote",
                    ));
                }
                if expired() {
                    return Err(git2::Error::new(
                        ErrorCode::User,
                        ErrorClass::Callback,
                        "push deadline exceeded",
                    ));
                }
                if allowed.is_ssh_key()
                    && let Some(user) = username_from_url
                {
                    return git2::Cred::ssh_key_from_agent(user);
                }
                if allowed.is_user_pass_plaintext()
                    && let Some(ref cfg) = cfg
                    && let Ok(cred) = git2::Cred::credential_helper(cfg, url, username_from_url)
                {
                    return Ok(cred);
                }
                git2::Cred::default()
            });
            callbacks.sideband_progress(|_| !expired());
            callbacks.push_negotiation(|_| {
                if expired() {
                    return Err(git2::Error::new(
                        ErrorCode::User,
                        ErrorClass::Callback,
                        "push deadline exceeded",
                    ));
                }
                Ok(())
            });
            callbacks.push_update_reference(|_ref_name, status| {
                if let Some(msg) = status {
                    rejected.set(Some(msg.to_string()));
                }
                Ok(())
            });

            let mut push_options = git2::PushOptions::new();
            push_options.remote_callbacks(callbacks);

            if let Err(err) = remote.push(&[refspec], Some(&mut push_options)) {
                if timed_out.get() {
                    return Err(PushFailure::Timeout(timeout));
                }
                return Err(PushFailure::from_git(err));
            }
        }

        if let Some(message) = rejected.take() {
            if message.contains("non-fast-forward") || message.contains("fetch first") {
                return Err(PushFailure::NonFastForward);
            }
            return Err(PushFailure::Rejected { message });
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PublishSettings {
    pub remote_name: String,
    /// Remote URL to configure; `None` uses whatever the repository already has.
    pub remote_url: Option<String>,
    pub branch: String,
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    pub attempt_timeout: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishReport {
    pub remote: String,
    pub attempts: u32,
    /// Delay slept before each retry, in order.
    pub delays: Vec<Duration>,
}

/// Add the remote, or repoint it when a different URL is configured.
pub fn ensure_remote(
    repo: &Repository,
    name: &str,
    url: Option<&str>,
) -> Result<(), PublishError> {
    let remote_err = |source| PublishError::Remote {
        name: name.to_string(),
        source,
    };
    match (repo.find_remote(name), url) {
        (Ok(remote), Some(url)) if remote.url() != Some(url) => {
            tracing::info!(remote = name, url, "updating remote url");
            repo.remote_set_url(name, url).map_err(remote_err)
        }
        (Ok(_), _) => Ok(()),
        (Err(err), Some(url)) if err.code() == ErrorCode::NotFound => {
            tracing::info!(remote = name, url, "adding remote");
            repo.remote(name, url).map(|_| ()).map_err(remote_err)
        }
        (Err(err), None) if err.code() == ErrorCode::NotFound => {
            Err(PublishError::NoRemote(name.to_string()))
        }
        (Err(err), _) => Err(remote_err(err)),
    }
}

pub struct Publisher<T> {
    transport: T,
    settings: PublishSettings,
    sleep: fn(Duration),
}

impl<T: PushTransport> Publisher<T> {
    pub fn new(transport: T, settings: PublishSettings) -> Self {
        Self {
            transport,
            settings,
            sleep: std::thread::sleep,
        }
    }

    #[cfg(test)]
    fn without_sleep(mut self) -> Self {
        self.sleep = |_| {};
        self
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Push the configured branch, retrying transient failures.
    ///
    /// `cancel` is checked before every attempt and while backing off.
    pub fn publish(
        &mut self,
        repo: &Repository,
        cancel: &AtomicBool,
    ) -> Result<PublishReport, PublishError> {
        let remote = self.settings.remote_name.clone();
        ensure_remote(repo, &remote, self.settings.remote_url.as_deref())?;

        let branch = &self.settings.branch;
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let max_attempts = self.settings.max_attempts.max(1);
        let mut backoff = Backoff::new(self.settings.backoff);
        let mut delays = Vec::new();

        let span = tracing::info_span!("publish", remote = %remote, branch = %branch);
        let _guard = span.enter();

        let mut attempt = 0;
        loop {
            if cancel.load(Ordering::SeqCst) {
                tracing::warn!(attempts = attempt, "push interrupted");
                return Err(PublishError::Interrupted {
                    remote,
                    attempts: attempt,
                });
            }

            attempt += 1;
            let failure = match self.transport.push(
                repo,
                &remote,
                &refspec,
                self.settings.attempt_timeout,
                cancel,
            ) {
                Ok(()) => {
                    tracing::info!(attempt, "pushed");
                    return Ok(PublishReport {
                        remote,
                        attempts: attempt,
                        delays,
                    });
                }
                Err(_) if cancel.load(Ordering::SeqCst) => continue,
                Err(failure) => failure,
            };

            if !failure.transience().is_retryable() {
                tracing::error!(attempt, error = %failure, "push failed permanently");
                return Err(PublishError::Permanent {
                    remote,
                    source: failure,
                });
            }
            if attempt == max_attempts {
                return Err(PublishError::Exhausted {
                    remote,
                    attempts: attempt,
                    source: failure,
                });
            }

            let delay = backoff.next_delay();
            tracing::warn!(attempt, ?delay, error = %failure, "push failed; retrying");
            self.pause(delay, cancel);
            delays.push(delay);
        }
    }

    /// Sleep for `delay`, waking early once `cancel` is raised.
    fn pause(&self, delay: Duration, cancel: &AtomicBool) {
        let mut left = delay;
        while !left.is_zero() && !cancel.load(Ordering::SeqCst) {
            let step = left.min(CANCEL_POLL);
            (self.sleep)(step);
            left -= step;
        }
    }
}
