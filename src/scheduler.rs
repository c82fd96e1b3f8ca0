//! Attempt scheduler: the main loop.
//!
//! For each username, in order: pick a target, sleep the configured interval,
//! pick the service at the current rotation index, submit exactly one attempt
//! and print its result. Lockouts (outside enumeration) and unreachable
//! servers go to the [`Operator`]; an abort ends the run before the attempt is
//! recorded. A locked account the operator continues past is abandoned: it is
//! counted in the summary, but not written to the result file and the
//! rotation index stays put. Every other completed attempt is appended to the
//! result file and advances the rotation index.
//!
//! Attempts are strictly sequential. The sleep is pacing against lockout
//! policy, not backoff, and has no jitter.
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;

use crate::auth::{Attempt, AuthError, Dispatch, ServiceKind};
use crate::config::RunConfig;
use crate::export::{ResultSink, SinkError};
use crate::outcome::Outcome;
use crate::prompt::{Decision, Operator};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("run stopped by operator after {outcome:?} for {username} on {target}")]
    Declined {
        username: String,
        target: String,
        outcome: Outcome,
    },
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("failed to write result to terminal: {0}")]
    Terminal(#[source] io::Error),
}

/// Mutable per-run state, owned by the scheduler.
#[derive(Debug)]
pub struct RunState {
    pub rotation: usize,
    pub services: Vec<ServiceKind>,
    pub enumerate: bool,
    pub sleep: Duration,
    pub sink: Option<ResultSink>,
}

impl RunState {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            rotation: 0,
            services: config.services.clone(),
            enumerate: config.enumerate,
            sleep: config.sleep,
            sink: config.output.as_ref().map(ResultSink::new),
        }
    }

    pub fn current_service(&self) -> ServiceKind {
        self.services[self.rotation % self.services.len()]
    }

    pub fn advance(&mut self) {
        self.rotation = (self.rotation + 1) % self.services.len();
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub attempts: usize,
    pub by_outcome: BTreeMap<Outcome, usize>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: Outcome) {
        self.attempts += 1;
        *self.by_outcome.entry(outcome).or_insert(0) += 1;
    }
}

pub struct Scheduler {
    config: RunConfig,
    state: RunState,
    dispatch: Dispatch,
    operator: Box<dyn Operator>,
}

impl Scheduler {
    pub fn new(config: RunConfig, dispatch: Dispatch, operator: Box<dyn Operator>) -> Self {
        let state = RunState::from_config(&config);
        Self {
            config,
            state,
            dispatch,
            operator,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run every username once. Result lines go to `out`.
    pub fn run<R, W>(&mut self, rng: &mut R, out: &mut W) -> Result<RunSummary, RunError>
    where
        R: Rng + ?Sized,
        W: Write,
    {
        let mut summary = RunSummary::default();
        for username in &self.config.usernames {
            let target = self.config.targets.pick(rng);
            if !self.state.sleep.is_zero() {
                thread::sleep(self.state.sleep);
            }
            let service = self.state.current_service();
            let credential = self.config.credential.for_user(username);
            let attempt = Attempt {
                target,
                credential: &credential,
                service,
            };
            debug!("attempt {} {} via {}", summary.attempts + 1, username, service);

            let result = self.dispatch.login(&attempt)?;
            writeln!(out, "{}", result.display).map_err(RunError::Terminal)?;

            let lockout = result.outcome == Outcome::AccountLocked && !self.state.enumerate;
            let decision = match result.outcome {
                _ if lockout => self.operator.on_lockout(&result),
                Outcome::NetworkError => self.operator.on_unreachable(&result),
                _ => Decision::Continue,
            };
            if decision == Decision::Abort {
                warn!("shutting down");
                return Err(RunError::Declined {
                    username: username.clone(),
                    target: target.to_string(),
                    outcome: result.outcome,
                });
            }
            if lockout {
                // Abandoned: not written out, and the next user keeps this service.
                debug!("skipping locked account {username}");
                summary.record(result.outcome);
                continue;
            }

            if let Some(sink) = &self.state.sink {
                sink.append(&result.plain)?;
            }
            summary.record(result.outcome);
            self.state.advance();
        }
        info!("completed {} attempts", summary.attempts);
        Ok(summary)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
