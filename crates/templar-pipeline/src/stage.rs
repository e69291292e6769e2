//! Pipeline stages and the bounded fan-out executor
//!
//! Collection stages run one task per input element. A shared semaphore
//! bounds how many elements run at once, a cancellation token is checked
//! before each element starts, and every element's outcome is kept on its
//! own so one failure never aborts its siblings.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// The strictly sequential stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Discover item files per set
    Scan,
    /// Parse item files into items
    Parse,
    /// Index every item into the content graph
    BuildDatabase,
    /// Build the template model
    BuildTemplates,
    /// Plan output files per set
    PlanTypes,
    /// Generate, emit and write output
    Generate,
}

impl Stage {
    /// Every stage in run order
    pub const ALL: [Stage; 6] = [
        Stage::Scan,
        Stage::Parse,
        Stage::BuildDatabase,
        Stage::BuildTemplates,
        Stage::PlanTypes,
        Stage::Generate,
    ];

    /// Stable name of the stage
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Scan => "scan",
            Stage::Parse => "parse",
            Stage::BuildDatabase => "build_database",
            Stage::BuildTemplates => "build_templates",
            Stage::PlanTypes => "plan_types",
            Stage::Generate => "generate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one element of a collection stage
#[derive(Debug)]
pub enum Outcome<R> {
    /// The element completed
    Done(R),
    /// The element failed; siblings were unaffected
    Failed(PipelineError),
    /// The element never started because the run was cancelled
    Cancelled,
}

/// Runs collection stages with bounded concurrency and cooperative cancellation
#[derive(Debug, Clone)]
pub struct FanOut {
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    max_concurrency: usize,
}

impl FanOut {
    /// Create an executor allowing `max_concurrency` elements at once
    pub fn new(max_concurrency: usize, cancel: CancellationToken) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            cancel,
            max_concurrency,
        }
    }

    /// Configured concurrency limit
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Cancellation token checked before every element
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `work` once per `(label, input)` pair and wait for all of them
    ///
    /// Outcomes are returned in input order with their labels. `work` runs on
    /// the blocking pool since elements do filesystem I/O and parsing.
    pub async fn run<T, R, F>(&self, stage: Stage, inputs: Vec<(String, T)>, work: F) -> Vec<(String, Outcome<R>)>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Result<R> + Send + Sync + 'static,
    {
        debug!(
            stage = %stage,
            elements = inputs.len(),
            max_concurrency = self.max_concurrency,
            "Fanning out stage"
        );

        let work = Arc::new(work);
        let mut labels = Vec::with_capacity(inputs.len());
        let mut handles = Vec::with_capacity(inputs.len());

        for (label, input) in inputs {
            let semaphore = self.semaphore.clone();
            let cancel = self.cancel.clone();
            let work = work.clone();
            labels.push(label);

            handles.push(tokio::spawn(async move {
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => return Outcome::Cancelled,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return Outcome::Cancelled,
                    },
                };
                if cancel.is_cancelled() {
                    return Outcome::Cancelled;
                }

                match tokio::task::spawn_blocking(move || work(input)).await {
                    Ok(Ok(result)) => Outcome::Done(result),
                    Ok(Err(error)) => Outcome::Failed(error),
                    Err(join) => Outcome::Failed(PipelineError::stage_failed(
                        stage,
                        format!("element task aborted: {}", join),
                    )),
                }
            }));
        }

        let joined = join_all(handles).await;
        labels
            .into_iter()
            .zip(joined)
            .map(|(label, joined)| {
                let outcome = joined.unwrap_or_else(|e| {
                    warn!(stage = %stage, element = %label, error = %e, "Element task failed to join");
                    Outcome::Failed(PipelineError::stage_failed(stage, format!("element task aborted: {}", e)))
                });
                (label, outcome)
            })
            .collect()
    }

    /// Fail with [`PipelineError::Cancelled`] if the run was cancelled
    pub fn check_cancelled(&self, stage: Stage) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled(stage));
        }
        Ok(())
    }
}
