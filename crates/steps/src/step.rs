//! The step abstraction and its two composites.

use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::{context::BlobTestContext, error::StepError};

/// One unit of test behaviour.
///
/// Steps are stateless descriptions; everything they change lives in the
/// context they run against.
#[async_trait]
pub trait TestStep: Send + Sync {
    async fn execute(&self, ctx: &Arc<BlobTestContext>) -> Result<(), StepError>;

    fn description(&self) -> String;
}

/// Steps run one at a time, in order. The first failure aborts the rest.
#[derive(Clone, Default)]
pub struct TestSequence {
    steps: Vec<Arc<dyn TestStep>>,
}

impl TestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: impl TestStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run(&self, ctx: &Arc<BlobTestContext>) -> Result<(), StepError> {
        for (index, step) in self.steps.iter().enumerate() {
            let description = step.description();
            info!(index, %description, "Executing step");

            if let Err(source) = step.execute(ctx).await {
                warn!(index, %description, error = %source, "Step failed");
                return Err(StepError::Step { index, description, source: Box::new(source) });
            }
        }
        Ok(())
    }
}

impl FromIterator<Arc<dyn TestStep>> for TestSequence {
    fn from_iter<I: IntoIterator<Item = Arc<dyn TestStep>>>(iter: I) -> Self {
        Self { steps: iter.into_iter().collect() }
    }
}

/// Steps launched together as independent tasks.
///
/// Waits for every sibling even after one fails and returns the first error
/// in completion order. Later errors are logged and dropped, so the report is
/// not guaranteed to be complete. Siblings must target independent accounts
/// and clients.
#[derive(Clone, Default)]
pub struct ParallelSteps {
    pub steps: Vec<Arc<dyn TestStep>>,
}

impl ParallelSteps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: impl TestStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }
}

#[async_trait]
impl TestStep for ParallelSteps {
    async fn execute(&self, ctx: &Arc<BlobTestContext>) -> Result<(), StepError> {
        let mut tasks = JoinSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            let step = step.clone();
            let ctx = ctx.clone();
            tasks.spawn(async move { (index, step.execute(&ctx).await) });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let err = StepError::TaskFailed(e.to_string());
                    if first_error.is_none() {
                        first_error = Some(err);
                    } else {
                        warn!(error = %err, "Discarding additional parallel step failure");
                    }
                    continue;
                }
            };

            if let Err(err) = result {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    warn!(index, error = %err, "Discarding additional parallel step failure");
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn description(&self) -> String {
        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{i}: {}", s.description()))
            .join("\n");
        format!("ParallelSteps: running steps in parallel:\n{steps}")
    }
}
