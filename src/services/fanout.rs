use std::fmt::Display;
use std::future::Future;
use tokio::task::{JoinError, JoinSet};

/// Runs independent per-object tasks concurrently and reports one result.
///
/// A failing task never cancels its siblings: `wait` drains every task and
/// then returns the first error it observed, or all outcomes on success.
pub struct FanOut<T, E> {
    tasks: JoinSet<Result<T, E>>,
}

impl<T, E> FanOut<T, E>
where
    T: Send + 'static,
    E: From<JoinError> + Display + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
        }
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn wait(mut self) -> Result<Vec<T>, E> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        let mut first_error: Option<E> = None;

        while let Some(joined) = self.tasks.join_next().await {
            match joined.map_err(E::from).and_then(|res| res) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => tracing::warn!("Additional reconciliation failure: {}", e),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(outcomes),
        }
    }
}

impl<T, E> Default for FanOut<T, E>
where
    T: Send + 'static,
    E: From<JoinError> + Display + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
