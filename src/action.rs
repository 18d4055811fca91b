//! One-shot actions with observable progress.
//!
//! An [`ActionExecutor`] runs an async operation, tracks whether it is in
//! flight, and turns its error into a message instead of propagating it.
//! Subscribers see every state change.

use std::{fmt::Display, future::Future};

use tokio::sync::watch;

const INTERRUPTED: &str = "action was interrupted before it finished";

/// The observable state of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionState<T> {
    /// Whether the operation is running.
    pub is_executing: bool,
    /// The message of the last failure.
    pub error: Option<String>,
    /// The value of the last success.
    pub data: Option<T>,
}

impl<T> Default for ActionState<T> {
    fn default() -> Self {
        Self {
            is_executing: false,
            error: None,
            data: None,
        }
    }
}

/// How an action settled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    /// The operation returned a value.
    Success(T),
    /// The operation failed with this message.
    Failure(String),
}

impl<T> Outcome<T> {
    /// Whether the operation succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The value, on success.
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    /// The message, on failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(message) => Some(message),
        }
    }

    /// Run a follow-up step only if the operation succeeded.
    ///
    /// Used for local bookkeeping after a confirmed change, such as removing
    /// a deleted entity from a list that is already held.
    pub fn on_success(self, step: impl FnOnce(&T)) -> Self {
        if let Self::Success(data) = &self {
            step(data);
        }
        self
    }

    /// Convert into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the failure message if the operation failed.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(message) => Err(message),
        }
    }
}

/// Runs operations and publishes their progress.
#[derive(Debug)]
pub struct ActionExecutor<T> {
    state: watch::Sender<ActionState<T>>,
}

impl<T: Clone> Default for ActionExecutor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ActionExecutor<T> {
    /// An idle executor.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(ActionState::default());
        Self { state }
    }

    /// Observe state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ActionState<T>> {
        self.state.subscribe()
    }

    /// A copy of the current state.
    #[must_use]
    pub fn state(&self) -> ActionState<T> {
        self.state.borrow().clone()
    }

    /// Whether an operation is in flight.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.state.borrow().is_executing
    }

    /// Run `operation` and record how it settles.
    ///
    /// The in-flight flag is set before the operation starts and cleared on
    /// every exit path, including when the returned future is dropped early
    /// or the operation panics.
    pub async fn execute<F, Fut, E>(&self, operation: F) -> Outcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.state.send_replace(ActionState {
            is_executing: true,
            error: None,
            data: None,
        });
        let in_flight = InFlight {
            state: &self.state,
            settled: false,
        };

        match operation().await {
            Ok(data) => {
                in_flight.settle(ActionState {
                    is_executing: false,
                    error: None,
                    data: Some(data.clone()),
                });
                Outcome::Success(data)
            }
            Err(error) => {
                let message = error.to_string();
                tracing::debug!("action failed: {message}");
                in_flight.settle(ActionState {
                    is_executing: false,
                    error: Some(message.clone()),
                    data: None,
                });
                Outcome::Failure(message)
            }
        }
    }
}

/// Clears the in-flight flag if the operation never settles.
struct InFlight<'a, T> {
    state: &'a watch::Sender<ActionState<T>>,
    settled: bool,
}

impl<T> InFlight<'_, T> {
    fn settle(mut self, next: ActionState<T>) {
        self.settled = true;
        self.state.send_replace(next);
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            self.state.send_modify(|state| {
                state.is_executing = false;
                state.error = Some(INTERRUPTED.to_string());
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Disaster, remove_by_id};

    fn disaster(id: &str) -> Disaster {
        serde_json::from_value(serde_json::json!({ "id": id })).unwrap()
    }

    #[tokio::test]
    async fn success_records_data() {
        let executor = ActionExecutor::new();

        let outcome = executor.execute(|| async { Ok::<_, String>(7) }).await;

        assert_eq!(outcome, Outcome::Success(7));
        assert_eq!(
            executor.state(),
            ActionState {
                is_executing: false,
                error: None,
                data: Some(7),
            }
        );
    }

    #[tokio::test]
    async fn failure_is_captured_and_flag_cleared() {
        let executor = ActionExecutor::<u32>::new();

        let outcome = executor
            .execute(|| async { Err("Failed to delete disaster") })
            .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.error(), Some("Failed to delete disaster"));
        assert!(!executor.is_executing());
        assert_eq!(
            executor.state().error.as_deref(),
            Some("Failed to delete disaster")
        );
    }

    #[tokio::test]
    async fn flag_is_set_while_running() {
        let executor = ActionExecutor::new();
        let observer = executor.subscribe();

        let outcome = executor
            .execute(|| async move {
                let executing = observer.borrow().is_executing;
                Ok::<_, String>(executing)
            })
            .await;

        assert_eq!(outcome.data(), Some(&true));
        assert!(!executor.is_executing());
    }

    #[tokio::test]
    async fn new_run_clears_previous_error() {
        let executor = ActionExecutor::new();
        let _ = executor.execute(|| async { Err::<u8, _>("first") }).await;

        let _ = executor.execute(|| async { Ok::<_, String>(1) }).await;

        assert_eq!(executor.state().error, None);
    }

    #[tokio::test]
    async fn dropped_run_clears_flag() {
        let executor = ActionExecutor::<u32>::new();
        {
            let mut pending =
                Box::pin(executor.execute(std::future::pending::<Result<u32, String>>));
            assert!(futures::poll!(pending.as_mut()).is_pending());
            assert!(executor.is_executing());
        }

        assert!(!executor.is_executing());
        assert_eq!(executor.state().error.as_deref(), Some(INTERRUPTED));
    }

    #[tokio::test]
    async fn success_step_removes_deleted_entity() {
        let executor = ActionExecutor::new();
        let mut disasters = vec![disaster("1"), disaster("2")];

        let outcome = executor
            .execute(|| async { Ok::<_, String>("2".to_string()) })
            .await
            .on_success(|id| {
                remove_by_id(&mut disasters, id);
            });

        assert!(outcome.is_success());
        assert_eq!(disasters.len(), 1);
        assert_eq!(disasters[0].id, "1");
    }

    #[tokio::test]
    async fn failed_delete_keeps_entity() {
        let executor = ActionExecutor::<()>::new();
        let mut disasters = vec![disaster("1")];

        let _ = executor
            .execute(|| async { Err("Failed to delete disaster") })
            .await
            .on_success(|_| {
                remove_by_id(&mut disasters, "1");
            });

        assert_eq!(disasters.len(), 1);
    }
}
