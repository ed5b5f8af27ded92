use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    #[error("request was superseded or aborted")]
    Cancelled,
    #[error("request timed out")]
    TimedOut,
}

/// Hands out request scopes where only the newest one may finish.
///
/// Starting a scope cancels the previous one. Dropping the controller
/// cancels whatever is still running.
#[derive(Debug)]
pub struct RequestController {
    generation: watch::Sender<u64>,
    timeout: Duration,
}

impl RequestController {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            generation,
            timeout,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cancel the current scope and open a new one.
    pub fn begin(&self) -> RequestScope {
        self.generation.send_modify(|g| *g += 1);
        RequestScope {
            generation: *self.generation.borrow(),
            changes: self.generation.subscribe(),
            timeout: self.timeout,
        }
    }

    /// Cancel the current scope without opening another.
    pub fn abort(&self) {
        self.generation.send_modify(|g| *g += 1);
    }
}

impl Default for RequestController {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[derive(Debug, Clone)]
pub struct RequestScope {
    generation: u64,
    changes: watch::Receiver<u64>,
    timeout: Duration,
}

impl RequestScope {
    /// `false` once a newer scope started, the controller aborted, or it was dropped.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.changes.has_changed().is_ok() && *self.changes.borrow() == self.generation
    }

    /// Drive `fut` until it finishes, the scope is cancelled, or the timeout hits.
    ///
    /// # Errors
    ///
    /// `RequestError::Cancelled` when superseded, `RequestError::TimedOut` after
    /// the controller's timeout.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, RequestError>
    where
        F: Future<Output = T>,
    {
        if !self.is_current() {
            return Err(RequestError::Cancelled);
        }

        let mut changes = self.changes.clone();
        let generation = self.generation;
        tokio::select! {
            biased;
            _ = changes.wait_for(|g| *g != generation) => Err(RequestError::Cancelled),
            res = tokio::time::timeout(self.timeout, fut) => res.map_err(|_| RequestError::TimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[tokio::test(start_paused = true)]
    async fn completes_within_timeout() {
        let controller = RequestController::default();
        let scope = controller.begin();
        let value = scope
            .run(async {
                tokio::time::sleep(Duration::from_secs(19)).await;
                7
            })
            .await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_twenty_seconds() {
        let controller = RequestController::default();
        let scope = controller.begin();
        let started = tokio::time::Instant::now();

        let res = scope.run(pending::<()>()).await;

        assert_eq!(res, Err(RequestError::TimedOut));
        assert!(started.elapsed() >= DEFAULT_REQUEST_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_scope_cancels_older() {
        let controller = RequestController::default();
        let first = controller.begin();

        let (res, second) = tokio::join!(first.run(pending::<()>()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.begin()
        });

        assert_eq!(res, Err(RequestError::Cancelled));
        assert!(!first.is_current());
        assert!(second.is_current());
        assert_eq!(second.run(async { "fresh" }).await, Ok("fresh"));
    }

    #[tokio::test]
    async fn stale_scope_refuses_to_start() {
        let controller = RequestController::default();
        let stale = controller.begin();
        let _fresh = controller.begin();
        assert_eq!(stale.run(async { 1 }).await, Err(RequestError::Cancelled));
    }

    #[tokio::test]
    async fn abort_and_drop_cancel() {
        let controller = RequestController::default();
        let scope = controller.begin();
        controller.abort();
        assert!(!scope.is_current());

        let controller = RequestController::default();
        let scope = controller.begin();
        drop(controller);
        assert!(!scope.is_current());
        assert_eq!(scope.run(async { 1 }).await, Err(RequestError::Cancelled));
    }
}
