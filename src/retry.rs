use std::future::Future;
use std::time::Duration;

/// Bounded retry with a fixed backoff schedule. The last schedule entry is
/// reused if there are more attempts than entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![
                Duration::from_millis(800),
                Duration::from_millis(1500),
                Duration::from_millis(2500),
            ],
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Vec::new(),
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        let idx = attempt.saturating_sub(1) as usize;
        self.backoff
            .get(idx)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or_default()
    }

    /// Runs `op` until it succeeds, fails with an error `is_retriable` rejects,
    /// or the attempt budget is spent. Returns the last error in the latter
    /// two cases.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut op: F,
        is_retriable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && is_retriable(&err) => {
                    let delay = self.delay_after(attempt);
                    tracing::debug!(attempt, max_attempts, ?delay, %err, "retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
