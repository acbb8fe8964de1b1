use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

pub(crate) const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub(crate) const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Bounded retry with a fixed back-off between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub(crate) async fn wait(&self, what: &str, attempt: usize) {
        warn!(
            "{} failed; retrying in {:.1}s (attempt {}/{})",
            what,
            self.backoff.as_secs_f32(),
            attempt,
            self.max_attempts
        );
        sleep(self.backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use std::time::Duration;

    #[test]
    fn at_least_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_millis(1));
        assert_eq!(policy.max_attempts, 1);
    }
}
