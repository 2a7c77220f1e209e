//! Reconnection policy for the real-time channel.
//!
//! The channel retries with a fixed delay and no backoff. A retry wait is a
//! plain sleep raced against the channel's cancellation token, so cancelling
//! the channel also cancels the pending retry.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_RECONNECT_DELAY;
use crate::error::{Error, Result};

/// When and how often to reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait between a closed connection and the next attempt.
    pub delay: Duration,
    /// Maximum number of connection attempts (None = unlimited).
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// Unlimited attempts with a fixed delay.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Cap the number of attempts.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }

    /// Validate the policy.
    pub fn validate(&self) -> Result<()> {
        if self.delay.is_zero() {
            return Err(Error::InvalidConfig("delay must be > 0".to_string()));
        }
        if self.max_attempts == Some(0) {
            return Err(Error::InvalidConfig(
                "max_attempts must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Sleep for the delay unless `cancel` fires first.
    ///
    /// Returns `false` if cancelled.
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_five_seconds_unlimited() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert!(policy.should_retry(u32::MAX - 1));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_max_attempts() {
        let policy = ReconnectPolicy::default().max_attempts(3);
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_validate() {
        assert!(ReconnectPolicy::fixed(Duration::ZERO).validate().is_err());
        assert!(ReconnectPolicy::default().max_attempts(0).validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_completes_after_delay() {
        let policy = ReconnectPolicy::fixed(Duration::from_secs(5));
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();
        assert!(policy.wait(&token).await);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_cancelled() {
        let policy = ReconnectPolicy::fixed(Duration::from_secs(5));
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { policy.wait(&token).await })
        };
        tokio::time::advance(Duration::from_secs(1)).await;
        token.cancel();
        assert!(!waiter.await.unwrap());
    }
}
