use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::hub::HubError;

/// How often a command is resent and how far apart.
///
/// The radio link has no acknowledgement, so sending the same command a few
/// times is the only mitigation for dropped frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub tries: u32,
    pub sleep: Duration,
}

impl RetryPolicy {
    pub fn new(tries: u32, sleep: Duration) -> Self {
        Self { tries, sleep }
    }

    /// One attempt only, used for Zigbee lamps and sunshades
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::from_secs(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(3))
    }
}

/// Invoke `action` exactly `policy.tries` times, sleeping `policy.sleep`
/// between attempts but not after the last one.
///
/// Results of successful attempts are not aggregated. The first error stops
/// the loop and is returned.
pub async fn repeat<F, Fut>(policy: RetryPolicy, operation: &str, mut action: F) -> Result<(), HubError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), HubError>>,
{
    for attempt in 1..=policy.tries {
        debug!(operation, attempt, tries = policy.tries, "Sending command");
        action().await?;

        if attempt < policy.tries {
            tokio::time::sleep(policy.sleep).await;
        }
    }
    Ok(())
}
