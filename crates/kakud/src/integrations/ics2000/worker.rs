use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use super::catalog::HubOperation;
use super::guard::Claim;
use super::hub::DeviceId;
use super::hub::Hub;
use super::retry::RetryPolicy;
use super::retry::repeat;

/// Spawn a task that sends `operation` to `device` according to `policy`.
///
/// The task owns `claim` and releases it when the retry loop ends, whether
/// every attempt went out or one of them failed. There is no cancellation.
pub fn spawn_worker(
    hub: Arc<dyn Hub>,
    device: DeviceId,
    operation: HubOperation,
    policy: RetryPolicy,
    claim: Claim,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let key = claim.key();
        debug!("Worker {} started: {}", key, operation);

        let name = operation.name();
        let result = repeat(policy, name, || operation.invoke(hub.as_ref(), device)).await;
        if let Err(e) = result {
            warn!("Worker {} gave up on {}: {}", key, operation, e);
        }

        drop(claim);
        debug!("Worker {} finished", key);
    })
}
