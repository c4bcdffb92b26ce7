//! Services combining validation, the lifecycle rules and injected stores.

mod crops;
mod farmers;

use std::future::Future;
use std::time::Duration;

pub use crops::{CropListing, CropService, GrowthReport};
pub use farmers::FarmerService;

use crate::error::CoreError;
use crate::lifecycle::TransitionPolicy;
use crate::taxonomy::Taxonomy;
use crate::types::CoreResult;

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Per-deployment knobs shared by the services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub store_timeout: Duration,
    pub transition_policy: TransitionPolicy,
    pub taxonomy: Taxonomy,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            transition_policy: TransitionPolicy::default(),
            taxonomy: Taxonomy::default(),
        }
    }
}

/// Run a store call under `timeout`, mapping expiry to [`CoreError::Timeout`].
pub(crate) async fn bounded<T, F>(timeout: Duration, operation: &'static str, fut: F) -> CoreResult<T>
where
    F: Future<Output = CoreResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            tracing::warn!(operation, timeout_ms, "Store call timed out");
            Err(CoreError::Timeout {
                operation,
                timeout_ms,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn bounded_passes_through_results() {
        let ok = bounded(Duration::from_millis(50), "noop", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: CoreResult<()> = bounded(Duration::from_millis(50), "noop", async {
            Err(CoreError::Infrastructure("down".into()))
        })
        .await;
        assert_matches!(err, Err(CoreError::Infrastructure(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out_slow_calls() {
        let result: CoreResult<()> = bounded(Duration::from_millis(20), "find_by_id", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_matches!(
            result,
            Err(CoreError::Timeout {
                operation: "find_by_id",
                timeout_ms: 20
            })
        );
    }
}
