use crate::error::{PlannerError, Result};
use async_trait::async_trait;
use std::{future::Future, time::Duration};

/// Text generation capability used for extraction, planning and synthesis.
///
/// Implementations may fail or return ill-formed text; every caller has a
/// degraded value to fall back on.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system_instruction: &str, user_content: &str) -> Result<String>;
}

/// Await a capability call, turning an elapsed deadline into [`PlannerError::Timeout`].
pub async fn bounded<T, F>(label: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, call).await.map_err(|_| {
        PlannerError::Timeout(format!("{} timed out after {}s", label, limit.as_secs_f64()))
    })?
}
