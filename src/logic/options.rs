use anyhow::Result;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::logic::hooks::{AcceptAll, WriteHook};
use crate::model::LiveConflictPolicy;

/// Per-call knobs for the bulk engines.
#[derive(Clone, Default)]
pub struct BulkOptions {
    pub live_conflict: LiveConflictPolicy,
    /// Applied to each store round trip separately.
    pub deadline: Option<Duration>,
    pub hook: Option<Arc<dyn WriteHook>>,
}

impl BulkOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            live_conflict: config.live_conflict,
            deadline: config.deadline_ms.map(Duration::from_millis),
            hook: None,
        }
    }

    pub fn with_live_conflict(mut self, policy: LiveConflictPolicy) -> Self {
        self.live_conflict = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_hook(mut self, hook: impl WriteHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn hook(&self) -> &dyn WriteHook {
        match &self.hook {
            Some(hook) => hook.as_ref(),
            None => &AcceptAll,
        }
    }
}

impl fmt::Debug for BulkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkOptions")
            .field("live_conflict", &self.live_conflict)
            .field("deadline", &self.deadline)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// A store round trip outlived the configured deadline. Fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} did not complete within {after:?}")]
pub struct DeadlineExceeded {
    pub stage: &'static str,
    pub after: Duration,
}

pub async fn within<T, F>(deadline: Option<Duration>, stage: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        None => fut.await,
        Some(after) => match tokio::time::timeout(after, fut).await {
            Ok(result) => result,
            Err(_) => Err(DeadlineExceeded { stage, after }.into()),
        },
    }
}
