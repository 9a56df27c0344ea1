//! The World — per-run context threaded through evaluation.
//!
//! Conversation and registry are shared handles; the tool-call counter
//! drives periodic context pruning; the cancellation token is checked at
//! every evaluator entry and between I/O operations.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use tokio_util::sync::CancellationToken;

use crate::conversation::Conversation;
use crate::tool::ToolRegistry;

/// Tool calls between automatic context prunes.
pub const DEFAULT_PRUNE_THRESHOLD: u32 = 50;

/// Per-run context: conversation handle, tool registry, batch counter,
/// cancellation token.
pub struct World {
    pub conversation: Arc<Conversation>,
    pub registry: Arc<RwLock<ToolRegistry>>,
    tool_calls: AtomicU32,
    pub cancel: CancellationToken,
    prune_threshold: u32,
}

impl World {
    pub fn new(conversation: Arc<Conversation>, registry: Arc<RwLock<ToolRegistry>>) -> Self {
        Self {
            conversation,
            registry,
            tool_calls: AtomicU32::new(0),
            cancel: CancellationToken::new(),
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
        }
    }

    /// Use a specific cancellation token (the UI holds the other end).
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Override the context-prune threshold (0 disables pruning).
    pub fn with_prune_threshold(mut self, threshold: u32) -> Self {
        self.prune_threshold = threshold;
        self
    }

    /// A consistent snapshot of the registry for one batch.
    pub fn registry_snapshot(&self) -> ToolRegistry {
        self.registry.read().unwrap().clone()
    }

    /// Count a finished batch. Returns true when the prune threshold was
    /// reached; the counter resets in that case.
    pub fn count_tool_calls(&self, batch_size: u32) -> bool {
        if self.prune_threshold == 0 {
            return false;
        }
        let total = self.tool_calls.fetch_add(batch_size, Ordering::SeqCst) + batch_size;
        if total >= self.prune_threshold {
            self.tool_calls.store(0, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Current counter value (observability only).
    pub fn tool_calls(&self) -> u32 {
        self.tool_calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::{ChatRequest, Provider};
    use async_trait::async_trait;

    struct NullProvider;

    #[async_trait]
    impl Provider for NullProvider {
        fn name(&self) -> &str {
            "null"
        }
        async fn complete(&self, _request: ChatRequest) -> Result<String, ProviderError> {
            Ok(String::new())
        }
    }

    fn world() -> World {
        let conversation = Arc::new(Conversation::new(Arc::new(NullProvider), "m"));
        World::new(conversation, Arc::new(RwLock::new(ToolRegistry::new())))
    }

    #[test]
    fn counter_fires_at_threshold_and_resets() {
        let world = world().with_prune_threshold(5);
        assert!(!world.count_tool_calls(3));
        assert_eq!(world.tool_calls(), 3);
        assert!(world.count_tool_calls(2));
        assert_eq!(world.tool_calls(), 0);
        assert!(!world.count_tool_calls(4));
    }

    #[test]
    fn zero_threshold_disables_pruning() {
        let world = world().with_prune_threshold(0);
        assert!(!world.count_tool_calls(1000));
    }

    #[test]
    fn cancel_token_starts_clear() {
        let world = world();
        assert!(!world.cancel.is_cancelled());
        world.cancel.cancel();
        assert!(world.cancel.is_cancelled());
    }
}
