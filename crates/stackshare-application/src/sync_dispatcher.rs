//! Fire-and-forget fan-out of saved stacks to the remote sync service.
//!
//! Dispatch never blocks the caller and never reports back: failures are
//! logged under the `stack_sync` target and dropped. Pending work is tied to
//! a [`CancellationToken`], so tearing the dispatcher down (or calling
//! [`SyncDispatcher::cancel_pending`]) abandons anything still in flight.

use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use stackshare_core::stack::SavedStack;
use stackshare_core::sync::{NoOpStackSyncService, StackSyncService};

/// Spawns remote mirror requests for committed saves.
pub struct SyncDispatcher {
    service: Arc<dyn StackSyncService>,
    publish_on_save: bool,
    cancel: Mutex<CancellationToken>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncDispatcher {
    pub fn new(service: Arc<dyn StackSyncService>, publish_on_save: bool) -> Self {
        Self {
            service,
            publish_on_save,
            cancel: Mutex::new(CancellationToken::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// A dispatcher whose service never has a session.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoOpStackSyncService), false)
    }

    /// Requests a mirrored write of `stack` (and, if configured, a public
    /// flag flip). Returns immediately.
    pub fn stack_saved(&self, stack: SavedStack) {
        let Ok(handle) = Handle::try_current() else {
            tracing::debug!(
                target: "stack_sync",
                "No async runtime; skipping mirror of stack {}",
                stack.id
            );
            return;
        };

        let token = self.cancel.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let service = Arc::clone(&self.service);
        let publish = self.publish_on_save;

        let task = handle.spawn(async move {
            let stack_id = stack.id.clone();
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(target: "stack_sync", "Abandoned mirror of stack {}", stack_id);
                }
                _ = mirror(service, stack, publish) => {}
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|task| !task.is_finished());
        pending.push(task);
    }

    /// Abandons every in-flight request. Later dispatches run normally.
    pub fn cancel_pending(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        token.cancel();
        *token = CancellationToken::new();
        drop(token);

        let count = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *pending).len()
        };
        if count > 0 {
            tracing::debug!(target: "stack_sync", "Cancelled {} pending sync task(s)", count);
        }
    }

    /// Waits for every dispatched request to finish or be cancelled.
    pub async fn flush(&self) {
        let tasks = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *pending)
        };
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(target: "stack_sync", "Sync task failed to join: {}", e);
            }
        }
    }

    /// Number of dispatched requests not yet known to be finished.
    pub fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|task| !task.is_finished());
        pending.len()
    }
}

impl Drop for SyncDispatcher {
    fn drop(&mut self) {
        if let Ok(token) = self.cancel.get_mut() {
            token.cancel();
        }
    }
}

async fn mirror(service: Arc<dyn StackSyncService>, stack: SavedStack, publish: bool) {
    if !service.has_session().await {
        tracing::debug!(target: "stack_sync", "No session, skipping mirror of stack {}", stack.id);
        return;
    }

    if let Err(e) = service.mirror_stack(&stack).await {
        tracing::warn!(target: "stack_sync", "Mirror of stack {} failed: {}", stack.id, e);
        return;
    }
    tracing::info!(target: "stack_sync", "Mirrored stack {}", stack.id);

    if publish {
        if let Err(e) = service.set_public(&stack.id, true).await {
            tracing::warn!(target: "stack_sync", "Publishing stack {} failed: {}", stack.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stack(id: &str) -> SavedStack {
        let now = Utc::now();
        SavedStack {
            id: id.to_string(),
            name: "S".to_string(),
            description: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_without_runtime_is_skipped() {
        let dispatcher = SyncDispatcher::disabled();
        dispatcher.stack_saved(stack("s1"));
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_dispatch_completes() {
        let dispatcher = SyncDispatcher::disabled();
        dispatcher.stack_saved(stack("s1"));
        dispatcher.flush().await;
        assert_eq!(dispatcher.pending_count(), 0);
    }
}
