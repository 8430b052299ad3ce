//! Remote mirror of saved stacks.
//!
//! Sync is advisory: the local store never waits on it and never rolls back
//! because of it.

use async_trait::async_trait;

use crate::error::Result;
use crate::stack::SavedStack;

/// Mirrors saved stacks to a remote service.
#[async_trait]
pub trait StackSyncService: Send + Sync {
    /// Whether an authenticated session exists. Without one nothing is sent.
    async fn has_session(&self) -> bool;

    /// Writes `stack` to the remote store, keyed by its id.
    async fn mirror_stack(&self, stack: &SavedStack) -> Result<()>;

    /// Flips the public-visibility flag of a mirrored stack.
    async fn set_public(&self, stack_id: &str, public: bool) -> Result<()>;
}

/// A [`StackSyncService`] for when no remote is configured.
pub struct NoOpStackSyncService;

#[async_trait]
impl StackSyncService for NoOpStackSyncService {
    async fn has_session(&self) -> bool {
        false
    }

    async fn mirror_stack(&self, _stack: &SavedStack) -> Result<()> {
        Ok(())
    }

    async fn set_public(&self, _stack_id: &str, _public: bool) -> Result<()> {
        Ok(())
    }
}
