//! Repository trait for the durable store record.

use crate::error::Result;
use crate::stack::StackState;

/// Loads and saves the whole store state as one record.
pub trait StackStateRepository: Send + Sync {
    /// Loads the persisted state, or the empty state if nothing was saved.
    fn load(&self) -> Result<StackState>;

    /// Persists `state`, replacing the previous record.
    fn save(&self, state: &StackState) -> Result<()>;
}
