//! StackStore - the explicit state container for stacks.
//!
//! Owns the working set and the saved-stack registry behind a narrow API.
//! Every mutation is a [`StackAction`] run through the pure reducer; the new
//! snapshot is persisted first and only then swapped in, so a failed write
//! leaves the in-memory state untouched and readers never observe a
//! half-applied change.
//!
//! Misuse (unknown ids, duplicate adds, malformed import text or share links)
//! degrades to a no-op or `None`. `Err` means the durable store failed.

use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;

use stackshare_core::codec::{self, ShareLink, SharedStack};
use stackshare_core::config::{ShareConfig, StackshareConfig};
use stackshare_core::error::Result;
use stackshare_core::generator::{CommandGenerator, InstallMode};
use stackshare_core::repository::StackStateRepository;
use stackshare_core::stack::{
    ItemType, MutationContext, Reduction, SavedStack, StackAction, StackItem, StackState, reduce,
};
use stackshare_core::storage::{KeyValueStore, MemoryKeyValueStore};
use stackshare_infrastructure::{
    FileKeyValueStore, HttpStackSyncService, KvStackStateRepository, StackPaths,
};

use crate::sync_dispatcher::SyncDispatcher;

/// What a committed action did.
enum Applied {
    Unchanged,
    Changed,
    Saved(SavedStack),
}

pub struct StackStore {
    state: RwLock<Arc<StackState>>,
    /// Serialises reduce + persist + swap.
    writer: Mutex<()>,
    repository: Arc<dyn StackStateRepository>,
    share: ShareConfig,
    generator: CommandGenerator,
    sync: SyncDispatcher,
}

impl StackStore {
    /// Hydrates a store from `repository`, with default settings and no sync.
    pub fn open(repository: Arc<dyn StackStateRepository>) -> Result<Self> {
        let state = repository.load()?;
        tracing::debug!(
            "Hydrated stack store: {} item(s), {} saved stack(s)",
            state.items.len(),
            state.saved_stacks.len()
        );

        Ok(Self {
            state: RwLock::new(Arc::new(state)),
            writer: Mutex::new(()),
            repository,
            share: ShareConfig::default(),
            generator: CommandGenerator::default(),
            sync: SyncDispatcher::disabled(),
        })
    }

    /// A store over any key-value backend.
    pub fn with_key_value_store(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::open(Arc::new(KvStackStateRepository::new(store)?))
    }

    /// A store backed by a fresh in-memory map.
    pub fn in_memory() -> Result<Self> {
        Self::with_key_value_store(Arc::new(MemoryKeyValueStore::new()))
    }

    /// A store persisted under the data directory, wired to `config`.
    pub fn open_file_backed(paths: &StackPaths, config: &StackshareConfig) -> Result<Self> {
        let store = FileKeyValueStore::new(paths.data_dir()?);
        let mut stack_store = Self::with_key_value_store(Arc::new(store))?.with_config(config);

        if let Some(service) = HttpStackSyncService::from_config(&config.sync) {
            stack_store = stack_store.with_sync(SyncDispatcher::new(
                Arc::new(service),
                config.sync.publish_on_save,
            ));
        }

        Ok(stack_store)
    }

    /// Applies share and generator settings.
    pub fn with_config(mut self, config: &StackshareConfig) -> Self {
        self.share = config.share.clone();
        self.generator = CommandGenerator::new(config.generator.clone());
        self
    }

    pub fn with_sync(mut self, sync: SyncDispatcher) -> Self {
        self.sync = sync;
        self
    }

    // ============================================================================
    // Reads
    // ============================================================================

    /// The current state as an immutable snapshot.
    pub fn snapshot(&self) -> Arc<StackState> {
        let guard = self.state.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    pub fn items(&self) -> Vec<StackItem> {
        self.snapshot().items.clone()
    }

    pub fn current_stack_id(&self) -> Option<String> {
        self.snapshot().current_stack_id.clone()
    }

    pub fn saved_stacks(&self) -> Vec<SavedStack> {
        self.snapshot().saved_stacks.clone()
    }

    pub fn get_stack(&self, id: &str) -> Option<SavedStack> {
        self.snapshot().find_stack(id).cloned()
    }

    pub fn items_of_type(&self, item_type: ItemType) -> Vec<StackItem> {
        self.snapshot().items_of_type(item_type)
    }

    pub fn skills_only(&self) -> Vec<StackItem> {
        self.snapshot().skills_only()
    }

    pub fn agents_only(&self) -> Vec<StackItem> {
        self.snapshot().agents_only()
    }

    pub fn commands_only(&self) -> Vec<StackItem> {
        self.snapshot().commands_only()
    }

    pub fn settings_only(&self) -> Vec<StackItem> {
        self.snapshot().settings_only()
    }

    // ============================================================================
    // Mutations
    // ============================================================================

    /// Adds `item` unless its `(slug, type)` is already in the working set.
    /// Returns whether the working set changed.
    pub fn add_item(&self, item: StackItem) -> Result<bool> {
        let applied = self.apply(StackAction::AddItem(item))?;
        Ok(!matches!(applied, Applied::Unchanged))
    }

    /// Removes the working-set entry with `id`, if present.
    pub fn remove_item(&self, id: &str) -> Result<bool> {
        let applied = self.apply(StackAction::RemoveItem { id: id.to_string() })?;
        Ok(!matches!(applied, Applied::Unchanged))
    }

    /// Empties the working set. Saved stacks are untouched.
    pub fn clear_stack(&self) -> Result<()> {
        self.apply(StackAction::ClearStack)?;
        Ok(())
    }

    /// Detaches from the current stack and empties the working set, so the
    /// next save creates a new stack.
    pub fn new_stack(&self) -> Result<()> {
        self.apply(StackAction::NewStack)?;
        Ok(())
    }

    /// Saves the working set: updates the current stack in place, or creates
    /// a new one if the working set is ad hoc.
    ///
    /// Returns `None` only when a new stack would have a blank name.
    pub fn save_stack(&self, name: &str, description: Option<String>) -> Result<Option<SavedStack>> {
        let applied = self.apply(StackAction::SaveStack {
            name: name.to_string(),
            description,
        })?;

        match applied {
            Applied::Saved(stack) => {
                self.sync.stack_saved(stack.clone());
                Ok(Some(stack))
            }
            _ => {
                tracing::warn!("Refusing to save a stack without a name");
                Ok(None)
            }
        }
    }

    /// Replaces the working set with a copy of stack `id` and attaches to it.
    pub fn load_stack(&self, id: &str) -> Result<bool> {
        let applied = self.apply(StackAction::LoadStack { id: id.to_string() })?;
        Ok(!matches!(applied, Applied::Unchanged))
    }

    /// Deletes stack `id`. If it was current, the working set is detached but kept.
    pub fn delete_stack(&self, id: &str) -> Result<bool> {
        let applied = self.apply(StackAction::DeleteStack { id: id.to_string() })?;
        Ok(!matches!(applied, Applied::Unchanged))
    }

    /// Renames stack `id`. `None` keeps the existing description.
    pub fn rename_stack(&self, id: &str, name: &str, description: Option<String>) -> Result<bool> {
        let applied = self.apply(StackAction::RenameStack {
            id: id.to_string(),
            name: name.to_string(),
            description,
        })?;
        Ok(!matches!(applied, Applied::Unchanged))
    }

    // ============================================================================
    // Codecs
    // ============================================================================

    /// Exports a saved stack, or the working set when `stack_id` is `None`.
    ///
    /// Returns `None` if `stack_id` is unknown.
    pub fn export_stack(&self, stack_id: Option<&str>) -> Result<Option<String>> {
        let snapshot = self.snapshot();
        match stack_id {
            Some(id) => match snapshot.find_stack(id) {
                Some(stack) => codec::encode_stack(stack).map(Some),
                None => {
                    tracing::debug!("Export of unknown stack '{}' ignored", id);
                    Ok(None)
                }
            },
            None => codec::encode_working_set(&snapshot.items, Utc::now()).map(Some),
        }
    }

    /// Registers exported text as a brand-new saved stack.
    ///
    /// Returns `None`, registering nothing, if the text fails validation.
    pub fn import_stack(&self, text: &str) -> Result<Option<SavedStack>> {
        let document = match codec::decode_document(text) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Rejected stack import: {}", e);
                return Ok(None);
            }
        };

        let applied = self.apply(StackAction::RegisterImported(document.into_saved_stack()))?;
        match applied {
            Applied::Saved(stack) => Ok(Some(stack)),
            _ => Ok(None),
        }
    }

    /// Builds a share link for a saved stack, or for the working set (named
    /// after the current stack, if any) when `stack_id` is `None`.
    pub fn share_stack(&self, stack_id: Option<&str>) -> Result<Option<ShareLink>> {
        let snapshot = self.snapshot();
        let (name, items) = match stack_id {
            Some(id) => match snapshot.find_stack(id) {
                Some(stack) => (Some(stack.name.as_str()), stack.items.as_slice()),
                None => return Ok(None),
            },
            None => (
                snapshot.current_stack().map(|stack| stack.name.as_str()),
                snapshot.items.as_slice(),
            ),
        };

        codec::generate_share_url(name, items, &self.share).map(Some)
    }

    /// Decodes a share link. Nothing is registered.
    pub fn open_shared(&self, url: &str) -> Option<SharedStack> {
        codec::decode_share_url(url)
    }

    /// Merges a decoded share into the working set with add-item semantics.
    /// Returns how many items were new.
    pub fn adopt_shared(&self, shared: &SharedStack) -> Result<usize> {
        let before = self.snapshot().items.len();
        self.apply(StackAction::AddItems(shared.items.clone()))?;
        Ok(self.snapshot().items.len().saturating_sub(before))
    }

    /// Renders install commands for a saved stack or the working set.
    ///
    /// Returns `None` if `stack_id` is unknown.
    pub fn generate_commands(&self, stack_id: Option<&str>, mode: InstallMode) -> Option<String> {
        let snapshot = self.snapshot();
        let items = match stack_id {
            Some(id) => &snapshot.find_stack(id)?.items,
            None => &snapshot.items,
        };
        Some(self.generator.generate(items, mode))
    }

    // ============================================================================
    // Sync
    // ============================================================================

    /// Waits for dispatched remote syncs to settle.
    pub async fn flush_sync(&self) {
        self.sync.flush().await;
    }

    /// Abandons in-flight remote syncs.
    pub fn cancel_sync(&self) {
        self.sync.cancel_pending();
    }

    // ============================================================================
    // Internals
    // ============================================================================

    fn apply(&self, action: StackAction) -> Result<Applied> {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let label = action_label(&action);
        let current = self.snapshot();

        let (next, applied) = match reduce(&current, action, &MutationContext::system()) {
            Reduction::Unchanged => {
                tracing::debug!("{}: no change", label);
                return Ok(Applied::Unchanged);
            }
            Reduction::Changed(next) => (next, Applied::Changed),
            Reduction::Saved { state, stack } => (state, Applied::Saved(stack)),
        };

        if let Err(e) = self.repository.save(&next) {
            tracing::error!("{}: failed to persist stack state: {}", label, e);
            return Err(e);
        }

        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(next);
        drop(guard);

        tracing::info!("{}: committed", label);
        Ok(applied)
    }
}

fn action_label(action: &StackAction) -> &'static str {
    match action {
        StackAction::AddItem(_) => "add_item",
        StackAction::AddItems(_) => "add_items",
        StackAction::RemoveItem { .. } => "remove_item",
        StackAction::ClearStack => "clear_stack",
        StackAction::NewStack => "new_stack",
        StackAction::SaveStack { .. } => "save_stack",
        StackAction::LoadStack { .. } => "load_stack",
        StackAction::DeleteStack { .. } => "delete_stack",
        StackAction::RenameStack { .. } => "rename_stack",
        StackAction::RegisterImported(_) => "import_stack",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackshare_core::error::StackError;

    struct FailingRepository;

    impl StackStateRepository for FailingRepository {
        fn load(&self) -> Result<StackState> {
            Ok(StackState::default())
        }

        fn save(&self, _state: &StackState) -> Result<()> {
            Err(StackError::io("disk full"))
        }
    }

    #[test]
    fn test_failed_persist_leaves_state_untouched() {
        let store = StackStore::open(Arc::new(FailingRepository)).unwrap();
        let err = store
            .add_item(StackItem::new(ItemType::Skill, "a", "A"))
            .unwrap_err();
        assert!(err.is_io());
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_no_op_does_not_persist() {
        // FailingRepository would error on any write.
        let store = StackStore::open(Arc::new(FailingRepository)).unwrap();
        assert!(!store.remove_item("skill:missing").unwrap());
        assert!(!store.load_stack("missing").unwrap());
        store.clear_stack().unwrap();
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let store = StackStore::in_memory().unwrap();
        let before = store.snapshot();
        store
            .add_item(StackItem::new(ItemType::Agent, "r", "R"))
            .unwrap();
        assert!(before.items.is_empty());
        assert_eq!(store.snapshot().items.len(), 1);
    }
}
