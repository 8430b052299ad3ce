//! Stack state repository backed by a [`KeyValueStore`].
//!
//! The whole store state is one versioned JSON record under
//! [`STACK_STATE_KEY`]. Uses version-migrate for schema migration.

use std::sync::Arc;

use version_migrate::Migrator;

use stackshare_core::error::{Result, StackError};
use stackshare_core::repository::StackStateRepository;
use stackshare_core::stack::StackState;
use stackshare_core::storage::KeyValueStore;

use crate::dto::{STACK_STATE_VERSIONS, create_stack_state_migrator};

/// Storage key of the durable record.
pub const STACK_STATE_KEY: &str = "stack-state";

const ENTITY: &str = "stack_state";

/// [`StackStateRepository`] that persists through any [`KeyValueStore`].
pub struct KvStackStateRepository {
    store: Arc<dyn KeyValueStore>,
    migrator: Migrator,
}

impl KvStackStateRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Ok(Self {
            store,
            migrator: create_stack_state_migrator()?,
        })
    }
}

impl StackStateRepository for KvStackStateRepository {
    fn load(&self) -> Result<StackState> {
        let Some(bytes) = self.store.get(STACK_STATE_KEY)? else {
            tracing::debug!("No stored stack state; starting empty");
            return Ok(StackState::default());
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(StackState::default());
        }

        let json_value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            StackError::Serialization {
                format: "JSON".to_string(),
                message: format!("Failed to parse stored stack state: {}", e),
            }
        })?;

        // A record from a newer build would otherwise load as the latest DTO
        // with its unknown fields dropped, and be overwritten on the next save.
        if let Some(version) = json_value.get("version").and_then(|v| v.as_str()) {
            if !STACK_STATE_VERSIONS.contains(&version) {
                return Err(StackError::migration(format!(
                    "Stored stack state has unsupported version {} (this build reads {})",
                    version,
                    STACK_STATE_VERSIONS.join(", ")
                )));
            }
        }

        let state: StackState = self
            .migrator
            .load_flat_from(ENTITY, json_value)
            .map_err(|e| StackError::migration(format!("Failed to migrate stack state: {}", e)))?;

        Ok(state.repaired())
    }

    fn save(&self, state: &StackState) -> Result<()> {
        // Serialize using migrator (includes version info)
        let serialized = self
            .migrator
            .save_domain_flat(ENTITY, state)
            .map_err(|e| StackError::Serialization {
                format: "JSON".to_string(),
                message: format!("Failed to serialize stack state: {}", e),
            })?;

        self.store.set(STACK_STATE_KEY, serialized.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stackshare_core::stack::{ItemType, SavedStack, StackItem};
    use stackshare_core::storage::MemoryKeyValueStore;

    fn repository(store: &MemoryKeyValueStore) -> KvStackStateRepository {
        KvStackStateRepository::new(Arc::new(store.clone())).unwrap()
    }

    #[test]
    fn test_load_default_when_missing() {
        let store = MemoryKeyValueStore::new();
        let state = repository(&store).load().unwrap();
        assert_eq!(state, StackState::default());
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryKeyValueStore::new();
        let repo = repository(&store);

        let now = Utc::now();
        let item = StackItem::new(ItemType::Skill, "pdf", "PDF");
        let state = StackState {
            items: vec![item.clone()],
            current_stack_id: Some("s1".to_string()),
            saved_stacks: vec![SavedStack {
                id: "s1".to_string(),
                name: "Docs".to_string(),
                description: None,
                items: vec![item],
                created_at: now,
                updated_at: now,
            }],
        };

        repo.save(&state).unwrap();
        assert_eq!(store.keys(), vec![STACK_STATE_KEY.to_string()]);
        assert_eq!(repo.load().unwrap(), state);
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let store = MemoryKeyValueStore::new();
        store.set(STACK_STATE_KEY, b"{not json").unwrap();
        let err = repository(&store).load().unwrap_err();
        assert!(err.is_serialization());
    }

    #[test]
    fn test_newer_record_version_is_rejected_and_kept() {
        let store = MemoryKeyValueStore::new();
        let record = br#"{"version":"9.0.0","items":[{"id":"skill:a","slug":"a","type":"skill","name":"a"}],"futureField":1}"#;
        store.set(STACK_STATE_KEY, record).unwrap();

        let err = repository(&store).load().unwrap_err();
        assert!(matches!(err, StackError::Migration(_)));
        assert_eq!(
            store.get(STACK_STATE_KEY).unwrap().as_deref(),
            Some(&record[..])
        );
    }

    #[test]
    fn test_load_clears_dangling_current_stack() {
        let store = MemoryKeyValueStore::new();
        store
            .set(
                STACK_STATE_KEY,
                br#"{"version":"1.1.0","items":[],"savedStacks":[],"currentStackId":"gone"}"#,
            )
            .unwrap();
        let state = repository(&store).load().unwrap();
        assert!(state.current_stack_id.is_none());
    }
}
