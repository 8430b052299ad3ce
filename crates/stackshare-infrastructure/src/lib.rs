pub mod config_service;
pub mod dto;
pub mod paths;
pub mod remote_sync;
pub mod state_repository;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::paths::StackPaths;
pub use crate::remote_sync::HttpStackSyncService;
pub use crate::state_repository::{KvStackStateRepository, STACK_STATE_KEY};
pub use crate::storage::FileKeyValueStore;
