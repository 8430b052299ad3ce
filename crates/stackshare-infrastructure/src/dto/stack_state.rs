//! Stack state DTOs and migrations
//!
//! ## Version History
//! - **1.0.0**: `savedStacks` and `currentStackId`
//! - **1.1.0**: Added `items` (the working set) so unsaved work survives a reload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, Versioned};

use stackshare_core::error::{Result, StackError};
use stackshare_core::stack::{ItemType, SavedStack, StackItem, StackState};

// ============================================================================
// Nested record DTOs
// ============================================================================

/// Stack item DTO (shared by every record version).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackItemDTO {
    pub id: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<&StackItem> for StackItemDTO {
    fn from(item: &StackItem) -> Self {
        StackItemDTO {
            id: item.id.clone(),
            slug: item.slug.clone(),
            item_type: item.item_type,
            name: item.name.clone(),
            category: item.category.clone(),
        }
    }
}

impl From<StackItemDTO> for StackItem {
    fn from(dto: StackItemDTO) -> Self {
        // Records written before ids were derived may carry an empty id.
        let id = if dto.id.is_empty() {
            StackItem::composite_id(dto.item_type, &dto.slug)
        } else {
            dto.id
        };
        StackItem {
            id,
            slug: dto.slug,
            item_type: dto.item_type,
            name: dto.name,
            category: dto.category,
        }
    }
}

/// Saved stack DTO (shared by every record version).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedStackDTO {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<StackItemDTO>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SavedStack> for SavedStackDTO {
    fn from(stack: &SavedStack) -> Self {
        SavedStackDTO {
            id: stack.id.clone(),
            name: stack.name.clone(),
            description: stack.description.clone(),
            items: stack.items.iter().map(Into::into).collect(),
            created_at: stack.created_at,
            updated_at: stack.updated_at,
        }
    }
}

impl From<SavedStackDTO> for SavedStack {
    fn from(dto: SavedStackDTO) -> Self {
        SavedStack {
            id: dto.id,
            name: dto.name,
            description: dto.description,
            items: dto.items.into_iter().map(Into::into).collect(),
            created_at: dto.created_at,
            updated_at: dto.updated_at,
        }
    }
}

// ============================================================================
// StackState DTOs
// ============================================================================

/// Stack state record V1.0.0.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
#[serde(rename_all = "camelCase")]
pub struct StackStateV1_0_0 {
    #[serde(default)]
    pub saved_stacks: Vec<SavedStackDTO>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stack_id: Option<String>,
}

/// Stack state record V1.1.0.
///
/// Added the working set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.1.0")]
#[serde(rename_all = "camelCase")]
pub struct StackStateV1_1_0 {
    #[serde(default)]
    pub items: Vec<StackItemDTO>,
    #[serde(default)]
    pub saved_stacks: Vec<SavedStackDTO>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stack_id: Option<String>,
}

/// Type alias for the latest record version.
pub type StackStateDTO = StackStateV1_1_0;

// ============================================================================
// Migration implementations
// ============================================================================

/// Migration from V1.0.0 to V1.1.0.
/// The working set was not persisted; it starts empty.
impl version_migrate::MigratesTo<StackStateV1_1_0> for StackStateV1_0_0 {
    fn migrate(self) -> StackStateV1_1_0 {
        StackStateV1_1_0 {
            items: Vec::new(),
            saved_stacks: self.saved_stacks,
            current_stack_id: self.current_stack_id,
        }
    }
}

// ============================================================================
// Domain model conversions
// ============================================================================

/// Convert StackStateV1_1_0 DTO to domain model.
impl IntoDomain<StackState> for StackStateV1_1_0 {
    fn into_domain(self) -> StackState {
        StackState {
            items: self.items.into_iter().map(Into::into).collect(),
            current_stack_id: self.current_stack_id,
            saved_stacks: self.saved_stacks.into_iter().map(Into::into).collect(),
        }
    }
}

/// Convert domain model to StackStateV1_1_0 DTO for persistence.
impl FromDomain<StackState> for StackStateV1_1_0 {
    fn from_domain(state: StackState) -> Self {
        StackStateV1_1_0 {
            items: state.items.iter().map(Into::into).collect(),
            saved_stacks: state.saved_stacks.iter().map(Into::into).collect(),
            current_stack_id: state.current_stack_id,
        }
    }
}

// ============================================================================
// Migrator factory
// ============================================================================

/// Record versions this build can read.
pub const STACK_STATE_VERSIONS: [&str; 2] = ["1.0.0", "1.1.0"];

/// Creates a Migrator for the stack state record.
///
/// # Migration Path
///
/// - V1.0.0 → V1.1.0: Adds `items` with an empty working set
/// - V1.1.0 → StackState: Converts DTO to domain model
pub fn create_stack_state_migrator() -> Result<version_migrate::Migrator> {
    let mut migrator = version_migrate::Migrator::builder().build();

    // Register migration path: V1.0.0 -> V1.1.0 -> StackState
    let stack_state_path = version_migrate::Migrator::define("stack_state")
        .from::<StackStateV1_0_0>()
        .step::<StackStateV1_1_0>()
        .into_with_save::<StackState>();

    migrator.register(stack_state_path).map_err(|e| {
        StackError::migration(format!("Failed to register stack_state migration path: {}", e))
    })?;

    Ok(migrator)
}
