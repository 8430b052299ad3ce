//! Stack domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::StackError;

/// Kind of installable item a catalog slug refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Skill,
    Agent,
    Command,
    Setting,
}

impl ItemType {
    /// Canonical grouping order used by generated install scripts.
    pub const CANONICAL_ORDER: [ItemType; 4] = [
        ItemType::Skill,
        ItemType::Agent,
        ItemType::Command,
        ItemType::Setting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Agent => "agent",
            Self::Command => "command",
            Self::Setting => "setting",
        }
    }

    /// Plural form, used for headings and catalog directory names.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Skill => "skills",
            Self::Agent => "agents",
            Self::Command => "commands",
            Self::Setting => "settings",
        }
    }

    /// Whether a single direct download is enough to install this type.
    pub fn is_directly_fetchable(&self) -> bool {
        matches!(self, Self::Skill | Self::Agent)
    }

    /// Priority when a share link has to drop items. Lower is dropped first.
    pub fn share_priority(&self) -> u8 {
        match self {
            Self::Setting => 0,
            Self::Command => 1,
            Self::Agent => 2,
            Self::Skill => 3,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skill" | "skills" => Ok(Self::Skill),
            "agent" | "agents" => Ok(Self::Agent),
            "command" | "commands" => Ok(Self::Command),
            "setting" | "settings" => Ok(Self::Setting),
            other => Err(StackError::invalid_input(format!(
                "unknown item type '{}' (expected skill, agent, command or setting)",
                other
            ))),
        }
    }
}

/// A reference to a catalog item held in a stack.
///
/// `name` and `category` are display copies taken when the item was added and
/// may be stale relative to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackItem {
    /// Local identifier, stable across reorder and filter.
    pub id: String,
    /// Catalog slug.
    pub slug: String,
    /// Item type.
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Display name.
    pub name: String,
    /// Display category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl StackItem {
    /// Creates an item whose id is derived from `(item_type, slug)`.
    ///
    /// An empty name falls back to the slug.
    pub fn new(item_type: ItemType, slug: impl Into<String>, name: impl Into<String>) -> Self {
        let slug = slug.into();
        let name = name.into();
        let name = if name.trim().is_empty() {
            slug.clone()
        } else {
            name
        };
        Self {
            id: Self::composite_id(item_type, &slug),
            slug,
            item_type,
            name,
            category: None,
        }
    }

    /// Sets the display category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The deterministic id for an item: `"<type>:<slug>"`.
    pub fn composite_id(item_type: ItemType, slug: &str) -> String {
        format!("{}:{}", item_type, slug)
    }

    /// Returns true if this item refers to the same catalog entry.
    pub fn matches(&self, slug: &str, item_type: ItemType) -> bool {
        self.item_type == item_type && self.slug == slug
    }

    /// Same catalog entry as `other`, ignoring id and display fields.
    pub fn same_entry(&self, other: &StackItem) -> bool {
        self.matches(&other.slug, other.item_type)
    }
}

/// Drops later entries whose `(slug, type)` or id already appeared, keeping order.
pub fn dedupe_items(items: impl IntoIterator<Item = StackItem>) -> Vec<StackItem> {
    let mut seen_entries: HashSet<(String, ItemType)> = HashSet::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let entry = (item.slug.clone(), item.item_type);
            if seen_ids.contains(&item.id) || seen_entries.contains(&entry) {
                return false;
            }
            seen_ids.insert(item.id.clone());
            seen_entries.insert(entry);
            true
        })
        .collect()
}

/// A named snapshot of items.
///
/// `items` is owned by value: loading a stack copies it into the working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedStack {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub items: Vec<StackItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavedStack {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Items of one type, in stack order.
    pub fn items_of_type(&self, item_type: ItemType) -> Vec<StackItem> {
        self.items
            .iter()
            .filter(|item| item.item_type == item_type)
            .cloned()
            .collect()
    }
}
