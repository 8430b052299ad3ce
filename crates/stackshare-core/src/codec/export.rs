//! Export/import text format.
//!
//! A stack is exported as pretty-printed JSON:
//!
//! ```text
//! {
//!   "formatVersion": 1,
//!   "id": "…",
//!   "name": "…",
//!   "description": "…",            // optional
//!   "items": [{ "id", "slug", "type", "name", "category"? }],
//!   "createdAt": "RFC 3339",
//!   "updatedAt": "RFC 3339"
//! }
//! ```
//!
//! Decoding is all-or-nothing: a document either passes every structural
//! check or is rejected with the first reason found.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StackError};
use crate::stack::{SavedStack, StackItem, dedupe_items};

/// Version written by this build. Documents with a higher version are rejected.
pub const FORMAT_VERSION: u32 = 1;

/// Prefix of the synthetic id given to working-set exports.
pub const DRAFT_ID_PREFIX: &str = "draft-";

/// Portable representation of a saved stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackDocument {
    pub format_version: u32,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub items: Vec<StackItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StackDocument {
    /// Wraps an unsaved working set: synthetic id, no name.
    pub fn draft(items: &[StackItem], now: DateTime<Utc>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            id: format!("{}{}", DRAFT_ID_PREFIX, Uuid::new_v4()),
            name: String::new(),
            description: None,
            items: items.to_vec(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Converts the document into a stack candidate. Identity and timestamps
    /// are reassigned when the candidate is registered.
    pub fn into_saved_stack(self) -> SavedStack {
        SavedStack {
            id: self.id,
            name: self.name,
            description: self.description,
            items: self.items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<&SavedStack> for StackDocument {
    fn from(stack: &SavedStack) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            id: stack.id.clone(),
            name: stack.name.clone(),
            description: stack.description.clone(),
            items: stack.items.clone(),
            created_at: stack.created_at,
            updated_at: stack.updated_at,
        }
    }
}

pub fn encode_document(document: &StackDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Serializes a saved stack.
pub fn encode_stack(stack: &SavedStack) -> Result<String> {
    encode_document(&StackDocument::from(stack))
}

/// Serializes an unsaved working set.
pub fn encode_working_set(items: &[StackItem], now: DateTime<Utc>) -> Result<String> {
    encode_document(&StackDocument::draft(items, now))
}

/// Parses and validates an exported document.
pub fn decode_document(text: &str) -> Result<StackDocument> {
    let value: serde_json::Value = serde_json::from_str(text.trim())?;

    let Some(object) = value.as_object() else {
        return Err(StackError::invalid_input("document is not a JSON object"));
    };

    let version = object
        .get("formatVersion")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| StackError::invalid_input("missing or non-numeric formatVersion"))?;
    if version == 0 || version > u64::from(FORMAT_VERSION) {
        return Err(StackError::invalid_input(format!(
            "unsupported formatVersion {} (this build reads up to {})",
            version, FORMAT_VERSION
        )));
    }

    let mut document: StackDocument = serde_json::from_value(value)?;
    validate_items(&document.items)?;
    document.items = dedupe_items(document.items);

    Ok(document)
}

fn validate_items(items: &[StackItem]) -> Result<()> {
    let mut ids: HashMap<&str, &StackItem> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        if item.slug.trim().is_empty() {
            return Err(StackError::invalid_input(format!(
                "item {} has an empty slug",
                index
            )));
        }
        if item.id.trim().is_empty() {
            return Err(StackError::invalid_input(format!(
                "item {} ('{}') has an empty id",
                index, item.slug
            )));
        }
        // A repeated entry is collapsed later; one id on two entries is not.
        match ids.get(item.id.as_str()) {
            Some(first) if !first.same_entry(item) => {
                return Err(StackError::invalid_input(format!(
                    "item {} reuses id '{}'",
                    index, item.id
                )));
            }
            Some(_) => {}
            None => {
                ids.insert(item.id.as_str(), item);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::ItemType;
    use chrono::TimeZone;

    fn sample_stack() -> SavedStack {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        SavedStack {
            id: "stack-1".to_string(),
            name: "Frontend".to_string(),
            description: Some("React work".to_string()),
            items: vec![
                StackItem::new(ItemType::Skill, "react-patterns", "React Patterns")
                    .with_category("frontend"),
                StackItem::new(ItemType::Agent, "ui-reviewer", "UI Reviewer"),
            ],
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_encoded_document_shape() {
        let text = encode_stack(&sample_stack()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["formatVersion"], 1);
        assert_eq!(value["name"], "Frontend");
        assert_eq!(value["items"][0]["type"], "skill");
        assert_eq!(value["items"][0]["category"], "frontend");
        assert!(value["items"][1].get("category").is_none());
        assert_eq!(value["createdAt"], "2025-03-01T09:00:00Z");
    }

    #[test]
    fn test_decode_restores_items() {
        let stack = sample_stack();
        let document = decode_document(&encode_stack(&stack).unwrap()).unwrap();
        assert_eq!(document.items, stack.items);
        assert_eq!(document.description, stack.description);
    }

    #[test]
    fn test_draft_has_synthetic_id_and_no_name() {
        let items = sample_stack().items;
        let text = encode_working_set(&items, Utc::now()).unwrap();
        let document = decode_document(&text).unwrap();
        assert!(document.id.starts_with(DRAFT_ID_PREFIX));
        assert!(document.name.is_empty());
        assert_eq!(document.items, items);
    }

    #[test]
    fn test_rejects_future_format_version() {
        let mut value = serde_json::to_value(StackDocument::from(&sample_stack())).unwrap();
        value["formatVersion"] = serde_json::json!(2);
        let err = decode_document(&value.to_string()).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_rejects_missing_version() {
        let mut value = serde_json::to_value(StackDocument::from(&sample_stack())).unwrap();
        value.as_object_mut().unwrap().remove("formatVersion");
        assert!(decode_document(&value.to_string()).is_err());
    }

    #[test]
    fn test_rejects_unknown_item_type_as_a_whole() {
        let mut value = serde_json::to_value(StackDocument::from(&sample_stack())).unwrap();
        value["items"][1]["type"] = serde_json::json!("plugin");
        assert!(decode_document(&value.to_string()).is_err());
    }

    #[test]
    fn test_rejects_items_missing_required_fields() {
        let mut value = serde_json::to_value(StackDocument::from(&sample_stack())).unwrap();
        value["items"][0].as_object_mut().unwrap().remove("name");
        assert!(decode_document(&value.to_string()).is_err());

        let mut value = serde_json::to_value(StackDocument::from(&sample_stack())).unwrap();
        value["items"] = serde_json::json!({"not": "a list"});
        assert!(decode_document(&value.to_string()).is_err());
    }

    #[test]
    fn test_rejects_empty_slug() {
        let mut value = serde_json::to_value(StackDocument::from(&sample_stack())).unwrap();
        value["items"][0]["slug"] = serde_json::json!("  ");
        let err = decode_document(&value.to_string()).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_rejects_non_json_and_non_object() {
        assert!(decode_document("not json").is_err());
        assert!(decode_document("[1, 2, 3]").unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_rejects_duplicate_item_ids() {
        let mut value = serde_json::to_value(StackDocument::from(&sample_stack())).unwrap();
        value["items"][1]["id"] = value["items"][0]["id"].clone();
        let err = decode_document(&value.to_string()).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_collapses_duplicate_entries() {
        let mut stack = sample_stack();
        stack.items.push(StackItem::new(ItemType::Skill, "react-patterns", "Dup"));
        let document = decode_document(&encode_stack(&stack).unwrap()).unwrap();
        assert_eq!(document.items.len(), 2);
        assert_eq!(document.items[0].name, "React Patterns");
    }
}
