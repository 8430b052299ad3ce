//! Store state: the working set plus the registry of saved stacks.

use serde::{Deserialize, Serialize};

use super::model::{ItemType, SavedStack, StackItem, dedupe_items};

/// Complete state owned by the stack store.
///
/// `current_stack_id == None` means the working set is ad hoc. Otherwise it
/// names a live entry of `saved_stacks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackState {
    /// Working set being edited.
    #[serde(default)]
    pub items: Vec<StackItem>,
    /// Saved stack the working set is attached to.
    #[serde(default)]
    pub current_stack_id: Option<String>,
    /// Saved stacks, in creation order.
    #[serde(default)]
    pub saved_stacks: Vec<SavedStack>,
}

impl StackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the working set already holds `(slug, item_type)`.
    pub fn contains_item(&self, slug: &str, item_type: ItemType) -> bool {
        self.items.iter().any(|item| item.matches(slug, item_type))
    }

    /// Whether some working-set entry already uses `id`.
    pub fn contains_item_id(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn find_stack(&self, id: &str) -> Option<&SavedStack> {
        self.saved_stacks.iter().find(|stack| stack.id == id)
    }

    pub(crate) fn find_stack_mut(&mut self, id: &str) -> Option<&mut SavedStack> {
        self.saved_stacks.iter_mut().find(|stack| stack.id == id)
    }

    /// The saved stack the working set is attached to, if any.
    pub fn current_stack(&self) -> Option<&SavedStack> {
        self.current_stack_id
            .as_deref()
            .and_then(|id| self.find_stack(id))
    }

    /// Working-set items of one type, order preserved.
    pub fn items_of_type(&self, item_type: ItemType) -> Vec<StackItem> {
        self.items
            .iter()
            .filter(|item| item.item_type == item_type)
            .cloned()
            .collect()
    }

    pub fn skills_only(&self) -> Vec<StackItem> {
        self.items_of_type(ItemType::Skill)
    }

    pub fn agents_only(&self) -> Vec<StackItem> {
        self.items_of_type(ItemType::Agent)
    }

    pub fn commands_only(&self) -> Vec<StackItem> {
        self.items_of_type(ItemType::Command)
    }

    pub fn settings_only(&self) -> Vec<StackItem> {
        self.items_of_type(ItemType::Setting)
    }

    /// Restores the state invariants on data read from storage.
    ///
    /// Duplicate `(slug, type)` pairs and ids collapse to their first occurrence, and a
    /// `current_stack_id` pointing at a missing stack is cleared.
    pub fn repaired(mut self) -> Self {
        self.items = dedupe_items(self.items);
        for stack in &mut self.saved_stacks {
            stack.items = dedupe_items(std::mem::take(&mut stack.items));
        }
        if let Some(id) = self.current_stack_id.as_deref() {
            if self.find_stack(id).is_none() {
                tracing::warn!("Clearing dangling current stack reference '{}'", id);
                self.current_stack_id = None;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mixed_items() -> Vec<StackItem> {
        vec![
            StackItem::new(ItemType::Skill, "pdf", "PDF"),
            StackItem::new(ItemType::Agent, "reviewer", "Reviewer"),
            StackItem::new(ItemType::Skill, "xlsx", "Excel"),
            StackItem::new(ItemType::Command, "deploy", "Deploy"),
            StackItem::new(ItemType::Setting, "statusline", "Status line"),
        ]
    }

    #[test]
    fn test_type_filters_preserve_order() {
        let state = StackState {
            items: mixed_items(),
            ..StackState::default()
        };

        let skills: Vec<_> = state.skills_only().into_iter().map(|i| i.slug).collect();
        assert_eq!(skills, vec!["pdf", "xlsx"]);
        assert_eq!(state.agents_only().len(), 1);
        assert_eq!(state.commands_only()[0].slug, "deploy");
        assert_eq!(state.settings_only()[0].slug, "statusline");
        // Filters never touch the working set.
        assert_eq!(state.items.len(), 5);
    }

    #[test]
    fn test_repaired_clears_dangling_reference_and_duplicates() {
        let now = Utc::now();
        let mut items = mixed_items();
        items.push(StackItem::new(ItemType::Skill, "pdf", "PDF again"));
        let state = StackState {
            items,
            current_stack_id: Some("gone".to_string()),
            saved_stacks: vec![SavedStack {
                id: "kept".to_string(),
                name: "Kept".to_string(),
                description: None,
                items: vec![],
                created_at: now,
                updated_at: now,
            }],
        };

        let repaired = state.repaired();
        assert_eq!(repaired.items.len(), 5);
        assert!(repaired.current_stack_id.is_none());
        assert_eq!(repaired.saved_stacks.len(), 1);
    }

    #[test]
    fn test_current_stack_lookup() {
        let now = Utc::now();
        let state = StackState {
            items: vec![],
            current_stack_id: Some("s1".to_string()),
            saved_stacks: vec![SavedStack {
                id: "s1".to_string(),
                name: "One".to_string(),
                description: None,
                items: vec![],
                created_at: now,
                updated_at: now,
            }],
        };
        assert_eq!(state.current_stack().map(|s| s.name.as_str()), Some("One"));
    }
}
