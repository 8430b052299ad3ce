//! Pure state transitions for the stack store.
//!
//! Every store operation is expressed as a [`StackAction`] applied to an
//! immutable [`StackState`]. The reducer never mutates its input: it returns
//! a fresh state (or [`Reduction::Unchanged`]) so the caller can persist the
//! new snapshot and swap it in as a whole.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::model::{SavedStack, StackItem, dedupe_items};
use super::state::StackState;

/// Name given to imported stacks that arrive without one.
pub const IMPORTED_STACK_NAME: &str = "Imported Stack";

/// Clock and id source for a single transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationContext {
    pub now: DateTime<Utc>,
    /// Id used if the transition creates a saved stack.
    pub fresh_stack_id: String,
}

impl MutationContext {
    pub fn new(now: DateTime<Utc>, fresh_stack_id: impl Into<String>) -> Self {
        Self {
            now,
            fresh_stack_id: fresh_stack_id.into(),
        }
    }

    /// Wall clock and a random v4 id.
    pub fn system() -> Self {
        Self::new(Utc::now(), Uuid::new_v4().to_string())
    }
}

/// A request to change the store state.
#[derive(Debug, Clone, PartialEq)]
pub enum StackAction {
    AddItem(StackItem),
    AddItems(Vec<StackItem>),
    RemoveItem {
        id: String,
    },
    ClearStack,
    /// Detaches from the current stack and starts an empty, ad hoc working set.
    NewStack,
    SaveStack {
        name: String,
        description: Option<String>,
    },
    LoadStack {
        id: String,
    },
    DeleteStack {
        id: String,
    },
    RenameStack {
        id: String,
        name: String,
        description: Option<String>,
    },
    /// Registers a validated import as a brand-new saved stack.
    RegisterImported(SavedStack),
}

/// Result of applying an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    /// Nothing to do; the caller must not persist.
    Unchanged,
    Changed(StackState),
    /// A saved stack was created or updated.
    Saved { state: StackState, stack: SavedStack },
}

impl Reduction {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Reduction::Unchanged)
    }

    /// The next state, if there is one.
    pub fn state(&self) -> Option<&StackState> {
        match self {
            Reduction::Unchanged => None,
            Reduction::Changed(state) | Reduction::Saved { state, .. } => Some(state),
        }
    }
}

/// Applies `action` to `state`.
pub fn reduce(state: &StackState, action: StackAction, ctx: &MutationContext) -> Reduction {
    match action {
        StackAction::AddItem(item) => add_items(state, vec![item]),
        StackAction::AddItems(items) => add_items(state, items),
        StackAction::RemoveItem { id } => remove_item(state, &id),
        StackAction::ClearStack => clear_stack(state),
        StackAction::NewStack => new_stack(state),
        StackAction::SaveStack { name, description } => {
            save_stack(state, &name, description, ctx)
        }
        StackAction::LoadStack { id } => load_stack(state, &id),
        StackAction::DeleteStack { id } => delete_stack(state, &id),
        StackAction::RenameStack {
            id,
            name,
            description,
        } => rename_stack(state, &id, &name, description, ctx),
        StackAction::RegisterImported(candidate) => register_imported(state, candidate, ctx),
    }
}

/// Next `updated_at` after `previous`, never going backwards.
fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

fn normalized_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn add_items(state: &StackState, items: Vec<StackItem>) -> Reduction {
    let fresh: Vec<StackItem> = dedupe_items(items)
        .into_iter()
        .filter(|item| {
            !state.contains_item(&item.slug, item.item_type) && !state.contains_item_id(&item.id)
        })
        .collect();

    if fresh.is_empty() {
        return Reduction::Unchanged;
    }

    let mut next = state.clone();
    next.items.extend(fresh);
    Reduction::Changed(next)
}

fn remove_item(state: &StackState, id: &str) -> Reduction {
    if !state.items.iter().any(|item| item.id == id) {
        return Reduction::Unchanged;
    }

    let mut next = state.clone();
    next.items.retain(|item| item.id != id);
    Reduction::Changed(next)
}

fn clear_stack(state: &StackState) -> Reduction {
    if state.items.is_empty() {
        return Reduction::Unchanged;
    }

    let mut next = state.clone();
    next.items.clear();
    Reduction::Changed(next)
}

fn new_stack(state: &StackState) -> Reduction {
    if state.items.is_empty() && state.current_stack_id.is_none() {
        return Reduction::Unchanged;
    }

    let mut next = state.clone();
    next.items.clear();
    next.current_stack_id = None;
    Reduction::Changed(next)
}

fn save_stack(
    state: &StackState,
    name: &str,
    description: Option<String>,
    ctx: &MutationContext,
) -> Reduction {
    let name = normalized_name(name);
    let mut next = state.clone();

    if let Some(current_id) = state.current_stack_id.as_deref() {
        if let Some(existing) = next.find_stack_mut(current_id) {
            if let Some(name) = name {
                existing.name = name;
            }
            if description.is_some() {
                existing.description = description;
            }
            existing.items = state.items.clone();
            existing.updated_at = advance(existing.updated_at, ctx.now);
            let stack = existing.clone();
            return Reduction::Saved { state: next, stack };
        }
    }

    // A persisted stack must have a name.
    let Some(name) = name else {
        return Reduction::Unchanged;
    };

    let stack = SavedStack {
        id: ctx.fresh_stack_id.clone(),
        name,
        description,
        items: state.items.clone(),
        created_at: ctx.now,
        updated_at: ctx.now,
    };
    next.saved_stacks.push(stack.clone());
    next.current_stack_id = Some(stack.id.clone());
    Reduction::Saved { state: next, stack }
}

fn load_stack(state: &StackState, id: &str) -> Reduction {
    let Some(stack) = state.find_stack(id) else {
        return Reduction::Unchanged;
    };

    let mut next = state.clone();
    next.items = stack.items.clone();
    next.current_stack_id = Some(stack.id.clone());
    Reduction::Changed(next)
}

fn delete_stack(state: &StackState, id: &str) -> Reduction {
    if state.find_stack(id).is_none() {
        return Reduction::Unchanged;
    }

    let mut next = state.clone();
    next.saved_stacks.retain(|stack| stack.id != id);
    if next.current_stack_id.as_deref() == Some(id) {
        // Detach, keeping the in-progress working set.
        next.current_stack_id = None;
    }
    Reduction::Changed(next)
}

fn rename_stack(
    state: &StackState,
    id: &str,
    name: &str,
    description: Option<String>,
    ctx: &MutationContext,
) -> Reduction {
    let Some(name) = normalized_name(name) else {
        return Reduction::Unchanged;
    };

    let mut next = state.clone();
    let Some(stack) = next.find_stack_mut(id) else {
        return Reduction::Unchanged;
    };

    stack.name = name;
    if description.is_some() {
        stack.description = description;
    }
    stack.updated_at = advance(stack.updated_at, ctx.now);
    Reduction::Changed(next)
}

fn register_imported(
    state: &StackState,
    candidate: SavedStack,
    ctx: &MutationContext,
) -> Reduction {
    let stack = SavedStack {
        id: ctx.fresh_stack_id.clone(),
        name: normalized_name(&candidate.name)
            .unwrap_or_else(|| IMPORTED_STACK_NAME.to_string()),
        description: candidate.description,
        items: dedupe_items(candidate.items),
        created_at: ctx.now,
        updated_at: ctx.now,
    };

    let mut next = state.clone();
    next.saved_stacks.push(stack.clone());
    Reduction::Saved { state: next, stack }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::model::ItemType;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn ctx(secs: i64, id: &str) -> MutationContext {
        MutationContext::new(at(secs), id)
    }

    fn skill(slug: &str) -> StackItem {
        StackItem::new(ItemType::Skill, slug, slug.to_uppercase())
    }

    fn expect_changed(reduction: Reduction) -> StackState {
        match reduction {
            Reduction::Changed(state) => state,
            other => panic!("expected Changed, got {:?}", other),
        }
    }

    fn expect_saved(reduction: Reduction) -> (StackState, SavedStack) {
        match reduction {
            Reduction::Saved { state, stack } => (state, stack),
            other => panic!("expected Saved, got {:?}", other),
        }
    }

    #[test]
    fn test_add_item_is_idempotent() {
        let state = StackState::new();
        let state = expect_changed(reduce(&state, StackAction::AddItem(skill("a")), &ctx(0, "x")));
        let again = reduce(&state, StackAction::AddItem(skill("a")), &ctx(1, "x"));

        assert!(again.is_unchanged());
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn test_add_same_slug_different_type_is_distinct() {
        let state = StackState::new();
        let state = expect_changed(reduce(&state, StackAction::AddItem(skill("a")), &ctx(0, "x")));
        let agent = StackItem::new(ItemType::Agent, "a", "A");
        let state = expect_changed(reduce(&state, StackAction::AddItem(agent), &ctx(0, "x")));
        assert_eq!(state.items.len(), 2);
    }

    #[test]
    fn test_add_items_skips_present_and_duplicates() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let batch = vec![skill("a"), skill("b"), skill("b"), skill("c")];
        let state = expect_changed(reduce(&state, StackAction::AddItems(batch), &ctx(0, "x")));

        let slugs: Vec<_> = state.items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_with_colliding_id_is_rejected() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let mut clash = skill("b");
        clash.id = "skill:a".to_string();
        assert!(reduce(&state, StackAction::AddItem(clash), &ctx(0, "x")).is_unchanged());

        // Removing by id then touches exactly one entry.
        let state = expect_changed(reduce(
            &state,
            StackAction::RemoveItem {
                id: "skill:a".to_string(),
            },
            &ctx(1, "x"),
        ));
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_remove_missing_item_is_noop() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let result = reduce(
            &state,
            StackAction::RemoveItem {
                id: "skill:missing".to_string(),
            },
            &ctx(0, "x"),
        );
        assert!(result.is_unchanged());

        let state = expect_changed(reduce(
            &state,
            StackAction::RemoveItem {
                id: "skill:a".to_string(),
            },
            &ctx(0, "x"),
        ));
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_save_creates_then_updates_in_place() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let (state, created) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "Demo".to_string(),
                description: None,
            },
            &ctx(0, "s1"),
        ));
        assert_eq!(created.id, "s1");
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(state.current_stack_id.as_deref(), Some("s1"));

        let state = expect_changed(reduce(&state, StackAction::AddItem(skill("b")), &ctx(5, "unused")));
        let (state, updated) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "Demo v2".to_string(),
                description: Some("two items".to_string()),
            },
            &ctx(10, "s2"),
        ));

        assert_eq!(updated.id, "s1");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.name, "Demo v2");
        assert_eq!(updated.items.len(), 2);
        assert_eq!(state.saved_stacks.len(), 1);
    }

    #[test]
    fn test_save_without_name_on_new_stack_is_noop() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let result = reduce(
            &state,
            StackAction::SaveStack {
                name: "   ".to_string(),
                description: None,
            },
            &ctx(0, "s1"),
        );
        assert!(result.is_unchanged());
    }

    #[test]
    fn test_updated_at_is_monotonic_when_clock_stalls() {
        let state = StackState::new();
        let (state, created) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "Demo".to_string(),
                description: None,
            },
            &ctx(100, "s1"),
        ));

        // Clock went backwards.
        let (_, updated) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "Demo".to_string(),
                description: None,
            },
            &ctx(50, "s2"),
        ));
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn test_saved_snapshot_is_not_aliased_by_working_set() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let (state, _) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "Demo".to_string(),
                description: None,
            },
            &ctx(0, "s1"),
        ));
        let state = expect_changed(reduce(&state, StackAction::AddItem(skill("b")), &ctx(1, "x")));

        assert_eq!(state.items.len(), 2);
        assert_eq!(state.find_stack("s1").unwrap().items.len(), 1);
    }

    #[test]
    fn test_clear_keeps_saved_stacks_and_reference() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let (state, saved) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "Demo".to_string(),
                description: None,
            },
            &ctx(0, "s1"),
        ));
        let state = expect_changed(reduce(&state, StackAction::ClearStack, &ctx(1, "x")));

        assert!(state.items.is_empty());
        assert_eq!(state.current_stack_id.as_deref(), Some("s1"));
        assert_eq!(state.find_stack("s1").unwrap(), &saved);
    }

    #[test]
    fn test_new_stack_detaches_so_next_save_creates() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let (state, first) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "One".to_string(),
                description: None,
            },
            &ctx(0, "s1"),
        ));
        let state = expect_changed(reduce(&state, StackAction::NewStack, &ctx(1, "x")));
        assert!(state.items.is_empty());
        assert!(state.current_stack_id.is_none());
        assert_eq!(state.find_stack("s1").unwrap(), &first);

        let state = expect_changed(reduce(&state, StackAction::AddItem(skill("b")), &ctx(2, "x")));
        let (state, second) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "Two".to_string(),
                description: None,
            },
            &ctx(3, "s2"),
        ));
        assert_eq!(second.id, "s2");
        assert_eq!(state.saved_stacks.len(), 2);

        let fresh = StackState::new();
        assert!(reduce(&fresh, StackAction::NewStack, &ctx(0, "x")).is_unchanged());
    }

    #[test]
    fn test_load_copies_items_and_attaches() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let (state, _) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "One".to_string(),
                description: None,
            },
            &ctx(0, "s1"),
        ));
        let state = expect_changed(reduce(&state, StackAction::ClearStack, &ctx(1, "x")));
        let state = expect_changed(reduce(
            &state,
            StackAction::LoadStack {
                id: "s1".to_string(),
            },
            &ctx(2, "x"),
        ));

        assert_eq!(state.items, vec![skill("a")]);
        assert_eq!(state.current_stack_id.as_deref(), Some("s1"));

        let missing = reduce(
            &state,
            StackAction::LoadStack {
                id: "nope".to_string(),
            },
            &ctx(3, "x"),
        );
        assert!(missing.is_unchanged());
    }

    #[test]
    fn test_delete_current_detaches_but_keeps_items() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let (state, _) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "One".to_string(),
                description: None,
            },
            &ctx(0, "s1"),
        ));
        let state = expect_changed(reduce(
            &state,
            StackAction::DeleteStack {
                id: "s1".to_string(),
            },
            &ctx(1, "x"),
        ));

        assert!(state.saved_stacks.is_empty());
        assert!(state.current_stack_id.is_none());
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn test_rename_touches_only_name_description_updated_at() {
        let state = StackState {
            items: vec![skill("a")],
            ..StackState::default()
        };
        let (state, before) = expect_saved(reduce(
            &state,
            StackAction::SaveStack {
                name: "Old".to_string(),
                description: None,
            },
            &ctx(0, "s1"),
        ));
        let state = expect_changed(reduce(
            &state,
            StackAction::RenameStack {
                id: "s1".to_string(),
                name: "New".to_string(),
                description: Some("Desc".to_string()),
            },
            &ctx(30, "x"),
        ));

        let after = state.find_stack("s1").unwrap();
        assert_eq!(after.name, "New");
        assert_eq!(after.description.as_deref(), Some("Desc"));
        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.items, before.items);
    }

    #[test]
    fn test_rename_unknown_or_blank_is_noop() {
        let state = StackState::new();
        let result = reduce(
            &state,
            StackAction::RenameStack {
                id: "nope".to_string(),
                name: "New".to_string(),
                description: None,
            },
            &ctx(0, "x"),
        );
        assert!(result.is_unchanged());
    }

    #[test]
    fn test_register_imported_assigns_fresh_identity() {
        let candidate = SavedStack {
            id: "s1".to_string(),
            name: "".to_string(),
            description: Some("from a friend".to_string()),
            items: vec![skill("a"), skill("a")],
            created_at: at(-1000),
            updated_at: at(-500),
        };
        let state = StackState::new();
        let (state, stack) = expect_saved(reduce(
            &state,
            StackAction::RegisterImported(candidate),
            &ctx(0, "fresh"),
        ));

        assert_eq!(stack.id, "fresh");
        assert_eq!(stack.name, IMPORTED_STACK_NAME);
        assert_eq!(stack.created_at, at(0));
        assert_eq!(stack.updated_at, at(0));
        assert_eq!(stack.items.len(), 1);
        assert!(state.current_stack_id.is_none());
        assert_eq!(state.saved_stacks.len(), 1);
    }
}
