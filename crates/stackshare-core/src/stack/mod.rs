//! Stack domain: items, saved stacks, store state and its transitions.
//!
//! A stack is a named, ordered collection of references to catalog items.
//! The working set is the possibly-unsaved list currently being edited.

mod model;
mod reducer;
mod state;

pub use model::{ItemType, SavedStack, StackItem, dedupe_items};
pub use reducer::{
    IMPORTED_STACK_NAME, MutationContext, Reduction, StackAction, reduce,
};
pub use state::StackState;
