use anyhow::Result;
use stackshare_application::StackStore;
use stackshare_core::stack::{ItemType, StackItem};

pub fn add(
    store: &StackStore,
    item_type: ItemType,
    slug: String,
    name: Option<String>,
    category: Option<String>,
) -> Result<()> {
    let mut item = StackItem::new(item_type, slug, name.unwrap_or_default());
    if let Some(category) = category {
        item = item.with_category(category);
    }
    let id = item.id.clone();

    if store.add_item(item)? {
        println!("Added {}", id);
    } else {
        println!("{} is already in the stack", id);
    }
    Ok(())
}

pub fn remove(store: &StackStore, id: &str) -> Result<()> {
    if store.remove_item(id)? {
        println!("Removed {}", id);
    } else {
        println!("{} is not in the stack", id);
    }
    Ok(())
}

pub fn clear(store: &StackStore) -> Result<()> {
    store.clear_stack()?;
    println!("Working set cleared");
    Ok(())
}

pub fn new_stack(store: &StackStore) -> Result<()> {
    store.new_stack()?;
    println!("Started a new, unsaved stack");
    Ok(())
}

pub fn list(store: &StackStore, item_type: Option<ItemType>) {
    let items = match item_type {
        Some(item_type) => store.items_of_type(item_type),
        None => store.items(),
    };

    match store.current_stack_id().and_then(|id| store.get_stack(&id)) {
        Some(stack) => println!("Stack: {} ({})", stack.name, stack.id),
        None => println!("Stack: (unsaved)"),
    }

    if items.is_empty() {
        println!("  (empty)");
        return;
    }
    for item in items {
        match &item.category {
            Some(category) => println!("  {:<32} {} [{}]", item.id, item.name, category),
            None => println!("  {:<32} {}", item.id, item.name),
        }
    }
}
