use anyhow::{Result, bail};
use stackshare_application::StackStore;

pub fn save(store: &StackStore, name: &str, description: Option<String>) -> Result<()> {
    match store.save_stack(name, description)? {
        Some(stack) => {
            println!(
                "Saved '{}' ({}, {} item(s))",
                stack.name,
                stack.id,
                stack.item_count()
            );
            Ok(())
        }
        None => bail!("A new stack needs a non-empty name"),
    }
}

pub fn load(store: &StackStore, id: &str) -> Result<()> {
    if store.load_stack(id)? {
        println!("Loaded {} ({} item(s))", id, store.items().len());
    } else {
        println!("No stack with id {}", id);
    }
    Ok(())
}

pub fn delete(store: &StackStore, id: &str) -> Result<()> {
    if store.delete_stack(id)? {
        println!("Deleted {}", id);
    } else {
        println!("No stack with id {}", id);
    }
    Ok(())
}

pub fn rename(store: &StackStore, id: &str, name: &str, description: Option<String>) -> Result<()> {
    if store.rename_stack(id, name, description)? {
        println!("Renamed {} to '{}'", id, name.trim());
    } else {
        println!("Nothing renamed (unknown id or blank name)");
    }
    Ok(())
}

pub fn list(store: &StackStore) {
    let current = store.current_stack_id();
    let stacks = store.saved_stacks();
    if stacks.is_empty() {
        println!("No saved stacks");
        return;
    }

    for stack in stacks {
        let marker = if current.as_deref() == Some(stack.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {:<24} {:>3} item(s)  updated {}",
            marker,
            stack.id,
            stack.name,
            stack.item_count(),
            stack.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}
