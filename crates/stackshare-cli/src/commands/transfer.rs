use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use stackshare_application::StackStore;
use stackshare_core::generator::InstallMode;

pub fn export(store: &StackStore, stack: Option<&str>, output: Option<&Path>) -> Result<()> {
    let Some(text) = store.export_stack(stack)? else {
        bail!("No stack with id {}", stack.unwrap_or_default());
    };

    match output {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

pub fn import(store: &StackStore, file: &Path) -> Result<()> {
    let text = if file == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?
    };

    match store.import_stack(&text)? {
        Some(stack) => {
            println!(
                "Imported '{}' as {} ({} item(s))",
                stack.name,
                stack.id,
                stack.item_count()
            );
            Ok(())
        }
        None => bail!("Not a valid stack export"),
    }
}

pub fn share(store: &StackStore, stack: Option<&str>) -> Result<()> {
    let Some(link) = store.share_stack(stack)? else {
        bail!("No stack with id {}", stack.unwrap_or_default());
    };

    println!("{}", link.url);
    if link.omitted > 0 {
        eprintln!(
            "note: {} item(s) were left out to keep the link short",
            link.omitted
        );
    }
    Ok(())
}

pub fn open(store: &StackStore, url: &str, adopt: bool) -> Result<()> {
    let Some(shared) = store.open_shared(url) else {
        bail!("Not a valid share link");
    };

    println!("Shared stack: {}", shared.name.as_deref().unwrap_or("(unnamed)"));
    for item in &shared.items {
        println!("  {:<32} {}", item.id, item.name);
    }
    if shared.is_partial() {
        println!("  ... and {} more not included in the link", shared.omitted);
    }

    if adopt {
        let added = store.adopt_shared(&shared)?;
        println!("Added {} new item(s) to the working set", added);
    }
    Ok(())
}

pub fn generate(store: &StackStore, mode: InstallMode, stack: Option<&str>) -> Result<()> {
    let Some(text) = store.generate_commands(stack, mode) else {
        bail!("No stack with id {}", stack.unwrap_or_default());
    };
    print!("{}", text);
    Ok(())
}
