//! Install command generation.
//!
//! Two output formats:
//! - [`InstallMode::Reference`]: one installer invocation per item, in input
//!   order, for users who have the reference manager installed.
//! - [`InstallMode::Script`]: a self-contained bash script grouped by type.
//!   Skills and agents are fetched directly; commands and settings can only be
//!   installed through the reference manager and are emitted as comments.
//!
//! Generation never touches the network or the catalog. The script's
//! timestamp line is the only part that varies between calls.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::error::StackError;
use crate::stack::{ItemType, StackItem};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    #[default]
    Reference,
    Script,
}

impl FromStr for InstallMode {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" | "ref" => Ok(Self::Reference),
            "script" | "bash" => Ok(Self::Script),
            other => Err(StackError::invalid_input(format!(
                "unknown install mode '{}' (expected reference or script)",
                other
            ))),
        }
    }
}

/// Renders item lists into installer text.
#[derive(Debug, Clone, Default)]
pub struct CommandGenerator {
    config: GeneratorConfig,
}

impl CommandGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Renders `items` using the current wall-clock time for the script header.
    pub fn generate(&self, items: &[StackItem], mode: InstallMode) -> String {
        self.generate_at(items, mode, Utc::now())
    }

    /// Renders `items` with an explicit generation time.
    pub fn generate_at(&self, items: &[StackItem], mode: InstallMode, at: DateTime<Utc>) -> String {
        match mode {
            InstallMode::Reference => self.reference(items),
            InstallMode::Script => self.script(items, at),
        }
    }

    fn install_line(&self, item: &StackItem) -> String {
        format!(
            "{} install {} --type {}",
            shell_words::quote(&self.config.installer),
            shell_words::quote(&item.slug),
            item.item_type
        )
    }

    fn reference(&self, items: &[StackItem]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Install with {}", self.config.installer);
        let _ = writeln!(out, "# {} item(s), run each line in order", items.len());
        for item in items {
            out.push_str(&self.install_line(item));
            out.push('\n');
        }
        out
    }

    fn script(&self, items: &[StackItem], at: DateTime<Utc>) -> String {
        let root = self.config.install_root.trim_end_matches('/');
        let base = self.config.raw_base_url.trim_end_matches('/');

        let mut out = String::new();
        out.push_str("#!/usr/bin/env bash\n");
        let _ = writeln!(out, "# Generated {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        out.push_str("set -euo pipefail\n");

        if items.is_empty() {
            out.push_str("\n# Stack is empty; nothing to install.\n");
            return out;
        }

        for item_type in ItemType::CANONICAL_ORDER {
            let group: Vec<&StackItem> = items
                .iter()
                .filter(|item| item.item_type == item_type)
                .collect();
            if group.is_empty() {
                continue;
            }

            let heading = capitalize(item_type.plural());
            let _ = writeln!(out, "\n# {} ({})", heading, group.len());

            if item_type.is_directly_fetchable() {
                let dir = format!("{}/{}", root, item_type.plural());
                let _ = writeln!(out, "mkdir -p {}", shell_words::quote(&dir));
                for item in group {
                    let Some(relative) = fetch_path(item) else {
                        continue;
                    };
                    let _ = writeln!(out, "# {}", single_line(&item.name));
                    let _ = writeln!(
                        out,
                        "curl -fsSL --create-dirs -o {} {}",
                        shell_words::quote(&format!("{}/{}", root, relative)),
                        shell_words::quote(&format!("{}/{}", base, relative))
                    );
                }
            } else {
                let _ = writeln!(
                    out,
                    "# {} cannot be fetched directly; install them with {}:",
                    heading, self.config.installer
                );
                for item in group {
                    let _ = writeln!(out, "# {}", self.install_line(item));
                }
            }
        }

        out
    }
}

/// Where a directly fetchable item lives, relative to both the install root
/// and the raw download root. `None` for types with no single file to fetch.
fn fetch_path(item: &StackItem) -> Option<String> {
    match item.item_type {
        ItemType::Skill => Some(format!("skills/{}/SKILL.md", item.slug)),
        ItemType::Agent => Some(format!("agents/{}.md", item.slug)),
        ItemType::Command | ItemType::Setting => None,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Display names are stale catalog copies; keep them from breaking out of a comment.
fn single_line(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
