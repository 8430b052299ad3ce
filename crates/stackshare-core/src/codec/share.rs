//! Share link codec.
//!
//! A share link is `<base_url>?<token>`, where the token is the unpadded
//! URL-safe base64 of a compact JSON payload:
//!
//! ```text
//! { "v": 1, "n": "<name>", "i": [{ "d": id, "s": slug, "t": type, "n": name, "c": category }], "x": omitted }
//! ```
//!
//! Only slug and type are required per entry; the receiving side can
//! re-derive display data from the catalog. `d` is written only for items
//! whose id is not the derived `"<type>:<slug>"`.
//!
//! When the URL would exceed the configured budget the payload is compacted
//! in a fixed order until it fits: categories are dropped, then item names,
//! then whole items (settings first, then commands, agents, skills; the most
//! recently added first within a type). `x` records how many items were
//! dropped so the receiver can say the link is partial.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::config::ShareConfig;
use crate::error::{Result, StackError};
use crate::stack::{ItemType, StackItem, dedupe_items};

/// Payload version written by this build.
pub const SHARE_PAYLOAD_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ShareEntry {
    /// Item id, present only when it is not the derived `"<type>:<slug>"`.
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "s")]
    slug: String,
    #[serde(rename = "t")]
    item_type: ItemType,
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
}

impl From<&StackItem> for ShareEntry {
    fn from(item: &StackItem) -> Self {
        let derived = StackItem::composite_id(item.item_type, &item.slug);
        Self {
            id: (item.id != derived).then(|| item.id.clone()),
            slug: item.slug.clone(),
            item_type: item.item_type,
            // The decoder falls back to the slug, so an identical name is redundant.
            name: (item.name != item.slug).then(|| item.name.clone()),
            category: item.category.clone(),
        }
    }
}

impl ShareEntry {
    fn into_item(self) -> StackItem {
        let name = self.name.unwrap_or_default();
        let mut item = StackItem::new(self.item_type, self.slug, name);
        if let Some(id) = self.id.filter(|id| !id.trim().is_empty()) {
            item.id = id;
        }
        match self.category {
            Some(category) => item.with_category(category),
            None => item,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct SharePayload {
    v: u8,
    #[serde(rename = "n", skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "i")]
    items: Vec<ShareEntry>,
    #[serde(rename = "x", skip_serializing_if = "is_zero")]
    omitted: usize,
}

/// Decode-side payload: entries stay untyped so one bad entry can be dropped
/// without rejecting the link.
#[derive(Debug, Deserialize)]
struct RawSharePayload {
    v: u8,
    #[serde(rename = "n", default)]
    name: Option<String>,
    #[serde(rename = "i", default)]
    items: Vec<serde_json::Value>,
    #[serde(rename = "x", default)]
    omitted: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// A generated share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub url: String,
    /// Items left out to fit the URL budget.
    pub omitted: usize,
    /// True if any information (name tail, categories, names, items) was dropped.
    pub compacted: bool,
}

/// A decoded share link.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedStack {
    pub name: Option<String>,
    pub items: Vec<StackItem>,
    /// Items the sender had to leave out.
    pub omitted: usize,
}

impl SharedStack {
    pub fn is_partial(&self) -> bool {
        self.omitted > 0
    }
}

/// Builds a share URL for `items`, compacting the payload to fit
/// `config.max_url_length`.
pub fn generate_share_url(
    name: Option<&str>,
    items: &[StackItem],
    config: &ShareConfig,
) -> Result<ShareLink> {
    let full_name = name.map(str::trim).filter(|n| !n.is_empty());
    let short_name = full_name.map(|n| truncate_chars(n, config.max_name_chars));
    let mut compacted = match (full_name, short_name.as_deref()) {
        (Some(full), Some(short)) => full != short,
        _ => false,
    };

    let mut payload = SharePayload {
        v: SHARE_PAYLOAD_VERSION,
        name: short_name,
        items: dedupe_items(items.iter().cloned())
            .iter()
            .map(ShareEntry::from)
            .collect(),
        omitted: 0,
    };

    let mut url = render_url(&config.base_url, &payload)?;
    if fits(&url, config) {
        return Ok(ShareLink {
            url,
            omitted: 0,
            compacted,
        });
    }

    if payload.items.iter().any(|entry| entry.category.is_some()) {
        compacted = true;
        for entry in &mut payload.items {
            entry.category = None;
        }
        url = render_url(&config.base_url, &payload)?;
        if fits(&url, config) {
            return Ok(finish(url, &payload, compacted));
        }
    }

    if payload.items.iter().any(|entry| entry.name.is_some()) {
        compacted = true;
        for entry in &mut payload.items {
            entry.name = None;
        }
        url = render_url(&config.base_url, &payload)?;
        if fits(&url, config) {
            return Ok(finish(url, &payload, compacted));
        }
    }

    while let Some(index) = next_to_drop(&payload.items) {
        compacted = true;
        payload.items.remove(index);
        payload.omitted += 1;
        url = render_url(&config.base_url, &payload)?;
        if fits(&url, config) {
            break;
        }
    }

    if !fits(&url, config) {
        tracing::warn!(
            "Share URL is {} chars even without items (budget {})",
            url.len(),
            config.max_url_length
        );
    }

    Ok(finish(url, &payload, compacted))
}

fn finish(url: String, payload: &SharePayload, compacted: bool) -> ShareLink {
    if payload.omitted > 0 {
        tracing::warn!(
            "Share link omits {} item(s) to stay within the URL budget",
            payload.omitted
        );
    }
    ShareLink {
        url,
        omitted: payload.omitted,
        compacted,
    }
}

fn fits(url: &str, config: &ShareConfig) -> bool {
    url.len() <= config.max_url_length
}

/// Lowest share priority first; the latest entry among equals.
fn next_to_drop(entries: &[ShareEntry]) -> Option<usize> {
    entries
        .iter()
        .enumerate()
        .min_by_key(|(index, entry)| {
            (
                entry.item_type.share_priority(),
                std::cmp::Reverse(*index),
            )
        })
        .map(|(index, _)| index)
}

fn render_url(base_url: &str, payload: &SharePayload) -> Result<String> {
    let json = serde_json::to_vec(payload)?;
    let token = URL_SAFE_NO_PAD.encode(json);
    let base = base_url.trim_end_matches(['?', '&']);
    let separator = if base.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}{}", base, separator, token))
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Pulls the token out of a share URL, a `?key=token` URL, or a bare token.
///
/// The token itself never contains `=`, so a bare query parameter wins over
/// `key=value` pairs added by the base URL.
fn extract_token(input: &str) -> Result<&str> {
    let without_fragment = input.trim().split('#').next().unwrap_or_default();
    let query = match without_fragment.split_once('?') {
        Some((_, query)) => query,
        None => without_fragment,
    };
    let params: Vec<&str> = query
        .split('&')
        .map(str::trim)
        .filter(|param| !param.is_empty())
        .collect();
    let token = params
        .iter()
        .rev()
        .find(|param| !param.contains('='))
        .copied()
        .or_else(|| {
            params
                .first()
                .and_then(|param| param.split_once('='))
                .map(|(_, value)| value)
        })
        .unwrap_or_default()
        .trim();

    if token.is_empty() {
        return Err(StackError::invalid_input("share link has no token"));
    }
    Ok(token)
}

/// Decodes a share URL or bare token.
///
/// Entries with an unknown type or an empty slug are dropped; the catalog is
/// not consulted.
pub fn decode_share_token(input: &str) -> Result<SharedStack> {
    let token = extract_token(input)?;
    let bytes = URL_SAFE_NO_PAD.decode(token.trim_end_matches('='))?;
    let raw: RawSharePayload = serde_json::from_slice(&bytes)?;

    if raw.v != SHARE_PAYLOAD_VERSION {
        return Err(StackError::invalid_input(format!(
            "unsupported share payload version {}",
            raw.v
        )));
    }

    let total = raw.items.len();
    let entries: Vec<StackItem> = raw
        .items
        .into_iter()
        .filter_map(|value| serde_json::from_value::<ShareEntry>(value).ok())
        .filter(|entry| !entry.slug.trim().is_empty())
        .map(ShareEntry::into_item)
        .collect();
    if entries.len() < total {
        tracing::debug!(
            "Dropped {} malformed share entr(y/ies)",
            total - entries.len()
        );
    }

    Ok(SharedStack {
        name: raw.name.filter(|n| !n.trim().is_empty()),
        items: dedupe_items(entries),
        omitted: raw.omitted,
    })
}

/// [`decode_share_token`] with failures collapsed to `None`.
pub fn decode_share_url(input: &str) -> Option<SharedStack> {
    match decode_share_token(input) {
        Ok(shared) => Some(shared),
        Err(e) => {
            tracing::warn!("Rejected share link: {}", e);
            None
        }
    }
}
