//! Word file loading
//!
//! One word per line, optionally followed by comma-separated list ids:
//!
//! ```text
//! # core vocabulary
//! huis    week-1,home
//! boom    week-1
//! kat
//! ```

use std::fs;
use std::path::Path;

use anyhow::Context;
use lexis_core::StaticCatalog;

/// Parse the word file text into a catalog
pub fn parse_words(text: &str) -> StaticCatalog {
    let catalog = StaticCatalog::new();
    let mut lists: Vec<(String, Vec<String>)> = Vec::new();

    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else { continue };
        catalog.add_word(word);

        for list in parts.flat_map(|p| p.split(',')).filter(|l| !l.is_empty()) {
            match lists.iter_mut().find(|(id, _)| id.as_str() == list) {
                Some((_, members)) => members.push(word.to_string()),
                None => lists.push((list.to_string(), vec![word.to_string()])),
            }
        }
    }

    for (id, members) in lists {
        catalog.set_list(id, members);
    }
    catalog
}

pub fn load_words(path: &Path) -> anyhow::Result<StaticCatalog> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read word file {}", path.display()))?;
    let catalog = parse_words(&text);
    tracing::debug!("Loaded {} words from {}", catalog.len(), path.display());
    Ok(catalog)
}
