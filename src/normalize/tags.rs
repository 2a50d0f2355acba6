use std::collections::BTreeMap;
use std::path::Path;

use super::TableError;

pub const OTHER_TAG: &str = "Other";

const DEFAULT_TAG_MAP: &str = include_str!("../../data/tag_map.json");

/// Raw tags are looked up by their normalized form; the title/description
/// scan matches keys as written, only lowercased. Both maps are sorted so the
/// scan visits keys in a stable order.
#[derive(Debug, Clone, Default)]
pub struct TagTable {
    entries: BTreeMap<String, String>,
    keywords: BTreeMap<String, String>,
}

impl TagTable {
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
        let mut table = Self::default();
        for (key, canonical) in raw {
            let canonical = canonical.trim();
            if canonical.is_empty() {
                continue;
            }
            let normalized = normalize_tag(&key);
            if !normalized.is_empty() {
                table.entries.insert(normalized, canonical.to_string());
            }
            let keyword = key.trim().to_lowercase();
            if !keyword.is_empty() {
                table.keywords.insert(keyword, canonical.to_string());
            }
        }
        Ok(table)
    }

    /// Reads the table from `path`, or the bundled table when no path is set.
    pub fn load(path: Option<&Path>) -> Result<Self, TableError> {
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|source| TableError::Io(path.to_path_buf(), source))?;
                Self::from_json(&contents)
            }
            None => Self::from_json(DEFAULT_TAG_MAP),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn canonical(&self, normalized: &str) -> Option<&str> {
        self.entries.get(normalized).map(String::as_str)
    }

    /// Maps raw source tags onto the canonical vocabulary, then adds any
    /// canonical tag whose key appears in the title or description. Never
    /// returns an empty list.
    pub fn process_tags<S: AsRef<str>>(
        &self,
        raw_tags: &[S],
        title: &str,
        description: &str,
    ) -> Vec<String> {
        let cleaned = raw_tags
            .iter()
            .map(AsRef::as_ref)
            .filter(|tag| !tag.trim().is_empty());

        let mut result: Vec<String> = Vec::new();
        for normalized in dedup_tags(cleaned) {
            if let Some(canonical) = self.canonical(&normalized) {
                push_unique(&mut result, canonical);
            }
        }

        let content = format!("{title} {description}").to_lowercase();
        for (keyword, canonical) in &self.keywords {
            if content.contains(keyword.as_str()) {
                push_unique(&mut result, canonical);
            }
        }

        if result.is_empty() {
            result.push(OTHER_TAG.to_string());
        }
        result
    }
}

/// Lowercases, turns `_` and `-` into spaces, collapses whitespace.
pub fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes every tag and drops repeats, keeping the first occurrence.
pub fn dedup_tags<'a, I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = Vec::new();
    for tag in tags {
        let normalized = normalize_tag(tag);
        if !seen.contains(&normalized) {
            seen.push(normalized);
        }
    }
    seen
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    if !tags.iter().any(|existing| existing == tag) {
        tags.push(tag.to_string());
    }
}
