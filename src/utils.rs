use dirs::data_dir;
use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::models::CanonicalEvent;

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let base = data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    base.join("tech-events")
});

pub fn data_root() -> PathBuf {
    DATA_ROOT.clone()
}

pub fn database_path() -> PathBuf {
    data_root().join("tech-events.sqlite")
}

pub fn config_path() -> PathBuf {
    data_root().join("config.json")
}

pub fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            log::warn!("failed to create parent {:?}: {err}", parent);
        }
    }
}

/// Writes events as pretty JSON. With `append`, events already in the file
/// come first.
pub fn save_json(path: &Path, events: &[CanonicalEvent], append: bool) -> Result<usize> {
    let mut output: Vec<CanonicalEvent> = Vec::new();
    if append && path.exists() {
        let existing = fs::read_to_string(path)
            .with_context(|| format!("unable to read existing events file {path:?}"))?;
        output = serde_json::from_str(&existing)
            .with_context(|| format!("existing events file {path:?} is not an event list"))?;
    }
    output.extend_from_slice(events);

    ensure_parent(path);
    let contents = serde_json::to_string_pretty(&output)?;
    fs::write(path, contents).with_context(|| format!("unable to write {path:?}"))?;
    Ok(output.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str) -> CanonicalEvent {
        CanonicalEvent {
            id: Some(format!("meetup-{title}")),
            title: title.to_string(),
            description: String::new(),
            date: None,
            time: None,
            location: "Online".to_string(),
            tags: vec!["Other".to_string()],
            link: String::new(),
            img: None,
        }
    }

    #[test]
    fn saves_and_appends() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("events.json");

        assert_eq!(save_json(&path, &[event("a")], false).expect("write"), 1);
        assert_eq!(
            save_json(&path, &[event("b"), event("c")], true).expect("append"),
            3
        );
        assert_eq!(save_json(&path, &[event("d")], false).expect("overwrite"), 1);

        let saved: Vec<CanonicalEvent> =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(saved, vec![event("d")]);
    }
}
