use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::TableError;

pub const ONLINE: &str = "Online";
pub const FALLBACK_ZONE: &str = "London";

const DEFAULT_LOCATIONS: &str = include_str!("../../data/locations.json");

// Outward code, optional space, inward code. Not anchored to word boundaries.
static POSTCODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z]{1,2}\d[A-Z\d]?)\s?(\d[A-Z]{2})").expect("valid postcode regex")
});

#[derive(Debug, Clone, Deserialize)]
pub struct PostcodeZone {
    pub zone: String,
    pub prefixes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordZone {
    pub zone: String,
    pub keywords: Vec<String>,
}

/// Ordered zone tables; the first matching entry wins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationTable {
    #[serde(default)]
    pub postcodes: Vec<PostcodeZone>,
    #[serde(default)]
    pub keywords: Vec<KeywordZone>,
}

impl LocationTable {
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let mut table: LocationTable = serde_json::from_str(json)?;
        for entry in &mut table.postcodes {
            entry.prefixes = uppercase_all(&entry.prefixes);
        }
        for entry in &mut table.keywords {
            entry.keywords = uppercase_all(&entry.keywords);
        }
        Ok(table)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, TableError> {
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|source| TableError::Io(path.to_path_buf(), source))?;
                Self::from_json(&contents)
            }
            None => Self::from_json(DEFAULT_LOCATIONS),
        }
    }

    /// Maps venue or address text onto a zone. "Online" beats any address,
    /// a postcode beats keywords, and unmatched text becomes "London".
    pub fn map_location(&self, text: &str) -> String {
        let upper = text.to_uppercase();
        if upper.contains("ONLINE") {
            return ONLINE.to_string();
        }

        if let Some(zone) = extract_outward_code(&upper).and_then(|code| self.zone_for_outward(&code))
        {
            return zone.to_string();
        }

        self.keywords
            .iter()
            .find(|entry| {
                entry
                    .keywords
                    .iter()
                    .any(|keyword| !keyword.is_empty() && upper.contains(keyword.as_str()))
            })
            .map(|entry| entry.zone.clone())
            .unwrap_or_else(|| FALLBACK_ZONE.to_string())
    }

    pub fn zone_for_outward(&self, outward: &str) -> Option<&str> {
        self.postcodes
            .iter()
            .find(|entry| {
                entry
                    .prefixes
                    .iter()
                    .any(|prefix| !prefix.is_empty() && outward.starts_with(prefix.as_str()))
            })
            .map(|entry| entry.zone.as_str())
    }
}

/// First postcode-shaped token's outward code, e.g. "EC1V" from "EC1V 9HL".
/// Expects uppercased input.
pub fn extract_outward_code(upper: &str) -> Option<String> {
    POSTCODE_RE
        .captures(upper)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn uppercase_all(values: &[String]) -> Vec<String> {
    values.iter().map(|value| value.trim().to_uppercase()).collect()
}
