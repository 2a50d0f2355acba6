use serde::{Deserialize, Serialize};

/// Fields as scraped from a listing or detail page, or an API response.
/// Nothing here is validated; any field may be absent or malformed.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RawEventFields {
    pub id: Option<String>,
    pub source: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub datetime_text: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub start_iso: Option<String>,
    pub location_text: Option<String>,
    pub tags: Vec<String>,
    pub link: Option<String>,
    pub img: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CanonicalEvent {
    pub id: Option<String>, // dedup key, e.g. "eventbrite-123456789"
    pub title: String,
    pub description: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: String,
    pub tags: Vec<String>,
    pub link: String,
    pub img: Option<String>,
}

impl CanonicalEvent {
    /// Turns a canonical record back into raw fields. Assembling the result
    /// again reproduces the same record.
    pub fn to_raw(&self) -> RawEventFields {
        RawEventFields {
            id: self.id.clone(),
            source: None,
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            datetime_text: None,
            start_date: self.date.clone(),
            start_time: self.time.clone(),
            start_iso: None,
            location_text: Some(self.location.clone()),
            tags: self.tags.clone(),
            link: Some(self.link.clone()),
            img: self.img.clone(),
        }
    }
}
