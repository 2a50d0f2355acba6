use std::collections::HashMap;

use chrono::NaiveDate;
use chrono_tz::Tz;

use super::datetime::{self, EventDateTime};
use super::location::{LocationTable, FALLBACK_ZONE};
use super::tags::TagTable;
use crate::models::{CanonicalEvent, RawEventFields};

pub const UNTITLED: &str = "Untitled";

/// Listings are London events; ISO timestamps are shown in London time.
pub const LOCAL_TIMEZONE: Tz = chrono_tz::Europe::London;

/// Read-only tables plus the date used to infer missing years. Safe to share
/// across threads.
#[derive(Debug, Clone)]
pub struct Normalizer {
    tags: TagTable,
    locations: LocationTable,
    reference: NaiveDate,
}

impl Normalizer {
    pub fn new(tags: TagTable, locations: LocationTable, reference: NaiveDate) -> Self {
        Self {
            tags,
            locations,
            reference,
        }
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    pub fn assemble(&self, raw: &RawEventFields) -> CanonicalEvent {
        let title = non_blank(&raw.title).unwrap_or(UNTITLED).to_string();
        let description = non_blank(&raw.description).unwrap_or_default().to_string();
        let when = self.resolve_datetime(raw);
        let location = match non_blank(&raw.location_text) {
            Some(text) => self.locations.map_location(text),
            None => FALLBACK_ZONE.to_string(),
        };
        let tags = self.tags.process_tags(raw.tags.as_slice(), &title, &description);

        CanonicalEvent {
            id: non_blank(&raw.id).map(str::to_string),
            title,
            description,
            date: when.map(|dt| dt.date_string()),
            time: when.map(|dt| dt.time_string()),
            location,
            tags,
            link: non_blank(&raw.link).unwrap_or_default().to_string(),
            img: non_blank(&raw.img).map(str::to_string),
        }
    }

    /// Assembles every record, then collapses repeated ids.
    pub fn assemble_all(&self, raws: &[RawEventFields]) -> Vec<CanonicalEvent> {
        dedup_events(raws.iter().map(|raw| self.assemble(raw)).collect())
    }

    fn resolve_datetime(&self, raw: &RawEventFields) -> Option<EventDateTime> {
        let prior = datetime::parse_structured(raw.start_date.as_deref(), raw.start_time.as_deref())
            .or_else(|| {
                raw.start_iso
                    .as_deref()
                    .and_then(|iso| datetime::format_iso_datetime(iso, LOCAL_TIMEZONE))
            });

        let Some(text) = non_blank(&raw.datetime_text) else {
            return prior;
        };
        match datetime::parse_datetime_text(text, self.reference) {
            Some(parsed) => Some(parsed),
            None => {
                log::debug!(
                    "unparseable datetime {text:?} for {}; keeping prior value",
                    non_blank(&raw.link).unwrap_or("unknown event")
                );
                prior
            }
        }
    }
}

/// Keeps one record per id. A repeated id replaces the earlier record in
/// its original position; records without an id are all kept.
pub fn dedup_events(events: Vec<CanonicalEvent>) -> Vec<CanonicalEvent> {
    let mut out: Vec<CanonicalEvent> = Vec::with_capacity(events.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for event in events {
        match event.id.clone() {
            Some(id) => match positions.get(&id) {
                Some(&index) => out[index] = event,
                None => {
                    positions.insert(id, out.len());
                    out.push(event);
                }
            },
            None => out.push(event),
        }
    }
    out
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(
            TagTable::load(None).expect("tag table"),
            LocationTable::load(None).expect("location table"),
            NaiveDate::from_ymd_opt(2025, 6, 1).expect("reference date"),
        )
    }

    fn raw(id: Option<&str>, title: &str) -> RawEventFields {
        RawEventFields {
            id: id.map(str::to_string),
            title: Some(title.to_string()),
            link: Some(format!("https://example.com/{}", id.unwrap_or("none"))),
            ..RawEventFields::default()
        }
    }

    #[test]
    fn assembles_a_scraped_detail_page() {
        let event = normalizer().assemble(&RawEventFields {
            id: Some("meetup-305112233".to_string()),
            source: Some("meetup".to_string()),
            title: Some("  London Rust Networking Night ".to_string()),
            datetime_text: Some("Tue, 10 Jun 2025 18:00".to_string()),
            start_iso: Some("2025-06-10T17:30:00+01:00".to_string()),
            location_text: Some("CodeNode, 10 South Place, EC2M 7EB".to_string()),
            tags: vec!["Software-Development".to_string(), "Meetups".to_string()],
            link: Some("https://www.meetup.com/rust-london/events/305112233/".to_string()),
            ..RawEventFields::default()
        });

        assert_eq!(event.id.as_deref(), Some("meetup-305112233"));
        assert_eq!(event.title, "London Rust Networking Night");
        assert_eq!(event.date.as_deref(), Some("2025-06-10"));
        assert_eq!(event.time.as_deref(), Some("18:00"));
        assert_eq!(event.location, "City of London");
        assert_eq!(
            event.tags,
            vec!["Software Development".to_string(), "Networking".to_string()]
        );
        assert_eq!(event.description, "");
        assert_eq!(event.img, None);
    }

    #[test]
    fn unparseable_text_keeps_structured_values() {
        let event = normalizer().assemble(&RawEventFields {
            datetime_text: Some("whenever, soon".to_string()),
            start_date: Some("2025-07-01".to_string()),
            start_time: Some("19:00".to_string()),
            ..RawEventFields::default()
        });
        assert_eq!(event.date.as_deref(), Some("2025-07-01"));
        assert_eq!(event.time.as_deref(), Some("19:00"));
    }

    #[test]
    fn partial_datetime_leaves_both_empty() {
        let event = normalizer().assemble(&RawEventFields {
            start_date: Some("2025-07-01".to_string()),
            ..RawEventFields::default()
        });
        assert_eq!(event.date, None);
        assert_eq!(event.time, None);
    }

    #[test]
    fn empty_record_gets_defaults() {
        let event = normalizer().assemble(&RawEventFields::default());
        assert_eq!(event.id, None);
        assert_eq!(event.title, UNTITLED);
        assert_eq!(event.location, FALLBACK_ZONE);
        assert_eq!(event.tags, vec!["Other".to_string()]);
        assert_eq!(event.link, "");
    }

    #[test]
    fn later_record_with_same_id_wins() {
        let normalizer = normalizer();
        let events = normalizer.assemble_all(&[
            raw(Some("eventbrite-1"), "Old title"),
            raw(Some("eventbrite-2"), "Other event"),
            raw(Some("eventbrite-1"), "New title"),
        ]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id.as_deref(), Some("eventbrite-1"));
        assert_eq!(events[0].title, "New title");
        assert_eq!(events[1].title, "Other event");
    }

    #[test]
    fn records_without_ids_are_all_kept() {
        let events = normalizer().assemble_all(&[raw(None, "First"), raw(None, "Second")]);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn reassembling_canonical_records_is_stable() {
        let normalizer = normalizer();
        let first = normalizer.assemble_all(&[
            RawEventFields {
                id: Some("eventbrite-42".to_string()),
                title: Some("Women in Tech Breakfast".to_string()),
                description: Some("Careers chat over coffee".to_string()),
                start_date: Some("2025-06-20".to_string()),
                start_time: Some("08:30:00".to_string()),
                location_text: Some("Runway East, 20 St Thomas St, SE1 9RS".to_string()),
                tags: vec!["Diversity".to_string(), "Business_Networking".to_string()],
                link: Some("https://www.eventbrite.co.uk/e/tickets-42".to_string()),
                img: Some("https://img.evbuc.com/42.jpg".to_string()),
                ..RawEventFields::default()
            },
            RawEventFields {
                title: Some("Hybrid AI Hack Night".to_string()),
                datetime_text: Some("Friday, June 13 · 5:30 - 8:30pm GMT+1".to_string()),
                location_text: Some("Online event".to_string()),
                ..RawEventFields::default()
            },
        ]);

        let raws: Vec<RawEventFields> = first.iter().map(CanonicalEvent::to_raw).collect();
        let second = normalizer.assemble_all(&raws);
        assert_eq!(first, second);
    }
}
