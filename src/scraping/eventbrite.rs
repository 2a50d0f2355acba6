use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use super::base;
use super::{EventSource, ScrapeOptions};
use crate::models::RawEventFields;

const SOURCE_ID: &str = "eventbrite";
const SOURCE_NAME: &str = "Eventbrite";
const API_BATCH_SIZE: usize = 10;
const API_EXPAND: &str = "event_sales_status,image,primary_venue,saves,ticket_availability,primary_organizer,public_collections";

static EVENT_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.event-card-link").expect("eventbrite link selector"));
static TICKETS_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"tickets-(\d+)").expect("eventbrite id regex"));

/// Events stay untyped until each one is decoded on its own, so a malformed
/// record cannot fail its batch.
#[derive(Debug, Deserialize)]
struct DestinationResponse {
    #[serde(default)]
    events: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: Option<Value>,
    name: Option<String>,
    summary: Option<String>,
    start_date: Option<String>,
    start_time: Option<String>,
    url: Option<String>,
    is_online_event: Option<bool>,
    primary_venue: Option<ApiVenue>,
    tags: Option<Vec<ApiTag>>,
    image: Option<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiVenue {
    name: Option<String>,
    address: Option<ApiAddress>,
}

#[derive(Debug, Deserialize)]
struct ApiAddress {
    localized_address_display: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTag {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: Option<String>,
}

/// Listing pages yield event ids; details come from the destination API.
pub struct Eventbrite {
    listing_url: String,
    api_url: String,
}

impl Eventbrite {
    pub fn new(listing_url: &str, api_url: &str) -> Self {
        Self {
            listing_url: listing_url.to_string(),
            api_url: api_url.to_string(),
        }
    }

    fn batch_url(&self, ids: &[String]) -> Result<String> {
        let url = reqwest::Url::parse_with_params(
            &self.api_url,
            [
                ("event_ids", ids.join(",").as_str()),
                ("expand", API_EXPAND),
            ],
        )?;
        Ok(url.into())
    }
}

impl EventSource for Eventbrite {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn listing_url(&self) -> &str {
        &self.listing_url
    }

    fn fetch(&self, options: &ScrapeOptions) -> Result<Vec<RawEventFields>> {
        let mut ids: Vec<String> = Vec::new();
        for page in 1..=options.pages.max(1) {
            let url = base::page_url(&self.listing_url, page)?;
            log::info!("Navigating to Eventbrite page {page}...");
            let html = base::retry(&options.retry, &url, || base::fetch_html(&url))?;
            for id in parse_listing(&html) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }

        if ids.is_empty() {
            log::error!("No event IDs found.");
            return Ok(Vec::new());
        }
        log::info!("Found {} event IDs.", ids.len());

        let mut events = Vec::new();
        for batch in ids.chunks(API_BATCH_SIZE) {
            let url = self.batch_url(batch)?;
            let fetched = base::retry(&options.retry, "eventbrite api batch", || {
                base::fetch_json::<DestinationResponse>(&url)
            });
            match fetched {
                Ok(response) => events.extend(decode_events(response)),
                Err(err) => log::error!("Error fetching batch {}: {err:#}", batch.join(",")),
            }
        }
        Ok(events)
    }
}

/// Numeric event ids from listing card links, first occurrence kept.
pub(crate) fn parse_listing(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut ids: Vec<String> = Vec::new();
    for link in document.select(&EVENT_LINK_SELECTOR) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if let Some(caps) = TICKETS_ID_RE.captures(href) {
            let id = caps[1].to_string();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

pub(crate) fn parse_api_response(json: &str) -> Result<Vec<RawEventFields>> {
    let response: DestinationResponse = serde_json::from_str(json)?;
    Ok(decode_events(response))
}

fn decode_events(response: DestinationResponse) -> Vec<RawEventFields> {
    response
        .events
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ApiEvent>(value) {
            Ok(event) => Some(into_raw(event)),
            Err(err) => {
                log::warn!("Skipping malformed Eventbrite event: {err}");
                None
            }
        })
        .collect()
}

fn into_raw(event: ApiEvent) -> RawEventFields {
    let id = event.id.as_ref().and_then(id_string);
    let location_text = if event.is_online_event.unwrap_or(false) {
        Some("Online".to_string())
    } else {
        event.primary_venue.and_then(|venue| {
            venue
                .address
                .and_then(|address| address.localized_address_display)
                .or(venue.name)
        })
    };

    RawEventFields {
        id: id.map(|id| base::stable_id(SOURCE_ID, &id)),
        source: Some(SOURCE_ID.to_string()),
        title: event.name,
        description: event.summary,
        datetime_text: None,
        start_date: event.start_date,
        start_time: event.start_time,
        start_iso: None,
        location_text,
        tags: event
            .tags
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tag| tag.display_name)
            .collect(),
        link: event.url,
        img: event.image.and_then(|image| image.url),
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
