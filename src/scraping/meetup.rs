use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use super::base;
use super::{EventSource, ScrapeOptions};
use crate::models::RawEventFields;

const SOURCE_ID: &str = "meetup";
const SOURCE_NAME: &str = "Meetup";

static EVENT_CARD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[data-event-label="Revamped Event Card"]"#).expect("meetup card selector")
});
static VISIBILITY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.capitalize").expect("meetup visibility selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1").expect("meetup title selector"));
static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time").expect("meetup time selector"));
static VENUE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-testid="venue-name-value"]"#).expect("meetup venue selector")
});
static LOCATION_INFO_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-testid="location-info"]"#).expect("meetup location selector")
});
static TOPIC_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".tag--topic").expect("meetup topic selector"));
static DESCRIPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:description"]"#).expect("meetup description selector")
});
static IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"]"#).expect("meetup image selector")
});
static EVENT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/events/(\d+)").expect("meetup event id regex"));

/// The listing page yields event links; each detail page is scraped in turn.
pub struct Meetup {
    listing_url: String,
}

impl Meetup {
    pub fn new(listing_url: &str) -> Self {
        Self {
            listing_url: listing_url.to_string(),
        }
    }
}

impl EventSource for Meetup {
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
        if options.pages > 1 {
            log::debug!("Meetup lists a single page; ignoring pages={}", options.pages);
        }
        log::info!("Navigating to Meetup...");
        let html = base::retry(&options.retry, &self.listing_url, || {
            base::fetch_html(&self.listing_url)
        })?;

        let links = parse_listing(&html, &self.listing_url);
        log::info!("Found {} unique event links.", links.len());

        let mut events = Vec::new();
        for url in links {
            let detail = base::retry(&options.retry, &url, || base::fetch_html(&url));
            match detail {
                Ok(html) => match parse_detail(&url, &html) {
                    Some(event) => events.push(event),
                    None => log::info!("Skipping private group event."),
                },
                Err(err) => log::warn!("Skipping {url}: {err:#}"),
            }
        }
        Ok(events)
    }
}

pub(crate) fn parse_listing(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    base::unique_links(&document, &EVENT_CARD_SELECTOR, base_url)
}

/// Extracts one detail page. Private group events yield `None`.
pub(crate) fn parse_detail(url: &str, html: &str) -> Option<RawEventFields> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let is_private = base::first_text(&root, &VISIBILITY_SELECTOR)
        .map(|text| text.to_lowercase() == "private")
        .unwrap_or(false);
    if is_private {
        return None;
    }

    let time = root.select(&TIME_SELECTOR).next();
    let start_iso = time
        .and_then(|el| el.value().attr("datetime"))
        .map(str::to_string);
    let datetime_text = time.map(base::inner_text).filter(|text| !text.is_empty());

    let venue = base::first_text(&root, &VENUE_SELECTOR);
    let location_text = match venue {
        Some(ref venue) if venue.to_lowercase().contains("online event") => {
            Some("Online".to_string())
        }
        _ => base::first_text(&root, &LOCATION_INFO_SELECTOR),
    };

    let id = EVENT_ID_RE
        .captures(url)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| url.to_string());

    Some(RawEventFields {
        id: Some(base::stable_id(SOURCE_ID, &id)),
        source: Some(SOURCE_ID.to_string()),
        title: base::first_text(&root, &TITLE_SELECTOR),
        description: base::first_attr(&root, &DESCRIPTION_SELECTOR, "content"),
        datetime_text,
        start_date: None,
        start_time: None,
        start_iso,
        location_text,
        tags: base::all_texts(&document, &TOPIC_SELECTOR),
        link: Some(url.to_string()),
        img: base::first_attr(&root, &IMAGE_SELECTOR, "content"),
    })
}
