pub mod base;
pub mod eventbrite;
pub mod meetup;

use std::time::Duration;

use anyhow::Error;

use crate::config::AppConfig;
use crate::models::RawEventFields;

/// How many times a fetch is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeOptions {
    /// Listing pages to walk, for sources that paginate.
    pub pages: u32,
    pub retry: RetryPolicy,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            pages: 1,
            retry: RetryPolicy::default(),
        }
    }
}

/// A platform that yields raw event fields. Sources only extract text;
/// normalization happens afterwards.
pub trait EventSource: Send + Sync {
    fn source_id(&self) -> &'static str;
    fn source_name(&self) -> &'static str;
    fn listing_url(&self) -> &str;
    fn fetch(&self, options: &ScrapeOptions) -> anyhow::Result<Vec<RawEventFields>>;
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SourceInfo {
    pub id: String,
    pub name: String,
    pub url: String,
}

pub fn active_sources(config: &AppConfig) -> Vec<Box<dyn EventSource>> {
    vec![
        Box::new(eventbrite::Eventbrite::new(
            &config.eventbrite_url,
            &config.eventbrite_api_url,
        )),
        Box::new(meetup::Meetup::new(&config.meetup_url)),
    ]
}

pub fn list_sources(sources: &[Box<dyn EventSource>]) -> Vec<SourceInfo> {
    sources
        .iter()
        .map(|source| SourceInfo {
            id: source.source_id().to_string(),
            name: source.source_name().to_string(),
            url: source.listing_url().to_string(),
        })
        .collect()
}

/// Runs every source in order. Individual failures are logged; the run only
/// fails when every source failed and nothing was scraped.
pub fn run_all(
    sources: &[Box<dyn EventSource>],
    options: &ScrapeOptions,
) -> anyhow::Result<Vec<RawEventFields>> {
    let mut events = Vec::new();
    let mut errors: Vec<(String, Error)> = Vec::new();

    for source in sources {
        let source_id = source.source_id().to_string();
        match source.fetch(options) {
            Ok(mut scraped) => {
                log::info!("{}: scraped {} events", source.source_name(), scraped.len());
                events.append(&mut scraped);
            }
            Err(err) => {
                log::error!("{source_id}: {err:#}");
                errors.push((source_id, err));
            }
        }
    }

    if events.is_empty() && !errors.is_empty() {
        let joined = errors
            .into_iter()
            .map(|(id, err)| format!("{id}: {err}"))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(anyhow::anyhow!("sources failed: {joined}"));
    }

    Ok(events)
}

pub fn run_single(
    sources: &[Box<dyn EventSource>],
    id: &str,
    options: &ScrapeOptions,
) -> anyhow::Result<Vec<RawEventFields>> {
    let source = sources
        .iter()
        .find(|source| source.source_id() == id)
        .ok_or_else(|| anyhow::anyhow!("unknown source id: {id}"))?;
    source.fetch(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Option<Vec<RawEventFields>>);

    impl EventSource for Fixed {
        fn source_id(&self) -> &'static str {
            self.0
        }

        fn source_name(&self) -> &'static str {
            self.0
        }

        fn listing_url(&self) -> &str {
            "https://example.com/"
        }

        fn fetch(&self, _options: &ScrapeOptions) -> anyhow::Result<Vec<RawEventFields>> {
            self.1
                .clone()
                .ok_or_else(|| anyhow::anyhow!("{} is down", self.0))
        }
    }

    fn titled(title: &str) -> RawEventFields {
        RawEventFields {
            title: Some(title.to_string()),
            ..RawEventFields::default()
        }
    }

    #[test]
    fn one_failing_source_does_not_abort_the_run() {
        let sources: Vec<Box<dyn EventSource>> = vec![
            Box::new(Fixed("broken", None)),
            Box::new(Fixed("working", Some(vec![titled("Rust Meetup")]))),
        ];
        let events = run_all(&sources, &ScrapeOptions::default()).expect("partial success");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn all_sources_failing_is_an_error() {
        let sources: Vec<Box<dyn EventSource>> =
            vec![Box::new(Fixed("a", None)), Box::new(Fixed("b", None))];
        let err = run_all(&sources, &ScrapeOptions::default()).expect_err("all failed");
        assert!(err.to_string().contains("a: a is down"));
    }

    #[test]
    fn runs_a_single_source_by_id() {
        let sources: Vec<Box<dyn EventSource>> = vec![
            Box::new(Fixed("a", Some(vec![titled("A")]))),
            Box::new(Fixed("b", Some(vec![titled("B1"), titled("B2")]))),
        ];
        let events = run_single(&sources, "b", &ScrapeOptions::default()).expect("known id");
        assert_eq!(events.len(), 2);
        assert!(run_single(&sources, "c", &ScrapeOptions::default()).is_err());
    }

    #[test]
    fn lists_configured_sources() {
        let sources = active_sources(&AppConfig::default());
        let ids: Vec<String> = list_sources(&sources).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["eventbrite".to_string(), "meetup".to_string()]);
    }
}
