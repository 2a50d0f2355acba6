use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use scraper::{ElementRef, Html, Selector};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use super::RetryPolicy;

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .user_agent("Mozilla/5.0 (compatible; TechEvents/0.1)")
        .build()
        .expect("http client")
});

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

pub fn first_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Every matching element's text, skipping empty ones.
pub fn all_texts(document: &Html, selector: &Selector) -> Vec<String> {
    document
        .select(selector)
        .map(inner_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Every matching element's `href`, resolved against `base`, first
/// occurrence kept.
pub fn unique_links(document: &Html, selector: &Selector, base: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for element in document.select(selector) {
        let href = element.value().attr("href").map(str::to_string);
        if let Some(url) = absolute_url(base, href) {
            if !links.contains(&url) {
                links.push(url);
            }
        }
    }
    links
}

pub fn absolute_url(base: &str, href: Option<String>) -> Option<String> {
    let href = href?;
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href);
    }
    let base_url = reqwest::Url::parse(base).ok()?;
    base_url.join(&href).ok().map(|u| u.to_string())
}

/// Adds `page=<n>` to a listing URL; page 1 is the bare URL.
pub fn page_url(listing: &str, page: u32) -> Result<String> {
    if page <= 1 {
        return Ok(listing.to_string());
    }
    let mut url =
        reqwest::Url::parse(listing).with_context(|| format!("invalid listing url {listing}"))?;
    url.query_pairs_mut().append_pair("page", &page.to_string());
    Ok(url.into())
}

pub fn fetch_html(url: &str) -> Result<String> {
    let response = CLIENT
        .get(url)
        .send()
        .with_context(|| format!("request failed for {url}"))?;
    let response = response
        .error_for_status()
        .with_context(|| format!("non-success status for {url}"))?;
    response
        .text()
        .with_context(|| format!("unable to read response body for {url}"))
}

pub fn fetch_json<T: DeserializeOwned>(url: &str) -> Result<T> {
    let response = CLIENT
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .with_context(|| format!("request failed for {url}"))?;
    let response = response
        .error_for_status()
        .with_context(|| format!("non-success status for {url}"))?;
    let body = response
        .text()
        .with_context(|| format!("unable to read response body for {url}"))?;
    serde_json::from_str(&body).with_context(|| format!("unexpected json from {url}"))
}

/// Runs `op` until it succeeds or the policy's attempts are used up, sleeping
/// the policy's delay between attempts.
pub fn retry<T, F>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                log::warn!("Retry {attempt}/{attempts} failed for {label}: {err:#}");
                if attempt >= attempts {
                    return Err(err.context(format!("{label} failed after {attempts} attempts")));
                }
                std::thread::sleep(policy.delay);
                attempt += 1;
            }
        }
    }
}

/// `"<source>-<key>"` when the key is a platform id, otherwise a short hash
/// of the key so the id stays stable across runs.
pub fn stable_id(source: &str, key: &str) -> String {
    let key = key.trim();
    if !key.is_empty() && key.chars().all(|ch| ch.is_ascii_digit()) {
        return format!("{source}-{key}");
    }
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{source}-{}", &digest[..16])
}
