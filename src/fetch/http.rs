// src/fetch/http.rs
// =============================================================================
// A Fetcher that retrieves real web pages.
//
// How it works:
// 1. GET the page with reqwest (timeout + user agent from CrawlConfig)
// 2. Turn failures and non-2xx statuses into a FetchError
// 3. Summarize the page (its <title>, or the start of its body text)
// 4. Extract every <a href> link, resolved against the page URL
//
// Optionally only links on the seed's domain are returned, which keeps the
// crawl from wandering off onto the rest of the internet.
// =============================================================================

use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use url::Url;

use super::{FetchError, Fetcher, Page};
use crate::config::CrawlConfig;

// How much body text we keep when a page has no <title>
const SUMMARY_CHARS: usize = 80;

/// Fetches pages over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    // Only links on this domain are followed, when set
    allowed_domain: Option<String>,
}

impl HttpFetcher {
    /// Builds a fetcher from the crawl configuration.
    ///
    /// The reqwest client is created once and shared (it pools connections),
    /// so cloning the fetcher is cheap.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            allowed_domain: None,
        })
    }

    /// Restricts followed links to the domain of `seed`.
    pub fn restrict_to_domain_of(mut self, seed: &str) -> Result<Self> {
        let url = Url::parse(seed).map_err(|e| anyhow!("Invalid URL '{}': {}", seed, e))?;
        let domain = url
            .domain()
            .ok_or_else(|| anyhow!("URL has no domain: {}", seed))?;

        self.allowed_domain = Some(domain.to_string());
        Ok(self)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, id: &str) -> Result<Page, FetchError> {
        Url::parse(id).map_err(|e| FetchError::InvalidUrl {
            url: id.to_string(),
            reason: e.to_string(),
        })?;

        let response = self
            .client
            .get(id)
            .send()
            .await
            .map_err(|e| categorize_error(id, e))?;

        let status = response.status();
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Err(FetchError::NotFound { url: id.to_string() });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: id.to_string(),
                status: status.as_u16(),
            });
        }

        // After redirects, relative links are relative to where we ended up
        let base = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| categorize_error(id, e))?;

        let links = extract_links(&html, &base, self.allowed_domain.as_deref());
        Ok(Page::new(summarize(&html), links))
    }
}

// Maps a reqwest error onto our error taxonomy
fn categorize_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Returns a one-line summary of an HTML document.
///
/// The trimmed `<title>` text when there is one, otherwise the first
/// characters of the document's visible text with whitespace collapsed.
fn summarize(html: &str) -> String {
    let document = Html::parse_document(html);

    if let Ok(selector) = Selector::parse("title") {
        if let Some(title) = document.select(&selector).next() {
            let text = collapse_whitespace(title.text());
            if !text.is_empty() {
                return text;
            }
        }
    }

    let body_text = match Selector::parse("body") {
        Ok(selector) => document
            .select(&selector)
            .next()
            .map(|body| collapse_whitespace(body.text()))
            .unwrap_or_default(),
        Err(_) => String::new(),
    };

    body_text.chars().take(SUMMARY_CHARS).collect()
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts the crawlable links of an HTML document.
///
/// Links are resolved against `base`, stripped of their fragment and
/// deduplicated (first occurrence wins, so page order is preserved). Only
/// http(s) links are kept, and only those on `domain` when it is given.
fn extract_links(html: &str, base: &Url, domain: Option<&str>) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return links,
    };

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(mut url) = resolve_link(base, href) else {
            continue;
        };

        if url.scheme() != "http" && url.scheme() != "https" {
            continue;
        }
        if let Some(domain) = domain {
            if url.domain() != Some(domain) {
                continue;
            }
        }

        url.set_fragment(None);
        let link = url.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

// Resolves a link (possibly relative) to an absolute URL
fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    // Skip anchors and special protocols
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    base.join(href).ok()
}
