//! Page fetching and text extraction.
//!
//! `Fetcher` is the seam the pipeline talks to; `HttpFetcher` downloads the
//! page with reqwest and pulls readable text out of the HTML with scraper,
//! preferring a configured content container (the Wikipedia article body by
//! default) over the whole document.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use url::Url;

use crate::core::config::settings::DEFAULT_CONTENT_SELECTOR;

const USER_AGENT: &str = concat!("pagewise-backend/", env!("CARGO_PKG_VERSION"));

const NOISE_TAGS: [&str; 6] = ["script", "style", "noscript", "svg", "iframe", "template"];

/// Returns true when `raw` parses as an absolute URL with a host.
pub fn is_valid_url(raw: &str) -> bool {
    ScrapeTarget::parse(raw).is_ok()
}

/// A validated absolute URL that questions are answered against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget(Url);

impl ScrapeTarget {
    pub fn parse(raw: &str) -> Result<Self, ScrapeError> {
        let url = Url::parse(raw.trim()).map_err(|_| ScrapeError::InvalidUrl(raw.to_string()))?;
        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(Self(url)),
            _ => Err(ScrapeError::InvalidUrl(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("no readable text found at {0}")]
    Empty(String),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Downloads the target and returns its extracted, trimmed text.
    async fn fetch_text(&self, target: &ScrapeTarget) -> Result<String, ScrapeError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    content_selector: String,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, content_selector: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            content_selector: content_selector.into(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, target: &ScrapeTarget) -> Result<String, ScrapeError> {
        let scheme = target.url().scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ScrapeError::UnsupportedScheme(scheme.to_string()));
        }

        let response = self
            .client
            .get(target.url().clone())
            .send()
            .await
            .map_err(|source| ScrapeError::Request {
                url: target.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: target.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|source| ScrapeError::Request {
            url: target.to_string(),
            source,
        })?;

        let text = extract_text(&html, &self.content_selector);
        tracing::debug!("Extracted {} characters from {}", text.len(), target);
        if text.is_empty() {
            return Err(ScrapeError::Empty(target.to_string()));
        }
        Ok(text)
    }
}

/// Pulls readable text out of an HTML document.
///
/// Uses the first element matching `content_selector` when it holds any
/// text, otherwise the whole document. Scripts, styles and similar noise are
/// skipped; block elements become line breaks.
pub fn extract_text(html: &str, content_selector: &str) -> String {
    let document = Html::parse_document(html);
    let noise: Vec<Selector> = NOISE_TAGS
        .iter()
        .filter_map(|tag| Selector::parse(tag).ok())
        .collect();

    let selector = Selector::parse(content_selector)
        .or_else(|_| Selector::parse(DEFAULT_CONTENT_SELECTOR))
        .ok();
    if let Some(container) = selector
        .as_ref()
        .and_then(|sel| document.select(sel).next())
    {
        let text = collect_clean_text(&container, &noise);
        if !text.is_empty() {
            return text;
        }
    }

    collect_clean_text(&document.root_element(), &noise)
}

fn collect_clean_text(root: &ElementRef, noise: &[Selector]) -> String {
    let mut raw = String::new();
    collect_text_recursive(root, noise, &mut raw);

    let mut cleaned = String::with_capacity(raw.len());
    let mut pending_break = false;
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            pending_break = true;
            continue;
        }
        if !cleaned.is_empty() {
            cleaned.push_str(if pending_break { "\n\n" } else { "\n" });
        }
        pending_break = false;
        cleaned.push_str(line);
    }

    cleaned.trim().to_string()
}

fn collect_text_recursive(element: &ElementRef, noise: &[Selector], output: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !normalized.is_empty() {
                    if !output.is_empty() && !output.ends_with(|c: char| c == ' ' || c == '\n') {
                        output.push(' ');
                    }
                    output.push_str(&normalized);
                }
            }
            Node::Element(_) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                if noise.iter().any(|sel| sel.matches(&child_ref)) {
                    continue;
                }

                let is_block = matches!(
                    child_ref.value().name(),
                    "p" | "div"
                        | "h1"
                        | "h2"
                        | "h3"
                        | "h4"
                        | "h5"
                        | "h6"
                        | "li"
                        | "br"
                        | "tr"
                        | "table"
                        | "ul"
                        | "ol"
                        | "blockquote"
                        | "pre"
                        | "section"
                        | "article"
                );

                if is_block {
                    output.push('\n');
                }
                collect_text_recursive(&child_ref, noise, output);
                if is_block {
                    output.push('\n');
                }
            }
            _ => {}
        }
    }
}
