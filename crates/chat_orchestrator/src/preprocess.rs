//! Outbound input preprocessing.
//!
//! A message whose entire input is a bare http(s) URL is dereferenced and
//! the page's visible text transmitted in its place; the chat's configured
//! prefix is then prepended. The raw input is always kept on the message,
//! the preprocessed form travels as `processed_content`.

use async_trait::async_trait;
use chat_core::{Chat, ChatError};
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref SCRIPT_RE: Regex =
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]+>").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Fetches the visible text of a web page; `None` on any failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageTextFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Option<String>;
}

/// reqwest-backed fetcher that strips markup down to visible text.
pub struct HttpPageTextFetcher {
    client: reqwest::Client,
}

impl HttpPageTextFetcher {
    pub fn new() -> Self {
        HttpPageTextFetcher {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpPageTextFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageTextFetcher for HttpPageTextFetcher {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        let response = self.client.get(url).send().await.ok()?;
        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), url, "page fetch rejected");
            return None;
        }
        let html = response.text().await.ok()?;
        let text = extract_visible_text(&html);
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Strip scripts, styles and tags; collapse whitespace.
pub fn extract_visible_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    let decoded = without_tags
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Whether the whole input is syntactically one http(s) URL.
fn is_bare_url(input: &str) -> Result<bool, ChatError> {
    if input.contains(char::is_whitespace) {
        return Ok(false);
    }
    if !input.starts_with("http://") && !input.starts_with("https://") {
        return Ok(false);
    }
    match Url::parse(input) {
        Ok(url) => Ok(url.has_host()),
        // Claims to be a URL but does not parse as one.
        Err(_) => Err(ChatError::BadUrl),
    }
}

/// Produce the processed content for an outbound message.
///
/// Returns `None` when preprocessing changes nothing, so the raw content
/// is transmitted as-is.
pub async fn process_input(
    fetcher: &dyn PageTextFetcher,
    chat: &Chat,
    raw: &str,
) -> Result<Option<String>, ChatError> {
    let trimmed = raw.trim();

    let body = if is_bare_url(trimmed)? {
        match fetcher.fetch_text(trimmed).await {
            Some(text) => text,
            // Fetch failure falls back to the literal URL.
            None => trimmed.to_string(),
        }
    } else {
        raw.to_string()
    };

    let processed = match chat.message_prefix.as_deref() {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}\n\n{body}"),
        _ => body,
    };

    if processed == raw {
        Ok(None)
    } else {
        Ok(Some(processed))
    }
}
