//! Thin MediaWiki API client: page HTML, revision wikitext, image URLs.
//! All calls are synchronous and fail the current entity outright; the batch
//! loop is meant to be re-run, not to self-heal.

use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::PipelineError;

const TIMEOUT_SECS: u64 = 60;
const USER_AGENT: &str = concat!("country-cards/", env!("CARGO_PKG_VERSION"));

// Latest revision of the page's intro section, as raw wikitext
const COUNTRY_INFO_URL: &str = "https://es.wikipedia.org/w/api.php?action=query\
    &prop=revisions&rvprop=content&rvsection=0&rvslots=main&format=json&titles=";

// Upload URL for a commons file
const IMAGE_QUERY_URL: &str = "https://commons.wikimedia.org/w/api.php?action=query\
    &prop=imageinfo&iiprop=url&format=json&titles=File:";

pub struct WikiClient {
    http: Client,
}

impl WikiClient {
    pub fn new() -> Result<Self, PipelineError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(WikiClient { http })
    }

    /// Fetch a page as rendered HTML (for the list tables).
    pub fn page_html(&self, url: &str) -> Result<String, PipelineError> {
        Ok(self.http.get(url).send()?.error_for_status()?.text()?)
    }

    /// Fetch the raw infobox wikitext for one page title.
    pub fn revision_markup(&self, title: &str) -> Result<String, PipelineError> {
        let url = format!("{}{}", COUNTRY_INFO_URL, title);
        let data = self.get_json(&url)?;
        parse_revision_markup(&data).map_err(|detail| PipelineError::MalformedResponse {
            url,
            detail,
        })
    }

    /// Resolve a commons filename to its upload URL.
    pub fn image_url(&self, filename: &str) -> Result<String, PipelineError> {
        let url = format!("{}{}", IMAGE_QUERY_URL, urlencoding::encode(filename));
        let data = self.get_json(&url)?;
        parse_image_url(&data).map_err(|detail| PipelineError::MalformedResponse { url, detail })
    }

    /// Download a file's bytes; `Ok(None)` on a non-2xx status so callers
    /// can report and move on.
    pub fn download(&self, url: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        let resp = self.http.get(url).send()?;
        if !resp.status().is_success() {
            println!("    ERROR! got {}", resp.status());
            return Ok(None);
        }
        Ok(Some(resp.bytes()?.to_vec()))
    }

    fn get_json(&self, url: &str) -> Result<Value, PipelineError> {
        // Read as text first so a parse failure can point at the URL
        let text = self.http.get(url).send()?.error_for_status()?.text()?;
        serde_json::from_str(&text).map_err(|err| PipelineError::MalformedResponse {
            url: url.to_string(),
            detail: format!("invalid JSON: {}", err),
        })
    }
}

/// Dig the wikitext out of a revisions query response.
pub fn parse_revision_markup(data: &Value) -> Result<String, String> {
    let page = single_page(data)?;
    let revision = page
        .get("revisions")
        .and_then(Value::as_array)
        .and_then(|revs| revs.first())
        .ok_or("no revisions")?;
    let slot = revision
        .pointer("/slots/main")
        .ok_or("no main revision slot")?;

    match slot.get("contentformat").and_then(Value::as_str) {
        Some("text/x-wiki") => {}
        other => return Err(format!("unexpected content format {:?}", other)),
    }

    slot.get("*")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "no revision content".to_string())
}

/// Dig the upload URL out of an imageinfo query response.
pub fn parse_image_url(data: &Value) -> Result<String, String> {
    let page = single_page(data)?;
    page.get("imageinfo")
        .and_then(Value::as_array)
        .and_then(|infos| infos.first())
        .and_then(|info| info.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "no imageinfo url".to_string())
}

/// Both query endpoints return a pages object keyed by page id, with exactly
/// one entry for a single-title query.
fn single_page(data: &Value) -> Result<&Value, String> {
    let pages = data
        .pointer("/query/pages")
        .and_then(Value::as_object)
        .ok_or("no query.pages object")?;
    if pages.len() != 1 {
        return Err(format!("expected one page, got {}", pages.len()));
    }
    Ok(pages.values().next().unwrap())
}
