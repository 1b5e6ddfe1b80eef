//! Loading a specification document from disk or over HTTP.
//!
//! The document may be JSON or YAML. The format is taken from the file
//! extension when there is one, otherwise sniffed from the first
//! non-whitespace character.

use std::path::Path;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use specdocs_shared::{Result, SpecDocsError};

/// Maximum number of redirects to follow when fetching a remote spec.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for fetching a remote spec.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum response size we accept for a remote spec (20 MB).
const MAX_RESPONSE_SIZE: u64 = 20 * 1024 * 1024;

/// User-Agent string for spec requests.
const USER_AGENT: &str = concat!("specdocs/", env!("CARGO_PKG_VERSION"));

/// Serialization format of a specification document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    /// Infer the format from a path or URL's extension.
    pub fn from_extension(location: &str) -> Option<Self> {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Guess the format from the document text.
    pub fn sniff(text: &str) -> Self {
        match text.trim_start().chars().next() {
            Some('{') | Some('[') => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Raw text of a loaded spec plus its detected format.
#[derive(Debug, Clone)]
pub struct SpecSource {
    pub text: String,
    pub format: SpecFormat,
}

/// Read a spec from a local path or an `http(s)` URL.
#[instrument(skip_all, fields(location = %location))]
pub async fn read_source(location: &str) -> Result<SpecSource> {
    let text = match Url::parse(location) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            info!(%url, "fetching remote spec");
            fetch(&url, DEFAULT_TIMEOUT_SECS).await?
        }
        _ => {
            let path = Path::new(location);
            debug!(path = %path.display(), "reading spec file");
            std::fs::read_to_string(path).map_err(|e| SpecDocsError::io(path, e))?
        }
    };

    let format = SpecFormat::from_extension(location).unwrap_or_else(|| SpecFormat::sniff(&text));
    Ok(SpecSource { text, format })
}

/// Parse document text into a JSON value tree.
pub fn parse_document(text: &str, format: SpecFormat) -> Result<Value> {
    let value: Value = match format {
        SpecFormat::Json => serde_json::from_str(text)
            .map_err(|e| SpecDocsError::parse(format!("invalid JSON: {e}")))?,
        SpecFormat::Yaml => serde_yaml::from_str(text)
            .map_err(|e| SpecDocsError::parse(format!("invalid YAML: {e}")))?,
    };

    if !value.is_object() {
        return Err(SpecDocsError::parse("document root is not an object"));
    }
    Ok(value)
}

/// Fetch a remote spec body.
async fn fetch(url: &Url, timeout_secs: u64) -> Result<String> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SpecDocsError::Network(format!("failed to build HTTP client: {e}")))?;

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| SpecDocsError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SpecDocsError::Network(format!("{url}: HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(SpecDocsError::validation(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    response
        .text()
        .await
        .map_err(|e| SpecDocsError::Network(format!("{url}: failed to read body: {e}")))
}
