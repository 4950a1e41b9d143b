//! Network access for the client.
//!
//! Everything that leaves the process goes through [`Transport`]. The default
//! implementation is a blocking reqwest client; tests substitute their own.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde_json::Value;

/// Issues one GET and returns the decoded JSON body.
pub trait Transport {
    fn get_json(&self, url: &str) -> Result<Value>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get_json(&self, url: &str) -> Result<Value> {
        (**self).get_json(url)
    }
}

/// Blocking HTTP transport. No retries: failures go straight to the caller.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::limited(5))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, url: &str) -> Result<Value> {
        log::debug!("GET {url}");
        let resp = self
            .http
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .map_err(|e| Error::Transport {
                url: url.to_string(),
                status: e.status().map(|s| s.as_u16()),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Transport {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: format!("HTTP {status}"),
            });
        }

        let body = resp.text().map_err(|e| Error::Transport {
            url: url.to_string(),
            status: Some(status.as_u16()),
            reason: format!("reading body: {e}"),
        })?;
        serde_json::from_str(&body).map_err(|e| Error::format(url, format!("decode json: {e}")))
    }
}

// Leave RFC 3986 unreserved characters unescaped.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// `endpoint?k=v&...` with every key and value percent-encoded.
pub fn build_url(endpoint: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return endpoint.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                percent_encoding::utf8_percent_encode(k, QUERY),
                percent_encoding::utf8_percent_encode(v, QUERY)
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{endpoint}?{query}")
}
