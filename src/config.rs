use crate::error::{Error, Result};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://mapineqfeatures.web.rug.nl/functions/postgisftw.";
pub const DEFAULT_USER_AGENT: &str = concat!("mapineq_rs/", env!("CARGO_PKG_VERSION"));

/// Settings shared by every request a [`crate::Client`] makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix every route is appended to (`<base_url><route>/items.json`).
    pub base_url: String,
    pub user_agent: String,
    /// Total request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Reject responses with several values per region caused by missing filters.
    /// Turn off to receive every row and disambiguate yourself.
    pub check_ambiguity: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            check_ambiguity: true,
        }
    }
}

impl ClientConfig {
    /// Defaults, overridden by `MAPINEQ_BASE_URL`, `MAPINEQ_USER_AGENT`,
    /// `MAPINEQ_TIMEOUT_SECS` and `MAPINEQ_CHECK_AMBIGUITY` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(url) = get("MAPINEQ_BASE_URL").filter(|s| !s.trim().is_empty()) {
            cfg.base_url = url.trim().to_string();
        }
        if let Some(ua) = get("MAPINEQ_USER_AGENT").filter(|s| !s.trim().is_empty()) {
            cfg.user_agent = ua;
        }
        if let Some(t) = get("MAPINEQ_TIMEOUT_SECS") {
            let secs = t.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("MAPINEQ_TIMEOUT_SECS={t:?} is not a number: {e}"))
            })?;
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get("MAPINEQ_CHECK_AMBIGUITY") {
            cfg.check_ambiguity = parse_flag(&v).ok_or_else(|| {
                Error::Config(format!("MAPINEQ_CHECK_AMBIGUITY={v:?} is not a boolean"))
            })?;
        }
        Ok(cfg)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ambiguity_check(mut self, on: bool) -> Self {
        self.check_ambiguity = on;
        self
    }

    /// Full URL for a named route.
    pub fn endpoint(&self, route: &str) -> String {
        format!("{}{}/items.json", self.base_url, route)
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
