//! Run configuration.
//!
//! Proxy selection and output settings are gathered here once per run and
//! handed to the source and the report writer explicitly.

use crate::error::{PublistError, Result};
use std::path::PathBuf;

/// ScraperAPI proxy endpoint; the API key is the proxy password.
const SCRAPERAPI_PROXY_HOST: &str = "proxy-server.scraperapi.com:8001";

/// Default number of publications flagged as selected
pub const DEFAULT_SELECTED: i64 = 3;

/// How requests to the scraping source are routed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyConfig {
    /// Direct connection
    #[default]
    None,
    /// A single explicit proxy URL (e.g., "http://127.0.0.1:7890")
    Single(String),
    /// Paid ScraperAPI proxy
    ScraperApi {
        /// ScraperAPI key
        api_key: String,
    },
    /// Rotating pool of free proxies, advanced after each failed request
    Rotating(Vec<String>),
}

impl ProxyConfig {
    /// Pick a proxy strategy from the operator-supplied settings.
    ///
    /// Precedence: explicit proxy, then ScraperAPI key, then the free pool
    /// (only when `use_free_pool` is set).
    pub fn from_parts(
        single: Option<String>,
        scraperapi_key: Option<String>,
        use_free_pool: bool,
        pool: &[String],
    ) -> Result<Self> {
        if let Some(url) = single.filter(|s| !s.trim().is_empty()) {
            return Ok(Self::Single(url.trim().to_string()));
        }

        if let Some(key) = scraperapi_key.filter(|s| !s.trim().is_empty()) {
            return Ok(Self::ScraperApi {
                api_key: key.trim().to_string(),
            });
        }

        if use_free_pool {
            let urls: Vec<String> = pool
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            if urls.is_empty() {
                return Err(PublistError::Config(
                    "free proxy pool enabled but no proxy URLs were given".to_string(),
                ));
            }
            return Ok(Self::Rotating(urls));
        }

        Ok(Self::None)
    }

    /// Proxy URLs to build clients for; empty means a direct connection.
    pub fn routes(&self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::Single(url) => vec![url.clone()],
            Self::ScraperApi { api_key } => {
                vec![format!("http://scraperapi:{}@{}", api_key, SCRAPERAPI_PROXY_HOST)]
            }
            Self::Rotating(urls) => urls.clone(),
        }
    }

    /// Short label for logs; never includes credentials.
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "direct",
            Self::Single(_) => "proxy",
            Self::ScraperApi { .. } => "scraperapi",
            Self::Rotating(_) => "free-pool",
        }
    }
}

/// Output settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of newest publications flagged as selected (clamped to >= 0)
    pub selected: i64,
    /// Primary JSON output path
    pub output: PathBuf,
    /// Optional metadata JSON path
    pub metadata: Option<PathBuf>,
    /// Fail with a distinct status when records were lost
    pub strict: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            selected: DEFAULT_SELECTED,
            output: PathBuf::from("assets/publications.json"),
            metadata: None,
            strict: false,
        }
    }
}
