//! Command-line and environment configuration.
//!
//! [`Args`] is what clap parses; [`FeedConfig`] is the validated form the
//! rest of the program is built from.  Nothing is compiled in except the
//! defaults below, and every one of them can be overridden.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use crate::error::ConfigError;
use crate::sync::SyncSettings;

pub const DEFAULT_ENDPOINT: &str = "https://newsapi.org/v2/top-headlines";

/// Upper bound accepted by NewsAPI for `pageSize`.
pub const MAX_PAGE_SIZE: u32 = 100;

/// How long the connectivity probe may take before the network counts as down.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Parser)]
#[command(name = "headline-feed")]
#[command(about = "Browse and search news headlines in the terminal")]
#[command(version)]
pub struct Args {
    /// Headlines endpoint (NewsAPI `top-headlines` compatible).
    #[arg(long, env = "HEADLINES_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// API key sent as `apiKey`.
    #[arg(long, env = "NEWSAPI_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Articles requested per page.
    #[arg(long, env = "HEADLINES_PAGE_SIZE", default_value_t = 20)]
    pub page_size: u32,

    /// Source ids requested when the search box is empty ("" to disable).
    #[arg(long, env = "HEADLINES_SOURCES", default_value = "techcrunch")]
    pub sources: String,

    /// Quiet period after typing before a search is sent.
    #[arg(long, default_value_t = 800)]
    pub debounce_ms: u64,

    /// Per-request timeout.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Where the offline cache is kept.
    #[arg(long, env = "HEADLINES_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Keep the offline cache in memory only.
    #[arg(long)]
    pub memory_cache: bool,

    /// Write logs here (the terminal belongs to the UI).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub endpoint: Url,
    pub api_key: String,
    pub default_sources: Option<String>,
    pub page_size: u32,
    pub debounce: Duration,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub cache_dir: PathBuf,
    pub memory_cache: bool,
    pub log_file: Option<PathBuf>,
}

impl FeedConfig {
    /// The subset of settings the sync controller needs.
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            page_size: self.page_size,
            debounce: self.debounce,
            ..SyncSettings::default()
        }
    }
}

impl TryFrom<Args> for FeedConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let api_key = args
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        if !(1..=MAX_PAGE_SIZE).contains(&args.page_size) {
            return Err(ConfigError::PageSize {
                got: args.page_size,
                max: MAX_PAGE_SIZE,
            });
        }

        let endpoint = Url::parse(&args.endpoint).map_err(|e| ConfigError::Endpoint {
            url: args.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::Endpoint {
                url: args.endpoint,
                reason: "scheme must be http or https".into(),
            });
        }

        let cache_dir = match args.cache_dir {
            Some(dir) => dir,
            None => dirs::cache_dir()
                .ok_or(ConfigError::NoCacheDir)?
                .join(env!("CARGO_PKG_NAME")),
        };

        let sources = args.sources.trim().to_string();

        Ok(Self {
            endpoint,
            api_key,
            default_sources: (!sources.is_empty()).then_some(sources),
            page_size: args.page_size,
            debounce: Duration::from_millis(args.debounce_ms),
            request_timeout: Duration::from_secs(args.timeout_secs),
            probe_timeout: PROBE_TIMEOUT,
            cache_dir,
            memory_cache: args.memory_cache,
            log_file: args.log_file,
        })
    }
}
