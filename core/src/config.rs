//! Client configuration read from the environment.
//!
//! Environment variables:
//! - `RECIPE_API_URL`: backend base URL (default `http://localhost:8000`)
//! - `RECIPE_API_TIMEOUT_MS`: per-request timeout (default 5000)
//! - `RECIPE_QUERY_STALE_MS`: how long a read is served from cache (default 30000)
//! - `RECIPE_SEARCH_DEBOUNCE_MS`: search box debounce delay (default 300)
//! - `RECIPE_UPLOAD_CLOUD` / `RECIPE_UPLOAD_PRESET`: image upload account;
//!   uploads are disabled unless both are set
//! - `RECIPE_UPLOAD_TIMEOUT_MS`: image upload timeout (default 60000)

use std::sync::Arc;
use std::time::Duration;

use crate::api::{RecipeApi, DEFAULT_TIMEOUT};
use crate::cache::QueryCache;
use crate::client::RecipeClient;
use crate::debounce::DEFAULT_DEBOUNCE;
use crate::error::ConfigError;
use crate::notify::Notifier;
use crate::query::QueryClient;
use crate::transport::UreqTransport;
use crate::upload::{ImageUploader, DEFAULT_UPLOAD_TIMEOUT};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub stale_time: Duration,
    pub debounce: Duration,
    pub upload: Option<UploadConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            stale_time: DEFAULT_STALE_TIME,
            debounce: DEFAULT_DEBOUNCE,
            upload: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let millis = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(value) => match value.trim().parse::<u64>() {
                    Ok(ms) => Ok(Duration::from_millis(ms)),
                    Err(_) => Err(ConfigError::Invalid { key, value }),
                },
            }
        };

        let upload = match (lookup("RECIPE_UPLOAD_CLOUD"), lookup("RECIPE_UPLOAD_PRESET")) {
            (Some(cloud_name), Some(upload_preset)) => Some(UploadConfig {
                cloud_name,
                upload_preset,
                timeout: millis("RECIPE_UPLOAD_TIMEOUT_MS", DEFAULT_UPLOAD_TIMEOUT)?,
            }),
            _ => None,
        };

        Ok(Self {
            base_url: lookup("RECIPE_API_URL").unwrap_or(defaults.base_url),
            timeout: millis("RECIPE_API_TIMEOUT_MS", defaults.timeout)?,
            stale_time: millis("RECIPE_QUERY_STALE_MS", defaults.stale_time)?,
            debounce: millis("RECIPE_SEARCH_DEBOUNCE_MS", defaults.debounce)?,
            upload,
        })
    }

    /// A query client for this configuration over a ureq transport, with a
    /// fresh session cache. Image uploads share the transport, so its
    /// ceiling covers the upload timeout too.
    pub fn connect(&self, notifier: Arc<dyn Notifier>) -> QueryClient<UreqTransport> {
        let ceiling = self
            .upload
            .as_ref()
            .map_or(self.timeout, |upload| upload.timeout.max(self.timeout));
        let transport = Arc::new(UreqTransport::new(ceiling));
        let api = RecipeApi::new(RecipeClient::new(&self.base_url), transport)
            .with_timeout(self.timeout);
        QueryClient::new(api, QueryCache::new(self.stale_time), notifier)
    }

    pub fn uploader(&self) -> Option<ImageUploader> {
        self.upload.as_ref().map(|upload| {
            ImageUploader::new(&upload.cloud_name, &upload.upload_preset)
                .with_timeout(upload.timeout)
        })
    }
}
