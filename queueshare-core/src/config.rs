use std::{env, path::PathBuf, time::Duration};

use log::warn;
use url::Url;

/// The configuration of a queueshare client
#[derive(Debug, Clone)]
pub struct Config {
    /// The origin of the backend REST API
    pub backend_url: Url,
    /// The origin of the web frontend, used to build OAuth redirect targets
    pub frontend_url: Url,
    /// Where persisted client state is kept, if anywhere
    pub storage_path: Option<PathBuf>,
    /// How long a single request may take before it is considered a transport failure
    pub request_timeout_in_seconds: u64,
    /// How long to wait before re-fetching the queue after a playback action
    pub refetch_delay_in_millis: u64,
    /// How long the search input has to be quiet before a search is issued
    pub search_debounce_in_millis: u64,
}

impl Config {
    pub const BACKEND_URL_VAR: &'static str = "QUEUESHARE_BACKEND_URL";
    pub const FRONTEND_URL_VAR: &'static str = "QUEUESHARE_FRONTEND_URL";
    pub const STORAGE_PATH_VAR: &'static str = "QUEUESHARE_STORAGE_PATH";
    pub const REQUEST_TIMEOUT_VAR: &'static str = "QUEUESHARE_REQUEST_TIMEOUT_SECS";

    /// Builds a config from the environment, falling back to the defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = url_from_env(Self::BACKEND_URL_VAR) {
            config.backend_url = url;
        }

        if let Some(url) = url_from_env(Self::FRONTEND_URL_VAR) {
            config.frontend_url = url;
        }

        if let Ok(path) = env::var(Self::STORAGE_PATH_VAR) {
            config.storage_path = Some(path.into());
        }

        if let Ok(timeout) = env::var(Self::REQUEST_TIMEOUT_VAR) {
            match timeout.parse() {
                Ok(seconds) => config.request_timeout_in_seconds = seconds,
                Err(_) => warn!(
                    "Ignoring {}: {} is not a number of seconds",
                    Self::REQUEST_TIMEOUT_VAR,
                    timeout
                ),
            }
        }

        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_in_seconds)
    }

    pub fn refetch_delay(&self) -> Duration {
        Duration::from_millis(self.refetch_delay_in_millis)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_in_millis)
    }

    /// Returns a frontend url for the given path, used as a redirect target
    pub fn frontend_path(&self, path: &str) -> String {
        let base = self.frontend_url.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: Url::parse("http://localhost:8000").expect("default backend url is valid"),
            frontend_url: Url::parse("http://localhost:3000")
                .expect("default frontend url is valid"),
            storage_path: None,
            request_timeout_in_seconds: 30,
            // The playback provider takes a moment to reflect changes
            refetch_delay_in_millis: 1000,
            search_debounce_in_millis: 500,
        }
    }
}

fn url_from_env(var: &str) -> Option<Url> {
    let value = env::var(var).ok()?;

    match Url::parse(&value) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Ignoring {}: {} ({})", var, value, e);
            None
        }
    }
}
