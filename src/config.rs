//! Client configuration
//!
//! `ClientConfig` is what callers fill in. `ConnectionConfig` is derived from
//! it once when the client is built and never changes afterwards.

use crate::error::{ForumError, Result};
use crate::signature::md5_hex;
use std::time::Duration;
use url::Url;

/// Default client name sent as `clientname` and `User-Agent`
pub const DEFAULT_CLIENT_NAME: &str = "vbulletin-client";

/// Default wait for the handshake, in seconds
pub const DEFAULT_INIT_TIMEOUT_SECS: u64 = 5;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the forum's `api.php`
    pub api_url: String,
    /// API key issued by the forum administrator
    pub api_key: String,
    /// Name of the platform the client runs on
    pub platform_name: String,
    /// Version of that platform
    pub platform_version: String,
    /// Client product name (default: `vbulletin-client`)
    pub client_name: String,
    /// Client product version (default: this crate's version)
    pub client_version: String,
    /// How long signed calls wait for the handshake (default: 5)
    pub init_timeout_secs: u64,
    /// Per-request transport timeout. `None` leaves it to reqwest.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            platform_name: String::new(),
            platform_version: String::new(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            init_timeout_secs: DEFAULT_INIT_TIMEOUT_SECS,
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Config with the four required settings and defaults for the rest
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        platform_name: impl Into<String>,
        platform_version: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            platform_name: platform_name.into(),
            platform_version: platform_version.into(),
            ..Default::default()
        }
    }
}

/// Immutable connection settings derived from a [`ClientConfig`]
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    api_url: String,
    base_url: String,
    api_key: String,
    client_name: String,
    client_version: String,
    platform_name: String,
    platform_version: String,
    unique_id: String,
    init_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl ConnectionConfig {
    /// Derive connection settings. Never fails; see [`ConnectionConfig::validate`].
    pub fn from_config(config: &ClientConfig) -> Self {
        let base_url = base_url_of(&config.api_url).unwrap_or_default();
        let unique_id = unique_id(
            &config.client_name,
            &config.client_version,
            &config.platform_name,
            &config.platform_version,
            &machine_salt(),
        );

        Self {
            api_url: config.api_url.clone(),
            base_url,
            api_key: config.api_key.clone(),
            client_name: config.client_name.clone(),
            client_version: config.client_version.clone(),
            platform_name: config.platform_name.clone(),
            platform_version: config.platform_version.clone(),
            unique_id,
            init_timeout: Duration::from_secs(config.init_timeout_secs),
            request_timeout: config.request_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Check that every setting the handshake needs is present.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("api_url", &self.api_url),
            ("api_key", &self.api_key),
            ("platform_name", &self.platform_name),
            ("platform_version", &self.platform_version),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ForumError::Configuration(format!(
                "initialization requires api_url, api_key, platform_name and platform_version (missing: {})",
                missing.join(", ")
            )));
        }
        if self.base_url.is_empty() {
            return Err(ForumError::Configuration(format!(
                "api_url is not an absolute URL: {}",
                self.api_url
            )));
        }
        Ok(())
    }

    /// Full API endpoint
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// `scheme://host[:port]/` of the API endpoint, used for cookie scope
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn client_version(&self) -> &str {
        &self.client_version
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    pub fn platform_version(&self) -> &str {
        &self.platform_version
    }

    /// Locally generated client fingerprint sent as `uniqueid`
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn init_timeout(&self) -> Duration {
        self.init_timeout
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

/// `scheme://host[:port]/` for an absolute URL
pub fn base_url_of(api_url: &str) -> Option<String> {
    let url = Url::parse(api_url).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}/", url.scheme(), host, port),
        None => format!("{}://{}/", url.scheme(), host),
    })
}

/// Client fingerprint: md5 of name, version, platform, platform version and salt
pub fn unique_id(
    client_name: &str,
    client_version: &str,
    platform_name: &str,
    platform_version: &str,
    salt: &str,
) -> String {
    md5_hex(format!(
        "{client_name}{client_version}{platform_name}{platform_version}{salt}"
    ))
}

/// Host name plus a random UUID
fn machine_salt() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}{}", host, uuid::Uuid::new_v4())
}
