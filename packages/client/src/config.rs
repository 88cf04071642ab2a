//! Client configuration, populated from explicit values or environment
//! variables.

use std::time::Duration;

use adext::{AccessToken, AdextError, App, DEFAULT_API_VERSION};

/// Scheme and host every request URL is joined to.
pub const DEFAULT_BASE_URL: &str = "https://adext.com";

/// Seconds before a call is abandoned by the transport.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Runtime configuration for an [`Adext`](crate::Adext) facade.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `ADEXT_APP_ID` | required | App id |
/// | `ADEXT_APP_SECRET` | required | App secret, the key of every app-secret proof |
/// | `ADEXT_DEFAULT_VERSION` | `v1.0` | API version prefix for requests |
/// | `ADEXT_BASE_URL` | `https://adext.com` | Scheme + host of the API |
/// | `ADEXT_ACCESS_TOKEN` | (absent) | Default access token |
/// | `ADEXT_TIMEOUT_SECS` | `60` | Per-call transport timeout |
/// | `ADEXT_STORE` | (absent = in-memory) | Path to a SQLite file for the persistence store |
#[derive(Debug, Clone)]
pub struct AdextConfig {
    pub app: App,

    /// Prefix of every request URL, e.g. `"v1.0"`.
    pub default_version: String,

    /// Example: `"https://adext.com"`. No trailing slash needed.
    pub base_url: String,

    /// Used when a call does not name its own token.
    pub default_access_token: Option<AccessToken>,

    pub timeout_secs: u64,

    /// Path to the SQLite database file.
    /// `None` means an in-memory store (cached credentials are lost on exit).
    pub store_path: Option<String>,
}

impl AdextConfig {
    /// Config for `app` with every other field at its default.
    pub fn new(app: App) -> Self {
        Self {
            app,
            default_version: DEFAULT_API_VERSION.into(),
            base_url: DEFAULT_BASE_URL.into(),
            default_access_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            store_path: None,
        }
    }

    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, AdextError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AdextError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| {
                AdextError::Config(format!(
                    "required \"{key}\" not supplied in config and could not find fallback environment variable \"{key}\""
                ))
            })
        };
        let app = App::new(required("ADEXT_APP_ID")?, required("ADEXT_APP_SECRET")?);

        let timeout_secs = match lookup("ADEXT_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>().map_err(|_| {
                AdextError::Config(format!("ADEXT_TIMEOUT_SECS must be a whole number of seconds, got {v:?}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            app,
            default_version: lookup("ADEXT_DEFAULT_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.into()),
            base_url: lookup("ADEXT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            default_access_token: lookup("ADEXT_ACCESS_TOKEN").map(AccessToken::new),
            timeout_secs,
            store_path: lookup("ADEXT_STORE"),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
