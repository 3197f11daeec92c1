use std::str::FromStr;
use std::time::Duration;

use metascrape_client::ProbeMethod;
use metascrape_core::AppError;

/// Default `s-maxage` for extraction responses: one week.
pub const DEFAULT_CACHE_MAX_AGE: u64 = 604_800;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// `s-maxage` in seconds sent with every `/api` response.
    pub cache_max_age: u64,
    /// Timeout for each outbound request (probe and fetch).
    pub timeout: Duration,
    pub probe_method: ProbeMethod,
    /// Disable SSRF protection for targets on private networks.
    pub allow_private_urls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            timeout: Duration::from_secs(30),
            probe_method: ProbeMethod::default(),
            allow_private_urls: false,
        }
    }
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `METASCRAPE_PORT` (optional, defaults to 3000)
    /// - `METASCRAPE_CACHE_MAX_AGE` (optional, defaults to 604800)
    /// - `METASCRAPE_TIMEOUT_SECS` (optional, defaults to 30)
    /// - `METASCRAPE_PROBE_METHOD` (optional, `options` or `head`, defaults to `options`)
    /// - `METASCRAPE_ALLOW_PRIVATE_URLS` (optional, defaults to false)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let timeout_secs: u64 = parse_var(&lookup, "METASCRAPE_TIMEOUT_SECS", 30)?;
        if timeout_secs == 0 {
            return Err(AppError::ConfigError(
                "METASCRAPE_TIMEOUT_SECS must be at least 1".into(),
            ));
        }

        Ok(Self {
            port: parse_var(&lookup, "METASCRAPE_PORT", defaults.port)?,
            cache_max_age: parse_var(&lookup, "METASCRAPE_CACHE_MAX_AGE", defaults.cache_max_age)?,
            timeout: Duration::from_secs(timeout_secs),
            probe_method: parse_var(&lookup, "METASCRAPE_PROBE_METHOD", defaults.probe_method)?,
            allow_private_urls: parse_var(
                &lookup,
                "METASCRAPE_ALLOW_PRIVATE_URLS",
                defaults.allow_private_urls,
            )?,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::ConfigError(format!("Invalid {key} '{raw}': {e}"))),
    }
}
