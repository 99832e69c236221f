//! # Configuration
//!
//! Runtime settings, read from the environment with CLI overrides applied
//! on top by the binary.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MEMESMITH_API_KEY` | unset (every generation call fails, fallback results only) |
//! | `MEMESMITH_API_URL` | `https://api.openai.com/v1/chat/completions` |
//! | `MEMESMITH_MODEL` | `gpt-4o-mini` |
//! | `MEMESMITH_TIMEOUT_SECS` | `30` |
//! | `MEMESMITH_CATALOG_URL` | `https://api.imgflip.com/get_memes` |
//! | `MEMESMITH_CATALOG_TTL_SECS` | `3600` |
//! | `MEMESMITH_FONT` | unset (embedded bitmap font) |
//! | `IMGFLIP_USERNAME`, `IMGFLIP_PASSWORD` | unset (captioning disabled) |
//! | `MEMESMITH_LISTEN` | `127.0.0.1:8080` |

use std::path::PathBuf;
use std::time::Duration;

use crate::error::MemeError;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CATALOG_URL: &str = "https://api.imgflip.com/get_memes";
pub const DEFAULT_CAPTION_URL: &str = "https://api.imgflip.com/caption_image";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Settings for the text-generation service.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

/// Credentials for the remote captioning endpoint.
#[derive(Clone)]
pub struct CaptionCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for CaptionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub generation: GenerationConfig,
    pub catalog_url: String,
    pub catalog_ttl: Duration,
    /// TrueType font for captions; the embedded bitmap font is used when unset.
    pub font_path: Option<PathBuf>,
    pub caption_url: String,
    pub captioning: Option<CaptionCredentials>,
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, MemeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MemeError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secs = |key: &str, default: u64| -> Result<Duration, MemeError> {
            match get(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| MemeError::Config(format!("Invalid {} '{}': {}", key, raw, e))),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let captioning = match (get("IMGFLIP_USERNAME"), get("IMGFLIP_PASSWORD")) {
            (Some(username), Some(password)) => Some(CaptionCredentials { username, password }),
            _ => None,
        };

        Ok(Self {
            generation: GenerationConfig {
                api_key: get("MEMESMITH_API_KEY"),
                endpoint: get("MEMESMITH_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                model: get("MEMESMITH_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout: secs("MEMESMITH_TIMEOUT_SECS", 30)?,
            },
            catalog_url: get("MEMESMITH_CATALOG_URL")
                .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
            catalog_ttl: secs("MEMESMITH_CATALOG_TTL_SECS", 60 * 60)?,
            font_path: get("MEMESMITH_FONT").map(PathBuf::from),
            caption_url: DEFAULT_CAPTION_URL.to_string(),
            captioning,
            listen_addr: get("MEMESMITH_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.generation.api_key.is_none());
        assert_eq!(config.generation.endpoint, DEFAULT_API_URL);
        assert_eq!(config.generation.timeout, Duration::from_secs(30));
        assert_eq!(config.catalog_ttl, Duration::from_secs(3600));
        assert!(config.captioning.is_none());
        assert_eq!(config.listen_addr, DEFAULT_LISTEN);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("MEMESMITH_API_KEY", "sk-test"),
            ("MEMESMITH_CATALOG_TTL_SECS", "60"),
            ("MEMESMITH_FONT", "/fonts/impact.ttf"),
            ("IMGFLIP_USERNAME", "user"),
            ("IMGFLIP_PASSWORD", "hunter2"),
        ]))
        .unwrap();
        assert_eq!(config.generation.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.catalog_ttl, Duration::from_secs(60));
        assert_eq!(config.font_path, Some(PathBuf::from("/fonts/impact.ttf")));
        let creds = config.captioning.unwrap();
        assert_eq!(creds.username, "user");
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn test_invalid_number() {
        let err = Config::from_lookup(lookup(&[("MEMESMITH_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, MemeError::Config(_)));
    }

    #[test]
    fn test_partial_credentials_disable_captioning() {
        let config = Config::from_lookup(lookup(&[("IMGFLIP_USERNAME", "user")])).unwrap();
        assert!(config.captioning.is_none());
    }
}
