use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Read once at startup; fails fast if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer-token secret every rank request must present.
    pub api_key: String,
    pub model_url: String,
    pub model_name: String,
    pub model_api_key: Option<String>,
    pub webdriver_url: String,
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsPaths>,
    pub extraction_timeout: Duration,
    pub max_new_tokens: u32,
    pub inference_timeout: Duration,
    pub inference_max_concurrency: usize,
    pub rank_max_attempts: u32,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let tls = match (optional_env("TLS_CERT_PATH"), optional_env("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together"),
        };

        let inference_max_concurrency: usize = parse_env("INFERENCE_MAX_CONCURRENCY", 4)?;
        if inference_max_concurrency == 0 {
            bail!("INFERENCE_MAX_CONCURRENCY must be at least 1");
        }
        let rank_max_attempts: u32 = parse_env("RANK_MAX_ATTEMPTS", 1)?;
        if rank_max_attempts == 0 {
            bail!("RANK_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            api_key: require_env("API_KEY")?,
            model_url: require_env("MODEL_URL")?,
            model_name: require_env("MODEL_NAME")?,
            model_api_key: optional_env("MODEL_API_KEY"),
            webdriver_url: optional_env("WEBDRIVER_URL")
                .unwrap_or_else(|| "http://localhost:9515".to_string()),
            host: optional_env("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_env("APP_PORT", 8080)?,
            tls,
            extraction_timeout: Duration::from_secs(parse_env("EXTRACTION_TIMEOUT_SECS", 10)?),
            max_new_tokens: parse_env("MAX_NEW_TOKENS", 256)?,
            inference_timeout: Duration::from_secs(parse_env("INFERENCE_TIMEOUT_SECS", 120)?),
            inference_max_concurrency,
            rank_max_attempts,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: u16 = parse_env("JOBFIT_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("JOBFIT_TEST_BAD_NUMBER", "ten");
        let result: Result<u32> = parse_env("JOBFIT_TEST_BAD_NUMBER", 1);
        assert!(result.is_err());
        std::env::remove_var("JOBFIT_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_optional_env_treats_blank_as_unset() {
        std::env::set_var("JOBFIT_TEST_BLANK", "   ");
        assert!(optional_env("JOBFIT_TEST_BLANK").is_none());
        std::env::remove_var("JOBFIT_TEST_BLANK");
    }
}
