use std::{env, num::NonZeroUsize, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::util::retry::RetryPolicy;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-sonnet-20240229";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    dataset_path: PathBuf,
    locations_path: PathBuf,
    enriched_path: PathBuf,
    anthropic_api_key: Option<String>,
    anthropic_base_url: String,
    anthropic_model: String,
    anthropic_max_tokens: u32,
    anthropic_timeout: Duration,
    classify_max_attempts: NonZeroUsize,
    classify_retry_backoff: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数から設定値を読み込み、検証する。
    ///
    /// APIキーはここでは必須にしない。マージ段階は外部サービスを使わないため、
    /// 分類段階だけが [`Config::require_api_key`] で存在を確認する。
    ///
    /// # Errors
    /// 数値のパースに失敗した場合は [`ConfigError::Invalid`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let dataset_path = parse_path("PUBLISHER_DATASET_PATH", "Data.csv");
        let locations_path = parse_path("PUBLISHER_LOCATIONS_PATH", "publisher_locations.csv");
        let enriched_path = parse_path("PUBLISHER_ENRICHED_PATH", "Data_with_location.csv");

        // Credentials stay out of the code; an empty key counts as unset.
        let anthropic_api_key = env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let anthropic_base_url = env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_ANTHROPIC_BASE_URL.to_string());
        let anthropic_model =
            env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.to_string());
        let anthropic_max_tokens = parse_u32("ANTHROPIC_MAX_TOKENS", 10)?;
        let anthropic_timeout = parse_duration_secs("ANTHROPIC_TIMEOUT_SECS", 600)?;

        let classify_max_attempts = parse_non_zero_usize("CLASSIFY_MAX_ATTEMPTS", 3)?;
        let classify_retry_backoff = parse_duration_secs("CLASSIFY_RETRY_BACKOFF_SECS", 3)?;

        Ok(Self {
            dataset_path,
            locations_path,
            enriched_path,
            anthropic_api_key,
            anthropic_base_url,
            anthropic_model,
            anthropic_max_tokens,
            anthropic_timeout,
            classify_max_attempts,
            classify_retry_backoff,
        })
    }

    /// 分類段階で必要なAPIキーを返す。
    ///
    /// # Errors
    /// `ANTHROPIC_API_KEY` が未設定の場合は [`ConfigError::Missing`] を返す。
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.anthropic_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("ANTHROPIC_API_KEY"))
    }

    #[must_use]
    pub fn dataset_path(&self) -> &PathBuf {
        &self.dataset_path
    }

    #[must_use]
    pub fn locations_path(&self) -> &PathBuf {
        &self.locations_path
    }

    #[must_use]
    pub fn enriched_path(&self) -> &PathBuf {
        &self.enriched_path
    }

    #[must_use]
    pub fn anthropic_base_url(&self) -> &str {
        &self.anthropic_base_url
    }

    #[must_use]
    pub fn anthropic_model(&self) -> &str {
        &self.anthropic_model
    }

    #[must_use]
    pub fn anthropic_max_tokens(&self) -> u32 {
        self.anthropic_max_tokens
    }

    #[must_use]
    pub fn anthropic_timeout(&self) -> Duration {
        self.anthropic_timeout
    }

    #[must_use]
    pub fn classify_max_attempts(&self) -> NonZeroUsize {
        self.classify_max_attempts
    }

    #[must_use]
    pub fn classify_retry_backoff(&self) -> Duration {
        self.classify_retry_backoff
    }

    /// 分類リクエスト用の再試行ポリシーを組み立てる。
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.classify_max_attempts.get(), self.classify_retry_backoff)
    }
}

fn parse_path(name: &'static str, default: &str) -> PathBuf {
    PathBuf::from(env::var(name).unwrap_or_else(|_| default.to_string()))
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let parsed = raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_secs)?;
    Ok(Duration::from_secs(value))
}

fn parse_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_env(name: &str, value: &str) {
        // SAFETY: tests hold ENV_MUTEX and assign valid UTF-8 values.
        unsafe {
            env::set_var(name, value);
        }
    }

    fn remove_env(name: &str) {
        // SAFETY: tests hold ENV_MUTEX and clean up deterministic keys.
        unsafe {
            env::remove_var(name);
        }
    }

    fn reset_env() {
        remove_env("PUBLISHER_DATASET_PATH");
        remove_env("PUBLISHER_LOCATIONS_PATH");
        remove_env("PUBLISHER_ENRICHED_PATH");
        remove_env("ANTHROPIC_API_KEY");
        remove_env("ANTHROPIC_BASE_URL");
        remove_env("ANTHROPIC_MODEL");
        remove_env("ANTHROPIC_MAX_TOKENS");
        remove_env("ANTHROPIC_TIMEOUT_SECS");
        remove_env("CLASSIFY_MAX_ATTEMPTS");
        remove_env("CLASSIFY_RETRY_BACKOFF_SECS");
    }

    #[test]
    fn from_env_uses_defaults_when_optional_missing() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();

        let config = Config::from_env().expect("config should load");

        assert_eq!(config.dataset_path(), &PathBuf::from("Data.csv"));
        assert_eq!(
            config.locations_path(),
            &PathBuf::from("publisher_locations.csv")
        );
        assert_eq!(
            config.enriched_path(),
            &PathBuf::from("Data_with_location.csv")
        );
        assert_eq!(config.anthropic_base_url(), "https://api.anthropic.com/");
        assert_eq!(config.anthropic_model(), "claude-3-sonnet-20240229");
        assert_eq!(config.anthropic_max_tokens(), 10);
        assert_eq!(config.anthropic_timeout(), Duration::from_secs(600));
        assert_eq!(config.classify_max_attempts().get(), 3);
        assert_eq!(config.classify_retry_backoff(), Duration::from_secs(3));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn from_env_overrides_values() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("PUBLISHER_DATASET_PATH", "/data/headlines.csv");
        set_env("ANTHROPIC_API_KEY", "sk-test");
        set_env("ANTHROPIC_BASE_URL", "http://localhost:8080/");
        set_env("ANTHROPIC_MODEL", "claude-test");
        set_env("CLASSIFY_MAX_ATTEMPTS", "5");
        set_env("CLASSIFY_RETRY_BACKOFF_SECS", "1");

        let config = Config::from_env().expect("config should load");

        assert_eq!(
            config.dataset_path(),
            &PathBuf::from("/data/headlines.csv")
        );
        assert_eq!(config.require_api_key().expect("key is set"), "sk-test");
        assert_eq!(config.anthropic_base_url(), "http://localhost:8080/");
        assert_eq!(config.anthropic_model(), "claude-test");
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(5, Duration::from_secs(1))
        );
    }

    #[test]
    fn require_api_key_errors_when_missing() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("ANTHROPIC_API_KEY", "   ");

        let config = Config::from_env().expect("config should load");
        let error = config.require_api_key().expect_err("blank key should fail");

        assert!(matches!(error, ConfigError::Missing("ANTHROPIC_API_KEY")));
    }

    #[test]
    fn from_env_rejects_zero_attempts() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("CLASSIFY_MAX_ATTEMPTS", "0");

        let error = Config::from_env().expect_err("zero attempts should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "CLASSIFY_MAX_ATTEMPTS",
                ..
            }
        ));
    }

    #[test]
    fn from_env_rejects_non_numeric_backoff() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("CLASSIFY_RETRY_BACKOFF_SECS", "soon");

        let error = Config::from_env().expect_err("non-numeric backoff should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "CLASSIFY_RETRY_BACKOFF_SECS",
                ..
            }
        ));
    }
}
