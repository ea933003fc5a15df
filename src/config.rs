use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
pub struct Config {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub sentry_dsn: Option<String>,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_raw_values(
            std::env::var("PROMPTS_API_URL").ok().as_deref(),
            std::env::var("PROMPTS_API_KEY").ok().as_deref(),
            std::env::var("PROMPTS_TIMEOUT_SECS").ok().as_deref(),
            std::env::var("SENTRY_DSN").ok().as_deref(),
            std::env::var("ENVIRONMENT").ok().as_deref(),
        )
    }

    /// Parse already-read variable values; blank or malformed ones fall back
    /// to defaults. Tests call this instead of setting env vars.
    pub fn from_raw_values(
        api_url: Option<&str>,
        api_key: Option<&str>,
        timeout_secs: Option<&str>,
        sentry_dsn: Option<&str>,
        environment: Option<&str>,
    ) -> Self {
        let api_url = api_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();

        let api_key = api_key.filter(|s| !s.is_empty()).map(String::from);

        let timeout = timeout_secs
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let sentry_dsn = sentry_dsn.filter(|s| !s.is_empty()).map(String::from);

        let environment = environment
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| "local".to_string());

        Config {
            api_url,
            api_key,
            timeout,
            sentry_dsn,
            environment,
        }
    }
}
