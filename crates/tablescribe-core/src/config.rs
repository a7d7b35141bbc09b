//! Environment-assembled settings: each accessor falls back to a named
//! environment variable (and a sane default) when nothing more specific is
//! configured, the same env-var-fallback shape used for every backend this
//! pipeline can talk to.

use std::path::PathBuf;
use std::time::Duration;

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_f64(key: &str, default: f64) -> f64 {
    env_string(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_string(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env_string(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Rate-limit parameters for one remote backend (spec.md §6,
/// "Rate-limit parameters for each remote backend (max_calls, period,
/// burst_size)").
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub max_calls: usize,
    pub period_secs: f64,
    pub burst_size: Option<usize>,
}

impl RateLimitSettings {
    fn from_env(prefix: &str, default_max_calls: usize, default_period_secs: f64) -> Self {
        Self {
            max_calls: env_usize(&format!("{prefix}_MAX_CALLS"), default_max_calls),
            period_secs: env_f64(&format!("{prefix}_PERIOD_SECS"), default_period_secs),
            burst_size: env_string(&format!("{prefix}_BURST_SIZE")).and_then(|v| v.parse().ok()),
        }
    }
}

/// Settings for the offloaded (submit-job/poll-result) classifier backend.
#[derive(Debug, Clone, Copy)]
pub struct OffloadedSettings {
    pub poll_interval: Duration,
    pub total_timeout: Duration,
}

/// Everything the CLI needs to construct a session's backends, assembled
/// from environment variables (with an optional `.env` file loaded first
/// via `dotenvy`) rather than a config file format of its own.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Explicit override for the transcoder binary path; `None` falls back
    /// to PATH discovery (spec.md §6, "discovered in PATH or bundled
    /// install").
    pub transcoder_binary: Option<PathBuf>,

    pub transcription_api_key: Option<String>,
    pub transcription_api_base: Option<String>,
    pub diarization_api_token: Option<String>,
    pub classification_api_key: Option<String>,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
    /// "Fallback model name" (spec.md §6) used when the primary local LLM
    /// call fails with a memory error.
    pub classification_fallback_model: Option<String>,

    pub transcription_rate_limit: RateLimitSettings,
    pub diarization_rate_limit: RateLimitSettings,
    pub classification_rate_limit: RateLimitSettings,

    pub offloaded: OffloadedSettings,

    pub offloaded_pending_dir: Option<PathBuf>,
    pub offloaded_complete_dir: Option<PathBuf>,

    /// Toggle for snippet-export streaming mode, default on (spec.md §6).
    pub snippet_streaming_enabled: bool,
}

impl Settings {
    /// Load a `.env` file if present (ignoring a missing file, matching
    /// `dotenvy::dotenv().ok()`'s conventional use at process start), then
    /// assemble settings from the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            transcoder_binary: env_string("TABLESCRIBE_FFMPEG_PATH").map(PathBuf::from),

            transcription_api_key: env_string("TABLESCRIBE_TRANSCRIPTION_API_KEY")
                .or_else(|| env_string("GROQ_API_KEY")),
            transcription_api_base: env_string("TABLESCRIBE_TRANSCRIPTION_API_BASE"),
            diarization_api_token: env_string("TABLESCRIBE_DIARIZATION_API_TOKEN")
                .or_else(|| env_string("HUGGINGFACE_API_TOKEN")),
            classification_api_key: env_string("TABLESCRIBE_CLASSIFICATION_API_KEY")
                .or_else(|| env_string("GROQ_API_KEY")),
            ollama_url: env_string("OLLAMA_URL"),
            ollama_model: env_string("OLLAMA_MODEL"),
            classification_fallback_model: env_string("TABLESCRIBE_CLASSIFICATION_FALLBACK_MODEL"),

            transcription_rate_limit: RateLimitSettings::from_env("TABLESCRIBE_TRANSCRIPTION_RATE", 20, 60.0),
            diarization_rate_limit: RateLimitSettings::from_env("TABLESCRIBE_DIARIZATION_RATE", 10, 60.0),
            classification_rate_limit: RateLimitSettings::from_env("TABLESCRIBE_CLASSIFICATION_RATE", 30, 60.0),

            offloaded: OffloadedSettings {
                poll_interval: Duration::from_millis(env_usize("TABLESCRIBE_OFFLOADED_POLL_MS", 500) as u64),
                total_timeout: Duration::from_secs(env_usize("TABLESCRIBE_OFFLOADED_TIMEOUT_SECS", 1800) as u64),
            },
            offloaded_pending_dir: env_string("TABLESCRIBE_OFFLOADED_PENDING_DIR").map(PathBuf::from),
            offloaded_complete_dir: env_string("TABLESCRIBE_OFFLOADED_COMPLETE_DIR").map(PathBuf::from),

            snippet_streaming_enabled: env_bool("TABLESCRIBE_SNIPPET_STREAMING", true),
        }
    }

    pub fn ollama_url_or_default(&self) -> String {
        self.ollama_url.clone().unwrap_or_else(|| "http://localhost:11434".to_string())
    }

    pub fn ollama_model_or_default(&self) -> String {
        self.ollama_model.clone().unwrap_or_else(|| "qwen2.5:7b".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_settings_fall_back_to_defaults_when_unset() {
        std::env::remove_var("TEST_PREFIX_MAX_CALLS");
        std::env::remove_var("TEST_PREFIX_PERIOD_SECS");
        let settings = RateLimitSettings::from_env("TEST_PREFIX", 5, 30.0);
        assert_eq!(settings.max_calls, 5);
        assert_eq!(settings.period_secs, 30.0);
        assert!(settings.burst_size.is_none());
    }

    #[test]
    fn ollama_url_falls_back_to_the_conventional_local_default() {
        let settings = Settings {
            ollama_url: None,
            ..Settings::from_env()
        };
        assert_eq!(settings.ollama_url_or_default(), "http://localhost:11434");
    }
}
