//! Cloud LLM classifier backend, grounded on
//! `original_source/src/classifier.py::GroqClassifier`: rate-limiter
//! `acquire()` before every call, an explicit `penalize()` on a detected
//! 429 on top of the generic retry core, and a per-segment "default to IC"
//! fallback on any unrecoverable failure (matching the per-segment
//! try/except in `classify_segments`, not a single failure failing the
//! whole batch).

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::model::{Classification, ClassificationLabel};
use crate::preflight::{PreflightIssue, SupportsPreflight};
use crate::ratelimit::limiter::SystemSleeper;
use crate::ratelimit::{retry::retry_with_backoff, RateLimiter, RetryConfig};

use super::error::ClassificationError;
use super::{context_windows, prompt};
use super::Classifier;

const DEFAULT_CONFIDENCE: f64 = 0.5;

pub struct RemoteLlmClassifier {
    api_key: Option<String>,
    api_base: String,
    model: String,
    prompt_template: String,
    client: Client,
    rate_limiter: RateLimiter,
    retry: RetryConfig,
}

impl RemoteLlmClassifier {
    pub fn new(api_key: Option<String>, model: impl Into<String>, rate_limiter: RateLimiter) -> Self {
        Self {
            api_key,
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: model.into(),
            prompt_template: prompt::DEFAULT_TEMPLATE_EN.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("failed to build HTTP client"),
            rate_limiter,
            retry: RetryConfig::default(),
        }
    }

    fn call_once(&self, prompt_text: &str) -> Result<String, (String, bool)> {
        let api_key = self.api_key.as_deref().unwrap_or("");
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt_text.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| (e.to_string(), false))?;

        let status = response.status();
        if !status.is_success() {
            let is_rate_limited = status.as_u16() == 429;
            if is_rate_limited {
                self.rate_limiter.penalize(None);
            }
            let body = response.text().unwrap_or_default();
            return Err((format!("HTTP {status}: {body}"), is_rate_limited));
        }

        let parsed: ChatResponse = response.json().map_err(|e| (e.to_string(), false))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ("empty choices array in response".to_string(), false))
    }
}

impl SupportsPreflight for RemoteLlmClassifier {
    fn preflight_check(&self) -> Vec<PreflightIssue> {
        if self.api_key.as_deref().unwrap_or("").is_empty() {
            vec![PreflightIssue::error(
                "classifier.groq",
                "Groq API key not configured",
            )]
        } else {
            Vec::new()
        }
    }
}

impl Classifier for RemoteLlmClassifier {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn classify_segments(
        &self,
        texts: &[String],
        character_names: &[String],
        player_names: &[String],
    ) -> Result<Vec<Classification>, ClassificationError> {
        let windows = context_windows(texts);
        Ok(windows
            .into_iter()
            .enumerate()
            .map(|(index, (prev, current, next))| {
                let prompt_text = prompt::build_prompt(
                    &self.prompt_template,
                    &prev,
                    &current,
                    &next,
                    character_names,
                    player_names,
                );

                self.rate_limiter.acquire();
                let outcome = retry_with_backoff(&self.retry, &SystemSleeper, |_attempt| {
                    self.call_once(&prompt_text)
                });

                match outcome {
                    Ok(response) => prompt::parse_response(&response, index, DEFAULT_CONFIDENCE),
                    Err(error) => {
                        tracing::error!(segment = index, %error, "classification failed via groq, defaulting to IC");
                        Classification {
                            segment_index: index,
                            classification: ClassificationLabel::Ic,
                            confidence: DEFAULT_CONFIDENCE,
                            reasoning: "Classification failed, defaulted to IC".to_string(),
                            character: None,
                        }
                    }
                }
            })
            .collect())
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_preflight_error() {
        let classifier =
            RemoteLlmClassifier::new(None, "llama-3.3-70b-versatile", RateLimiter::new(10, 1.0, None));
        let issues = classifier.preflight_check();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
    }
}
