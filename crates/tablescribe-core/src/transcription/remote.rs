//! Cloud transcription backend (Groq/OpenAI-compatible Whisper APIs),
//! grounded on `original_source/src/transcriber.py::GroqTranscriber` for the
//! request/response shape and on a blocking `reqwest` multipart-upload
//! pattern for talking to an OpenAI-compatible transcription endpoint.

use std::time::Duration;

use reqwest::blocking::{multipart, Client};
use serde::Deserialize;

use crate::audio::types::AudioChunk;
use crate::model::{ChunkTranscription, TranscriptionSegment, Word};
use crate::preflight::{PreflightIssue, SupportsPreflight};
use crate::ratelimit::{retry::retry_with_backoff, RateLimiter, RetryConfig};

use super::error::TranscriptionError;
use super::TranscriptionBackend;

const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub struct RemoteWhisperConfig {
    pub name: &'static str,
    pub api_base: String,
    pub model: String,
    pub api_key: Option<String>,
}

/// A Whisper-compatible cloud backend (verbose_json response with
/// segment + word timestamps), shared by any provider exposing that
/// contract.
pub struct RemoteWhisperBackend {
    config: RemoteWhisperConfig,
    client: Client,
    rate_limiter: RateLimiter,
    retry: RetryConfig,
}

impl RemoteWhisperBackend {
    pub fn new(config: RemoteWhisperConfig, rate_limiter: RateLimiter) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");
        Self {
            config,
            client,
            rate_limiter,
            retry: RetryConfig::default(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.config.api_base.trim_end_matches('/'))
    }

    fn wav_bytes(chunk: &AudioChunk) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: chunk.sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            };
            let mut writer =
                hound::WavWriter::new(std::io::Cursor::new(&mut buf), spec).expect("wav header");
            for sample in &chunk.samples {
                writer.write_sample(*sample).expect("wav sample");
            }
            writer.finalize().expect("wav finalize");
        }
        buf
    }

    fn call_once(&self, chunk: &AudioChunk, language: &str) -> Result<RawResponse, (TranscriptionError, bool)> {
        let api_key = self.config.api_key.as_deref().unwrap_or("");
        let form = multipart::Form::new()
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .text("language", language.to_string())
            .part(
                "file",
                multipart::Part::bytes(Self::wav_bytes(chunk))
                    .file_name(format!("chunk_{}.wav", chunk.chunk_index))
                    .mime_str("audio/wav")
                    .expect("valid mime"),
            );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .map_err(|e| {
                (
                    TranscriptionError::RequestFailed {
                        backend: self.config.name.to_string(),
                        message: e.to_string(),
                    },
                    false,
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let is_rate_limited = status.as_u16() == 429;
            let body = response.text().unwrap_or_default();
            return Err((
                TranscriptionError::RequestFailed {
                    backend: self.config.name.to_string(),
                    message: format!("HTTP {status}: {body}"),
                },
                is_rate_limited,
            ));
        }

        response.json::<RawResponse>().map_err(|e| {
            (
                TranscriptionError::BadResponse {
                    backend: self.config.name.to_string(),
                    message: e.to_string(),
                },
                false,
            )
        })
    }
}

impl SupportsPreflight for RemoteWhisperBackend {
    fn preflight_check(&self) -> Vec<PreflightIssue> {
        if self.config.api_key.as_deref().unwrap_or("").is_empty() {
            vec![PreflightIssue::error(
                format!("transcriber.{}", self.config.name),
                "API key not configured",
            )]
        } else {
            Vec::new()
        }
    }
}

impl TranscriptionBackend for RemoteWhisperBackend {
    fn name(&self) -> &'static str {
        self.config.name
    }

    fn transcribe_chunk(
        &self,
        chunk: &AudioChunk,
        language: &str,
    ) -> Result<ChunkTranscription, TranscriptionError> {
        self.rate_limiter.acquire();
        let raw = retry_with_backoff(&self.retry, &crate::ratelimit::limiter::SystemSleeper, |_attempt| {
            self.call_once(chunk, language)
        })?;

        let segments = raw
            .segments
            .into_iter()
            .map(|seg| {
                let absolute_start = chunk.start_time + seg.start;
                let absolute_end = chunk.start_time + seg.end;
                let words = raw.words.as_ref().map(|words| {
                    words
                        .iter()
                        .filter(|w| w.start >= seg.start && w.start <= seg.end)
                        .map(|w| Word {
                            word: w.word.clone(),
                            start: chunk.start_time + w.start,
                            end: chunk.start_time + w.end,
                            probability: w.probability.unwrap_or(1.0),
                        })
                        .collect::<Vec<_>>()
                });
                TranscriptionSegment {
                    text: seg.text.trim().to_string(),
                    start_time: absolute_start,
                    end_time: absolute_end,
                    confidence: None,
                    words,
                }
            })
            .collect();

        Ok(ChunkTranscription {
            chunk_index: chunk.chunk_index,
            chunk_start: chunk.start_time,
            chunk_end: chunk.end_time,
            segments,
            language: raw.language.unwrap_or_else(|| language.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    language: Option<String>,
    segments: Vec<RawSegment>,
    words: Option<Vec<RawWord>>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    text: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    word: String,
    start: f64,
    end: f64,
    probability: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_bytes_start_with_riff_header() {
        let chunk = AudioChunk {
            chunk_index: 0,
            start_time: 0.0,
            end_time: 1.0,
            sample_rate: 16_000,
            samples: vec![0.0; 16_000],
        };
        let bytes = RemoteWhisperBackend::wav_bytes(&chunk);
        assert_eq!(&bytes[0..4], b"RIFF");
    }

    #[test]
    fn missing_api_key_is_a_preflight_error() {
        let backend = RemoteWhisperBackend::new(
            RemoteWhisperConfig {
                name: "groq",
                api_base: "https://api.groq.com/openai/v1".to_string(),
                model: "whisper-large-v3-turbo".to_string(),
                api_key: None,
            },
            RateLimiter::new(10, 60.0, None),
        );
        let issues = backend.preflight_check();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
    }
}
