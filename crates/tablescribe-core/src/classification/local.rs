//! Local LLM classifier backend, grounded on
//! `original_source/src/classifier.py::OllamaClassifier`: a memory-error
//! substring detector gates a low-vram retry, then a fallback-model retry,
//! then gives up and defaults to IC.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Classification, ClassificationLabel};
use crate::preflight::{PreflightIssue, SupportsPreflight};

use super::error::ClassificationError;
use super::{context_windows, is_memory_error, prompt};
use super::Classifier;

const DEFAULT_CONFIDENCE: f64 = 0.5;

static PARAM_COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*b").expect("valid regex"));

/// Rough RAM requirement in GB for a local model, guessed from the parameter
/// count embedded in its name (e.g. "qwen2.5:14b" -> 14), matching
/// `_estimate_required_memory_gb`'s size-class ladder. `None` when the name
/// carries no parseable parameter count.
fn estimate_required_memory_gb(model_name: &str) -> Option<u32> {
    let model_lower = model_name.to_lowercase();
    let size: u32 = PARAM_COUNT_RE.captures(&model_lower)?.get(1)?.as_str().parse().ok()?;
    match size {
        s if s >= 20 => Some(16),
        s if s >= 14 => Some(12),
        s if s >= 10 => Some(10),
        s if s >= 7 => Some(8),
        s if s >= 5 => Some(6),
        _ => None,
    }
}

/// Total system RAM in GB, read from `/proc/meminfo`'s `MemTotal` line.
/// `None` on any other platform or if the file can't be parsed, matching
/// `_estimate_total_memory_gb`'s graceful degradation when no detection
/// method is available.
fn estimate_total_memory_gb() -> Option<f64> {
    let contents = std::fs::read_to_string("/proc/meminfo").ok()?;
    let kb_str = contents
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))?
        .split_whitespace()
        .next()?;
    let kb: f64 = kb_str.parse().ok()?;
    Some(kb / (1024.0 * 1024.0))
}

/// Warns when the detected RAM falls short of the model's estimated
/// requirement, matching `_memory_requirement_issue`. Silent (returns
/// `None`) when either side of the comparison can't be determined.
fn memory_requirement_issue(model_name: &str) -> Option<PreflightIssue> {
    let required_gb = estimate_required_memory_gb(model_name)?;
    let available_gb = estimate_total_memory_gb()?;
    if available_gb >= required_gb as f64 {
        return None;
    }
    Some(PreflightIssue::warning(
        "classifier.local",
        format!(
            "model '{model_name}' typically needs ~{required_gb}GB RAM, but only {available_gb:.1}GB was detected. \
             Expect memory layout errors unless you enable low_vram, reduce context, or choose a smaller model."
        ),
    ))
}

/// A single generation call: model name, prompt, and whether to request
/// reduced VRAM settings. Returns the raw text response or an error
/// message (inspected via [`is_memory_error`]).
pub trait GenerationEngine: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, low_vram: bool) -> Result<String, String>;
}

pub struct LocalClassifier {
    model: String,
    fallback_model: Option<String>,
    prompt_template: String,
    engine: Option<Box<dyn GenerationEngine>>,
}

impl LocalClassifier {
    pub fn new(model: impl Into<String>, fallback_model: Option<String>) -> Self {
        Self {
            model: model.into(),
            fallback_model,
            prompt_template: prompt::DEFAULT_TEMPLATE_EN.to_string(),
            engine: None,
        }
    }

    pub fn with_engine(mut self, engine: Box<dyn GenerationEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    fn generate_with_retry(&self, engine: &dyn GenerationEngine, prompt_text: &str, index: usize) -> Option<String> {
        match engine.generate(&self.model, prompt_text, false) {
            Ok(text) => return Some(text),
            Err(first_error) => {
                if is_memory_error(&first_error) {
                    tracing::warn!(
                        segment = index,
                        model = %self.model,
                        error = %first_error,
                        "memory error during classification, retrying with low_vram settings"
                    );
                    if let Ok(text) = engine.generate(&self.model, prompt_text, true) {
                        return Some(text);
                    }

                    if let Some(fallback) = self.fallback_model.as_deref().filter(|f| *f != self.model) {
                        tracing::warn!(
                            segment = index,
                            model = %self.model,
                            fallback,
                            "low-vram retry failed, retrying with fallback model"
                        );
                        if let Ok(text) = engine.generate(fallback, prompt_text, false) {
                            return Some(text);
                        }
                    }
                }
                tracing::warn!(segment = index, model = %self.model, error = %first_error, "classification failed, defaulting to IC");
                None
            }
        }
    }
}

impl SupportsPreflight for LocalClassifier {
    fn preflight_check(&self) -> Vec<PreflightIssue> {
        let mut issues = Vec::new();
        if self.engine.is_none() {
            issues.push(PreflightIssue::error(
                "classifier.local",
                format!("no generation engine configured for model '{}'", self.model),
            ));
        }
        if let Some(issue) = memory_requirement_issue(&self.model) {
            issues.push(issue);
        }
        issues
    }
}

impl Classifier for LocalClassifier {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn classify_segments(
        &self,
        texts: &[String],
        character_names: &[String],
        player_names: &[String],
    ) -> Result<Vec<Classification>, ClassificationError> {
        let engine = self.engine.as_ref().ok_or_else(|| ClassificationError::NotConfigured {
            backend: self.name().to_string(),
            message: "no generation engine configured".to_string(),
        })?;

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
                match self.generate_with_retry(engine.as_ref(), &prompt_text, index) {
                    Some(response) => prompt::parse_response(&response, index, DEFAULT_CONFIDENCE),
                    None => Classification {
                        segment_index: index,
                        classification: ClassificationLabel::Ic,
                        confidence: DEFAULT_CONFIDENCE,
                        reasoning: "Classification failed, defaulted to IC".to_string(),
                        character: None,
                    },
                }
            })
            .collect())
    }
}
