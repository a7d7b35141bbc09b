//! Component G — Classifier Backend, grounded on
//! `original_source/src/classifier.py::BaseClassifier` and its three
//! concrete backends (local Ollama, cloud Groq, offloaded Colab-via-Drive
//! file exchange).

pub mod error;
pub mod local;
pub mod offloaded;
pub mod prompt;
pub mod remote;

pub use error::ClassificationError;

use crate::model::Classification;
use crate::preflight::SupportsPreflight;

pub trait Classifier: Send + Sync + SupportsPreflight {
    fn name(&self) -> &'static str;

    fn classify_segments(
        &self,
        texts: &[String],
        character_names: &[String],
        player_names: &[String],
    ) -> Result<Vec<Classification>, ClassificationError>;
}

/// `(prev, current, next)` windows for each index in `texts`, matching the
/// original's `segments[i-1]`/`segments[i]`/`segments[i+1]` windowing with
/// empty strings at the boundaries.
pub fn context_windows(texts: &[String]) -> Vec<(String, String, String)> {
    texts
        .iter()
        .enumerate()
        .map(|(i, current)| {
            let prev = if i > 0 { texts[i - 1].clone() } else { String::new() };
            let next = texts.get(i + 1).cloned().unwrap_or_default();
            (prev, current.clone(), next)
        })
        .collect()
}

/// Substring heuristic for classifying an error message as memory
/// pressure, grounded verbatim on `classifier.py::_is_memory_error` and
/// kept intentionally as a string match rather than a typed error variant
/// (spec.md §9, §7: "not a distinct variant").
pub fn is_memory_error(message: &str) -> bool {
    const TRIGGERS: [&str; 5] = [
        "memory layout",
        "out of memory",
        "cuda out of memory",
        "not enough memory",
        "oom",
    ];
    let lowered = message.to_lowercase();
    TRIGGERS.iter().any(|trigger| lowered.contains(trigger))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_windows_pad_boundaries_with_empty_strings() {
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let windows = context_windows(&texts);
        assert_eq!(windows[0], ("".to_string(), "a".to_string(), "b".to_string()));
        assert_eq!(windows[2], ("b".to_string(), "c".to_string(), "".to_string()));
    }

    #[test]
    fn memory_error_matches_known_triggers() {
        assert!(is_memory_error("CUDA out of memory: tried to allocate"));
        assert!(is_memory_error("model requires different MEMORY LAYOUT"));
        assert!(!is_memory_error("connection refused"));
    }
}
