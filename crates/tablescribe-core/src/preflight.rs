//! Pre-execution readiness checks (GLOSSARY: "Preflight"), grounded on
//! `original_source/src/preflight.py`.

/// An issue detected during preflight checks on a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightIssue {
    pub component: String,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl PreflightIssue {
    pub fn error(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Capability trait implemented by anything that can report readiness
/// issues before the pipeline begins (transcriber, diarizer, classifier).
pub trait SupportsPreflight {
    fn preflight_check(&self) -> Vec<PreflightIssue> {
        Vec::new()
    }
}

/// Aggregate preflight checks from transcriber/diarizer/classifier, raising
/// a single aggregated error listing all blocking issues if any are found
/// (spec.md §7, "Preflight errors raised before any stage executes").
///
/// Generic over `?Sized` rather than taking `&dyn SupportsPreflight`
/// directly, so callers can pass `&dyn TranscriptionBackend` and friends
/// without needing to upcast to the supertrait object.
pub fn verify<T, D, C>(
    transcriber: &T,
    diarizer: &D,
    classifier: &C,
    skip_diarization: bool,
    skip_classification: bool,
) -> Result<Vec<PreflightIssue>, String>
where
    T: SupportsPreflight + ?Sized,
    D: SupportsPreflight + ?Sized,
    C: SupportsPreflight + ?Sized,
{
    let mut issues = transcriber.preflight_check();
    if !skip_diarization {
        issues.extend(diarizer.preflight_check());
    }
    if !skip_classification {
        issues.extend(classifier.preflight_check());
    }

    let errors: Vec<&PreflightIssue> = issues.iter().filter(|i| i.is_error()).collect();
    if errors.is_empty() {
        Ok(issues)
    } else {
        let bullets: Vec<String> = errors
            .iter()
            .map(|i| format!("- {}: {}", i.component, i.message))
            .collect();
        Err(format!("Preflight checks failed:\n{}", bullets.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clean;
    impl SupportsPreflight for Clean {}

    struct Broken;
    impl SupportsPreflight for Broken {
        fn preflight_check(&self) -> Vec<PreflightIssue> {
            vec![PreflightIssue::error("x", "missing credentials")]
        }
    }

    #[test]
    fn aggregates_errors_across_components() {
        let err = verify(&Broken, &Clean, &Broken, false, false).unwrap_err();
        assert!(err.contains("missing credentials"));
    }

    #[test]
    fn skipped_components_are_not_checked() {
        let issues = verify(&Clean, &Broken, &Broken, true, true).unwrap();
        assert!(issues.is_empty());
    }
}
