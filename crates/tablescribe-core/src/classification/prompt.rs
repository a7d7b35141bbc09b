//! Prompt template rendering and response parsing shared by every
//! classifier backend, grounded on
//! `original_source/src/classifier.py::BaseClassifier._build_prompt` /
//! `_parse_response`. Field names (`Classificatie`/`Reden`/`Vertrouwen`/
//! `Personage`) are kept verbatim since they're the wire contract a real
//! prompt template and its LLM both rely on, not incidental naming.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Classification, ClassificationLabel};

/// Default English-language classification prompt, used when no
/// per-language template has been supplied.
pub const DEFAULT_TEMPLATE_EN: &str = "Context: tabletop RPG session\n\
Characters: {char_list}\n\
Players: {player_list}\n\
\n\
Analyze this segment and classify it as IC (in-character), OOC (out-of-character), or MIXED:\n\
\n\
Previous segment: \"{prev_text}\"\n\
Current segment: \"{current_text}\"\n\
Next segment: \"{next_text}\"\n\
\n\
Respond in this format:\n\
Classificatie: IC|OOC|MIXED\n\
Reden: <short explanation>\n\
Vertrouwen: <0.0-1.0>\n\
Personage: <name or N/A>";

pub fn build_prompt(
    template: &str,
    prev_text: &str,
    current_text: &str,
    next_text: &str,
    character_names: &[String],
    player_names: &[String],
) -> String {
    let char_list = if character_names.is_empty() {
        "Unknown".to_string()
    } else {
        character_names.join(", ")
    };
    let player_list = if player_names.is_empty() {
        "Unknown".to_string()
    } else {
        player_names.join(", ")
    };

    template
        .replace("{char_list}", &char_list)
        .replace("{player_list}", &player_list)
        .replace("{prev_text}", prev_text)
        .replace("{current_text}", current_text)
        .replace("{next_text}", next_text)
}

static CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Classificatie:\s*(\w+)").unwrap());
static REASON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)Reden:\s*(.+?)(?:Vertrouwen:|Personage:|$)").unwrap()
});
static CONFIDENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Vertrouwen:\s*([\d.]+)").unwrap());
static CHARACTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Personage:\s*(.+?)(?:\n|$)").unwrap());

/// Parse one LLM response into a [`Classification`]. Defaults to `IC` with
/// the base confidence and an explanatory reasoning string on any parse
/// failure, matching the original's "never hard-fail on a bad response"
/// behavior.
pub fn parse_response(response: &str, segment_index: usize, default_confidence: f64) -> Classification {
    let classification = CLASS_RE
        .captures(response)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().to_uppercase().parse::<ClassificationLabel>().ok())
        .unwrap_or(ClassificationLabel::Ic);

    let reasoning = REASON_RE
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| "Could not parse response".to_string());

    let confidence = CONFIDENCE_RE
        .captures(response)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(default_confidence);

    let character = CHARACTER_RE
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.eq_ignore_ascii_case("n/a"));

    Classification {
        segment_index,
        classification,
        confidence,
        reasoning,
        character,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_prompt_substitutes_every_placeholder() {
        let prompt = build_prompt(
            DEFAULT_TEMPLATE_EN,
            "prev",
            "current",
            "next",
            &["Gandalf".to_string()],
            &[],
        );
        assert!(prompt.contains("Gandalf"));
        assert!(prompt.contains("Unknown"));
        assert!(prompt.contains("\"current\""));
    }

    #[test]
    fn parse_response_extracts_all_fields() {
        let response = "Classificatie: OOC\nReden: talking about rules\nVertrouwen: 0.85\nPersonage: N/A";
        let result = parse_response(response, 3, 0.5);
        assert_eq!(result.classification, ClassificationLabel::Ooc);
        assert_eq!(result.reasoning, "talking about rules");
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.character, None);
    }

    #[test]
    fn unparseable_response_defaults_to_ic() {
        let result = parse_response("garbage", 0, 0.5);
        assert_eq!(result.classification, ClassificationLabel::Ic);
        assert_eq!(result.reasoning, "Could not parse response");
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let response = "Classificatie: IC\nReden: ok\nVertrouwen: 1.5\nPersonage: N/A";
        let result = parse_response(response, 0, 0.5);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn character_name_is_captured_when_present() {
        let response = "Classificatie: IC\nReden: ok\nVertrouwen: 0.9\nPersonage: Gandalf";
        let result = parse_response(response, 0, 0.5);
        assert_eq!(result.character, Some("Gandalf".to_string()));
    }
}
