//! Component I — Formatter, grounded on
//! `original_source/src/formatter.py::TranscriptFormatter`/
//! `StatisticsGenerator` for the text/JSON renderings and on
//! `original_source/src/srt_exporter.py::SRTExporter` for SRT emission.
//! Kept as plain functions over plain data rather than an object hierarchy,
//! since no shared state is needed.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::{Classification, ClassificationLabel, LabeledSegment, TranscriptFilter};
use crate::util::{format_hms, format_srt_timestamp};

const RULE: &str = "================================================================================";

fn speaker_label<'a>(segment: &'a LabeledSegment, speaker_profiles: &'a HashMap<String, String>) -> &'a str {
    speaker_profiles
        .get(&segment.speaker_id)
        .map(String::as_str)
        .unwrap_or(&segment.speaker_id)
}

/// `[HH:MM:SS] Speaker (IC/OOC): Text`, with `Speaker as Character` when the
/// segment is IC and a character was identified.
pub fn format_full_transcript(
    segments: &[LabeledSegment],
    classifications: &[Classification],
    speaker_profiles: &HashMap<String, String>,
) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "TABLESCRIBE SESSION TRANSCRIPT - FULL VERSION".to_string(),
        RULE.to_string(),
        String::new(),
    ];

    for (segment, classification) in segments.iter().zip(classifications) {
        let timestamp = format_hms(segment.start_time);
        let speaker = speaker_label(segment, speaker_profiles);

        let speaker_label = match (&classification.character, classification.classification) {
            (Some(character), ClassificationLabel::Ic) => format!("{speaker} as {character}"),
            _ => speaker.to_string(),
        };

        lines.push(format!(
            "[{timestamp}] {speaker_label} ({}): {}",
            classification.classification, segment.text
        ));
    }

    lines.join("\n")
}

/// IC (and MIXED, per the backward-compat rule) segments only, labeled by
/// character name when known.
pub fn format_ic_only(
    segments: &[LabeledSegment],
    classifications: &[Classification],
    speaker_profiles: &HashMap<String, String>,
) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "TABLESCRIBE SESSION TRANSCRIPT - IN-CHARACTER ONLY".to_string(),
        RULE.to_string(),
        String::new(),
    ];

    for (segment, classification) in segments.iter().zip(classifications) {
        if !TranscriptFilter::IcOnly.keeps(classification.classification) {
            continue;
        }
        let timestamp = format_hms(segment.start_time);
        let speaker = speaker_label(segment, speaker_profiles);
        let display_name = classification.character.as_deref().unwrap_or(speaker);
        lines.push(format!("[{timestamp}] {display_name}: {}", segment.text));
    }

    lines.join("\n")
}

/// OOC (and MIXED) segments only.
pub fn format_ooc_only(
    segments: &[LabeledSegment],
    classifications: &[Classification],
    speaker_profiles: &HashMap<String, String>,
) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "TABLESCRIBE SESSION TRANSCRIPT - OUT-OF-CHARACTER ONLY".to_string(),
        RULE.to_string(),
        String::new(),
    ];

    for (segment, classification) in segments.iter().zip(classifications) {
        if !TranscriptFilter::OocOnly.keeps(classification.classification) {
            continue;
        }
        let timestamp = format_hms(segment.start_time);
        let speaker = speaker_label(segment, speaker_profiles);
        lines.push(format!("[{timestamp}] {speaker}: {}", segment.text));
    }

    lines.join("\n")
}

#[derive(Serialize)]
struct JsonSegment<'a> {
    start_time: f64,
    end_time: f64,
    duration: f64,
    text: &'a str,
    speaker_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaker_name: Option<&'a str>,
    classification: ClassificationLabel,
    classification_confidence: f64,
    classification_reasoning: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    character: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    metadata: serde_json::Value,
    segments: Vec<JsonSegment<'a>>,
}

/// Full segment + classification + metadata JSON rendering.
pub fn format_json(
    segments: &[LabeledSegment],
    classifications: &[Classification],
    speaker_profiles: &HashMap<String, String>,
    metadata: serde_json::Value,
) -> Result<String, serde_json::Error> {
    let rendered = segments
        .iter()
        .zip(classifications)
        .map(|(segment, classification)| JsonSegment {
            start_time: segment.start_time,
            end_time: segment.end_time,
            duration: segment.duration(),
            text: &segment.text,
            speaker_id: &segment.speaker_id,
            speaker_name: speaker_profiles.get(&segment.speaker_id).map(String::as_str),
            classification: classification.classification,
            classification_confidence: classification.confidence,
            classification_reasoning: &classification.reasoning,
            character: classification.character.as_deref(),
        })
        .collect();

    serde_json::to_string_pretty(&JsonOutput {
        metadata,
        segments: rendered,
    })
}

/// Session-level statistics, grounded on `StatisticsGenerator.generate_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatistics {
    pub total_duration_seconds: f64,
    pub total_duration_formatted: String,
    pub total_segments: usize,
    pub ic_segments: usize,
    pub ooc_segments: usize,
    pub mixed_segments: usize,
    pub ic_percentage: f64,
    pub ic_duration_seconds: f64,
    pub ic_duration_formatted: String,
    pub speaker_distribution: HashMap<String, usize>,
    pub character_appearances: HashMap<String, usize>,
}

pub fn generate_stats(segments: &[LabeledSegment], classifications: &[Classification]) -> SessionStatistics {
    let total_segments = segments.len();
    let ic_segments = classifications
        .iter()
        .filter(|c| c.classification == ClassificationLabel::Ic)
        .count();
    let ooc_segments = classifications
        .iter()
        .filter(|c| c.classification == ClassificationLabel::Ooc)
        .count();
    let mixed_segments = classifications
        .iter()
        .filter(|c| c.classification == ClassificationLabel::Mixed)
        .count();

    let total_duration = segments.last().map(|s| s.end_time).unwrap_or(0.0);
    let ic_duration: f64 = segments
        .iter()
        .zip(classifications)
        .filter(|(_, c)| c.classification == ClassificationLabel::Ic)
        .map(|(s, _)| s.duration())
        .sum();

    let mut speaker_distribution = HashMap::new();
    for segment in segments {
        *speaker_distribution.entry(segment.speaker_id.clone()).or_insert(0) += 1;
    }

    let mut character_appearances = HashMap::new();
    for classification in classifications {
        if let Some(character) = &classification.character {
            *character_appearances.entry(character.clone()).or_insert(0) += 1;
        }
    }

    SessionStatistics {
        total_duration_seconds: total_duration,
        total_duration_formatted: format_hms(total_duration),
        total_segments,
        ic_segments,
        ooc_segments,
        mixed_segments,
        ic_percentage: if total_segments > 0 {
            ic_segments as f64 / total_segments as f64 * 100.0
        } else {
            0.0
        },
        ic_duration_seconds: ic_duration,
        ic_duration_formatted: format_hms(ic_duration),
        speaker_distribution,
        character_appearances,
    }
}

/// `[index]\n[start --> end]\n[speaker] text\n\n` per segment.
pub fn to_srt(
    segments: &[LabeledSegment],
    classifications: &[Classification],
    filter: TranscriptFilter,
    speaker_profiles: &HashMap<String, String>,
    include_speaker: bool,
) -> String {
    let mut blocks = Vec::new();
    let mut index = 1;
    for (segment, classification) in segments.iter().zip(classifications) {
        if !filter.keeps(classification.classification) {
            continue;
        }
        let start = format_srt_timestamp(segment.start_time);
        let end = format_srt_timestamp(segment.end_time);
        let text = segment.text.trim();
        let body = if include_speaker {
            format!("[{}] {text}", speaker_label(segment, speaker_profiles))
        } else {
            text.to_string()
        };
        blocks.push(format!("{index}\n{start} --> {end}\n{body}\n"));
        index += 1;
    }
    blocks.join("\n")
}

/// Paths of every file written by [`save_all_formats`].
#[derive(Debug, Clone)]
pub struct FormatPaths {
    pub full_txt: PathBuf,
    pub ic_only_txt: PathBuf,
    pub ooc_only_txt: PathBuf,
    pub json: PathBuf,
    pub full_srt: PathBuf,
    pub ic_only_srt: PathBuf,
    pub ooc_only_srt: PathBuf,
}

/// Render and write every output format for a session, matching
/// `TranscriptFormatter.save_all_formats`.
pub fn save_all_formats(
    output_dir: &Path,
    session_name: &str,
    segments: &[LabeledSegment],
    classifications: &[Classification],
    speaker_profiles: &HashMap<String, String>,
    metadata: serde_json::Value,
) -> Result<FormatPaths, io::Error> {
    fs::create_dir_all(output_dir)?;

    let full_txt = output_dir.join(format!("{session_name}_full.txt"));
    fs::write(&full_txt, format_full_transcript(segments, classifications, speaker_profiles))?;

    let ic_only_txt = output_dir.join(format!("{session_name}_ic_only.txt"));
    fs::write(&ic_only_txt, format_ic_only(segments, classifications, speaker_profiles))?;

    let ooc_only_txt = output_dir.join(format!("{session_name}_ooc_only.txt"));
    fs::write(&ooc_only_txt, format_ooc_only(segments, classifications, speaker_profiles))?;

    let json = output_dir.join(format!("{session_name}_data.json"));
    let json_text = format_json(segments, classifications, speaker_profiles, metadata)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&json, json_text)?;

    let full_srt = output_dir.join(format!("{session_name}_full.srt"));
    fs::write(
        &full_srt,
        to_srt(segments, classifications, TranscriptFilter::All, speaker_profiles, true),
    )?;

    let ic_only_srt = output_dir.join(format!("{session_name}_ic_only.srt"));
    fs::write(
        &ic_only_srt,
        to_srt(segments, classifications, TranscriptFilter::IcOnly, speaker_profiles, true),
    )?;

    let ooc_only_srt = output_dir.join(format!("{session_name}_ooc_only.srt"));
    fs::write(
        &ooc_only_srt,
        to_srt(segments, classifications, TranscriptFilter::OocOnly, speaker_profiles, true),
    )?;

    Ok(FormatPaths {
        full_txt,
        ic_only_txt,
        ooc_only_txt,
        json,
        full_srt,
        ic_only_srt,
        ooc_only_srt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<LabeledSegment>, Vec<Classification>) {
        let segments = vec![
            LabeledSegment {
                text: "I attack the goblin!".to_string(),
                start_time: 0.0,
                end_time: 3.0,
                speaker_id: "SPEAKER_00".to_string(),
                confidence: None,
                words: None,
            },
            LabeledSegment {
                text: "wait can we order pizza first".to_string(),
                start_time: 3.0,
                end_time: 6.0,
                speaker_id: "SPEAKER_01".to_string(),
                confidence: None,
                words: None,
            },
        ];
        let classifications = vec![
            Classification {
                segment_index: 0,
                classification: ClassificationLabel::Ic,
                confidence: 0.9,
                reasoning: "combat action".to_string(),
                character: Some("Grog".to_string()),
            },
            Classification {
                segment_index: 1,
                classification: ClassificationLabel::Ooc,
                confidence: 0.8,
                reasoning: "meta discussion".to_string(),
                character: None,
            },
        ];
        (segments, classifications)
    }

    #[test]
    fn full_transcript_shows_character_name_for_ic_segments() {
        let (segments, classifications) = sample();
        let text = format_full_transcript(&segments, &classifications, &HashMap::new());
        assert!(text.contains("SPEAKER_00 as Grog (IC): I attack the goblin!"));
    }

    #[test]
    fn ic_only_drops_ooc_segments() {
        let (segments, classifications) = sample();
        let text = format_ic_only(&segments, &classifications, &HashMap::new());
        assert!(text.contains("Grog"));
        assert!(!text.contains("pizza"));
    }

    #[test]
    fn ooc_only_drops_ic_segments() {
        let (segments, classifications) = sample();
        let text = format_ooc_only(&segments, &classifications, &HashMap::new());
        assert!(text.contains("pizza"));
        assert!(!text.contains("attack"));
    }

    #[test]
    fn json_round_trips_through_serde() {
        let (segments, classifications) = sample();
        let json = format_json(&segments, &classifications, &HashMap::new(), serde_json::json!({})).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["segments"][0]["character"], "Grog");
    }

    #[test]
    fn srt_filters_and_numbers_sequentially() {
        let (segments, classifications) = sample();
        let srt = to_srt(&segments, &classifications, TranscriptFilter::IcOnly, &HashMap::new(), true);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:03,000"));
        assert!(!srt.contains("pizza"));
    }

    #[test]
    fn stats_compute_ic_percentage_and_distributions() {
        let (segments, classifications) = sample();
        let stats = generate_stats(&segments, &classifications);
        assert_eq!(stats.total_segments, 2);
        assert_eq!(stats.ic_segments, 1);
        assert_eq!(stats.ic_percentage, 50.0);
        assert_eq!(stats.character_appearances["Grog"], 1);
    }
}
