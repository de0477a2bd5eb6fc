//! Research digest and shared prompt context.

use serde_json::Value;

use crate::request::PipelineRequest;
use crate::research::{ResearchReport, ResearchSection};

/// Digest text when a report has no usable section.
pub const NO_RESEARCH_SUMMARY: &str = "No research summary available.";

/// Character budget for one section of the digest.
pub fn section_budget(section: ResearchSection) -> usize {
    match section {
        ResearchSection::CompetitorAnalysis | ResearchSection::RisksAndChallenges => 1500,
        ResearchSection::MarketAnalysis => 1200,
        ResearchSection::StrategicRecommendations => 1000,
        ResearchSection::AudienceAnalysis
        | ResearchSection::ValuePropositionAnalysis
        | ResearchSection::CompetitiveAdvantageAnalysis => 800,
    }
}

/// Compress a report into a bounded-length labeled digest.
///
/// Each present, non-empty section is serialized compactly and cut at its
/// budget. Sections are joined with blank lines in report order.
pub fn summarize(report: &ResearchReport) -> String {
    let parts: Vec<String> = ResearchSection::ALL
        .iter()
        .filter_map(|&section| {
            let text = section_text(report.section(section)?)?;
            let body = truncate_chars(&text, section_budget(section));
            Some(format!("{}: {}", section.label(), body))
        })
        .collect();

    if parts.is_empty() {
        NO_RESEARCH_SUMMARY.to_string()
    } else {
        parts.join("\n\n")
    }
}

fn section_text(value: &Value) -> Option<String> {
    let empty = match value {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    };
    if empty {
        return None;
    }
    Some(match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    })
}

/// Cut at a char boundary; appends an ellipsis when anything was dropped.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// The single context block both analysts and the adjudicator read.
pub fn build_context(request: &PipelineRequest, digest: &str) -> String {
    let mut out = String::from("## Pitch\n");
    for (label, value) in request.labeled_fields() {
        if !value.is_empty() {
            out.push_str(&format!("{label}: {value}\n"));
        }
    }
    out.push_str("\n## Research summary\n");
    out.push_str(digest);
    out.push('\n');
    out
}
