//! Answer scoring: asks the model to grade an answer in a fixed plain-text layout
//! and pulls score, feedback and covered key points back out with regular expressions.
//!
//! The model's text is free-form, so every field has a default:
//! score 0, feedback `DEFAULT_FEEDBACK`, no key points.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::interview::prompts::{SCORING_PROMPT, SCORING_SYSTEM};
use crate::llm_client::prompts::{bullet_list, render};
use crate::llm_client::LlmClient;

pub const DEFAULT_FEEDBACK: &str = "No feedback available.";
const TRANSCRIPT_MARKER: &str = "[Transcribed audio]";

/// What the model concluded about one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerAssessment {
    pub score: i32,
    pub feedback: String,
    pub key_points_covered: Vec<String>,
}

fn score_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^\W*score\b[^0-9\n]{0,12}?(\d+(?:\.\d+)?)(?:\s*(?:/|out\s+of)\s*(\d+(?:\.\d+)?))?")
            .expect("score regex is valid")
    })
}

fn feedback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)\bfeedback\b\W{0,4}?:\**\s*(.*?)\s*(?:\n[\s*#-]*key\s+points?\b|\z)")
            .expect("feedback regex is valid")
    })
}

fn key_points_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)\bkey\s+points?\s+covered\b\W{0,4}?:\**\s*(.*)\z")
            .expect("key points regex is valid")
    })
}

/// Extracts the score, rescaled onto `max_score` when the model used another
/// denominator, and clamped to `0..=max_score`.
fn parse_score(text: &str, max_score: i32) -> Option<i32> {
    let caps = score_re().captures(text)?;
    let raw: f64 = caps.get(1)?.as_str().parse().ok()?;
    let scaled = match caps.get(2).and_then(|d| d.as_str().parse::<f64>().ok()) {
        Some(denominator) if denominator > 0.0 && (denominator - max_score as f64).abs() > f64::EPSILON => {
            raw / denominator * max_score as f64
        }
        _ => raw,
    };
    Some((scaled.round() as i32).clamp(0, max_score.max(0)))
}

fn parse_feedback(text: &str) -> Option<String> {
    let caps = feedback_re().captures(text)?;
    let feedback = caps.get(1)?.as_str().trim().trim_matches('*').trim();
    if feedback.is_empty() {
        None
    } else {
        Some(feedback.to_string())
    }
}

fn parse_key_points(text: &str) -> Vec<String> {
    let Some(section) = key_points_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return Vec::new();
    };

    section
        .split(|c| matches!(c, '\n' | ',' | ';'))
        .map(|item| {
            item.trim()
                .trim_start_matches(|c: char| matches!(c, '-' | '*' | '•') || c.is_ascii_digit() || c == '.')
                .trim()
                .trim_end_matches('.')
                .trim()
        })
        .filter(|item| {
            !item.is_empty()
                && !matches!(
                    item.to_lowercase().as_str(),
                    "none" | "n/a" | "na" | "nothing"
                )
        })
        .map(String::from)
        .collect()
}

/// Parses the model's scoring text. Never fails: absent fields fall back to defaults.
pub fn parse_assessment(text: &str, max_score: i32) -> AnswerAssessment {
    let score = parse_score(text, max_score);
    let feedback = parse_feedback(text);
    if score.is_none() || feedback.is_none() {
        warn!(
            "Scoring output incomplete (score: {}, feedback: {}), using defaults",
            score.is_some(),
            feedback.is_some()
        );
    }
    AnswerAssessment {
        score: score.unwrap_or(0),
        feedback: feedback.unwrap_or_else(|| DEFAULT_FEEDBACK.to_string()),
        key_points_covered: parse_key_points(text),
    }
}

/// Joins a typed answer and an audio transcript into the text that is scored and stored.
/// Returns `None` when neither carries any content.
pub fn compose_answer_text(typed: Option<&str>, transcript: Option<&str>) -> Option<String> {
    let typed = typed.map(str::trim).filter(|t| !t.is_empty());
    let transcript = transcript.map(str::trim).filter(|t| !t.is_empty());
    match (typed, transcript) {
        (Some(t), Some(a)) => Some(format!("{t}\n\n{TRANSCRIPT_MARKER}\n{a}")),
        (Some(t), None) => Some(t.to_string()),
        (None, Some(a)) => Some(a.to_string()),
        (None, None) => None,
    }
}

/// The question being answered, as the scoring prompt needs it.
pub struct ScoringContext<'a> {
    pub job_title: &'a str,
    pub question_text: &'a str,
    pub key_points: &'a [String],
    pub max_score: i32,
}

pub fn build_scoring_prompt(ctx: &ScoringContext<'_>, answer_text: &str) -> String {
    let key_points = bullet_list(ctx.key_points);
    let max_score = ctx.max_score.to_string();
    render(
        SCORING_PROMPT,
        &[
            ("job_title", ctx.job_title),
            ("question", ctx.question_text),
            ("key_points", key_points.as_str()),
            ("max_score", max_score.as_str()),
            ("answer", answer_text),
        ],
    )
}

/// Scores one answer with the model. A failed model call is an error;
/// unparseable output is not.
pub async fn score_answer(
    llm: &LlmClient,
    ctx: &ScoringContext<'_>,
    answer_text: &str,
) -> Result<AnswerAssessment, AppError> {
    let prompt = build_scoring_prompt(ctx, answer_text);
    let text = llm
        .call_text(&prompt, SCORING_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Answer scoring failed: {e}")))?;

    let assessment = parse_assessment(&text, ctx.max_score);
    debug!(
        "Scored answer {}/{} ({} key points covered)",
        assessment.score,
        ctx.max_score,
        assessment.key_points_covered.len()
    );
    Ok(assessment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_well_formed_output() {
        let text = "Score: 7/10\n\
                    Feedback: Clear structure and a concrete example. Quantify the outcome next time.\n\
                    Key Points Covered: situation, action taken";
        let a = parse_assessment(text, 10);
        assert_eq!(a.score, 7);
        assert_eq!(
            a.feedback,
            "Clear structure and a concrete example. Quantify the outcome next time."
        );
        assert_eq!(a.key_points_covered, vec!["situation", "action taken"]);
    }

    #[test]
    fn test_defaults_when_nothing_matches() {
        let a = parse_assessment("I cannot grade this.", 10);
        assert_eq!(a.score, 0);
        assert_eq!(a.feedback, DEFAULT_FEEDBACK);
        assert!(a.key_points_covered.is_empty());
    }

    #[test]
    fn test_markdown_bold_labels() {
        let text = "**Score:** 4/5\n**Feedback:** Good depth.\n**Key Points Covered:** caching";
        let a = parse_assessment(text, 5);
        assert_eq!(a.score, 4);
        assert_eq!(a.feedback, "Good depth.");
        assert_eq!(a.key_points_covered, vec!["caching"]);
    }

    #[test]
    fn test_rescales_other_denominator() {
        assert_eq!(parse_score("Score: 8/10", 5), Some(4));
        assert_eq!(parse_score("Score: 3 out of 4", 10), Some(8));
    }

    #[test]
    fn test_score_only_read_from_its_own_line() {
        let text = "Score: N/A\nFeedback: Naming the trade-off would score 2 points higher.";
        assert_eq!(parse_score(text, 10), None);
        assert_eq!(parse_assessment(text, 10).score, 0);
        assert_eq!(parse_score("  - Score: 6/10", 10), Some(6));
    }

    #[test]
    fn test_score_without_denominator_is_clamped() {
        assert_eq!(parse_score("Score: 15", 10), Some(10));
        assert_eq!(parse_score("score - 6", 10), Some(6));
    }

    #[test]
    fn test_multiline_feedback_stops_at_key_points() {
        let text = "Score: 5/10\nFeedback: First line.\nSecond line.\n\n- Key Points Covered:\n- trade-offs\n- testing\n";
        let a = parse_assessment(text, 10);
        assert_eq!(a.feedback, "First line.\nSecond line.");
        assert_eq!(a.key_points_covered, vec!["trade-offs", "testing"]);
    }

    #[test]
    fn test_key_points_none_is_empty() {
        let a = parse_assessment("Score: 2/10\nFeedback: Off topic.\nKey Points Covered: None", 10);
        assert!(a.key_points_covered.is_empty());
        assert_eq!(a.feedback, "Off topic.");
    }

    #[test]
    fn test_missing_feedback_keeps_score() {
        let a = parse_assessment("Score: 9/10", 10);
        assert_eq!(a.score, 9);
        assert_eq!(a.feedback, DEFAULT_FEEDBACK);
    }

    #[test]
    fn test_compose_answer_text() {
        assert_eq!(compose_answer_text(Some("  "), None), None);
        assert_eq!(compose_answer_text(Some(" typed "), None).as_deref(), Some("typed"));
        assert_eq!(compose_answer_text(None, Some("spoken")).as_deref(), Some("spoken"));
        assert_eq!(
            compose_answer_text(Some("typed"), Some("spoken")).as_deref(),
            Some("typed\n\n[Transcribed audio]\nspoken")
        );
    }

    #[test]
    fn test_scoring_prompt_includes_answer_and_scale() {
        let key_points = vec!["ownership".to_string()];
        let ctx = ScoringContext {
            job_title: "SRE",
            question_text: "Describe an outage you handled.",
            key_points: &key_points,
            max_score: 5,
        };
        let prompt = build_scoring_prompt(&ctx, "We rolled back within {minutes}.");
        assert!(prompt.contains("Score: <whole number from 0 to 5>/5"));
        assert!(prompt.contains("- ownership"));
        assert!(prompt.contains("We rolled back within {minutes}."));
    }
}
