//! Question generation: validates an interview request, asks the model for main
//! questions and normalises whatever shape comes back into `QuestionDraft`s.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::interview::prompts::{QUESTION_GEN_PROMPT, QUESTION_GEN_SYSTEM};
use crate::llm_client::prompts::{bullet_list, render};
use crate::llm_client::LlmClient;

pub const DEFAULT_QUESTION_COUNT: u32 = 5;
pub const MAX_QUESTION_COUNT: u32 = 10;
pub const DEFAULT_EXPERIENCE_LEVEL: &str = "mid";

pub const MAIN_DEFAULT_MAX_SCORE: i32 = 10;
pub const MAIN_DEFAULT_TIME_LIMIT_SECS: i32 = 120;
const MIN_TIME_LIMIT_SECS: i32 = 30;
const MAX_TIME_LIMIT_SECS: i32 = 600;
const MAX_JOB_TITLE_CHARS: usize = 200;

// ────────────────────────────────────────────────────────────────────────────
// Request
// ────────────────────────────────────────────────────────────────────────────

/// Body of `POST /api/v1/interviews`. Every field defaults so a missing field is
/// reported by `validate` as a 400 rather than rejected by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateInterviewRequest {
    pub job_title: String,
    pub job_description: String,
    pub experience_level: Option<String>,
    pub skills: Vec<String>,
    pub question_count: Option<u32>,
}

/// A validated interview request.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewSpec {
    pub job_title: String,
    pub job_description: String,
    pub experience_level: String,
    pub skills: Vec<String>,
    pub question_count: usize,
}

impl CreateInterviewRequest {
    pub fn validate(self) -> Result<InterviewSpec, AppError> {
        let job_title = self.job_title.trim().to_string();
        let job_description = self.job_description.trim().to_string();

        if job_title.is_empty() {
            return Err(AppError::Validation("job_title is required".to_string()));
        }
        if job_title.chars().count() > MAX_JOB_TITLE_CHARS {
            return Err(AppError::Validation(format!(
                "job_title must be at most {MAX_JOB_TITLE_CHARS} characters"
            )));
        }
        if job_description.is_empty() {
            return Err(AppError::Validation(
                "job_description is required".to_string(),
            ));
        }

        let question_count = self.question_count.unwrap_or(DEFAULT_QUESTION_COUNT);
        if !(1..=MAX_QUESTION_COUNT).contains(&question_count) {
            return Err(AppError::Validation(format!(
                "question_count must be between 1 and {MAX_QUESTION_COUNT}"
            )));
        }

        let experience_level = self
            .experience_level
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_EXPERIENCE_LEVEL.to_string());

        let mut seen = HashSet::new();
        let skills: Vec<String> = self
            .skills
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
            .collect();

        Ok(InterviewSpec {
            job_title,
            job_description,
            experience_level,
            skills,
            question_count: question_count as usize,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Model output
// ────────────────────────────────────────────────────────────────────────────

/// One question as the model wrote it. Every field is optional; numbers may
/// arrive as strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawQuestion {
    #[serde(alias = "question_text", alias = "text")]
    pub question: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "keyPoints")]
    pub key_points: Vec<String>,
    #[serde(alias = "maxScore")]
    pub max_score: Option<Value>,
    #[serde(alias = "timeLimit", alias = "time_limit_secs")]
    pub time_limit: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeneratedQuestions {
    Wrapped { questions: Vec<RawQuestion> },
    Bare(Vec<RawQuestion>),
}

impl GeneratedQuestions {
    fn into_vec(self) -> Vec<RawQuestion> {
        match self {
            GeneratedQuestions::Wrapped { questions } => questions,
            GeneratedQuestions::Bare(questions) => questions,
        }
    }
}

/// A normalised question ready to persist, used for main questions and follow-ups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionDraft {
    pub question_text: String,
    pub category: String,
    pub key_points: Vec<String>,
    pub max_score: i32,
    pub time_limit_secs: i32,
}

/// Maps free-form category labels onto the four categories the UI knows.
pub fn normalize_category(raw: Option<&str>) -> &'static str {
    let raw = raw.unwrap_or_default().trim().to_lowercase();
    if raw.starts_with("tech") {
        "technical"
    } else if raw.starts_with("behav") {
        "behavioral"
    } else if raw.starts_with("situ") || raw.contains("scenario") {
        "situational"
    } else {
        "general"
    }
}

/// Reads an integer out of a JSON number or numeric string.
pub(crate) fn lenient_int(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Number(n) => n.as_f64().map(|f| f.round() as i32),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i32),
        _ => None,
    }
}

pub(crate) fn clean_key_points(points: Vec<String>) -> Vec<String> {
    points
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Drops blank questions, truncates to `limit` and clamps scores and time limits.
pub fn normalize_questions(raw: Vec<RawQuestion>, limit: usize) -> Vec<QuestionDraft> {
    raw.into_iter()
        .filter_map(|q| {
            let question_text = q.question.as_deref().map(str::trim).unwrap_or_default();
            if question_text.is_empty() {
                return None;
            }
            Some(QuestionDraft {
                question_text: question_text.to_string(),
                category: normalize_category(q.category.as_deref()).to_string(),
                key_points: clean_key_points(q.key_points),
                max_score: lenient_int(q.max_score.as_ref())
                    .map(|s| s.clamp(1, MAIN_DEFAULT_MAX_SCORE))
                    .unwrap_or(MAIN_DEFAULT_MAX_SCORE),
                time_limit_secs: lenient_int(q.time_limit.as_ref())
                    .map(|t| t.clamp(MIN_TIME_LIMIT_SECS, MAX_TIME_LIMIT_SECS))
                    .unwrap_or(MAIN_DEFAULT_TIME_LIMIT_SECS),
            })
        })
        .take(limit)
        .collect()
}

/// Builds the question-generation prompt for a validated request.
pub fn build_question_prompt(spec: &InterviewSpec) -> String {
    let question_count = spec.question_count.to_string();
    let skills = bullet_list(&spec.skills);
    render(
        QUESTION_GEN_PROMPT,
        &[
            ("job_title", spec.job_title.as_str()),
            ("job_description", spec.job_description.as_str()),
            ("experience_level", spec.experience_level.as_str()),
            ("skills", skills.as_str()),
            ("question_count", question_count.as_str()),
        ],
    )
}

/// Asks the model for the main questions of a new interview.
pub async fn generate_questions(
    llm: &LlmClient,
    spec: &InterviewSpec,
) -> Result<Vec<QuestionDraft>, AppError> {
    let prompt = build_question_prompt(spec);
    let generated: GeneratedQuestions = llm
        .call_json(&prompt, QUESTION_GEN_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Question generation failed: {e}")))?;

    let raw = generated.into_vec();
    let raw_count = raw.len();
    let drafts = normalize_questions(raw, spec.question_count);

    if drafts.is_empty() {
        return Err(AppError::Llm(
            "Question generation returned no usable questions".to_string(),
        ));
    }
    if drafts.len() < spec.question_count {
        warn!(
            "Model produced {} usable questions of {} requested",
            drafts.len(),
            spec.question_count
        );
    }
    info!(
        "Generated {} questions for '{}' ({} raw)",
        drafts.len(),
        spec.job_title,
        raw_count
    );

    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CreateInterviewRequest {
        CreateInterviewRequest {
            job_title: "  Backend Engineer ".to_string(),
            job_description: "Build and run payment APIs.".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_applies_defaults() {
        let spec = request().validate().unwrap();
        assert_eq!(spec.job_title, "Backend Engineer");
        assert_eq!(spec.experience_level, "mid");
        assert_eq!(spec.question_count, 5);
        assert!(spec.skills.is_empty());
    }

    #[test]
    fn test_validate_rejects_missing_title() {
        let req = CreateInterviewRequest {
            job_title: "   ".to_string(),
            ..request()
        };
        let err = req.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.contains("job_title")));
    }

    #[test]
    fn test_validate_rejects_missing_description() {
        let req = CreateInterviewRequest {
            job_description: String::new(),
            ..request()
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_count() {
        for count in [0, MAX_QUESTION_COUNT + 1] {
            let req = CreateInterviewRequest {
                question_count: Some(count),
                ..request()
            };
            assert!(req.validate().is_err(), "count {count} should be rejected");
        }
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let req: CreateInterviewRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.job_title.is_empty());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_cleans_skills() {
        let req = CreateInterviewRequest {
            skills: vec!["Rust".into(), " ".into(), "SQL ".into(), "rust".into()],
            experience_level: Some(" Senior ".into()),
            ..request()
        };
        let spec = req.validate().unwrap();
        assert_eq!(spec.skills, vec!["Rust", "SQL"]);
        assert_eq!(spec.experience_level, "senior");
    }

    #[test]
    fn test_wrapped_and_bare_shapes_parse() {
        let wrapped: GeneratedQuestions =
            serde_json::from_value(json!({ "questions": [{ "question": "A?" }] })).unwrap();
        let bare: GeneratedQuestions =
            serde_json::from_value(json!([{ "question": "A?" }, { "text": "B?" }])).unwrap();
        assert_eq!(wrapped.into_vec().len(), 1);
        assert_eq!(bare.into_vec().len(), 2);
    }

    #[test]
    fn test_normalize_clamps_and_defaults() {
        let raw: Vec<RawQuestion> = serde_json::from_value(json!([
            { "question": " Tell me about a conflict. ", "category": "Behavioural",
              "key_points": ["situation", " ", "outcome"], "max_score": 50, "time_limit": "5" },
            { "question": "Design a rate limiter.", "category": "Technical" }
        ]))
        .unwrap();

        let drafts = normalize_questions(raw, 5);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].question_text, "Tell me about a conflict.");
        assert_eq!(drafts[0].category, "behavioral");
        assert_eq!(drafts[0].key_points, vec!["situation", "outcome"]);
        assert_eq!(drafts[0].max_score, 10);
        assert_eq!(drafts[0].time_limit_secs, 30);
        assert_eq!(drafts[1].category, "technical");
        assert_eq!(drafts[1].max_score, MAIN_DEFAULT_MAX_SCORE);
        assert_eq!(drafts[1].time_limit_secs, MAIN_DEFAULT_TIME_LIMIT_SECS);
    }

    #[test]
    fn test_normalize_drops_blank_and_truncates() {
        let raw: Vec<RawQuestion> = serde_json::from_value(json!([
            { "question": "" },
            { "question": "One?" },
            { "question": "Two?" },
            { "question": "Three?" }
        ]))
        .unwrap();
        let drafts = normalize_questions(raw, 2);
        let texts: Vec<_> = drafts.iter().map(|d| d.question_text.as_str()).collect();
        assert_eq!(texts, vec!["One?", "Two?"]);
    }

    #[test]
    fn test_normalize_category_fallback() {
        assert_eq!(normalize_category(Some("Scenario-based")), "situational");
        assert_eq!(normalize_category(Some("culture fit")), "general");
        assert_eq!(normalize_category(None), "general");
    }

    #[test]
    fn test_prompt_contains_request_fields() {
        let spec = CreateInterviewRequest {
            skills: vec!["Kafka".into()],
            question_count: Some(3),
            ..request()
        }
        .validate()
        .unwrap();
        let prompt = build_question_prompt(&spec);
        assert!(prompt.contains("JOB TITLE: Backend Engineer"));
        assert!(prompt.contains("- Kafka"));
        assert!(prompt.contains("Write exactly 3 interview questions."));
        assert!(prompt.contains("\"questions\""));
    }
}
