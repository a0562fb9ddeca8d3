//! Follow-up questions: decides whether an answer deserves a follow-up, asks the
//! model for one, and stores it under the main question's cap.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::interview::generator::{clean_key_points, normalize_category, QuestionDraft};
use crate::interview::prompts::{FOLLOW_UP_PROMPT, FOLLOW_UP_SYSTEM};
use crate::interview::store;
use crate::llm_client::prompts::{bullet_list, render};
use crate::llm_client::LlmClient;
use crate::models::interview::{FollowUpQuestionRow, MainQuestionRow};

/// Hard cap on follow-ups per main question.
pub const MAX_FOLLOW_UPS_PER_QUESTION: i64 = 2;
/// Answers shorter than this never trigger an automatic follow-up.
pub const MIN_FOLLOW_UP_ANSWER_WORDS: usize = 5;
pub const FOLLOW_UP_MAX_SCORE: i32 = 5;
pub const FOLLOW_UP_TIME_LIMIT_SECS: i32 = 60;

pub fn remaining_follow_ups(existing: i64) -> i64 {
    (MAX_FOLLOW_UPS_PER_QUESTION - existing).max(0)
}

/// Whether an answer is substantial enough, and the cap loose enough, to ask a follow-up.
pub fn should_generate_follow_up(answer_text: &str, existing: i64) -> bool {
    remaining_follow_ups(existing) > 0
        && answer_text.split_whitespace().count() >= MIN_FOLLOW_UP_ANSWER_WORDS
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FollowUpReply {
    #[serde(alias = "question")]
    follow_up: Option<String>,
    category: Option<String>,
    #[serde(alias = "keyPoints")]
    key_points: Vec<String>,
}

/// Turns the model's reply into a draft. A null, blank or "none" follow-up means
/// the model declined.
fn draft_from_reply(reply: FollowUpReply, fallback_category: &str) -> Option<QuestionDraft> {
    let text = reply.follow_up?.trim().to_string();
    if text.is_empty() || text.eq_ignore_ascii_case("none") || text.eq_ignore_ascii_case("null") {
        return None;
    }
    let category = match reply.category.as_deref() {
        Some(c) if !c.trim().is_empty() => normalize_category(Some(c)),
        _ => normalize_category(Some(fallback_category)),
    };
    Some(QuestionDraft {
        question_text: text,
        category: category.to_string(),
        key_points: clean_key_points(reply.key_points),
        max_score: FOLLOW_UP_MAX_SCORE,
        time_limit_secs: FOLLOW_UP_TIME_LIMIT_SECS,
    })
}

/// Everything the follow-up prompt is built from.
pub struct FollowUpContext<'a> {
    pub job_title: &'a str,
    pub main_question: &'a MainQuestionRow,
    pub previous: &'a [FollowUpQuestionRow],
    pub answer_text: &'a str,
}

pub fn build_follow_up_prompt(ctx: &FollowUpContext<'_>) -> String {
    let key_points = bullet_list(&ctx.main_question.key_points);
    let previous: Vec<String> = ctx.previous.iter().map(|f| f.question_text.clone()).collect();
    let previous = bullet_list(&previous);
    render(
        FOLLOW_UP_PROMPT,
        &[
            ("job_title", ctx.job_title),
            ("question", ctx.main_question.question_text.as_str()),
            ("key_points", key_points.as_str()),
            ("previous_follow_ups", previous.as_str()),
            ("answer", ctx.answer_text),
        ],
    )
}

/// Asks the model for one follow-up. `Ok(None)` when the model declines.
pub async fn draft_follow_up(
    llm: &LlmClient,
    ctx: &FollowUpContext<'_>,
) -> Result<Option<QuestionDraft>, AppError> {
    let prompt = build_follow_up_prompt(ctx);
    let reply: FollowUpReply = llm
        .call_json(&prompt, FOLLOW_UP_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Follow-up generation failed: {e}")))?;
    Ok(draft_from_reply(reply, &ctx.main_question.category))
}

/// Generates and stores a follow-up for `main_question` if the cap allows it.
/// `force` skips the answer-length heuristic (explicit client request).
pub async fn generate_follow_up(
    pool: &PgPool,
    llm: &LlmClient,
    job_title: &str,
    main_question: &MainQuestionRow,
    answer_text: &str,
    force: bool,
) -> Result<Option<FollowUpQuestionRow>, AppError> {
    let previous = store::list_follow_ups(pool, main_question.id).await?;
    let existing = previous.len() as i64;

    let wanted = if force {
        remaining_follow_ups(existing) > 0
    } else {
        should_generate_follow_up(answer_text, existing)
    };
    if !wanted {
        return Ok(None);
    }

    let ctx = FollowUpContext {
        job_title,
        main_question,
        previous: &previous,
        answer_text,
    };
    let Some(draft) = draft_follow_up(llm, &ctx).await? else {
        info!("Model declined a follow-up for question {}", main_question.id);
        return Ok(None);
    };

    let inserted = store::insert_follow_up_capped(
        pool,
        main_question.id,
        &draft,
        MAX_FOLLOW_UPS_PER_QUESTION,
    )
    .await?;

    if let Some(row) = &inserted {
        info!(
            "Added follow-up {} to question {} ({} of {MAX_FOLLOW_UPS_PER_QUESTION})",
            row.id,
            main_question.id,
            existing + 1
        );
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::view::fixtures;
    use serde_json::json;

    #[test]
    fn test_cap_blocks_follow_ups() {
        let answer = "I split the monolith into three services over six months";
        assert!(should_generate_follow_up(answer, 0));
        assert!(should_generate_follow_up(answer, MAX_FOLLOW_UPS_PER_QUESTION - 1));
        assert!(!should_generate_follow_up(answer, MAX_FOLLOW_UPS_PER_QUESTION));
        assert_eq!(remaining_follow_ups(MAX_FOLLOW_UPS_PER_QUESTION + 3), 0);
    }

    #[test]
    fn test_short_answers_get_no_follow_up() {
        assert!(!should_generate_follow_up("I don't know", 0));
        assert!(!should_generate_follow_up("   ", 0));
    }

    #[test]
    fn test_reply_becomes_follow_up_draft() {
        let reply: FollowUpReply = serde_json::from_value(json!({
            "follow_up": " How did you measure the latency win? ",
            "category": "Technical",
            "key_points": ["p99", ""]
        }))
        .unwrap();
        let draft = draft_from_reply(reply, "behavioral").unwrap();
        assert_eq!(draft.question_text, "How did you measure the latency win?");
        assert_eq!(draft.category, "technical");
        assert_eq!(draft.key_points, vec!["p99"]);
        assert_eq!(draft.max_score, FOLLOW_UP_MAX_SCORE);
        assert_eq!(draft.time_limit_secs, FOLLOW_UP_TIME_LIMIT_SECS);
    }

    #[test]
    fn test_declined_replies() {
        for value in [json!({ "follow_up": null }), json!({ "follow_up": "None" }), json!({})] {
            let reply: FollowUpReply = serde_json::from_value(value).unwrap();
            assert!(draft_from_reply(reply, "technical").is_none());
        }
    }

    #[test]
    fn test_missing_category_inherits_main_question() {
        let reply: FollowUpReply =
            serde_json::from_value(json!({ "question": "Which metric moved?" })).unwrap();
        let draft = draft_from_reply(reply, "behavioral").unwrap();
        assert_eq!(draft.category, "behavioral");
    }

    #[test]
    fn test_prompt_lists_previous_follow_ups() {
        let interview = fixtures::interview();
        let main = fixtures::main_question(&interview, 0, "Tell me about a migration.");
        let previous = vec![fixtures::follow_up(&main, 0, "What went wrong?")];
        let ctx = FollowUpContext {
            job_title: &interview.job_title,
            main_question: &main,
            previous: &previous,
            answer_text: "We moved 40 tables with zero downtime.",
        };
        let prompt = build_follow_up_prompt(&ctx);
        assert!(prompt.contains("- What went wrong?"));
        assert!(prompt.contains("Tell me about a migration."));
        assert!(prompt.contains("We moved 40 tables with zero downtime."));
        assert!(prompt.contains("- idempotency"));
    }
}
