//! SQL access for interviews, questions and answers.
//!
//! Rows are created during the interview flow and never edited afterwards, with
//! three exceptions: answer upserts (which also refresh the interview's aggregate
//! score) and interview deletion, which cascades.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::generator::{InterviewSpec, QuestionDraft};
use crate::interview::results::percentage;
use crate::interview::view::{assemble_view, InterviewView, QuestionKind};
use crate::models::interview::{
    FollowUpQuestionRow, InterviewRow, MainQuestionRow, UserAnswerRow,
};

// ────────────────────────────────────────────────────────────────────────────
// Interviews
// ────────────────────────────────────────────────────────────────────────────

/// Inserts an interview and its main questions in one transaction. Questions get
/// strictly increasing `created_at` values so model order is preserved.
pub async fn create_interview(
    pool: &PgPool,
    user_id: &str,
    spec: &InterviewSpec,
    drafts: &[QuestionDraft],
) -> Result<(InterviewRow, Vec<MainQuestionRow>), AppError> {
    let mut tx = pool.begin().await?;
    let created_at = Utc::now();

    let interview = sqlx::query_as::<_, InterviewRow>(
        r#"
        INSERT INTO interviews
            (id, user_id, job_title, job_description, experience_level, skills, score, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NULL, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&spec.job_title)
    .bind(&spec.job_description)
    .bind(&spec.experience_level)
    .bind(&spec.skills)
    .bind(created_at)
    .fetch_one(&mut *tx)
    .await?;

    let mut questions = Vec::with_capacity(drafts.len());
    for (i, draft) in drafts.iter().enumerate() {
        let row = sqlx::query_as::<_, MainQuestionRow>(
            r#"
            INSERT INTO main_questions
                (id, interview_id, question_text, category, key_points,
                 max_score, time_limit_secs, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(interview.id)
        .bind(&draft.question_text)
        .bind(&draft.category)
        .bind(&draft.key_points)
        .bind(draft.max_score)
        .bind(draft.time_limit_secs)
        .bind(created_at + Duration::milliseconds(i as i64))
        .fetch_one(&mut *tx)
        .await?;
        questions.push(row);
    }

    tx.commit().await?;

    info!(
        "Created interview {} with {} questions for user {user_id}",
        interview.id,
        questions.len()
    );
    Ok((interview, questions))
}

/// The caller's interviews, newest first.
pub async fn list_interviews(pool: &PgPool, user_id: &str) -> Result<Vec<InterviewRow>, AppError> {
    Ok(sqlx::query_as::<_, InterviewRow>(
        "SELECT * FROM interviews WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_interview(pool: &PgPool, id: Uuid) -> Result<Option<InterviewRow>, AppError> {
    Ok(
        sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Ownership check shared by every interview-scoped endpoint.
/// Another user's interview is reported as 401, not 404.
pub fn ensure_owner(interview: &InterviewRow, user_id: &str) -> Result<(), AppError> {
    if interview.user_id == user_id {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Loads an interview and checks that `user_id` owns it.
pub async fn get_owned_interview(
    pool: &PgPool,
    id: Uuid,
    user_id: &str,
) -> Result<InterviewRow, AppError> {
    let interview = get_interview(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))?;
    ensure_owner(&interview, user_id)?;
    Ok(interview)
}

/// Deletes an interview; questions, follow-ups and answers go with it.
pub async fn delete_interview(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM interviews WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    info!("Deleted interview {id}");
    Ok(())
}

/// Loads everything under an interview and groups it into a view.
pub async fn load_interview_view(
    pool: &PgPool,
    interview: InterviewRow,
) -> Result<InterviewView, AppError> {
    let mains = list_main_questions(pool, interview.id).await?;

    let follow_ups = sqlx::query_as::<_, FollowUpQuestionRow>(
        r#"
        SELECT f.*
        FROM follow_up_questions f
        JOIN main_questions m ON m.id = f.main_question_id
        WHERE m.interview_id = $1
        ORDER BY f.created_at, f.id
        "#,
    )
    .bind(interview.id)
    .fetch_all(pool)
    .await?;

    let answers = sqlx::query_as::<_, UserAnswerRow>(
        r#"
        SELECT a.*
        FROM user_answers a
        LEFT JOIN main_questions m ON m.id = a.main_question_id
        LEFT JOIN follow_up_questions f ON f.id = a.follow_up_question_id
        LEFT JOIN main_questions fm ON fm.id = f.main_question_id
        WHERE m.interview_id = $1 OR fm.interview_id = $1
        "#,
    )
    .bind(interview.id)
    .fetch_all(pool)
    .await?;

    Ok(assemble_view(interview, mains, follow_ups, answers))
}

// ────────────────────────────────────────────────────────────────────────────
// Questions
// ────────────────────────────────────────────────────────────────────────────

pub async fn list_main_questions(
    pool: &PgPool,
    interview_id: Uuid,
) -> Result<Vec<MainQuestionRow>, AppError> {
    Ok(sqlx::query_as::<_, MainQuestionRow>(
        "SELECT * FROM main_questions WHERE interview_id = $1 ORDER BY created_at, id",
    )
    .bind(interview_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_main_question(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<MainQuestionRow>, AppError> {
    Ok(
        sqlx::query_as::<_, MainQuestionRow>("SELECT * FROM main_questions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn get_follow_up(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<FollowUpQuestionRow>, AppError> {
    Ok(sqlx::query_as::<_, FollowUpQuestionRow>(
        "SELECT * FROM follow_up_questions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

pub async fn list_follow_ups(
    pool: &PgPool,
    main_question_id: Uuid,
) -> Result<Vec<FollowUpQuestionRow>, AppError> {
    Ok(sqlx::query_as::<_, FollowUpQuestionRow>(
        "SELECT * FROM follow_up_questions WHERE main_question_id = $1 ORDER BY created_at, id",
    )
    .bind(main_question_id)
    .fetch_all(pool)
    .await?)
}

/// Inserts a follow-up unless the main question already has `cap` of them.
/// The parent row is locked so concurrent answers cannot both slip under the cap.
pub async fn insert_follow_up_capped(
    pool: &PgPool,
    main_question_id: Uuid,
    draft: &QuestionDraft,
    cap: i64,
) -> Result<Option<FollowUpQuestionRow>, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM main_questions WHERE id = $1 FOR UPDATE")
        .bind(main_question_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question {main_question_id} not found")))?;

    let existing: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follow_up_questions WHERE main_question_id = $1",
    )
    .bind(main_question_id)
    .fetch_one(&mut *tx)
    .await?;

    if existing >= cap {
        tx.rollback().await?;
        return Ok(None);
    }

    let row = sqlx::query_as::<_, FollowUpQuestionRow>(
        r#"
        INSERT INTO follow_up_questions
            (id, main_question_id, question_text, category, key_points,
             max_score, time_limit_secs, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(main_question_id)
    .bind(&draft.question_text)
    .bind(&draft.category)
    .bind(&draft.key_points)
    .bind(draft.max_score)
    .bind(draft.time_limit_secs)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(row))
}

// ────────────────────────────────────────────────────────────────────────────
// Answers
// ────────────────────────────────────────────────────────────────────────────

/// The question an answer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerTarget {
    Main(Uuid),
    FollowUp(Uuid),
}

impl AnswerTarget {
    pub fn new(kind: QuestionKind, id: Uuid) -> Self {
        match kind {
            QuestionKind::Main => AnswerTarget::Main(id),
            QuestionKind::FollowUp => AnswerTarget::FollowUp(id),
        }
    }

    fn columns(self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            AnswerTarget::Main(id) => (Some(id), None),
            AnswerTarget::FollowUp(id) => (None, Some(id)),
        }
    }

    /// Insert-or-update keyed on the question's unique answer column.
    fn upsert_sql(self) -> &'static str {
        match self {
            AnswerTarget::Main(_) => UPSERT_MAIN_ANSWER,
            AnswerTarget::FollowUp(_) => UPSERT_FOLLOW_UP_ANSWER,
        }
    }
}

const UPSERT_MAIN_ANSWER: &str = r#"
            INSERT INTO user_answers
                (id, main_question_id, follow_up_question_id, answer_text, media_url,
                 score, feedback, key_points_covered, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            ON CONFLICT (main_question_id) DO UPDATE
            SET answer_text = EXCLUDED.answer_text,
                media_url = COALESCE(EXCLUDED.media_url, user_answers.media_url),
                score = EXCLUDED.score,
                feedback = EXCLUDED.feedback,
                key_points_covered = EXCLUDED.key_points_covered,
                updated_at = now()
            RETURNING *
"#;

const UPSERT_FOLLOW_UP_ANSWER: &str = r#"
            INSERT INTO user_answers
                (id, main_question_id, follow_up_question_id, answer_text, media_url,
                 score, feedback, key_points_covered, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            ON CONFLICT (follow_up_question_id) DO UPDATE
            SET answer_text = EXCLUDED.answer_text,
                media_url = COALESCE(EXCLUDED.media_url, user_answers.media_url),
                score = EXCLUDED.score,
                feedback = EXCLUDED.feedback,
                key_points_covered = EXCLUDED.key_points_covered,
                updated_at = now()
            RETURNING *
"#;

/// Scored answer content to persist.
pub struct NewAnswer<'a> {
    pub answer_text: &'a str,
    pub media_url: Option<&'a str>,
    pub score: i32,
    pub feedback: &'a str,
    pub key_points_covered: &'a [String],
}

/// Upserts the answer (one per question) and refreshes the interview's aggregate
/// percentage in the same transaction. Returns the stored answer and the new score.
///
/// The interview row is locked first, so answers to one interview are recorded one
/// at a time and each score is computed from every committed answer.
pub async fn record_answer(
    pool: &PgPool,
    interview_id: Uuid,
    target: AnswerTarget,
    answer: NewAnswer<'_>,
) -> Result<(UserAnswerRow, i32), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM interviews WHERE id = $1 FOR UPDATE")
        .bind(interview_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))?;

    let (main_question_id, follow_up_question_id) = target.columns();
    let row = sqlx::query_as::<_, UserAnswerRow>(target.upsert_sql())
        .bind(Uuid::new_v4())
        .bind(main_question_id)
        .bind(follow_up_question_id)
        .bind(answer.answer_text)
        .bind(answer.media_url)
        .bind(answer.score)
        .bind(answer.feedback)
        .bind(answer.key_points_covered)
        .fetch_one(&mut *tx)
        .await?;

    // Every main question and follow-up counts towards the maximum; unanswered ones add 0.
    let (total, max): (i64, i64) = sqlx::query_as(
        r#"
        WITH q AS (
            SELECT m.id AS main_id, NULL::uuid AS follow_up_id, m.max_score
            FROM main_questions m
            WHERE m.interview_id = $1
            UNION ALL
            SELECT NULL::uuid, f.id, f.max_score
            FROM follow_up_questions f
            JOIN main_questions m ON m.id = f.main_question_id
            WHERE m.interview_id = $1
        )
        SELECT COALESCE(SUM(a.score), 0)::BIGINT, COALESCE(SUM(q.max_score), 0)::BIGINT
        FROM q
        LEFT JOIN user_answers a
            ON a.main_question_id = q.main_id OR a.follow_up_question_id = q.follow_up_id
        "#,
    )
    .bind(interview_id)
    .fetch_one(&mut *tx)
    .await?;
    let score = percentage(total as i32, max as i32);

    sqlx::query("UPDATE interviews SET score = $1 WHERE id = $2")
        .bind(score)
        .bind(interview_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((row, score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::test_pool;
    use crate::interview::view::fixtures;

    fn spec() -> InterviewSpec {
        InterviewSpec {
            job_title: "Data Engineer".to_string(),
            job_description: "Own the batch pipelines.".to_string(),
            experience_level: "mid".to_string(),
            skills: vec!["sql".to_string()],
            question_count: 2,
        }
    }

    fn draft(text: &str) -> QuestionDraft {
        QuestionDraft {
            question_text: text.to_string(),
            category: "technical".to_string(),
            key_points: vec!["idempotency".to_string()],
            max_score: 10,
            time_limit_secs: 120,
        }
    }

    fn answer(score: i32) -> NewAnswer<'static> {
        NewAnswer {
            answer_text: "I would make every load idempotent.",
            media_url: None,
            score,
            feedback: "Solid.",
            key_points_covered: &[],
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_answers_upsert_one_row() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test_concurrent_first_answers_upsert_one_row: TEST_DATABASE_URL unavailable");
            return;
        };
        let (interview, questions) =
            create_interview(&pool, "user_race", &spec(), &[draft("Q1"), draft("Q2")])
                .await
                .unwrap();
        let interview_id = interview.id;
        let target = AnswerTarget::Main(questions[0].id);

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let pool = pool.clone();
                tokio::spawn(async move { record_answer(&pool, interview_id, target, answer(4 + i)).await })
            })
            .collect();
        let mut ids = Vec::new();
        for task in tasks {
            let (row, _) = task.await.unwrap().unwrap();
            ids.push(row.id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "every submission must land on the same answer row");

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_answers WHERE main_question_id = $1")
                .bind(questions[0].id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);

        delete_interview(&pool, interview_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_record_answer_refreshes_interview_score() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test_record_answer_refreshes_interview_score: TEST_DATABASE_URL unavailable");
            return;
        };
        let (interview, questions) =
            create_interview(&pool, "user_score", &spec(), &[draft("Q1"), draft("Q2")])
                .await
                .unwrap();

        let (first, score) = record_answer(&pool, interview.id, AnswerTarget::Main(questions[0].id), answer(8))
            .await
            .unwrap();
        assert_eq!(score, 40); // 8 / 20

        let (_, score) = record_answer(&pool, interview.id, AnswerTarget::Main(questions[1].id), answer(6))
            .await
            .unwrap();
        assert_eq!(score, 70); // 14 / 20

        // Re-answering replaces the score and keeps the row.
        let (again, score) = record_answer(&pool, interview.id, AnswerTarget::Main(questions[0].id), answer(10))
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.created_at, first.created_at);
        assert_eq!(score, 80);

        let stored = get_interview(&pool, interview.id).await.unwrap().unwrap();
        assert_eq!(stored.score, Some(80));

        delete_interview(&pool, interview.id).await.unwrap();
    }

    #[test]
    fn test_owner_passes() {
        let interview = fixtures::interview();
        assert!(ensure_owner(&interview, "user_1").is_ok());
    }

    #[test]
    fn test_non_owner_is_unauthorized() {
        let interview = fixtures::interview();
        assert!(matches!(
            ensure_owner(&interview, "someone_else"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_answer_upsert_conflicts_on_the_answered_column() {
        let id = Uuid::new_v4();
        let main_sql = AnswerTarget::Main(id).upsert_sql();
        let follow_up_sql = AnswerTarget::FollowUp(id).upsert_sql();
        assert!(main_sql.contains("ON CONFLICT (main_question_id) DO UPDATE"));
        assert!(follow_up_sql.contains("ON CONFLICT (follow_up_question_id) DO UPDATE"));
        for sql in [main_sql, follow_up_sql] {
            assert!(sql.contains("COALESCE(EXCLUDED.media_url, user_answers.media_url)"));
            assert!(sql.trim_start().starts_with("INSERT"));
        }
    }

    #[test]
    fn test_answer_target_columns_are_exclusive() {
        let id = Uuid::new_v4();
        assert_eq!(AnswerTarget::new(QuestionKind::Main, id).columns(), (Some(id), None));
        assert_eq!(
            AnswerTarget::new(QuestionKind::FollowUp, id).columns(),
            (None, Some(id))
        );
    }
}
