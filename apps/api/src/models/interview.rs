use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewRow {
    pub id: Uuid,
    /// Opaque user id issued by the auth provider.
    pub user_id: String,
    pub job_title: String,
    pub job_description: String,
    pub experience_level: String,
    pub skills: Vec<String>,
    /// Aggregate percentage, refreshed after every answer. `None` until the first answer.
    pub score: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MainQuestionRow {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub question_text: String,
    pub category: String,
    pub key_points: Vec<String>,
    pub max_score: i32,
    pub time_limit_secs: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FollowUpQuestionRow {
    pub id: Uuid,
    pub main_question_id: Uuid,
    pub question_text: String,
    pub category: String,
    pub key_points: Vec<String>,
    pub max_score: i32,
    pub time_limit_secs: i32,
    pub created_at: DateTime<Utc>,
}

/// Belongs to exactly one of a main question or a follow-up question.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAnswerRow {
    pub id: Uuid,
    pub main_question_id: Option<Uuid>,
    pub follow_up_question_id: Option<Uuid>,
    pub answer_text: String,
    pub media_url: Option<String>,
    pub score: i32,
    pub feedback: String,
    pub key_points_covered: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
