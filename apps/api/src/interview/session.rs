//! Interview session state for the chat client: the conversation so far and the
//! next question to put to the candidate. Replaces client-side storage as the
//! source of truth when a page is reloaded.

use serde::Serialize;
use uuid::Uuid;

use crate::interview::view::{InterviewView, QuestionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    Interviewer,
    Candidate,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub question_id: Uuid,
    pub kind: QuestionKind,
    pub text: String,
    pub media_url: Option<String>,
    pub score: Option<i32>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingQuestion {
    pub question_id: Uuid,
    pub kind: QuestionKind,
    pub main_question_id: Uuid,
    pub question_text: String,
    pub category: String,
    pub max_score: i32,
    pub time_limit_secs: i32,
    /// 1-based position among main questions.
    pub main_question_number: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub interview_id: Uuid,
    pub job_title: String,
    pub transcript: Vec<ChatMessage>,
    pub next_question: Option<PendingQuestion>,
    pub main_questions_total: usize,
    pub questions_answered: usize,
    pub completed: bool,
}

/// Replays the interview as chat turns. The transcript stops at the first
/// unanswered question, which becomes `next_question`.
pub fn build_session(view: &InterviewView) -> SessionState {
    let mut transcript = Vec::new();
    let mut next_question = None;
    let mut questions_answered = 0;
    let mut main_number = 0;

    for q in view.flatten() {
        if q.kind == QuestionKind::Main {
            main_number += 1;
        }
        transcript.push(ChatMessage {
            role: ChatRole::Interviewer,
            question_id: q.id,
            kind: q.kind,
            text: q.text.to_string(),
            media_url: None,
            score: None,
            feedback: None,
        });

        let Some(answer) = q.answer else {
            next_question = Some(PendingQuestion {
                question_id: q.id,
                kind: q.kind,
                main_question_id: q.main_question_id,
                question_text: q.text.to_string(),
                category: q.category.to_string(),
                max_score: q.max_score,
                time_limit_secs: q.time_limit_secs,
                main_question_number: main_number,
            });
            break;
        };

        questions_answered += 1;
        transcript.push(ChatMessage {
            role: ChatRole::Candidate,
            question_id: q.id,
            kind: q.kind,
            text: answer.answer_text.clone(),
            media_url: answer.media_url.clone(),
            score: Some(answer.score),
            feedback: Some(answer.feedback.clone()),
        });
    }

    SessionState {
        interview_id: view.interview.id,
        job_title: view.interview.job_title.clone(),
        completed: next_question.is_none(),
        transcript,
        next_question,
        main_questions_total: view.questions.len(),
        questions_answered,
    }
}
