use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::interview::{FollowUpQuestionRow, InterviewRow, MainQuestionRow, UserAnswerRow};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    Main,
    FollowUp,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowUpView {
    #[serde(flatten)]
    pub question: FollowUpQuestionRow,
    pub answer: Option<UserAnswerRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MainQuestionView {
    #[serde(flatten)]
    pub question: MainQuestionRow,
    pub answer: Option<UserAnswerRow>,
    pub follow_ups: Vec<FollowUpView>,
}

/// An interview with its questions in creation order, each carrying its answer
/// and its follow-ups.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewView {
    pub interview: InterviewRow,
    pub questions: Vec<MainQuestionView>,
}

/// A question of either kind, flattened into interview order.
#[derive(Debug, Clone, Copy)]
pub struct QuestionRef<'a> {
    pub id: Uuid,
    pub kind: QuestionKind,
    pub main_question_id: Uuid,
    pub text: &'a str,
    pub category: &'a str,
    pub key_points: &'a [String],
    pub max_score: i32,
    pub time_limit_secs: i32,
    pub answer: Option<&'a UserAnswerRow>,
}

impl InterviewView {
    /// Main question, then its follow-ups, for every main question in order.
    pub fn flatten(&self) -> Vec<QuestionRef<'_>> {
        let mut out = Vec::new();
        for main in &self.questions {
            let q = &main.question;
            out.push(QuestionRef {
                id: q.id,
                kind: QuestionKind::Main,
                main_question_id: q.id,
                text: &q.question_text,
                category: &q.category,
                key_points: &q.key_points,
                max_score: q.max_score,
                time_limit_secs: q.time_limit_secs,
                answer: main.answer.as_ref(),
            });
            for follow_up in &main.follow_ups {
                let f = &follow_up.question;
                out.push(QuestionRef {
                    id: f.id,
                    kind: QuestionKind::FollowUp,
                    main_question_id: q.id,
                    text: &f.question_text,
                    category: &f.category,
                    key_points: &f.key_points,
                    max_score: f.max_score,
                    time_limit_secs: f.time_limit_secs,
                    answer: follow_up.answer.as_ref(),
                });
            }
        }
        out
    }
}

/// Groups flat rows into an `InterviewView`. Questions and follow-ups are ordered
/// by `created_at`, ties broken by id; rows that belong elsewhere are ignored.
pub fn assemble_view(
    interview: InterviewRow,
    mut mains: Vec<MainQuestionRow>,
    mut follow_ups: Vec<FollowUpQuestionRow>,
    answers: Vec<UserAnswerRow>,
) -> InterviewView {
    mains.retain(|m| m.interview_id == interview.id);
    mains.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
    follow_ups.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

    let mut main_answers: HashMap<Uuid, UserAnswerRow> = HashMap::new();
    let mut follow_up_answers: HashMap<Uuid, UserAnswerRow> = HashMap::new();
    for answer in answers {
        if let Some(id) = answer.main_question_id {
            main_answers.insert(id, answer);
        } else if let Some(id) = answer.follow_up_question_id {
            follow_up_answers.insert(id, answer);
        }
    }

    let mut grouped: HashMap<Uuid, Vec<FollowUpView>> = HashMap::new();
    for follow_up in follow_ups {
        let answer = follow_up_answers.remove(&follow_up.id);
        grouped
            .entry(follow_up.main_question_id)
            .or_default()
            .push(FollowUpView {
                question: follow_up,
                answer,
            });
    }

    let questions = mains
        .into_iter()
        .map(|question| MainQuestionView {
            answer: main_answers.remove(&question.id),
            follow_ups: grouped.remove(&question.id).unwrap_or_default(),
            question,
        })
        .collect();

    InterviewView {
        interview,
        questions,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_assemble_orders_by_creation() {
        let interview = interview();
        let q1 = main_question(&interview, 0, "first");
        let q2 = main_question(&interview, 1, "second");
        let f_late = follow_up(&q1, 5, "late");
        let f_early = follow_up(&q1, 1, "early");

        let view = assemble_view(
            interview,
            vec![q2.clone(), q1.clone()],
            vec![f_late, f_early],
            vec![],
        );

        let texts: Vec<_> = view.flatten().iter().map(|q| q.text.to_string()).collect();
        assert_eq!(texts, vec!["first", "early", "late", "second"]);
    }

    #[test]
    fn test_assemble_attaches_answers() {
        let interview = interview();
        let q1 = main_question(&interview, 0, "first");
        let f1 = follow_up(&q1, 0, "Why that design?");
        let answers = vec![
            answer(QuestionKind::Main, q1.id, 7),
            answer(QuestionKind::FollowUp, f1.id, 3),
        ];

        let view = assemble_view(interview, vec![q1], vec![f1], answers);
        let flat = view.flatten();
        assert_eq!(flat[0].answer.map(|a| a.score), Some(7));
        assert_eq!(flat[1].answer.map(|a| a.score), Some(3));
        assert_eq!(flat[1].kind, QuestionKind::FollowUp);
        assert_eq!(flat[1].main_question_id, flat[0].id);
    }

    #[test]
    fn test_assemble_ignores_foreign_questions() {
        let interview = interview();
        let other = super::fixtures::interview();
        let foreign = main_question(&other, 0, "foreign");
        let view = assemble_view(interview, vec![foreign], vec![], vec![]);
        assert!(view.questions.is_empty());
    }

    #[test]
    fn test_question_kind_serde() {
        assert_eq!(serde_json::to_string(&QuestionKind::FollowUp).unwrap(), "\"follow_up\"");
        let kind: QuestionKind = serde_json::from_str("\"main\"").unwrap();
        assert_eq!(kind, QuestionKind::Main);
    }
}
