//! Results: aggregates stored answer scores into a percentage and a pass/fail
//! verdict, with per-question feedback in interview order.

use serde::Serialize;
use uuid::Uuid;

use crate::interview::view::{InterviewView, QuestionKind};

/// Minimum percentage for a pass.
pub const PASS_THRESHOLD_PERCENT: i32 = 60;

#[derive(Debug, Clone, Serialize)]
pub struct QuestionFeedback {
    pub question_id: Uuid,
    pub kind: QuestionKind,
    pub question_text: String,
    pub category: String,
    pub max_score: i32,
    /// `None` when the question was never answered.
    pub score: Option<i32>,
    pub feedback: Option<String>,
    pub answer_text: Option<String>,
    pub key_points: Vec<String>,
    pub key_points_covered: Vec<String>,
    pub key_points_missed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewResults {
    pub interview_id: Uuid,
    pub job_title: String,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: i32,
    pub passed: bool,
    pub answered: usize,
    pub unanswered: usize,
    pub questions: Vec<QuestionFeedback>,
}

/// `round(100 * total / max)`, 0 when nothing is scorable.
pub fn percentage(total: i32, max: i32) -> i32 {
    if max <= 0 {
        return 0;
    }
    ((total.max(0) as f64 / max as f64) * 100.0).round() as i32
}

fn missed_key_points(expected: &[String], covered: &[String]) -> Vec<String> {
    let covered: Vec<String> = covered.iter().map(|c| c.to_lowercase()).collect();
    expected
        .iter()
        .filter(|point| {
            let point = point.to_lowercase();
            !covered
                .iter()
                .any(|c| c.contains(&point) || point.contains(c.as_str()))
        })
        .cloned()
        .collect()
}

/// Aggregates an interview. Unanswered questions still count towards `max_score`.
pub fn compute_results(view: &InterviewView) -> InterviewResults {
    let mut total_score = 0;
    let mut max_score = 0;
    let mut answered = 0;
    let mut questions = Vec::new();

    for q in view.flatten() {
        max_score += q.max_score;
        if let Some(answer) = q.answer {
            total_score += answer.score;
            answered += 1;
        }
        let covered = q
            .answer
            .map(|a| a.key_points_covered.clone())
            .unwrap_or_default();
        questions.push(QuestionFeedback {
            question_id: q.id,
            kind: q.kind,
            question_text: q.text.to_string(),
            category: q.category.to_string(),
            max_score: q.max_score,
            score: q.answer.map(|a| a.score),
            feedback: q.answer.map(|a| a.feedback.clone()),
            answer_text: q.answer.map(|a| a.answer_text.clone()),
            key_points: q.key_points.to_vec(),
            key_points_missed: missed_key_points(q.key_points, &covered),
            key_points_covered: covered,
        });
    }

    let percentage = percentage(total_score, max_score);
    InterviewResults {
        interview_id: view.interview.id,
        job_title: view.interview.job_title.clone(),
        total_score,
        max_score,
        percentage,
        passed: percentage >= PASS_THRESHOLD_PERCENT,
        answered,
        unanswered: questions.len() - answered,
        questions,
    }
}

/// Renders results as a Markdown report for download.
pub fn render_results_md(results: &InterviewResults) -> String {
    let verdict = if results.passed { "PASSED" } else { "NOT PASSED" };
    let mut md = format!("# Interview Results — {}\n\n", results.job_title);
    md.push_str(&format!(
        "- **Score:** {}/{} ({}%)\n",
        results.total_score, results.max_score, results.percentage
    ));
    md.push_str(&format!(
        "- **Result:** {verdict} (pass mark {PASS_THRESHOLD_PERCENT}%)\n"
    ));
    md.push_str(&format!(
        "- **Answered:** {} of {}\n\n",
        results.answered,
        results.answered + results.unanswered
    ));

    let mut main_number = 0;
    let mut follow_up_number = 0;
    for q in &results.questions {
        let heading = match q.kind {
            QuestionKind::Main => {
                main_number += 1;
                follow_up_number = 0;
                format!("## Question {main_number}")
            }
            QuestionKind::FollowUp => {
                follow_up_number += 1;
                format!("### Follow-up {main_number}.{follow_up_number}")
            }
        };
        md.push_str(&format!("{heading} ({})\n\n", q.category));
        md.push_str(&format!("> {}\n\n", q.question_text));

        match (q.score, &q.feedback) {
            (Some(score), Some(feedback)) => {
                md.push_str(&format!("- **Score:** {score}/{}\n", q.max_score));
                md.push_str(&format!("- **Feedback:** {feedback}\n"));
            }
            _ => md.push_str(&format!("- **Score:** not answered (0/{})\n", q.max_score)),
        }
        if !q.key_points_covered.is_empty() {
            md.push_str(&format!(
                "- **Covered:** {}\n",
                q.key_points_covered.join(", ")
            ));
        }
        if !q.key_points_missed.is_empty() {
            md.push_str(&format!("- **Missed:** {}\n", q.key_points_missed.join(", ")));
        }
        md.push('\n');
    }
    md
}
