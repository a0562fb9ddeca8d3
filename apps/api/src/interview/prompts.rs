// All model prompt templates for the interview module.
// Placeholders are filled with `llm_client::prompts::render`.

/// System prompt for question generation. JSON only.
pub const QUESTION_GEN_SYSTEM: &str = "You are an experienced HR interviewer preparing a \
    mock interview. You write clear, role-specific questions a real hiring panel would ask. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Question generation prompt. Placeholders: `{job_title}`, `{job_description}`,
/// `{experience_level}`, `{skills}`, `{question_count}`.
pub const QUESTION_GEN_PROMPT: &str = r#"Prepare a mock interview for the following role.

JOB TITLE: {job_title}
EXPERIENCE LEVEL: {experience_level}
KEY SKILLS:
{skills}

JOB DESCRIPTION:
{job_description}

Write exactly {question_count} interview questions.

OUTPUT SCHEMA (return exactly this structure):
{
  "questions": [
    {
      "question": "string",
      "category": "technical" | "behavioral" | "situational",
      "key_points": ["string"],
      "max_score": 10,
      "time_limit": 120
    }
  ]
}

RULES:
1. Mix categories: at least one behavioral question when asking 3 or more.
2. key_points lists 2-5 things a strong answer covers. Keep each under 12 words.
3. time_limit is the answer time in seconds, between 60 and 300.
4. Match the difficulty to the experience level.
5. Return ONLY the JSON object."#;

/// System prompt for answer scoring. Plain text in a fixed layout.
pub const SCORING_SYSTEM: &str = "You are an experienced HR interviewer grading a candidate's \
    answer in a mock interview. Be fair and specific. Always reply in exactly the layout \
    you are given, with no extra sections and no markdown headings.";

/// Answer scoring prompt. Placeholders: `{job_title}`, `{question}`, `{key_points}`,
/// `{max_score}`, `{answer}`.
pub const SCORING_PROMPT: &str = r#"Grade this interview answer for a {job_title} candidate.

QUESTION:
{question}

KEY POINTS A STRONG ANSWER COVERS:
{key_points}

CANDIDATE ANSWER:
{answer}

Reply in exactly this layout:
Score: <whole number from 0 to {max_score}>/{max_score}
Feedback: <two to four sentences of specific, constructive feedback>
Key Points Covered: <comma-separated key points the answer covered, or None>"#;

/// System prompt for follow-up generation. JSON only.
pub const FOLLOW_UP_SYSTEM: &str = "You are an experienced HR interviewer. You question a \
    candidate's previous answer with one short follow-up question when it is worth digging \
    deeper. You MUST respond with valid JSON only. \
    Do NOT use markdown code fences.";

/// Follow-up prompt. Placeholders: `{job_title}`, `{question}`, `{key_points}`,
/// `{answer}`, `{previous_follow_ups}`.
pub const FOLLOW_UP_PROMPT: &str = r#"You are interviewing a candidate for: {job_title}

ORIGINAL QUESTION:
{question}

KEY POINTS EXPECTED:
{key_points}

FOLLOW-UPS ALREADY ASKED:
{previous_follow_ups}

CANDIDATE'S LATEST ANSWER:
{answer}

Decide whether one follow-up question would reveal more about the candidate: a vague claim
to make concrete, a missed key point, or an interesting detail to explore.

OUTPUT SCHEMA:
{
  "follow_up": "string" | null,
  "category": "technical" | "behavioral" | "situational",
  "key_points": ["string"]
}

RULES:
1. Set follow_up to null if the answer is already complete or off-topic.
2. Never repeat a follow-up that was already asked.
3. The follow-up must be answerable in about a minute.
4. Return ONLY the JSON object."#;
