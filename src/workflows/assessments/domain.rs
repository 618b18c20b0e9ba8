use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::pipeline::domain::{ApplicationId, PersonId};

/// Identifier wrapper for versioned questionnaire templates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

/// Identifier wrapper for assessment sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Identifier wrapper for questions inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionId(pub String);

/// The two assessment families tracked by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    GeneralCompetencies,
    SpecializedCompetencies,
}

impl AssessmentKind {
    pub const fn label(self) -> &'static str {
        match self {
            AssessmentKind::GeneralCompetencies => "general_competencies",
            AssessmentKind::SpecializedCompetencies => "specialized_competencies",
        }
    }
}

/// A selectable option with the points it contributes when chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
    pub points: u32,
}

/// Type-specific scoring configuration for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionConfig {
    SingleChoice { options: Vec<ChoiceOption> },
    MultipleChoice { options: Vec<ChoiceOption> },
    /// Five-point agreement scale; `points_map[value - 1]` overrides the
    /// linear fallback when present.
    Likert { points_map: Option<Vec<u32>> },
    TrueFalse { correct: bool },
    Rating { min: i32, max: i32 },
    FreeText,
}

/// One question within a template. `points` is the maximum attainable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub points: u32,
    #[serde(flatten)]
    pub config: QuestionConfig,
}

/// A candidate's answer to one question. The tag mirrors the question type
/// so shape mismatches are visible to the scorer instead of being guessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    SingleChoice { option_id: String },
    MultipleChoice { option_ids: Vec<String> },
    Likert { value: u8 },
    TrueFalse { value: bool },
    Rating { value: i32 },
    FreeText { text: String },
}

/// Versioned questionnaire definition scored by the session lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentTemplate {
    pub id: TemplateId,
    pub kind: AssessmentKind,
    pub title: String,
    /// Position filter for specialized templates; `None` for general ones.
    pub position: Option<String>,
    pub questions: Vec<Question>,
    /// Raw-score equivalent kept for display; the authoritative pass
    /// decision uses the normalized process-wide threshold.
    pub passing_score: u32,
    pub time_limit_minutes: Option<u32>,
    pub is_active: bool,
}

impl AssessmentTemplate {
    /// Sum of the question maxima; the denominator for normalization.
    pub fn max_score(&self) -> u32 {
        self.questions.iter().map(|question| question.points).sum()
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| &question.id == id)
    }
}

/// Session state machine. All transitions are one-way and everything but
/// `InProgress` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Expired,
    Abandoned,
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Expired => "expired",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

/// Identity tuple owning at most one non-terminal session at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub template_id: TemplateId,
    pub person_id: PersonId,
    pub application_id: Option<ApplicationId>,
}

/// One candidate's attempt at one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSession {
    pub id: SessionId,
    pub template_id: TemplateId,
    pub person_id: PersonId,
    pub application_id: Option<ApplicationId>,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Raw score, kept for display; populated on completion.
    pub score: Option<u32>,
    pub passed: Option<bool>,
}

impl AssessmentSession {
    pub fn key(&self) -> SessionKey {
        SessionKey {
            template_id: self.template_id.clone(),
            person_id: self.person_id.clone(),
            application_id: self.application_id.clone(),
        }
    }
}

/// One answered (or autosaved) question within a session. Upserted by
/// (session, question); the score is filled in at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub answer: Answer,
    pub score: Option<u32>,
    pub answered_at: DateTime<Utc>,
}

/// Summary returned to the candidate after a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub session_id: SessionId,
    pub raw_score: u32,
    pub max_score: u32,
    pub percentage: f64,
    pub normalized_score: u32,
    pub passed: bool,
    pub threshold: u32,
    pub completed_at: DateTime<Utc>,
}
