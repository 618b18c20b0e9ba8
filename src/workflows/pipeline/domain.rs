use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::assessments::domain::{AssessmentKind, TemplateId};

/// Identifier wrapper for unique human identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonId(pub String);

/// Identifier wrapper for candidate applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// A unique human identity keyed by email. Carries the single set of
/// general-competency results shared by all of the person's applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub general_completed: bool,
    /// Normalized onto the fixed general-competencies scale.
    pub general_score: Option<u32>,
    pub general_passed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Person {
    /// A person who completed the general assessment without a pass stamp
    /// is a known failure for routing purposes.
    pub fn failed_general(&self) -> bool {
        self.general_completed && self.general_passed_at.is_none()
    }

    pub fn passed_general(&self) -> bool {
        self.general_completed && self.general_passed_at.is_some()
    }
}

/// Ordered hiring pipeline stages. `order` values are strictly increasing
/// and the stage engine only ever moves records to a higher order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Application,
    GeneralCompetencies,
    SpecializedCompetencies,
    Interview,
    Agreement,
    Signed,
}

impl Stage {
    pub const fn order(self) -> u8 {
        match self {
            Stage::Application => 1,
            Stage::GeneralCompetencies => 2,
            Stage::SpecializedCompetencies => 3,
            Stage::Interview => 4,
            Stage::Agreement => 5,
            Stage::Signed => 6,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Stage::Application => "application",
            Stage::GeneralCompetencies => "general_competencies",
            Stage::SpecializedCompetencies => "specialized_competencies",
            Stage::Interview => "interview",
            Stage::Agreement => "agreement",
            Stage::Signed => "signed",
        }
    }
}

/// Lifecycle status of an application. Anything but `Active` freezes the
/// stage engine for that record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Active,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Active => "active",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }
}

/// One candidate's pursuit of one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub person_id: PersonId,
    pub position: String,
    pub current_stage: Stage,
    pub status: ApplicationStatus,
    /// Provider-issued submission id for webhook-created applications;
    /// the outermost de-duplication token.
    pub submission_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable, append-only record of one completed scoring event. Distinct
/// from the mutable session row; this is the permanent history trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: String,
    pub kind: AssessmentKind,
    pub person_id: Option<PersonId>,
    pub application_id: Option<ApplicationId>,
    pub template_id: Option<TemplateId>,
    /// Normalized score on the kind's fixed scale.
    pub score: u32,
    pub passed: bool,
    pub threshold: u32,
    pub completed_at: DateTime<Utc>,
    /// Unique key of the completion event (session id or provider
    /// submission id); the store refuses a second row with the same key.
    pub completion_key: String,
}
