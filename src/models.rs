use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A course member as returned by `courses/:id/users`.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasUser {
    pub id: i64,
    pub name: String,
    #[serde(rename = "sis_user_id", deserialize_with = "de_student_id")]
    pub student_id: i64,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasAssignment {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasSubmission {
    pub id: i64,
    pub user_id: i64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub workflow_state: SubmissionStatus,
    pub attempt: Option<i64>,
}

/// Rubric detail, fetched with `include[]=assessments`.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasRubric {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub assessments: Vec<RubricAssessment>,
}

/// One assessment embedded in a rubric. The rubric carries assessments from
/// every association it was ever used in, so only `id` is required here and
/// the rest is checked after filtering.
#[derive(Debug, Clone, Deserialize)]
pub struct RubricAssessment {
    pub id: i64,
    pub rubric_association_id: Option<i64>,
    pub score: Option<f64>,
    pub artifact_attempt: Option<i64>,
    pub assessor_id: Option<i64>,
    pub artifact_id: Option<i64>,
    #[serde(default)]
    pub artifact_type: String,
    #[serde(default)]
    pub assessment_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RubricSummary {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub points_possible: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasPeerReview {
    pub assessor_id: i64,
    pub user_id: i64,
    pub asset_id: i64,
    #[serde(default)]
    pub asset_type: String,
    #[serde(default)]
    pub workflow_state: String,
}

/// Workflow state of a submission. States Canvas adds later are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum SubmissionStatus {
    Submitted,
    Unsubmitted,
    Graded,
    PendingReview,
    Other(String),
}

impl From<String> for SubmissionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "submitted" => SubmissionStatus::Submitted,
            "unsubmitted" => SubmissionStatus::Unsubmitted,
            "graded" => SubmissionStatus::Graded,
            "pending_review" => SubmissionStatus::PendingReview,
            _ => SubmissionStatus::Other(value),
        }
    }
}

impl From<SubmissionStatus> for String {
    fn from(value: SubmissionStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Submitted => f.write_str("submitted"),
            SubmissionStatus::Unsubmitted => f.write_str("unsubmitted"),
            SubmissionStatus::Graded => f.write_str("graded"),
            SubmissionStatus::PendingReview => f.write_str("pending_review"),
            SubmissionStatus::Other(state) => f.write_str(state),
        }
    }
}

/// Distinguishes work that was never handed in from work handed in on time,
/// which `hours_late` alone encodes identically as 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lateness {
    NotSubmitted,
    OnTime,
    Late,
}

impl Lateness {
    pub fn label(self) -> &'static str {
        match self {
            Lateness::NotSubmitted => "not submitted",
            Lateness::OnTime => "on time",
            Lateness::Late => "late",
        }
    }

    pub fn from_hours(hours_late: Option<f64>) -> Self {
        match hours_late {
            None => Lateness::NotSubmitted,
            Some(hours) if hours > 0.0 => Lateness::Late,
            Some(_) => Lateness::OnTime,
        }
    }
}

/// A row type exported as one CSV table. `HEADER` follows field order.
pub trait TableRow: Serialize {
    const HEADER: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    pub canvas_id: i64,
    pub name: String,
    pub student_id: i64,
    pub ccid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRow {
    pub submission_id: i64,
    pub student_id: Option<i64>,
    pub submitted_at: Option<String>,
    pub hours_late: f64,
    pub lateness: Lateness,
    pub status: SubmissionStatus,
    pub attempt: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentRow {
    pub assessment_id: i64,
    pub assessed_student_id: Option<i64>,
    pub assessor_student_id: Option<i64>,
    pub score: f64,
    pub attempt: i64,
}

impl TableRow for UserRow {
    const HEADER: &'static [&'static str] = &["canvas_id", "name", "student_id", "ccid"];
}

impl TableRow for SubmissionRow {
    const HEADER: &'static [&'static str] = &[
        "submission_id",
        "student_id",
        "submitted_at",
        "hours_late",
        "lateness",
        "status",
        "attempt",
    ];
}

impl TableRow for AssessmentRow {
    const HEADER: &'static [&'static str] = &[
        "assessment_id",
        "assessed_student_id",
        "assessor_student_id",
        "score",
        "attempt",
    ];
}

/// Counts logged while building the assessments table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssessmentStats {
    pub total: usize,
    pub matching_association: usize,
    pub peer_reviews: usize,
    pub submission_artifacts: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatenessSummary {
    pub lateness: Lateness,
    pub count: usize,
    pub avg_hours_late: f64,
}

fn de_student_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(value) => Ok(value),
        RawId::Text(value) => value
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid sis_user_id {value:?}"))),
    }
}
