use std::collections::HashSet;

use chrono::{DateTime, Utc};
use chrono_tz::America::Edmonton;
use tracing::{info, warn};

use crate::error::ExportError;
use crate::models::{
    AssessmentRow, AssessmentStats, CanvasAssignment, CanvasRubric, CanvasSubmission, CanvasUser,
    Lateness, RubricAssessment, SubmissionRow, UserRow,
};
use crate::resolve::resolve;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

pub fn derive_ccid(email: &str) -> Option<&str> {
    match email.split_once('@') {
        Some((local, _)) if !local.is_empty() => Some(local),
        _ => None,
    }
}

pub fn normalize_users(users: &[CanvasUser]) -> Result<Vec<UserRow>, ExportError> {
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(users.len());

    for user in users {
        if !seen.insert(user.id) {
            warn!(canvas_id = user.id, "duplicate user in listing, keeping the first");
            continue;
        }

        let ccid = derive_ccid(&user.email).ok_or_else(|| ExportError::MalformedEmail {
            canvas_id: user.id,
            email: user.email.clone(),
        })?;

        rows.push(UserRow {
            canvas_id: user.id,
            name: user.name.clone(),
            student_id: user.student_id,
            ccid: ccid.to_string(),
        });
    }

    Ok(rows)
}

/// Signed hours between the due date and the submission; negative is early.
pub fn hours_late(submitted_at: DateTime<Utc>, due_at: DateTime<Utc>) -> f64 {
    (submitted_at - due_at).num_milliseconds() as f64 / 3_600_000.0
}

pub fn display_time(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Edmonton).format(DISPLAY_FORMAT).to_string()
}

pub fn normalize_submissions(
    assignment: &CanvasAssignment,
    submissions: &[CanvasSubmission],
    users: &[UserRow],
) -> Result<Vec<SubmissionRow>, ExportError> {
    let due_at = assignment
        .due_at
        .ok_or(ExportError::MissingDueDate(assignment.id))?;

    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(submissions.len());

    for submission in submissions {
        if !seen.insert(submission.id) {
            warn!(
                submission_id = submission.id,
                "duplicate submission in listing, keeping the first"
            );
            continue;
        }

        let late = submission.submitted_at.map(|at| hours_late(at, due_at));

        let student_id = student_of_user(users, submission.user_id);
        if student_id.is_none() {
            warn!(
                submission_id = submission.id,
                canvas_id = submission.user_id,
                "no student id for canvas user"
            );
        }

        rows.push(SubmissionRow {
            submission_id: submission.id,
            student_id,
            submitted_at: submission.submitted_at.map(display_time),
            hours_late: late.unwrap_or(0.0),
            lateness: Lateness::from_hours(late),
            status: submission.workflow_state.clone(),
            attempt: submission.attempt.unwrap_or(0),
        });
    }

    Ok(rows)
}

fn student_of_user(users: &[UserRow], canvas_id: i64) -> Option<i64> {
    resolve(users, |u| u.canvas_id, canvas_id, |u| Some(u.student_id))
}

fn student_of_submission(submissions: &[SubmissionRow], submission_id: i64) -> Option<i64> {
    resolve(submissions, |s| s.submission_id, submission_id, |s| s.student_id)
}

/// Keeps the assessments made under one rubric association, in order.
pub fn filter_by_association(
    assessments: &[RubricAssessment],
    association_id: i64,
) -> Vec<&RubricAssessment> {
    assessments
        .iter()
        .filter(|a| a.rubric_association_id == Some(association_id))
        .collect()
}

pub fn normalize_assessments(
    rubric: &CanvasRubric,
    association_id: i64,
    users: &[UserRow],
    submissions: &[SubmissionRow],
) -> (Vec<AssessmentRow>, AssessmentStats) {
    let matching = filter_by_association(&rubric.assessments, association_id);

    let stats = AssessmentStats {
        total: rubric.assessments.len(),
        matching_association: matching.len(),
        peer_reviews: matching
            .iter()
            .filter(|a| a.assessment_type == "peer_review")
            .count(),
        submission_artifacts: matching
            .iter()
            .filter(|a| a.artifact_type == "Submission")
            .count(),
    };
    info!(
        rubric_id = rubric.id,
        association_id,
        total = stats.total,
        matching = stats.matching_association,
        peer_reviews = stats.peer_reviews,
        submission_artifacts = stats.submission_artifacts,
        "filtered rubric assessments"
    );

    let rows = matching
        .into_iter()
        .map(|assessment| {
            let assessor_student_id = assessment
                .assessor_id
                .and_then(|canvas_id| student_of_user(users, canvas_id));
            if assessor_student_id.is_none() {
                warn!(
                    assessment_id = assessment.id,
                    canvas_id = ?assessment.assessor_id,
                    "no student id for assessor"
                );
            }

            // artifact ids are submission ids, so the assessed student sits
            // behind the submissions table rather than the users table
            let assessed_student_id = assessment
                .artifact_id
                .and_then(|submission_id| student_of_submission(submissions, submission_id));
            if assessed_student_id.is_none() {
                warn!(
                    assessment_id = assessment.id,
                    submission_id = ?assessment.artifact_id,
                    "no student id for assessed submission"
                );
            }

            AssessmentRow {
                assessment_id: assessment.id,
                assessed_student_id,
                assessor_student_id,
                score: assessment.score.unwrap_or(0.0),
                attempt: assessment.artifact_attempt.unwrap_or(0),
            }
        })
        .collect();

    (rows, stats)
}
