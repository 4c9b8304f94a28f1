use anyhow::Context;
use tracing::info;

use crate::canvas;
use crate::client::PageSource;
use crate::config::{CanvasConfig, ExportTarget};
use crate::models::{AssessmentRow, AssessmentStats, SubmissionRow, UserRow};
use crate::normalize::{normalize_assessments, normalize_submissions, normalize_users};

#[derive(Debug, Clone)]
pub struct Tables {
    pub users: Vec<UserRow>,
    pub submissions: Vec<SubmissionRow>,
    pub assessments: Vec<AssessmentRow>,
    pub stats: AssessmentStats,
    pub rubric_title: String,
}

/// Builds the three tables in dependency order: users, then submissions
/// (keyed to users), then assessments (keyed to both).
pub async fn build_tables<S: PageSource>(
    source: &S,
    config: &CanvasConfig,
    target: &ExportTarget,
) -> anyhow::Result<Tables> {
    let raw_users = canvas::list_users(source, config, target.course_id)
        .await
        .context("failed to list course users")?;
    let users = normalize_users(&raw_users)?;
    info!(course_id = target.course_id, users = users.len(), "users table built");

    let assignment = canvas::get_assignment(source, config, target.course_id, target.assignment_id)
        .await
        .context("failed to fetch assignment")?;
    let raw_submissions =
        canvas::list_submissions(source, config, target.course_id, target.assignment_id)
            .await
            .context("failed to list submissions")?;
    let submissions = normalize_submissions(&assignment, &raw_submissions, &users)?;
    info!(
        assignment_id = target.assignment_id,
        submissions = submissions.len(),
        "submissions table built"
    );

    let rubric = canvas::get_rubric(source, config, target.course_id, target.rubric_id)
        .await
        .context("failed to fetch rubric")?;
    let (assessments, stats) =
        normalize_assessments(&rubric, target.rubric_association_id, &users, &submissions);
    info!(
        rubric_id = target.rubric_id,
        assessments = assessments.len(),
        "assessments table built"
    );

    Ok(Tables {
        users,
        submissions,
        assessments,
        stats,
        rubric_title: rubric.title,
    })
}
