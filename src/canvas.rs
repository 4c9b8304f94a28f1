use serde_json::Value;

use crate::client::{fetch_one, paginate, PageSource};
use crate::config::CanvasConfig;
use crate::error::ExportError;
use crate::models::{
    CanvasAssignment, CanvasPeerReview, CanvasRubric, CanvasSubmission, CanvasUser, RubricSummary,
};

const PER_PAGE: &str = "100";

fn per_page() -> (&'static str, String) {
    ("per_page", PER_PAGE.to_string())
}

pub async fn list_users<S: PageSource>(
    source: &S,
    config: &CanvasConfig,
    course_id: i64,
) -> Result<Vec<CanvasUser>, ExportError> {
    let url = config.endpoint(&format!("courses/{course_id}/users"));
    let query = [
        ("enrollment_type[]", "student".to_string()),
        ("include[]", "email".to_string()),
        per_page(),
    ];
    paginate(source, &url, &query).await
}

/// Canvas answers `user_id` with the whole page that user sits on, so the
/// listing is narrowed to the requested id afterwards. Only the match is
/// validated; classmates on the same page may lack fields.
pub async fn get_user_in_course<S: PageSource>(
    source: &S,
    config: &CanvasConfig,
    course_id: i64,
    user_id: i64,
) -> Result<Option<CanvasUser>, ExportError> {
    let url = config.endpoint(&format!("courses/{course_id}/users"));
    let query = [("user_id", user_id.to_string()), ("include[]", "email".to_string())];
    let page: Vec<Value> = fetch_one(source, &url, &query).await?.unwrap_or_default();

    page.into_iter()
        .find(|user| user.get("id").and_then(Value::as_i64) == Some(user_id))
        .map(serde_json::from_value)
        .transpose()
        .map_err(|source| ExportError::Decode { url, source })
}

pub async fn get_assignment<S: PageSource>(
    source: &S,
    config: &CanvasConfig,
    course_id: i64,
    assignment_id: i64,
) -> Result<CanvasAssignment, ExportError> {
    let url = config.endpoint(&format!("courses/{course_id}/assignments/{assignment_id}"));
    let assignment = fetch_one(source, &url, &[]).await?;
    assignment.ok_or(ExportError::Unavailable { resource: "assignment", url })
}

pub async fn list_submissions<S: PageSource>(
    source: &S,
    config: &CanvasConfig,
    course_id: i64,
    assignment_id: i64,
) -> Result<Vec<CanvasSubmission>, ExportError> {
    let url = config.endpoint(&format!(
        "courses/{course_id}/assignments/{assignment_id}/submissions"
    ));
    paginate(source, &url, &[per_page()]).await
}

/// The rubric detail embeds every assessment ever made with it, across all
/// of its associations.
pub async fn get_rubric<S: PageSource>(
    source: &S,
    config: &CanvasConfig,
    course_id: i64,
    rubric_id: i64,
) -> Result<CanvasRubric, ExportError> {
    let url = config.endpoint(&format!("courses/{course_id}/rubrics/{rubric_id}"));
    let query = [("include[]", "assessments".to_string())];
    let rubric = fetch_one(source, &url, &query).await?;
    rubric.ok_or(ExportError::Unavailable { resource: "rubric", url })
}

pub async fn list_rubrics<S: PageSource>(
    source: &S,
    config: &CanvasConfig,
    course_id: i64,
) -> Result<Vec<RubricSummary>, ExportError> {
    let url = config.endpoint(&format!("courses/{course_id}/rubrics"));
    paginate(source, &url, &[per_page()]).await
}

pub async fn list_peer_reviews<S: PageSource>(
    source: &S,
    config: &CanvasConfig,
    course_id: i64,
    assignment_id: i64,
) -> Result<Vec<CanvasPeerReview>, ExportError> {
    let url = config.endpoint(&format!(
        "courses/{course_id}/assignments/{assignment_id}/peer_reviews"
    ));
    paginate(source, &url, &[per_page()]).await
}

pub async fn list_user_assignments<S: PageSource>(
    source: &S,
    config: &CanvasConfig,
    course_id: i64,
    user_id: i64,
) -> Result<Vec<CanvasAssignment>, ExportError> {
    let url = config.endpoint(&format!("users/{user_id}/courses/{course_id}/assignments"));
    Ok(fetch_one(source, &url, &[]).await?.unwrap_or_default())
}
