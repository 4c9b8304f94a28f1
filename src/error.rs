use thiserror::Error;

/// Failures that abort an export. Network and lookup problems are not here:
/// those degrade to partial tables with a logged warning.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("user {canvas_id} has malformed email {email:?}")]
    MalformedEmail { canvas_id: i64, email: String },
    #[error("assignment {0} has no due date")]
    MissingDueDate(i64),
    #[error("{resource} could not be fetched from {url}")]
    Unavailable { resource: &'static str, url: String },
    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
