/// Where the API lives and how to authenticate against it. Passed to every
/// request through the client rather than read from shared state.
#[derive(Clone)]
pub struct CanvasConfig {
    pub base_url: String,
    pub access_token: String,
}

impl CanvasConfig {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/v1/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for CanvasConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// The peer-review configuration one export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTarget {
    pub course_id: i64,
    pub assignment_id: i64,
    pub rubric_id: i64,
    pub rubric_association_id: i64,
}
