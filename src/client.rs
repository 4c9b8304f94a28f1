use anyhow::Context;
use reqwest::header::{CONTENT_TYPE, LINK};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::CanvasConfig;
use crate::error::ExportError;

/// One HTTP response, reduced to what pagination needs.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub link: Option<String>,
    pub body: String,
}

/// Anything that can answer a GET. The Canvas client is the real one.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> anyhow::Result<Page>;
}

pub struct CanvasClient {
    config: CanvasConfig,
    http: reqwest::Client,
}

impl CanvasClient {
    pub fn new(config: CanvasConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("canvas-peer-review-export/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }
}

impl PageSource for CanvasClient {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> anyhow::Result<Page> {
        let url = merge_query(url, query)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.access_token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;

        Ok(Page { status, link, body })
    }
}

/// Appends `query` to `url`, skipping keys the URL already carries. Canvas
/// echoes the original parameters into its `next` links, so re-sending them
/// verbatim would duplicate list parameters such as `include[]`.
pub fn merge_query(url: &str, query: &[(&str, String)]) -> anyhow::Result<Url> {
    let mut url = Url::parse(url).with_context(|| format!("invalid url {url}"))?;
    let existing: Vec<String> = url.query_pairs().map(|(key, _)| key.into_owned()).collect();

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            if !existing.iter().any(|present| present == key) {
                pairs.append_pair(key, value);
            }
        }
    }

    // query_pairs_mut leaves a dangling "?" behind when nothing was appended
    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Finds the `rel="next"` target in a `Link` header.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if is_next {
            Some(target.trim_matches(|c| c == '<' || c == '>').to_string())
        } else {
            None
        }
    })
}

/// Follows `next` links until none remain, concatenating every page in order.
///
/// A transport error or a non-200 status ends the walk early and returns
/// whatever was gathered so far; only the log tells the two outcomes apart.
/// A 200 page that does not decode is an error.
pub async fn paginate<S, T>(
    source: &S,
    url: &str,
    query: &[(&str, String)],
) -> Result<Vec<T>, ExportError>
where
    S: PageSource,
    T: DeserializeOwned,
{
    let mut records = Vec::new();
    let mut next = Some(url.to_string());

    while let Some(url) = next.take() {
        debug!(%url, "fetching page");
        let page = match source.get(&url, query).await {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    %url,
                    error = %err,
                    kept = records.len(),
                    "request failed, stopping pagination"
                );
                break;
            }
        };

        if page.status != 200 {
            warn!(
                %url,
                status = page.status,
                kept = records.len(),
                "unexpected status, stopping pagination"
            );
            break;
        }

        let mut batch: Vec<T> = serde_json::from_str(&page.body)
            .map_err(|source| ExportError::Decode { url: url.clone(), source })?;
        records.append(&mut batch);

        next = page.link.as_deref().and_then(next_link);
    }

    Ok(records)
}

/// Fetches a single resource. `None` means the request failed or returned a
/// non-200 status; the caller decides whether that is fatal.
pub async fn fetch_one<S, T>(
    source: &S,
    url: &str,
    query: &[(&str, String)],
) -> Result<Option<T>, ExportError>
where
    S: PageSource,
    T: DeserializeOwned,
{
    debug!(%url, "fetching resource");
    let page = match source.get(url, query).await {
        Ok(page) => page,
        Err(err) => {
            warn!(%url, error = %err, "request failed");
            return Ok(None);
        }
    };

    if page.status != 200 {
        warn!(%url, status = page.status, "unexpected status");
        return Ok(None);
    }

    serde_json::from_str(&page.body)
        .map(Some)
        .map_err(|source| ExportError::Decode { url: url.to_string(), source })
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::testing::FakeSource;
    use super::*;

    const FIRST: &str = "https://canvas.test/api/v1/courses/1/users";
    const SECOND: &str = "https://canvas.test/api/v1/courses/1/users?page=2";
    const THIRD: &str = "https://canvas.test/api/v1/courses/1/users?page=3";

    #[test]
    fn next_link_picks_the_next_relation() {
        let header = concat!(
            r#"<https://x/a?page=1>; rel="current", "#,
            r#"<https://x/a?page=2>; rel="next", "#,
            r#"<https://x/a?page=9>; rel="last""#,
        );
        assert_eq!(next_link(header).as_deref(), Some("https://x/a?page=2"));
    }

    #[test]
    fn next_link_is_none_on_last_page() {
        let header = r#"<https://x/a?page=1>; rel="current", <https://x/a?page=1>; rel="first""#;
        assert_eq!(next_link(header), None);
        assert_eq!(next_link(""), None);
    }

    #[test]
    fn merge_query_skips_keys_already_in_url() {
        let url = merge_query(
            "https://x/a?page=2&include%5B%5D=assessments",
            &[("include[]", "assessments".to_string()), ("per_page", "50".to_string())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://x/a?page=2&include%5B%5D=assessments&per_page=50"
        );
    }

    #[test]
    fn merge_query_leaves_bare_urls_alone() {
        let url = merge_query("https://x/a", &[]).unwrap();
        assert_eq!(url.as_str(), "https://x/a");
    }

    #[tokio::test]
    async fn pages_are_concatenated_in_order() {
        let source = FakeSource::default()
            .page(FIRST, "[1, 2, 3]", Some(SECOND))
            .page(SECOND, "[4, 5]", Some(THIRD))
            .page(THIRD, "[6]", None);

        let records: Vec<i64> = paginate(&source, FIRST, &[("per_page", "3".to_string())])
            .await
            .unwrap();

        assert_eq!(records, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(source.requested(), vec![FIRST, SECOND, THIRD]);
    }

    #[tokio::test]
    async fn query_is_sent_on_every_page() {
        let source = FakeSource::default()
            .page(FIRST, "[1]", Some(SECOND))
            .page(SECOND, "[2]", None);

        let _: Vec<i64> = paginate(&source, FIRST, &[("per_page", "1".to_string())])
            .await
            .unwrap();

        let calls = source.calls.borrow();
        assert!(calls
            .iter()
            .all(|(_, query)| query == &vec![("per_page".to_string(), "1".to_string())]));
    }

    #[tokio::test]
    async fn empty_collection_yields_nothing() {
        let source = FakeSource::default().page(FIRST, "[]", None);
        let records: Vec<i64> = paginate(&source, FIRST, &[]).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn error_status_keeps_earlier_pages() {
        let source = FakeSource::default()
            .page(FIRST, "[1, 2]", Some(SECOND))
            .status(SECOND, 401)
            .page(THIRD, "[3]", None);

        let records: Vec<i64> = paginate(&source, FIRST, &[]).await.unwrap();

        assert_eq!(records, vec![1, 2]);
        assert_eq!(source.requested(), vec![FIRST, SECOND]);
    }

    #[tokio::test]
    async fn unauthorized_first_page_yields_nothing() {
        let source = FakeSource::default()
            .status(FIRST, 401)
            .page(SECOND, "[1]", None);

        let records: Vec<i64> = paginate(&source, FIRST, &[]).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(source.requested(), vec![FIRST]);
    }

    #[tokio::test]
    async fn transport_failure_keeps_earlier_pages() {
        let source = FakeSource::default().page(FIRST, "[1]", Some(SECOND));
        let records: Vec<i64> = paginate(&source, FIRST, &[]).await.unwrap();
        assert_eq!(records, vec![1]);
    }

    #[tokio::test]
    async fn undecodable_page_is_an_error() {
        let source = FakeSource::default().page(FIRST, r#"[{"id": "x"}]"#, None);
        let result: Result<Vec<i64>, _> = paginate(&source, FIRST, &[]).await;
        assert!(matches!(result, Err(ExportError::Decode { .. })));
    }

    #[tokio::test]
    async fn fetch_one_returns_none_on_error_status() {
        let source = FakeSource::default().status(FIRST, 404);
        let value: Option<i64> = fetch_one(&source, FIRST, &[]).await.unwrap();
        assert_eq!(value, None);
    }
}
