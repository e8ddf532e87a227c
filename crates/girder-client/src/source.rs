//! The [`PageSource`] trait and its HTTP implementation.
//!
//! The trait is the seam between the fetch coordinator and the network:
//! the engine's worker pool is written against `dyn PageSource`, so tests
//! drive it with scripted sources and production uses [`HttpPageSource`].

use crate::error::{Error, Result};
use crate::page::{DateWindow, PageQuery, PageToken, RawPage};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// A source of issue-record pages.
///
/// Implementations must be `Send + Sync`: the fetch coordinator shares one
/// source across all workers. A call returns exactly one page; pagination
/// state lives entirely in the [`PageQuery`] cursor, so sources can be
/// stateless.
///
/// Retry policy is an implementation concern: [`HttpPageSource`] retries
/// transient failures internally and only surfaces terminal errors
/// (non-retryable, or retryable-exhausted as
/// [`Error::RetriesExhausted`]).
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the next page of raw issue records for the query.
    ///
    /// # Errors
    ///
    /// Returns a terminal [`Error`]; see the trait docs for the retry
    /// contract.
    async fn fetch_page(&self, query: &PageQuery) -> Result<RawPage>;
}

/// Request body for the enhanced JQL search endpoint.
///
/// The first page omits `nextPageToken`; continuation pages pass back the
/// token from the previous response verbatim.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    jql: String,
    max_results: usize,
    fields: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page_token: Option<&'a str>,
}

/// Response body for the enhanced JQL search endpoint.
///
/// Field presence is inconsistent across deployments, so everything is
/// optional and defaulted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<serde_json::Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// HTTP page source for an Atlassian-style issue search API.
///
/// Authenticates with basic auth (account email + API token), filters by a
/// JQL `created` date range, and paginates with `nextPageToken`
/// continuation. Transient failures are retried per the configured
/// [`RetryPolicy`]; per-request timeouts are enforced by the underlying
/// client and are independent of any caller-side cancellation.
pub struct HttpPageSource {
    client: reqwest::Client,
    base_url: String,
    email: String,
    token: String,
    project_key: String,
    retry: RetryPolicy,
}

impl HttpPageSource {
    /// Create a source for the given API endpoint and project.
    ///
    /// `timeout` applies per page request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        token: impl Into<String>,
        project_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email: email.into(),
            token: token.into(),
            project_key: project_key.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the default retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the JQL filter for a date window.
    fn jql(&self, window: &DateWindow) -> String {
        build_jql(&self.project_key, window)
    }

    /// Perform a single request with no retry.
    async fn fetch_once(&self, query: &PageQuery) -> Result<RawPage> {
        let url = format!("{}/rest/api/3/search/jql", self.base_url);
        let request = SearchRequest {
            jql: self.jql(&query.window),
            max_results: query.page_size,
            fields: &["*all"],
            next_page_token: query.cursor.as_ref().map(PageToken::as_str),
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.email, Some(&self.token))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status.as_u16(), &body));
        }

        let page: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::UnexpectedBody(e.to_string()))?;

        Ok(RawPage {
            records: page.issues,
            next: page.next_page_token.map(PageToken::new),
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, query: &PageQuery) -> Result<RawPage> {
        with_retry(&self.retry, || self.fetch_once(query)).await
    }
}

/// Drive a single-shot fetch through the retry schedule.
///
/// Transient failures are retried up to `policy.max_attempts` with a
/// backoff sleep between attempts, then wrapped as
/// [`Error::RetriesExhausted`]. Non-retryable errors surface from the
/// first attempt that produces them, with no sleep.
async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut fetch: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match fetch().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient page fetch failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) if err.is_retryable() => {
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            Err(err) => return Err(err),
        }
    }
}

/// Build a JQL query filtering a project by `created` date range.
///
/// Dates use the `YYYY-MM-DD` calendar form the API expects; ordering by
/// `created` keeps page contents stable across a pagination chain.
#[must_use]
pub fn build_jql(project_key: &str, window: &DateWindow) -> String {
    format!(
        "project = {} AND created >= \"{}\" AND created <= \"{}\" ORDER BY created ASC",
        project_key, window.start, window.end
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> DateWindow {
        DateWindow::new(
            "2024-01-01".parse().unwrap(),
            "2024-03-31".parse().unwrap(),
        )
    }

    #[test]
    fn jql_contains_project_and_range() {
        let jql = build_jql("APP", &window());
        assert_eq!(
            jql,
            "project = APP AND created >= \"2024-01-01\" AND created <= \"2024-03-31\" \
             ORDER BY created ASC"
        );
    }

    #[test]
    fn first_page_request_omits_cursor() {
        let request = SearchRequest {
            jql: build_jql("APP", &window()),
            max_results: 100,
            fields: &["*all"],
            next_page_token: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("nextPageToken").is_none());
        assert_eq!(json["maxResults"], 100);
        assert_eq!(json["fields"][0], "*all");
    }

    #[test]
    fn continuation_request_carries_cursor() {
        let request = SearchRequest {
            jql: String::new(),
            max_results: 50,
            fields: &["*all"],
            next_page_token: Some("tok-17"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["nextPageToken"], "tok-17");
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let page: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(page.issues.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn response_parses_records_and_token() {
        let body = r#"{
            "issues": [{"key": "APP-1"}, {"key": "APP-2"}],
            "nextPageToken": "tok-2",
            "total": 240
        }"#;
        let page: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.issues.len(), 2);
        assert_eq!(page.next_page_token.as_deref(), Some("tok-2"));
    }

    mod retry_loop {
        use super::*;
        use std::sync::atomic::{AtomicU32, Ordering};

        #[tokio::test(start_paused = true)]
        async fn transient_failures_exhaust_after_max_attempts() {
            let policy = RetryPolicy::default();
            let calls = AtomicU32::new(0);

            let err = with_retry(&policy, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(Error::Server { status: 503 }) }
            })
            .await
            .unwrap_err();

            assert_eq!(calls.load(Ordering::SeqCst), 5);
            let Error::RetriesExhausted { attempts, last } = err else {
                panic!("expected RetriesExhausted, got {err}");
            };
            assert_eq!(attempts, 5);
            assert!(matches!(*last, Error::Server { status: 503 }));
        }

        #[tokio::test(start_paused = true)]
        async fn succeeds_once_a_transient_failure_clears() {
            let policy = RetryPolicy::default();
            let calls = AtomicU32::new(0);

            let value = with_retry(&policy, || {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if call < 3 {
                        Err(Error::RateLimited)
                    } else {
                        Ok(call)
                    }
                }
            })
            .await
            .unwrap();

            assert_eq!(value, 3);
            assert_eq!(calls.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn terminal_errors_surface_without_retry() {
            let policy = RetryPolicy::default();
            let calls = AtomicU32::new(0);

            let err = with_retry(&policy, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(Error::Auth { status: 401 }) }
            })
            .await
            .unwrap_err();

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(matches!(err, Error::Auth { status: 401 }));
        }

        #[tokio::test(start_paused = true)]
        async fn single_attempt_policy_never_sleeps() {
            let policy = RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            };
            let calls = AtomicU32::new(0);

            let err = with_retry(&policy, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(Error::RateLimited) }
            })
            .await
            .unwrap_err();

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(matches!(err, Error::RetriesExhausted { attempts: 1, .. }));
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let source = HttpPageSource::new(
            "https://example.atlassian.net/",
            "dev@example.com",
            "token",
            "APP",
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(source.base_url, "https://example.atlassian.net");
    }
}
