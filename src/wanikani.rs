//! WaniKani API client: counts the reviews that became available this hour.

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use tracing::debug;

const API_URL: &str = "https://api.wanikani.com/v2";

/// WaniKani personal access tokens are UUID-shaped.
const TOKEN_SHAPE: &str = r"^\w{8}-\w{4}-\w{4}-\w{4}-\w{12}$";

/// A failed review query, classified for user-facing messaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The token failed the local shape check; no request was made.
    InvalidCredential,
    /// WaniKani answered 401.
    Unauthorized,
    /// No response at all (connection, DNS, timeout).
    Transport(String),
    /// A non-2xx, non-401 status.
    Upstream(u16),
    /// 2xx but the body was not the expected assignment list.
    MalformedResponse,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredential => write!(
                f,
                "Invalid API token: expected something like 12345678-1234-1234-1234-123456789012"
            ),
            Self::Unauthorized => write!(f, "WaniKani rejected the API token (unauthorized)"),
            Self::Transport(e) => write!(f, "Could not reach WaniKani: {e}"),
            Self::Upstream(status) => {
                write!(f, "WaniKani returned an unexpected status: {status}")
            }
            Self::MalformedResponse => write!(f, "WaniKani sent a response I could not understand"),
        }
    }
}

impl std::error::Error for QueryError {}

/// Seam over the review query so dialogue and scheduler code can be tested
/// without a network.
pub trait ReviewQuery {
    fn query_review_count(
        &self,
        credential: &str,
    ) -> impl Future<Output = Result<usize, QueryError>> + Send;
}

/// The query window for the current hour: `from` is the top of the hour,
/// `to` lands at :59:00 rather than the next hour boundary. The last minute
/// of each hour is deliberately left out of the window; users calibrate
/// against the counts this produces, so it stays.
pub fn hour_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = now
        .duration_trunc(TimeDelta::hours(1))
        .expect("truncate to hour");
    (from, from + TimeDelta::minutes(59))
}

#[derive(Deserialize)]
struct AssignmentsResponse {
    /// Assignments due in the window. Only the cardinality is used.
    data: Vec<serde_json::Value>,
}

pub struct WaniKaniClient {
    http: reqwest::Client,
    base_url: String,
    token_shape: Regex,
}

impl WaniKaniClient {
    pub fn new() -> Self {
        Self::with_base_url(API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            token_shape: Regex::new(TOKEN_SHAPE).expect("token shape regex"),
        }
    }
}

impl Default for WaniKaniClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewQuery for WaniKaniClient {
    /// One bearer-authenticated query against `/assignments`, filtered to
    /// reviews available in the current hour. No retries, no caching; every
    /// failure is classified and returned to the caller.
    async fn query_review_count(&self, credential: &str) -> Result<usize, QueryError> {
        if credential.is_empty() || !self.token_shape.is_match(credential) {
            return Err(QueryError::InvalidCredential);
        }

        let (from, to) = hour_window(Utc::now());
        let url = format!("{}/assignments", self.base_url);
        debug!("Querying {url} for [{from}, {to})");

        let response = self
            .http
            .get(&url)
            .bearer_auth(credential)
            .query(&[
                ("available_after", from.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ("available_before", to.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ("in_review", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(QueryError::Unauthorized);
        }
        if !status.is_success() {
            return Err(QueryError::Upstream(status.as_u16()));
        }

        let body: AssignmentsResponse = response
            .json()
            .await
            .map_err(|_| QueryError::MalformedResponse)?;

        Ok(body.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Serve an axum router on an ephemeral port, returning its base URL.
    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    const GOOD_TOKEN: &str = "12345678-1234-1234-1234-123456789012";

    #[test]
    fn test_hour_window_truncates_to_top_of_hour() {
        let now = DateTime::parse_from_rfc3339("2026-08-30T14:37:25.123Z")
            .unwrap()
            .with_timezone(&Utc);
        let (from, to) = hour_window(now);
        assert_eq!(from.to_rfc3339_opts(SecondsFormat::Millis, true), "2026-08-30T14:00:00.000Z");
        assert_eq!(to.to_rfc3339_opts(SecondsFormat::Millis, true), "2026-08-30T14:59:00.000Z");
    }

    #[test]
    fn test_hour_window_is_59_minutes_wide() {
        let now = Utc::now();
        let (from, to) = hour_window(now);
        assert_eq!(to - from, TimeDelta::minutes(59));
    }

    #[tokio::test]
    async fn test_empty_token_rejected_without_network() {
        // An unroutable base URL: any network attempt would surface as
        // Transport instead of InvalidCredential.
        let client = WaniKaniClient::with_base_url("http://127.0.0.1:1");
        let err = client.query_review_count("").await.unwrap_err();
        assert_eq!(err, QueryError::InvalidCredential);
    }

    #[tokio::test]
    async fn test_malformed_tokens_rejected_without_network() {
        let client = WaniKaniClient::with_base_url("http://127.0.0.1:1");
        for bad in [
            "bad-token",
            "12345678-1234-1234-1234-12345678901",   // last group too short
            "12345678-1234-1234-1234-1234567890123", // last group too long
            "12345678.1234.1234.1234.123456789012",
            " 12345678-1234-1234-1234-123456789012",
        ] {
            let err = client.query_review_count(bad).await.unwrap_err();
            assert_eq!(err, QueryError::InvalidCredential, "token {bad:?}");
        }
    }

    #[tokio::test]
    async fn test_success_returns_count_and_sends_windowed_query() {
        let seen: Arc<Mutex<Option<(HashMap<String, String>, Option<String>)>>> =
            Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();

        let app = Router::new().route(
            "/assignments",
            get(move |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                *seen_clone.lock().unwrap() = Some((params, auth));
                async { axum::Json(json!({"data": [{}, {}, {}]})) }
            }),
        );
        let base = spawn_server(app).await;

        let client = WaniKaniClient::with_base_url(base);
        let count = client.query_review_count(GOOD_TOKEN).await.unwrap();
        assert_eq!(count, 3);

        let (params, auth) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(auth.as_deref(), Some(format!("Bearer {GOOD_TOKEN}").as_str()));
        assert_eq!(params.get("in_review").map(String::as_str), Some("true"));

        let after = DateTime::parse_from_rfc3339(params.get("available_after").unwrap())
            .unwrap()
            .with_timezone(&Utc);
        let before = DateTime::parse_from_rfc3339(params.get("available_before").unwrap())
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(after.format("%M:%S").to_string(), "00:00");
        assert_eq!(before - after, TimeDelta::minutes(59));
    }

    #[tokio::test]
    async fn test_401_is_unauthorized() {
        let app = Router::new().route("/assignments", get(|| async { StatusCode::UNAUTHORIZED }));
        let base = spawn_server(app).await;

        let client = WaniKaniClient::with_base_url(base);
        let err = client.query_review_count(GOOD_TOKEN).await.unwrap_err();
        assert_eq!(err, QueryError::Unauthorized);
    }

    #[tokio::test]
    async fn test_other_status_is_upstream() {
        let app = Router::new()
            .route("/assignments", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let base = spawn_server(app).await;

        let client = WaniKaniClient::with_base_url(base);
        let err = client.query_review_count(GOOD_TOKEN).await.unwrap_err();
        assert_eq!(err, QueryError::Upstream(500));
    }

    #[tokio::test]
    async fn test_body_without_data_is_malformed() {
        let app = Router::new().route(
            "/assignments",
            get(|| async { axum::Json(json!({"error": "weird shape"})) }),
        );
        let base = spawn_server(app).await;

        let client = WaniKaniClient::with_base_url(base);
        let err = client.query_review_count(GOOD_TOKEN).await.unwrap_err();
        assert_eq!(err, QueryError::MalformedResponse);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport() {
        let client = WaniKaniClient::with_base_url("http://127.0.0.1:1");
        let err = client.query_review_count(GOOD_TOKEN).await.unwrap_err();
        assert!(matches!(err, QueryError::Transport(_)), "got {err:?}");
    }
}
