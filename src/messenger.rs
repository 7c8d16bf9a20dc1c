//! Messenger Send API client.

use serde::Serialize;
use std::future::Future;
use tracing::warn;

const SEND_API_URL: &str = "https://graph.facebook.com/v19.0/me/messages";

/// Outbound message delivery. Callers treat sends as fire-and-forget; the
/// implementation logs failures before returning them.
pub trait MessageSink {
    fn send_text(
        &self,
        recipient_id: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), String>> + Send;
}

pub struct MessengerClient {
    access_token: String,
    http: reqwest::Client,
    api_url: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    recipient: Recipient<'a>,
    message: MessageBody<'a>,
}

#[derive(Serialize)]
struct Recipient<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    text: &'a str,
}

impl MessengerClient {
    pub fn new(access_token: String) -> Self {
        Self::with_api_url(access_token, SEND_API_URL)
    }

    pub fn with_api_url(access_token: String, api_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            access_token,
            http,
            api_url: api_url.into(),
        }
    }
}

impl MessageSink for MessengerClient {
    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<(), String> {
        let request = SendRequest {
            recipient: Recipient { id: recipient_id },
            message: MessageBody { text },
        };

        let response = self
            .http
            .post(&self.api_url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Failed to send message: {e}");
                warn!("{}", msg);
                msg
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let msg = format!("Send API error {status}: {body}");
            warn!("{}", msg);
            return Err(msg);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::post;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_send_posts_recipient_and_text() {
        let seen: Arc<Mutex<Option<(HashMap<String, String>, serde_json::Value)>>> =
            Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();

        let app = Router::new().route(
            "/send",
            post(
                move |Query(params): Query<HashMap<String, String>>,
                      axum::Json(body): axum::Json<serde_json::Value>| {
                    *seen_clone.lock().unwrap() = Some((params, body));
                    async { StatusCode::OK }
                },
            ),
        );
        let base = spawn_server(app).await;

        let client = MessengerClient::with_api_url("EAAGxyz".to_string(), format!("{base}/send"));
        client.send_text("user-42", "New reviews in this hour: 3").await.unwrap();

        let (params, body) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(params.get("access_token").map(String::as_str), Some("EAAGxyz"));
        assert_eq!(body["recipient"]["id"], "user-42");
        assert_eq!(body["message"]["text"], "New reviews in this hour: 3");
    }

    #[tokio::test]
    async fn test_send_surfaces_api_errors() {
        let app = Router::new().route("/send", post(|| async { StatusCode::BAD_REQUEST }));
        let base = spawn_server(app).await;

        let client = MessengerClient::with_api_url("EAAGxyz".to_string(), format!("{base}/send"));
        let err = client.send_text("user-42", "hello").await.unwrap_err();
        assert!(err.contains("400"), "got {err}");
    }
}
