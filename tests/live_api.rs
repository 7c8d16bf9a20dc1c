//! Live WaniKani API smoke tests.
//!
//! These hit the real API and need a personal access token:
//!
//! Run with: WANIKANI_API_TOKEN=... cargo test --features integ_test --test live_api

#[cfg(feature = "integ_test")]
mod tests {
    use wanibot::wanikani::{QueryError, ReviewQuery, WaniKaniClient};

    #[tokio::test]
    async fn test_query_with_live_token() {
        let Ok(token) = std::env::var("WANIKANI_API_TOKEN") else {
            eprintln!("Skipping test: WANIKANI_API_TOKEN not set");
            return;
        };

        let client = WaniKaniClient::new();
        match client.query_review_count(&token).await {
            Ok(count) => println!("{count} review(s) due this hour"),
            Err(e) => panic!("live query failed: {e}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_token_never_reaches_the_api() {
        let client = WaniKaniClient::new();
        let err = client.query_review_count("not-a-token").await.unwrap_err();
        assert_eq!(err, QueryError::InvalidCredential);
    }
}
