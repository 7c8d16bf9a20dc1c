//! One-shot WaniKani query for operational testing, bypassing chat transport.
//!
//! Usage: cargo run --bin wanibot-query <api-token>

use wanibot::wanikani::{ReviewQuery, WaniKaniClient};

#[tokio::main]
async fn main() {
    let Some(token) = std::env::args().nth(1) else {
        eprintln!("Usage: wanibot-query <api-token>");
        std::process::exit(2);
    };

    let client = WaniKaniClient::new();
    match client.query_review_count(&token).await {
        Ok(count) => println!("New reviews in this hour: {count}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
