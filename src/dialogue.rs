//! Command parsing and replies for incoming chat messages.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::info;

use crate::registry::SubscriberRegistry;
use crate::wanikani::ReviewQuery;

const HELP_REPLY: &str = "Try one of the following commands: query, subscribe, cancel";
const NON_TEXT_REPLY: &str = "Sorry, I can only process simple text messages.";
const QUERY_USAGE: &str = "Usage: query <api-token>";
const SUBSCRIBE_USAGE: &str = "Usage: subscribe <api-token>";

static QUERY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^query ([a-zA-Z0-9\-]+)").expect("query command regex"));
static SUBSCRIBE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^subscribe ([a-zA-Z0-9\-]+)").expect("subscribe command regex"));

/// One parsed line of user input. `Query` and `Subscribe` carry `None` when
/// the keyword was given without a usable token argument, so the interpreter
/// can answer with that command's usage line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Query(Option<String>),
    Subscribe(Option<String>),
    Cancel,
    Help,
}

/// Match the leading word case-sensitively; capture a token argument of
/// `[a-zA-Z0-9-]` characters after the keyword and one space. Anything
/// unmatched, including empty text, is `Help`.
pub fn parse_command(text: &str) -> Command {
    let keyword = text.split(' ').next().unwrap_or("");
    match keyword {
        "query" => Command::Query(capture_token(&QUERY_RE, text)),
        "subscribe" => Command::Subscribe(capture_token(&SUBSCRIBE_RE, text)),
        "cancel" => Command::Cancel,
        _ => Command::Help,
    }
}

fn capture_token(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|caps| caps[1].to_string())
}

/// Turns incoming messages into reply strings. Never fails outward: every
/// error path becomes a human-readable reply.
pub struct Interpreter<Q> {
    query: Arc<Q>,
    registry: Arc<SubscriberRegistry>,
}

impl<Q: ReviewQuery> Interpreter<Q> {
    pub fn new(query: Arc<Q>, registry: Arc<SubscriberRegistry>) -> Self {
        Self { query, registry }
    }

    /// `text` is `None` for messages without a text payload (stickers,
    /// attachments); those get a fixed reply before any parsing.
    pub async fn interpret(&self, sender_id: &str, text: Option<&str>) -> String {
        let Some(text) = text else {
            return NON_TEXT_REPLY.to_string();
        };

        match parse_command(text) {
            Command::Query(Some(token)) => match self.query.query_review_count(&token).await {
                Ok(count) => format!("New reviews in this hour: {count}"),
                Err(e) => e.to_string(),
            },
            Command::Query(None) => QUERY_USAGE.to_string(),
            Command::Subscribe(Some(token)) => {
                // One round trip up front so broken tokens never get stored.
                match self.query.query_review_count(&token).await {
                    Ok(_) => {
                        self.registry.put(sender_id, &token);
                        info!("Subscribed {sender_id}");
                        "Subscribed successfully!".to_string()
                    }
                    Err(e) => e.to_string(),
                }
            }
            Command::Subscribe(None) => SUBSCRIBE_USAGE.to_string(),
            Command::Cancel => {
                if self.registry.remove(sender_id) {
                    info!("Cancelled subscription for {sender_id}");
                    "Subscription cancelled!".to_string()
                } else {
                    "Not subscribed".to_string()
                }
            }
            Command::Help => HELP_REPLY.to_string(),
        }
    }
}
