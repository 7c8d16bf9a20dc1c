//! Hourly notification scheduler.
//!
//! A free-running timer task: it first sleeps until just past the next hour
//! boundary, then runs a notify-all cycle every hour at a fixed period.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::messenger::MessageSink;
use crate::registry::SubscriberRegistry;
use crate::wanikani::ReviewQuery;

const CYCLE_MS: u64 = 3_600_000;
const GRACE_MS: u64 = 1_000;

/// Delay from `now_ms` (unix millis) until the first cycle: the remainder of
/// the current hour plus a one-second grace offset, so cycles land at :00:01.
/// Later cycles repeat at a fixed period and are not re-aligned; timer drift
/// over long uptimes is accepted.
pub fn alignment_delay(now_ms: i64) -> Duration {
    let until_boundary = CYCLE_MS - now_ms.rem_euclid(CYCLE_MS as i64) as u64;
    Duration::from_millis(until_boundary + GRACE_MS)
}

pub struct Scheduler<Q, S> {
    registry: Arc<SubscriberRegistry>,
    query: Arc<Q>,
    sink: Arc<S>,
}

impl<Q, S> Scheduler<Q, S>
where
    Q: ReviewQuery + Send + Sync + 'static,
    S: MessageSink + Send + Sync + 'static,
{
    pub fn new(registry: Arc<SubscriberRegistry>, query: Arc<Q>, sink: Arc<S>) -> Self {
        Self { registry, query, sink }
    }

    /// One pass over all subscribers, from a snapshot taken at entry.
    /// Subscribers added or removed mid-cycle are picked up next cycle.
    /// Every subscriber gets a message: the review count on success, the
    /// error text otherwise, so a broken subscription stays visible to its
    /// owner until fixed or cancelled.
    pub async fn notify_all(&self) {
        let entries = self.registry.entries();
        info!("Notification cycle: {} subscriber(s)", entries.len());

        for (subscriber_id, credential) in entries {
            let text = match self.query.query_review_count(&credential).await {
                Ok(count) => format!("New reviews in this hour: {count}"),
                Err(e) => {
                    warn!("Query failed for {subscriber_id}: {e}");
                    e.to_string()
                }
            };
            // Send failures are already logged by the sink; the cycle moves on.
            let _ = self.sink.send_text(&subscriber_id, &text).await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let delay = alignment_delay(Utc::now().timestamp_millis());
            info!("First notification cycle in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;

            let mut ticker = tokio::time::interval(Duration::from_millis(CYCLE_MS));
            loop {
                ticker.tick().await;
                self.notify_all().await;
            }
        })
    }
}
