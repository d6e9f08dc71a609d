//! Inbox polling

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::Result;
use crate::pod::PodClient;

/// Announces inbox entries the first time they are seen
///
/// The seen-set only grows: an entry that disappears and comes back is not
/// announced again.
pub struct InboxPoller {
    pod: Arc<dyn PodClient>,
    inbox_url: String,
    seen: Mutex<HashSet<String>>,
}

impl InboxPoller {
    pub fn new(pod: Arc<dyn PodClient>, inbox_url: impl Into<String>) -> Self {
        Self {
            pod,
            inbox_url: inbox_url.into(),
            seen: Mutex::new(HashSet::new()),
        }
    }

    pub fn inbox_url(&self) -> &str {
        &self.inbox_url
    }

    /// Number of entries announced so far
    pub fn seen_count(&self) -> usize {
        self.seen.lock().len()
    }

    /// Read the inbox and print entries not seen before, in ascending order
    ///
    /// Returns the entries printed by this call.
    pub async fn refresh(&self) -> Result<Vec<String>> {
        let mut listing = self.pod.fetch_container_listing(&self.inbox_url).await?;
        listing.sort();

        if listing.is_empty() {
            println!("(empty inbox)");
            return Ok(Vec::new());
        }

        // Check and insert under one lock so overlapping refreshes never
        // announce the same entry twice
        let fresh: Vec<String> = {
            let mut seen = self.seen.lock();
            listing
                .into_iter()
                .filter(|url| seen.insert(url.clone()))
                .collect()
        };

        for url in &fresh {
            println!("{}", url);
        }
        Ok(fresh)
    }
}

/// Refresh on a fixed period, forever
///
/// The first refresh happens one full period after the call; callers do
/// their initial read themselves. Errors are logged and the loop goes on.
pub async fn poll_loop(poller: Arc<InboxPoller>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = poller.refresh().await {
            tracing::warn!("Polling {} failed: {}", poller.inbox_url(), e);
        }
    }
}
