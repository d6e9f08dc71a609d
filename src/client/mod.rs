//! Inbox-watching client
//!
//! Subscribes its inbox with a notifying server, grants the server access to
//! it, and watches it with a timer loop backed up by realtime pings.

mod acl;
mod listener;
mod poller;
mod subscribe;

use std::sync::Arc;

use tokio::task::JoinHandle;

pub use acl::grant_inbox_access;
pub use listener::{http_to_ws_scheme, listen, listen_once, realtime_url, SessionEnd};
pub use poller::{poll_loop, InboxPoller};
pub use subscribe::{subscribe, Subscription};

use crate::error::Result;
use crate::pod::PodClient;
use crate::types::ClientConfig;

/// A running watch: timer loop plus realtime listener
pub struct InboxWatch {
    poller: Arc<InboxPoller>,
    timer: JoinHandle<()>,
    listener: JoinHandle<SessionEnd>,
}

impl InboxWatch {
    /// Read the inbox once, then keep it watched in the background
    pub async fn start(pod: Arc<dyn PodClient>, config: &ClientConfig) -> Result<Self> {
        let poller = Arc::new(InboxPoller::new(pod, config.inbox_url.clone()));
        poller.refresh().await?;

        tracing::info!("Polling every {}ms", config.poll_interval.as_millis());
        let timer = tokio::spawn(poll_loop(Arc::clone(&poller), config.poll_interval));
        let listener = tokio::spawn(listen(
            realtime_url(&config.server_url),
            Arc::clone(&poller),
            config.reconnect,
        ));

        Ok(Self {
            poller,
            timer,
            listener,
        })
    }

    pub fn poller(&self) -> &Arc<InboxPoller> {
        &self.poller
    }

    /// True once the listener has given up (manual reconnect policy)
    pub fn realtime_finished(&self) -> bool {
        self.listener.is_finished()
    }

    /// Stop both loops
    pub fn stop(self) {
        self.timer.abort();
        self.listener.abort();
    }
}
