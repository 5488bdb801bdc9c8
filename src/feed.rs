use std::fs;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::config::FeedSource;
use crate::feed_model::{FeedEnvelope, parse_feed};
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::state::{Delta, ProviderCommand};

/// Serves fetch commands until the command channel closes. Each fetch runs on
/// its own thread, so a slow response never holds back the next tick.
pub fn spawn_provider(
    source: FeedSource,
    http_timeout: Duration,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::FetchFeed { seq } => {
                    let tx = tx.clone();
                    let source = source.clone();
                    thread::spawn(move || {
                        tracing::debug!(seq, source = %source.describe(), "fetching feed");
                        let outcome = fetch_feed(&source, http_timeout).map_err(|err| {
                            let msg = format!("{err:#}");
                            tracing::warn!(seq, error = %msg, "feed fetch failed");
                            msg
                        });
                        let _ = tx.send(Delta::FeedLoaded { seq, outcome });
                    });
                }
            }
        }
        tracing::debug!("provider command channel closed");
    });
}

/// Fixed-interval poll timer: due at once, then every `interval` after the
/// previous deadline. Manual refreshes do not move it.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    interval: Duration,
    next_poll: Option<Instant>,
}

impl PollSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_poll: None,
        }
    }

    /// Returns true when a poll is due at `now` and books the next deadline.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        match self.next_poll {
            Some(deadline) if now < deadline => false,
            Some(deadline) => {
                let next = deadline + self.interval;
                // After a long stall, skip the missed ticks instead of bursting.
                self.next_poll = Some(if next <= now {
                    now + self.interval
                } else {
                    next
                });
                true
            }
            None => {
                self.next_poll = Some(now + self.interval);
                true
            }
        }
    }
}

pub fn fetch_feed(source: &FeedSource, http_timeout: Duration) -> Result<FeedEnvelope> {
    let body = match source {
        FeedSource::Url(url) => {
            let client = http_client(http_timeout)?;
            fetch_json_cached(client, url).with_context(|| format!("fetch {url}"))?
        }
        FeedSource::File(path) => fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?,
    };
    parse_feed(&body).with_context(|| format!("parse feed from {}", source.describe()))
}
