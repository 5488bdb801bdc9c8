use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local};

use crate::feed_model::{FeedEnvelope, PredictionRecord};

pub const LOADING_MESSAGE: &str = "Scanning for beacons...";
pub const EMPTY_MESSAGE: &str = "No active beacons detected for today.";
pub const FAILURE_MESSAGE: &str = "Failed to sync with Beacon backend.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LeagueFilter {
    #[default]
    All,
    League(String),
}

impl LeagueFilter {
    pub fn label(&self) -> &str {
        match self {
            LeagueFilter::All => "All",
            LeagueFilter::League(name) => name,
        }
    }

    pub fn accepts(&self, record: &PredictionRecord) -> bool {
        match self {
            LeagueFilter::All => true,
            LeagueFilter::League(name) => record.league == *name,
        }
    }
}

/// The fetched feed, read-only for as long as it is held.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub last_updated: Option<String>,
    pub synced_at: DateTime<Local>,
    pub records: Vec<PredictionRecord>,
}

impl Snapshot {
    pub fn from_feed(feed: FeedEnvelope, synced_at: DateTime<Local>) -> Self {
        Self {
            last_updated: feed.last_updated,
            synced_at,
            records: feed.predictions,
        }
    }

    /// `last_updated` from the envelope, else the local time of the sync.
    pub fn last_sync_label(&self) -> String {
        match &self.last_updated {
            Some(stamp) => stamp.clone(),
            None => self.synced_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridStatus {
    Loading,
    Ready,
    Failed,
}

/// Snapshot plus filter. Transitions return a new board and never touch the
/// receiver; the records are shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Board {
    snapshot: Option<Arc<Snapshot>>,
    filter: LeagueFilter,
    status: GridStatus,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            filter: LeagueFilter::All,
            status: GridStatus::Loading,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_deref()
    }

    pub fn filter(&self) -> &LeagueFilter {
        &self.filter
    }

    pub fn status(&self) -> &GridStatus {
        &self.status
    }

    pub fn records(&self) -> &[PredictionRecord] {
        self.snapshot
            .as_deref()
            .map(|s| s.records.as_slice())
            .unwrap_or(&[])
    }

    pub fn with_snapshot(&self, snapshot: Snapshot) -> Board {
        Board {
            snapshot: Some(Arc::new(snapshot)),
            filter: self.filter.clone(),
            status: GridStatus::Ready,
        }
    }

    /// Keeps whatever snapshot was held; only the grid switches to the
    /// failure message.
    pub fn with_failure(&self) -> Board {
        Board {
            snapshot: self.snapshot.clone(),
            filter: self.filter.clone(),
            status: GridStatus::Failed,
        }
    }

    /// Re-renders from held data, which also replaces a failure message with
    /// the filtered grid. Without a snapshot the loading or failure message
    /// stays up and only the filter changes.
    pub fn with_filter(&self, filter: LeagueFilter) -> Board {
        let status = if self.snapshot.is_some() {
            GridStatus::Ready
        } else {
            self.status.clone()
        };
        Board {
            snapshot: self.snapshot.clone(),
            filter,
            status,
        }
    }

    /// `All` followed by each distinct league in first-seen order.
    pub fn leagues(&self) -> Vec<LeagueFilter> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = vec![LeagueFilter::All];
        for record in self.records() {
            if seen.insert(record.league.as_str()) {
                out.push(LeagueFilter::League(record.league.clone()));
            }
        }
        out
    }

    pub fn visible(&self) -> Vec<&PredictionRecord> {
        self.records()
            .iter()
            .filter(|r| self.filter.accepts(r))
            .collect()
    }

    pub fn filter_index(&self) -> Option<usize> {
        self.leagues().iter().position(|l| *l == self.filter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    FetchFeed { seq: u64 },
}

#[derive(Debug, Clone)]
pub enum Delta {
    FeedLoaded {
        seq: u64,
        outcome: Result<FeedEnvelope, String>,
    },
    Log(String),
}

pub struct AppState {
    pub board: Board,
    pub latest_request: u64,
    pub rendered_at: Instant,
    pub scroll: u16,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            latest_request: 0,
            rendered_at: Instant::now(),
            scroll: 0,
            logs: VecDeque::new(),
            help_overlay: false,
        }
    }

    /// Issues the next request number; only the response carrying the most
    /// recent number is applied.
    pub fn begin_fetch(&mut self) -> u64 {
        self.latest_request += 1;
        self.latest_request
    }

    pub fn select_filter(&mut self, filter: LeagueFilter) {
        self.board = self.board.with_filter(filter);
        self.scroll = 0;
        self.rendered_at = Instant::now();
    }

    pub fn cycle_filter_next(&mut self) {
        let leagues = self.board.leagues();
        let next = match self.board.filter_index() {
            Some(idx) => (idx + 1) % leagues.len(),
            None => 0,
        };
        self.select_filter(leagues[next].clone());
    }

    pub fn cycle_filter_prev(&mut self) {
        let leagues = self.board.leagues();
        let prev = match self.board.filter_index() {
            Some(0) | None => leagues.len() - 1,
            Some(idx) => idx - 1,
        };
        self.select_filter(leagues[prev].clone());
    }

    /// Selects the chip at `idx`; out-of-range indices are ignored.
    pub fn select_filter_index(&mut self, idx: usize) {
        if let Some(filter) = self.board.leagues().get(idx).cloned() {
            self.select_filter(filter);
        }
    }

    pub fn scroll_down(&mut self, max_scroll: u16) {
        self.scroll = self.scroll.saturating_add(1).min(max_scroll);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::FeedLoaded { seq, outcome } => {
            if seq != state.latest_request {
                tracing::debug!(
                    seq,
                    latest = state.latest_request,
                    "discarding stale feed response"
                );
                state.push_log(format!(
                    "[INFO] Discarded stale feed response #{seq} (latest #{})",
                    state.latest_request
                ));
                return;
            }
            match outcome {
                Ok(feed) => {
                    let count = feed.predictions.len();
                    state.board = state
                        .board
                        .with_snapshot(Snapshot::from_feed(feed, Local::now()));
                    state.scroll = 0;
                    state.rendered_at = Instant::now();
                    tracing::info!(seq, count, "feed applied");
                    state.push_log(format!("[INFO] Synced {count} beacons (#{seq})"));
                }
                Err(err) => {
                    state.board = state.board.with_failure();
                    state.rendered_at = Instant::now();
                    tracing::warn!(seq, error = %err, "feed fetch failed");
                    state.push_log(format!("[WARN] Beacon fetch error: {err}"));
                }
            }
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
