use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use beacon_board::config::FeedSource;
use beacon_board::feed::spawn_provider;
use beacon_board::state::{Delta, ProviderCommand};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn collect_loaded(rx: &mpsc::Receiver<Delta>, count: usize) -> Vec<(u64, bool)> {
    let mut loaded = Vec::new();
    while loaded.len() < count {
        match rx
            .recv_timeout(Duration::from_secs(5))
            .expect("provider should answer every command")
        {
            Delta::FeedLoaded { seq, outcome } => loaded.push((seq, outcome.is_ok())),
            Delta::Log(_) => {}
        }
    }
    loaded.sort_unstable();
    loaded
}

#[test]
fn overlapping_commands_each_resolve_once() {
    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(
        FeedSource::File(fixture_path("predictions_envelope.json")),
        Duration::from_secs(1),
        tx,
        cmd_rx,
    );

    cmd_tx.send(ProviderCommand::FetchFeed { seq: 1 }).unwrap();
    cmd_tx.send(ProviderCommand::FetchFeed { seq: 2 }).unwrap();

    assert_eq!(collect_loaded(&rx, 2), vec![(1, true), (2, true)]);
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn failed_fetch_reports_its_seq() {
    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(
        FeedSource::File(fixture_path("missing_feed.json")),
        Duration::from_secs(1),
        tx,
        cmd_rx,
    );

    cmd_tx.send(ProviderCommand::FetchFeed { seq: 7 }).unwrap();
    assert_eq!(collect_loaded(&rx, 1), vec![(7, false)]);
}
