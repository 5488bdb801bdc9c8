use beacon_board::feed_model::{FeedEnvelope, PredictionRecord};
use beacon_board::state::{AppState, Board, LeagueFilter, Snapshot};
use beacon_board::view::{GridView, filter_chips, grid_view};

fn record(league: &str, home: &str) -> PredictionRecord {
    PredictionRecord {
        league: league.to_string(),
        home: home.to_string(),
        away: "Away".to_string(),
        ..PredictionRecord::default()
    }
}

fn board(leagues: &[&str]) -> Board {
    let predictions = leagues
        .iter()
        .enumerate()
        .map(|(i, league)| record(league, &format!("h{i}")))
        .collect();
    let feed = FeedEnvelope {
        last_updated: None,
        predictions,
    };
    Board::new().with_snapshot(Snapshot::from_feed(feed, chrono::Local::now()))
}

fn league(name: &str) -> LeagueFilter {
    LeagueFilter::League(name.to_string())
}

#[test]
fn distinct_leagues_keep_first_seen_order() {
    let board = board(&["A", "B", "A", "C"]);
    let labels: Vec<String> = filter_chips(&board).into_iter().map(|c| c.label).collect();
    assert_eq!(labels, vec!["All", "A", "B", "C"]);
}

#[test]
fn all_returns_full_snapshot() {
    let board = board(&["A", "B", "A", "C"]);
    let homes: Vec<&str> = board.visible().iter().map(|r| r.home.as_str()).collect();
    assert_eq!(homes, vec!["h0", "h1", "h2", "h3"]);
}

#[test]
fn league_filter_keeps_order_and_is_idempotent() {
    let base = board(&["A", "B", "A", "C", "A"]);
    let once = base.with_filter(league("A"));
    let twice = once.with_filter(league("A"));

    let homes = |b: &Board| -> Vec<String> { b.visible().iter().map(|r| r.home.clone()).collect() };
    assert_eq!(homes(&once), vec!["h0", "h2", "h4"]);
    assert_eq!(homes(&once), homes(&twice));
    assert!(once.visible().iter().all(|r| r.league == "A"));
}

#[test]
fn one_card_per_visible_record() {
    let board = board(&["A", "B", "A"]).with_filter(league("A"));
    let GridView::Cards(cards) = grid_view(&board) else {
        panic!("expected cards");
    };
    let homes: Vec<&str> = cards.iter().map(|c| c.home.as_str()).collect();
    assert_eq!(homes, vec!["h0", "h2"]);
}

#[test]
fn transitions_leave_original_board_untouched() {
    let base = board(&["A", "B"]);
    let filtered = base.with_filter(league("B"));
    let failed = filtered.with_failure();

    assert_eq!(base.filter(), &LeagueFilter::All);
    assert_eq!(base.visible().len(), 2);
    assert_eq!(filtered.visible().len(), 1);
    assert_eq!(failed.records().len(), 2);
    assert!(matches!(grid_view(&filtered), GridView::Cards(_)));
    assert!(matches!(grid_view(&failed), GridView::Failed(_)));
}

#[test]
fn unknown_league_shows_empty_state() {
    let board = board(&["A"]).with_filter(league("Z"));
    assert!(matches!(grid_view(&board), GridView::Empty(_)));
    assert!(filter_chips(&board).iter().all(|c| !c.active));
}

#[test]
fn cycling_wraps_through_chips() {
    let mut state = AppState::new();
    state.board = board(&["A", "B"]);

    state.cycle_filter_next();
    assert_eq!(state.board.filter(), &league("A"));
    state.cycle_filter_next();
    state.cycle_filter_next();
    assert_eq!(state.board.filter(), &LeagueFilter::All);
    state.cycle_filter_prev();
    assert_eq!(state.board.filter(), &league("B"));

    state.select_filter_index(1);
    assert_eq!(state.board.filter(), &league("A"));
    state.select_filter_index(9);
    assert_eq!(state.board.filter(), &league("A"));
}

#[test]
fn filter_change_resets_scroll() {
    let mut state = AppState::new();
    state.board = board(&["A", "B"]);
    state.scroll_down(4);
    state.scroll_down(4);
    assert_eq!(state.scroll, 2);
    state.select_filter(league("B"));
    assert_eq!(state.scroll, 0);
}
