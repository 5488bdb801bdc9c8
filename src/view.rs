//! Pure view descriptions for the filter bar and the card grid.
//!
//! Everything here maps a [`Board`] to plain structs holding display text.
//! The terminal painter in `main.rs` lays these out; it never interprets the
//! text, so feed content cannot inject markup or control sequences into the
//! layout.

use std::ops::Range;
use std::time::Duration;

use crate::feed_model::PredictionRecord;
use crate::state::{
    Board, EMPTY_MESSAGE, FAILURE_MESSAGE, GridStatus, LOADING_MESSAGE, LeagueFilter,
};

pub const REVEAL_STEP: Duration = Duration::from_millis(100);
/// Columns between two chips in the filter bar.
pub const CHIP_GAP: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChip {
    pub label: String,
    pub filter: LeagueFilter,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub league: String,
    pub identifier: String,
    pub home: String,
    pub away: String,
    pub gauge_percent: u8,
    pub stats: [StatField; 4],
    pub main_line: String,
    pub h2h: Option<String>,
    pub reveal_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridView {
    Loading(&'static str),
    Failed(&'static str),
    Empty(&'static str),
    Cards(Vec<CardView>),
}

impl GridView {
    pub fn card_count(&self) -> usize {
        match self {
            GridView::Cards(cards) => cards.len(),
            _ => 0,
        }
    }
}

pub fn filter_chips(board: &Board) -> Vec<FilterChip> {
    board
        .leagues()
        .into_iter()
        .map(|filter| FilterChip {
            label: clean(filter.label()),
            active: filter == *board.filter(),
            filter,
        })
        .collect()
}

/// Chip text as painted: the label padded by one space on each side.
pub fn chip_text(chip: &FilterChip) -> String {
    format!(" {} ", chip.label)
}

/// Column span of each chip when painted left to right from column 0.
pub fn chip_spans(chips: &[FilterChip]) -> Vec<(Range<u16>, LeagueFilter)> {
    let mut x: u16 = 0;
    let mut spans = Vec::with_capacity(chips.len());
    for chip in chips {
        let width = chip_text(chip).chars().count() as u16;
        let end = x.saturating_add(width);
        spans.push((x..end, chip.filter.clone()));
        x = end.saturating_add(CHIP_GAP);
    }
    spans
}

/// Filter under `column`, relative to the left edge of the filter bar.
pub fn chip_at(chips: &[FilterChip], column: u16) -> Option<LeagueFilter> {
    chip_spans(chips)
        .into_iter()
        .find(|(span, _)| span.contains(&column))
        .map(|(_, filter)| filter)
}

pub fn grid_view(board: &Board) -> GridView {
    match board.status() {
        GridStatus::Loading => GridView::Loading(LOADING_MESSAGE),
        GridStatus::Failed => GridView::Failed(FAILURE_MESSAGE),
        GridStatus::Ready => {
            let visible = board.visible();
            if visible.is_empty() {
                return GridView::Empty(EMPTY_MESSAGE);
            }
            GridView::Cards(
                visible
                    .into_iter()
                    .enumerate()
                    .map(|(idx, record)| card_view(idx, record))
                    .collect(),
            )
        }
    }
}

pub fn card_view(index: usize, record: &PredictionRecord) -> CardView {
    CardView {
        league: clean(&record.league),
        identifier: clean(record.identifier()),
        home: clean(&record.home),
        away: clean(&record.away),
        gauge_percent: record.confidence(),
        stats: [
            StatField {
                label: "Win/Draw",
                value: clean(&record.dc),
            },
            StatField {
                label: "Goal Forecast",
                value: clean(&record.ou),
            },
            StatField {
                label: "HT Result",
                value: clean(&record.ht),
            },
            StatField {
                label: "Star Power",
                value: clean(&record.stars),
            },
        ],
        main_line: clean(&format!("{} ({})", record.main, record.conf)),
        h2h: record
            .h2h
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(clean),
        reveal_delay: REVEAL_STEP * index as u32,
    }
}

/// Feed text with control characters blanked out.
pub fn clean(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
