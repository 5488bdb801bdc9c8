use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::{Mutex, mpsc};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::block::{Position, Title};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};
use tracing_subscriber::EnvFilter;

use beacon_board::config::BoardConfig;
use beacon_board::feed::{self, PollSchedule};
use beacon_board::state::{self, AppState, LeagueFilter, apply_delta};
use beacon_board::view::{self, CHIP_GAP, CardView, GridView};

const CARD_MIN_WIDTH: u16 = 36;
const CARD_HEIGHT: u16 = 9;
const STAT_LABEL_WIDTH: usize = 14;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<state::ProviderCommand>>,
    source_label: String,
    schedule: PollSchedule,
    filter_area: Rect,
    max_scroll: u16,
}

impl App {
    fn new(config: &BoardConfig, cmd_tx: Option<mpsc::Sender<state::ProviderCommand>>) -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
            cmd_tx,
            source_label: config.source.describe(),
            schedule: PollSchedule::new(config.poll_interval),
            filter_area: Rect::default(),
            max_scroll: 0,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.state.help_overlay = false,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => self.state.cycle_filter_next(),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::BackTab => {
                self.state.cycle_filter_prev()
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                self.state.select_filter(LeagueFilter::All)
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let idx = c.to_digit(10).unwrap_or(0) as usize;
                self.state.select_filter_index(idx);
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.scroll_down(self.max_scroll),
            KeyCode::Char('k') | KeyCode::Up => self.state.scroll_up(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.request_feed(true),
            _ => {}
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let bar = self.filter_area;
                if mouse.row != bar.y || mouse.column < bar.x || mouse.column >= bar.x + bar.width
                {
                    return;
                }
                let chips = view::filter_chips(&self.state.board);
                if let Some(filter) = view::chip_at(&chips, mouse.column - bar.x) {
                    self.state.select_filter(filter);
                }
            }
            MouseEventKind::ScrollDown => self.state.scroll_down(self.max_scroll),
            MouseEventKind::ScrollUp => self.state.scroll_up(),
            _ => {}
        }
    }

    /// Issues a fetch whether or not an earlier one is still outstanding;
    /// `apply_delta` drops whatever resolves out of date.
    fn request_feed(&mut self, announce: bool) {
        let Some(tx) = &self.cmd_tx else {
            if announce {
                self.state.push_log("[INFO] Feed fetch unavailable");
            }
            return;
        };
        let seq = self.state.begin_fetch();
        if tx.send(state::ProviderCommand::FetchFeed { seq }).is_err() {
            tracing::warn!(seq, "provider channel closed");
            self.state.push_log("[WARN] Feed request failed");
        } else if announce {
            self.state.push_log(format!("[INFO] Feed request #{seq} sent"));
        }
    }

    fn maybe_refresh_feed(&mut self) {
        if self.schedule.poll_due(Instant::now()) {
            self.request_feed(false);
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = BoardConfig::from_env();
    init_tracing(config.log_file.as_deref());
    tracing::info!(
        source = %config.source.describe(),
        poll_secs = config.poll_interval.as_secs(),
        "starting beacon board"
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    feed::spawn_provider(config.source.clone(), config.http_timeout, tx, cmd_rx);

    let mut app = App::new(&config, Some(cmd_tx));
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "ui loop failed");
        eprintln!("error: {err}");
    }
    Ok(())
}

/// Diagnostics go to `BEACON_LOG_FILE` when set; the terminal belongs to the UI.
fn init_tracing(log_file: Option<&Path>) {
    let Some(path) = log_file else {
        return;
    };
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("warning: cannot open log file {}: {err}", path.display());
            return;
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.maybe_refresh_feed();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    app.filter_area = chunks[1];
    render_filter_bar(frame, chunks[1], &app.state);

    app.max_scroll = render_grid(frame, chunks[2], &app.state);

    let footer = Paragraph::new(footer_text(&app.state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let last_sync = app
        .state
        .board
        .snapshot()
        .map(|s| view::clean(&s.last_sync_label()))
        .unwrap_or_else(|| "--".to_string());
    let line1 = format!(
        "  (•)  BEACON BOARD | League: {} | Last sync: {}",
        view::clean(app.state.board.filter().label()),
        last_sync
    );
    let line2 = format!(" ((•))  Feed: {}", app.source_label);
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    let console = state
        .logs
        .back()
        .cloned()
        .unwrap_or_else(|| "No alerts yet".to_string());
    let year = chrono::Local::now().format("%Y");
    format!(
        "{console}\n←/→ League | 0-9 Pick | a All | j/k Scroll | r Refresh | ? Help | q Quit   © {year} Beacon"
    )
}

fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let chips = view::filter_chips(&state.board);
    let gap = " ".repeat(CHIP_GAP as usize);
    let mut spans = Vec::with_capacity(chips.len() * 2);
    for chip in &chips {
        let style = if chip.active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray).bg(Color::DarkGray)
        };
        spans.push(Span::styled(view::chip_text(chip), style));
        spans.push(Span::raw(gap.clone()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Paints the grid and returns the furthest the card rows can scroll.
fn render_grid(frame: &mut Frame, area: Rect, state: &AppState) -> u16 {
    let cards = match view::grid_view(&state.board) {
        GridView::Loading(msg) | GridView::Empty(msg) => {
            render_message(frame, area, msg, Style::default().fg(Color::DarkGray));
            return 0;
        }
        GridView::Failed(msg) => {
            render_message(frame, area, msg, Style::default().fg(Color::Red));
            return 0;
        }
        GridView::Cards(cards) => cards,
    };

    if area.height < CARD_HEIGHT || area.width == 0 {
        render_message(
            frame,
            area,
            "Card grid needs more room",
            Style::default().fg(Color::DarkGray),
        );
        return 0;
    }

    let columns = (area.width / CARD_MIN_WIDTH).max(1);
    let card_width = area.width / columns;
    let visible_rows = area.height / CARD_HEIGHT;
    let total_rows = cards.len().div_ceil(columns as usize) as u16;
    let max_scroll = total_rows.saturating_sub(visible_rows);
    let scroll = state.scroll.min(max_scroll);
    let elapsed = state.rendered_at.elapsed();

    let first = scroll as usize * columns as usize;
    let last = ((scroll + visible_rows) as usize * columns as usize).min(cards.len());
    for (offset, card) in cards[first.min(last)..last].iter().enumerate() {
        let row = (offset / columns as usize) as u16;
        let col = (offset % columns as usize) as u16;
        let rect = Rect {
            x: area.x + col * card_width,
            y: area.y + row * CARD_HEIGHT,
            width: card_width,
            height: CARD_HEIGHT,
        };
        render_card(frame, rect, card, elapsed >= card.reveal_delay);
    }
    max_scroll
}

fn render_message(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let text_area = Rect {
        x: area.x,
        y: area.y + area.height / 2,
        width: area.width,
        height: area.height.min(1),
    };
    let paragraph = Paragraph::new(text)
        .style(style)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, text_area);
}

fn render_card(frame: &mut Frame, area: Rect, card: &CardView, revealed: bool) {
    if !revealed {
        let placeholder = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        frame.render_widget(placeholder, area);
        return;
    }

    let mut block = Block::default()
        .borders(Borders::ALL)
        .title(Title::from(card.league.as_str()))
        .title(Title::from(card.identifier.as_str()).alignment(Alignment::Right));
    if let Some(h2h) = card.h2h.as_deref() {
        block = block.title(
            Title::from(Span::styled(
                format!(" H2H: {h2h} "),
                Style::default().fg(Color::DarkGray),
            ))
            .position(Position::Bottom)
            .alignment(Alignment::Right),
        );
    }
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 7])
        .split(inner);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let teams = Line::from(vec![
        Span::styled(card.home.as_str(), bold),
        Span::styled(" VS ", Style::default().fg(Color::DarkGray)),
        Span::styled(card.away.as_str(), bold),
    ]);
    frame.render_widget(Paragraph::new(teams).alignment(Alignment::Center), rows[0]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(gauge_color(card.gauge_percent)))
        .percent(u16::from(card.gauge_percent))
        .label(format!("{}%", card.gauge_percent));
    frame.render_widget(gauge, rows[1]);

    let label_style = Style::default().fg(Color::DarkGray);
    for (i, stat) in card.stats.iter().enumerate() {
        let line = Line::from(vec![
            Span::styled(format!("{:<STAT_LABEL_WIDTH$}", stat.label), label_style),
            Span::raw(stat.value.as_str()),
        ]);
        frame.render_widget(Paragraph::new(line), rows[2 + i]);
    }

    let main = Span::styled(
        format!("» {}", card.main_line),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    );
    frame.render_widget(Paragraph::new(Line::from(main)), rows[6]);
}

fn gauge_color(percent: u8) -> Color {
    match percent {
        70.. => Color::Green,
        55..=69 => Color::Yellow,
        _ => Color::Red,
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Beacon Board - Help",
        "",
        "Leagues:",
        "  ←/→ or h/l   Previous/next league",
        "  0-9          Pick league by position",
        "  a            All leagues",
        "  click        Pick league chip",
        "",
        "Grid:",
        "  j/k or ↑/↓   Scroll cards",
        "  r            Refresh feed now",
        "",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
