mod app;

use std::fs::File;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, Borders, Cell, Paragraph, Row, Sparkline as SparklineWidget, Table, TableState, Tabs, Wrap,
    },
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::{format_count, format_local, truncate, AppState, ConnectionStatus, Screen, SeriesFetched};
use oddsboard::chart::render::Emphasis;
use oddsboard::chart::scale::Margins;
use oddsboard::chart::{Sparkline, Viewport};
use oddsboard::types::{ContestStatus, Direction as LineDirection, MarketField, MovementBucket, Sentiment};
use oddsboard::view::{DetailTab, Expired};

/// Canvas resolution per terminal cell with the braille marker.
const DOTS_X: f64 = 2.0;
const DOTS_Y: f64 = 4.0;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let log_path = std::env::var("TUI_LOG_PATH").unwrap_or_else(|_| "tui.log".to_string());
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    // The terminal belongs to the UI, so logs go to a file.
    let log_file = File::create(&log_path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&log_level))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let (fetched_tx, mut fetched_rx) = mpsc::channel::<SeriesFetched>(16);
    let (expired_tx, mut expired_rx) = mpsc::channel::<Expired>(16);
    let mut app = AppState::new(base_url, fetched_tx, expired_tx);

    // Initial fetch before rendering
    app.refresh(&client).await;
    info!(base_url = %app.base_url, "[TUI] started");

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client, &mut fetched_rx, &mut expired_rx).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    fetched_rx: &mut mpsc::Receiver<SeriesFetched>,
    expired_rx: &mut mpsc::Receiver<Expired>,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(5);
    let frame_interval = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut table_state = TableState::default();

    loop {
        let size = terminal.size()?;
        let screen_area = Rect::new(0, 0, size.width, size.height);
        let chart_area = detail_chart_area(screen_area);
        if let Some(detail) = app.detail.as_mut() {
            detail.resize(chart_viewport(chart_area));
        }
        app.refresh_search(Instant::now());

        terminal.draw(|f| render(f, app, &mut table_state))?;
        app.hydrate();

        while let Ok(fetched) = fetched_rx.try_recv() {
            app.on_series_fetched(fetched);
        }
        while let Ok(expired) = expired_rx.try_recv() {
            app.on_expired(expired);
        }

        if event::poll(frame_interval)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                    if ctrl && key.code == KeyCode::Char('c') {
                        return Ok(());
                    }
                    if app.screen == Screen::Search {
                        handle_search_key(app, key.code, chart_area);
                    } else if !handle_key(app, client, key.code, chart_area).await {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) if app.screen == Screen::Detail => {
                    if let MouseEventKind::Moved = mouse.kind {
                        hover_mouse(app, chart_area, mouse.column, mouse.row);
                    }
                }
                _ => {}
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            last_tick = Instant::now();
        }
    }
}

/// Returns false to quit.
async fn handle_key(app: &mut AppState, client: &reqwest::Client, code: KeyCode, chart_area: Rect) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return false,
        KeyCode::Char('r') | KeyCode::Char('R') => {
            app.refresh(client).await;
            app.reload_detail();
        }
        KeyCode::Char('1') => app.screen = Screen::Scoreboard,
        KeyCode::Char('2') | KeyCode::Char('/') => app.screen = Screen::Search,
        KeyCode::Char('3') if app.detail.is_some() => app.screen = Screen::Detail,
        KeyCode::Char('4') => app.screen = Screen::Analysis,
        _ => match app.screen {
            Screen::Scoreboard => handle_scoreboard_key(app, code, chart_area),
            Screen::Detail => handle_detail_key(app, code),
            Screen::Search | Screen::Analysis => {}
        },
    }
    true
}

fn handle_scoreboard_key(app: &mut AppState, code: KeyCode, chart_area: Rect) {
    let rows: Vec<String> = app
        .scoreboard_rows()
        .into_iter()
        .map(|c| c.contest.id.clone())
        .collect();
    match code {
        KeyCode::Down | KeyCode::Char('j') => {
            let max = rows.len().saturating_sub(1);
            app.scoreboard_selected = (app.scoreboard_selected + 1).min(max);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.scoreboard_selected = app.scoreboard_selected.saturating_sub(1);
        }
        KeyCode::Char('s') => {
            app.scoreboard.next_sport();
            app.scoreboard_selected = 0;
        }
        KeyCode::Char('b') => app.scoreboard.cycle_bet_type(),
        KeyCode::Char('f') => {
            if let Some(id) = rows.get(app.scoreboard_selected) {
                app.scoreboard.toggle_favorite(id);
            }
        }
        KeyCode::Char('F') => {
            app.scoreboard.toggle_show_only_favorites();
            app.scoreboard_selected = 0;
        }
        KeyCode::Enter => {
            if let Some(id) = rows.get(app.scoreboard_selected) {
                app.open_detail(id, chart_viewport(chart_area));
            }
        }
        _ => {}
    }
}

fn handle_search_key(app: &mut AppState, code: KeyCode, chart_area: Rect) {
    let now = Instant::now();
    match code {
        KeyCode::Esc => app.screen = Screen::Scoreboard,
        KeyCode::Backspace => app.search.pop_char(now),
        KeyCode::Down => {
            let max = app.search.results().len().saturating_sub(1);
            app.search_selected = (app.search_selected + 1).min(max);
        }
        KeyCode::Up => app.search_selected = app.search_selected.saturating_sub(1),
        KeyCode::F(1) => {
            let next = cycle_option(&app.search.spec().league, &league_options(app));
            app.search.set_league(next);
        }
        KeyCode::F(2) => {
            let fields: Vec<MarketField> = MarketField::ALL.to_vec();
            let next = cycle_option(&app.search.spec().bet_type, &fields);
            app.search.set_bet_type(next);
        }
        KeyCode::F(3) => {
            let buckets = [MovementBucket::Low, MovementBucket::Medium, MovementBucket::High];
            let next = cycle_option(&app.search.spec().movement, &buckets);
            app.search.set_movement(next);
        }
        KeyCode::Enter => {
            if let Some(c) = app.search.results().get(app.search_selected) {
                let id = c.id.clone();
                app.open_detail(&id, chart_viewport(chart_area));
            }
        }
        KeyCode::Char(c) => app.search.push_char(c, now),
        _ => {}
    }
}

fn handle_detail_key(app: &mut AppState, code: KeyCode) {
    if code == KeyCode::Char('a') {
        app.toggle_alerts();
        return;
    }
    let Some(detail) = app.detail.as_mut() else {
        return;
    };
    match code {
        KeyCode::Esc => app.screen = Screen::Scoreboard,
        KeyCode::Tab | KeyCode::Char('t') => detail.next_tab(),
        KeyCode::Char('m') => {
            let i = MarketField::ALL.iter().position(|f| *f == detail.field()).unwrap_or(0);
            detail.select_field(MarketField::ALL[(i + 1) % MarketField::ALL.len()]);
        }
        KeyCode::Left | KeyCode::Char('h') => {
            detail.hover_step(-1);
        }
        KeyCode::Right | KeyCode::Char('l') => {
            detail.hover_step(1);
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            if detail.is_playing() {
                detail.stop();
            } else {
                detail.play(Instant::now());
            }
        }
        _ => {}
    }
}

fn hover_mouse(app: &mut AppState, chart_area: Rect, column: u16, row: u16) {
    let Some(detail) = app.detail.as_mut() else {
        return;
    };
    if !chart_area.contains(ratatui::layout::Position { x: column, y: row }) {
        detail.clear_hover();
        return;
    }
    let scene = detail.scene();
    let x = f64::from(column - chart_area.x) * DOTS_X + DOTS_X / 2.0 - scene.offset.0;
    let y = f64::from(row - chart_area.y) * DOTS_Y + DOTS_Y / 2.0 - scene.offset.1;
    detail.hover_at(x, y);
}

fn league_options(app: &AppState) -> Vec<String> {
    let mut leagues: Vec<String> = app.contests.iter().map(|c| c.contest.league.to_uppercase()).collect();
    leagues.sort();
    leagues.dedup();
    leagues
}

/// None -> first -> ... -> last -> None.
fn cycle_option<T: Clone + PartialEq>(current: &Option<T>, options: &[T]) -> Option<T> {
    match current {
        None => options.first().cloned(),
        Some(cur) => {
            let i = options.iter().position(|o| o == cur)?;
            options.get(i + 1).cloned()
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

fn split_screen(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// Detail body: title | chart | tabs. Side column holds the hover panel.
fn split_detail(body: Rect) -> (Rect, Rect, Rect, Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(32)])
        .split(body);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Percentage(55), Constraint::Min(6)])
        .split(cols[0]);
    (rows[0], rows[1], rows[2], cols[1])
}

/// Plot area inside the chart block, leaving room for y labels and x labels.
fn detail_chart_area(screen: Rect) -> Rect {
    let [_, body, _] = split_screen(screen);
    let (_, chart_block, _, _) = split_detail(body);
    let inner = Block::default().borders(Borders::ALL).inner(chart_block);
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(8), Constraint::Min(1)])
        .split(inner);
    let plot = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(parts[1]);
    plot[0]
}

fn chart_viewport(area: Rect) -> Viewport {
    Viewport::new(f64::from(area.width) * DOTS_X, f64::from(area.height) * DOTS_Y).with_margin(Margins {
        top: DOTS_Y,
        right: DOTS_X * 2.0,
        bottom: DOTS_Y,
        left: DOTS_X * 2.0,
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let [header, body, footer] = split_screen(f.area());

    render_header(f, app, header);
    match app.screen {
        Screen::Scoreboard => render_scoreboard(f, app, table_state, body),
        Screen::Search => render_search(f, app, body),
        Screen::Detail => render_detail(f, app, body),
        Screen::Analysis => render_analysis(f, app, body),
    }
    render_footer(f, app, footer);
}

fn block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn header_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

fn bucket_color(bucket: MovementBucket) -> Color {
    match bucket {
        MovementBucket::High => Color::Green,
        MovementBucket::Medium => Color::Yellow,
        MovementBucket::Low => Color::DarkGray,
    }
}

fn direction_glyph(direction: LineDirection) -> (&'static str, Color) {
    match direction {
        LineDirection::Up => ("▲", Color::Green),
        LineDirection::Down => ("▼", Color::Red),
        LineDirection::Flat => ("■", Color::DarkGray),
    }
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };
    let titles = [Screen::Scoreboard, Screen::Search, Screen::Detail, Screen::Analysis]
        .iter()
        .map(|s| Line::from(s.title()))
        .collect::<Vec<_>>();
    let selected = match app.screen {
        Screen::Scoreboard => 0,
        Screen::Search => 1,
        Screen::Detail => 2,
        Screen::Analysis => 3,
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(48)])
        .split(area);

    let tabs = Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(" Oddsboard ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
        )
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    let status = Paragraph::new(Line::from(vec![
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(format_count(app.contests.len(), "game"), Style::default().fg(Color::White)),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
    f.render_widget(status, chunks[1]);
}

fn render_scoreboard(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let bet_type = app.scoreboard.bet_type();
    let header = Row::new(
        ["★", "Matchup", "Status", bet_type.label(), "Move", "Start"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .height(1);

    let rows_data = app.scoreboard_rows();
    let rows: Vec<Row> = rows_data
        .iter()
        .map(|c| {
            let fav = if app.scoreboard.is_favorite(&c.contest.id) { "★" } else { " " };
            let status = match (c.contest.status, &c.contest.score) {
                (ContestStatus::Live, Some(s)) => format!("{}-{} {}", s.away, s.home, s.clock),
                (status, _) => status.to_string(),
            };
            let movement = c
                .markets
                .iter()
                .find(|m| m.field == bet_type)
                .map_or(c.movement, |m| m.bucket);
            let (glyph, glyph_color) = direction_glyph(
                c.markets.iter().find(|m| m.field == bet_type).map_or(c.direction, |m| m.direction),
            );
            Row::new(vec![
                Cell::from(fav).style(Style::default().fg(Color::Yellow)),
                Cell::from(truncate(&c.contest.matchup(), 26)),
                Cell::from(status).style(Style::default().fg(if c.contest.status == ContestStatus::Live {
                    Color::Green
                } else {
                    Color::DarkGray
                })),
                Cell::from(app.scoreboard.quote(c.latest.as_ref())).style(Style::default().fg(Color::White)),
                Cell::from(Line::from(vec![
                    Span::styled(glyph, Style::default().fg(glyph_color)),
                    Span::raw(" "),
                    Span::styled(movement.to_string(), Style::default().fg(bucket_color(movement))),
                ])),
                Cell::from(app.start_label(c.contest.start_time)).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let title = format!(
        "{} · {}{}",
        app.scoreboard.sport(),
        bet_type.label(),
        if app.scoreboard.show_only_favorites() { " · favorites" } else { "" }
    );
    let empty = rows.is_empty();
    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Min(16),
            Constraint::Length(14),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(13),
        ],
    )
    .header(header)
    .block(block(&title))
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    if empty {
        f.render_widget(
            Paragraph::new("No games found").style(Style::default().fg(Color::DarkGray)).block(block(&title)),
            halves[0],
        );
    } else {
        state.select(Some(app.scoreboard_selected.min(rows_data.len() - 1)));
        f.render_stateful_widget(table, halves[0], state);
    }

    render_alerts(f, app, halves[1]);
}

fn render_alerts(f: &mut Frame, app: &AppState, area: Rect) {
    let lines: Vec<Line> = if app.alerts.is_empty() {
        vec![Line::styled("No alerts. Press [a] on a game to enable.", Style::default().fg(Color::DarkGray))]
    } else {
        app.alerts
            .iter()
            .map(|a| {
                let who = app
                    .summary(&a.contest_id)
                    .map_or(a.contest_id.clone(), |c| c.contest.matchup());
                Line::from(vec![
                    Span::styled(format!("{:<13}", a.kind.to_string()), Style::default().fg(Color::Magenta)),
                    Span::raw(format!("{} · {}", truncate(&who, 18), a.message)),
                ])
            })
            .collect()
    };
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }).block(block("Alerts")), area);
}

fn render_search(f: &mut Frame, app: &AppState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let spec = app.search.spec();
    let settling = app.search.is_settling(Instant::now());
    let input = Paragraph::new(Line::from(vec![
        Span::styled(format!("{}▏", spec.search_text), Style::default().fg(Color::White)),
        Span::styled(if settling { "  …" } else { "" }, Style::default().fg(Color::DarkGray)),
    ]))
    .block(block("Search teams"));
    f.render_widget(input, chunks[0]);

    let selector = |label: &str, value: Option<String>| {
        vec![
            Span::styled(format!(" {label}: "), Style::default().fg(Color::Yellow)),
            Span::raw(value.unwrap_or_else(|| "all".to_string())),
            Span::raw("  "),
        ]
    };
    let mut spans = selector("[F1] league", spec.league.clone());
    spans.extend(selector("[F2] bet type", spec.bet_type.map(|b| b.label().to_string())));
    spans.extend(selector("[F3] movement", spec.movement.map(|m| m.to_string())));
    f.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);

    let results = app.search.results();
    if results.is_empty() {
        f.render_widget(
            Paragraph::new("No games found").style(Style::default().fg(Color::DarkGray)).block(block("Results")),
            chunks[2],
        );
        return;
    }
    let rows: Vec<Row> = results
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let movement = app.summary(&c.id).map_or(MovementBucket::Low, |s| s.movement);
            let style = if i == app.search_selected {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(c.league.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(c.matchup()),
                Cell::from(movement.to_string()).style(Style::default().fg(bucket_color(movement))),
                Cell::from(app.start_label(c.start_time)).style(Style::default().fg(Color::DarkGray)),
            ])
            .style(style)
        })
        .collect();
    let header = Row::new(["League", "Matchup", "Move", "Start"].iter().map(|h| Cell::from(*h).style(header_style())));
    let table = Table::new(
        rows,
        [Constraint::Length(6), Constraint::Min(20), Constraint::Length(8), Constraint::Length(13)],
    )
    .header(header)
    .block(block(&format!("Results ({})", results.len())));
    f.render_widget(table, chunks[2]);
}

fn render_detail(f: &mut Frame, app: &AppState, area: Rect) {
    let Some(detail) = app.detail.as_ref() else {
        f.render_widget(Paragraph::new("Select a game from the scoreboard.").block(block("Game")), area);
        return;
    };
    let (title_area, chart_block, tabs_area, side) = split_detail(area);
    let summary = app.summary(detail.contest_id());

    // --- Title ---
    let mut title = vec![Span::styled(
        summary.map_or(detail.contest_id().to_string(), |c| c.contest.matchup()),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )];
    if let Some(c) = summary {
        title.push(Span::raw("  "));
        title.push(Span::styled(c.contest.league.clone(), Style::default().fg(Color::Cyan)));
        title.push(Span::raw("  "));
        title.push(Span::styled(
            detail.start_label.get().cloned().unwrap_or_else(|| "--:--".to_string()),
            Style::default().fg(Color::DarkGray),
        ));
        title.push(Span::raw("  "));
        title.push(Span::styled(
            format!("{} movement", c.movement),
            Style::default().fg(bucket_color(c.movement)),
        ));
    }
    if app.alerts_enabled(detail.contest_id()) {
        title.push(Span::styled("  🔔 alerts on", Style::default().fg(Color::Magenta)));
    }
    f.render_widget(Paragraph::new(Line::from(title)).block(block("Game")), title_area);

    // --- Chart ---
    render_chart(f, app, chart_block);

    // --- Tabs ---
    let tab_index = DetailTab::ALL.iter().position(|t| *t == detail.tab()).unwrap_or(0);
    let tab_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(tabs_area);
    f.render_widget(
        Tabs::new(DetailTab::ALL.iter().map(|t| Line::from(t.title())).collect::<Vec<_>>())
            .select(tab_index)
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        tab_chunks[0],
    );
    match detail.tab() {
        DetailTab::Story => render_story(f, app, tab_chunks[1]),
        DetailTab::Odds => render_odds(f, app, tab_chunks[1]),
        DetailTab::Stats => render_stats(f, app, tab_chunks[1]),
    }

    render_hover_panel(f, app, side);
}

fn render_chart(f: &mut Frame, app: &AppState, area: Rect) {
    let Some(detail) = app.detail.as_ref() else {
        return;
    };
    let scene = detail.scene();
    let title = format!(
        "{} timeline{}",
        detail.field().label(),
        if detail.is_playing() { " ▶" } else { "" }
    );
    let outer = block(&title);
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let plot = detail_chart_area(f.area());
    if scene.is_empty() {
        f.render_widget(
            Paragraph::new("No data").style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    // y labels to the left of the plot, x labels below it.
    for tick in &scene.y_ticks {
        let row = ((scene.offset.1 + tick.position) / DOTS_Y).floor() as u16;
        if row < plot.height {
            let label_area = Rect::new(inner.x, plot.y + row, 7, 1);
            f.render_widget(
                Paragraph::new(tick.label.clone()).style(Style::default().fg(Color::DarkGray)),
                label_area,
            );
        }
    }
    for tick in &scene.x_ticks {
        let col = ((scene.offset.0 + tick.position) / DOTS_X).floor() as u16;
        let width = tick.label.len() as u16;
        if col + width <= plot.width {
            let label_area = Rect::new(plot.x + col, plot.y + plot.height, width, 1);
            f.render_widget(
                Paragraph::new(tick.label.clone()).style(Style::default().fg(Color::DarkGray)),
                label_area,
            );
        }
    }

    let height = scene.viewport_height;
    let to_canvas = |x: f64, y: f64| (scene.offset.0 + x, height - (scene.offset.1 + y));
    let revealed = detail.revealed(Instant::now());
    let markers = &scene.markers[..revealed.min(scene.markers.len())];
    let hovered = detail.hovered();

    let canvas = Canvas::default()
        .marker(symbols::Marker::Braille)
        .x_bounds([0.0, scene.viewport_width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for &gy in &scene.grid {
                let (x1, y) = to_canvas(0.0, gy);
                let (x2, _) = to_canvas(scene.inner_width, gy);
                ctx.draw(&CanvasLine { x1, y1: y, x2, y2: y, color: Color::Rgb(40, 48, 60) });
            }
            ctx.layer();
            for pair in markers.windows(2) {
                let (x1, y1) = to_canvas(pair[0].x, pair[0].y);
                let (x2, y2) = to_canvas(pair[1].x, pair[1].y);
                ctx.draw(&CanvasLine { x1, y1, x2, y2, color: Color::Cyan });
            }
            ctx.layer();
            for m in markers {
                let color = match (Some(m.index) == hovered, m.emphasis) {
                    (true, _) => Color::White,
                    (false, Emphasis::Strong) => Color::Green,
                    (false, Emphasis::Normal) => Color::Yellow,
                    (false, Emphasis::Muted) => Color::Gray,
                };
                let p = to_canvas(m.x, m.y);
                ctx.draw(&Points { coords: &[p], color });
                if m.glow_radius > 0.0 {
                    let ring = [
                        (p.0 - DOTS_X, p.1),
                        (p.0 + DOTS_X, p.1),
                        (p.0, p.1 - DOTS_Y / 2.0),
                        (p.0, p.1 + DOTS_Y / 2.0),
                    ];
                    ctx.draw(&Points { coords: &ring, color: Color::LightGreen });
                }
            }
            if let Some(m) = hovered.and_then(|i| scene.markers.get(i)) {
                let (x, _) = to_canvas(m.x, 0.0);
                let (_, top) = to_canvas(0.0, 0.0);
                let (_, bottom) = to_canvas(0.0, scene.inner_height);
                ctx.draw(&CanvasLine { x1: x, y1: bottom, x2: x, y2: top, color: Color::DarkGray });
            }
        });
    f.render_widget(canvas, plot);
}

fn render_hover_panel(f: &mut Frame, app: &AppState, area: Rect) {
    let Some(panel) = app.detail.as_ref().and_then(|d| d.hover_panel()) else {
        f.render_widget(
            Paragraph::new("Hover a point (← → or mouse) to see details.")
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(Color::DarkGray))
                .block(block("Point")),
            area,
        );
        return;
    };
    let when = match app.tz.get() {
        Some(tz) => format_local(panel.timestamp, *tz),
        None => panel.timestamp.format("%H:%M UTC").to_string(),
    };
    let mut lines = vec![
        Line::styled(when, Style::default().fg(Color::DarkGray)),
        Line::from(vec![
            Span::raw(format!("{}: ", panel.field.label())),
            Span::styled(panel.formatted_value.clone(), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        ]),
    ];
    if let Some(sharp) = panel.sharp_action {
        lines.push(Line::from(vec![
            Span::raw("Sharp action: "),
            Span::styled(sharp.to_string(), Style::default().fg(Color::Green)),
        ]));
    }
    if let Some(public) = panel.public_action {
        lines.push(Line::raw(format!("Public: {public}%")));
    }
    if let Some(note) = &panel.note {
        lines.push(Line::raw(""));
        lines.push(Line::styled(note.clone(), Style::default().fg(Color::Yellow)));
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }).block(block("Point")), area);
}

fn render_story(f: &mut Frame, app: &AppState, area: Rect) {
    let story = app
        .detail
        .as_ref()
        .and_then(|d| app.summary(d.contest_id()))
        .and_then(|c| c.contest.storyline.as_ref());
    let Some(story) = story else {
        f.render_widget(
            Paragraph::new("No storyline for this game yet.").style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    };
    let sentiment_color = match story.sentiment {
        Sentiment::Positive => Color::Green,
        Sentiment::Negative => Color::Red,
        Sentiment::Neutral => Color::Gray,
    };
    let mut lines = vec![
        Line::raw(story.narrative.clone()),
        Line::from(Span::styled(
            format!("confidence {}%", story.confidence),
            Style::default().fg(sentiment_color),
        )),
        Line::raw(""),
    ];
    for e in &story.key_events {
        let impact = if e.impact >= 0 { format!("+{}", e.impact) } else { e.impact.to_string() };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<8}", e.at), Style::default().fg(Color::DarkGray)),
            Span::raw(e.event.clone()),
            Span::styled(format!("  {impact}"), Style::default().fg(if e.impact >= 0 { Color::Green } else { Color::Red })),
        ]));
    }
    if let Some(ctx) = &story.historical_context {
        lines.push(Line::raw(""));
        lines.push(Line::styled(ctx.clone(), Style::default().fg(Color::Cyan)));
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}

/// Current line per market with a sparkline of its history.
fn render_odds(f: &mut Frame, app: &AppState, area: Rect) {
    let Some(detail) = app.detail.as_ref() else {
        return;
    };
    let rows = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)])
        .split(area);
    for (field, cell) in MarketField::ALL.iter().zip(rows.iter()) {
        let height = f64::from(cell.height.saturating_sub(3).max(1)) * 8.0;
        let spark = Sparkline::build(detail.series(), *field, f64::from(cell.width), height);
        let data: Vec<u64> = spark
            .points
            .iter()
            .map(|&(_, y)| (height - y).round().max(0.0) as u64 + 1)
            .collect();
        let color = match spark.direction {
            LineDirection::Up => Color::Green,
            LineDirection::Down => Color::Red,
            LineDirection::Flat => Color::Gray,
        };
        let current = detail
            .series()
            .last()
            .map_or("-".to_string(), |s| field.format_value(s.value(*field)));
        f.render_widget(
            SparklineWidget::default()
                .data(data)
                .style(Style::default().fg(color))
                .block(block(&format!("{} {current}", field.label()))),
            *cell,
        );
    }
}

fn render_stats(f: &mut Frame, app: &AppState, area: Rect) {
    let Some(summary) = app.detail.as_ref().and_then(|d| app.summary(d.contest_id())) else {
        return;
    };
    let header = Row::new(["Market", "Move", "Δ", "Dir"].iter().map(|h| Cell::from(*h).style(header_style())));
    let rows: Vec<Row> = summary
        .markets
        .iter()
        .map(|m| {
            let (glyph, color) = direction_glyph(m.direction);
            Row::new(vec![
                Cell::from(m.field.label()),
                Cell::from(m.bucket.to_string()).style(Style::default().fg(bucket_color(m.bucket))),
                Cell::from(format!("{:+.2}", m.delta)),
                Cell::from(glyph).style(Style::default().fg(color)),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [Constraint::Length(8), Constraint::Length(8), Constraint::Length(8), Constraint::Length(4)],
    )
    .header(header)
    .footer(Row::new(vec![Cell::from(format!(
        "{} observations",
        summary.sample_count
    ))]));
    f.render_widget(table, area);
}

fn render_analysis(f: &mut Frame, app: &AppState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    // Biggest primary-market moves first.
    let mut movers: Vec<_> = app.contests.iter().collect();
    movers.sort_by(|a, b| {
        let delta = |c: &&oddsboard::api::ContestSummary| {
            c.markets.iter().find(|m| m.field == MarketField::PRIMARY).map_or(0.0, |m| m.delta.abs())
        };
        delta(b).total_cmp(&delta(a))
    });
    let header = Row::new(["League", "Matchup", "Move", "Spread Δ"].iter().map(|h| Cell::from(*h).style(header_style())));
    let rows: Vec<Row> = movers
        .iter()
        .map(|c| {
            let delta = c
                .markets
                .iter()
                .find(|m| m.field == MarketField::PRIMARY)
                .map_or(0.0, |m| m.delta);
            Row::new(vec![
                Cell::from(c.contest.league.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(c.contest.matchup()),
                Cell::from(c.movement.to_string()).style(Style::default().fg(bucket_color(c.movement))),
                Cell::from(format!("{delta:+.2}")),
            ])
        })
        .collect();
    f.render_widget(
        Table::new(rows, [Constraint::Length(6), Constraint::Min(20), Constraint::Length(8), Constraint::Length(9)])
            .header(header)
            .block(block("Line movers")),
        halves[0],
    );

    let count = |b: MovementBucket| app.contests.iter().filter(|c| c.movement == b).count();
    let latency = app.latency.as_ref();
    let fmt_us = |v: Option<u64>| v.map_or("-".to_string(), |us| format!("{:.2}ms", us as f64 / 1000.0));
    let lines = vec![
        Line::from(vec![
            Span::styled("High  ", Style::default().fg(Color::Green)),
            Span::raw(count(MovementBucket::High).to_string()),
        ]),
        Line::from(vec![
            Span::styled("Medium  ", Style::default().fg(Color::Yellow)),
            Span::raw(count(MovementBucket::Medium).to_string()),
        ]),
        Line::from(vec![
            Span::styled("Low  ", Style::default().fg(Color::DarkGray)),
            Span::raw(count(MovementBucket::Low).to_string()),
        ]),
        Line::raw(""),
        Line::raw(format!("Observations: {}", app.health.samples)),
        Line::raw(format!("Ingested since start: {}", app.health.samples_ingested)),
        Line::raw(format!(
            "Write queue: {}  errors: {}",
            app.health.write_queue_pending, app.health.write_errors
        )),
        Line::raw(format!(
            "Ingest p50 {}  p99 {}",
            fmt_us(latency.and_then(|l| l.p50_us)),
            fmt_us(latency.and_then(|l| l.p99_us)),
        )),
    ];
    f.render_widget(Paragraph::new(lines).block(block("Market pulse")), halves[1]);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let keys: &[(&str, &str)] = match app.screen {
        Screen::Scoreboard => &[
            ("[q]", "quit"),
            ("[↑↓]", "select"),
            ("[enter]", "open"),
            ("[s]", "sport"),
            ("[b]", "bet type"),
            ("[f/F]", "favorite/only favs"),
            ("[/]", "search"),
        ],
        Screen::Search => &[("[esc]", "back"), ("[F1-F3]", "filters"), ("[↑↓]", "select"), ("[enter]", "open")],
        Screen::Detail => &[
            ("[esc]", "back"),
            ("[m]", "market"),
            ("[t]", "tab"),
            ("[← →]", "hover"),
            ("[p]", "play"),
            ("[a]", "alerts"),
        ],
        Screen::Analysis => &[("[q]", "quit"), ("[1]", "scoreboard"), ("[r]", "refresh")],
    };
    let mut spans = vec![Span::raw(" ")];
    for (key, label) in keys {
        spans.push(Span::styled(format!("{key} "), Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!("{label}  ")));
    }
    spans.push(Span::styled("auto-refresh: 5s", Style::default().fg(Color::DarkGray)));
    f.render_widget(Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::White)), area);
}
