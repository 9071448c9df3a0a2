use crate::api_client::{HttpSearchClient, SearchTransport};
use crate::config::Config;
use crate::debouncer::Debouncer;
use crate::lazy_image::{Bounds, ImageElement, LazyImageLoader, RegistrationError};
use crate::search::{ControllerOptions, QueryController, SearchPhase, SearchState};
use crate::state::{RedrawSubscriber, StateEvent, StateSubscriber};
use crate::ui::thumbnails::ThumbnailStore;
use crate::ui::viewport::ResultsViewport;
use crate::utils::logging::{get_log_buffer, LogRingBuffer};
use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell as TableCell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

/// Cover shown for tracks without artwork, relative to the endpoint base
pub const FALLBACK_THUMBNAIL: &str = "/static/fallback-cover.svg";

const FAILURE_TEXT: &str = "Failed to retrieve results.";
const TICK_RATE: Duration = Duration::from_millis(50);
const LOG_PANEL_HEIGHT: u16 = 8;

/// Records the generation of the newest committed result set
struct ResultsTracker {
    latest: Rc<Cell<u64>>,
}

impl StateSubscriber for ResultsTracker {
    fn on_state_event(&mut self, event: &StateEvent, _state: &SearchState) {
        if let StateEvent::ResultsLoaded { generation, .. } = event {
            self.latest.set(*generation);
        }
    }

    fn name(&self) -> &str {
        "ResultsTracker"
    }
}

pub struct TuiApp {
    config: Config,
    client: HttpSearchClient,
    controller: QueryController,
    loader: LazyImageLoader,
    thumbnails: ThumbnailStore,
    input: Input,
    debouncer: Debouncer,
    viewport: ResultsViewport,
    /// Image element per result row, `None` when its URL could not be resolved
    row_images: Vec<Option<ImageElement>>,
    mounted_generation: u64,
    loaded_generation: Rc<Cell<u64>>,
    dirty: Rc<Cell<bool>>,
    log_buffer: Option<LogRingBuffer>,
    show_help: bool,
    show_logs: bool,
}

impl TuiApp {
    pub fn new(config: Config) -> Result<Self> {
        let base_url = &config.endpoint.base_url;
        let client = match config.endpoint.request_timeout() {
            Some(timeout) => HttpSearchClient::with_connect_timeout(base_url, timeout),
            None => HttpSearchClient::new(base_url),
        }
        .with_context(|| format!("Invalid endpoint {}", base_url))?;
        let transport: Rc<dyn SearchTransport> = Rc::new(client.clone());
        Ok(Self::with_transport(config, client, transport))
    }

    /// Build the app around a custom transport; `client` still serves
    /// thumbnails and URL resolution
    pub fn with_transport(
        config: Config,
        client: HttpSearchClient,
        transport: Rc<dyn SearchTransport>,
    ) -> Self {
        let controller = QueryController::new(
            transport,
            ControllerOptions {
                request_timeout: config.endpoint.request_timeout(),
            },
        );

        let (redraw, dirty) = RedrawSubscriber::new();
        dirty.set(true);
        controller.subscribe(Box::new(redraw));

        let loaded_generation = Rc::new(Cell::new(0));
        controller.subscribe(Box::new(ResultsTracker {
            latest: Rc::clone(&loaded_generation),
        }));

        Self {
            input: Input::new(config.behavior.initial_query.clone()),
            debouncer: Debouncer::new(config.behavior.debounce_ms),
            thumbnails: ThumbnailStore::new(client.http().clone()),
            loader: LazyImageLoader::new(),
            viewport: ResultsViewport::new(),
            row_images: Vec::new(),
            mounted_generation: 0,
            loaded_generation,
            dirty,
            log_buffer: get_log_buffer(),
            show_help: false,
            show_logs: false,
            controller,
            client,
            config,
        }
    }

    pub fn controller(&self) -> &QueryController {
        &self.controller
    }

    pub fn loader(&self) -> &LazyImageLoader {
        &self.loader
    }

    pub fn viewport(&self) -> &ResultsViewport {
        &self.viewport
    }

    /// Submit `query` on the local task set. Failures are logged here;
    /// the state already carries the user-facing error.
    pub fn submit(&mut self, query: String) {
        self.debouncer.mark_submitted(&query);
        let request = self.controller.submit_query(query);
        self.dirty.set(true);
        tokio::task::spawn_local(async move {
            if let Err(e) = request.await {
                error!(target: "tui", "Search failed: {}", e);
            }
        });
    }

    /// Run until the user quits. The initial query is submitted first.
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.submit(self.config.behavior.initial_query.clone());
        let result = self.event_loop(terminal).await;
        self.shutdown();
        result
    }

    async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut events = EventStream::new();
        let mut ticker = tokio::time::interval(TICK_RATE);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if self.dirty.replace(false) || self.loaded_generation.get() != self.mounted_generation
            {
                self.draw(terminal)?;
            }

            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key) {
                            break;
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => self.dirty.set(true),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                    None => break,
                },
                _ = ticker.tick() => self.on_tick(),
            }
        }
        Ok(())
    }

    /// Cancel the in-flight request and stop observing images
    pub fn shutdown(&mut self) {
        self.controller.cancel_pending();
        self.loader.shutdown();
        info!(target: "tui", "Shut down after {} image loads", self.loader.fired_total());
    }

    /// Mount rows for new results, render, then load thumbnails that came
    /// into view
    pub fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.sync_rows()?;
        terminal.draw(|f| self.ui(f))?;
        self.load_visible_thumbnails();
        Ok(())
    }

    fn on_tick(&mut self) {
        if !self.config.behavior.search_as_you_type {
            return;
        }
        if let Some(query) = self.debouncer.poll() {
            debug!(target: "tui", "Debounced query {:?}", query);
            self.submit(query);
        }
    }

    /// Returns true when the app should exit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.dirty.set(true);

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q')) {
                self.show_help = false;
            }
            return false;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Esc => return true,
            KeyCode::F(1) => self.show_help = true,
            KeyCode::F(2) => self.show_logs = !self.show_logs,
            KeyCode::Enter => {
                let query = self.input.value().to_string();
                self.submit(query);
            }
            KeyCode::Up => self.viewport.move_up(),
            KeyCode::Down => self.viewport.move_down(),
            KeyCode::PageUp => self.viewport.page_up(),
            KeyCode::PageDown => self.viewport.page_down(),
            KeyCode::Home => self.viewport.home(),
            KeyCode::End => self.viewport.end(),
            _ => {
                let before = self.input.value().to_string();
                self.input.handle_event(&Event::Key(key));
                if self.config.behavior.search_as_you_type && self.input.value() != before {
                    self.debouncer.input_changed(self.input.value());
                }
            }
        }
        false
    }

    /// Replace the row image elements when a new result set was committed
    fn sync_rows(&mut self) -> Result<(), RegistrationError> {
        let latest = self.loaded_generation.get();
        if latest == self.mounted_generation {
            return Ok(());
        }
        self.mounted_generation = latest;

        for element in self.row_images.drain(..).flatten() {
            element.unmount();
        }
        self.loader.prune();
        self.thumbnails.clear();

        let thumbnails: Vec<String> = {
            let state = self.controller.state();
            let items = state.data.as_ref().map(|d| d.items.as_slice()).unwrap_or(&[]);
            items
                .iter()
                .map(|item| item.thumbnail().unwrap_or(FALLBACK_THUMBNAIL).to_string())
                .collect()
        };
        self.viewport.reset(thumbnails.len());

        if !self.config.display.show_thumbnails {
            return Ok(());
        }

        for (index, thumbnail) in thumbnails.iter().enumerate() {
            let url = match self.client.resolve(thumbnail) {
                Ok(url) => url,
                Err(e) => {
                    warn!(target: "tui", "Skipping thumbnail for row {}: {}", index, e);
                    self.row_images.push(None);
                    continue;
                }
            };
            let element = ImageElement::mounted_at(Bounds::row(index));
            self.loader.register(&element, url.as_str())?;
            self.row_images.push(Some(element));
        }
        debug!(
            target: "tui",
            "Mounted {} rows, {} images observed",
            thumbnails.len(),
            self.loader.observed_count()
        );
        Ok(())
    }

    fn load_visible_thumbnails(&mut self) {
        if self.controller.state().phase() != SearchPhase::Loaded {
            return;
        }
        let fired = self.loader.observe_viewport(&self.viewport.lazy_viewport());
        for element in &fired {
            self.thumbnails.fetch(element, Rc::clone(&self.dirty));
        }
        if !fired.is_empty() {
            self.dirty.set(true);
        }
    }

    fn ui(&mut self, f: &mut Frame) {
        let log_height = if self.show_logs { LOG_PANEL_HEIGHT } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(log_height),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_input(f, chunks[0]);
        self.render_results(f, chunks[1]);
        if self.show_logs {
            self.render_logs(f, chunks[2]);
        }
        self.render_status(f, chunks[3]);

        if self.show_help {
            self.render_help(f);
        }
    }

    fn render_input(&self, f: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(2) as usize;
        let scroll = self.input.visual_scroll(width);
        let input = Paragraph::new(self.input.value())
            .scroll((0, scroll as u16))
            .block(Block::default().borders(Borders::ALL).title("Search"));
        f.render_widget(input, area);

        if !self.show_help {
            let cursor = self.input.visual_cursor().saturating_sub(scroll) as u16;
            f.set_cursor_position((area.x + 1 + cursor, area.y + 1));
        }
    }

    fn render_results(&mut self, f: &mut Frame, area: Rect) {
        // Borders and header row
        self.viewport.set_height(area.height.saturating_sub(3) as usize);

        let state = self.controller.state();
        match state.phase() {
            SearchPhase::Loading => {
                let block = Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Searching \"{}\"", state.query));
                f.render_widget(self.skeleton_table().block(block), area);
            }
            SearchPhase::Failed => {
                let message = state
                    .error
                    .as_ref()
                    .map(|e| sentence(&e.message))
                    .unwrap_or_else(|| FAILURE_TEXT.to_string());
                let paragraph = Paragraph::new(message)
                    .style(Style::default().fg(Color::Red))
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::ALL).title("Results"));
                f.render_widget(paragraph, area);
            }
            SearchPhase::Loaded => {
                let block = Block::default().borders(Borders::ALL).title("Results");
                match state.data.as_ref() {
                    Some(data) if !data.items.is_empty() => {
                        let range = self.viewport.visible_range();
                        let rows: Vec<Row> = range
                            .clone()
                            .filter_map(|index| data.items.get(index).map(|item| (index, item)))
                            .map(|(index, item)| {
                                let mut cells = Vec::with_capacity(4);
                                if self.config.display.show_thumbnails {
                                    cells.push(TableCell::from(self.thumbnail_label(index)));
                                }
                                cells.push(TableCell::from(item.title.clone()));
                                cells.push(TableCell::from(item.artists_label()));
                                cells.push(TableCell::from(item.collection.clone()));
                                Row::new(cells)
                            })
                            .collect();

                        let selected = self.viewport.selected().saturating_sub(range.start);
                        let mut table_state = TableState::default().with_selected(Some(selected));
                        let table = Table::new(rows, self.column_widths())
                            .header(self.header_row())
                            .block(block)
                            .row_highlight_style(
                                Style::default()
                                    .bg(Color::DarkGray)
                                    .add_modifier(Modifier::BOLD),
                            )
                            .highlight_symbol(">> ");
                        f.render_stateful_widget(table, area, &mut table_state);
                    }
                    _ => {
                        let paragraph = Paragraph::new("No results")
                            .style(Style::default().fg(Color::DarkGray))
                            .block(block);
                        f.render_widget(paragraph, area);
                    }
                }
            }
            SearchPhase::Idle => {
                let paragraph = Paragraph::new("Type a query and press Enter")
                    .style(Style::default().fg(Color::DarkGray))
                    .block(Block::default().borders(Borders::ALL).title("Results"));
                f.render_widget(paragraph, area);
            }
        }
    }

    /// Covers loaded and mounted for the current result set
    fn cover_counts(&self) -> (usize, usize) {
        let mounted = self.row_images.iter().flatten();
        let loaded = mounted.clone().filter(|element| element.is_loaded()).count();
        (loaded, mounted.count())
    }

    fn thumbnail_label(&self, row: usize) -> String {
        match self.row_images.get(row) {
            Some(Some(element)) => self
                .thumbnails
                .status(element.id())
                .label(self.config.display.use_glyphs),
            _ => "-".to_string(),
        }
    }

    fn column_widths(&self) -> Vec<Constraint> {
        let mut widths = Vec::with_capacity(4);
        if self.config.display.show_thumbnails {
            widths.push(Constraint::Length(10));
        }
        widths.extend([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ]);
        widths
    }

    fn header_row(&self) -> Row<'static> {
        let mut headers = Vec::with_capacity(4);
        if self.config.display.show_thumbnails {
            headers.push("Cover");
        }
        headers.extend(["Title", "Artists", "Collection"]);
        Row::new(headers).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    }

    fn skeleton_table(&self) -> Table<'static> {
        let (short, long) = if self.config.display.use_glyphs {
            ("░░░░", "░░░░░░░░░░░░░░")
        } else {
            ("....", "..............")
        };
        let columns = if self.config.display.show_thumbnails { 4 } else { 3 };
        let rows = (0..self.config.display.skeleton_rows).map(move |_| {
            let cells = (0..columns).map(move |col| if col == 0 { short } else { long });
            Row::new(cells).style(Style::default().fg(Color::DarkGray))
        });
        Table::new(rows, self.column_widths()).header(self.header_row())
    }

    fn render_logs(&self, f: &mut Frame, area: Rect) {
        let visible = area.height.saturating_sub(2) as usize;
        let lines: Vec<Line> = self
            .log_buffer
            .as_ref()
            .map(|buffer| buffer.get_recent(visible))
            .unwrap_or_default()
            .into_iter()
            .map(|entry| {
                let color = match entry.level.as_str() {
                    "ERROR" => Color::Red,
                    "WARN" => Color::Yellow,
                    "INFO" => Color::Green,
                    _ => Color::Gray,
                };
                Line::from(Span::styled(
                    entry.format_for_display(),
                    Style::default().fg(color),
                ))
            })
            .collect();

        let logs = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Logs"));
        f.render_widget(logs, area);
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let state = self.controller.state();
        let phase = state.phase();
        let phase_style = match phase {
            SearchPhase::Loading => Style::default().fg(Color::Yellow),
            SearchPhase::Failed => Style::default().fg(Color::Red),
            SearchPhase::Loaded => Style::default().fg(Color::Green),
            SearchPhase::Idle => Style::default().fg(Color::Gray),
        };

        let mut spans = vec![
            Span::styled(format!("[{}]", phase.label()), phase_style),
            Span::raw(format!(" \"{}\"", state.query)),
        ];
        if let Some(data) = state.data.as_ref().filter(|_| phase == SearchPhase::Loaded) {
            spans.push(Span::raw(format!(" | {}", data.summary())));
        }
        if self.config.display.show_thumbnails {
            let (loaded, mounted) = self.cover_counts();
            spans.push(Span::raw(format!(" | covers {}/{} loaded", loaded, mounted)));
        }
        if self.config.behavior.search_as_you_type && self.debouncer.is_pending() {
            spans.push(Span::styled(" | typing", Style::default().fg(Color::Yellow)));
        }
        spans.push(Span::styled(
            " | F1=Help F2=Logs Esc=Exit",
            Style::default().fg(Color::DarkGray),
        ));

        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_help(&self, f: &mut Frame) {
        let area = centered_rect(60, 60, f.area());
        let help_text = vec![
            Line::from(Span::styled(
                "Track Search",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Enter          Search for the typed query"),
            Line::from("Up/Down        Move selection"),
            Line::from("PgUp/PgDn      Scroll one page"),
            Line::from("Home/End       First/last result"),
            Line::from("F2             Toggle log panel"),
            Line::from("Esc / Ctrl-C   Quit"),
            Line::from(""),
            Line::from(if self.config.behavior.search_as_you_type {
                "Search-as-you-type is on"
            } else {
                "Search-as-you-type is off"
            }),
        ];

        f.render_widget(Clear, area);
        let help = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help (Esc to close)"))
            .wrap(Wrap { trim: false });
        f.render_widget(help, area);
    }
}

/// "failed to retrieve results" -> "Failed to retrieve results."
fn sentence(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => FAILURE_TEXT.to_string(),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Set up the terminal, run the app on a single-threaded runtime and
/// restore the terminal afterwards
pub fn run_tui_app(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let local = tokio::task::LocalSet::new();

    let mut app = {
        let _runtime = runtime.enter();
        TuiApp::new(config)?
    };

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let result = local.block_on(&runtime, app.run(&mut terminal));

    // Cleanup
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor()?;

    result.context("TUI execution failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{SearchError, SearchResponse, SearchResultItem};
    use async_trait::async_trait;
    use ratatui::backend::TestBackend;
    use tokio::task::LocalSet;

    struct CannedTransport {
        result: Result<SearchResponse, u16>,
    }

    #[async_trait(?Send)]
    impl SearchTransport for CannedTransport {
        async fn search(&self, _query: &str) -> Result<SearchResponse, SearchError> {
            self.result
                .clone()
                .map_err(|status| SearchError::Status { status })
        }
    }

    fn tracks(count: usize, total: usize) -> SearchResponse {
        SearchResponse {
            items: (0..count)
                .map(|i| SearchResultItem {
                    title: format!("Track {}", i),
                    artists: vec!["Band".to_string()],
                    uri: format!("spotify:track:{}", i),
                    collection: "Album".to_string(),
                    thumbnail_url: None,
                })
                .collect(),
            total,
        }
    }

    fn app(result: Result<SearchResponse, u16>) -> TuiApp {
        app_with(Config::default(), result)
    }

    fn app_with(config: Config, result: Result<SearchResponse, u16>) -> TuiApp {
        let client = HttpSearchClient::new("http://127.0.0.1:1").unwrap();
        TuiApp::with_transport(config, client, Rc::new(CannedTransport { result }))
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    async fn settle(app: &TuiApp) {
        for _ in 0..20 {
            if !app.controller().state().loading {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn skeleton_then_results_with_lazy_covers() {
        LocalSet::new()
            .run_until(async {
                let mut app = app(Ok(tracks(30, 250)));
                let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();

                app.submit("jazz".to_string());
                app.draw(&mut terminal).unwrap();
                assert!(screen(&terminal).contains("Searching \"jazz\""));
                assert_eq!(app.loader().fired_total(), 0);

                settle(&app).await;
                app.draw(&mut terminal).unwrap();
                let text = screen(&terminal);
                assert!(text.contains("Track 0"));
                assert!(text.contains("30 displayed of 250"));

                // 24 rows: input 3, status 1, borders 2, header 1
                assert_eq!(app.viewport().height(), 17);
                assert_eq!(app.loader().fired_total(), 17);
                assert_eq!(app.loader().observed_count(), 13);

                app.handle_key(key(KeyCode::End));
                app.draw(&mut terminal).unwrap();
                assert_eq!(app.loader().fired_total(), 30);

                app.handle_key(key(KeyCode::Home));
                app.draw(&mut terminal).unwrap();
                assert_eq!(app.loader().fired_total(), 30, "covers load once");
            })
            .await;
    }

    #[tokio::test]
    async fn failure_shows_generic_message() {
        LocalSet::new()
            .run_until(async {
                let mut app = app(Err(500));
                let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();

                app.submit("x".to_string());
                settle(&app).await;
                app.draw(&mut terminal).unwrap();
                let text = screen(&terminal);
                assert!(text.contains("Failed to retrieve results."));
                assert!(!text.contains("500"));
            })
            .await;
    }

    #[tokio::test]
    async fn enter_submits_typed_text_and_esc_quits() {
        LocalSet::new()
            .run_until(async {
                let mut app = app(Ok(tracks(0, 0)));
                for c in "rain".chars() {
                    assert!(!app.handle_key(key(KeyCode::Char(c))));
                }
                app.handle_key(key(KeyCode::Enter));
                assert_eq!(app.controller().state().query, "rain");
                assert!(app.controller().state().loading);

                settle(&app).await;
                let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
                app.draw(&mut terminal).unwrap();
                assert!(screen(&terminal).contains("No results"));

                app.handle_key(key(KeyCode::F(1)));
                assert!(!app.handle_key(key(KeyCode::Esc)), "Esc closes help first");
                assert!(app.handle_key(key(KeyCode::Esc)));

                app.shutdown();
                assert!(app.loader().is_shut_down());
            })
            .await;
    }

    #[tokio::test]
    async fn cover_count_follows_current_results() {
        LocalSet::new()
            .run_until(async {
                let mut app = app(Ok(tracks(30, 250)));
                let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();

                app.submit("jazz".to_string());
                settle(&app).await;
                app.draw(&mut terminal).unwrap();
                app.handle_key(key(KeyCode::End));
                app.draw(&mut terminal).unwrap();
                assert_eq!(app.loader().fired_total(), 30);

                app.submit("jazz".to_string());
                settle(&app).await;
                app.draw(&mut terminal).unwrap();
                app.draw(&mut terminal).unwrap();

                assert_eq!(app.loader().fired_total(), 47);
                assert_eq!(app.cover_counts(), (17, 30));
                assert!(screen(&terminal).contains("covers 17/30 loaded"));
            })
            .await;
    }

    #[tokio::test]
    async fn hidden_thumbnails_mount_nothing() {
        LocalSet::new()
            .run_until(async {
                let mut config = Config::default();
                config.display.show_thumbnails = false;
                let mut app = app_with(config, Ok(tracks(30, 30)));
                let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();

                app.submit(String::new());
                settle(&app).await;
                app.draw(&mut terminal).unwrap();

                assert!(app.row_images.is_empty());
                assert_eq!(app.loader().observed_count(), 0);
                assert_eq!(app.loader().fired_total(), 0);
                let text = screen(&terminal);
                assert!(text.contains("Title"));
                assert!(!text.contains("Cover"));
                assert!(!text.contains("covers"));
            })
            .await;
    }

    #[tokio::test]
    async fn unresolvable_thumbnail_leaves_row_without_image() {
        LocalSet::new()
            .run_until(async {
                let mut response = tracks(3, 3);
                response.items[0].thumbnail_url = Some("http://[broken".to_string());
                response.items[1].thumbnail_url = Some("/covers/1.jpg".to_string());
                let mut app = app(Ok(response));
                let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();

                app.submit("x".to_string());
                settle(&app).await;
                app.draw(&mut terminal).unwrap();

                assert_eq!(app.row_images.len(), 3);
                assert!(app.row_images[0].is_none());
                assert_eq!(app.thumbnail_label(0), "-");

                let second = app.row_images[1].as_ref().unwrap();
                assert_eq!(
                    second.src().as_deref(),
                    Some("http://127.0.0.1:1/covers/1.jpg")
                );
                let third = app.row_images[2].as_ref().unwrap();
                assert_eq!(
                    third.src().as_deref(),
                    Some("http://127.0.0.1:1/static/fallback-cover.svg")
                );
                assert_eq!(app.loader().fired_total(), 2);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn search_as_you_type_submits_settled_text_once() {
        LocalSet::new()
            .run_until(async {
                let mut config = Config::default();
                config.behavior.search_as_you_type = true;
                config.behavior.debounce_ms = 300;
                let mut app = app_with(config, Ok(tracks(1, 1)));

                for c in "jazz".chars() {
                    app.handle_key(key(KeyCode::Char(c)));
                }
                app.on_tick();
                assert_eq!(app.controller().generation(), 0, "still typing");

                tokio::time::advance(Duration::from_millis(300)).await;
                app.on_tick();
                assert_eq!(app.controller().generation(), 1);
                assert_eq!(app.controller().state().query, "jazz");
                settle(&app).await;

                // Enter before the quiet period ends: one submission only
                app.handle_key(key(KeyCode::Char('y')));
                app.handle_key(key(KeyCode::Enter));
                assert_eq!(app.controller().generation(), 2);
                assert_eq!(app.controller().state().query, "jazzy");

                tokio::time::advance(Duration::from_millis(400)).await;
                app.on_tick();
                assert_eq!(app.controller().generation(), 2);

                // Typing back to already-submitted text is not resent
                app.handle_key(key(KeyCode::Backspace));
                app.handle_key(key(KeyCode::Char('y')));
                tokio::time::advance(Duration::from_millis(400)).await;
                app.on_tick();
                assert_eq!(app.controller().generation(), 2);
            })
            .await;
    }

    #[test]
    fn failure_sentence() {
        assert_eq!(sentence("failed to retrieve results"), FAILURE_TEXT);
        assert_eq!(sentence(""), FAILURE_TEXT);
    }
}
