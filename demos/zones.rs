//! Terminal control panel for a six-zone amplifier
//!
//! ```text
//! cargo run --example zones -- /dev/ttyUSB0
//! cargo run --example zones -- zone-amp.toml --log zones.log
//! cargo run --example zones -- --simulate
//! ```

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Mutex;
use zone_amp::{AmpConfig, Amplifier, SimulatedAmplifier, ZoneState, MAX_TONE, MAX_VOLUME, SOURCE_COUNT, ZONE_COUNT};

struct Args {
    target: Option<String>,
    simulate: bool,
    log_file: Option<String>,
}

fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
    let mut args = Args {
        target: None,
        simulate: false,
        log_file: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--simulate" => args.simulate = true,
            "--log" => args.log_file = Some(iter.next().ok_or("--log needs a file name")?),
            _ => args.target = Some(arg),
        }
    }
    if !args.simulate && args.target.is_none() {
        return Err("usage: zones <PORT | CONFIG.toml | --simulate> [--log FILE]".into());
    }
    Ok(args)
}

fn build_amplifier(args: &Args) -> Result<Amplifier, Box<dyn std::error::Error>> {
    if args.simulate {
        return Ok(Amplifier::new(SimulatedAmplifier::new()));
    }
    let target = args.target.as_deref().unwrap_or_default();
    let config = if target.ends_with(".toml") {
        AmpConfig::load(target)?
    } else {
        AmpConfig::new(target)
    };
    Ok(Amplifier::open(&config)?)
}

struct App {
    amp: Amplifier,
    selected_zone_index: usize,
    status_message: String,
}

impl App {
    fn new(amp: Amplifier) -> Self {
        Self {
            amp,
            selected_zone_index: 0,
            status_message: "Press r to read all zones".to_string(),
        }
    }

    fn selected_zone(&self) -> u8 {
        self.selected_zone_index as u8 + 1
    }

    fn current_state(&self) -> Option<ZoneState> {
        self.amp.zone_state(self.selected_zone()).ok().flatten()
    }

    fn select_next(&mut self) {
        self.selected_zone_index = (self.selected_zone_index + 1) % ZONE_COUNT as usize;
    }

    fn select_previous(&mut self) {
        if self.selected_zone_index == 0 {
            self.selected_zone_index = ZONE_COUNT as usize - 1;
        } else {
            self.selected_zone_index -= 1;
        }
    }

    async fn refresh_all(&mut self) {
        let report = self.amp.status_report().await;
        self.status_message = if report.failures.is_empty() {
            format!("Read {} zone(s)", report.zones.len())
        } else {
            let failed: Vec<String> = report
                .failures
                .iter()
                .map(|f| format!("zone {}: {}", f.zone, f.error))
                .collect();
            format!("Read {} zone(s); {}", report.zones.len(), failed.join("; "))
        };
    }

    /// Re-read the selected zone after a command so the panel shows real state
    async fn refresh_selected(&mut self, done: String) {
        let zone = self.selected_zone();
        let result = match self.amp.zone(zone) {
            Ok(controller) => controller.refresh().await.map(|_| ()),
            Err(e) => Err(e),
        };
        self.status_message = match result {
            Ok(()) => done,
            Err(e) => format!("{} (read back failed: {})", done, e),
        };
    }

    async fn toggle_power(&mut self) {
        let zone = self.selected_zone();
        let on = !self.current_state().map_or(false, |s| s.power);
        match self.amp.set_power(zone, on).await {
            Ok(()) => self.refresh_selected(format!("Zone {} power {}", zone, on_off(on))).await,
            Err(e) => self.status_message = format!("Failed to set power: {}", e),
        }
    }

    async fn toggle_mute(&mut self) {
        let zone = self.selected_zone();
        let on = !self.current_state().map_or(false, |s| s.mute);
        match self.amp.set_mute(zone, on).await {
            Ok(()) => self.refresh_selected(format!("Zone {} mute {}", zone, on_off(on))).await,
            Err(e) => self.status_message = format!("Failed to set mute: {}", e),
        }
    }

    async fn adjust_volume(&mut self, delta: i32) {
        let zone = self.selected_zone();
        let volume = self.current_state().map_or(0, |s| i32::from(s.volume)) + delta;
        let volume = volume.clamp(0, i32::from(MAX_VOLUME));
        match self.amp.set_volume(zone, volume).await {
            Ok(()) => self.refresh_selected(format!("Zone {} volume {}", zone, volume)).await,
            Err(e) => self.status_message = format!("Failed to set volume: {}", e),
        }
    }

    async fn cycle_source(&mut self) {
        let zone = self.selected_zone();
        let current = self.current_state().map_or(0, |s| i32::from(s.source));
        let source = current % i32::from(SOURCE_COUNT) + 1;
        match self.amp.set_source(zone, source).await {
            Ok(()) => self.refresh_selected(format!("Zone {} source {}", zone, source)).await,
            Err(e) => self.status_message = format!("Failed to set source: {}", e),
        }
    }

    async fn adjust_bass(&mut self, delta: i32) {
        let zone = self.selected_zone();
        let bass = tone_step(self.current_state().map_or(0, |s| s.bass), delta);
        match self.amp.set_bass(zone, bass).await {
            Ok(()) => self.refresh_selected(format!("Zone {} bass {:+}", zone, bass)).await,
            Err(e) => self.status_message = format!("Failed to set bass: {}", e),
        }
    }

    async fn adjust_treble(&mut self, delta: i32) {
        let zone = self.selected_zone();
        let treble = tone_step(self.current_state().map_or(0, |s| s.treble), delta);
        match self.amp.set_treble(zone, treble).await {
            Ok(()) => self.refresh_selected(format!("Zone {} treble {:+}", zone, treble)).await,
            Err(e) => self.status_message = format!("Failed to set treble: {}", e),
        }
    }
}

fn tone_step(current: i8, delta: i32) -> i32 {
    let max = i32::from(MAX_TONE);
    (i32::from(current) + delta).clamp(-max, max)
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

fn ui(f: &mut Frame, app: &App) {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.size());

    let inner_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(outer_chunks[0]);

    render_zones(f, app, inner_chunks[0]);
    render_json_dump(f, app, inner_chunks[1]);
    render_status(f, app, outer_chunks[1]);
}

fn render_zones(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Zones (j/k select, r read, p power, m mute, +/- vol, s source, b/B bass, t/T treble, q quit) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let header = Row::new(["Zone", "Power", "Mute", "Vol", "Src", "Bass", "Treb", "Bal", "Keypad"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = (1..=ZONE_COUNT)
        .map(|zone| match app.amp.zone_state(zone).ok().flatten() {
            Some(s) => Row::new(vec![
                Cell::from(zone.to_string()),
                Cell::from(on_off(s.power)).style(if s.power {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                }),
                Cell::from(on_off(s.mute)),
                Cell::from(s.volume.to_string()),
                Cell::from(s.source.to_string()),
                Cell::from(format!("{:+}", s.bass)),
                Cell::from(format!("{:+}", s.treble)),
                Cell::from(format!("{:+}", s.balance)),
                Cell::from(if s.keypad_connected { "yes" } else { "no" }),
            ]),
            None => Row::new(vec![Cell::from(zone.to_string()), Cell::from("--")])
                .style(Style::default().fg(Color::DarkGray)),
        })
        .collect();

    let widths = [
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(5),
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(5),
        Constraint::Length(5),
        Constraint::Length(4),
        Constraint::Length(7),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = TableState::default();
    state.select(Some(app.selected_zone_index));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_json_dump(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" Zone {} JSON ", app.selected_zone()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let lines: Vec<Line> = match app.current_state() {
        Some(state) => match serde_json::to_string_pretty(&state) {
            Ok(json) => json.lines().map(|l| Line::from(l.to_string())).collect(),
            Err(e) => vec![Line::from(format!("Error serializing JSON: {}", e))],
        },
        None => vec![Line::from(Span::styled(
            "No state read yet",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let text = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(text, area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Status ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let text = Paragraph::new(app.status_message.clone())
        .block(block)
        .wrap(Wrap { trim: true });

    f.render_widget(text, area);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args()?;

    // The terminal belongs to the UI, so logs only ever go to a file
    if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path)?;
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    let mut app = App::new(build_amplifier(&args)?);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.refresh_all().await;

    // Main loop
    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
                        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
                        KeyCode::Char('r') => app.refresh_all().await,
                        KeyCode::Char('p') => app.toggle_power().await,
                        KeyCode::Char('m') => app.toggle_mute().await,
                        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_volume(1).await,
                        KeyCode::Char('-') | KeyCode::Char('_') => app.adjust_volume(-1).await,
                        KeyCode::Char('s') => app.cycle_source().await,
                        KeyCode::Char('b') => app.adjust_bass(-1).await,
                        KeyCode::Char('B') => app.adjust_bass(1).await,
                        KeyCode::Char('t') => app.adjust_treble(-1).await,
                        KeyCode::Char('T') => app.adjust_treble(1).await,
                        _ => {}
                    }
                }
            }
        }
    }
}
