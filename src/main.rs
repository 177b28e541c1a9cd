pub mod ui;

use std::{
    collections::VecDeque,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::mpsc::{self, Receiver, Sender},
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use directories::ProjectDirs;
use log::{debug, info, LevelFilter};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};

use driftbottle::{
    choreography::{PickTransition, SlotTimeline},
    clock::Clock,
    config::{Config, ConfigStore, FileConfigStore, APP_NAME},
    corpus::Corpus,
    haptics::{Haptics, TerminalBell},
    motion::{MotionCapability, MotionDiagnostic, MotionReading},
    runtime::{AppEvent, AppEventSource, CrosstermEventSource, FixedTicker, Runner, Ticker},
    selector::StorySelector,
    session::{SessionConfig, ShakeSession},
    sim::{PermissionAnswer, SimulatedMotion},
};

use crate::ui::screen::current_screen;

const TICK_RATE_MS: u64 = 50;
const NOTICE_SECS: u64 = 4;
const DIAGNOSTIC_HISTORY: usize = 8;

/// shake a bottle in your terminal and read a stranger's story
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Shake (or tap) a drifting bottle to wake the stories inside, pick one to read, and collect the places they came from. Motion is simulated from the keyboard."
)]
pub struct Cli {
    /// shake threshold, lower is more sensitive (5-30)
    #[clap(long)]
    sensitivity: Option<f64>,

    /// number of story slots per round
    #[clap(short = 'n', long)]
    slots: Option<usize>,

    /// development mode: motion sensors off, tap only
    #[clap(long)]
    dev: bool,

    /// behave like a device without motion sensors
    #[clap(long, conflicts_with = "permission_gate")]
    no_motion: bool,

    /// behave like a device that asks for motion consent first
    #[clap(long)]
    permission_gate: bool,

    /// keep the terminal bell quiet
    #[clap(long)]
    no_haptics: bool,

    /// show the motion/haptics debug panel and log at debug level
    #[clap(long)]
    debug: bool,

    /// store the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,

    /// seed story sampling for a repeatable run
    #[clap(long)]
    seed: Option<u64>,
}

impl Cli {
    fn capability(&self) -> MotionCapability {
        if self.no_motion {
            MotionCapability::Unsupported
        } else if self.permission_gate {
            MotionCapability::PermissionRequired
        } else {
            MotionCapability::Available
        }
    }

    /// Layers command-line flags over the stored config
    fn apply(&self, mut config: Config) -> Config {
        if let Some(sensitivity) = self.sensitivity {
            config.sensitivity = sensitivity;
        }
        if let Some(slots) = self.slots {
            config.slot_count = slots;
        }
        config.dev_mode |= self.dev;
        config.clamped()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Bottle,
    Story(usize),
    Footprints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    /// Simulate a burst of accelerometer readings
    Shake,
    Quit,
}

pub struct App {
    pub session: ShakeSession<SimulatedMotion>,
    pub state: AppState,
    pub pick: Option<PickTransition>,
    pub notice: Option<(&'static str, Instant)>,
    pub show_debug: bool,
    pub diagnostics: VecDeque<MotionDiagnostic>,
    pub footprint_cursor: usize,
    diag_rx: Receiver<MotionDiagnostic>,
}

impl App {
    pub fn new(
        mut session: ShakeSession<SimulatedMotion>,
        diag_rx: Receiver<MotionDiagnostic>,
        show_debug: bool,
    ) -> Self {
        session.mount();
        Self {
            session,
            state: AppState::Bottle,
            pick: None,
            notice: None,
            show_debug,
            diagnostics: VecDeque::with_capacity(DIAGNOSTIC_HISTORY),
            footprint_cursor: 0,
            diag_rx,
        }
    }

    pub fn from_cli(cli: &Cli, config: &Config) -> anyhow::Result<Self> {
        let corpus = Corpus::bundled().context("loading bundled stories")?;
        let corpus_size = corpus.len();
        let haptics = if cli.no_haptics {
            Haptics::disabled()
        } else {
            Haptics::new(TerminalBell::new(io::stdout()))
        }
        .with_cooldown(Duration::from_millis(config.vibration_cooldown_ms));

        let (diag_tx, diag_rx) = mpsc::channel();
        let mut session = ShakeSession::new(
            SimulatedMotion::new(cli.capability()),
            corpus,
            haptics,
            SessionConfig::from(config),
        )
        .with_diagnostics(diag_tx);
        if let Some(seed) = cli.seed {
            session = session.with_selector(StorySelector::seeded(corpus_size, seed));
        }

        Ok(Self::new(session, diag_rx, cli.debug))
    }

    pub fn now(&self) -> Instant {
        self.session.clock().now()
    }

    pub fn on_tick(&mut self) {
        let now = self.now();
        while let Ok(diagnostic) = self.diag_rx.try_recv() {
            if self.diagnostics.len() == DIAGNOSTIC_HISTORY {
                self.diagnostics.pop_front();
            }
            self.diagnostics.push_back(diagnostic);
        }

        if let Some(pick) = self.pick {
            if pick.is_done(now) {
                self.pick = None;
                self.state = AppState::Story(pick.story_index);
            }
        }

        if let Some((_, shown_at)) = self.notice {
            if now.saturating_duration_since(shown_at) >= Duration::from_secs(NOTICE_SECS) {
                self.notice = None;
            }
        }
    }

    pub fn on_motion(&mut self, reading: MotionReading) {
        if self.session.on_motion(reading) {
            debug!("shake woke the bottle");
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> KeyAction {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return KeyAction::Quit;
        }

        match self.state {
            AppState::Bottle => return self.on_bottle_key(key.code),
            AppState::Story(_) => match key.code {
                KeyCode::Char('b') | KeyCode::Backspace => self.state = AppState::Bottle,
                KeyCode::Char('f') => self.open_footprints(),
                KeyCode::Char('r') => self.new_round(),
                _ => {}
            },
            AppState::Footprints => match key.code {
                KeyCode::Char('b') | KeyCode::Backspace => self.state = AppState::Bottle,
                KeyCode::Up => {
                    self.footprint_cursor = self.footprint_cursor.saturating_sub(1);
                }
                KeyCode::Down => {
                    if self.footprint_cursor + 1 < self.session.footprints().len() {
                        self.footprint_cursor += 1;
                    }
                }
                KeyCode::Enter => {
                    let cursor = self.footprint_cursor;
                    if let Some(print) = self.session.footprints().iter().nth(cursor) {
                        self.state = AppState::Story(print.story_index);
                    }
                }
                _ => {}
            },
        }
        KeyAction::Continue
    }

    fn on_bottle_key(&mut self, code: KeyCode) -> KeyAction {
        if self.session.policy().awaiting_permission() {
            let answer = match code {
                KeyCode::Char('y') => PermissionAnswer::Grant,
                KeyCode::Char('n') => PermissionAnswer::Deny,
                _ => return KeyAction::Continue,
            };
            self.session.answer_prompt(answer);
            let now = self.now();
            self.notice = self.session.take_notice().map(|notice| (notice, now));
            return KeyAction::Continue;
        }
        // Ignore input while the picked slot is glowing
        if self.pick.is_some() {
            return KeyAction::Continue;
        }

        match code {
            KeyCode::Char('s') => return KeyAction::Shake,
            KeyCode::Char(' ') | KeyCode::Char('t') => {
                self.session.tap();
            }
            KeyCode::Char(c @ '1'..='9') => self.pick_slot(c as usize - '1' as usize),
            KeyCode::Char('r') => self.new_round(),
            KeyCode::Char('f') => self.open_footprints(),
            KeyCode::Char('d') => self.show_debug = !self.show_debug,
            _ => {}
        }
        KeyAction::Continue
    }

    /// Only slots already on screen can be picked
    fn pick_slot(&mut self, slot: usize) {
        let visible = match (self.session.since_activation(), self.session.machine().slot(slot)) {
            (Some(t), Some(s)) => SlotTimeline::new(s.start_delay()).phase(t).is_visible(),
            _ => false,
        };
        if !visible {
            debug!("slot {} is not on screen yet", slot);
            return;
        }
        match self.session.pick(slot) {
            Ok(story_index) => {
                self.pick = Some(PickTransition::start(slot, story_index, self.now()));
            }
            Err(e) => debug!("pick ignored: {e}"),
        }
    }

    fn open_footprints(&mut self) {
        self.footprint_cursor = 0;
        self.state = AppState::Footprints;
    }

    fn new_round(&mut self) {
        self.session.reset();
        self.pick = None;
        self.state = AppState::Bottle;
    }
}

/// Logs go to a file; the terminal belongs to the UI
fn init_logging(debug: bool) -> anyhow::Result<PathBuf> {
    let dir = ProjectDirs::from("", "", APP_NAME)
        .map(|pd| pd.data_local_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir);
    fs::create_dir_all(&dir)?;
    let path = dir.join("driftbottle.log");
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // RUST_LOG still wins over the default level
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(path)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    match init_logging(cli.debug) {
        Ok(path) => info!("driftbottle starting, logging to {}", path.display()),
        Err(e) => eprintln!("logging disabled: {e}"),
    }

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());
    if cli.save_config {
        store
            .save(&config)
            .with_context(|| format!("saving config to {}", store.path().display()))?;
        info!("saved config to {}", store.path().display());
    }

    let mut app = App::from_cli(&cli, &config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = CrosstermEventSource::new();
    let motion_tx = events.sender();
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));
    let result = start_tui(&mut terminal, &mut app, &runner, &motion_tx);

    app.session.unmount();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: AppEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
    motion_tx: &Sender<AppEvent>,
) -> anyhow::Result<()> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Tick => {
                app.on_tick();
                // Keep the sensor stream alive between shakes
                if let Some(reading) = app.session.resting_reading() {
                    motion_tx.send(AppEvent::Motion(reading))?;
                }
            }
            AppEvent::Resize => {}
            AppEvent::Motion(reading) => app.on_motion(reading),
            AppEvent::Key(key) => match app.on_key(key) {
                KeyAction::Quit => break,
                KeyAction::Shake => {
                    let burst = app.session.shake_burst();
                    if burst.is_empty() {
                        debug!("shake key pressed while motion is off");
                    }
                    for reading in burst {
                        motion_tx.send(AppEvent::Motion(reading))?;
                    }
                }
                KeyAction::Continue => {}
            },
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    current_screen(&app.state).render(app, f, app.now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftbottle::clock::ManualClock;
    use driftbottle::haptics::RecordingHaptics;
    use driftbottle::input_policy::{InputModality, DENIED_NOTICE};
    use driftbottle::choreography::SlotPhase;
    use ratatui::{buffer::Buffer, layout::Rect, style::Modifier};
    use std::sync::Arc;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn create_test_app(capability: MotionCapability, dev: bool) -> (App, ManualClock) {
        let clock = ManualClock::new();
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let (tx, rx) = mpsc::channel();
        let session = ShakeSession::with_clock(
            SimulatedMotion::seeded(capability, 1),
            Corpus::bundled().unwrap(),
            Haptics::with_clock(RecordingHaptics::new(), shared.clone()),
            SessionConfig {
                dev_mode: dev,
                ..SessionConfig::default()
            },
            shared,
        )
        .with_selector(StorySelector::seeded(22, 4))
        .with_diagnostics(tx);
        (App::new(session, rx, false), clock)
    }

    fn rendered(app: &App) -> String {
        let area = Rect::new(0, 0, 100, 30);
        let mut buffer = Buffer::empty(area);
        app.render_bottle(area, &mut buffer, app.now());
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["driftbottle"]);
        assert_eq!(cli.sensitivity, None);
        assert_eq!(cli.slots, None);
        assert!(!cli.dev);
        assert_eq!(cli.capability(), MotionCapability::Available);
    }

    #[test]
    fn test_cli_capability_flags() {
        let cli = Cli::parse_from(["driftbottle", "--no-motion"]);
        assert_eq!(cli.capability(), MotionCapability::Unsupported);

        let cli = Cli::parse_from(["driftbottle", "--permission-gate"]);
        assert_eq!(cli.capability(), MotionCapability::PermissionRequired);

        assert!(Cli::try_parse_from(["driftbottle", "--no-motion", "--permission-gate"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["driftbottle", "--sensitivity", "50", "-n", "5", "--dev"]);
        let config = cli.apply(Config::default());
        assert_eq!(config.sensitivity, 30.0);
        assert_eq!(config.slot_count, 5);
        assert!(config.dev_mode);

        let config = Cli::parse_from(["driftbottle"]).apply(Config::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_dev_mode_tap_then_pick_opens_story() {
        let (mut app, clock) = create_test_app(MotionCapability::Available, true);
        assert_eq!(app.session.modality(), InputModality::TapActive);
        assert!(rendered(&app).contains("[dev mode]"));

        // Nothing on screen yet
        app.on_key(key('1'));
        assert!(app.pick.is_none());

        app.on_key(key('t'));
        assert!(app.session.machine().is_activated());
        app.on_key(key('1'));
        assert!(app.pick.is_none(), "slots are still inside the bottle");

        clock.advance_ms(6000);
        app.on_key(key('2'));
        let story = app.session.slots()[1].assigned_story_index().unwrap();
        assert_eq!(app.pick.map(|p| p.story_index), Some(story));

        clock.advance_ms(2500);
        app.on_tick();
        assert_eq!(app.state, AppState::Story(story));
        assert_eq!(app.session.footprints().len(), 1);
    }

    #[test]
    fn test_slot_label_fades_in_while_arriving() {
        let (mut app, clock) = create_test_app(MotionCapability::Unsupported, false);
        app.on_key(key('t'));
        let emotion = app.session.selected_for_slot(0).unwrap().emotion.clone();
        let first = emotion.chars().next().unwrap().to_string();

        let area = Rect::new(0, 0, 100, 30);
        let label_cell = |app: &App| {
            let mut buffer = Buffer::empty(area);
            app.render_bottle(area, &mut buffer, app.now());
            buffer.content().iter().find(|c| c.symbol() == first).cloned()
        };

        clock.advance_ms(4000);
        assert!(label_cell(&app).is_none());

        // Halfway through the fade, the first slot is still gliding in
        clock.advance_ms(600);
        let since = app.session.since_activation().unwrap();
        let slot = SlotTimeline::new(0.0);
        assert!(matches!(slot.phase(since), SlotPhase::Arriving { .. }));
        let cell = label_cell(&app).expect("label shown before arrival ends");
        assert!(cell.modifier.contains(Modifier::DIM));

        clock.advance_ms(1000);
        let cell = label_cell(&app).unwrap();
        assert!(!cell.modifier.contains(Modifier::DIM));
    }

    #[test]
    fn test_shake_key_defers_to_motion_events() {
        let (mut app, _) = create_test_app(MotionCapability::Available, false);
        assert_eq!(app.on_key(key('s')), KeyAction::Shake);
        for reading in app.session.shake_burst() {
            app.on_motion(reading);
        }
        assert!(app.session.machine().is_activated());

        assert_eq!(app.session.detector().shakes_detected(), 1);

        app.on_tick();
        assert_eq!(app.diagnostics.len(), DIAGNOSTIC_HISTORY);
        assert!(app
            .diagnostics
            .iter()
            .all(|d| matches!(d, MotionDiagnostic::Motion { .. })));
    }

    #[test]
    fn test_permission_denied_shows_notice_and_allows_tap() {
        let (mut app, clock) = create_test_app(MotionCapability::PermissionRequired, false);
        assert!(rendered(&app).contains("Allow motion access?"));

        app.on_key(key('t'));
        assert!(!app.session.machine().is_activated());

        app.on_key(key('n'));
        assert_eq!(app.notice.map(|(n, _)| n), Some(DENIED_NOTICE));
        assert_eq!(app.session.modality(), InputModality::TapActive);

        app.on_key(key(' '));
        assert!(app.session.machine().is_activated());

        clock.advance_ms(NOTICE_SECS * 1000);
        app.on_tick();
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_reset_starts_a_new_round() {
        let (mut app, _) = create_test_app(MotionCapability::Unsupported, false);
        app.on_key(key('t'));
        app.on_key(key('r'));
        assert!(!app.session.machine().is_activated());
        assert_eq!(app.session.slots().len(), 3);
        assert_eq!(app.state, AppState::Bottle);
    }

    #[test]
    fn test_footprints_navigation() {
        let (mut app, clock) = create_test_app(MotionCapability::Unsupported, false);
        app.on_key(key('t'));
        clock.advance_ms(6000);
        app.on_key(key('1'));
        clock.advance_ms(2500);
        app.on_tick();

        app.on_key(key('f'));
        assert_eq!(app.state, AppState::Footprints);
        app.on_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        assert_eq!(app.footprint_cursor, 0);
        app.on_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        let first = app.session.footprints().iter().next().unwrap().story_index;
        assert_eq!(app.state, AppState::Story(first));
    }

    #[test]
    fn test_escape_quits_everywhere() {
        let (mut app, _) = create_test_app(MotionCapability::Available, false);
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(app.on_key(esc), KeyAction::Quit);
        app.state = AppState::Footprints;
        assert_eq!(app.on_key(esc), KeyAction::Quit);
    }
}
