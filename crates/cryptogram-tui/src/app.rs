use crate::theme::Theme;
use crate::worker::{Completion, Job, Worker};
use cryptogram_core::{
    Engine, EngineError, Feedback, InputEvent, Letter, Notification, Outgoing, PuzzleService,
    ServiceError, Tone,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Ticks a changed cell stays highlighted
pub const FLASH_TICKS: u8 = 4;

/// Result of handling a key press
pub enum AppAction {
    Continue,
    Quit,
}

/// Current screen state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenState {
    /// Waiting for a puzzle
    Loading,
    /// Puzzle on screen (also after the solution is revealed)
    Playing,
    /// The puzzle could not be loaded
    Failed(String),
}

/// Menu state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    None,
    ConfirmReveal,
    Help,
}

/// Screen area of one drawn cell, filled in by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellHitbox {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub position: usize,
}

impl CellHitbox {
    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.x
            && column < self.x + self.width
            && row >= self.y
            && row < self.y + self.height
    }
}

/// The main application state
pub struct App {
    /// Current puzzle, once loaded
    pub engine: Option<Engine>,
    /// Current screen state
    pub screen_state: ScreenState,
    /// Current menu state
    pub menu: MenuState,
    /// Color theme
    pub theme: Theme,
    /// Message to display
    pub message: Option<String>,
    pub message_tone: Tone,
    /// Message timer
    message_timer: u32,
    /// Recently changed cells and their remaining highlight ticks
    pub flashes: HashMap<usize, u8>,
    /// Where each cell was drawn last frame
    pub hitboxes: Vec<CellHitbox>,
    /// Last solution check said the guesses are right
    pub solved: bool,
    pub backend_name: &'static str,
    /// Bumped for each new puzzle; older completions are dropped
    generation: u64,
    worker: Worker,
}

impl App {
    /// Start the app and request the first puzzle
    pub fn new(service: Arc<dyn PuzzleService>, theme: Theme) -> io::Result<Self> {
        let backend_name = service.backend_name();
        let worker = Worker::spawn(service)?;
        let mut app = Self {
            engine: None,
            screen_state: ScreenState::Loading,
            menu: MenuState::None,
            theme,
            message: None,
            message_tone: Tone::Info,
            message_timer: 0,
            flashes: HashMap::new(),
            hitboxes: Vec::new(),
            solved: false,
            backend_name,
            generation: 0,
            worker,
        };
        app.new_puzzle();
        Ok(app)
    }

    pub fn get_tick_rate(&self) -> Duration {
        Duration::from_millis(100)
    }

    /// Drop the current puzzle and fetch another
    pub fn new_puzzle(&mut self) {
        self.generation += 1;
        self.engine = None;
        self.menu = MenuState::None;
        self.flashes.clear();
        self.hitboxes.clear();
        self.solved = false;
        self.screen_state = ScreenState::Loading;
        info!(generation = self.generation, "requesting new puzzle");

        if !self.worker.submit(Job::Fetch {
            generation: self.generation,
        }) {
            self.screen_state = ScreenState::Failed("puzzle service worker stopped".into());
        }
    }

    /// Apply finished service calls and update timers (called every tick)
    pub fn tick(&mut self) {
        while let Some(completion) = self.worker.try_recv() {
            self.on_completion(completion);
        }

        self.flashes.retain(|_, ticks| {
            *ticks = ticks.saturating_sub(1);
            *ticks > 0
        });

        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message = None;
            }
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        if completion.generation() != self.generation {
            debug!(
                stale = completion.generation(),
                current = self.generation,
                "dropping completion for an old puzzle"
            );
            return;
        }

        match completion {
            Completion::Fetched { result, .. } => {
                let loaded = result
                    .map_err(EngineError::FetchFailed)
                    .and_then(Engine::from_payload);
                match loaded {
                    Ok(mut engine) => {
                        engine.focus_first();
                        let author = engine.author().to_string();
                        self.engine = Some(engine);
                        self.screen_state = ScreenState::Playing;
                        self.show_message(&format!("New puzzle by {author}"));
                    }
                    Err(e) => {
                        error!(error = %e, "puzzle could not be loaded");
                        self.screen_state = ScreenState::Failed(e.to_string());
                    }
                }
            }
            Completion::Answered {
                ticket, outcome, ..
            } => {
                let Some(engine) = self.engine.as_mut() else {
                    return;
                };
                if let Err(e) = engine.resolve(ticket, outcome) {
                    warn!(error = %e, "request failed");
                }
                self.pump_notifications();
            }
        }
    }

    /// Feed an event to the engine and send any resulting request
    fn send(&mut self, event: InputEvent) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if let Some(outgoing) = engine.handle(event) {
            let job = Job::Send {
                generation: self.generation,
                outgoing,
            };
            if !self.worker.submit(job) {
                fail_unsent(engine, outgoing);
            }
        }
        self.pump_notifications();
    }

    fn pump_notifications(&mut self) {
        let notifications = match self.engine.as_mut() {
            Some(engine) => engine.drain_notifications(),
            None => return,
        };
        for notification in notifications {
            match notification {
                Notification::CellsChanged(positions) => {
                    for position in positions {
                        self.flashes.insert(position, FLASH_TICKS);
                    }
                }
                Notification::Feedback(feedback) => self.show_feedback(feedback),
                Notification::SolutionChecked { correct } => self.solved = correct,
                Notification::SolutionRevealed(_) => self.menu = MenuState::None,
            }
        }
    }

    /// Show a temporary message
    pub fn show_message(&mut self, msg: &str) {
        self.show_feedback(Feedback {
            text: msg.to_string(),
            tone: Tone::Info,
        });
    }

    fn show_feedback(&mut self, feedback: Feedback) {
        self.message = Some(feedback.text);
        self.message_tone = feedback.tone;
        self.message_timer = 30; // ~3 seconds at 100ms poll
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.kind == KeyEventKind::Release {
            return AppAction::Continue;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.handle_command_key(key);
        }

        if self.menu != MenuState::None {
            self.handle_menu_key(key);
            return AppAction::Continue;
        }

        match &self.screen_state {
            ScreenState::Loading => {
                if key.code == KeyCode::Esc {
                    return AppAction::Quit;
                }
            }
            ScreenState::Failed(_) => match key.code {
                KeyCode::Enter => self.new_puzzle(),
                KeyCode::Esc => return AppAction::Quit,
                _ => {}
            },
            ScreenState::Playing => self.handle_game_key(key),
        }
        AppAction::Continue
    }

    /// Ctrl shortcuts work on every screen
    fn handle_command_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => return AppAction::Quit,
            KeyCode::Char('n') => self.new_puzzle(),
            KeyCode::Char('t') => {
                self.theme = self.theme.next();
                let name = self.theme.name;
                self.show_message(&format!("Theme: {name}"));
            }
            _ => {}
        }
        AppAction::Continue
    }

    fn handle_game_key(&mut self, key: KeyEvent) {
        let finished = self.engine.as_ref().is_some_and(Engine::is_finished);

        match key.code {
            KeyCode::Char(c) if c.is_ascii_alphabetic() => {
                if finished {
                    self.show_message("Solution revealed. Ctrl+N for a new puzzle");
                } else if let Some(letter) = Letter::from_char(c) {
                    self.send(InputEvent::Letter(letter));
                }
            }
            KeyCode::Backspace | KeyCode::Delete => {
                if finished {
                    self.show_message("Solution revealed. Ctrl+N for a new puzzle");
                } else {
                    self.send(InputEvent::Clear);
                }
            }
            KeyCode::Tab => self.send(InputEvent::Advance),
            KeyCode::Left => self.send(InputEvent::Left),
            KeyCode::Right => self.send(InputEvent::Right),
            KeyCode::Home => self.focus_edge(false),
            KeyCode::End => self.focus_edge(true),
            KeyCode::Enter => self.send(InputEvent::Submit),
            KeyCode::Esc => {
                if finished {
                    self.show_message("Solution revealed. Ctrl+N for a new puzzle");
                } else {
                    self.menu = MenuState::ConfirmReveal;
                }
            }
            KeyCode::F(1) | KeyCode::Char('?') => self.menu = MenuState::Help,
            _ => {}
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        match self.menu {
            MenuState::ConfirmReveal => match key.code {
                KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.menu = MenuState::None;
                    self.reveal();
                }
                KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                    self.menu = MenuState::None;
                }
                _ => {}
            },
            MenuState::Help => self.menu = MenuState::None,
            MenuState::None => {}
        }
    }

    fn reveal(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        match engine.request_reveal() {
            Ok(outgoing) => {
                let job = Job::Send {
                    generation: self.generation,
                    outgoing,
                };
                if !self.worker.submit(job) {
                    fail_unsent(engine, outgoing);
                }
                self.pump_notifications();
                self.show_message("Revealing the solution...");
            }
            Err(e) => self.show_message(&format!("Cannot reveal: {e}")),
        }
    }

    fn focus_edge(&mut self, last: bool) {
        let target = self.engine.as_ref().and_then(|engine| {
            let letters = engine.layout().letter_positions();
            if last {
                letters.last().copied()
            } else {
                letters.first().copied()
            }
        });
        if let Some(position) = target {
            self.send(InputEvent::Focus(position));
        }
    }

    /// Focus the cell under a mouse click
    pub fn handle_click(&mut self, column: u16, row: u16) {
        let hit = self
            .hitboxes
            .iter()
            .find(|hitbox| hitbox.contains(column, row))
            .map(|hitbox| hitbox.position);
        if let Some(position) = hit {
            self.send(InputEvent::Focus(position));
        }
    }

    /// Check if a cell shares the focused cell's ciphertext letter
    pub fn is_highlighted(&self, position: usize) -> bool {
        let Some(engine) = &self.engine else {
            return false;
        };
        let layout = engine.layout();
        match engine.cursor().position().and_then(|p| layout.letter_at(p)) {
            Some(focused) => layout.letter_at(position) == Some(focused),
            None => false,
        }
    }

    /// Check if a cell changed in the last few ticks
    pub fn is_flashing(&self, position: usize) -> bool {
        self.flashes.contains_key(&position)
    }
}

/// Fail a request that never reached the worker so the engine reverts it
fn fail_unsent(engine: &mut Engine, outgoing: Outgoing) {
    if let Err(e) = engine.resolve(outgoing.ticket, Err(ServiceError::Unavailable)) {
        warn!(ticket = %outgoing.ticket, error = %e, "request could not be sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptogram_core::{Cursor, MockPuzzleService, PuzzlePayload};
    use std::thread;
    use std::time::Instant;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn letter(c: char) -> Letter {
        Letter::from_char(c).unwrap()
    }

    /// Tick until the worker has nothing left for the current puzzle
    fn settle(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            app.tick();
            let idle = match (&app.screen_state, &app.engine) {
                (ScreenState::Loading, _) => false,
                (_, Some(engine)) => engine.outstanding() == 0,
                (_, None) => true,
            };
            if idle {
                return;
            }
            assert!(Instant::now() < deadline, "app did not settle");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn app_with(service: &Arc<MockPuzzleService>) -> App {
        let mut app = App::new(service.clone(), Theme::dark()).unwrap();
        settle(&mut app);
        app
    }

    fn type_keys(app: &mut App, keys: &str) {
        for c in keys.chars() {
            app.handle_key(key(KeyCode::Char(c)));
            settle(app);
        }
    }

    #[test]
    fn test_loads_and_focuses_first_letter() {
        let service = Arc::new(MockPuzzleService::with_puzzle("'PZ B", "Anon", "'TH E"));
        let app = app_with(&service);

        assert_eq!(app.screen_state, ScreenState::Playing);
        let engine = app.engine.as_ref().unwrap();
        assert_eq!(engine.cursor(), Cursor::at(1));
        assert_eq!(app.message.as_deref(), Some("New puzzle by Anon"));
        assert_eq!(app.backend_name, "Mock");
    }

    #[test]
    fn test_typing_autofills_and_advances() {
        let service = Arc::new(MockPuzzleService::with_puzzle("PZP", "Anon", "AHA"));
        let mut app = app_with(&service);

        type_keys(&mut app, "a");
        let engine = app.engine.as_ref().unwrap();
        assert_eq!(engine.guessed_text(), "A_A");
        assert_eq!(engine.cursor(), Cursor::at(1));
        assert!(app.is_flashing(2));
        assert_eq!(app.message_tone, Tone::Success);
    }

    #[test]
    fn test_backspace_clears_letter() {
        let service = Arc::new(MockPuzzleService::with_puzzle("PZB", "Anon", "THE"));
        let mut app = app_with(&service);
        type_keys(&mut app, "t");
        app.handle_key(key(KeyCode::Left));
        app.handle_key(key(KeyCode::Backspace));
        settle(&mut app);

        assert_eq!(app.engine.as_ref().unwrap().guessed_text(), "___");
        assert_eq!(service.server_guess(letter('P')), None);
    }

    #[test]
    fn test_rejection_shows_error() {
        let service = Arc::new(MockPuzzleService::with_puzzle("PZB", "Anon", "THE"));
        service.reject_letter(letter('P'));
        let mut app = app_with(&service);
        type_keys(&mut app, "t");

        let engine = app.engine.as_ref().unwrap();
        assert_eq!(engine.guessed_text(), "___");
        assert_eq!(engine.cursor(), Cursor::at(0));
        assert_eq!(app.message_tone, Tone::Error);
    }

    #[test]
    fn test_new_puzzle_drops_stale_answers() {
        let service = Arc::new(MockPuzzleService::with_puzzle("PZB", "Anon", "THE"));
        let mut app = app_with(&service);

        // The substitution is still in flight when the next puzzle is requested
        app.handle_key(key(KeyCode::Char('t')));
        service.set_payload(PuzzlePayload::new("QR", "Someone"));
        app.handle_key(ctrl('n'));
        assert_eq!(app.screen_state, ScreenState::Loading);
        settle(&mut app);

        let engine = app.engine.as_ref().unwrap();
        assert_eq!(engine.author(), "Someone");
        assert_eq!(engine.guessed_text(), "__");
        assert_eq!(engine.outstanding(), 0);
    }

    #[test]
    fn test_reveal_needs_confirmation() {
        let service = Arc::new(MockPuzzleService::with_puzzle("PZB", "Anon", "THE"));
        let mut app = app_with(&service);

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.menu, MenuState::ConfirmReveal);
        app.handle_key(key(KeyCode::Char('n')));
        assert_eq!(app.menu, MenuState::None);
        assert_eq!(service.reveal_calls(), 0);

        app.handle_key(key(KeyCode::Esc));
        app.handle_key(key(KeyCode::Enter));
        settle(&mut app);
        let engine = app.engine.as_ref().unwrap();
        assert_eq!(engine.revealed_solution(), Some("THE"));
        assert_eq!(service.reveal_calls(), 1);

        // Edits are over, navigation still works
        type_keys(&mut app, "x");
        assert!(service.substitution_calls().is_empty());
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.engine.as_ref().unwrap().cursor(), Cursor::at(1));
    }

    #[test]
    fn test_fetch_failure_and_retry() {
        let service = Arc::new(MockPuzzleService::with_puzzle("PZB", "Anon", "THE"));
        service.set_available(false);
        let mut app = app_with(&service);
        assert!(matches!(app.screen_state, ScreenState::Failed(_)));
        assert!(app.engine.is_none());

        service.set_available(true);
        app.handle_key(key(KeyCode::Enter));
        settle(&mut app);
        assert_eq!(app.screen_state, ScreenState::Playing);
    }

    #[test]
    fn test_malformed_puzzle_fails() {
        let service = Arc::new(MockPuzzleService::new(PuzzlePayload {
            ciphertext: Some("PZB".into()),
            author_label: None,
        }));
        let app = app_with(&service);
        let ScreenState::Failed(reason) = &app.screen_state else {
            panic!("expected failure screen");
        };
        assert!(reason.contains("author"));
    }

    #[test]
    fn test_click_focuses_cell() {
        let service = Arc::new(MockPuzzleService::with_puzzle("PZB", "Anon", "THE"));
        let mut app = app_with(&service);
        app.hitboxes = vec![
            CellHitbox { x: 4, y: 3, width: 2, height: 2, position: 0 },
            CellHitbox { x: 6, y: 3, width: 2, height: 2, position: 2 },
        ];

        app.handle_click(7, 4);
        assert_eq!(app.engine.as_ref().unwrap().cursor(), Cursor::at(2));
        app.handle_click(0, 0);
        assert_eq!(app.engine.as_ref().unwrap().cursor(), Cursor::at(2));
    }

    #[test]
    fn test_highlight_follows_cipher_letter() {
        let service = Arc::new(MockPuzzleService::with_puzzle("PZP", "Anon", "AHA"));
        let app = app_with(&service);
        assert!(app.is_highlighted(2));
        assert!(!app.is_highlighted(1));
    }

    #[test]
    fn test_unsent_request_is_reverted() {
        let mut engine = Engine::from_payload(PuzzlePayload::new("PZB", "Anon")).unwrap();
        engine.focus_first();
        let outgoing = engine.handle(InputEvent::Letter(letter('T'))).unwrap();
        engine.drain_notifications();

        fail_unsent(&mut engine, outgoing);
        assert_eq!(engine.displayed_guess(letter('P')), None);
        assert_eq!(engine.outstanding(), 0);
        assert!(engine.drain_notifications().iter().any(|n| matches!(
            n,
            Notification::Feedback(Feedback { tone: Tone::Error, .. })
        )));
    }

    #[test]
    fn test_control_keys() {
        let service = Arc::new(MockPuzzleService::with_puzzle("PZB", "Anon", "THE"));
        let mut app = app_with(&service);

        app.handle_key(ctrl('t'));
        assert_eq!(app.theme.name, "light");
        assert!(matches!(app.handle_key(ctrl('q')), AppAction::Quit));
    }
}
