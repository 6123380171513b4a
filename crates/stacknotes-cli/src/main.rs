mod ui;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use stacknotes_config::Config;
use stacknotes_engine::{Cmd, Direction, FileStore, ToolbarAction, Workspace, WorkspaceOptions};
use std::{
    env, fs,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
    time::{Duration, Instant},
};

const LOG_FILE: &str = "stacknotes.log";

/// Upper bound on how long the loop sleeps with no save pending
const IDLE_POLL: Duration = Duration::from_millis(250);

/// What a key press asks the app to do
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Quit,
    Edit(Cmd),
    Toolbar(ToolbarAction),
    FocusNext,
    FocusPrevious,
}

fn action_for(key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let extend = key.modifiers.contains(KeyModifiers::SHIFT);
    let movement = |direction| {
        Some(Action::Edit(Cmd::Move {
            direction,
            extend,
        }))
    };

    match key.code {
        KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('q') if ctrl => Some(Action::Quit),
        KeyCode::Char('k') if ctrl => Some(Action::Toolbar(ToolbarAction::Checklist)),
        KeyCode::Char('b') if ctrl => Some(Action::Toolbar(ToolbarAction::Bullet)),
        KeyCode::Char('n') if ctrl => Some(Action::Toolbar(ToolbarAction::Number)),
        KeyCode::Char('a') if ctrl => Some(Action::Edit(Cmd::SelectAll)),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => Some(Action::Edit(Cmd::insert(c))),
        KeyCode::Enter => Some(Action::Edit(Cmd::SplitLine)),
        KeyCode::Backspace => Some(Action::Edit(Cmd::DeleteBackward)),
        KeyCode::Tab => Some(Action::FocusNext),
        KeyCode::BackTab => Some(Action::FocusPrevious),
        KeyCode::Left => movement(Direction::Left),
        KeyCode::Right => movement(Direction::Right),
        KeyCode::Up => movement(Direction::Up),
        KeyCode::Down => movement(Direction::Down),
        KeyCode::Home => movement(Direction::LineStart),
        KeyCode::End => movement(Direction::LineEnd),
        _ => None,
    }
}

struct App {
    workspace: Workspace<FileStore>,
    data_path: PathBuf,
}

impl App {
    fn new(config: &Config) -> Self {
        let store = FileStore::new(&config.data_path);
        let options = WorkspaceOptions {
            namespace: config.namespace.clone(),
            autosave_delay: config.autosave_debounce(),
        };
        let workspace = Workspace::open(store, options);

        // Start with the caret in the first region
        if let Some(first) = workspace.regions().first() {
            workspace.focus(first.id);
        }

        Self {
            workspace,
            data_path: config.data_path.clone(),
        }
    }

    /// Returns false once the user asked to quit
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let Some(action) = action_for(key) else {
            return true;
        };
        match action {
            Action::Quit => return false,
            Action::Edit(cmd) => {
                self.workspace.apply(cmd);
            }
            Action::Toolbar(action) => {
                self.workspace.trigger(action);
            }
            Action::FocusNext => {
                self.workspace.focus_next();
            }
            Action::FocusPrevious => {
                self.workspace.focus_previous();
            }
        }
        true
    }

    /// How long the loop may block before the next save is due
    fn poll_timeout(&self) -> Duration {
        self.workspace
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_POLL)
            .min(IDLE_POLL)
    }

    fn shutdown(self) -> usize {
        self.workspace.shutdown()
    }
}

fn init_logging(data_path: &Path) -> Result<()> {
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_path.join(LOG_FILE))
        .with_context(|| format!("opening log file in {}", data_path.display()))?;

    // The terminal belongs to the UI, so log lines go to a file
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    // Determine data path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let loaded = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Usage: {} [data-folder-path]", args[0]);
            process::exit(1);
        }
    };
    let from_config = loaded.is_some();
    let mut config = loaded.unwrap_or_default();

    match args.len() {
        1 => {}
        2 => config.data_path = PathBuf::from(&args[1]),
        _ => {
            eprintln!("Usage: {} [data-folder-path]", args[0]);
            process::exit(1);
        }
    }

    if let Err(e) = fs::create_dir_all(&config.data_path) {
        let source = if from_config && args.len() == 1 {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Data path '{}'{} is unusable: {e}",
            config.data_path.display(),
            source
        );
        process::exit(1);
    }

    init_logging(&config.data_path)?;
    log::info!("stacknotes starting up, data in {}", config.data_path.display());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(&config);

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    let written = app.shutdown();
    log::info!("Closed, {} snapshot(s) flushed", written);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, &app.workspace, &app.data_path))?;

        if event::poll(app.poll_timeout())?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && !app.handle_key(key)
        {
            return Ok(());
        }

        app.workspace.tick(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_plain_characters_insert() {
        assert_eq!(
            action_for(key(KeyCode::Char('x'), KeyModifiers::NONE)),
            Some(Action::Edit(Cmd::insert("x")))
        );
        assert_eq!(
            action_for(key(KeyCode::Char('X'), KeyModifiers::SHIFT)),
            Some(Action::Edit(Cmd::insert("X")))
        );
    }

    #[test]
    fn test_control_chords_drive_the_toolbar() {
        assert_eq!(
            action_for(key(KeyCode::Char('k'), KeyModifiers::CONTROL)),
            Some(Action::Toolbar(ToolbarAction::Checklist))
        );
        assert_eq!(
            action_for(key(KeyCode::Char('b'), KeyModifiers::CONTROL)),
            Some(Action::Toolbar(ToolbarAction::Bullet))
        );
        assert_eq!(
            action_for(key(KeyCode::Char('n'), KeyModifiers::CONTROL)),
            Some(Action::Toolbar(ToolbarAction::Number))
        );
        assert_eq!(action_for(key(KeyCode::Char('z'), KeyModifiers::CONTROL)), None);
    }

    #[test]
    fn test_shift_arrows_extend_selection() {
        assert_eq!(
            action_for(key(KeyCode::Right, KeyModifiers::SHIFT)),
            Some(Action::Edit(Cmd::extend(Direction::Right)))
        );
        assert_eq!(
            action_for(key(KeyCode::Home, KeyModifiers::NONE)),
            Some(Action::Edit(Cmd::move_caret(Direction::LineStart)))
        );
    }

    #[test]
    fn test_quit_keys() {
        assert_eq!(action_for(key(KeyCode::Esc, KeyModifiers::NONE)), Some(Action::Quit));
        assert_eq!(
            action_for(key(KeyCode::Char('q'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(
            action_for(key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(Action::Edit(Cmd::insert("q")))
        );
    }

    #[test]
    fn test_tab_moves_between_regions() {
        assert_eq!(action_for(key(KeyCode::Tab, KeyModifiers::NONE)), Some(Action::FocusNext));
        assert_eq!(
            action_for(key(KeyCode::BackTab, KeyModifiers::SHIFT)),
            Some(Action::FocusPrevious)
        );
    }
}
