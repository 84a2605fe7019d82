use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use presetkit_config::Config;
use presetkit_engine::{
    FileSystemStorage, MenuItem, MenuItemKind, ParameterSpec, ParameterStore, PresetError,
    PresetManager, StateStore,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::{
    env, fs,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
};

type Manager = PresetManager<FileSystemStorage, ParameterStore>;

/// Parameters of the delay effect whose state the presets capture
fn delay_parameter_layout() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::float("time", "Time", 30.0, 3000.0, 10.0, 200.0),
        ParameterSpec::float("feedback", "Feedback", 0.0, 0.95, 0.01, 0.3),
        ParameterSpec::float("mix", "Mix", 0.0, 1.0, 0.01, 0.5),
        ParameterSpec::choice(
            "type",
            "Delay Type",
            &["Tape", "Digital", "Ping Pong", "Reverse"],
            0,
        ),
        ParameterSpec::toggle("sync", "Sync To BPM", false),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Presets,
    Parameters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Browse,
    Naming(String),
}

struct App {
    manager: Manager,
    session_path: PathBuf,
    menu_items: Vec<MenuItem>,
    preset_list_state: ListState,
    parameter_list_state: ListState,
    focus: Focus,
    mode: Mode,
    status: String,
}

impl App {
    fn new(config: &Config, presets_path: PathBuf) -> Result<Self> {
        let store = ParameterStore::new(delay_parameter_layout(), env!("CARGO_PKG_VERSION"));
        let manager = PresetManager::new(
            FileSystemStorage::new(),
            store,
            presets_path,
            &config.extension,
        )?;

        let mut app = Self {
            manager,
            session_path: config.session_path(),
            menu_items: Vec::new(),
            preset_list_state: ListState::default(),
            parameter_list_state: ListState::default(),
            focus: Focus::Presets,
            mode: Mode::Browse,
            status: String::new(),
        };
        app.parameter_list_state.select(Some(0));
        app.restore_session();
        app.refresh_presets();
        Ok(app)
    }

    /// Restore the parameter state the previous run left behind
    fn restore_session(&mut self) {
        let Ok(payload) = fs::read_to_string(&self.session_path) else {
            return;
        };
        match self.manager.store_mut().restore_session(&payload) {
            Ok(()) => {
                self.manager.on_store_replaced();
                log::info!("Restored session from {}", self.session_path.display());
            }
            Err(e) => log::warn!("Ignoring unreadable session file: {e}"),
        }
    }

    fn persist_session(&self) -> Result<()> {
        if let Some(parent) = self.session_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = self.manager.store().serialize()?;
        fs::write(&self.session_path, payload)?;
        Ok(())
    }

    fn refresh_presets(&mut self) {
        if let Err(e) = self.manager.rebuild() {
            self.report(e);
        }
        self.menu_items = self.manager.menu().items();
        self.select_current_preset();
    }

    fn select_current_preset(&mut self) {
        let position = self
            .manager
            .current_preset_id()
            .and_then(|id| self.manager.menu().position_of(id));
        match position {
            Some(index) => self.preset_list_state.select(Some(index)),
            None if self.menu_items.is_empty() => self.preset_list_state.select(None),
            None => {
                if self.preset_list_state.selected().is_none() {
                    self.preset_list_state.select(Some(0));
                }
            }
        }
    }

    fn report(&mut self, error: PresetError) {
        if error.is_diagnostic() {
            self.status = error.to_string();
        }
    }

    fn move_selection(&mut self, forward: bool) {
        let (state, len) = match self.focus {
            Focus::Presets => (&mut self.preset_list_state, self.menu_items.len()),
            Focus::Parameters => (
                &mut self.parameter_list_state,
                self.manager.store().layout().len(),
            ),
        };
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if forward => (i + 1) % len,
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        state.select(Some(i));
    }

    fn load_selected(&mut self) {
        let Some(id) = self
            .preset_list_state
            .selected()
            .and_then(|index| self.menu_items.get(index))
            .and_then(MenuItem::preset_id)
        else {
            return;
        };
        match self.manager.load(id) {
            Ok(()) => self.status = format!("Loaded {}", self.current_preset_label()),
            Err(e) => self.report(e),
        }
    }

    fn step_preset(&mut self, forward: bool) {
        let result = if forward {
            self.manager.next()
        } else {
            self.manager.previous()
        };
        match result {
            Ok(Some(_)) => {
                self.status = format!("Loaded {}", self.current_preset_label());
                self.select_current_preset();
            }
            Ok(None) => self.status = "No presets found".to_string(),
            Err(e) => self.report(e),
        }
    }

    fn nudge_selected_parameter(&mut self, direction: i32) {
        let Some(index) = self.parameter_list_state.selected() else {
            return;
        };
        let Some(spec) = self.manager.store().layout().get(index).cloned() else {
            return;
        };
        let current = self.manager.store().value(&spec.id).unwrap_or(spec.default);
        self.manager
            .store_mut()
            .set_value(&spec.id, spec.nudge(current, direction));
    }

    fn delete_selected(&mut self) {
        let Some(item) = self
            .preset_list_state
            .selected()
            .and_then(|index| self.menu_items.get(index))
            .cloned()
        else {
            return;
        };
        let Some(id) = item.preset_id() else {
            self.status = "Select a preset to delete".to_string();
            return;
        };
        match self.manager.delete(id) {
            Ok(()) => {
                self.status = format!("Deleted {}", item.name);
                self.refresh_presets();
            }
            Err(e) => self.report(e),
        }
    }

    fn save_named(&mut self, name: &str) {
        match self.manager.save_named(name) {
            Ok(path) => {
                self.status = format!("Saved {}", path.display());
                self.refresh_presets();
            }
            Err(e) => self.report(e),
        }
    }

    fn current_preset_label(&self) -> String {
        self.manager
            .current_preset_id()
            .and_then(|id| self.manager.catalog().get(id))
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| "No Preset Selected".to_string())
    }

    /// Returns false when the app should quit
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if let Mode::Naming(name) = &mut self.mode {
            match code {
                KeyCode::Enter => {
                    let name = std::mem::take(name);
                    self.mode = Mode::Browse;
                    self.save_named(&name);
                }
                KeyCode::Esc => self.mode = Mode::Browse,
                KeyCode::Backspace => {
                    name.pop();
                }
                KeyCode::Char(c) => name.push(c),
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Presets => Focus::Parameters,
                    Focus::Parameters => Focus::Presets,
                };
            }
            KeyCode::Enter | KeyCode::Char(' ') if self.focus == Focus::Presets => {
                self.load_selected();
            }
            KeyCode::Right | KeyCode::Char('l') => match self.focus {
                Focus::Presets => self.step_preset(true),
                Focus::Parameters => self.nudge_selected_parameter(1),
            },
            KeyCode::Left | KeyCode::Char('h') => match self.focus {
                Focus::Presets => self.step_preset(false),
                Focus::Parameters => self.nudge_selected_parameter(-1),
            },
            KeyCode::Char('s') => self.mode = Mode::Naming(String::new()),
            KeyCode::Char('d') => self.delete_selected(),
            KeyCode::Char('r') => {
                self.refresh_presets();
                self.status = format!("{} presets", self.manager.catalog().len());
            }
            _ => {}
        }
        true
    }
}

fn init_logging() {
    let log_path = Config::config_dir().join("presetkit.log");
    let file = fs::create_dir_all(Config::config_dir())
        .and_then(|()| fs::OpenOptions::new().create(true).append(true).open(&log_path));

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(log::LevelFilter::Info);
    match file {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        // Without a log file, keep the terminal clean
        Err(_) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

/// First run: write the default config so the user has a file to edit
fn create_default_config() -> Config {
    let config = Config::default();
    match config.save() {
        Ok(()) => log::info!(
            "Created default config file at {}",
            Config::config_path().display()
        ),
        Err(e) => log::warn!("Failed to create default config file: {e}"),
    }
    config
}

fn main() -> Result<()> {
    init_logging();

    // Determine presets path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => create_default_config(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Usage: {} [presets-folder-path]", args[0]);
            process::exit(1);
        }
    };

    let presets_path = match args.len() {
        2 => PathBuf::from(&args[1]),
        1 => config.presets_path.clone(),
        _ => {
            eprintln!("Usage: {} [presets-folder-path]", args[0]);
            eprintln!("Or set presets_path in {}", config_path.display());
            process::exit(1);
        }
    };
    log::info!("Using presets folder {}", presets_path.display());

    let mut app = match App::new(&config, presets_path.clone()) {
        Ok(app) => app,
        Err(e) => {
            eprintln!(
                "Error: Presets path '{}' is invalid: {e}",
                presets_path.display()
            );
            process::exit(1);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = app.persist_session() {
        log::warn!("Could not save session: {err}");
    }

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && !app.handle_key(key.code)
        {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    // Current preset header
    let header_text = match &app.mode {
        Mode::Naming(name) => format!("Save as: {name}_"),
        Mode::Browse => format!(
            "{}  [{}]",
            app.current_preset_label(),
            app.manager.current_preset_number()
        ),
    };
    let header = Paragraph::new(vec![Line::from(Span::styled(
        header_text,
        Style::default().add_modifier(Modifier::BOLD),
    ))])
    .block(Block::default().borders(Borders::ALL).title("Preset"));
    f.render_widget(header, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);

    let current = app.manager.current_preset_id();
    let preset_items: Vec<ListItem> = app
        .menu_items
        .iter()
        .map(|item| {
            let indent = "  ".repeat(item.depth);
            let text = match &item.kind {
                MenuItemKind::Folder(_) => format!("{indent}📁 {}", item.name),
                MenuItemKind::Preset(id) if Some(*id) == current => {
                    format!("{indent}▶ {}", item.name)
                }
                MenuItemKind::Preset(_) => format!("{indent}  {}", item.name),
            };
            ListItem::new(vec![Line::from(vec![Span::raw(text)])])
        })
        .collect();

    let presets_title = format!("Presets ({})", app.manager.menu().root.preset_count());
    let presets_list = List::new(preset_items)
        .block(focused_block(presets_title, app.focus == Focus::Presets))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(presets_list, columns[0], &mut app.preset_list_state);

    let store = app.manager.store();
    let parameter_items: Vec<ListItem> = store
        .layout()
        .iter()
        .map(|spec| {
            let value = store.value(&spec.id).unwrap_or(spec.default);
            ListItem::new(Line::from(format!("{:<14}{}", spec.name, spec.display(value))))
        })
        .collect();
    let parameters_list = List::new(parameter_items)
        .block(focused_block(
            "Parameters".to_string(),
            app.focus == Focus::Parameters,
        ))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(parameters_list, columns[1], &mut app.parameter_list_state);

    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("↑↓: Select | "),
        Span::raw("Enter: Load | "),
        Span::raw("←/→: Prev/Next (Tab: adjust) | "),
        Span::raw("s: Save | d: Delete | r: Rescan"),
    ]);
    let status = Paragraph::new(vec![help_text, Line::from(app.status.as_str())])
        .block(Block::default());
    f.render_widget(status, rows[2]);
}

fn focused_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}
