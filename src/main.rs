//! Deepview - A terminal-based explorer for scientific data files.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use deepview::app::{App, Focus};
use deepview::data::Path as DataPath;
use deepview::loader::LoaderRegistry;
use deepview::navigation::Navigator;
use deepview::render::DisplayMode;
use deepview::ui;
use deepview::util::{clipboard, EngineConfig};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// What `--dump` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DumpMode {
    /// The overview tree.
    Tree,
    /// Text mode rendering.
    Text,
    /// Table mode rendering.
    Table,
    /// Raw mode rendering.
    Raw,
}

#[derive(Parser, Debug)]
#[command(name = "deepview")]
#[command(about = "A terminal explorer for scientific data files", long_about = None)]
struct Args {
    /// Path to the data file to open
    file: Option<PathBuf>,

    /// Enable logging to specified file (filter with DEEPVIEW_LOG, default "debug")
    #[arg(long)]
    log: Option<PathBuf>,

    /// Print one rendering to stdout instead of starting the interface
    #[arg(long, value_enum, requires = "file")]
    dump: Option<DumpMode>,

    /// Value to dump, as a path such as `root.data[0,1]`
    #[arg(long, requires = "dump")]
    path: Option<String>,

    /// Maximum depth of the overview tree
    #[arg(long)]
    max_depth: Option<usize>,

    /// Sequence items shown in the overview tree
    #[arg(long)]
    overview_width: Option<usize>,

    /// Sequence items shown when expanding into the table
    #[arg(long)]
    table_width: Option<usize>,

    /// Character limit for text and raw renderings
    #[arg(long)]
    max_chars: Option<usize>,

    /// Decode pickle files (only open pickles you trust)
    #[arg(long)]
    allow_pickle: bool,

    /// List supported file extensions and exit
    #[arg(long)]
    formats: bool,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(depth) = self.max_depth {
            config.tree.max_depth = depth;
        }
        if let Some(width) = self.overview_width {
            config.tree.overview_width = width.max(1);
        }
        if let Some(width) = self.table_width {
            config.tree.table_width = width.max(1);
        }
        if let Some(chars) = self.max_chars {
            config.render.max_chars = chars;
        }
        config.loader.allow_pickle = self.allow_pickle;
        config
    }
}

fn init_logging(log_path: &std::path::Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    let filter = EnvFilter::try_from_env("DEEPVIEW_LOG").unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set up logging: {}", e))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(log_path) = &args.log {
        init_logging(log_path)?;
        tracing::info!("Starting Deepview");
    }

    let config = args.engine_config();

    if args.formats {
        let registry = LoaderRegistry::new(config.loader);
        println!("{}", registry.supported_extensions().join(" "));
        return Ok(());
    }

    if let (Some(mode), Some(file)) = (args.dump, &args.file) {
        return dump(file, mode, args.path.as_deref(), config);
    }

    // Validate path if provided
    if let Some(ref path) = args.file {
        if !path.is_file() {
            eprintln!("Error: File not found: {}", path.display());
            std::process::exit(1);
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let mut app = App::new(config);
    if let Some(file) = args.file {
        app.load_file(file);
    }
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {}", err);
    }

    tracing::info!("Deepview exited");
    Ok(())
}

/// Load synchronously and print one rendering.
fn dump(file: &std::path::Path, mode: DumpMode, path: Option<&str>, config: EngineConfig) -> Result<()> {
    let mut registry = LoaderRegistry::new(config.loader.clone());
    let document = registry.load(file)?;
    let mut navigator = Navigator::new(config);
    navigator.set_document(document);

    let target = match path {
        Some(text) => DataPath::parse(text)?,
        None => DataPath::root(),
    };

    let output = match mode {
        DumpMode::Tree => {
            let tree = match navigator.tree() {
                Some(overview) if target.is_root() => overview.clone(),
                _ => navigator.expand(&target)?,
            };
            let name = navigator.document().map(|d| d.file_name());
            clipboard::tree_text(&tree, name.as_deref())
        },
        DumpMode::Text | DumpMode::Table | DumpMode::Raw => {
            navigator.push(&target)?;
            let display = match mode {
                DumpMode::Table => DisplayMode::Table,
                DumpMode::Raw => DisplayMode::Raw,
                _ => DisplayMode::Text,
            };
            navigator.render(display).to_text()
        },
    };
    println!("{}", output.trim_end());
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    let mut pending_g = false; // For 'gg' vim binding

    loop {
        app.poll_worker();
        terminal.draw(|f| ui::draw(f, &mut app))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Search mode - handle separately
        if app.search.is_active() {
            match key.code {
                KeyCode::Enter => app.run_search(),
                KeyCode::Esc => app.search.cancel(),
                KeyCode::Backspace => app.search.backspace(),
                KeyCode::Char(c) => app.search.input(c),
                _ => {},
            }
            continue;
        }

        // Keys shared by both panes
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(()),
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => return Ok(()),
            (KeyModifiers::NONE, KeyCode::Tab) => {
                app.toggle_focus();
                continue;
            },
            (KeyModifiers::NONE, KeyCode::Char('m')) => {
                app.cycle_mode();
                continue;
            },
            (KeyModifiers::NONE, KeyCode::Backspace) => {
                app.pop();
                continue;
            },
            (KeyModifiers::NONE, KeyCode::Char('/')) => {
                app.search.start();
                continue;
            },
            (KeyModifiers::NONE, KeyCode::Char('t')) => {
                app.toggle_preview();
                continue;
            },
            (KeyModifiers::SHIFT, KeyCode::Char('T')) => {
                app.cycle_theme();
                continue;
            },
            (KeyModifiers::SHIFT, KeyCode::Char('Y')) => {
                app.copy_rendered();
                continue;
            },
            (KeyModifiers::SHIFT, KeyCode::Char('?')) => {
                app.status = "Help: q=quit, Tab=pane, m=mode, Enter=open, Backspace=back, /=search, c=copy tree, y=copy node, Y=copy view".to_string();
                continue;
            },
            (KeyModifiers::NONE, KeyCode::Esc) => {
                app.search.cancel();
                continue;
            },
            _ => {},
        }

        match app.focus {
            Focus::Frame => match (key.modifiers, key.code) {
                (KeyModifiers::NONE, KeyCode::Up) | (KeyModifiers::NONE, KeyCode::Char('k')) => {
                    if app.mode == DisplayMode::Table {
                        app.move_table_cursor(-1, 0);
                    } else {
                        app.frame_scroll = app.frame_scroll.saturating_sub(1);
                    }
                },
                (KeyModifiers::NONE, KeyCode::Down) | (KeyModifiers::NONE, KeyCode::Char('j')) => {
                    if app.mode == DisplayMode::Table {
                        app.move_table_cursor(1, 0);
                    } else {
                        app.frame_scroll = app.frame_scroll.saturating_add(1);
                    }
                },
                (KeyModifiers::NONE, KeyCode::Left) | (KeyModifiers::NONE, KeyCode::Char('h')) => {
                    app.move_table_cursor(0, -1);
                },
                (KeyModifiers::NONE, KeyCode::Right) | (KeyModifiers::NONE, KeyCode::Char('l')) => {
                    app.move_table_cursor(0, 1);
                },
                (KeyModifiers::CONTROL, KeyCode::Char('d')) => {
                    app.move_table_cursor(15, 0);
                    app.frame_scroll = app.frame_scroll.saturating_add(15);
                },
                (KeyModifiers::CONTROL, KeyCode::Char('u')) => {
                    app.move_table_cursor(-15, 0);
                    app.frame_scroll = app.frame_scroll.saturating_sub(15);
                },
                (KeyModifiers::NONE, KeyCode::Enter) => {
                    if app.mode != DisplayMode::Table {
                        app.mode = DisplayMode::Table;
                        app.status = "Mode: Table".to_string();
                    } else {
                        app.select_cell(Instant::now());
                    }
                },
                _ => {},
            },
            Focus::Tree => match (key.modifiers, key.code) {
                (KeyModifiers::NONE, KeyCode::Up) | (KeyModifiers::NONE, KeyCode::Char('k')) => {
                    app.explorer.cursor_up();
                    app.select_current();
                },
                (KeyModifiers::NONE, KeyCode::Down) | (KeyModifiers::NONE, KeyCode::Char('j')) => {
                    app.explorer.cursor_down();
                    app.select_current();
                },
                (KeyModifiers::NONE, KeyCode::Left) | (KeyModifiers::NONE, KeyCode::Char('h')) => {
                    app.explorer.collapse_current();
                    app.select_current();
                },
                (KeyModifiers::NONE, KeyCode::Right) | (KeyModifiers::NONE, KeyCode::Char('l')) => {
                    app.expand_current();
                    app.select_current();
                },
                (KeyModifiers::NONE, KeyCode::Enter) => app.push_current(),

                // Vim navigation
                (KeyModifiers::NONE, KeyCode::Char('g')) => {
                    if pending_g {
                        app.explorer.goto_first();
                        app.select_current();
                        pending_g = false;
                    } else {
                        pending_g = true;
                    }
                    continue;
                },
                (KeyModifiers::SHIFT, KeyCode::Char('G')) => {
                    app.explorer.goto_last();
                    app.select_current();
                },
                (KeyModifiers::CONTROL, KeyCode::Char('f')) => {
                    for _ in 0..15 {
                        app.explorer.cursor_down();
                    }
                    app.select_current();
                },
                (KeyModifiers::CONTROL, KeyCode::Char('b')) => {
                    for _ in 0..15 {
                        app.explorer.cursor_up();
                    }
                    app.select_current();
                },

                // Search
                (KeyModifiers::NONE, KeyCode::Char('n')) => {
                    app.search.next_match();
                    app.goto_search_match();
                },
                (KeyModifiers::SHIFT, KeyCode::Char('N')) => {
                    app.search.prev_match();
                    app.goto_search_match();
                },

                // Clipboard
                (KeyModifiers::NONE, KeyCode::Char('c')) => app.copy_tree(),
                (KeyModifiers::NONE, KeyCode::Char('y')) => app.copy_node(),

                // Details scrolling
                (KeyModifiers::CONTROL, KeyCode::Char('d'))
                | (KeyModifiers::SHIFT, KeyCode::Char('J')) => app.explorer.scroll_down(),
                (KeyModifiers::CONTROL, KeyCode::Char('u'))
                | (KeyModifiers::SHIFT, KeyCode::Char('K')) => app.explorer.scroll_up(),

                _ => {},
            },
        }
        pending_g = false;
    }
}
