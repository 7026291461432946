use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{
        DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use puraluce_core::Config;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use tracing::{error, info};

mod app;
mod logging;
mod setup;
mod theme;
mod ui;

use app::runtime::run_app;
use app::state::App;
use setup::runtime::run_setup_wizard;

/// Studio Pura Luce: a page of prayer for the trouble you bring.
#[derive(Parser, Debug)]
#[command(name = "puraluce", version, about)]
struct Cli {
    /// Run the provider setup wizard even when a key is configured
    #[arg(long)]
    setup: bool,

    /// Path to the config file (default: ~/.config/puraluce/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Color theme: sanctuary, dark, light or auto
    #[arg(long)]
    theme: Option<String>,
}

struct TerminalGuard {
    keyboard_enhancement: bool,
    mouse_capture: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("warning: file logging disabled: {:#}", e);
    }

    let mut config = Config::load(cli.config.as_deref()).await?;
    if let Some(theme) = &cli.theme {
        config.theme = theme.clone();
    }

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    // Kitty keyboard protocol lets Ctrl+Enter arrive as its own key.
    let mut keyboard_enhancement = false;
    if crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false) {
        let flags = KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
            | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES;
        keyboard_enhancement = execute!(stdout, PushKeyboardEnhancementFlags(flags)).is_ok();
    }
    let mouse_capture = execute!(stdout, EnableMouseCapture).is_ok();
    let guard = TerminalGuard {
        keyboard_enhancement,
        mouse_capture,
    };

    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run(&mut terminal, config, cli).await;

    restore_terminal(&mut terminal, &guard)?;

    if let Err(err) = res {
        error!(error = %err, "puraluce exited with an error");
        eprintln!("{:?}", err);
    }
    Ok(())
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut config: Config,
    cli: Cli,
) -> Result<()> {
    if !config.has_credentials() || cli.setup {
        match run_setup_wizard(terminal, config.clone(), cli.config.as_deref()).await? {
            Some(saved) => config = saved,
            None => {
                info!("setup cancelled");
                return Ok(());
            }
        }
    }

    let mut app = App::new(config, cli.config)?;
    run_app(terminal, &mut app).await
}

fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    guard: &TerminalGuard,
) -> Result<()> {
    disable_raw_mode()?;
    if guard.mouse_capture {
        let _ = execute!(terminal.backend_mut(), DisableMouseCapture);
    }
    if guard.keyboard_enhancement {
        let _ = execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags);
    }
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}
