use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::Stdout;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use puraluce_core::Config;

use crate::setup::state::{SetupApp, SetupState};
use crate::setup::view::setup_ui;

/// First-run flow, starting from the welcome screen. `Ok(None)` means the
/// user backed out.
pub async fn run_setup_wizard(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    config: Config,
    path: Option<&Path>,
) -> Result<Option<Config>> {
    run_setup_flow(terminal, config, path, true).await
}

pub async fn run_settings_panel(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    config: Config,
    path: Option<&Path>,
) -> Result<Option<Config>> {
    run_setup_flow(terminal, config, path, false).await
}

async fn run_setup_flow(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    config: Config,
    path: Option<&Path>,
    show_welcome: bool,
) -> Result<Option<Config>> {
    let mut app = SetupApp::new(config, show_welcome);

    loop {
        if app.dirty {
            terminal.draw(|f| setup_ui(f, &app))?;
            app.dirty = false;
        }

        if !event::poll(Duration::from_millis(220))? {
            continue;
        }
        let key = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key,
            Event::Paste(text) => {
                if let Some(field) = app.active_input_mut() {
                    field.push_str(text.trim());
                    app.dirty = true;
                }
                continue;
            }
            Event::Resize(_, _) => {
                app.dirty = true;
                continue;
            }
            _ => continue,
        };
        app.dirty = true;

        if key.code == KeyCode::Esc {
            if !app.back() {
                return Ok(None);
            }
            continue;
        }

        match app.state {
            SetupState::Welcome => {
                if key.code == KeyCode::Enter {
                    app.state = SetupState::ProviderSelection;
                }
            }
            SetupState::ProviderSelection => match key.code {
                KeyCode::Up | KeyCode::Left => app.select_previous(),
                KeyCode::Down | KeyCode::Right => app.select_next(),
                KeyCode::Enter => app.confirm_provider(),
                _ => {}
            },
            SetupState::ApiKeyEntry | SetupState::ModelEntry => match key.code {
                KeyCode::Enter => {
                    if app.state == SetupState::ApiKeyEntry {
                        app.confirm_api_key();
                    } else {
                        app.confirm_model();
                    }
                }
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    if let Some(field) = app.active_input_mut() {
                        field.clear();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(field) = app.active_input_mut() {
                        field.push(c);
                    }
                }
                KeyCode::Backspace => {
                    if let Some(field) = app.active_input_mut() {
                        field.pop();
                    }
                }
                _ => {}
            },
            SetupState::Confirm => match key.code {
                KeyCode::Enter | KeyCode::Char('y') => {
                    let saved = app.save(path).await?;
                    info!(provider = ?saved.provider.kind, model = %saved.provider.model, "configuration saved");
                    return Ok(Some(saved));
                }
                KeyCode::Char('n') => app.state = SetupState::ModelEntry,
                _ => {}
            },
            SetupState::Error(_) => {
                if key.code == KeyCode::Enter {
                    app.state = SetupState::ProviderSelection;
                }
            }
        }
    }
}
