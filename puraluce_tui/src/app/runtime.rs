use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use puraluce_core::ViewState;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::Stdout;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::app::actions::perform_footer_action;
use crate::app::editor::{
    delete_char_at_cursor, delete_char_before_cursor, insert_char_at_cursor, insert_str_at_cursor,
    move_cursor_down, move_cursor_left, move_cursor_line_end, move_cursor_line_start,
    move_cursor_right, move_cursor_up, point_in_rect, set_cursor_from_click,
};
use crate::app::state::{App, FocusArea, FooterAction};
use crate::setup::runtime::run_settings_panel;
use crate::ui::main_view::ui;

pub async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        advance_state_and_settings(terminal, app).await?;

        if app.dirty || app.is_processing_state() {
            terminal.draw(|f| ui(f, app))?;
            app.dirty = false;
        }

        // Post-render hook: the result has been drawn at least once.
        app.apply_pending_scroll(Instant::now());

        let poll_ms = if app.is_processing_state() || app.pending_scroll.is_some() {
            50
        } else {
            200
        };
        if event::poll(Duration::from_millis(poll_ms))? {
            app.dirty = true;
            if handle_runtime_event(app, event::read()?)? {
                return Ok(());
            }
        }
    }
}

async fn advance_state_and_settings(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> Result<()> {
    app.tick_count += 1;
    if app.tick_count % 8 == 0 {
        // Caret blink.
        app.dirty = true;
    }
    app.poll_generation();

    if !app.pending_open_settings {
        return Ok(());
    }
    app.pending_open_settings = false;

    if app.view() != &ViewState::Idle {
        app.push_log("Impostazioni disponibili solo dal modulo.");
        return Ok(());
    }

    let path = app.config_path.clone();
    match run_settings_panel(terminal, app.config.clone(), path.as_deref()).await {
        Ok(Some(new_config)) => match app.apply_config(new_config) {
            Ok(()) => app.push_log("Impostazioni aggiornate."),
            Err(e) => {
                warn!(error = %e, "settings could not be applied");
                app.push_log(format!("Impostazioni non applicate: {}", e));
            }
        },
        Ok(None) => {}
        Err(e) => {
            let msg = e.to_string();
            warn!(error = %msg, "settings update failed");
            app.push_log(format!("Salvataggio impostazioni fallito: {}", msg));
            app.log_block("SETTINGS_ERROR", &msg);
        }
    }
    app.dirty = true;
    Ok(())
}

fn handle_runtime_event(app: &mut App, event: Event) -> Result<bool> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key_press(app, key),
        Event::Paste(text) => {
            handle_paste(app, &text);
            Ok(false)
        }
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        _ => Ok(false),
    }
}

fn handle_key_press(app: &mut App, key: KeyEvent) -> Result<bool> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Ok(true);
    }

    let editing = app.view() == &ViewState::Idle && app.focus != FocusArea::FooterButtons;

    if !editing && scroll_output(app, key.code) {
        return Ok(false);
    }

    match key.code {
        KeyCode::Tab => {
            app.cycle_focus(false);
            return Ok(false);
        }
        KeyCode::BackTab => {
            app.cycle_focus(true);
            return Ok(false);
        }
        KeyCode::Left | KeyCode::Right if app.focus == FocusArea::FooterButtons => {
            let len = app.footer_buttons.len();
            if len > 0 {
                app.footer_focus = if key.code == KeyCode::Left {
                    (app.footer_focus + len - 1) % len
                } else {
                    (app.footer_focus + 1) % len
                };
            }
            return Ok(false);
        }
        KeyCode::Enter | KeyCode::Char(' ') if app.focus == FocusArea::FooterButtons => {
            let pressed = app
                .footer_buttons
                .get(app.footer_focus)
                .filter(|b| b.enabled)
                .map(|b| b.action);
            if let Some(action) = pressed {
                return perform_footer_action(app, action);
            }
            return Ok(false);
        }
        _ => {}
    }

    match app.view() {
        ViewState::Idle => handle_form_key(app, key),
        ViewState::Loading => Ok(false),
        ViewState::Result(_) => match key.code {
            KeyCode::Esc | KeyCode::Char('n') => {
                perform_footer_action(app, FooterAction::NewRequest)
            }
            KeyCode::Char('q') => Ok(true),
            _ => Ok(false),
        },
    }
}

fn handle_form_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => return Ok(true),
        KeyCode::Enter if ctrl => return perform_footer_action(app, FooterAction::Submit),
        KeyCode::Char('d') if ctrl => return perform_footer_action(app, FooterAction::Submit),
        KeyCode::Char('u') if ctrl => return perform_footer_action(app, FooterAction::ClearInput),
        // The guide is a single-line field; Enter there submits the form.
        KeyCode::Enter if app.focus == FocusArea::Guide => {
            return perform_footer_action(app, FooterAction::Submit)
        }
        _ => {}
    }

    let Some((text, cursor)) = app.focused_field_mut() else {
        return Ok(false);
    };
    match key.code {
        KeyCode::Enter => insert_char_at_cursor(text, cursor, '\n'),
        KeyCode::Char(c) if !ctrl => insert_char_at_cursor(text, cursor, c),
        KeyCode::Backspace => delete_char_before_cursor(text, cursor),
        KeyCode::Delete => delete_char_at_cursor(text, cursor),
        KeyCode::Left => move_cursor_left(cursor),
        KeyCode::Right => move_cursor_right(text, cursor),
        KeyCode::Up => move_cursor_up(text, cursor),
        KeyCode::Down => move_cursor_down(text, cursor),
        KeyCode::Home => move_cursor_line_start(text, cursor),
        KeyCode::End => move_cursor_line_end(text, cursor),
        _ => {}
    }
    Ok(false)
}

/// Returns `true` if the key moved the output pane.
fn scroll_output(app: &mut App, code: KeyCode) -> bool {
    app.output_scroll = match code {
        KeyCode::Up => app.output_scroll.saturating_sub(1),
        KeyCode::Down => app.output_scroll.saturating_add(1),
        KeyCode::PageUp => app.output_scroll.saturating_sub(10),
        KeyCode::PageDown => app.output_scroll.saturating_add(10),
        KeyCode::Home => 0,
        KeyCode::End => app.output_max_scroll,
        _ => return false,
    };
    true
}

fn handle_paste(app: &mut App, text: &str) {
    let single_line = app.focus == FocusArea::Guide;
    let Some((field, cursor)) = app.focused_field_mut() else {
        return;
    };
    let normalized = text.replace("\r\n", "\n");
    if single_line {
        insert_str_at_cursor(field, cursor, &normalized.replace('\n', " "));
    } else {
        insert_str_at_cursor(field, cursor, &normalized);
    }
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> Result<bool> {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.output_scroll = app.output_scroll.saturating_sub(3);
        }
        MouseEventKind::ScrollDown => {
            app.output_scroll = app.output_scroll.saturating_add(3);
        }
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Down(MouseButton::Left) => {
            if let Some(sb) = app.output_scrollbar_rect {
                if app.output_max_scroll > 0 && point_in_rect(sb, mouse.column, mouse.row) {
                    let track_h = sb.height.max(1);
                    let rel = mouse.row.saturating_sub(sb.y).min(track_h - 1);
                    let denom = track_h.saturating_sub(1).max(1) as u32;
                    let new_scroll = ((rel as u32) * (app.output_max_scroll as u32) / denom) as u16;
                    app.output_scroll = new_scroll.min(app.output_max_scroll);
                    return Ok(false);
                }
            }

            if matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
                return handle_click(app, mouse.column, mouse.row);
            }
        }
        _ => {}
    }

    Ok(false)
}

fn handle_click(app: &mut App, col: u16, row: u16) -> Result<bool> {
    if let Some(rect) = app.settings_button_rect {
        if point_in_rect(rect, col, row) {
            return perform_footer_action(app, FooterAction::Settings);
        }
    }

    let clicked = app
        .footer_buttons
        .iter()
        .enumerate()
        .find(|(_, btn)| point_in_rect(btn.rect, col, row))
        .map(|(idx, btn)| (idx, btn.action, btn.enabled));
    if let Some((idx, action, enabled)) = clicked {
        app.focus = FocusArea::FooterButtons;
        app.footer_focus = idx;
        if enabled {
            return perform_footer_action(app, action);
        }
        return Ok(false);
    }

    if app.view() != &ViewState::Idle {
        return Ok(false);
    }
    if let Some(area) = app.need_rect.filter(|r| point_in_rect(*r, col, row)) {
        app.focus = FocusArea::Need;
        let first_line = app.need_first_line;
        let form = app.controller.form_mut();
        set_cursor_from_click(&form.need, &mut app.need_cursor, area, first_line, col, row);
    } else if let Some(area) = app.guide_rect.filter(|r| point_in_rect(*r, col, row)) {
        app.focus = FocusArea::Guide;
        let form = app.controller.form_mut();
        set_cursor_from_click(&form.guide, &mut app.guide_cursor, area, 0, col, row);
    }
    Ok(false)
}
