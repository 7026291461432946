use puraluce_core::ProviderKind;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::setup::state::{SetupApp, SetupState};

/// Keeps the last four characters visible.
pub fn mask_api_key(raw: &str) -> String {
    let value = raw.trim();
    let len = value.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let suffix: String = value.chars().skip(len - 4).collect();
    format!("{}{}", "*".repeat(len - 4), suffix)
}

pub fn setup_ui(f: &mut Frame, app: &SetupApp) {
    f.render_widget(Block::default().style(app.theme.base_style), f.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(f.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(" S T U D I O   P U R A   L U C E ", app.theme.header_title_style),
        Span::styled(" //  CONFIGURAZIONE ", app.theme.header_subtitle_style),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.theme.border_style),
    );
    f.render_widget(header, chunks[0]);

    match &app.state {
        SetupState::ProviderSelection => render_provider_list(f, app, chunks[1]),
        SetupState::Confirm => render_confirm_table(f, app, chunks[1]),
        state => {
            let body = Paragraph::new(step_lines(app, state))
                .block(setup_block(app))
                .wrap(Wrap { trim: false });
            f.render_widget(body, chunks[1]);
        }
    }

    let hint = match app.state {
        SetupState::Welcome => "ENTER: Begin   ESC: Quit",
        SetupState::ProviderSelection => "↑/↓: Choose   ENTER: Next   ESC: Cancel",
        SetupState::ApiKeyEntry | SetupState::ModelEntry => {
            "ENTER: Next   CTRL+U: Clear   ESC: Back"
        }
        SetupState::Confirm => "ENTER/Y: Save   N/ESC: Back",
        SetupState::Error(_) => "ENTER/ESC: Back to provider selection",
    };
    let footer = Paragraph::new(Span::styled(hint, app.theme.footer_text_style)).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(app.theme.border_style),
    );
    f.render_widget(footer, chunks[2]);
}

fn setup_block(app: &SetupApp) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border_style)
        .title(" SETUP ")
}

fn step_lines(app: &SetupApp, state: &SetupState) -> Vec<Line<'static>> {
    let title = |text: &str| Line::from(Span::styled(text.to_string(), app.theme.header_title_style));
    let kind = app.selected_kind();

    match state {
        SetupState::Welcome => vec![
            Line::from(""),
            title("BENVENUTO NEL SANTUARIO"),
            Line::from(""),
            Line::from(Span::styled(
                "Choose the model provider that will write the pages.",
                app.theme.header_subtitle_style,
            )),
            Line::from(""),
            Line::from(Span::styled("[PRESS ENTER TO BEGIN]", app.theme.input_cursor_style)),
        ],
        SetupState::ApiKeyEntry => {
            let shown = if app.api_key.is_empty() && app.env_key_available() {
                "(from environment)".to_string()
            } else if app.api_key.is_empty() {
                "_".to_string()
            } else {
                mask_api_key(&app.api_key)
            };
            vec![
                title("STEP 2: API KEY"),
                Line::from(""),
                Line::from(format!("Provider: {}", kind.display_name())),
                Line::from(format!("Endpoint: {}", endpoint_for(app, kind))),
                Line::from(""),
                Line::from("API Key:"),
                Line::from(vec![
                    Span::styled(" › ", app.theme.label_focused_style),
                    Span::styled(shown, app.theme.input_text_style),
                ]),
            ]
        }
        SetupState::ModelEntry => vec![
            title("STEP 3: MODEL"),
            Line::from(""),
            Line::from(format!("Provider: {}", kind.display_name())),
            Line::from(Span::styled(
                format!("Default: {}", display_or_none(kind.default_model())),
                app.theme.header_subtitle_style,
            )),
            Line::from(""),
            Line::from("Model:"),
            Line::from(vec![
                Span::styled(" › ", app.theme.label_focused_style),
                Span::styled(app.model.clone(), app.theme.input_text_style),
                Span::styled(" ", app.theme.input_cursor_style),
            ]),
        ],
        SetupState::Error(message) => vec![
            Line::from(""),
            Line::from(Span::styled("SETUP ERROR", app.theme.error_style)),
            Line::from(""),
            Line::from(message.clone()),
        ],
        SetupState::ProviderSelection | SetupState::Confirm => Vec::new(),
    }
}

fn render_provider_list(f: &mut Frame, app: &SetupApp, area: Rect) {
    let block = setup_block(app);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![
        Line::from(Span::styled("STEP 1: PROVIDER", app.theme.header_title_style)),
        Line::from(""),
    ];
    for (idx, kind) in ProviderKind::ALL.iter().enumerate() {
        let selected = idx == app.selected_provider_idx;
        let style = if selected {
            app.theme.footer_selected_style
        } else {
            app.theme.header_subtitle_style
        };
        lines.push(Line::from(Span::styled(
            format!(
                "{}{:<8} {}",
                if selected { " ▸ " } else { "   " },
                kind.display_name(),
                kind.default_base_url()
            ),
            style,
        )));
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn render_confirm_table(f: &mut Frame, app: &SetupApp, area: Rect) {
    let block = setup_block(app);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(6),
            Constraint::Min(1),
        ])
        .split(inner);

    f.render_widget(
        Paragraph::new(Span::styled("STEP 4: CONFIRM", app.theme.header_title_style)),
        layout[0],
    );

    let kind = app.selected_kind();
    let key_display = if app.selected_requires_key() {
        mask_api_key(&app.api_key)
    } else {
        "N/A".to_string()
    };
    let header = Row::new(vec![Cell::from("FIELD"), Cell::from("VALUE")])
        .style(app.theme.footer_text_style.add_modifier(Modifier::BOLD));
    let rows = vec![
        Row::new(vec![Cell::from("PROVIDER"), Cell::from(kind.display_name())]),
        Row::new(vec![Cell::from("ENDPOINT"), Cell::from(endpoint_for(app, kind))]),
        Row::new(vec![Cell::from("API KEY"), Cell::from(key_display)]),
        Row::new(vec![Cell::from("MODEL"), Cell::from(app.model.trim().to_string())]),
        Row::new(vec![Cell::from("THEME"), Cell::from(app.config.theme.clone())]),
    ]
    .into_iter()
    .map(|row| row.style(app.theme.header_subtitle_style))
    .collect::<Vec<_>>();

    let table = Table::new(rows, [Constraint::Length(10), Constraint::Min(20)])
        .header(header)
        .column_spacing(1);
    f.render_widget(table, layout[1]);

    f.render_widget(
        Paragraph::new(Span::styled(
            "Save and apply? [Y/N]",
            app.theme.label_focused_style,
        )),
        layout[2],
    );
}

fn endpoint_for(app: &SetupApp, kind: ProviderKind) -> String {
    if app.base_url.trim().is_empty() {
        kind.default_base_url().to_string()
    } else {
        app.base_url.trim().to_string()
    }
}

fn display_or_none(value: &str) -> &str {
    if value.is_empty() {
        "(none)"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_keeps_only_suffix() {
        assert_eq!(mask_api_key("AIzaSyABCDEF1234"), "************1234");
        assert_eq!(mask_api_key("abc"), "***");
        assert_eq!(mask_api_key("  "), "");
    }
}
