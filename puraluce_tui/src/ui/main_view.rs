use chrono::Datelike;
use puraluce_core::ViewState;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::app::actions::buttons_for;
use crate::app::editor::{cursor_line, split_line_at_char};
use crate::app::state::{App, FocusArea, FooterButton};
use crate::theme::Theme;
use crate::ui::markdown::render_markdown;

const NEED_PLACEHOLDER: &str = "Es. Non trovo pace nel lavoro...";
const GUIDE_PLACEHOLDER: &str = "Es. San Giuda, Santa Rita...";

struct MainAreas {
    header: Rect,
    form: Option<(Rect, Rect)>,
    buttons: Rect,
    output: Rect,
    footer: Rect,
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let area = f.area();
    f.render_widget(Block::default().style(app.theme.base_style), area);

    let very_narrow = area.width < 70;
    let areas = main_areas(area, app.view() == &ViewState::Idle);

    render_header(f, &app.theme, areas.header, very_narrow);

    app.need_rect = None;
    app.guide_rect = None;
    if let Some((need_area, guide_area)) = areas.form {
        render_need_field(f, app, need_area);
        render_guide_field(f, app, guide_area);
    }

    render_button_bar(f, app, areas.buttons);
    render_output(f, app, areas.output);
    render_footer(f, app, areas.footer, very_narrow);
}

fn main_areas(area: Rect, form_visible: bool) -> MainAreas {
    let need_height = if area.height < 26 { 5 } else { 7 };
    let footer_height = 2;

    if form_visible {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(need_height),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(footer_height),
            ])
            .split(area);
        MainAreas {
            header: chunks[0],
            form: Some((chunks[1], chunks[2])),
            buttons: chunks[3],
            output: chunks[4],
            footer: chunks[5],
        }
    } else {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(footer_height),
            ])
            .split(area);
        MainAreas {
            header: chunks[0],
            form: None,
            buttons: chunks[1],
            output: chunks[2],
            footer: chunks[3],
        }
    }
}

fn render_header(f: &mut Frame, theme: &Theme, area: Rect, very_narrow: bool) {
    let header_text = if very_narrow {
        Line::from(Span::styled(" PURA LUCE ", theme.header_title_style))
    } else {
        Line::from(vec![
            Span::styled(" S T U D I O   P U R A   L U C E ", theme.header_title_style),
            Span::styled(" // SANTUARIO & ARTIFICIO ", theme.header_subtitle_style),
        ])
    };

    let header = Paragraph::new(header_text).style(theme.base_style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style)
            .title(" † "),
    );
    f.render_widget(header, area);
}

fn field_block(theme: &Theme, title: &'static str, focused: bool) -> Block<'static> {
    let (title_style, border_style) = if focused {
        (theme.label_focused_style, theme.label_focused_style)
    } else {
        (theme.label_style, theme.border_style)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(title, title_style))
}

fn render_need_field(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == FocusArea::Need;
    let block = field_block(&app.theme, " IL TUO TORMENTO (BISOGNO) ", focused);
    let visible_rows = block.inner(area).height.max(1) as usize;

    let caret_line = cursor_line(&app.controller.form().need, app.need_cursor);
    if caret_line < app.need_first_line {
        app.need_first_line = caret_line;
    } else if caret_line >= app.need_first_line + visible_rows {
        app.need_first_line = caret_line + 1 - visible_rows;
    }

    let need = &app.controller.form().need;
    let lines = if need.is_empty() && !focused {
        vec![placeholder_line(&app.theme, NEED_PLACEHOLDER)]
    } else {
        render_multiline_prompt(
            need,
            &app.theme,
            cursor_visible(app, focused),
            app.need_cursor,
        )
        .into_iter()
        .skip(app.need_first_line)
        .collect()
    };

    f.render_widget(
        Paragraph::new(lines).style(app.theme.base_style).block(block),
        area,
    );
    app.need_rect = Some(area);
}

fn render_guide_field(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == FocusArea::Guide;
    let block = field_block(&app.theme, " LA TUA GUIDA (FACOLTATIVO) ", focused);
    let guide = &app.controller.form().guide;

    let lines = if guide.is_empty() && !focused {
        vec![placeholder_line(&app.theme, GUIDE_PLACEHOLDER)]
    } else {
        render_multiline_prompt(
            guide,
            &app.theme,
            cursor_visible(app, focused),
            app.guide_cursor,
        )
    };

    f.render_widget(
        Paragraph::new(lines).style(app.theme.base_style).block(block),
        area,
    );
    app.guide_rect = Some(area);
}

fn cursor_visible(app: &App, focused: bool) -> bool {
    focused && (app.tick_count / 8) % 2 == 0
}

fn placeholder_line(theme: &Theme, text: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(" › ", theme.label_style),
        Span::styled(text, theme.placeholder_style),
    ])
}

fn render_multiline_prompt(
    text: &str,
    theme: &Theme,
    cursor_visible: bool,
    cursor: usize,
) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    let mut remaining = cursor;
    let mut cursor_pending = true;

    for (idx, line) in text.split('\n').enumerate() {
        let prefix = if idx == 0 {
            Span::styled(" › ", theme.label_focused_style)
        } else {
            Span::raw("   ")
        };
        let line_len = line.chars().count();

        if cursor_pending && remaining <= line_len {
            let (before, current, after) = split_line_at_char(line, remaining);
            let caret_style = if cursor_visible {
                theme.input_cursor_style
            } else {
                theme.input_text_style
            };
            let mut spans = vec![prefix, Span::styled(before, theme.input_text_style)];
            match current {
                Some(ch) => spans.push(Span::styled(ch.to_string(), caret_style)),
                None if cursor_visible => spans.push(Span::styled(" ", caret_style)),
                None => {}
            }
            spans.push(Span::styled(after, theme.input_text_style));
            out.push(Line::from(spans));
            cursor_pending = false;
        } else {
            out.push(Line::from(vec![
                prefix,
                Span::styled(line.to_string(), theme.input_text_style),
            ]));
            if cursor_pending {
                remaining = remaining.saturating_sub(line_len + 1);
            }
        }
    }
    out
}

fn render_button_bar(f: &mut Frame, app: &mut App, area: Rect) {
    let specs = buttons_for(app);
    app.footer_buttons.clear();
    if area.width == 0 || area.height == 0 {
        return;
    }
    if app.footer_focus >= specs.len() {
        app.footer_focus = 0;
    }

    let labels: Vec<String> = specs
        .iter()
        .map(|(_, label, _)| format!("[{}]", label))
        .collect();
    let constraints: Vec<Constraint> = labels
        .iter()
        .map(|label| Constraint::Length(label.chars().count() as u16))
        .collect();
    let rects = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .spacing(1)
        .split(area);

    for (i, ((action, _, enabled), rect)) in specs.into_iter().zip(rects.iter()).enumerate() {
        let style = if !enabled {
            app.theme.footer_disabled_style
        } else if app.focus == FocusArea::FooterButtons && app.footer_focus == i {
            app.theme.footer_selected_style
        } else {
            app.theme.footer_key_style
        };
        f.render_widget(Paragraph::new(labels[i].clone()).style(style), *rect);
        app.footer_buttons.push(FooterButton {
            rect: *rect,
            action,
            enabled,
        });
    }
}

fn output_title(view: &ViewState) -> &'static str {
    match view {
        ViewState::Idle => " SANTUARIO ",
        ViewState::Loading => " INTERCESSIONE ",
        ViewState::Result(_) => " ORAZIONE ",
    }
}

fn build_output_lines(app: &App) -> Vec<Line<'static>> {
    match app.view() {
        ViewState::Idle => render_intro_view(app),
        ViewState::Loading => render_loading_view(app.tick_count, &app.theme),
        ViewState::Result(markdown) => {
            let mut lines = render_markdown(markdown, &app.theme);
            lines.push(Line::from(""));
            lines.push(
                Line::from(Span::styled(
                    "─".repeat(32),
                    app.theme.md_rule_style,
                ))
                .centered(),
            );
            lines.push(
                Line::from(Span::styled(
                    format!("STUDIO PURA LUCE © {}", chrono::Local::now().year()),
                    app.theme.footer_text_style,
                ))
                .centered(),
            );
            lines
        }
    }
}

fn render_intro_view(app: &App) -> Vec<Line<'static>> {
    let theme = &app.theme;
    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("La fede è un atto di ", theme.md_text_style),
            Span::styled("volontà", theme.md_h3_style),
            Span::styled(".", theme.md_text_style),
        ])
        .centered(),
        Line::from(""),
        Line::from(Span::styled(
            "Non cercare consolazioni effimere. Cerca la pietra su cui edificare.",
            theme.label_style,
        ))
        .centered(),
        Line::from(Span::styled(
            "Descrivi il tuo tormento, e ricevi l'orazione adatta alla tua battaglia.",
            theme.label_style,
        ))
        .centered(),
        Line::from(""),
        Line::from(Span::styled(
            "TAB: campo successivo   CTRL+ENTER / CTRL+D: genera   ESC: esci",
            theme.footer_text_style,
        ))
        .centered(),
        Line::from(""),
    ];

    let recent = app.logs.len().saturating_sub(6);
    for entry in &app.logs[recent..] {
        lines.push(Line::from(vec![
            Span::styled(" · ", theme.md_bullet_style),
            Span::styled(entry.clone(), theme.processing_text_style),
        ]));
    }
    lines
}

fn render_loading_view(tick: u64, theme: &Theme) -> Vec<Line<'static>> {
    // Slow pulse on the cross while the request is out.
    let cross_style = if (tick / 6) % 2 == 0 {
        theme.processing_spinner_style
    } else {
        theme.processing_text_style
    };
    let dots = ".".repeat((tick as usize / 4) % 4);

    vec![
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled("†", cross_style)).centered(),
        Line::from(""),
        Line::from(Span::styled(
            format!("INTERCESSIONE IN CORSO{:<3}", dots),
            theme.processing_text_style,
        ))
        .centered(),
    ]
}

fn render_output(f: &mut Frame, app: &mut App, area: Rect) {
    let output_block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border_style)
        .title(Span::styled(
            output_title(app.view()),
            app.theme.header_title_style,
        ));
    let inner = output_block.inner(area);
    f.render_widget(output_block, area);
    // One column is always kept for the scrollbar so the wrap width does not
    // change once the content overflows.
    let text_area = Rect {
        width: inner.width.saturating_sub(1),
        ..inner
    };
    app.output_text_width = text_area.width;

    let para = Paragraph::new(build_output_lines(app))
        .style(app.theme.base_style)
        .wrap(Wrap { trim: false });
    let total_rows = wrapped_row_count(&para, text_area.width);
    let max_scroll = total_rows.saturating_sub(inner.height);
    let clamped_scroll = app.output_scroll.min(max_scroll);
    f.render_widget(para.scroll((clamped_scroll, 0)), text_area);

    app.output_scrollbar_rect = None;
    if max_scroll > 0 && inner.width > 1 && inner.height > 0 {
        let mut state = ScrollbarState::new(total_rows.max(1) as usize)
            .position(clamped_scroll as usize);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_style(app.theme.label_focused_style)
            .track_style(app.theme.border_style);
        f.render_stateful_widget(scrollbar, inner, &mut state);
        app.output_scrollbar_rect = Some(Rect {
            x: inner.x + inner.width - 1,
            width: 1,
            ..inner
        });
    }

    app.output_max_scroll = max_scroll;
    app.output_scroll = clamped_scroll;
}

/// Rows the paragraph occupies at `width`, using the widget's own wrapping.
fn wrapped_row_count(para: &Paragraph<'_>, width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    para.line_count(width).min(u16::MAX as usize) as u16
}

fn render_footer(f: &mut Frame, app: &mut App, area: Rect, very_narrow: bool) {
    let footer_block = Block::default()
        .borders(Borders::TOP)
        .border_style(app.theme.border_style);
    let inner = footer_block.inner(area);
    f.render_widget(footer_block, area);

    let mode = match app.view() {
        ViewState::Idle => "IDLE",
        ViewState::Loading => "LOADING",
        ViewState::Result(_) => "RESULT",
    };
    let info = Line::from(vec![
        Span::styled(" MODE: ", app.theme.footer_text_style),
        Span::styled(mode, app.theme.footer_highlight_style),
        Span::styled("  MODEL: ", app.theme.footer_text_style),
        Span::styled(app.model.clone(), app.theme.footer_highlight_style),
        Span::styled("  PROVIDER: ", app.theme.footer_text_style),
        Span::styled(app.provider_name.clone(), app.theme.footer_highlight_style),
    ]);

    let settings_label = if very_narrow { " [SET] " } else { " [SETTINGS] " };
    let settings_width = settings_label.len() as u16;
    app.settings_button_rect = None;

    if inner.width <= settings_width {
        f.render_widget(Paragraph::new(info).style(app.theme.base_style), inner);
        return;
    }

    let split = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(settings_width)])
        .split(inner);
    f.render_widget(Paragraph::new(info).style(app.theme.base_style), split[0]);

    let settings_style: Style = if app.view() == &ViewState::Idle {
        app.theme.footer_key_style
    } else {
        app.theme.footer_disabled_style
    };
    f.render_widget(Paragraph::new(settings_label).style(settings_style), split[1]);
    app.settings_button_rect = Some(split[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session_log::SessionLogger;
    use async_trait::async_trait;
    use puraluce_core::{GenerationFailure, GenerationRequest, GenerationResult, TextGenerator};
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use ratatui::Terminal;
    use std::sync::Arc;
    use std::time::Instant;

    struct Silent;

    #[async_trait]
    impl TextGenerator for Silent {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<String, GenerationFailure> {
            Ok(String::new())
        }
    }

    fn screen_text(buffer: &Buffer) -> String {
        let area = buffer.area;
        (area.y..area.y + area.height)
            .map(|y| {
                (area.x..area.x + area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn prompt_places_caret_on_second_line() {
        let theme = Theme::sanctuary();
        let lines = render_multiline_prompt("uno\ndue", &theme, true, 5);
        assert_eq!(lines.len(), 2);
        assert_eq!(line_text(&lines[1]), "   due");
        let caret = lines[1]
            .spans
            .iter()
            .find(|s| s.style == theme.input_cursor_style)
            .expect("caret span");
        assert_eq!(caret.content, "u");
    }

    #[test]
    fn caret_at_end_draws_block() {
        let theme = Theme::sanctuary();
        let lines = render_multiline_prompt("San", &theme, true, 3);
        assert_eq!(line_text(&lines[0]), " › San ");
    }

    #[test]
    fn wrapped_rows_follow_word_wrapping() {
        let line = "aaaaaaaaaaaa bbbbbbbbbbbb cccccccccc";
        let para = Paragraph::new(vec![Line::from(line), Line::from("")])
            .wrap(Wrap { trim: false });
        // Word wrapping at 21 columns needs three rows for the line, not two.
        assert_eq!(wrapped_row_count(&para, 21), 4);
        assert_eq!(wrapped_row_count(&para, 0), 0);
    }

    #[test]
    fn end_of_long_page_is_reachable_at_max_scroll() {
        let mut page = String::from("# Titolo\n\n");
        for _ in 0..8 {
            page.push_str("aaaaaaaaaaaa bbbbbbbbbbbb cccccccccc\n\n");
        }
        page.push_str("### ULTIMA");

        let mut app = App::with_generator(
            puraluce_core::Config::default(),
            Arc::new(Silent),
            SessionLogger::disabled(),
        );
        app.controller.form_mut().need = "Paura del futuro".to_string();
        app.controller.submit("m");
        app.finish_generation(GenerationResult::Success(page), Instant::now());
        app.output_scroll = u16::MAX;

        let mut terminal = Terminal::new(TestBackend::new(24, 20)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        assert!(app.output_max_scroll > 0);
        assert_eq!(app.output_scroll, app.output_max_scroll);
        let screen = screen_text(terminal.backend().buffer());
        assert!(screen.contains("ULTIMA"), "{}", screen);
        assert!(screen.contains("STUDIO PURA LUCE"), "{}", screen);
    }

    #[test]
    fn loading_view_shows_indicator() {
        let lines = render_loading_view(0, &Theme::sanctuary());
        assert!(lines.iter().any(|l| line_text(l) == "†"));
        assert!(lines
            .iter()
            .any(|l| line_text(l).starts_with("INTERCESSIONE IN CORSO")));
    }
}
