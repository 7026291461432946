use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    // Base
    pub base_style: Style,
    pub border_style: Style,
    // Header
    pub header_title_style: Style,
    pub header_subtitle_style: Style,
    // Form
    pub label_style: Style,
    pub label_focused_style: Style,
    pub input_text_style: Style,
    pub input_cursor_style: Style,
    pub placeholder_style: Style,
    // Loading
    pub processing_spinner_style: Style,
    pub processing_text_style: Style,
    // Buttons + status line
    pub footer_text_style: Style,
    pub footer_highlight_style: Style,
    pub footer_key_style: Style,
    pub footer_selected_style: Style,
    pub footer_disabled_style: Style,
    // Rendered markdown
    pub md_h1_style: Style,
    pub md_h2_style: Style,
    pub md_h3_style: Style,
    pub md_text_style: Style,
    pub md_quote_style: Style,
    pub md_quote_bar_style: Style,
    pub md_bullet_style: Style,
    pub md_code_style: Style,
    pub md_rule_style: Style,
    // Alerts
    pub error_style: Style,
}

impl Theme {
    pub fn from_config(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "dark" => Self::dark(),
            "light" => Self::light(),
            "auto" => match dark_light::detect() {
                dark_light::Mode::Light => Self::light(),
                dark_light::Mode::Dark | dark_light::Mode::Default => Self::sanctuary(),
            },
            _ => Self::sanctuary(),
        }
    }

    /// Stone background with amber accents.
    pub fn sanctuary() -> Self {
        let stone_950 = Color::Rgb(12, 10, 9);
        let stone_800 = Color::Rgb(41, 37, 36);
        let stone_600 = Color::Rgb(87, 83, 78);
        let stone_500 = Color::Rgb(120, 113, 108);
        let stone_400 = Color::Rgb(168, 162, 158);
        let stone_300 = Color::Rgb(214, 211, 209);
        let stone_200 = Color::Rgb(231, 229, 228);
        let amber_500 = Color::Rgb(245, 158, 11);
        let amber_700 = Color::Rgb(180, 83, 9);
        let amber_900 = Color::Rgb(120, 53, 15);
        let red_alert = Color::Rgb(220, 80, 60);

        Self {
            base_style: Style::default().fg(stone_300).bg(stone_950),
            border_style: Style::default().fg(stone_800),

            header_title_style: Style::default().fg(amber_700).add_modifier(Modifier::BOLD),
            header_subtitle_style: Style::default().fg(stone_600),

            label_style: Style::default().fg(stone_500),
            label_focused_style: Style::default().fg(amber_700).add_modifier(Modifier::BOLD),
            input_text_style: Style::default().fg(stone_200),
            input_cursor_style: Style::default()
                .bg(amber_700)
                .fg(stone_950)
                .add_modifier(Modifier::RAPID_BLINK),
            placeholder_style: Style::default().fg(stone_800),

            processing_spinner_style: Style::default().fg(amber_900).add_modifier(Modifier::BOLD),
            processing_text_style: Style::default().fg(stone_600),

            footer_text_style: Style::default().fg(stone_600),
            footer_highlight_style: Style::default().fg(amber_700),
            footer_key_style: Style::default().fg(stone_300).bg(stone_800),
            footer_selected_style: Style::default()
                .fg(stone_950)
                .bg(amber_700)
                .add_modifier(Modifier::BOLD),
            footer_disabled_style: Style::default().fg(stone_600).bg(stone_950),

            md_h1_style: Style::default().fg(amber_500).add_modifier(Modifier::BOLD),
            md_h2_style: Style::default()
                .fg(stone_400)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            md_h3_style: Style::default().fg(amber_700).add_modifier(Modifier::ITALIC),
            md_text_style: Style::default().fg(stone_300),
            md_quote_style: Style::default().fg(stone_400).add_modifier(Modifier::ITALIC),
            md_quote_bar_style: Style::default().fg(amber_900),
            md_bullet_style: Style::default().fg(amber_900),
            md_code_style: Style::default().fg(amber_500).bg(stone_800),
            md_rule_style: Style::default().fg(stone_800),

            error_style: Style::default().fg(red_alert),
        }
    }

    pub fn light() -> Self {
        let text_main = Color::Black;
        let text_dim = Color::DarkGray;
        let accent = Color::Rgb(146, 64, 14);
        let red_alert = Color::Red;

        Self {
            base_style: Style::default().fg(text_main),
            border_style: Style::default().fg(text_dim),

            header_title_style: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            header_subtitle_style: Style::default().fg(text_dim),

            label_style: Style::default().fg(text_dim),
            label_focused_style: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            input_text_style: Style::default().fg(text_main),
            input_cursor_style: Style::default()
                .bg(accent)
                .fg(Color::White)
                .add_modifier(Modifier::RAPID_BLINK),
            placeholder_style: Style::default().fg(Color::Gray),

            processing_spinner_style: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            processing_text_style: Style::default().fg(text_dim),

            footer_text_style: Style::default().fg(text_dim),
            footer_highlight_style: Style::default().fg(accent),
            footer_key_style: Style::default().fg(Color::White).bg(text_dim),
            footer_selected_style: Style::default()
                .fg(Color::White)
                .bg(accent)
                .add_modifier(Modifier::BOLD),
            footer_disabled_style: Style::default().fg(Color::Gray),

            md_h1_style: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            md_h2_style: Style::default()
                .fg(text_dim)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            md_h3_style: Style::default().fg(accent).add_modifier(Modifier::ITALIC),
            md_text_style: Style::default().fg(text_main),
            md_quote_style: Style::default().fg(text_dim).add_modifier(Modifier::ITALIC),
            md_quote_bar_style: Style::default().fg(accent),
            md_bullet_style: Style::default().fg(accent),
            md_code_style: Style::default().fg(accent),
            md_rule_style: Style::default().fg(Color::Gray),

            error_style: Style::default().fg(red_alert),
        }
    }

    pub fn dark() -> Self {
        let amber = Color::Rgb(255, 176, 0);
        let amber_dim = Color::Rgb(150, 110, 0);
        let bg = Color::Rgb(14, 12, 10);
        let red_alert = Color::Rgb(255, 80, 80);

        Self {
            base_style: Style::default().fg(amber).bg(bg),
            border_style: Style::default().fg(amber_dim),

            header_title_style: Style::default().fg(amber).add_modifier(Modifier::BOLD),
            header_subtitle_style: Style::default().fg(amber_dim),

            label_style: Style::default().fg(amber_dim),
            label_focused_style: Style::default().fg(amber).add_modifier(Modifier::BOLD),
            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default()
                .bg(amber)
                .fg(bg)
                .add_modifier(Modifier::RAPID_BLINK),
            placeholder_style: Style::default().fg(Color::DarkGray),

            processing_spinner_style: Style::default().fg(amber).add_modifier(Modifier::BOLD),
            processing_text_style: Style::default().fg(amber),

            footer_text_style: Style::default().fg(amber_dim),
            footer_highlight_style: Style::default().fg(amber),
            footer_key_style: Style::default().fg(bg).bg(amber),
            footer_selected_style: Style::default()
                .fg(Color::Blue)
                .bg(Color::Rgb(190, 190, 190))
                .add_modifier(Modifier::BOLD),
            footer_disabled_style: Style::default().fg(amber_dim).bg(bg),

            md_h1_style: Style::default().fg(amber).add_modifier(Modifier::BOLD),
            md_h2_style: Style::default()
                .fg(amber)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            md_h3_style: Style::default().fg(amber).add_modifier(Modifier::ITALIC),
            md_text_style: Style::default().fg(Color::White),
            md_quote_style: Style::default().fg(amber_dim).add_modifier(Modifier::ITALIC),
            md_quote_bar_style: Style::default().fg(amber),
            md_bullet_style: Style::default().fg(amber),
            md_code_style: Style::default().fg(bg).bg(amber_dim),
            md_rule_style: Style::default().fg(amber_dim),

            error_style: Style::default().fg(red_alert),
        }
    }
}
