use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::theme::Theme;

const RULE_WIDTH: usize = 24;

/// Turns a generated page into styled terminal lines. Wrapping is left to
/// the paragraph widget that displays them.
pub fn render_markdown(markdown: &str, theme: &Theme) -> Vec<Line<'static>> {
    let mut renderer = Renderer::new(theme);
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        renderer.handle(event);
    }
    renderer.finish()
}

struct Renderer<'t> {
    theme: &'t Theme,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    modifiers: Vec<Modifier>,
    heading: Option<HeadingLevel>,
    quote_depth: usize,
    // `Some(n)` for ordered lists, holding the next number.
    lists: Vec<Option<u64>>,
    item_marker: Option<String>,
    item_pad: usize,
    in_code_block: bool,
}

impl<'t> Renderer<'t> {
    fn new(theme: &'t Theme) -> Self {
        Self {
            theme,
            lines: Vec::new(),
            spans: Vec::new(),
            modifiers: Vec::new(),
            heading: None,
            quote_depth: 0,
            lists: Vec::new(),
            item_marker: None,
            item_pad: 0,
            in_code_block: false,
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    for line in text.lines() {
                        self.spans
                            .push(Span::styled(line.to_string(), self.theme.md_code_style));
                        self.flush_line();
                    }
                } else {
                    let style = self.text_style();
                    let text = if self.heading == Some(HeadingLevel::H2) {
                        text.to_uppercase()
                    } else {
                        text.to_string()
                    };
                    self.spans.push(Span::styled(text, style));
                }
            }
            Event::Code(code) => {
                self.spans
                    .push(Span::styled(code.to_string(), self.theme.md_code_style));
            }
            Event::SoftBreak => {
                let style = self.text_style();
                self.spans.push(Span::styled(" ", style));
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.lines.push(
                    Line::from(Span::styled("─".repeat(RULE_WIDTH), self.theme.md_rule_style))
                        .centered(),
                );
                self.blank_line();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_line();
                self.heading = Some(level);
            }
            Tag::BlockQuote { .. } => {
                self.flush_line();
                self.quote_depth += 1;
            }
            Tag::List(start) => {
                self.flush_line();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_line();
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{}. ", next);
                        *next += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.item_marker = Some(marker);
            }
            Tag::CodeBlock(_) => {
                self.flush_line();
                self.in_code_block = true;
            }
            Tag::Emphasis => self.modifiers.push(Modifier::ITALIC),
            Tag::Strong => self.modifiers.push(Modifier::BOLD),
            Tag::Strikethrough => self.modifiers.push(Modifier::CROSSED_OUT),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_line();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading { .. } => {
                let level = self.heading.take();
                self.flush_heading(level);
                self.blank_line();
            }
            TagEnd::BlockQuote { .. } => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 {
                    self.blank_line();
                }
            }
            TagEnd::List { .. } => {
                self.flush_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => {
                self.flush_line();
                self.item_marker = None;
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.blank_line();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.modifiers.pop();
            }
            _ => {}
        }
    }

    fn text_style(&self) -> Style {
        let base = match self.heading {
            Some(HeadingLevel::H1) => self.theme.md_h1_style,
            Some(HeadingLevel::H2) => self.theme.md_h2_style,
            Some(_) => self.theme.md_h3_style,
            None if self.quote_depth > 0 => self.theme.md_quote_style,
            None => self.theme.md_text_style,
        };
        self.modifiers
            .iter()
            .fold(base, |style, modifier| style.add_modifier(*modifier))
    }

    fn prefix(&mut self) -> Vec<Span<'static>> {
        let mut prefix: Vec<Span<'static>> = (0..self.quote_depth)
            .map(|_| Span::styled("  │ ", self.theme.md_quote_bar_style))
            .collect();
        if !self.lists.is_empty() {
            prefix.push(Span::raw("  ".repeat(self.lists.len())));
            match self.item_marker.take() {
                Some(marker) => {
                    self.item_pad = marker.chars().count();
                    prefix.push(Span::styled(marker, self.theme.md_bullet_style));
                }
                // Continuation lines align under the item text.
                None => prefix.push(Span::raw(" ".repeat(self.item_pad))),
            }
        }
        prefix
    }

    fn flush_line(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut spans = self.prefix();
        spans.append(&mut self.spans);
        self.lines.push(Line::from(spans));
    }

    fn flush_heading(&mut self, level: Option<HeadingLevel>) {
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        let line = Line::from(spans);
        self.lines.push(match level {
            Some(HeadingLevel::H1) => line.centered(),
            _ => line,
        });
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}
