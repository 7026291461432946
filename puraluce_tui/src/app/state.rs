use anyhow::Result;
use puraluce_core::{
    run_generation, Config, Controller, GenerationResult, LlmClient, TextGenerator, ViewState,
};
use ratatui::layout::Rect;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::app::editor::char_count;
use crate::app::session_log::SessionLogger;
use crate::theme::Theme;

/// Delay between the result being shown and the view jumping to it.
pub const SCROLL_INTO_VIEW_DELAY: Duration = Duration::from_millis(100);

const MAX_LOG_LINES: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusArea {
    Need,
    Guide,
    FooterButtons,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FooterAction {
    Submit,
    ClearInput,
    NewRequest,
    Settings,
    Quit,
}

#[derive(Clone, Debug)]
pub struct FooterButton {
    pub rect: Rect,
    pub action: FooterAction,
    pub enabled: bool,
}

pub struct App {
    pub controller: Controller,
    pub generator: Arc<dyn TextGenerator>,
    pub model: String,
    pub provider_name: String,
    pub need_cursor: usize,
    pub guide_cursor: usize,
    pub need_first_line: usize,
    pub focus: FocusArea,
    pub footer_buttons: Vec<FooterButton>,
    pub footer_focus: usize,
    pub output_scroll: u16,
    pub output_max_scroll: u16,
    pub output_text_width: u16,
    pub output_scrollbar_rect: Option<Rect>,
    pub need_rect: Option<Rect>,
    pub guide_rect: Option<Rect>,
    pub settings_button_rect: Option<Rect>,
    pub generation_rx: Option<oneshot::Receiver<GenerationResult>>,
    pub pending_scroll: Option<Instant>,
    pub logs: Vec<String>,
    pub tick_count: u64,
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub theme: Theme,
    pub pending_open_settings: bool,
    pub dirty: bool,
    pub session_logger: SessionLogger,
}

impl App {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Result<Self> {
        let client = LlmClient::from_config(&config)?;
        let model = client.model().to_string();
        let provider_name = client.provider_name().to_string();

        let mut app = Self::with_generator(config, Arc::new(client), SessionLogger::new());
        app.model = model;
        app.provider_name = provider_name;
        app.config_path = config_path;
        if let Some(path) = app.session_logger.display_path() {
            app.push_log(format!("Session log file: {}", path));
        }
        Ok(app)
    }

    pub fn with_generator(
        config: Config,
        generator: Arc<dyn TextGenerator>,
        session_logger: SessionLogger,
    ) -> Self {
        let provider = config.effective_provider();
        let mut app = Self {
            controller: Controller::new(),
            generator,
            model: provider.model.clone(),
            provider_name: provider.kind.display_name().to_string(),
            need_cursor: 0,
            guide_cursor: 0,
            need_first_line: 0,
            focus: FocusArea::Need,
            footer_buttons: Vec::new(),
            footer_focus: 0,
            output_scroll: 0,
            output_max_scroll: 0,
            output_text_width: 0,
            output_scrollbar_rect: None,
            need_rect: None,
            guide_rect: None,
            settings_button_rect: None,
            generation_rx: None,
            pending_scroll: None,
            logs: Vec::new(),
            tick_count: 0,
            theme: Theme::from_config(&config.theme),
            config,
            config_path: None,
            pending_open_settings: false,
            dirty: true,
            session_logger,
        };
        app.push_log("Santuario pronto. Scrivi il tuo tormento.");
        app
    }

    /// Swaps in a freshly saved configuration. The runtime only calls this
    /// when no request is in flight.
    pub fn apply_config(&mut self, config: Config) -> Result<()> {
        let client = LlmClient::from_config(&config)?;
        self.model = client.model().to_string();
        self.provider_name = client.provider_name().to_string();
        self.generator = Arc::new(client);
        self.theme = Theme::from_config(&config.theme);
        self.config = config;
        self.dirty = true;
        Ok(())
    }

    pub fn view(&self) -> &ViewState {
        self.controller.view()
    }

    pub fn is_processing_state(&self) -> bool {
        self.controller.is_loading()
    }

    /// Hands the request to a background task. Does nothing if the need is
    /// blank or a request is already running.
    pub fn submit(&mut self) {
        let Some(request) = self.controller.submit(&self.model) else {
            return;
        };

        self.push_log(format!(
            "Richiesta inviata ({} caratteri)",
            char_count(self.controller.form().need.trim())
        ));
        self.log_block("REQUEST_USER_MESSAGE", &request.user_message);

        let generator = Arc::clone(&self.generator);
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = run_generation(generator.as_ref(), &request).await;
            let _ = tx.send(result);
        });

        self.generation_rx = Some(rx);
        self.pending_scroll = None;
        self.output_scroll = 0;
        self.focus = FocusArea::FooterButtons;
        self.footer_focus = 0;
        self.dirty = true;
    }

    /// Non-blocking check on the in-flight request.
    pub fn poll_generation(&mut self) {
        let Some(rx) = &mut self.generation_rx else {
            return;
        };

        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => {
                GenerationResult::Failure("La richiesta si è interrotta.".to_string())
            }
        };
        self.generation_rx = None;
        self.finish_generation(result, Instant::now());
    }

    pub fn finish_generation(&mut self, result: GenerationResult, now: Instant) {
        match &result {
            GenerationResult::Success(text) => {
                self.push_log(format!("Pagina ricevuta ({} caratteri)", char_count(text)));
                self.log_block("GENERATED_PAGE", text);
            }
            GenerationResult::Failure(message) => {
                self.push_log(format!("Generazione fallita: {}", message));
                self.log_block("GENERATION_ERROR", message);
            }
        }

        if let Some(resolution) = self.controller.resolve(result) {
            if resolution.scroll_into_view {
                // The page is drawn first; the hook moves the view onto it.
                self.pending_scroll = Some(now + SCROLL_INTO_VIEW_DELAY);
            } else {
                self.pending_scroll = None;
                self.show_result_top();
            }
        }
        self.dirty = true;
    }

    /// Post-render hook for a successful page: once the delay has elapsed,
    /// the view jumps to the top of the page and the keyboard lands on
    /// "new request". Returns `true` when it fired.
    pub fn apply_pending_scroll(&mut self, now: Instant) -> bool {
        match self.pending_scroll {
            Some(deadline) if now >= deadline => {
                self.pending_scroll = None;
                self.show_result_top();
                true
            }
            _ => false,
        }
    }

    fn show_result_top(&mut self) {
        self.output_scroll = 0;
        self.focus = FocusArea::FooterButtons;
        self.footer_focus = 0;
        self.dirty = true;
    }

    /// Back to the form. Fields keep what was typed.
    pub fn reset(&mut self) {
        if !matches!(self.view(), ViewState::Result(_)) {
            return;
        }
        self.controller.reset();
        self.pending_scroll = None;
        self.output_scroll = 0;
        self.need_cursor = char_count(&self.controller.form().need);
        self.guide_cursor = char_count(&self.controller.form().guide);
        self.focus = FocusArea::Need;
        self.footer_focus = 0;
        self.push_log("Nuova richiesta.");
        self.dirty = true;
    }

    pub fn clear_input(&mut self) {
        if self.view() != &ViewState::Idle {
            return;
        }
        let form = self.controller.form_mut();
        form.need.clear();
        form.guide.clear();
        self.need_cursor = 0;
        self.guide_cursor = 0;
        self.need_first_line = 0;
        self.focus = FocusArea::Need;
        self.dirty = true;
    }

    /// The field under keyboard focus with its cursor, if editing is allowed.
    pub fn focused_field_mut(&mut self) -> Option<(&mut String, &mut usize)> {
        if self.controller.view() != &ViewState::Idle {
            return None;
        }
        match self.focus {
            FocusArea::Need => Some((&mut self.controller.form_mut().need, &mut self.need_cursor)),
            FocusArea::Guide => {
                Some((&mut self.controller.form_mut().guide, &mut self.guide_cursor))
            }
            FocusArea::FooterButtons => None,
        }
    }

    pub fn cycle_focus(&mut self, backwards: bool) {
        if self.view() != &ViewState::Idle {
            self.focus = FocusArea::FooterButtons;
            if !self.footer_buttons.is_empty() {
                let len = self.footer_buttons.len();
                self.footer_focus = if backwards {
                    (self.footer_focus + len - 1) % len
                } else {
                    (self.footer_focus + 1) % len
                };
            }
            return;
        }

        self.focus = match (self.focus, backwards) {
            (FocusArea::Need, false) => FocusArea::Guide,
            (FocusArea::Guide, false) => FocusArea::FooterButtons,
            (FocusArea::FooterButtons, false) => FocusArea::Need,
            (FocusArea::Need, true) => FocusArea::FooterButtons,
            (FocusArea::Guide, true) => FocusArea::Need,
            (FocusArea::FooterButtons, true) => FocusArea::Guide,
        };
        self.footer_focus = 0;
    }

    pub fn push_log<S: Into<String>>(&mut self, message: S) {
        let message = message.into();
        self.session_logger.event("LOG", &message);
        self.logs.push(message);
        if self.logs.len() > MAX_LOG_LINES {
            let overflow = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(0..overflow);
        }
    }

    pub fn log_block(&self, label: &str, body: &str) {
        self.session_logger.block(label, body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use puraluce_core::{GenerationFailure, GenerationRequest};
    use std::sync::Mutex;

    struct FakeGenerator {
        reply: Result<String, GenerationFailure>,
        seen: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        fn replying(reply: Result<String, GenerationFailure>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<String, GenerationFailure> {
            self.seen
                .lock()
                .unwrap()
                .push(request.user_message.clone());
            self.reply.clone()
        }
    }

    fn app_with(generator: Arc<FakeGenerator>) -> App {
        App::with_generator(Config::default(), generator, SessionLogger::disabled())
    }

    async fn wait_for_result(app: &mut App) {
        for _ in 0..200 {
            app.poll_generation();
            if !app.is_processing_state() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("generation never resolved");
    }

    #[tokio::test]
    async fn full_cycle_shows_page_and_schedules_scroll() {
        let generator = FakeGenerator::replying(Ok("# La Pietra\n\nTesto".to_string()));
        let mut app = app_with(generator.clone());
        app.controller.form_mut().need = "Non trovo pace nel lavoro".to_string();

        app.submit();
        assert!(app.is_processing_state());
        assert!(app.generation_rx.is_some());

        wait_for_result(&mut app).await;
        assert_eq!(
            app.view(),
            &ViewState::Result("# La Pietra\n\nTesto".to_string())
        );
        assert!(app.generation_rx.is_none());
        assert!(app.pending_scroll.is_some());
        assert_eq!(generator.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_shows_error_page_without_scroll() {
        let generator = FakeGenerator::replying(Err(GenerationFailure::new("timeout")));
        let mut app = app_with(generator);
        app.controller.form_mut().need = "Paura del futuro".to_string();

        app.submit();
        wait_for_result(&mut app).await;

        let content = app.controller.content();
        assert!(content.starts_with("# Errore nel Santuario"));
        assert!(content.contains("timeout"));
        assert!(app.pending_scroll.is_none());
    }

    #[tokio::test]
    async fn blank_need_never_reaches_generator() {
        let generator = FakeGenerator::replying(Ok("# x".to_string()));
        let mut app = app_with(generator.clone());
        app.controller.form_mut().need = "   ".to_string();

        app.submit();
        tokio::time::sleep(Duration::from_millis(20)).await;
        app.poll_generation();

        assert_eq!(app.view(), &ViewState::Idle);
        assert!(generator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_task_resolves_as_failure() {
        let generator = FakeGenerator::replying(Ok("# x".to_string()));
        let mut app = app_with(generator);
        app.controller.form_mut().need = "Paura del futuro".to_string();
        app.controller.submit("m");

        let (tx, rx) = oneshot::channel::<GenerationResult>();
        drop(tx);
        app.generation_rx = Some(rx);
        app.poll_generation();

        assert!(app.controller.content().contains("interrotta"));
    }

    #[tokio::test]
    async fn scroll_hook_fires_only_after_delay() {
        let mut app = app_with(FakeGenerator::replying(Ok(String::new())));
        app.controller.form_mut().need = "Paura del futuro".to_string();
        app.controller.submit("m");
        app.focus = FocusArea::Need;
        app.footer_focus = 1;
        app.output_scroll = 7;

        let start = Instant::now();
        app.finish_generation(GenerationResult::Success("# Titolo".to_string()), start);

        // Before the delay the page is shown but the view has not moved.
        assert!(!app.apply_pending_scroll(start + Duration::from_millis(50)));
        assert_eq!(app.output_scroll, 7);
        assert_eq!(app.focus, FocusArea::Need);

        assert!(app.apply_pending_scroll(start + SCROLL_INTO_VIEW_DELAY));
        assert_eq!(app.output_scroll, 0);
        assert_eq!(app.focus, FocusArea::FooterButtons);
        assert_eq!(app.footer_focus, 0);
        assert!(app.pending_scroll.is_none());
        assert!(!app.apply_pending_scroll(start + SCROLL_INTO_VIEW_DELAY * 2));
    }

    #[tokio::test]
    async fn failure_page_is_shown_at_once_without_hook() {
        let mut app = app_with(FakeGenerator::replying(Ok(String::new())));
        app.controller.form_mut().need = "Paura del futuro".to_string();
        app.controller.submit("m");
        app.output_scroll = 7;

        app.finish_generation(GenerationResult::Failure("timeout".to_string()), Instant::now());
        assert!(app.pending_scroll.is_none());
        assert_eq!(app.output_scroll, 0);
        assert_eq!(app.focus, FocusArea::FooterButtons);
    }

    #[tokio::test]
    async fn reset_returns_to_form_with_text_kept() {
        let mut app = app_with(FakeGenerator::replying(Ok(String::new())));
        app.controller.form_mut().need = "Paura del futuro".to_string();
        app.controller.form_mut().guide = "San Giuda".to_string();
        app.controller.submit("m");
        app.finish_generation(GenerationResult::Success("# Titolo".to_string()), Instant::now());

        app.reset();
        assert_eq!(app.view(), &ViewState::Idle);
        assert_eq!(app.controller.content(), "");
        assert_eq!(app.focus, FocusArea::Need);
        assert_eq!(app.need_cursor, char_count("Paura del futuro"));
        assert!(app.pending_scroll.is_none());
    }

    #[test]
    fn focus_cycles_through_form_and_buttons() {
        let mut app = app_with(FakeGenerator::replying(Ok(String::new())));
        assert_eq!(app.focus, FocusArea::Need);
        app.cycle_focus(false);
        assert_eq!(app.focus, FocusArea::Guide);
        app.cycle_focus(false);
        assert_eq!(app.focus, FocusArea::FooterButtons);
        app.cycle_focus(false);
        assert_eq!(app.focus, FocusArea::Need);
        app.cycle_focus(true);
        assert_eq!(app.focus, FocusArea::FooterButtons);
    }

    #[test]
    fn log_buffer_is_bounded() {
        let mut app = app_with(FakeGenerator::replying(Ok(String::new())));
        for i in 0..(MAX_LOG_LINES + 20) {
            app.push_log(format!("line {}", i));
        }
        assert_eq!(app.logs.len(), MAX_LOG_LINES);
        assert_eq!(app.logs.last().map(String::as_str), Some("line 519"));
    }
}
