use tracing::{debug, info};

use crate::generation::GenerationResult;
use crate::prompt::GenerationRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub guide: String,
    pub need: String,
}

impl FormInput {
    pub fn has_need(&self) -> bool {
        !self.need.trim().is_empty()
    }

    /// The guide, if the visitor actually named one.
    pub fn guide(&self) -> Option<&str> {
        let trimmed = self.guide.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewState {
    #[default]
    Idle,
    Loading,
    Result(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Set for successful generations; the UI brings the result into view.
    pub scroll_into_view: bool,
}

#[derive(Debug, Default)]
pub struct Controller {
    form: FormInput,
    view: ViewState,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &FormInput {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormInput {
        &mut self.form
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn content(&self) -> &str {
        match &self.view {
            ViewState::Result(content) => content,
            ViewState::Idle | ViewState::Loading => "",
        }
    }

    pub fn is_loading(&self) -> bool {
        self.view == ViewState::Loading
    }

    pub fn can_submit(&self) -> bool {
        self.view == ViewState::Idle && self.form.has_need()
    }

    /// Moves Idle -> Loading and hands back the request to dispatch.
    /// Returns `None` without touching state when the need is empty or a
    /// request is already in flight.
    pub fn submit(&mut self, model: &str) -> Option<GenerationRequest> {
        if !self.can_submit() {
            debug!(view = ?self.view, "submit ignored");
            return None;
        }

        let request = GenerationRequest::new(model, &self.form);
        self.view = ViewState::Loading;
        info!(
            need_chars = self.form.need.trim().chars().count(),
            guide = self.form.guide().is_some(),
            "submission accepted"
        );
        Some(request)
    }

    pub fn resolve(&mut self, result: GenerationResult) -> Option<Resolution> {
        if self.view != ViewState::Loading {
            debug!(view = ?self.view, "late generation result dropped");
            return None;
        }

        let scroll_into_view = result.is_success();
        self.view = ViewState::Result(result.into_markdown());
        Some(Resolution { scroll_into_view })
    }

    /// Result -> Idle. The form keeps what was typed.
    pub fn reset(&mut self) {
        if matches!(self.view, ViewState::Result(_)) {
            self.view = ViewState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "gemini-3-flash-preview";

    fn controller_with(need: &str, guide: &str) -> Controller {
        let mut controller = Controller::new();
        controller.form_mut().need = need.to_string();
        controller.form_mut().guide = guide.to_string();
        controller
    }

    #[test]
    fn empty_need_blocks_submission() {
        for need in ["", "   ", "\n\t"] {
            let mut controller = controller_with(need, "Santa Rita");
            assert!(!controller.can_submit());
            assert!(controller.submit(MODEL).is_none());
            assert_eq!(controller.view(), &ViewState::Idle);
        }
    }

    #[test]
    fn submit_enters_loading_before_resolution() {
        let mut controller = controller_with("Non trovo pace nel lavoro", "");
        let request = controller.submit(MODEL).expect("request");
        assert_eq!(controller.view(), &ViewState::Loading);
        assert_eq!(controller.content(), "");
        assert!(request.user_message.contains("Scegli tu il Santo"));
    }

    #[test]
    fn second_submit_while_loading_is_inert() {
        let mut controller = controller_with("Paura del futuro", "San Giuda");
        assert!(controller.submit(MODEL).is_some());
        assert!(controller.submit(MODEL).is_none());
        assert!(controller.is_loading());
    }

    #[test]
    fn success_lands_in_result_and_requests_scroll() {
        let mut controller = controller_with("Non trovo pace nel lavoro", "");
        controller.submit(MODEL);
        let markdown = "# La Pietra del Lavoro\n\nIntroduzione.";
        let resolution = controller
            .resolve(GenerationResult::Success(markdown.to_string()))
            .expect("resolution");
        assert!(resolution.scroll_into_view);
        assert_eq!(controller.view(), &ViewState::Result(markdown.to_string()));
        assert!(controller.content().lines().any(|l| l.starts_with("# ")));
    }

    #[test]
    fn failure_lands_in_result_with_message() {
        let mut controller = controller_with("Paura del futuro", "");
        controller.submit(MODEL);
        let resolution = controller
            .resolve(GenerationResult::Failure("timeout".to_string()))
            .expect("resolution");
        assert!(!resolution.scroll_into_view);
        assert!(!controller.is_loading());
        assert!(controller.content().contains("timeout"));
    }

    #[test]
    fn results_outside_loading_are_dropped() {
        let mut controller = controller_with("Paura del futuro", "");
        assert!(controller
            .resolve(GenerationResult::Success("# x".to_string()))
            .is_none());
        assert_eq!(controller.view(), &ViewState::Idle);
    }

    #[test]
    fn reset_clears_content_and_keeps_form() {
        let mut controller = controller_with("Paura del futuro", "San Giuda");
        controller.submit(MODEL);
        controller.resolve(GenerationResult::Success("# Titolo".to_string()));

        controller.reset();
        assert_eq!(controller.view(), &ViewState::Idle);
        assert_eq!(controller.content(), "");
        assert_eq!(controller.form().guide, "San Giuda");

        controller.reset();
        assert_eq!(controller.view(), &ViewState::Idle);
    }

    #[test]
    fn reset_does_not_abandon_loading() {
        let mut controller = controller_with("Paura del futuro", "");
        controller.submit(MODEL);
        controller.reset();
        assert!(controller.is_loading());
    }

    #[test]
    fn new_cycle_builds_an_independent_request() {
        let mut controller = controller_with("Paura del futuro", "San Giuda");
        let first = controller.submit(MODEL).unwrap();
        controller.resolve(GenerationResult::Success("# Uno".to_string()));
        controller.reset();

        controller.form_mut().need = "Non trovo pace nel lavoro".to_string();
        controller.form_mut().guide.clear();
        let second = controller.submit(MODEL).unwrap();

        assert_ne!(first.user_message, second.user_message);
        assert!(!second.user_message.contains("San Giuda"));
        assert!(!second.user_message.contains("Paura del futuro"));
        assert!(second.user_message.contains("Non trovo pace nel lavoro"));
        assert_eq!(controller.content(), "");
    }
}
