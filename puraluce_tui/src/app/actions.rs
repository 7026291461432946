use anyhow::Result;
use puraluce_core::ViewState;

use crate::app::state::{App, FooterAction};

/// Returns `Ok(true)` when the app should exit.
pub fn perform_footer_action(app: &mut App, action: FooterAction) -> Result<bool> {
    match action {
        FooterAction::Quit => return Ok(true),
        FooterAction::Settings => {
            if app.view() == &ViewState::Idle {
                app.pending_open_settings = true;
            } else {
                app.push_log("Impostazioni disponibili solo dal modulo.");
            }
        }
        FooterAction::Submit => app.submit(),
        FooterAction::ClearInput => app.clear_input(),
        FooterAction::NewRequest => app.reset(),
    }

    app.dirty = true;
    Ok(false)
}

/// The buttons shown under the form for each view.
pub fn buttons_for(app: &App) -> Vec<(FooterAction, &'static str, bool)> {
    match app.view() {
        ViewState::Idle => vec![
            (
                FooterAction::Submit,
                " GENERA ORAZIONE ",
                app.controller.can_submit(),
            ),
            (FooterAction::ClearInput, " CANCELLA ", true),
            (FooterAction::Quit, " ESCI ", true),
        ],
        ViewState::Loading => vec![(FooterAction::Quit, " ESCI ", true)],
        ViewState::Result(_) => vec![
            (FooterAction::NewRequest, " ← NUOVA RICHIESTA ", true),
            (FooterAction::Quit, " ESCI ", true),
        ],
    }
}
