//! Helpers shared by the integration tests.

use limoka_search::nav::{Button, NavOutcome, View};

pub const BTN_NEXT: &str = "⏩";
pub const BTN_PREV: &str = "⏪";
pub const BTN_DISABLED: &str = "🚫";
pub const BTN_FILTERS: &str = "🔍 Choose filters";
pub const BTN_FILTER_CATEGORY: &str = "📑 Filter by Category";
pub const BTN_APPLY_FILTERS: &str = "✅ Apply Filters";
pub const BTN_BACK: &str = "🔙 Back";
pub const BTN_CHANGE_QUERY: &str = "🔄 Change query";
pub const SESSION_EXPIRED: &str = "Session expired. Please search again.";

/// The rendered view of `outcome`.
#[allow(dead_code)]
pub fn view(outcome: &NavOutcome) -> &View {
    outcome
        .view()
        .unwrap_or_else(|| panic!("expected a rendered view, got {outcome:?}"))
}

/// The button labelled `text`.
#[allow(dead_code)]
pub fn button<'a>(outcome: &'a NavOutcome, text: &str) -> &'a Button {
    view(outcome)
        .keyboard
        .find(text)
        .unwrap_or_else(|| panic!("no button {text:?} in {outcome:?}"))
}

/// The `i/N` counter of a detail view.
#[allow(dead_code)]
pub fn counter(outcome: &NavOutcome) -> &str {
    &view(outcome).keyboard.rows[0][1].text
}

/// The notice text of `outcome`.
#[allow(dead_code)]
pub fn notice(outcome: &NavOutcome) -> &str {
    match outcome {
        NavOutcome::Notice(text) => text,
        other => panic!("expected a notice, got {other:?}"),
    }
}
