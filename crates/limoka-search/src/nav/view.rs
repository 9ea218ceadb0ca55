//! Transport-neutral view model.
//!
//! The navigation layer produces plain data; the chat frontend turns a
//! [`View`] into a message with an inline keyboard.

use serde::{Deserialize, Serialize};

use crate::nav::strings;

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Label.
    pub text: String,
    /// Encoded control payload.
    pub payload: String,
}

/// Rows of buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    /// Button rows, top to bottom.
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Append a row; empty rows are dropped.
    pub fn push_row(&mut self, row: Vec<Button>) {
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    /// Every button, row by row.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    /// First button whose label equals `text`.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<&Button> {
        self.buttons().find(|b| b.text == text)
    }
}

/// A rendered screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// HTML text (a caption when `photo` is set).
    pub text: String,
    /// Image URL to attach.
    pub photo: Option<String>,
    /// Inline keyboard.
    pub keyboard: Keyboard,
    /// Full HTML body when `text` is a shortened caption.
    pub full_text: Option<String>,
}

impl View {
    /// A text-only view.
    #[must_use]
    pub fn text(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            photo: None,
            keyboard,
            full_text: None,
        }
    }

    /// Text to send when the view goes out without its photo.
    #[must_use]
    pub fn text_without_photo(&self) -> &str {
        self.full_text.as_deref().unwrap_or(&self.text)
    }
}

/// What a free-text reply will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryMode {
    /// Restart at the first detailed result.
    Detail,
    /// Show the global results list.
    Global,
}

impl QueryMode {
    /// Prompt shown to the user. Also identifies the mode of a reply.
    #[must_use]
    pub const fn prompt_text(self) -> &'static str {
        match self {
            Self::Detail => strings::ENTER_QUERY,
            Self::Global => strings::ENTER_GLOBAL_QUERY,
        }
    }

    /// Mode whose prompt is `text`.
    #[must_use]
    pub fn from_prompt(text: &str) -> Option<Self> {
        [Self::Detail, Self::Global]
            .into_iter()
            .find(|m| m.prompt_text() == text.trim())
    }

    pub(crate) const fn code(self) -> &'static str {
        match self {
            Self::Detail => "d",
            Self::Global => "g",
        }
    }

    pub(crate) fn from_code(code: &str) -> Option<Self> {
        match code {
            "d" => Some(Self::Detail),
            "g" => Some(Self::Global),
            _ => None,
        }
    }
}

/// Result of a navigation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// Replace the interactive message with this view.
    Render(View),
    /// Show a transient notice; the view is unchanged. Empty text means a
    /// silent acknowledgement.
    Notice(String),
    /// Ask the user for free text.
    Prompt(QueryMode),
    /// Remove the interactive message.
    Close,
}

impl NavOutcome {
    /// The rendered view, if any.
    #[must_use]
    pub fn view(&self) -> Option<&View> {
        match self {
            Self::Render(view) => Some(view),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_text_round_trip() {
        for mode in [QueryMode::Detail, QueryMode::Global] {
            assert_eq!(QueryMode::from_prompt(mode.prompt_text()), Some(mode));
            assert_eq!(QueryMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(QueryMode::from_prompt("hello"), None);
    }

    #[test]
    fn empty_rows_are_dropped() {
        let mut kb = Keyboard::default();
        kb.push_row(Vec::new());
        kb.push_row(vec![Button {
            text: "a".into(),
            payload: "p".into(),
        }]);
        assert_eq!(kb.rows.len(), 1);
        assert_eq!(kb.find("a").unwrap().payload, "p");
        assert!(kb.find("b").is_none());
    }

    #[test]
    fn text_without_photo_prefers_full_body() {
        let mut view = View::text("caption", Keyboard::default());
        assert_eq!(view.text_without_photo(), "caption");
        view.full_text = Some("whole body".into());
        assert_eq!(view.text_without_photo(), "whole body");
    }
}
