//! Control payload codec.
//!
//! Navigation keeps no server-side session. Every control carries the whole
//! state it needs:
//!
//! ```text
//! v1|<fp8>|<op>|<index>|<categories>|<arg>|<query>
//! ```
//!
//! `fp8` identifies the catalog snapshot the result list was computed from.
//! Categories are comma-separated; categories and `arg` escape `%`, `,` and
//! `|`. The query comes last and is stored verbatim, so it may contain any
//! character.

use std::collections::BTreeSet;

use crate::error::NavError;

/// Payload format tag.
pub const PAYLOAD_VERSION: &str = "v1";

const FIELD_COUNT: usize = 7;

/// Navigation operation carried by a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Inert control (page counter, disabled arrows).
    Void,
    /// Show the next result.
    Next,
    /// Show the previous result.
    Prev,
    /// Open the filter menu.
    FilterMenu,
    /// Open the category picker.
    CategoryPicker,
    /// Toggle the category in `arg`.
    ToggleCategory,
    /// Show the results filtered by the selected categories.
    ApplyFilters,
    /// Drop all filters and show the results.
    ClearFilters,
    /// Leave the filter menu for the unfiltered results.
    BackToResults,
    /// Show the global results list.
    Global,
    /// Open the result at `index` of the global list.
    GlobalPick,
    /// Show the "enter new query" form.
    ChangeQuery,
    /// Show the global search form.
    GlobalForm,
    /// Ask for free text; `arg` is the query mode.
    Input,
    /// Show the start form.
    Idle,
    /// Remove the interactive message.
    Close,
}

impl Op {
    const ALL: [Self; 16] = [
        Self::Void,
        Self::Next,
        Self::Prev,
        Self::FilterMenu,
        Self::CategoryPicker,
        Self::ToggleCategory,
        Self::ApplyFilters,
        Self::ClearFilters,
        Self::BackToResults,
        Self::Global,
        Self::GlobalPick,
        Self::ChangeQuery,
        Self::GlobalForm,
        Self::Input,
        Self::Idle,
        Self::Close,
    ];

    /// Wire code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Void => "v",
            Self::Next => "n",
            Self::Prev => "p",
            Self::FilterMenu => "f",
            Self::CategoryPicker => "c",
            Self::ToggleCategory => "t",
            Self::ApplyFilters => "a",
            Self::ClearFilters => "x",
            Self::BackToResults => "b",
            Self::Global => "g",
            Self::GlobalPick => "s",
            Self::ChangeQuery => "q",
            Self::GlobalForm => "o",
            Self::Input => "i",
            Self::Idle => "h",
            Self::Close => "z",
        }
    }

    /// Parse a wire code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.code() == code)
    }

    /// Whether the operation reads the result list and therefore must match
    /// the live catalog snapshot.
    #[must_use]
    pub const fn reads_results(self) -> bool {
        !matches!(
            self,
            Self::Void | Self::ChangeQuery | Self::GlobalForm | Self::Input | Self::Idle | Self::Close
        )
    }
}

/// Decoded control payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavParams {
    /// Abbreviated catalog fingerprint.
    pub fingerprint: String,
    /// Operation.
    pub op: Op,
    /// Current (or target) position in the result list.
    pub index: usize,
    /// Selected categories.
    pub categories: BTreeSet<String>,
    /// Operation argument (toggled category, query mode).
    pub arg: String,
    /// Active query.
    pub query: String,
}

impl NavParams {
    /// Encode to the wire format.
    #[must_use]
    pub fn encode(&self) -> String {
        let categories: Vec<String> = self.categories.iter().map(|c| escape(c)).collect();
        format!(
            "{PAYLOAD_VERSION}|{}|{}|{}|{}|{}|{}",
            self.fingerprint,
            self.op.code(),
            self.index,
            categories.join(","),
            escape(&self.arg),
            self.query
        )
    }

    /// Decode from the wire format.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Malformed`] for a wrong version, field count,
    /// operation code or index.
    pub fn decode(payload: &str) -> Result<Self, NavError> {
        let fields: Vec<&str> = payload.splitn(FIELD_COUNT, '|').collect();
        let [version, fingerprint, op, index, categories, arg, query] = fields.as_slice() else {
            return Err(NavError::Malformed(format!(
                "expected {FIELD_COUNT} fields, got {}",
                fields.len()
            )));
        };

        if *version != PAYLOAD_VERSION {
            return Err(NavError::Malformed(format!("unknown version '{version}'")));
        }
        let op = Op::from_code(op)
            .ok_or_else(|| NavError::Malformed(format!("unknown operation '{op}'")))?;
        let index = index
            .parse::<usize>()
            .map_err(|_| NavError::Malformed(format!("bad index '{index}'")))?;
        let categories = categories
            .split(',')
            .filter(|c| !c.is_empty())
            .map(unescape)
            .collect();

        Ok(Self {
            fingerprint: (*fingerprint).to_owned(),
            op,
            index,
            categories,
            arg: unescape(arg),
            query: (*query).to_owned(),
        })
    }
}

fn escape(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace(',', "%2C")
        .replace('|', "%7C")
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let (decoded, consumed) = match tail.get(..3) {
            Some("%25") => ('%', 3),
            Some("%2C") => (',', 3),
            Some("%7C") => ('|', 3),
            _ => ('%', 1),
        };
        out.push(decoded);
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}
