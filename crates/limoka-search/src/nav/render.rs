//! View construction. Pure functions of the session state and catalog data.

use std::collections::BTreeSet;

use limoka_config::Config;

use crate::catalog::CatalogEntry;
use crate::format::{clip, html_escape, truncate_html};
use crate::nav::params::{NavParams, Op};
use crate::nav::strings;
use crate::nav::view::{Button, Keyboard, QueryMode, View};

/// Telegram message length limit.
pub(crate) const BODY_LIMIT: usize = 4096;
/// Telegram caption length limit.
pub(crate) const CAPTION_LIMIT: usize = 1024;
const CATEGORIES_LIMIT: usize = 100;
const DESCRIPTION_LIMIT: usize = 300;
const COMMAND_DESCRIPTION_LIMIT: usize = 150;
const SHORT_NAME_LIMIT: usize = 40;
const SHORT_DESCRIPTION_LIMIT: usize = 100;
const CATEGORY_COLUMNS: usize = 3;

/// Display settings resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RenderSettings {
    pub(crate) command_prefix: String,
    pub(crate) install_command: String,
    pub(crate) base_url: String,
    pub(crate) fallback_banner: Option<String>,
    pub(crate) global_list_limit: usize,
}

impl From<&Config> for RenderSettings {
    fn from(config: &Config) -> Self {
        Self {
            command_prefix: config.display.command_prefix.clone(),
            install_command: config.display.install_command.clone(),
            base_url: config.catalog.base_url.clone(),
            fallback_banner: Some(config.display.fallback_banner_url.clone())
                .filter(|u| !u.trim().is_empty()),
            global_list_limit: config.display.global_list_limit,
        }
    }
}

/// State every control of a view carries forward.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Session<'a> {
    pub(crate) fingerprint: &'a str,
    pub(crate) query: &'a str,
    pub(crate) categories: &'a BTreeSet<String>,
}

impl<'a> Session<'a> {
    fn payload(&self, op: Op, index: usize, arg: &str) -> String {
        NavParams {
            fingerprint: self.fingerprint.to_owned(),
            op,
            index,
            categories: self.categories.clone(),
            arg: arg.to_owned(),
            query: self.query.to_owned(),
        }
        .encode()
    }

    fn button(&self, text: impl Into<String>, op: Op, index: usize) -> Button {
        Button {
            text: text.into(),
            payload: self.payload(op, index, ""),
        }
    }

    fn button_with_arg(&self, text: impl Into<String>, op: Op, arg: &str) -> Button {
        Button {
            text: text.into(),
            payload: self.payload(op, 0, arg),
        }
    }

    /// Same session without filters.
    fn unfiltered<'b>(&self, empty: &'b BTreeSet<String>) -> Session<'b>
    where
        'a: 'b,
    {
        Session {
            fingerprint: self.fingerprint,
            query: self.query,
            categories: empty,
        }
    }

    fn close_row(&self) -> Vec<Button> {
        vec![self.button(strings::BTN_CLOSE, Op::Close, 0)]
    }
}

/// Body and caption variants of a result card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Card {
    pub(crate) body: String,
    pub(crate) caption: String,
}

fn install_hint(entry: &CatalogEntry, settings: &RenderSettings) -> String {
    let path = entry.path.replace('\\', "/");
    html_escape(&format!(
        "{}{} {}{path}",
        settings.command_prefix, settings.install_command, settings.base_url
    ))
}

fn commands_block(entry: &CatalogEntry, settings: &RenderSettings) -> String {
    let mut block = String::new();
    for (command, emoji) in entry.commands.iter().zip(strings::COMMAND_EMOJI) {
        let description = command.description.as_deref().unwrap_or(strings::NO_INFO);
        let description = clip(
            description,
            COMMAND_DESCRIPTION_LIMIT,
            COMMAND_DESCRIPTION_LIMIT.saturating_sub(3),
            "…",
        );
        block.push_str(
            &strings::COMMAND_LINE
                .replace("{emoji}", emoji)
                .replace("{prefix}", &html_escape(&settings.command_prefix))
                .replace("{command}", &html_escape(command.display_name()))
                .replace("{description}", &html_escape(&description)),
        );
    }
    if entry.commands.len() > strings::COMMAND_EMOJI.len() {
        block.push_str(strings::COMMAND_OVERFLOW);
    }
    block
}

fn categories_line(categories: &BTreeSet<String>) -> String {
    if categories.is_empty() {
        return String::new();
    }
    let joined = categories
        .iter()
        .map(|c| html_escape(c))
        .collect::<Vec<_>>()
        .join(", ");
    let line = format!(
        "\n\n{}",
        strings::SELECTED_CATEGORIES.replace("{categories}", &joined)
    );
    truncate_html(&line, CATEGORIES_LIMIT)
}

/// Render the detail card of `entry`.
pub(crate) fn card(
    entry: &CatalogEntry,
    query: &str,
    categories: &BTreeSet<String>,
    settings: &RenderSettings,
) -> Card {
    let description = entry.description.as_deref().unwrap_or(strings::NO_INFO);
    let install = install_hint(entry, settings);
    let cats = categories_line(categories);
    let cats_len = cats.chars().count();

    let core = strings::FOUND
        .replace("{name}", &html_escape(&entry.name))
        .replace("{query}", &html_escape(query))
        .replace(
            "{description}",
            &html_escape(&clip(
                description,
                DESCRIPTION_LIMIT,
                DESCRIPTION_LIMIT.saturating_sub(3),
                "…",
            )),
        )
        .replace("{developer}", &html_escape(&entry.developer))
        .replace("{commands}", &commands_block(entry, settings))
        .replace("{install}", &install);
    let body = truncate_html(&core, BODY_LIMIT.saturating_sub(cats_len)) + &cats;

    let caption = if body.chars().count() <= CAPTION_LIMIT {
        body.clone()
    } else {
        let short = strings::CAPTION_SHORT
            .replace(
                "{name}",
                &html_escape(&clip(&entry.name, SHORT_NAME_LIMIT, SHORT_NAME_LIMIT, "...")),
            )
            .replace(
                "{description}",
                &html_escape(&clip(
                    description,
                    SHORT_DESCRIPTION_LIMIT,
                    SHORT_DESCRIPTION_LIMIT,
                    "…",
                )),
            )
            .replace("{developer}", &html_escape(&entry.developer))
            .replace("{install}", &install);
        let cut = short.chars().count() > CAPTION_LIMIT;
        let short = truncate_html(&short, CAPTION_LIMIT);
        let room = CAPTION_LIMIT.saturating_sub(short.chars().count());
        if !cut && room > 0 && !cats.is_empty() {
            short + &truncate_html(&cats, room)
        } else {
            short
        }
    };

    Card { body, caption }
}

/// Detail view of result `index` out of `total`.
pub(crate) fn detail_view(
    session: Session<'_>,
    entry: &CatalogEntry,
    index: usize,
    total: usize,
    banner: Option<String>,
    settings: &RenderSettings,
) -> View {
    let card = card(entry, session.query, session.categories, settings);
    let photo = banner.or_else(|| {
        session
            .categories
            .is_empty()
            .then(|| settings.fallback_banner.clone())
            .flatten()
    });

    let has_prev = index > 0;
    let has_next = index.saturating_add(1) < total;
    let mut keyboard = Keyboard::default();
    keyboard.push_row(vec![
        if has_prev {
            session.button(strings::BTN_PREV, Op::Prev, index)
        } else {
            session.button(strings::BTN_DISABLED, Op::Void, index)
        },
        session.button(
            format!("{}/{total}", index.saturating_add(1)),
            Op::Void,
            index,
        ),
        if has_next {
            session.button(strings::BTN_NEXT, Op::Next, index)
        } else {
            session.button(strings::BTN_DISABLED, Op::Void, index)
        },
    ]);
    keyboard.push_row(vec![
        session.button(strings::BTN_FILTERS, Op::FilterMenu, index),
        session.button(strings::BTN_CHANGE_QUERY, Op::ChangeQuery, index),
    ]);
    keyboard.push_row(vec![session.button(strings::BTN_GLOBAL, Op::Global, 0)]);
    keyboard.push_row(session.close_row());

    let (text, full_text) = if photo.is_some() {
        (card.caption, Some(card.body))
    } else {
        (card.body, None)
    };
    View {
        text,
        photo,
        keyboard,
        full_text,
    }
}

/// Where a not-found view leads back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NotFoundBack {
    FilterMenu,
    ChangeQuery,
    GlobalForm,
}

pub(crate) fn not_found_view(session: Session<'_>, back: NotFoundBack) -> View {
    let mut keyboard = Keyboard::default();
    keyboard.push_row(vec![match back {
        NotFoundBack::FilterMenu => session.button(strings::BTN_BACK, Op::FilterMenu, 0),
        NotFoundBack::ChangeQuery => session.button(strings::BTN_CHANGE_QUERY, Op::ChangeQuery, 0),
        NotFoundBack::GlobalForm => session.button(strings::BTN_CHANGE_QUERY, Op::GlobalForm, 0),
    }]);
    keyboard.push_row(session.close_row());
    View::text(
        truncate_html(
            &strings::NOT_FOUND.replace("{query}", &html_escape(session.query)),
            BODY_LIMIT,
        ),
        keyboard,
    )
}

pub(crate) fn too_short_view(session: Session<'_>, mode: QueryMode) -> View {
    let back = match mode {
        QueryMode::Detail => session.button(strings::BTN_CHANGE_QUERY, Op::ChangeQuery, 0),
        QueryMode::Global => session.button(strings::BTN_CHANGE_QUERY, Op::GlobalForm, 0),
    };
    let mut keyboard = Keyboard::default();
    keyboard.push_row(vec![back]);
    keyboard.push_row(session.close_row());
    View::text(strings::TOO_SHORT, keyboard)
}

pub(crate) fn start_view(session: Session<'_>) -> View {
    let mut keyboard = Keyboard::default();
    keyboard.push_row(vec![session.button_with_arg(
        strings::BTN_ENTER_QUERY,
        Op::Input,
        QueryMode::Detail.code(),
    )]);
    keyboard.push_row(vec![session.button(strings::BTN_GLOBAL, Op::GlobalForm, 0)]);
    keyboard.push_row(session.close_row());
    View::text(strings::START_FORM, keyboard)
}

pub(crate) fn enter_query_view(session: Session<'_>) -> View {
    let mut keyboard = Keyboard::default();
    keyboard.push_row(vec![session.button_with_arg(
        strings::BTN_ENTER_QUERY,
        Op::Input,
        QueryMode::Detail.code(),
    )]);
    if !session.query.trim().is_empty() {
        keyboard.push_row(vec![session.button(
            strings::BTN_BACK_TO_RESULTS,
            Op::BackToResults,
            0,
        )]);
    }
    keyboard.push_row(session.close_row());
    View::text(strings::ENTER_QUERY, keyboard)
}

pub(crate) fn global_form_view(session: Session<'_>) -> View {
    let mut keyboard = Keyboard::default();
    keyboard.push_row(vec![session.button_with_arg(
        strings::BTN_ENTER_QUERY,
        Op::Input,
        QueryMode::Global.code(),
    )]);
    keyboard.push_row(vec![session.button(strings::BTN_BACK, Op::Idle, 0)]);
    keyboard.push_row(session.close_row());
    View::text(strings::GLOBAL_FORM, keyboard)
}

pub(crate) fn filter_menu_view(session: Session<'_>) -> View {
    let selected = if session.categories.is_empty() {
        strings::NO_CATEGORY.to_owned()
    } else {
        session
            .categories
            .iter()
            .map(|c| html_escape(c))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let text = format!(
        "{}\n\n{}",
        strings::FILTER_MENU.replace("{query}", &html_escape(session.query)),
        strings::SELECTED_CATEGORIES.replace("{categories}", &selected)
    );

    let empty = BTreeSet::new();
    let mut keyboard = Keyboard::default();
    keyboard.push_row(vec![session.button(
        strings::BTN_FILTER_CATEGORY,
        Op::CategoryPicker,
        0,
    )]);
    keyboard.push_row(vec![
        session.button(strings::BTN_APPLY_FILTERS, Op::ApplyFilters, 0),
        session
            .unfiltered(&empty)
            .button(strings::BTN_CLEAR_FILTERS, Op::ClearFilters, 0),
    ]);
    keyboard.push_row(vec![session.unfiltered(&empty).button(
        strings::BTN_BACK_TO_RESULTS,
        Op::BackToResults,
        0,
    )]);
    keyboard.push_row(session.close_row());
    View::text(truncate_html(&text, BODY_LIMIT), keyboard)
}

pub(crate) fn category_picker_view(session: Session<'_>, all: &[String]) -> View {
    let mut keyboard = Keyboard::default();
    if all.is_empty() {
        keyboard.push_row(vec![session.button(strings::BTN_BACK, Op::FilterMenu, 0)]);
        keyboard.push_row(session.close_row());
        return View::text(strings::NO_CATEGORIES, keyboard);
    }

    for chunk in all.chunks(CATEGORY_COLUMNS) {
        keyboard.push_row(
            chunk
                .iter()
                .map(|category| {
                    let mut label = strings::BTN_CATEGORY.replace("{category}", category);
                    if session.categories.contains(category) {
                        label.insert_str(0, strings::BTN_SELECTED_PREFIX);
                    }
                    session.button_with_arg(label, Op::ToggleCategory, category)
                })
                .collect(),
        );
    }
    keyboard.push_row(vec![session.button(strings::BTN_BACK, Op::FilterMenu, 0)]);
    keyboard.push_row(session.close_row());

    View::text(
        truncate_html(
            &strings::SELECT_CATEGORY.replace("{query}", &html_escape(session.query)),
            BODY_LIMIT,
        ),
        keyboard,
    )
}

/// Global list over `results` (unfiltered), one button per entry.
pub(crate) fn global_list_view<'e>(
    session: Session<'_>,
    results: impl ExactSizeIterator<Item = &'e CatalogEntry>,
    limit: usize,
) -> View {
    let text = strings::GLOBAL_RESULTS
        .replace("{query}", &html_escape(session.query))
        .replace("{count}", &results.len().to_string());

    let mut keyboard = Keyboard::default();
    for (i, entry) in results.take(limit).enumerate() {
        keyboard.push_row(vec![session.button(
            format!("{}. {}", i.saturating_add(1), entry.name),
            Op::GlobalPick,
            i,
        )]);
    }
    keyboard.push_row(vec![session.button(
        strings::BTN_CHANGE_QUERY,
        Op::GlobalForm,
        0,
    )]);
    keyboard.push_row(session.close_row());
    View::text(truncate_html(&text, BODY_LIMIT), keyboard)
}
