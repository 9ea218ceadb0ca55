//! User-facing text (Telegram HTML).
//!
//! Placeholders are substituted with `str::replace`; every substituted value
//! is escaped by the caller unless noted.

pub(crate) const NOT_FOUND: &str = "😔 Not found by query: <i>{query}</i>";
pub(crate) const TOO_SHORT: &str = "🤔 Request too short / not found";
pub(crate) const NO_INFO: &str = "No information";
pub(crate) const SESSION_EXPIRED: &str = "Session expired. Please search again.";
pub(crate) const FIRST_PAGE: &str = "This is the first page!";
pub(crate) const LAST_PAGE: &str = "This is the last page!";

pub(crate) const WAIT: &str = "🔎 A search is underway among {count} modules for the query: \
<code>{query}</code>\n\n<i>{fact}</i>";
pub(crate) const FACTS: &[&str] = &[
    "The limoka catalog is carefully moderated!",
    "Limoka performance allows you to search for modules quickly!",
    "Every remote install is verified against the publisher's signature.",
];

pub(crate) const START_FORM: &str = "<b>Limoka Search</b>\n\nEnter your query to search for modules:";
pub(crate) const GLOBAL_FORM: &str =
    "<b>Global Search</b>\n\nEnter your query to search ALL modules without filters:";
pub(crate) const ENTER_QUERY: &str = "🔍 Enter new search query:";
pub(crate) const ENTER_GLOBAL_QUERY: &str = "🌍 Enter a global search query:";

pub(crate) const FOUND: &str = "🔎 Found module <b>{name}</b> by query: <b>{query}</b>\n\n\
<b>ℹ️ Description:</b> {description}\n<b>🧑‍💻 Developer:</b> {developer}\n\n\
{commands}\n🪄 <code>{install}</code>";
pub(crate) const CAPTION_SHORT: &str = "🔍 <b>{name}</b>\n<b>ℹ️ Description:</b> {description}\n\
<b>🧑‍💻 Dev:</b> {developer}\n\n🪄 <code>{install}</code>";
pub(crate) const COMMAND_LINE: &str = "{emoji} <code>{prefix}{command}</code> — {description}\n";
pub(crate) const COMMAND_EMOJI: &[&str] = &["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣"];
pub(crate) const COMMAND_OVERFLOW: &str = "…\n";

pub(crate) const SELECTED_CATEGORIES: &str = "✅ Selected categories: {categories}";
pub(crate) const NO_CATEGORY: &str = "No category";
pub(crate) const FILTER_MENU: &str = "🏷 <b>Filters</b> for query: <code>{query}</code>";
pub(crate) const SELECT_CATEGORY: &str =
    "📂 Select categories for query: <code>{query}</code>\n(You can select multiple)";
pub(crate) const NO_CATEGORIES: &str = "No categories found in the module database";
pub(crate) const GLOBAL_RESULTS: &str = "🌍 Global search for <b>{query}</b> — found <b>{count}</b> modules";

pub(crate) const HISTORY: &str = "<b>Your search history:</b>\n{history}";
pub(crate) const HISTORY_EMPTY: &str = "<b>Your search history is empty!</b>";
pub(crate) const HISTORY_CLEARED: &str = "<b>Search history cleared!</b>";
pub(crate) const HISTORY_USAGE: &str = "<b>Invalid argument for history command. Use:</b>\n\
<code>/lshistory</code> - show history\n<code>/lshistory clear</code> - clear history";
pub(crate) const HISTORY_UNAVAILABLE: &str = "⚠️ Search history is unavailable right now.";

pub(crate) const BTN_PREV: &str = "⏪";
pub(crate) const BTN_NEXT: &str = "⏩";
pub(crate) const BTN_DISABLED: &str = "🚫";
pub(crate) const BTN_FILTERS: &str = "🔍 Choose filters";
pub(crate) const BTN_CHANGE_QUERY: &str = "🔄 Change query";
pub(crate) const BTN_GLOBAL: &str = "🌍 Results";
pub(crate) const BTN_CLOSE: &str = "❌ Close";
pub(crate) const BTN_BACK: &str = "🔙 Back";
pub(crate) const BTN_ENTER_QUERY: &str = "✍️ Enter new search query";
pub(crate) const BTN_FILTER_CATEGORY: &str = "📑 Filter by Category";
pub(crate) const BTN_APPLY_FILTERS: &str = "✅ Apply Filters";
pub(crate) const BTN_CLEAR_FILTERS: &str = "🗑 Clear Filters";
pub(crate) const BTN_BACK_TO_RESULTS: &str = "🔙 Back to Results";
pub(crate) const BTN_CATEGORY: &str = "📁 {category}";
pub(crate) const BTN_SELECTED_PREFIX: &str = "✅ ";
