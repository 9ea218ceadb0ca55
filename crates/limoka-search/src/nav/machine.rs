//! Navigation state machine.
//!
//! Every transition is a pure function of the decoded payload and the live
//! snapshot; no per-message state is kept server side.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::banner::BannerResolver;
use crate::error::NavError;
use crate::index::{SearchEngine, Snapshot};
use crate::nav::params::{NavParams, Op};
use crate::nav::render::{self, NotFoundBack, RenderSettings, Session};
use crate::nav::strings;
use crate::nav::view::{NavOutcome, QueryMode};

/// Result of opening a query from a top-level command.
#[derive(Debug)]
pub(crate) struct Opened {
    pub(crate) outcome: NavOutcome,
    pub(crate) found: bool,
}

/// Drives result navigation over the engine's live snapshot.
pub(crate) struct Navigator {
    engine: Arc<SearchEngine>,
    banners: Arc<BannerResolver>,
    settings: RenderSettings,
}

impl Navigator {
    pub(crate) fn new(
        engine: Arc<SearchEngine>,
        banners: Arc<BannerResolver>,
        settings: RenderSettings,
    ) -> Self {
        Self {
            engine,
            banners,
            settings,
        }
    }

    /// The idle start form.
    pub(crate) fn start(&self) -> NavOutcome {
        let snapshot = self.engine.snapshot();
        let fingerprint = snapshot.catalog().short_fingerprint();
        let empty = BTreeSet::new();
        NavOutcome::Render(render::start_view(Session {
            fingerprint: &fingerprint,
            query: "",
            categories: &empty,
        }))
    }

    /// Show the first result for `query`, or the start form when it is blank.
    pub(crate) async fn open(&self, query: &str) -> Opened {
        let query = query.trim();
        if query.is_empty() {
            return Opened {
                outcome: self.start(),
                found: false,
            };
        }
        let snapshot = self.engine.snapshot();
        let results = self.results(&snapshot, query, &BTreeSet::new());
        let found = !results.is_empty();
        let outcome = self
            .show_detail(
                &snapshot,
                query,
                &BTreeSet::new(),
                &results,
                0,
                NotFoundBack::ChangeQuery,
            )
            .await;
        Opened { outcome, found }
    }

    /// Handle a query typed in answer to a prompt.
    pub(crate) async fn submit(&self, mode: QueryMode, text: &str) -> NavOutcome {
        let query = text.trim();
        let snapshot = self.engine.snapshot();
        let fingerprint = snapshot.catalog().short_fingerprint();
        let empty = BTreeSet::new();
        let session = Session {
            fingerprint: &fingerprint,
            query,
            categories: &empty,
        };

        if query.chars().count() <= 1 {
            return NavOutcome::Render(render::too_short_view(session, mode));
        }
        match mode {
            QueryMode::Detail => {
                let results = self.results(&snapshot, query, &empty);
                self.show_detail(
                    &snapshot,
                    query,
                    &empty,
                    &results,
                    0,
                    NotFoundBack::ChangeQuery,
                )
                .await
            },
            QueryMode::Global => self.global_list(&snapshot, query),
        }
    }

    /// Apply a control payload.
    pub(crate) async fn handle(&self, payload: &str) -> NavOutcome {
        let params = match NavParams::decode(payload) {
            Ok(params) => params,
            Err(e) => {
                debug!(error = %e, "rejecting control payload");
                return NavOutcome::Notice(strings::SESSION_EXPIRED.to_owned());
            },
        };

        let snapshot = self.engine.snapshot();
        let live = snapshot.catalog().short_fingerprint();
        if params.op.reads_results() && params.fingerprint != live {
            let e = NavError::Expired {
                found: params.fingerprint,
                live,
            };
            debug!(error = %e, "rejecting control payload");
            return NavOutcome::Notice(strings::SESSION_EXPIRED.to_owned());
        }

        let NavParams {
            op,
            index,
            mut categories,
            arg,
            query,
            ..
        } = params;
        let session = Session {
            fingerprint: &live,
            query: &query,
            categories: &categories,
        };

        match op {
            Op::Void => NavOutcome::Notice(String::new()),
            Op::Close => NavOutcome::Close,
            Op::Idle => NavOutcome::Render(render::start_view(session)),
            Op::GlobalForm => NavOutcome::Render(render::global_form_view(session)),
            Op::ChangeQuery => NavOutcome::Render(render::enter_query_view(session)),
            Op::Input => QueryMode::from_code(&arg).map_or_else(
                || NavOutcome::Notice(strings::SESSION_EXPIRED.to_owned()),
                NavOutcome::Prompt,
            ),
            Op::FilterMenu => NavOutcome::Render(render::filter_menu_view(session)),
            Op::CategoryPicker => NavOutcome::Render(render::category_picker_view(
                session,
                &snapshot.catalog().categories(),
            )),
            Op::ToggleCategory => {
                if !categories.remove(&arg) && !arg.is_empty() {
                    categories.insert(arg);
                }
                NavOutcome::Render(render::category_picker_view(
                    Session {
                        fingerprint: &live,
                        query: &query,
                        categories: &categories,
                    },
                    &snapshot.catalog().categories(),
                ))
            },
            Op::Next => {
                let results = self.results(&snapshot, &query, &categories);
                let next = index.saturating_add(1);
                if next >= results.len() {
                    return NavOutcome::Notice(strings::LAST_PAGE.to_owned());
                }
                self.show_detail(
                    &snapshot,
                    &query,
                    &categories,
                    &results,
                    next,
                    NotFoundBack::ChangeQuery,
                )
                .await
            },
            Op::Prev => {
                if index == 0 {
                    return NavOutcome::Notice(strings::FIRST_PAGE.to_owned());
                }
                let results = self.results(&snapshot, &query, &categories);
                self.show_detail(
                    &snapshot,
                    &query,
                    &categories,
                    &results,
                    index.saturating_sub(1),
                    NotFoundBack::ChangeQuery,
                )
                .await
            },
            Op::ApplyFilters => {
                let results = self.results(&snapshot, &query, &categories);
                self.show_detail(
                    &snapshot,
                    &query,
                    &categories,
                    &results,
                    0,
                    NotFoundBack::FilterMenu,
                )
                .await
            },
            Op::ClearFilters | Op::BackToResults => {
                let empty = BTreeSet::new();
                let results = self.results(&snapshot, &query, &empty);
                self.show_detail(
                    &snapshot,
                    &query,
                    &empty,
                    &results,
                    0,
                    NotFoundBack::FilterMenu,
                )
                .await
            },
            Op::Global => self.global_list(&snapshot, &query),
            Op::GlobalPick => {
                let empty = BTreeSet::new();
                let results = self.results(&snapshot, &query, &empty);
                self.show_detail(
                    &snapshot,
                    &query,
                    &empty,
                    &results,
                    index,
                    NotFoundBack::GlobalForm,
                )
                .await
            },
        }
    }

    /// Ranked paths for `query`, narrowed to `categories` when any are set.
    fn results(
        &self,
        snapshot: &Snapshot,
        query: &str,
        categories: &BTreeSet<String>,
    ) -> Vec<String> {
        let hits = snapshot.search(query, self.engine.options());
        if categories.is_empty() {
            return hits.paths;
        }
        hits.paths
            .into_iter()
            .filter(|path| {
                snapshot
                    .catalog()
                    .get(path)
                    .is_some_and(|entry| entry.matches_any(categories))
            })
            .collect()
    }

    async fn show_detail(
        &self,
        snapshot: &Snapshot,
        query: &str,
        categories: &BTreeSet<String>,
        results: &[String],
        index: usize,
        back: NotFoundBack,
    ) -> NavOutcome {
        let fingerprint = snapshot.catalog().short_fingerprint();
        let session = Session {
            fingerprint: &fingerprint,
            query,
            categories,
        };

        let index = index.min(results.len().saturating_sub(1));
        let Some(entry) = results
            .get(index)
            .and_then(|path| snapshot.catalog().get(path))
        else {
            return NavOutcome::Render(render::not_found_view(session, back));
        };

        let banner = self.banners.resolve(entry.banner.as_deref()).await;
        NavOutcome::Render(render::detail_view(
            session,
            entry,
            index,
            results.len(),
            banner,
            &self.settings,
        ))
    }

    fn global_list(&self, snapshot: &Snapshot, query: &str) -> NavOutcome {
        let fingerprint = snapshot.catalog().short_fingerprint();
        let empty = BTreeSet::new();
        let session = Session {
            fingerprint: &fingerprint,
            query,
            categories: &empty,
        };

        let entries: Vec<_> = self
            .results(snapshot, query, &empty)
            .iter()
            .filter_map(|path| snapshot.catalog().get(path))
            .collect();
        if entries.is_empty() {
            return NavOutcome::Render(render::not_found_view(session, NotFoundBack::GlobalForm));
        }
        NavOutcome::Render(render::global_list_view(
            session,
            entries.into_iter(),
            self.settings.global_list_limit,
        ))
    }
}
