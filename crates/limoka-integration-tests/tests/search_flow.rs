//! End-to-end search, navigation and history over the sample catalog.

mod common;

use common::{
    BTN_APPLY_FILTERS, BTN_BACK, BTN_CHANGE_QUERY, BTN_DISABLED, BTN_FILTER_CATEGORY,
    BTN_FILTERS, BTN_NEXT, BTN_PREV, SESSION_EXPIRED, button, counter, notice, view,
};
use limoka_config::DEFAULT_FALLBACK_BANNER;
use limoka_search::nav::{NavOutcome, NavParams, Op, QueryMode};
use limoka_search::HttpResponse;
use limoka_test::{PING_BANNER, SAMPLE_NAMES, SAMPLE_PATHS, TestHarness};

#[tokio::test]
async fn exact_name_ranks_its_module_alone() {
    let h = TestHarness::new().await;
    assert_eq!(h.service.engine().search("ping"), vec!["tools/ping.py"]);
    assert_eq!(h.service.engine().search("PING!"), vec!["tools/ping.py"]);

    let outcome = h.service.search(1, "ping").await;
    assert_eq!(counter(&outcome), "1/1");
    let v = view(&outcome);
    assert!(v.text.contains("Ping"));
    assert_eq!(v.photo.as_deref(), Some(PING_BANNER));
}

#[tokio::test]
async fn every_name_is_found_after_rebuild_and_restart() {
    let h = TestHarness::new().await;
    // A second refresh of the same manifest rebuilds the index in place.
    h.service.refresh().await.unwrap();
    for (path, name) in SAMPLE_PATHS.iter().zip(SAMPLE_NAMES) {
        let hits = h.service.engine().search(name);
        assert!(hits.iter().any(|p| p == path), "{name} not found: {hits:?}");
    }

    // A restarted service answers from the persisted index before fetching.
    let restarted = h.open_service();
    assert_eq!(restarted.catalog_size(), SAMPLE_PATHS.len());
    for (path, name) in SAMPLE_PATHS.iter().zip(SAMPLE_NAMES) {
        assert!(restarted.engine().search(name).iter().any(|p| p == path));
    }
}

#[tokio::test]
async fn typo_falls_back_to_fuzzy_match() {
    let h = TestHarness::new().await;
    assert_eq!(h.service.engine().search("transltor"), vec!["chat/translator.py"]);
    assert!(h.service.engine().search("zzzzzzzz").is_empty());
}

#[tokio::test]
async fn paging_stops_at_both_ends() {
    let h = TestHarness::new().await;
    let first = h.service.search(1, "music").await;
    assert_eq!(counter(&first), "1/3");
    assert_eq!(view(&first).keyboard.rows[0][0].text, BTN_DISABLED);

    let second = h
        .service
        .handle_callback(&button(&first, BTN_NEXT).payload)
        .await;
    assert_eq!(counter(&second), "2/3");
    let third = h
        .service
        .handle_callback(&button(&second, BTN_NEXT).payload)
        .await;
    assert_eq!(counter(&third), "3/3");
    assert_eq!(view(&third).keyboard.rows[0][2].text, BTN_DISABLED);

    let back = h
        .service
        .handle_callback(&button(&third, BTN_PREV).payload)
        .await;
    assert_eq!(counter(&back), "2/3");

    let mut params = NavParams::decode(&button(&third, BTN_PREV).payload).unwrap();
    params.op = Op::Next;
    params.index = 2;
    assert_eq!(
        notice(&h.service.handle_callback(&params.encode()).await),
        "This is the last page!"
    );
    params.op = Op::Prev;
    params.index = 0;
    assert_eq!(
        notice(&h.service.handle_callback(&params.encode()).await),
        "This is the first page!"
    );
}

#[tokio::test]
async fn invalid_banner_uses_fallback_only_without_filters() {
    let h = TestHarness::new().await;
    h.http.set_response(
        "https://cdn.catalog.test/missing.png",
        HttpResponse::ok(b"<html>".to_vec()).with_content_type("text/html"),
    );
    let outcome = h.service.search(1, "lyrics").await;
    assert_eq!(view(&outcome).photo.as_deref(), Some(DEFAULT_FALLBACK_BANNER));

    let mut params = NavParams::decode(&button(&outcome, BTN_FILTERS).payload).unwrap();
    params.op = Op::ApplyFilters;
    params.categories.insert("music".to_owned());
    let filtered = h.service.handle_callback(&params.encode()).await;
    assert_eq!(counter(&filtered), "1/1");
    assert!(view(&filtered).photo.is_none());
}

#[tokio::test]
async fn category_filter_without_matches_shows_not_found() {
    let h = TestHarness::new().await;
    let opened = h.service.search(1, "music").await;
    let menu = h
        .service
        .handle_callback(&button(&opened, BTN_FILTERS).payload)
        .await;
    let picker = h
        .service
        .handle_callback(&button(&menu, BTN_FILTER_CATEGORY).payload)
        .await;
    let picked = h
        .service
        .handle_callback(&button(&picker, "📁 fun").payload)
        .await;
    assert!(view(&picked).keyboard.find("✅ 📁 fun").is_some());

    let menu = h
        .service
        .handle_callback(&button(&picked, BTN_BACK).payload)
        .await;
    let applied = h
        .service
        .handle_callback(&button(&menu, BTN_APPLY_FILTERS).payload)
        .await;
    let v = view(&applied);
    assert!(v.text.contains("Not found"));
    assert!(v.photo.is_none());

    let back = NavParams::decode(&button(&applied, BTN_BACK).payload).unwrap();
    assert_eq!(back.op, Op::FilterMenu);
    assert!(back.categories.contains("fun"));
}

#[tokio::test]
async fn stale_payload_expires_after_catalog_change() {
    let h = TestHarness::new().await;
    let opened = h.service.search(1, "music").await;
    let next = button(&opened, BTN_NEXT).payload.clone();
    let change = button(&opened, BTN_CHANGE_QUERY).payload.clone();

    h.http.set_response(
        h.config.catalog.manifest_url(),
        HttpResponse::ok(br#"{"music/player.py": {"name": "Music Player"}}"#.to_vec()),
    );
    assert_eq!(h.service.refresh().await.unwrap(), 1);

    assert_eq!(notice(&h.service.handle_callback(&next).await), SESSION_EXPIRED);
    let form = h.service.handle_callback(&change).await;
    let input = &button(&form, "✍️ Enter new search query").payload;
    assert_eq!(
        h.service.handle_callback(input).await,
        NavOutcome::Prompt(QueryMode::Detail)
    );
    assert_eq!(
        notice(&h.service.handle_callback("garbage").await),
        SESSION_EXPIRED
    );
}

#[tokio::test]
async fn failed_refresh_keeps_serving_previous_catalog() {
    let h = TestHarness::new().await;
    h.http.set_offline(h.config.catalog.manifest_url());
    assert!(h.service.refresh().await.is_err());
    assert_eq!(h.service.engine().search("ping"), vec!["tools/ping.py"]);
}

#[tokio::test]
async fn global_list_lists_every_hit() {
    let h = TestHarness::new().await;
    let outcome = h.service.submit_query(QueryMode::Global, "music").await;
    let v = view(&outcome);
    assert!(v.text.contains("found <b>3</b> modules"));
    assert!(v.keyboard.buttons().any(|b| b.text.ends_with(". Music Player")));

    let short = h.service.submit_query(QueryMode::Global, "m").await;
    assert!(view(&short).text.contains("too short"));
}

#[tokio::test]
async fn history_is_bounded_and_persistent() {
    let h = TestHarness::new().await;
    let limit = h.config.search.history_limit;
    for query in ["ping", "music"].iter().cycle().take(limit.saturating_add(2)) {
        h.service.search(7, query).await;
    }
    h.service.search(7, "nothing matches this").await;

    let text = h.service.history(7, "").await;
    assert!(text.contains(&format!("{limit}. <code>")));
    assert!(!text.contains(&format!("{}. <code>", limit.saturating_add(1))));
    assert!(!text.contains("nothing"));

    // Other users are unaffected; history survives a restart.
    assert!(h.service.history(8, "").await.contains("empty"));
    let restarted = h.open_service();
    assert_eq!(restarted.history(7, "").await, text);

    assert!(restarted.history(7, "clear").await.contains("cleared"));
    assert!(restarted.history(7, "").await.contains("empty"));
}
