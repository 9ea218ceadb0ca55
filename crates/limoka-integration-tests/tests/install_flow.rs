//! Signed remote installs through the service.

use limoka_search::{DirectiveError, HttpResponse, InstallOutcome};
use limoka_test::{PING_SOURCE, TEST_BASE_URL, TestHarness, message};

#[tokio::test]
async fn valid_directive_installs_and_acknowledges() {
    let h = TestHarness::new().await;
    let msg = h.publisher.directive(501, "tools/ping.py", PING_SOURCE);

    let outcome = h.service.handle_inbound(&msg).await;
    assert!(
        matches!(&outcome, InstallOutcome::Installed { path } if path == "tools/ping.py"),
        "{outcome:?}"
    );

    let installed = h.loader.installed();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].url, format!("{TEST_BASE_URL}tools/ping.py"));
    assert_eq!(installed[0].source, PING_SOURCE);

    assert_eq!(h.chat.deleted(), vec![501]);
    assert_eq!(
        h.chat.notifications(),
        vec![(h.publisher.sender_id, "#limoka:success:501".to_owned())]
    );
    assert!(h.chat.replies().is_empty());
}

#[tokio::test]
async fn tampered_source_is_rejected_and_message_kept() {
    let h = TestHarness::new().await;
    let msg = h.publisher.directive(502, "tools/ping.py", PING_SOURCE);

    let mut tampered = PING_SOURCE.to_vec();
    tampered.extend_from_slice(b"import os; os.system('rm -rf ~')\n");
    h.http.set_response(
        format!("{TEST_BASE_URL}tools/ping.py"),
        HttpResponse::ok(tampered),
    );

    let outcome = h.service.handle_inbound(&msg).await;
    assert!(matches!(
        outcome,
        InstallOutcome::Rejected(DirectiveError::SignatureInvalid { .. })
    ));
    assert!(h.loader.installed().is_empty());
    assert!(h.chat.deleted().is_empty());
    assert!(h.chat.notifications().is_empty());

    let replies = h.chat.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, 502);
    assert!(replies[0].1.contains("Signature invalid"));
}

#[tokio::test]
async fn signature_for_another_path_is_rejected() {
    let h = TestHarness::new().await;
    let signature = h.publisher.sign("fun/dice.py", PING_SOURCE);
    let msg = message(
        503,
        Some(h.publisher.sender_id),
        &format!("#limoka:tools/ping.py:{signature}"),
    );
    assert!(matches!(
        h.service.handle_inbound(&msg).await,
        InstallOutcome::Rejected(DirectiveError::SignatureInvalid { .. })
    ));
    assert!(h.loader.installed().is_empty());
}

#[tokio::test]
async fn foreign_sender_is_ignored_silently() {
    let h = TestHarness::new().await;
    let mut msg = h.publisher.directive(504, "tools/ping.py", PING_SOURCE);
    msg.sender_id = Some(h.publisher.sender_id.saturating_add(1));

    assert!(matches!(
        h.service.handle_inbound(&msg).await,
        InstallOutcome::Ignored
    ));
    assert!(h.loader.installed().is_empty());
    assert!(h.chat.replies().is_empty());
}

#[tokio::test]
async fn switch_off_ignores_directives() {
    let h = TestHarness::new().await;
    assert_eq!(h.service.external_install_enabled(), Some(true));
    assert!(h.service.set_external_install(false));

    let msg = h.publisher.directive(505, "tools/ping.py", PING_SOURCE);
    assert!(matches!(
        h.service.handle_inbound(&msg).await,
        InstallOutcome::Ignored
    ));
    assert!(h.loader.installed().is_empty());

    h.service.set_external_install(true);
    assert!(matches!(
        h.service.handle_inbound(&msg).await,
        InstallOutcome::Installed { .. }
    ));
}

#[tokio::test]
async fn unknown_module_is_reported() {
    let h = TestHarness::new().await;
    let msg = h.publisher.directive(506, "tools/pong.py", PING_SOURCE);
    assert!(matches!(
        h.service.handle_inbound(&msg).await,
        InstallOutcome::Rejected(DirectiveError::ModuleNotFound(_))
    ));
    let replies = h.chat.replies();
    assert!(replies[0].1.contains("Module not found"));
    assert!(replies[0].1.contains("tools/pong.py"));
}

#[tokio::test]
async fn malformed_directive_is_reported() {
    let h = TestHarness::new().await;
    let msg = message(507, Some(h.publisher.sender_id), "#limoka:tools/ping.py:abc");
    assert!(matches!(
        h.service.handle_inbound(&msg).await,
        InstallOutcome::Rejected(DirectiveError::InvalidFormat)
    ));
    assert!(h.chat.replies()[0].1.contains("Invalid format"));
}

#[tokio::test]
async fn loader_failure_sends_failed_ack() {
    let h = TestHarness::new().await;
    h.loader.set_failure(Some("syntax error".to_owned()));
    let msg = h.publisher.directive(508, "tools/ping.py", PING_SOURCE);

    let outcome = h.service.handle_inbound(&msg).await;
    assert!(matches!(outcome, InstallOutcome::Failed { .. }), "{outcome:?}");
    assert_eq!(h.chat.deleted(), vec![508]);
    assert_eq!(
        h.chat.notifications(),
        vec![(h.publisher.sender_id, "#limoka:failed:508".to_owned())]
    );
}

#[tokio::test]
async fn messages_without_directive_pass_through() {
    let h = TestHarness::new().await;
    let msg = message(509, Some(h.publisher.sender_id), "hello there");
    assert!(matches!(
        h.service.handle_inbound(&msg).await,
        InstallOutcome::NoDirective
    ));
    assert!(h.chat.replies().is_empty());
}

#[tokio::test]
async fn loader_crash_is_reported_and_message_removed() {
    let h = TestHarness::new().await;
    h.loader.set_panic("loader exploded");
    let msg = h.publisher.directive(510, "tools/ping.py", PING_SOURCE);

    let outcome = h.service.handle_inbound(&msg).await;
    assert!(
        matches!(&outcome, InstallOutcome::Crashed(cause) if cause.contains("loader exploded")),
        "{outcome:?}"
    );
    assert_eq!(
        h.chat.replies(),
        vec![(510, "❌ Critical error: loader exploded".to_owned())]
    );
    assert_eq!(h.chat.deleted(), vec![510]);
    assert!(h.chat.notifications().is_empty());
    assert!(h.loader.installed().is_empty());
}

#[tokio::test]
async fn loader_crash_removes_message_when_reply_fails() {
    let h = TestHarness::new().await;
    h.loader.set_panic("loader exploded");
    h.chat.set_reply_failure(Some("not enough rights".to_owned()));
    let msg = h.publisher.directive(511, "tools/ping.py", PING_SOURCE);

    let outcome = h.service.handle_inbound(&msg).await;
    assert!(matches!(outcome, InstallOutcome::Crashed(_)), "{outcome:?}");
    assert!(h.chat.replies().is_empty());
    assert_eq!(h.chat.deleted(), vec![511]);
}
