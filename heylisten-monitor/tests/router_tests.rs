mod common;

use common::{pid, rid, track, RecordingDeliverer};
use heylisten_monitor::{Deliverer, LogDeliverer, NotificationRouter};
use heylisten_types::ChangeSet;
use pretty_assertions::assert_eq;

fn change(playlist: &str, recipient: Option<&str>) -> ChangeSet {
    ChangeSet::new(
        pid(playlist),
        format!("Playlist {playlist}"),
        recipient.map(rid),
        vec![track("T1", "2023-01-01", "U1")],
        vec![],
    )
}

// ── Routing ─────────────────────────────────────────────────────

#[tokio::test]
async fn delivers_each_owned_change_set() {
    let deliverer = RecordingDeliverer::new();
    let router = NotificationRouter::new(deliverer.clone(), true);

    let report = router
        .route(vec![change("p1", Some("u1")), change("p2", Some("u2"))])
        .await;

    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(deliverer.recipients(), vec!["u1", "u2"]);
}

#[tokio::test]
async fn unowned_change_sets_are_dropped() {
    let deliverer = RecordingDeliverer::new();
    let router = NotificationRouter::new(deliverer.clone(), true);

    let report = router.route(vec![change("p1", None)]).await;

    assert_eq!(report.unowned, 1);
    assert!(deliverer.delivered().is_empty());
}

#[tokio::test]
async fn empty_and_duplicate_change_sets_are_skipped() {
    let deliverer = RecordingDeliverer::new();
    let router = NotificationRouter::new(deliverer.clone(), true);
    let empty = ChangeSet::new(pid("p2"), "Empty", Some(rid("u1")), vec![], vec![]);

    let report = router
        .route(vec![change("p1", Some("u1")), change("p1", Some("u1")), empty])
        .await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.skipped, 2);
}

#[tokio::test]
async fn batch_is_grouped_by_recipient() {
    let deliverer = RecordingDeliverer::new();
    let router = NotificationRouter::new(deliverer.clone(), true);

    router
        .route(vec![
            change("p1", Some("u2")),
            change("p2", Some("u1")),
            change("p3", Some("u2")),
        ])
        .await;

    assert_eq!(deliverer.recipients(), vec!["u1", "u2", "u2"]);
}

// ── Failure isolation ───────────────────────────────────────────

#[tokio::test]
async fn failed_recipient_does_not_block_others() {
    let deliverer = RecordingDeliverer::new();
    deliverer.fail_for("u1");
    let router = NotificationRouter::new(deliverer.clone(), true);

    let report = router
        .route(vec![
            change("p1", Some("u1")),
            change("p2", Some("u1")),
            change("p1", Some("u2")),
        ])
        .await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.failed_recipients, vec![rid("u1")]);
    assert_eq!(deliverer.recipients(), vec!["u2"]);
}

#[tokio::test]
async fn panicking_delivery_is_contained() {
    let deliverer = RecordingDeliverer::new();
    deliverer.panic_for("u1");
    let router = NotificationRouter::new(deliverer.clone(), true);

    let report = router
        .route(vec![change("p1", Some("u1")), change("p1", Some("u2"))])
        .await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(deliverer.recipients(), vec!["u2"]);
}

#[tokio::test]
async fn disabled_router_only_counts() {
    let deliverer = RecordingDeliverer::new();
    let router = NotificationRouter::new(deliverer.clone(), false);

    let report = router
        .route(vec![change("p1", Some("u1")), change("p1", None)])
        .await;

    assert!(!router.is_enabled());
    assert_eq!(report.disabled, 1);
    assert_eq!(report.unowned, 1);
    assert!(deliverer.delivered().is_empty());
}

// ── LogDeliverer ────────────────────────────────────────────────

#[tokio::test]
async fn log_deliverer_always_succeeds() {
    let deliverer = LogDeliverer::new();
    let mut big = change("p1", Some("u1"));
    big.added = (0..12)
        .map(|i| track(&format!("T{i}"), "2023-01-01", "U1"))
        .collect();

    assert_eq!(deliverer.name(), "log");
    assert!(deliverer.deliver(&rid("u1"), &big).await);
}
