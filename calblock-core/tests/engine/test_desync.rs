use calblock_core::CalblockError;

use crate::common::{Harness, event, window};

#[tokio::test]
async fn desync_deletes_every_tracked_blocker() {
    let h = Harness::new(&["a", "b", "c"]).await;
    h.provider.seed("a", event("standup", "Standup", 9, 10));
    h.provider.seed("b", event("lunch", "Lunch", 12, 13));
    h.engine().sync_window(window()).await.unwrap();
    assert_eq!(h.store.ledger().all().await.unwrap().len(), 4);

    let report = h.engine().desync().await.unwrap();

    assert_eq!(report.deleted, 4);
    assert_eq!(report.already_gone, 0);
    assert!(h.store.ledger().all().await.unwrap().is_empty());
    assert_eq!(h.provider.events("a").len(), 1);
    assert_eq!(h.provider.events("b").len(), 1);
    assert!(h.provider.events("c").is_empty());
}

#[tokio::test]
async fn desync_tolerates_blockers_removed_by_hand() {
    let h = Harness::new(&["a", "b"]).await;
    h.provider.seed("a", event("flight", "Flight", 10, 12));
    h.engine().sync_window(window()).await.unwrap();

    let blocker_id = h.provider.events("b")[0].id.clone();
    h.provider.remove("b", &blocker_id);

    let report = h.engine().desync().await.unwrap();

    assert_eq!(report.deleted, 0);
    assert_eq!(report.already_gone, 1);
    assert!(h.store.ledger().all().await.unwrap().is_empty());
}

#[tokio::test]
async fn interrupted_desync_keeps_rows_it_did_not_finish() {
    let h = Harness::new(&["a", "b"]).await;
    h.provider.seed("a", event("flight", "Flight", 10, 12));
    h.provider.seed("b", event("lunch", "Lunch", 12, 13));
    h.engine().sync_window(window()).await.unwrap();

    h.provider.fail_writes_on("b");
    let result = h.engine().desync().await;

    assert!(matches!(result, Err(CalblockError::RemoteWriteFailed(_))));
    let remaining = h.store.ledger().all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].calendar_id, "b");
}
