use crate::common::{Harness, event, window};

#[tokio::test]
async fn scrub_removes_untracked_blockers_and_clears_ledger() {
    let h = Harness::new(&["a", "b"]).await;
    h.provider.seed("a", event("flight", "Flight", 10, 12));
    h.engine().sync_window(window()).await.unwrap();

    // Left behind by an earlier install, unknown to the ledger
    h.provider.seed("a", event("stale", "O_o Old meeting", 15, 16));

    let report = h.engine().scrub_window(window()).await.unwrap();

    assert_eq!(report.calendars, 2);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.ledger_rows_cleared, 1);
    assert!(h.store.ledger().all().await.unwrap().is_empty());

    let on_a = h.provider.events("a");
    assert_eq!(on_a.len(), 1);
    assert_eq!(on_a[0].summary, "Flight");
    assert!(h.provider.events("b").is_empty());
}

#[tokio::test]
async fn forgetting_a_calendar_retracts_what_it_produced() {
    let h = Harness::new(&["a", "b", "c"]).await;
    h.provider.seed("a", event("flight", "Flight", 10, 12));
    h.provider.seed("b", event("lunch", "Lunch", 12, 13));
    h.engine().sync_window(window()).await.unwrap();
    assert_eq!(h.store.ledger().all().await.unwrap().len(), 4);

    let report = h
        .engine()
        .forget_calendar(h.calendar("a"), window())
        .await
        .unwrap();

    // Lunch blocker scrubbed from a, flight blockers retracted from b and c
    assert_eq!(report.deleted, 3);
    assert_eq!(h.provider.events("a").len(), 1);
    assert_eq!(h.provider.events("b").len(), 1);
    assert_eq!(h.provider.events("c").len(), 1);
    assert_eq!(h.provider.events("c")[0].summary, "O_o Lunch");

    let remaining = h.store.ledger().all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].calendar_id, "c");
    assert_eq!(remaining[0].origin_calendar_id, "b");
}
