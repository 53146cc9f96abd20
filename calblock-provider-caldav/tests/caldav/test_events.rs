use chrono::{TimeZone, Utc};
use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

use calblock_core::{
    BlockerOptions, CalblockError, CalendarProvider, Event, EventStatus, EventTime, Visibility,
};

use crate::common::{self, CALENDAR_PATH};

fn march_window() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
    )
}

fn blocker() -> Event {
    let start = Utc.with_ymd_and_hms(2025, 3, 20, 10, 0, 0).unwrap();
    let mut source = Event::new("flight", "Flight to NYC", EventTime::DateTime(start));
    source.end = Some(EventTime::DateTime(
        Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap(),
    ));
    source.blocker(BlockerOptions {
        visibility: Visibility::Private,
        ..Default::default()
    })
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn list_events_reads_report_with_etags() {
    let (server, provider) = common::setup_caldav_mock().await;

    let flight = common::vevent(
        "flight-uid",
        "Flight to NYC",
        "20250320T100000Z",
        "20250320T120000Z",
        "",
    );
    let standup = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:standup\r\n\
SUMMARY:Standup\r\n\
RECURRENCE-ID:20250303T090000Z\r\n\
DTSTART:20250303T090000Z\r\n\
DTEND:20250303T091500Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:standup\r\n\
SUMMARY:Standup\r\n\
RECURRENCE-ID:20250310T090000Z\r\n\
DTSTART:20250310T090000Z\r\n\
DTEND:20250310T091500Z\r\n\
STATUS:CANCELLED\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    let body = format!(
        "{}{}",
        common::calendar_data_response(
            "/dav/calendars/me/work/flight.ics",
            "\"etag-1\"",
            &flight
        ),
        common::calendar_data_response(
            "/dav/calendars/me/work/standup.ics",
            "\"etag-2\"",
            standup
        ),
    );

    Mock::given(method("REPORT"))
        .and(path(CALENDAR_PATH))
        .and(header("Depth", "1"))
        .and(body_string_contains("<C:expand start=\"20250301T000000Z\""))
        .respond_with(common::multistatus(&body))
        .expect(1)
        .mount(&server)
        .await;

    let (from, to) = march_window();
    let events = provider.list_events(CALENDAR_PATH, from, to).await.unwrap();

    assert_eq!(events.len(), 3);

    let flight = events.iter().find(|e| e.id == "flight.ics").unwrap();
    assert_eq!(flight.summary, "Flight to NYC");
    assert_eq!(flight.revision.as_deref(), Some("\"etag-1\""));
    assert_eq!(
        flight.start,
        EventTime::DateTime(Utc.with_ymd_and_hms(2025, 3, 20, 10, 0, 0).unwrap())
    );

    let cancelled = events
        .iter()
        .find(|e| e.id == "standup.ics#20250310T090000Z")
        .unwrap();
    assert_eq!(cancelled.status, EventStatus::Cancelled);
    assert!(events.iter().any(|e| e.id == "standup.ics#20250303T090000Z"));
}

#[tokio::test]
async fn list_events_skips_unreadable_resources() {
    let (server, provider) = common::setup_caldav_mock().await;

    let good = common::vevent("ok", "Lunch", "20250320T120000Z", "20250320T130000Z", "");
    let body = format!(
        "{}{}",
        common::calendar_data_response("/dav/calendars/me/work/bad.ics", "\"x\"", "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:No uid\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"),
        common::calendar_data_response("/dav/calendars/me/work/ok.ics", "\"y\"", &good),
    );
    Mock::given(method("REPORT"))
        .respond_with(common::multistatus(&body))
        .mount(&server)
        .await;

    let (from, to) = march_window();
    let events = provider.list_events(CALENDAR_PATH, from, to).await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "ok.ics");
}

#[tokio::test]
async fn list_events_on_missing_calendar_is_not_found() {
    let (server, provider) = common::setup_caldav_mock().await;
    Mock::given(method("REPORT"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (from, to) = march_window();
    let result = provider.list_events(CALENDAR_PATH, from, to).await;

    assert!(matches!(result, Err(CalblockError::NotFound(_))));
}

// ============================================================================
// Single events
// ============================================================================

#[tokio::test]
async fn get_event_returns_resource_with_etag() {
    let (server, provider) = common::setup_caldav_mock().await;
    common::mount_get(
        &server,
        "/dav/calendars/me/work/flight.ics",
        "\"etag-9\"",
        common::vevent("flight", "Flight", "20250320T100000Z", "20250320T120000Z", ""),
    )
    .await;

    let event = provider.get_event(CALENDAR_PATH, "flight.ics").await.unwrap();

    assert_eq!(event.id, "flight.ics");
    assert_eq!(event.revision.as_deref(), Some("\"etag-9\""));
}

#[tokio::test]
async fn get_event_instances_follow_overrides_and_exdates() {
    let (server, provider) = common::setup_caldav_mock().await;
    let series = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:standup\r\n\
SUMMARY:Standup\r\n\
DTSTART:20250303T090000Z\r\n\
DTEND:20250303T091500Z\r\n\
RRULE:FREQ=WEEKLY\r\n\
EXDATE:20250317T090000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:standup\r\n\
SUMMARY:Standup\r\n\
RECURRENCE-ID:20250310T090000Z\r\n\
DTSTART:20250310T090000Z\r\n\
DTEND:20250310T091500Z\r\n\
STATUS:CANCELLED\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";
    common::mount_get(
        &server,
        "/dav/calendars/me/work/standup.ics",
        "\"s1\"",
        series.to_string(),
    )
    .await;

    let overridden = provider
        .get_event(CALENDAR_PATH, "standup.ics#20250310T090000Z")
        .await
        .unwrap();
    assert!(overridden.is_cancelled());

    let excluded = provider
        .get_event(CALENDAR_PATH, "standup.ics#20250317T090000Z")
        .await;
    assert!(matches!(excluded, Err(CalblockError::NotFound(_))));

    let live = provider
        .get_event(CALENDAR_PATH, "standup.ics#20250324T090000Z")
        .await
        .unwrap();
    assert_eq!(live.id, "standup.ics#20250324T090000Z");
    assert!(!live.is_cancelled());
}

#[tokio::test]
async fn resource_without_ics_extension_is_fetched_by_its_listed_id() {
    let (server, provider) = common::setup_caldav_mock().await;
    let flight = common::vevent(
        "flight-uid",
        "Flight to NYC",
        "20250320T100000Z",
        "20250320T120000Z",
        "",
    );
    let body =
        common::calendar_data_response("/dav/calendars/me/work/flight-uid", "\"e1\"", &flight);
    Mock::given(method("REPORT"))
        .respond_with(common::multistatus(&body))
        .mount(&server)
        .await;
    common::mount_get(&server, "/dav/calendars/me/work/flight-uid", "\"e1\"", flight).await;

    let (from, to) = march_window();
    let listed = provider.list_events(CALENDAR_PATH, from, to).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "flight-uid");

    let fetched = provider
        .get_event(CALENDAR_PATH, &listed[0].id)
        .await
        .unwrap();

    assert_eq!(fetched.id, "flight-uid");
    assert_eq!(fetched.summary, "Flight to NYC");
}

#[tokio::test]
async fn get_event_on_deleted_resource_is_not_found() {
    let (server, provider) = common::setup_caldav_mock().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let result = provider.get_event(CALENDAR_PATH, "flight.ics").await;

    assert!(matches!(result, Err(CalblockError::NotFound(_))));
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn add_event_creates_new_resource() {
    let (server, provider) = common::setup_caldav_mock().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/dav/calendars/me/work/calblock-[0-9a-f-]+\.ics$"))
        .and(header("If-None-Match", "*"))
        .and(body_string_contains("SUMMARY:O_o Flight to NYC"))
        .and(body_string_contains("CLASS:PRIVATE"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"new\""))
        .expect(1)
        .mount(&server)
        .await;

    let id = provider.add_event(CALENDAR_PATH, &blocker()).await.unwrap();

    assert!(id.starts_with("calblock-"));
    assert!(id.ends_with(".ics"));
}

#[tokio::test]
async fn update_event_replaces_resource_in_place() {
    let (server, provider) = common::setup_caldav_mock().await;
    Mock::given(method("PUT"))
        .and(path("/dav/calendars/me/work/calblock-1.ics"))
        .and(body_string_contains("UID:calblock-1\r\n"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let id = provider
        .update_event(CALENDAR_PATH, "calblock-1.ics", &blocker())
        .await
        .unwrap();

    assert_eq!(id, "calblock-1.ics");
}

#[tokio::test]
async fn rejected_write_is_remote_write_failed() {
    let (server, provider) = common::setup_caldav_mock().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(507))
        .mount(&server)
        .await;

    let result = provider.add_event(CALENDAR_PATH, &blocker()).await;

    assert!(matches!(result, Err(CalblockError::RemoteWriteFailed(_))));
}

#[tokio::test]
async fn delete_event_removes_resource() {
    let (server, provider) = common::setup_caldav_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/dav/calendars/me/work/calblock-1.ics"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    provider
        .delete_event(CALENDAR_PATH, "calblock-1.ics")
        .await
        .unwrap();
}

#[tokio::test]
async fn deleting_missing_resource_is_not_found() {
    let (server, provider) = common::setup_caldav_mock().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = provider.delete_event(CALENDAR_PATH, "calblock-1.ics").await;

    assert!(matches!(result, Err(CalblockError::NotFound(_))));
}
