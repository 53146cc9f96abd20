//! Shared helpers: a mock server that accepts the connection check, plus
//! canned multistatus and iCalendar bodies.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use calblock_provider_caldav::CalDavProvider;

pub const CALENDAR_PATH: &str = "/dav/calendars/me/work/";

/// Starts a mock server answering the connection PROPFIND on `/dav/` and returns
/// a provider connected to it.
pub async fn setup_caldav_mock() -> (MockServer, CalDavProvider) {
    let server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/dav/"))
        .respond_with(multistatus(&resourcetype_response(
            "/dav/",
            "<d:collection/>",
        )))
        .mount(&server)
        .await;

    let provider = CalDavProvider::connect(
        "test",
        &format!("{}/dav/", server.uri()),
        "me@example.com",
        "app-password",
    )
    .await
    .expect("connect to mock server");

    (server, provider)
}

pub fn calendar_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), CALENDAR_PATH)
}

pub fn multistatus(inner: &str) -> ResponseTemplate {
    let body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">{}</d:multistatus>"#,
        inner
    );
    ResponseTemplate::new(207).set_body_raw(body, "application/xml; charset=utf-8")
}

pub fn resourcetype_response(href: &str, resourcetype: &str) -> String {
    format!(
        r#"<d:response><d:href>{}</d:href><d:propstat><d:prop>
<d:resourcetype>{}</d:resourcetype>
</d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>"#,
        href, resourcetype
    )
}

pub fn calendar_data_response(href: &str, etag: &str, ics: &str) -> String {
    format!(
        r#"<d:response><d:href>{}</d:href><d:propstat><d:prop>
<d:getetag>{}</d:getetag>
<c:calendar-data>{}</c:calendar-data>
</d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>"#,
        href, etag, ics
    )
}

/// A single timed VEVENT wrapped in a VCALENDAR.
pub fn vevent(uid: &str, summary: &str, start: &str, end: &str, extra: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:{uid}\r\n\
SUMMARY:{summary}\r\n\
DTSTART:{start}\r\n\
DTEND:{end}\r\n\
{extra}END:VEVENT\r\n\
END:VCALENDAR\r\n"
    )
}

pub async fn mount_get(server: &MockServer, resource_path: &str, etag: &str, ics: String) {
    Mock::given(method("GET"))
        .and(path(resource_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", etag)
                .set_body_raw(ics, "text/calendar; charset=utf-8"),
        )
        .mount(server)
        .await;
}
