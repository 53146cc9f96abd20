//! Request bodies and `207 Multi-Status` parsing.

use calblock_core::{CalblockError, CalblockResult};
use chrono::{DateTime, Utc};

pub const PROPFIND_RESOURCETYPE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<propfind xmlns="DAV:">
    <prop>
        <resourcetype/>
    </prop>
</propfind>"#;

/// calendar-query REPORT asking the server to expand recurring series into
/// the instances overlapping `[start, end)`.
pub fn calendar_query(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let start = caldav_datetime(start);
    let end = caldav_datetime(end);
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<C:calendar-query xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
    <prop>
        <getetag/>
        <C:calendar-data>
            <C:expand start="{start}" end="{end}"/>
        </C:calendar-data>
    </prop>
    <C:filter>
        <C:comp-filter name="VCALENDAR">
            <C:comp-filter name="VEVENT">
                <C:time-range start="{start}" end="{end}"/>
            </C:comp-filter>
        </C:comp-filter>
    </C:filter>
</C:calendar-query>"#
    )
}

/// `YYYYMMDDTHHMMSSZ`
pub fn caldav_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// A calendar object returned by a REPORT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarResource {
    pub href: String,
    pub etag: Option<String>,
    pub data: String,
}

fn parse_document(body: &str) -> CalblockResult<roxmltree::Document<'_>> {
    roxmltree::Document::parse(body)
        .map_err(|e| CalblockError::Provider(format!("malformed multistatus response: {}", e)))
}

/// Collect every `<response>` that carries calendar data.
pub fn parse_calendar_resources(body: &str) -> CalblockResult<Vec<CalendarResource>> {
    let doc = parse_document(body)?;
    let mut resources = Vec::new();

    for response in doc
        .root_element()
        .descendants()
        .filter(|n| n.tag_name().name() == "response")
    {
        let text_of = |name: &str| {
            response
                .descendants()
                .find(|n| n.tag_name().name() == name)
                .and_then(|n| n.text())
                .map(|s| s.trim().to_string())
        };

        let Some(href) = text_of("href") else { continue };
        let Some(data) = text_of("calendar-data").filter(|d| !d.is_empty()) else {
            continue;
        };

        resources.push(CalendarResource {
            href,
            etag: text_of("getetag"),
            data,
        });
    }

    Ok(resources)
}

/// Whether a PROPFIND answer describes a calendar collection.
pub fn is_calendar_collection(body: &str) -> CalblockResult<bool> {
    let doc = parse_document(body)?;

    Ok(doc
        .root_element()
        .descendants()
        .filter(|n| n.tag_name().name() == "resourcetype")
        .any(|rt| {
            rt.children().any(|c| {
                c.tag_name().name() == "calendar"
                    && c.tag_name().namespace() == Some("urn:ietf:params:xml:ns:caldav")
            })
        }))
}

/// The resource's last path segment, percent-decoded. Extensions are kept:
/// servers are free to name resources without `.ics`, and the name must
/// address the same resource again.
pub fn resource_name(href: &str) -> String {
    let name = href
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(href);

    urlencoding::decode(name)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| name.to_string())
}
