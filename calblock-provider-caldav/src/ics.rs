//! iCalendar bodies: parsing calendar resources and generating blockers.

use calblock_core::{
    CalblockError, CalblockResult, Event, EventKind, EventStatus, EventTime, Visibility,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use icalendar::{
    Calendar, CalendarDateTime, Component, DatePerhapsTime, EventLike, Property, ValueType,
    parser::{self, read_calendar, unfold},
};

pub const PRODID: &str = "-//calblock//EN";

/// A date or time as written in the resource, before normalization to UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcsTime {
    Date(NaiveDate),
    Utc(DateTime<Utc>),
    Floating(NaiveDateTime),
    Zoned { datetime: NaiveDateTime, tzid: String },
}

/// One VEVENT component of a calendar resource.
#[derive(Debug, Clone, PartialEq)]
pub struct VEvent {
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    pub start: IcsTime,
    pub end: Option<IcsTime>,
    /// DURATION, used when DTEND is absent
    pub duration: Option<Duration>,
    pub status: EventStatus,
    pub private: bool,
    pub rrule: Option<String>,
    pub exdates: Vec<IcsTime>,
    pub recurrence_id: Option<IcsTime>,
}

impl IcsTime {
    /// Normalize to the provider-neutral representation. Zoned times go
    /// through the IANA database; unknown zones and floating times are read as
    /// UTC.
    pub fn to_event_time(&self) -> EventTime {
        match self {
            IcsTime::Date(d) => EventTime::Date(*d),
            IcsTime::Utc(dt) => EventTime::DateTime(*dt),
            IcsTime::Floating(naive) => EventTime::DateTime(naive.and_utc()),
            IcsTime::Zoned { datetime, tzid } => EventTime::DateTime(zoned_to_utc(datetime, tzid)),
        }
    }

    /// Instance key used in identifiers: `YYYYMMDD` for dates,
    /// `YYYYMMDDTHHMMSSZ` (UTC) otherwise.
    pub fn recurrence_key(&self) -> String {
        event_time_key(&self.to_event_time())
    }
}

pub fn event_time_key(time: &EventTime) -> String {
    match time {
        EventTime::Date(d) => d.format("%Y%m%d").to_string(),
        EventTime::DateTime(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
    }
}

fn zoned_to_utc(datetime: &NaiveDateTime, tzid: &str) -> DateTime<Utc> {
    match tzid.parse::<chrono_tz::Tz>() {
        Ok(tz) => tz
            .from_local_datetime(datetime)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| datetime.and_utc()),
        Err(_) => {
            tracing::debug!(tzid, "unknown TZID, reading time as UTC");
            datetime.and_utc()
        }
    }
}

impl VEvent {
    /// Convert into an [`Event`] under the given identifier.
    pub fn to_event(&self, id: String, revision: Option<String>) -> Event {
        let start = self.start.to_event_time();
        let end = match (&self.end, self.duration) {
            (Some(end), _) => Some(end.to_event_time()),
            (None, Some(duration)) => Some(shift(&start, duration)),
            (None, None) => None,
        };

        Event {
            id,
            summary: self.summary.clone(),
            description: self.description.clone(),
            start,
            end,
            status: self.status.clone(),
            kind: EventKind::Appointment,
            revision,
            visibility: if self.private {
                Visibility::Private
            } else {
                Visibility::Default
            },
            reminders: Default::default(),
        }
    }

    /// Length of one occurrence, used when expanding a series.
    pub fn occurrence_length(&self) -> Duration {
        if let Some(duration) = self.duration {
            return duration;
        }
        match &self.end {
            Some(end) => end.to_event_time().to_utc() - self.start.to_event_time().to_utc(),
            None if matches!(self.start, IcsTime::Date(_)) => Duration::days(1),
            None => Duration::zero(),
        }
    }
}

pub fn shift(time: &EventTime, by: Duration) -> EventTime {
    match time {
        EventTime::Date(d) => EventTime::Date(*d + Duration::days(by.num_days())),
        EventTime::DateTime(dt) => EventTime::DateTime(*dt + by),
    }
}

/// Parse every VEVENT in a calendar resource.
pub fn parse_resource(content: &str) -> CalblockResult<Vec<VEvent>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| CalblockError::Ical(format!("malformed calendar data: {}", e)))?;

    calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .map(parse_vevent)
        .collect()
}

fn parse_vevent(vevent: &parser::Component) -> CalblockResult<VEvent> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .ok_or_else(|| CalblockError::Ical("VEVENT without UID".to_string()))?;

    let start = vevent
        .find_prop("DTSTART")
        .and_then(to_ics_time)
        .ok_or_else(|| CalblockError::Ical(format!("{} has no valid DTSTART", uid)))?;
    let end = vevent.find_prop("DTEND").and_then(to_ics_time);
    let duration = vevent
        .find_prop("DURATION")
        .and_then(|p| parse_duration(p.val.as_ref()));

    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_default();
    let description = vevent
        .find_prop("DESCRIPTION")
        .map(|p| unescape_text(p.val.as_ref()));

    let status = vevent
        .find_prop("STATUS")
        .map(|p| EventStatus::parse(p.val.as_ref()))
        .unwrap_or(EventStatus::Confirmed);

    let private = vevent
        .find_prop("CLASS")
        .map(|p| matches!(p.val.as_ref(), "PRIVATE" | "CONFIDENTIAL"))
        .unwrap_or(false);

    let rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());
    let exdates = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();
    let recurrence_id = vevent.find_prop("RECURRENCE-ID").and_then(to_ics_time);

    Ok(VEvent {
        uid,
        summary,
        description,
        start,
        end,
        duration,
        status,
        private,
        rrule,
        exdates,
        recurrence_id,
    })
}

fn to_ics_time(prop: &parser::Property) -> Option<IcsTime> {
    let value = DatePerhapsTime::try_from(prop).ok()?;
    Some(match value {
        DatePerhapsTime::Date(d) => IcsTime::Date(d),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => IcsTime::Utc(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => IcsTime::Floating(naive),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            IcsTime::Zoned {
                datetime: date_time,
                tzid,
            }
        }
    })
}

/// EXDATE may carry several comma-separated values and a TZID or
/// VALUE=DATE parameter.
fn parse_exdate_property(prop: &parser::Property) -> Vec<IcsTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));
    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date {
                return NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(IcsTime::Date);
            }
            let utc = s.ends_with('Z');
            let naive =
                NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y%m%dT%H%M%S").ok()?;
            Some(match (&tzid, utc) {
                (_, true) => IcsTime::Utc(naive.and_utc()),
                (Some(tz), false) => IcsTime::Zoned {
                    datetime: naive,
                    tzid: tz.clone(),
                },
                (None, false) => IcsTime::Floating(naive),
            })
        })
        .collect()
}

/// `PT1H30M`, `P1D`, `-PT15M`
fn parse_duration(value: &str) -> Option<Duration> {
    let negative = value.starts_with('-');
    let value = value.trim_start_matches(['-', '+']);
    let std_duration: std::time::Duration = iso8601::duration(value).ok()?.into();
    let duration = Duration::from_std(std_duration).ok()?;
    Some(if negative { -duration } else { duration })
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Generate a single-event calendar resource for a blocker.
pub fn generate_ics(uid: &str, event: &Event) -> String {
    let mut cal = Calendar::new();

    let mut ics_event = icalendar::Event::new();
    ics_event.uid(uid);
    ics_event.summary(&event.summary);
    ics_event.add_property("DTSTAMP", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());

    if let Some(ref description) = event.description {
        ics_event.description(description);
    }

    add_time_property(&mut ics_event, "DTSTART", &event.start);
    add_time_property(&mut ics_event, "DTEND", &event.resolved_end());

    ics_event.add_property("STATUS", event.status.as_str().to_ascii_uppercase());
    ics_event.add_property("TRANSP", "OPAQUE");
    match event.visibility {
        Visibility::Private => {
            ics_event.add_property("CLASS", "PRIVATE");
        }
        Visibility::Public => {
            ics_event.add_property("CLASS", "PUBLIC");
        }
        Visibility::Default => {}
    }

    cal.push(ics_event.done());
    strip_ics_bloat(&cal.done().to_string())
}

fn add_time_property(ics_event: &mut icalendar::Event, name: &str, time: &EventTime) {
    match time {
        EventTime::Date(d) => {
            let mut prop = Property::new(name, d.format("%Y%m%d").to_string());
            prop.append_parameter(ValueType::Date);
            ics_event.append_property(prop);
        }
        EventTime::DateTime(dt) => {
            ics_event.add_property(name, dt.format("%Y%m%dT%H%M%SZ").to_string());
        }
    }
}

/// Our own PRODID; CALSCALE:GREGORIAN is the default and dropped.
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }
        if line == "CALSCALE:GREGORIAN" {
            continue;
        }
        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}
