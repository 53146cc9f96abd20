//! Conversions between Google Calendar API types and calblock types.

use calblock_core::{
    CalblockError, Event, EventKind, EventStatus, EventTime, ReminderPolicy, Visibility,
};
use google_calendar::ClientError;
use google_calendar::types::{EventDateTime, Reminders};

/// Whether a failed call was reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Map a google-calendar client error onto the error taxonomy.
pub fn classify_error(error: ClientError, access: Access, context: &str) -> CalblockError {
    let message = format!("{}: {}", context, error);

    match &error {
        ClientError::HttpError { status, .. } => classify_status(status.as_u16(), access, message),
        // Transport, decoding and token errors carry no status
        _ => failure(access, message),
    }
}

/// Classify a response by its HTTP status alone; the body never matters.
pub fn classify_status(status: u16, access: Access, message: String) -> CalblockError {
    match status {
        404 | 410 => CalblockError::NotFound(message),
        401 => CalblockError::AuthExpired(message),
        _ => failure(access, message),
    }
}

fn failure(access: Access, message: String) -> CalblockError {
    match access {
        Access::Write => CalblockError::RemoteWriteFailed(message),
        Access::Read => CalblockError::Provider(message),
    }
}

fn event_time_from_google(time: &EventDateTime) -> Option<EventTime> {
    if let Some(dt) = time.date_time {
        Some(EventTime::DateTime(dt))
    } else {
        time.date.map(EventTime::Date)
    }
}

fn event_time_to_google(time: &EventTime) -> EventDateTime {
    match time {
        EventTime::Date(d) => EventDateTime {
            date: Some(*d),
            date_time: None,
            time_zone: String::new(),
        },
        EventTime::DateTime(dt) => EventDateTime {
            date: None,
            date_time: Some(*dt),
            time_zone: String::new(),
        },
    }
}

pub fn kind_from_google(event_type: &str) -> EventKind {
    match event_type {
        "" | "default" | "fromGmail" => EventKind::Appointment,
        "outOfOffice" => EventKind::OutOfOffice,
        "focusTime" => EventKind::FocusTime,
        "workingLocation" => EventKind::WorkingLocation,
        "birthday" => EventKind::Birthday,
        other => EventKind::Other(other.to_string()),
    }
}

fn visibility_from_google(visibility: &str) -> Visibility {
    match visibility {
        "public" => Visibility::Public,
        "private" | "confidential" => Visibility::Private,
        _ => Visibility::Default,
    }
}

/// Convert an API event. Events without an ID or a start are dropped.
pub fn from_google(event: google_calendar::types::Event) -> Option<Event> {
    if event.id.is_empty() {
        return None;
    }

    let start = event.start.as_ref().and_then(event_time_from_google)?;
    let end = event.end.as_ref().and_then(event_time_from_google);

    let reminders = match &event.reminders {
        Some(r) if !r.use_default && r.overrides.is_empty() => ReminderPolicy::Disabled,
        _ => ReminderPolicy::Default,
    };

    Some(Event {
        id: event.id,
        summary: event.summary,
        description: if event.description.is_empty() {
            None
        } else {
            Some(event.description)
        },
        start,
        end,
        status: EventStatus::parse(&event.status),
        kind: kind_from_google(&event.event_type),
        revision: event.updated.map(|dt| dt.to_rfc3339()),
        visibility: visibility_from_google(&event.visibility),
        reminders,
    })
}

/// Build the API payload for a blocker.
pub fn to_google(event: &Event) -> google_calendar::types::Event {
    let reminders = match event.reminders {
        ReminderPolicy::Default => None,
        ReminderPolicy::Disabled => Some(Reminders {
            overrides: Vec::new(),
            use_default: false,
        }),
    };

    google_calendar::types::Event {
        id: event.id.clone(),
        summary: event.summary.clone(),
        description: event.description.clone().unwrap_or_default(),
        start: Some(event_time_to_google(&event.start)),
        end: Some(event_time_to_google(&event.resolved_end())),
        status: event.status.as_str().to_string(),
        transparency: "opaque".to_string(),
        visibility: event.visibility.to_string(),
        reminders,
        ..Default::default()
    }
}
