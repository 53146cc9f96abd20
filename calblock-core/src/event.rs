//! Provider-neutral event types.
//!
//! Providers convert their API responses into these types and the engine
//! works exclusively with them. Events are rebuilt on every list/get call and
//! never cached across passes.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Token carried in the summary of every blocker this tool writes.
pub const BLOCKER_MARKER: &str = "O_o";

/// A calendar event (provider-neutral)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub start: EventTime,
    /// Sources may omit the end; blockers always carry one.
    pub end: Option<EventTime>,
    pub status: EventStatus,
    pub kind: EventKind,
    /// Provider revision stamp (Google `updated`, CalDAV ETag)
    pub revision: Option<String>,

    // Only meaningful on events being written
    pub visibility: Visibility,
    pub reminders: ReminderPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Confirmed,
    Cancelled,
    /// Anything else the backend reports (e.g. "tentative"), passed through.
    Other(String),
}

/// What sort of entry an event is. Pseudo-events mark metadata on a calendar
/// rather than busy time and never produce blockers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Appointment,
    OutOfOffice,
    FocusTime,
    WorkingLocation,
    Birthday,
    Other(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Default,
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderPolicy {
    #[default]
    Default,
    Disabled,
}

/// Knobs applied to every blocker written to a destination calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockerOptions {
    pub visibility: Visibility,
    pub reminders: ReminderPolicy,
}

impl Event {
    /// A minimal confirmed appointment, mostly useful for building fixtures.
    pub fn new(id: impl Into<String>, summary: impl Into<String>, start: EventTime) -> Self {
        Event {
            id: id.into(),
            summary: summary.into(),
            description: None,
            start,
            end: None,
            status: EventStatus::Confirmed,
            kind: EventKind::Appointment,
            revision: None,
            visibility: Visibility::Default,
            reminders: ReminderPolicy::Default,
        }
    }

    /// Whether this event is a placeholder written by calblock.
    pub fn is_blocker(&self) -> bool {
        self.summary.contains(BLOCKER_MARKER)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// End time, synthesized when the source left it out: one hour after a
    /// timed start, one day after an all-day start.
    pub fn resolved_end(&self) -> EventTime {
        self.end.clone().unwrap_or_else(|| self.start.default_end())
    }

    /// Marker stored in the ledger to detect source changes.
    ///
    /// This is the provider's own revision when it reports one. Otherwise it is
    /// a fingerprint of the fields a blocker copies, so it only moves when the
    /// source content moves.
    pub fn revision_marker(&self) -> String {
        match &self.revision {
            Some(rev) if !rev.is_empty() => rev.clone(),
            _ => self.fingerprint(),
        }
    }

    fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.summary.as_bytes());
        hasher.update([0]);
        hasher.update(self.description.as_deref().unwrap_or_default().as_bytes());
        hasher.update([0]);
        hasher.update(self.start.to_string().as_bytes());
        hasher.update([0]);
        hasher.update(self.resolved_end().to_string().as_bytes());
        hasher.update([0]);
        hasher.update(self.status.as_str().as_bytes());
        format!("sha256:{:x}", hasher.finalize())
    }

    /// Build the placeholder that mirrors this event on another calendar.
    pub fn blocker(&self, options: BlockerOptions) -> Event {
        Event {
            id: String::new(),
            summary: format!("{} {}", BLOCKER_MARKER, self.summary),
            description: self.description.clone(),
            start: self.start.clone(),
            end: Some(self.resolved_end()),
            status: EventStatus::Confirmed,
            kind: EventKind::Appointment,
            revision: None,
            visibility: options.visibility,
            reminders: options.reminders,
        }
    }
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Midnight UTC for all-day values.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }

    fn default_end(&self) -> EventTime {
        match self {
            EventTime::DateTime(dt) => EventTime::DateTime(*dt + Duration::hours(1)),
            EventTime::Date(d) => EventTime::Date(*d + Duration::days(1)),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl EventStatus {
    /// Parse a status string from any backend. Case-insensitive; an empty
    /// value means confirmed.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "" | "confirmed" => EventStatus::Confirmed,
            "cancelled" | "canceled" => EventStatus::Cancelled,
            other => EventStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventStatus::Confirmed => "confirmed",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Other(s) => s,
        }
    }
}

impl EventKind {
    pub fn is_pseudo(&self) -> bool {
        matches!(
            self,
            EventKind::WorkingLocation | EventKind::Birthday | EventKind::Other(_)
        )
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Visibility::Default => "default",
            Visibility::Public => "public",
            Visibility::Private => "private",
        };
        f.write_str(s)
    }
}
