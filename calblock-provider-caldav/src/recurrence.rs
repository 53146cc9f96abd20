//! Client-side RRULE expansion, for servers that answer a calendar-query
//! with the master component instead of honoring `<C:expand>`.

use std::collections::HashMap;

use calblock_core::{CalblockError, CalblockResult, EventTime};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rrule::RRuleSet;

use crate::ics::{IcsTime, VEvent, shift};

/// Upper bound on generated occurrences per series.
const MAX_OCCURRENCES: u16 = 1000;

/// One concrete occurrence of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// `YYYYMMDD` or `YYYYMMDDTHHMMSSZ`
    pub key: String,
    pub start: EventTime,
    pub end: EventTime,
    /// Set when a RECURRENCE-ID component replaces the generated instance.
    pub overridden_by: Option<usize>,
}

fn ics_line(name: &str, time: &IcsTime) -> String {
    match time {
        IcsTime::Date(d) => format!("{}:{}T000000Z", name, d.format("%Y%m%d")),
        IcsTime::Utc(dt) => format!("{}:{}", name, dt.format("%Y%m%dT%H%M%SZ")),
        IcsTime::Floating(dt) => format!("{}:{}Z", name, dt.format("%Y%m%dT%H%M%S")),
        IcsTime::Zoned { datetime, tzid } if tzid.parse::<chrono_tz::Tz>().is_ok() => format!(
            "{};TZID={}:{}",
            name,
            tzid,
            datetime.format("%Y%m%dT%H%M%S")
        ),
        IcsTime::Zoned { datetime, .. } => {
            format!("{}:{}Z", name, datetime.format("%Y%m%dT%H%M%S"))
        }
    }
}

fn build_rrule_string(master: &VEvent, rrule: &str) -> String {
    let mut lines = vec![ics_line("DTSTART", &master.start), format!("RRULE:{}", rrule)];
    lines.extend(master.exdates.iter().map(|exdate| ics_line("EXDATE", exdate)));
    lines.join("\n")
}

/// Expand `master` into the occurrences intersecting `[time_min, time_max)`.
///
/// `components` are all VEVENTs of the resource; those carrying a
/// RECURRENCE-ID replace the matching generated occurrence.
pub fn expand(
    master: &VEvent,
    components: &[VEvent],
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
) -> CalblockResult<Vec<Occurrence>> {
    let Some(rrule) = master.rrule.as_deref() else {
        return Ok(Vec::new());
    };

    let rrule_set: RRuleSet = build_rrule_string(master, rrule).parse().map_err(|e| {
        CalblockError::Ical(format!("invalid RRULE on {}: {}", master.uid, e))
    })?;

    let length = master.occurrence_length();
    let overrides: HashMap<String, usize> = components
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.recurrence_id.as_ref().map(|rid| (rid.recurrence_key(), i)))
        .collect();

    // Occurrences starting before the window may still overlap it
    let tz: rrule::Tz = Utc.into();
    let after = (time_min - length - Duration::seconds(1)).with_timezone(&tz);
    let before = time_max.with_timezone(&tz);
    let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);

    let mut occurrences = Vec::new();
    for dt in &result.dates {
        let start = match master.start {
            IcsTime::Date(_) => EventTime::Date(dt.date_naive()),
            _ => EventTime::DateTime(dt.with_timezone(&Utc)),
        };
        let end = shift(&start, length);

        if start.to_utc() >= time_max || end.to_utc() <= time_min {
            continue;
        }

        let key = crate::ics::event_time_key(&start);
        let overridden_by = overrides.get(&key).copied();
        occurrences.push(Occurrence {
            key,
            start,
            end,
            overridden_by,
        });
    }

    Ok(occurrences)
}

/// Whether `key` names an occurrence the series excludes via EXDATE.
pub fn is_excluded(master: &VEvent, key: &str) -> bool {
    master.exdates.iter().any(|exdate| exdate.recurrence_key() == key)
}
