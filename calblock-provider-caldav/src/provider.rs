use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use calblock_core::{CalblockError, CalblockResult, CalendarProvider, Event};

use crate::client::DavClient;
use crate::ics::{self, VEvent};
use crate::multistatus::{
    PROPFIND_RESOURCETYPE, calendar_query, is_calendar_collection, parse_calendar_resources,
    resource_name,
};
use crate::recurrence;

/// Separates a resource name from an instance's RECURRENCE-ID in event ids.
const INSTANCE_SEPARATOR: char = '#';

/// Calendars on one CalDAV server, reached with one set of credentials.
pub struct CalDavProvider {
    server_name: String,
    client: DavClient,
}

impl CalDavProvider {
    /// Build a provider and check that the server answers with these
    /// credentials.
    pub async fn connect(
        server_name: &str,
        server_url: &str,
        username: &str,
        password: &str,
    ) -> CalblockResult<Self> {
        let client = DavClient::new(server_url, username, password)?;
        client
            .propfind(client.base_url(), "0", PROPFIND_RESOURCETYPE)
            .await?;

        tracing::debug!(server = server_name, url = %client.base_url(), "Connected to CalDAV server");

        Ok(CalDavProvider {
            server_name: server_name.to_string(),
            client,
        })
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }
}

/// `("flight.ics", None)` for whole resources and
/// `("standup.ics", Some("20250310T090000Z"))` for instance ids.
///
/// Resource names may contain the separator themselves, so only a trailing
/// RECURRENCE-ID key (`YYYYMMDD` or `YYYYMMDDTHHMMSSZ`) is split off.
fn split_event_id(event_id: &str) -> (&str, Option<&str>) {
    match event_id.rsplit_once(INSTANCE_SEPARATOR) {
        Some((resource, key)) if !resource.is_empty() && is_recurrence_key(key) => {
            (resource, Some(key))
        }
        _ => (event_id, None),
    }
}

fn is_recurrence_key(key: &str) -> bool {
    let bytes = key.as_bytes();
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);

    match bytes.len() {
        8 => digits(0..8),
        16 => digits(0..8) && bytes[8] == b'T' && digits(9..15) && bytes[15] == b'Z',
        _ => false,
    }
}

fn instance_id(resource: &str, key: &str) -> String {
    format!("{}{}{}", resource, INSTANCE_SEPARATOR, key)
}

/// UID for a blocker stored under `resource`.
fn uid_for(resource: &str) -> &str {
    resource.strip_suffix(".ics").unwrap_or(resource)
}

fn intersects(event: &Event, time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> bool {
    event.start.to_utc() < time_max && event.resolved_end().to_utc() > time_min
}

/// Turn the components of one calendar resource into events.
///
/// Servers that honored `<C:expand>` return one component per instance, each
/// with a RECURRENCE-ID. Servers that did not return the master with its
/// RRULE, which is expanded here.
fn resource_events(
    resource: &str,
    etag: Option<String>,
    components: &[VEvent],
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
) -> CalblockResult<Vec<Event>> {
    let master = components
        .iter()
        .find(|c| c.recurrence_id.is_none() && c.rrule.is_some());

    let Some(master) = master else {
        return Ok(components
            .iter()
            .map(|c| {
                let id = match &c.recurrence_id {
                    Some(rid) => instance_id(resource, &rid.recurrence_key()),
                    None => resource.to_string(),
                };
                c.to_event(id, etag.clone())
            })
            .filter(|e| intersects(e, time_min, time_max))
            .collect());
    };

    let occurrences = recurrence::expand(master, components, time_min, time_max)?;
    let mut events = Vec::with_capacity(occurrences.len());

    for occurrence in &occurrences {
        let id = instance_id(resource, &occurrence.key);
        let event = match occurrence.overridden_by {
            Some(i) => components[i].to_event(id, etag.clone()),
            None => {
                let mut event = master.to_event(id, etag.clone());
                event.start = occurrence.start.clone();
                event.end = Some(occurrence.end.clone());
                event
            }
        };
        if intersects(&event, time_min, time_max) {
            events.push(event);
        }
    }

    // Overrides moved into the window from an occurrence outside it
    for component in components {
        let Some(rid) = &component.recurrence_id else {
            continue;
        };
        let key = rid.recurrence_key();
        if occurrences.iter().any(|o| o.key == key) {
            continue;
        }
        let event = component.to_event(instance_id(resource, &key), etag.clone());
        if intersects(&event, time_min, time_max) {
            events.push(event);
        }
    }

    Ok(events)
}

#[async_trait]
impl CalendarProvider for CalDavProvider {
    async fn get_calendar(&self, calendar_id: &str) -> CalblockResult<()> {
        let url = self.client.calendar_url(calendar_id)?;
        let body = self.client.propfind(&url, "0", PROPFIND_RESOURCETYPE).await?;

        if is_calendar_collection(&body)? {
            Ok(())
        } else {
            Err(CalblockError::NotFound(format!(
                "{} is not a calendar collection",
                url
            )))
        }
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> CalblockResult<Vec<Event>> {
        let url = self.client.calendar_url(calendar_id)?;
        let body = self
            .client
            .report(&url, &calendar_query(time_min, time_max))
            .await?;

        let mut events = Vec::new();
        for resource in parse_calendar_resources(&body)? {
            let name = resource_name(&resource.href);
            let components = match ics::parse_resource(&resource.data) {
                Ok(components) => components,
                Err(e) => {
                    tracing::warn!(href = %resource.href, "Skipping unreadable resource: {}", e);
                    continue;
                }
            };

            events.extend(resource_events(
                &name,
                resource.etag,
                &components,
                time_min,
                time_max,
            )?);
        }

        tracing::debug!(calendar = calendar_id, count = events.len(), "Listed events");
        Ok(events)
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> CalblockResult<Event> {
        let (resource, instance) = split_event_id(event_id);
        let calendar_url = self.client.calendar_url(calendar_id)?;
        let url = self.client.resource_url(&calendar_url, resource)?;

        let (body, etag) = self.client.get(&url).await?;
        let components = ics::parse_resource(&body)?;

        let master = components
            .iter()
            .find(|c| c.recurrence_id.is_none())
            .or_else(|| components.first())
            .ok_or_else(|| CalblockError::NotFound(format!("{} holds no event", url)))?;

        let Some(key) = instance else {
            return Ok(master.to_event(event_id.to_string(), etag));
        };

        let overridden = components.iter().find(|c| {
            c.recurrence_id
                .as_ref()
                .is_some_and(|rid| rid.recurrence_key() == key)
        });
        if let Some(component) = overridden {
            return Ok(component.to_event(event_id.to_string(), etag));
        }

        if recurrence::is_excluded(master, key) {
            return Err(CalblockError::NotFound(format!(
                "{} is excluded from its series",
                event_id
            )));
        }

        Ok(master.to_event(event_id.to_string(), etag))
    }

    async fn add_event(&self, calendar_id: &str, event: &Event) -> CalblockResult<String> {
        let uid = format!("calblock-{}", Uuid::new_v4());
        let resource = format!("{}.ics", uid);
        let calendar_url = self.client.calendar_url(calendar_id)?;
        let url = self.client.resource_url(&calendar_url, &resource)?;

        self.client
            .put(&url, ics::generate_ics(&uid, event), true)
            .await?;

        Ok(resource)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> CalblockResult<String> {
        let (resource, _) = split_event_id(event_id);
        let calendar_url = self.client.calendar_url(calendar_id)?;
        let url = self.client.resource_url(&calendar_url, resource)?;

        self.client
            .put(&url, ics::generate_ics(uid_for(resource), event), false)
            .await?;

        Ok(resource.to_string())
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> CalblockResult<()> {
        let (resource, _) = split_event_id(event_id);
        let calendar_url = self.client.calendar_url(calendar_id)?;
        let url = self.client.resource_url(&calendar_url, resource)?;

        self.client.delete(&url).await
    }
}
