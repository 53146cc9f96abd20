//! Shared helpers for engine tests: an in-memory calendar backend that
//! counts writes, plus fixtures.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use calblock_core::{
    CalblockError, CalblockResult, CalendarProvider, CalendarRef, DateRange, Engine, Event,
    EventTime, ProviderSet, Store,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteCounts {
    pub adds: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl WriteCounts {
    pub fn total(&self) -> usize {
        self.adds + self.updates + self.deletes
    }
}

#[derive(Default)]
struct State {
    calendars: HashMap<String, BTreeMap<String, Event>>,
    writes: HashMap<String, WriteCounts>,
    failing: HashSet<String>,
    recreate_on_update: bool,
    next_id: usize,
}

/// Calendar backend kept entirely in memory.
#[derive(Default)]
pub struct FakeProvider {
    state: Mutex<State>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn with_calendars(ids: &[&str]) -> Arc<Self> {
        let provider = FakeProvider::default();
        {
            let mut state = provider.state.lock().unwrap();
            for id in ids {
                state.calendars.insert(id.to_string(), BTreeMap::new());
            }
        }
        Arc::new(provider)
    }

    /// Put an event straight into a calendar without counting a write.
    pub fn seed(&self, calendar_id: &str, event: Event) {
        let mut state = self.state.lock().unwrap();
        state
            .calendars
            .entry(calendar_id.to_string())
            .or_default()
            .insert(event.id.clone(), event);
    }

    /// Change an event in place, as if edited by its owner.
    pub fn edit(&self, calendar_id: &str, event_id: &str, f: impl FnOnce(&mut Event)) {
        let mut state = self.state.lock().unwrap();
        let event = state
            .calendars
            .get_mut(calendar_id)
            .and_then(|events| events.get_mut(event_id))
            .expect("event to edit");
        f(event);
    }

    /// Remove an event without counting a write.
    pub fn remove(&self, calendar_id: &str, event_id: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(events) = state.calendars.get_mut(calendar_id) {
            events.remove(event_id);
        }
    }

    pub fn events(&self, calendar_id: &str) -> Vec<Event> {
        let state = self.state.lock().unwrap();
        state
            .calendars
            .get(calendar_id)
            .map(|events| events.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn writes(&self, calendar_id: &str) -> WriteCounts {
        let state = self.state.lock().unwrap();
        state.writes.get(calendar_id).copied().unwrap_or_default()
    }

    pub fn total_writes(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.writes.values().map(WriteCounts::total).sum()
    }

    pub fn fail_writes_on(&self, calendar_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing.insert(calendar_id.to_string());
    }

    /// Make `update_event` drop the old event and store the replacement
    /// under a new ID, the way a backend that recreates vanished events does.
    pub fn recreate_on_update(&self) {
        let mut state = self.state.lock().unwrap();
        state.recreate_on_update = true;
    }

    fn check_writable(state: &State, calendar_id: &str) -> CalblockResult<()> {
        if state.failing.contains(calendar_id) {
            return Err(CalblockError::RemoteWriteFailed(format!(
                "{} rejected the write",
                calendar_id
            )));
        }
        if !state.calendars.contains_key(calendar_id) {
            return Err(CalblockError::NotFound(calendar_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarProvider for FakeProvider {
    async fn get_calendar(&self, calendar_id: &str) -> CalblockResult<()> {
        let state = self.state.lock().unwrap();
        if state.calendars.contains_key(calendar_id) {
            Ok(())
        } else {
            Err(CalblockError::NotFound(calendar_id.to_string()))
        }
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> CalblockResult<Vec<Event>> {
        let state = self.state.lock().unwrap();
        let events = state
            .calendars
            .get(calendar_id)
            .ok_or_else(|| CalblockError::NotFound(calendar_id.to_string()))?;

        Ok(events
            .values()
            .filter(|e| {
                let start = e.start.to_utc();
                let end = e.resolved_end().to_utc();
                start < time_max && end > time_min
            })
            .cloned()
            .collect())
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> CalblockResult<Event> {
        let state = self.state.lock().unwrap();
        state
            .calendars
            .get(calendar_id)
            .and_then(|events| events.get(event_id))
            .cloned()
            .ok_or_else(|| CalblockError::NotFound(event_id.to_string()))
    }

    async fn add_event(&self, calendar_id: &str, event: &Event) -> CalblockResult<String> {
        let mut state = self.state.lock().unwrap();
        Self::check_writable(&state, calendar_id)?;

        state.next_id += 1;
        let id = format!("blk-{}", state.next_id);
        let mut stored = event.clone();
        stored.id = id.clone();
        stored.revision = Some(format!("rev-{}", state.next_id));

        state
            .calendars
            .entry(calendar_id.to_string())
            .or_default()
            .insert(id.clone(), stored);
        state.writes.entry(calendar_id.to_string()).or_default().adds += 1;

        Ok(id)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> CalblockResult<String> {
        let mut state = self.state.lock().unwrap();
        Self::check_writable(&state, calendar_id)?;

        let id = if state.recreate_on_update {
            state.next_id += 1;
            if let Some(events) = state.calendars.get_mut(calendar_id) {
                events.remove(event_id);
            }
            format!("blk-{}", state.next_id)
        } else {
            event_id.to_string()
        };

        let mut stored = event.clone();
        stored.id = id.clone();
        state
            .calendars
            .entry(calendar_id.to_string())
            .or_default()
            .insert(id.clone(), stored);
        state.writes.entry(calendar_id.to_string()).or_default().updates += 1;

        Ok(id)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> CalblockResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_writable(&state, calendar_id)?;

        let removed = state
            .calendars
            .get_mut(calendar_id)
            .and_then(|events| events.remove(event_id));
        if removed.is_none() {
            return Err(CalblockError::NotFound(event_id.to_string()));
        }
        state.writes.entry(calendar_id.to_string()).or_default().deletes += 1;

        Ok(())
    }
}

/// A ready-to-run engine over `calendar_ids`, all served by one fake backend
/// under one account.
pub struct Harness {
    pub provider: Arc<FakeProvider>,
    pub store: Store,
    pub calendars: Vec<CalendarRef>,
}

#[allow(dead_code)]
impl Harness {
    pub async fn new(calendar_ids: &[&str]) -> Self {
        let provider = FakeProvider::with_calendars(calendar_ids);
        let store = Store::in_memory().await.unwrap();
        let calendars: Vec<CalendarRef> = calendar_ids
            .iter()
            .map(|id| CalendarRef::google("me", *id))
            .collect();

        for calendar in &calendars {
            store.registry().add(calendar).await.unwrap();
        }

        Harness {
            provider,
            store,
            calendars,
        }
    }

    pub fn engine(&self) -> Engine {
        let mut providers = ProviderSet::new(self.calendars.clone());
        for calendar in &self.calendars {
            let key = calendar.provider_key().unwrap();
            if !providers.contains(&key) {
                providers.insert(key, self.provider.clone());
            }
        }
        Engine::new(providers, self.store.ledger())
    }

    pub fn calendar(&self, id: &str) -> &CalendarRef {
        self.calendars
            .iter()
            .find(|c| c.calendar_id == id)
            .expect("calendar in harness")
    }
}

/// Fixed window used by every test: March and April 2025.
pub fn window() -> DateRange {
    DateRange::sync_window(Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap())
}

/// A timed event on 20 March 2025.
pub fn event(id: &str, summary: &str, start_hour: u32, end_hour: u32) -> Event {
    let start = Utc.with_ymd_and_hms(2025, 3, 20, start_hour, 0, 0).unwrap();
    let mut event = Event::new(id, summary, EventTime::DateTime(start));
    event.end = Some(EventTime::DateTime(
        start + Duration::hours(i64::from(end_hour - start_hour)),
    ));
    event.revision = Some(format!("{}-r1", id));
    event
}
