//! The capability interface every calendar backend implements.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::calendar::{CalendarRef, ProviderKey};
use crate::error::{CalblockError, CalblockResult};
use crate::event::Event;

/// Operations the engine needs from a calendar backend.
///
/// Implementations translate between [`Event`] and their native
/// representation and map backend failures onto [`CalblockError`]:
/// a missing object is always `NotFound`, rejected credentials are
/// `AuthRequired`/`AuthExpired`, and rejected writes are `RemoteWriteFailed`.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Reachability check for a calendar.
    async fn get_calendar(&self, calendar_id: &str) -> CalblockResult<()>;

    /// Every occurrence intersecting `[time_min, time_max)`, with recurring
    /// series already expanded into instances.
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> CalblockResult<Vec<Event>>;

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> CalblockResult<Event>;

    /// Create an event and return the identifier the backend assigned.
    async fn add_event(&self, calendar_id: &str, event: &Event) -> CalblockResult<String>;

    /// Replace an event. Must accept identifiers the backend no longer knows,
    /// creating the event instead; the returned identifier is the one to keep.
    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> CalblockResult<String>;

    /// Fails with `NotFound` when the event is already gone.
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> CalblockResult<()>;
}

/// The tracked calendars together with one provider per backend connection.
///
/// Built once per invocation and handed to the engine.
#[derive(Clone, Default)]
pub struct ProviderSet {
    calendars: Vec<CalendarRef>,
    providers: HashMap<ProviderKey, Arc<dyn CalendarProvider>>,
}

impl ProviderSet {
    pub fn new(calendars: Vec<CalendarRef>) -> Self {
        ProviderSet {
            calendars,
            providers: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: ProviderKey, provider: Arc<dyn CalendarProvider>) {
        self.providers.insert(key, provider);
    }

    pub fn contains(&self, key: &ProviderKey) -> bool {
        self.providers.contains_key(key)
    }

    pub fn calendars(&self) -> &[CalendarRef] {
        &self.calendars
    }

    /// Calendars are told apart by `calendar_id` alone, so two accounts
    /// tracking the same ID would silently be treated as one calendar.
    pub fn check_distinct_calendars(&self) -> CalblockResult<()> {
        let mut owners: HashMap<&str, &str> = HashMap::new();

        for calendar in &self.calendars {
            if let Some(owner) = owners.insert(&calendar.calendar_id, &calendar.account_name) {
                return Err(CalblockError::ConfigInvalid(format!(
                    "calendar {} is tracked by both {} and {}",
                    calendar.calendar_id, owner, calendar.account_name
                )));
            }
        }

        Ok(())
    }

    pub fn calendar(&self, calendar_id: &str) -> Option<&CalendarRef> {
        self.calendars.iter().find(|c| c.calendar_id == calendar_id)
    }

    pub fn provider_for(&self, calendar: &CalendarRef) -> CalblockResult<&Arc<dyn CalendarProvider>> {
        let key = calendar.provider_key()?;
        self.providers.get(&key).ok_or_else(|| {
            CalblockError::ConfigInvalid(format!(
                "no provider configured for {} ({})",
                calendar, key
            ))
        })
    }
}
