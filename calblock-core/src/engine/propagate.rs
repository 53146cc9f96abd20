use std::collections::HashSet;

use super::{Engine, SeenEvents, SyncReport};
use crate::calendar::CalendarRef;
use crate::date_range::DateRange;
use crate::error::CalblockResult;
use crate::event::Event;
use crate::store::BlockerRecord;

impl Engine {
    /// Mirror every qualifying source event onto every other calendar.
    /// Returns the event IDs seen on each source calendar.
    pub(super) async fn propagate(
        &self,
        window: DateRange,
        report: &mut SyncReport,
    ) -> CalblockResult<SeenEvents> {
        let calendars = self.providers.calendars();
        let mut seen = SeenEvents::new();
        // (destination, origin event) pairs already settled during this pass.
        // The same event ID can show up on two sources when both calendars
        // hold a copy of one invitation; only the first source writes.
        let mut settled: HashSet<(String, String)> = HashSet::new();

        for source in calendars {
            tracing::info!(calendar = %source, "Propagating events");

            let provider = self.providers.provider_for(source)?;
            let events = provider
                .list_events(&source.calendar_id, window.from, window.to)
                .await?;

            let seen_ids = seen.entry(source.calendar_id.clone()).or_default();

            for event in &events {
                if event.is_blocker() {
                    report.skipped_blockers += 1;
                    continue;
                }
                if event.kind.is_pseudo() {
                    report.skipped_pseudo += 1;
                    continue;
                }
                if event.is_cancelled() {
                    continue;
                }

                seen_ids.insert(event.id.clone());
                report.events_seen += 1;

                let marker = event.revision_marker();
                let destinations = calendars
                    .iter()
                    .filter(|d| d.calendar_id != source.calendar_id);

                for destination in destinations {
                    let key = (destination.calendar_id.clone(), event.id.clone());
                    if settled.contains(&key) {
                        continue;
                    }

                    self.propagate_to(source, event, &marker, destination, report)
                        .await?;
                    settled.insert(key);
                }
            }
        }

        Ok(seen)
    }

    async fn propagate_to(
        &self,
        source: &CalendarRef,
        event: &Event,
        marker: &str,
        destination: &CalendarRef,
        report: &mut SyncReport,
    ) -> CalblockResult<()> {
        let existing = self
            .ledger
            .find(&destination.calendar_id, &event.id)
            .await?;

        if let Some(record) = &existing {
            if record.is_current(&source.calendar_id, marker) {
                report.unchanged += 1;
                return Ok(());
            }
        }

        let provider = self.providers.provider_for(destination)?;
        let blocker = event.blocker(self.options);

        let blocker_id = match &existing {
            Some(record) => {
                let id = provider
                    .update_event(&destination.calendar_id, &record.event_id, &blocker)
                    .await?;
                report.updated += 1;
                tracing::info!(
                    calendar = %destination,
                    event_id = %id,
                    summary = %blocker.summary,
                    "Updated blocker"
                );
                id
            }
            None => {
                let id = provider
                    .add_event(&destination.calendar_id, &blocker)
                    .await?;
                report.created += 1;
                tracing::info!(
                    calendar = %destination,
                    event_id = %id,
                    summary = %blocker.summary,
                    "Created blocker"
                );
                id
            }
        };

        self.ledger
            .upsert(&BlockerRecord {
                event_id: blocker_id,
                calendar_id: destination.calendar_id.clone(),
                account_name: destination.account_name.clone(),
                origin_event_id: event.id.clone(),
                origin_calendar_id: source.calendar_id.clone(),
                last_updated: marker.to_string(),
                response_status: None,
            })
            .await
    }
}
