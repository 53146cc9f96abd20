use super::{Engine, SeenEvents, SyncReport};
use crate::calendar::CalendarRef;
use crate::error::CalblockResult;
use crate::store::BlockerRecord;

impl Engine {
    /// Remove blockers whose source event is gone or cancelled.
    ///
    /// Not appearing in the window listing is not enough: the source is
    /// fetched directly, and only a not-found or cancelled answer makes the
    /// blocker an orphan.
    pub(super) async fn remove_orphans(
        &self,
        seen: &SeenEvents,
        report: &mut SyncReport,
    ) -> CalblockResult<()> {
        let calendars = self.providers.calendars();

        for source in calendars {
            let seen_ids = seen.get(&source.calendar_id);
            let destinations = calendars
                .iter()
                .filter(|d| d.calendar_id != source.calendar_id);

            for destination in destinations {
                let rows = self
                    .ledger
                    .blockers_between(&source.calendar_id, &destination.calendar_id)
                    .await?;

                for row in rows {
                    if seen_ids.is_some_and(|ids| ids.contains(&row.origin_event_id)) {
                        continue;
                    }

                    if self.origin_is_live(source, &row).await? {
                        report.kept_outside_window += 1;
                        continue;
                    }

                    self.retract(destination, &row).await?;
                    report.orphans_removed += 1;
                }
            }
        }

        Ok(())
    }

    async fn origin_is_live(&self, source: &CalendarRef, row: &BlockerRecord) -> CalblockResult<bool> {
        let provider = self.providers.provider_for(source)?;

        match provider
            .get_event(&source.calendar_id, &row.origin_event_id)
            .await
        {
            Ok(event) => Ok(!event.is_cancelled()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete a blocker remotely, then drop its ledger row. A blocker that is
    /// already gone counts as deleted.
    pub(super) async fn retract(
        &self,
        destination: &CalendarRef,
        row: &BlockerRecord,
    ) -> CalblockResult<bool> {
        let provider = self.providers.provider_for(destination)?;

        let deleted = match provider
            .delete_event(&destination.calendar_id, &row.event_id)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    calendar = %destination,
                    event_id = %row.event_id,
                    origin_event_id = %row.origin_event_id,
                    "Deleted blocker"
                );
                true
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    calendar = %destination,
                    event_id = %row.event_id,
                    "Blocker already gone"
                );
                false
            }
            Err(e) => return Err(e),
        };

        self.ledger
            .delete(&row.calendar_id, &row.origin_event_id)
            .await?;

        Ok(deleted)
    }
}
