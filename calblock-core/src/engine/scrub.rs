use super::{Engine, ScrubReport};
use crate::calendar::CalendarRef;
use crate::date_range::DateRange;
use crate::error::CalblockResult;

impl Engine {
    pub async fn scrub_window(&self, window: DateRange) -> CalblockResult<ScrubReport> {
        self.providers.check_distinct_calendars()?;

        let mut report = ScrubReport::default();

        for calendar in self.providers.calendars() {
            self.scrub_calendar(calendar, window, &mut report).await?;
        }

        Ok(report)
    }

    /// Stop tracking a calendar: scrub blockers from it, retract the blockers
    /// it produced elsewhere and drop every ledger row that mentions it.
    pub async fn forget_calendar(
        &self,
        calendar: &CalendarRef,
        window: DateRange,
    ) -> CalblockResult<ScrubReport> {
        self.providers.check_distinct_calendars()?;

        let mut report = ScrubReport::default();

        self.scrub_calendar(calendar, window, &mut report).await?;

        for row in self.ledger.all().await? {
            if row.origin_calendar_id != calendar.calendar_id {
                continue;
            }

            match self.providers.calendar(&row.calendar_id) {
                Some(destination) => {
                    if self.retract(destination, &row).await? {
                        report.deleted += 1;
                    } else {
                        report.already_gone += 1;
                    }
                }
                None => {
                    self.ledger
                        .delete(&row.calendar_id, &row.origin_event_id)
                        .await?;
                }
            }
            report.ledger_rows_cleared += 1;
        }

        Ok(report)
    }

    /// Delete every marker-carrying event in the window, ledger or not, then
    /// forget the ledger rows for the calendar.
    async fn scrub_calendar(
        &self,
        calendar: &CalendarRef,
        window: DateRange,
        report: &mut ScrubReport,
    ) -> CalblockResult<()> {
        tracing::info!(calendar = %calendar, "Scrubbing blockers");

        let provider = self.providers.provider_for(calendar)?;
        let events = provider
            .list_events(&calendar.calendar_id, window.from, window.to)
            .await?;

        for event in events.iter().filter(|e| e.is_blocker()) {
            match provider.delete_event(&calendar.calendar_id, &event.id).await {
                Ok(()) => {
                    tracing::info!(calendar = %calendar, summary = %event.summary, "Deleted blocker");
                    report.deleted += 1;
                }
                Err(e) if e.is_not_found() => report.already_gone += 1,
                Err(e) => return Err(e),
            }
        }

        report.ledger_rows_cleared += self.ledger.delete_for_calendar(&calendar.calendar_id).await?;
        report.calendars += 1;

        Ok(())
    }
}
