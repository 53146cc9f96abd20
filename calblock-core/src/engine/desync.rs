use super::{DesyncReport, Engine};
use crate::error::{CalblockError, CalblockResult};

impl Engine {
    /// Walk the whole ledger, deleting each blocker and its row in turn.
    ///
    /// Rows are dropped one by one right after their remote delete, so an
    /// interrupted desync can simply be rerun.
    pub(super) async fn delete_all_blockers(&self) -> CalblockResult<DesyncReport> {
        let mut report = DesyncReport::default();

        for row in self.ledger.all().await? {
            let destination = self.providers.calendar(&row.calendar_id).ok_or_else(|| {
                CalblockError::ConfigInvalid(format!(
                    "ledger references calendar {} which is no longer registered",
                    row.calendar_id
                ))
            })?;

            if self.retract(destination, &row).await? {
                report.deleted += 1;
            } else {
                report.already_gone += 1;
            }
        }

        Ok(report)
    }
}
