//! Blocker reconciliation.
//!
//! A `sync` run makes two sequential passes over the tracked calendars:
//!
//! 1. propagation: every real event in the sync window is mirrored as a
//!    blocker on every other tracked calendar, consulting the ledger first;
//! 2. cleanup: ledger rows whose source event was not seen are confirmed
//!    with a direct fetch and removed when the source is gone or cancelled.
//!
//! Every provider call and ledger access is awaited in order. A ledger row is
//! only written after the remote write it describes has succeeded, so an
//! aborted run leaves the ledger describing exactly what exists remotely.

mod cleanup;
mod desync;
mod propagate;
mod report;
mod scrub;

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use crate::date_range::DateRange;
use crate::error::CalblockResult;
use crate::event::BlockerOptions;
use crate::provider::ProviderSet;
use crate::store::Ledger;

pub use report::{DesyncReport, ScrubReport, SyncReport};

/// Source event IDs observed per calendar during a propagation pass.
type SeenEvents = HashMap<String, HashSet<String>>;

pub struct Engine {
    providers: ProviderSet,
    ledger: Ledger,
    options: BlockerOptions,
}

impl Engine {
    pub fn new(providers: ProviderSet, ledger: Ledger) -> Self {
        Engine {
            providers,
            ledger,
            options: BlockerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BlockerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    /// Propagate then clean up over the current sync window.
    pub async fn sync(&self) -> CalblockResult<SyncReport> {
        self.sync_window(DateRange::sync_window(Utc::now())).await
    }

    pub async fn sync_window(&self, window: DateRange) -> CalblockResult<SyncReport> {
        self.providers.check_distinct_calendars()?;

        let mut report = SyncReport {
            calendars: self.providers.calendars().len(),
            ..Default::default()
        };

        let seen = self.propagate(window, &mut report).await?;
        self.remove_orphans(&seen, &mut report).await?;

        tracing::info!(
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            orphans_removed = report.orphans_removed,
            "Sync finished"
        );

        Ok(report)
    }

    /// Delete every blocker the ledger knows about and forget them.
    pub async fn desync(&self) -> CalblockResult<DesyncReport> {
        self.providers.check_distinct_calendars()?;
        self.delete_all_blockers().await
    }

    /// Delete anything carrying the blocker marker from every tracked
    /// calendar, whether or not the ledger knows about it.
    pub async fn scrub(&self) -> CalblockResult<ScrubReport> {
        self.scrub_window(DateRange::scrub_window(Utc::now())).await
    }
}
