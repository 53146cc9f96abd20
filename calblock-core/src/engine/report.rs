//! Counters returned by engine runs.

/// Outcome of one `sync` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub calendars: usize,
    pub events_seen: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Source events that were themselves blockers
    pub skipped_blockers: usize,
    pub skipped_pseudo: usize,
    pub orphans_removed: usize,
    /// Ledger rows whose source fell out of the window but is still live
    pub kept_outside_window: usize,
}

impl SyncReport {
    pub fn remote_writes(&self) -> usize {
        self.created + self.updated + self.orphans_removed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesyncReport {
    pub deleted: usize,
    /// Blockers already removed on the remote side
    pub already_gone: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrubReport {
    pub calendars: usize,
    pub deleted: usize,
    pub already_gone: usize,
    pub ledger_rows_cleared: u64,
}
