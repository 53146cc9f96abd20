//! Core of calblock: mirrors busy time across calendars as blocker events.
//!
//! This crate provides:
//! - `Event`, `CalendarRef` and the `CalendarProvider` trait backends implement
//! - `store` with the SQLite ledger, calendar registry and token store
//! - `engine` with the `sync`, `desync` and `scrub` reconciliation runs

pub mod calendar;
pub mod date_range;
pub mod engine;
pub mod error;
pub mod event;
pub mod provider;
pub mod store;

pub use calendar::{Backend, CalendarRef, ProviderKey, ProviderType};
pub use date_range::DateRange;
pub use engine::{DesyncReport, Engine, ScrubReport, SyncReport};
pub use error::{CalblockError, CalblockResult};
pub use event::{
    BLOCKER_MARKER, BlockerOptions, Event, EventKind, EventStatus, EventTime, ReminderPolicy,
    Visibility,
};
pub use provider::{CalendarProvider, ProviderSet};
pub use store::{BlockerRecord, Ledger, Store};
