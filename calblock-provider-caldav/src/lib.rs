//! CalDAV backend for calblock.
//!
//! Talks plain WebDAV over reqwest: calendar-query REPORTs for listing,
//! GET/PUT/DELETE on `.ics` resources for single events.

mod client;
mod ics;
mod multistatus;
mod provider;
mod recurrence;

pub use provider::CalDavProvider;
