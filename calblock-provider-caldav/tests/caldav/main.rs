//! Integration tests for calblock-provider-caldav
//!
//! A wiremock server stands in for the CalDAV server; each test mounts the
//! WebDAV responses it needs.

mod common;

mod test_events;
