//! Engine integration tests.
//!
//! Every test runs the real engine and SQLite ledger (in memory) against an
//! in-memory calendar backend.

mod common;
mod test_desync;
mod test_scrub;
