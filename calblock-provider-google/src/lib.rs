//! Google Calendar backend for calblock.

pub mod auth;
mod convert;
mod provider;

pub use auth::{ConsentHook, GoogleAuth, GoogleCredentials, GoogleTokens};
pub use provider::GoogleProvider;
