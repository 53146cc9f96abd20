//! Tracked calendars and the keys used to share providers between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CalblockError;

/// Server name written by early versions before multiple CalDAV servers were
/// supported. Calendars still carrying it must be re-added.
pub const LEGACY_CALDAV_SERVER: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Google,
    CalDav,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Google => "google",
            ProviderType::CalDav => "caldav",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = CalblockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(ProviderType::Google),
            "caldav" => Ok(ProviderType::CalDav),
            other => Err(CalblockError::ConfigInvalid(format!(
                "unsupported provider type: {}",
                other
            ))),
        }
    }
}

/// A calendar registered for synchronization.
///
/// `(account_name, calendar_id)` is unique across the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRef {
    pub account_name: String,
    pub provider_type: ProviderType,
    /// Google calendar ID or CalDAV collection URL
    pub calendar_id: String,
    /// Named CalDAV server this calendar lives on
    pub provider_config: Option<String>,
}

impl CalendarRef {
    pub fn google(account_name: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        CalendarRef {
            account_name: account_name.into(),
            provider_type: ProviderType::Google,
            calendar_id: calendar_id.into(),
            provider_config: None,
        }
    }

    pub fn caldav(
        account_name: impl Into<String>,
        calendar_id: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        CalendarRef {
            account_name: account_name.into(),
            provider_type: ProviderType::CalDav,
            calendar_id: calendar_id.into(),
            provider_config: Some(server.into()),
        }
    }

    /// Which provider instance serves this calendar.
    pub fn provider_key(&self) -> Result<ProviderKey, CalblockError> {
        let backend = match self.provider_type {
            ProviderType::Google => Backend::Google,
            ProviderType::CalDav => match self.provider_config.as_deref() {
                None | Some("") | Some(LEGACY_CALDAV_SERVER) => {
                    return Err(CalblockError::ConfigInvalid(format!(
                        "calendar {} references the removed legacy CalDAV configuration; remove and re-add it",
                        self.calendar_id
                    )));
                }
                Some(server) => Backend::CalDav(server.to_string()),
            },
        };

        Ok(ProviderKey {
            account_name: self.account_name.clone(),
            backend,
        })
    }
}

impl fmt::Display for CalendarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account_name, self.calendar_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Backend {
    Google,
    CalDav(String),
}

/// One live provider exists per key; calendars sharing a key share a
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderKey {
    pub account_name: String,
    pub backend: Backend,
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.backend {
            Backend::Google => write!(f, "{} (google)", self.account_name),
            Backend::CalDav(server) => write!(f, "{} (caldav:{})", self.account_name, server),
        }
    }
}
