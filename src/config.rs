//! User configuration: `~/.config/calblock/config.toml` plus `CALBLOCK__*`
//! environment overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use calblock_core::{BlockerOptions, CalblockError, CalblockResult, ReminderPolicy, Visibility};
use calblock_provider_google::GoogleCredentials;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalblockConfig {
    /// Where the SQLite store lives. `~` is expanded.
    #[serde(default)]
    pub database_path: Option<String>,

    #[serde(default)]
    pub google: Option<GoogleConfig>,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub caldav_servers: BTreeMap<String, CalDavServerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub disable_reminders: bool,

    #[serde(default)]
    pub block_event_visibility: Visibility,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalDavServerConfig {
    /// Display name; the table key is used when empty.
    #[serde(default)]
    pub name: String,
    pub server_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl CalDavServerConfig {
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        if self.name.is_empty() { key } else { &self.name }
    }
}

impl CalblockConfig {
    pub fn default_path() -> CalblockResult<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("calblock").join("config.toml"))
            .ok_or_else(|| {
                CalblockError::ConfigInvalid("could not determine config directory".to_string())
            })
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicitly passed file must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> CalblockResult<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        let builder = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(required))
            .add_source(
                Environment::with_prefix("CALBLOCK")
                    .prefix_separator("__")
                    .separator("__"),
            );

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> CalblockResult<Self> {
        builder
            .build()
            .map_err(|e| CalblockError::ConfigInvalid(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalblockError::ConfigInvalid(e.to_string()))
    }

    /// The store path: `override_path`, then `database_path`, then the
    /// platform data directory.
    pub fn database_path(&self, override_path: Option<&Path>) -> CalblockResult<PathBuf> {
        if let Some(path) = override_path {
            return Ok(path.to_path_buf());
        }

        if let Some(configured) = &self.database_path {
            return Ok(PathBuf::from(shellexpand::tilde(configured).into_owned()));
        }

        dirs::data_dir()
            .map(|d| d.join("calblock").join("calblock.db"))
            .ok_or_else(|| {
                CalblockError::ConfigInvalid("could not determine data directory".to_string())
            })
    }

    pub fn blocker_options(&self) -> BlockerOptions {
        BlockerOptions {
            visibility: self.sync.block_event_visibility,
            reminders: if self.sync.disable_reminders {
                ReminderPolicy::Disabled
            } else {
                ReminderPolicy::Default
            },
        }
    }

    pub fn google_credentials(&self) -> CalblockResult<GoogleCredentials> {
        match &self.google {
            Some(g) if !g.client_id.is_empty() && !g.client_secret.is_empty() => {
                Ok(GoogleCredentials {
                    client_id: g.client_id.clone(),
                    client_secret: g.client_secret.clone(),
                })
            }
            _ => Err(CalblockError::ConfigInvalid(
                "Google calendars are tracked but no [google] client_id/client_secret is configured"
                    .to_string(),
            )),
        }
    }

    pub fn caldav_server(&self, name: &str) -> CalblockResult<&CalDavServerConfig> {
        self.caldav_servers.get(name).ok_or_else(|| {
            CalblockError::ConfigInvalid(format!(
                "CalDAV server '{}' is not configured under [caldav_servers]",
                name
            ))
        })
    }
}
