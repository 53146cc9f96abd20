pub mod add;
pub mod auth;
pub mod cleanup;
pub mod desync;
pub mod list;
pub mod remove;
pub mod sync;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use calblock_core::{Engine, Store};
use calblock_provider_google::ConsentHook;

use crate::config::CalblockConfig;
use crate::factory;
use crate::utils::tui::ActiveSpinner;

/// Configuration and store shared by every command.
pub struct App {
    pub config: CalblockConfig,
    pub store: Store,
    pub spinner: ActiveSpinner,
}

impl App {
    pub async fn load(config_path: Option<&Path>, db_path: Option<&Path>) -> Result<Self> {
        let config = CalblockConfig::load(config_path)?;
        let db_path = config.database_path(db_path)?;

        tracing::debug!(path = %db_path.display(), "Opening store");
        let store = Store::open(&db_path)
            .await
            .with_context(|| format!("Failed to open store at {}", db_path.display()))?;

        Ok(App {
            config,
            store,
            spinner: ActiveSpinner::default(),
        })
    }

    /// Clears the active spinner before a Google consent prompt.
    pub fn consent_hook(&self) -> ConsentHook {
        let spinner = self.spinner.clone();
        Arc::new(move || spinner.clear())
    }

    /// An engine over every registered calendar.
    pub async fn engine(&self) -> Result<Engine> {
        let calendars = self.store.registry().list().await?;
        let providers =
            factory::build_providers(&self.config, &self.store, calendars, &self.consent_hook())
                .await?;

        Ok(Engine::new(providers, self.store.ledger()).with_options(self.config.blocker_options()))
    }

    /// Like [`App::engine`], but fails with a hint when nothing is registered.
    pub async fn require_engine(&self) -> Result<Engine> {
        let engine = self.engine().await?;

        if engine.providers().calendars().is_empty() {
            anyhow::bail!(
                "No calendars registered.\n\n\
                Register your first calendar with:\n  \
                calblock add <account>"
            );
        }

        Ok(engine)
    }
}
