//! Builds one live provider per distinct backend connection.

use std::collections::HashSet;
use std::sync::Arc;

use calblock_core::{
    Backend, CalblockResult, CalendarProvider, CalendarRef, ProviderKey, ProviderSet, Store,
};
use calblock_provider_caldav::CalDavProvider;
use calblock_provider_google::{ConsentHook, GoogleAuth, GoogleCredentials, GoogleProvider};

use crate::config::{CalDavServerConfig, CalblockConfig};

/// What it takes to connect one provider, resolved from the configuration.
#[derive(Debug, Clone)]
enum Connection {
    Google(GoogleCredentials),
    CalDav {
        server_name: String,
        server: CalDavServerConfig,
    },
}

/// Resolve a key against the configuration without touching the network.
fn resolve(config: &CalblockConfig, key: &ProviderKey) -> CalblockResult<Connection> {
    match &key.backend {
        Backend::Google => Ok(Connection::Google(config.google_credentials()?)),
        Backend::CalDav(server_name) => Ok(Connection::CalDav {
            server_name: server_name.clone(),
            server: config.caldav_server(server_name)?.clone(),
        }),
    }
}

/// Distinct keys of `calendars`, each resolved, in first-seen order.
///
/// Every calendar is checked before anything connects, so one bad row fails
/// the whole run up front.
fn plan(
    config: &CalblockConfig,
    calendars: &[CalendarRef],
) -> CalblockResult<Vec<(ProviderKey, Connection)>> {
    let mut seen = HashSet::new();
    let mut planned = Vec::new();

    for calendar in calendars {
        let key = calendar.provider_key()?;
        if !seen.insert(key.clone()) {
            continue;
        }
        let connection = resolve(config, &key)?;
        planned.push((key, connection));
    }

    Ok(planned)
}

async fn connect(
    key: &ProviderKey,
    connection: Connection,
    store: &Store,
    consent: &ConsentHook,
) -> CalblockResult<Arc<dyn CalendarProvider>> {
    match connection {
        Connection::Google(credentials) => {
            let auth = GoogleAuth::new(&key.account_name, credentials, store.tokens())
                .with_consent_hook(consent.clone());
            Ok(Arc::new(GoogleProvider::new(auth)))
        }
        Connection::CalDav {
            server_name,
            server,
        } => {
            let provider = CalDavProvider::connect(
                &server_name,
                &server.server_url,
                &server.username,
                &server.password,
            )
            .await?;
            Ok(Arc::new(provider))
        }
    }
}

/// A provider for a single calendar, used when registering it.
pub async fn provider_for(
    config: &CalblockConfig,
    store: &Store,
    calendar: &CalendarRef,
    consent: &ConsentHook,
) -> CalblockResult<Arc<dyn CalendarProvider>> {
    let key = calendar.provider_key()?;
    let connection = resolve(config, &key)?;
    connect(&key, connection, store, consent).await
}

/// Providers for every tracked calendar; calendars sharing an account and
/// server share one provider.
pub async fn build_providers(
    config: &CalblockConfig,
    store: &Store,
    calendars: Vec<CalendarRef>,
    consent: &ConsentHook,
) -> CalblockResult<ProviderSet> {
    let planned = plan(config, &calendars)?;
    let mut providers = ProviderSet::new(calendars);

    for (key, connection) in planned {
        tracing::debug!(provider = %key, "Connecting provider");
        let provider = connect(&key, connection, store, consent).await?;
        providers.insert(key, provider);
    }

    Ok(providers)
}
