use anyhow::{Context, Result};
use calblock_core::{CalendarRef, ProviderType};
use dialoguer::{Input, Select};
use owo_colors::OwoColorize;

use crate::commands::App;
use crate::config::CalblockConfig;
use crate::factory;
use crate::render::Render;

/// Register a calendar after checking that it is reachable.
///
/// Anything not passed on the command line is prompted for.
pub async fn run(
    app: &App,
    account: String,
    provider: Option<String>,
    calendar_id: Option<String>,
    server: Option<String>,
) -> Result<()> {
    let provider_type = match provider {
        Some(p) => p.parse::<ProviderType>()?,
        None => prompt_provider_type()?,
    };

    let calendar_id = match calendar_id {
        Some(id) => id,
        None => Input::<String>::new()
            .with_prompt("Calendar ID or URL")
            .interact_text()?,
    };
    let calendar_id = calendar_id.trim().to_string();
    if calendar_id.is_empty() {
        anyhow::bail!("Calendar ID cannot be empty");
    }

    let calendar = match provider_type {
        ProviderType::Google => CalendarRef::google(account, calendar_id),
        ProviderType::CalDav => {
            let server = match server {
                Some(s) => s,
                None => prompt_caldav_server(&app.config)?,
            };
            CalendarRef::caldav(account, calendar_id, server)
        }
    };

    let provider =
        factory::provider_for(&app.config, &app.store, &calendar, &app.consent_hook()).await?;

    let spinner = app.spinner.start(format!("Checking {}", calendar));
    let reachable = provider.get_calendar(&calendar.calendar_id).await;
    spinner.finish_and_clear();
    reachable.with_context(|| format!("Could not access calendar {}", calendar))?;

    app.store.registry().add(&calendar).await?;

    println!("{} {}", "Added".green(), calendar.render());
    println!("\nRun `calblock sync` to mirror busy time.");

    Ok(())
}

fn prompt_provider_type() -> Result<ProviderType> {
    let options = [ProviderType::Google, ProviderType::CalDav];
    let labels: Vec<&str> = options.iter().map(|p| p.as_str()).collect();

    let selection = Select::new()
        .with_prompt("Provider")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(options[selection])
}

fn prompt_caldav_server(config: &CalblockConfig) -> Result<String> {
    let names: Vec<&String> = config.caldav_servers.keys().collect();

    match names.as_slice() {
        [] => anyhow::bail!(
            "No CalDAV servers configured.\n\n\
            Add one to {} first:\n\n  \
            [caldav_servers.fastmail]\n  \
            server_url = \"https://caldav.fastmail.com/\"\n  \
            username = \"me@example.com\"\n  \
            password = \"app-password\"",
            CalblockConfig::default_path()?.display()
        ),
        [only] => Ok(only.to_string()),
        _ => {
            let labels: Vec<String> = config
                .caldav_servers
                .iter()
                .map(|(key, server)| {
                    format!("{} ({})", server.display_name(key), server.server_url)
                })
                .collect();

            let selection = Select::new()
                .with_prompt("CalDAV server")
                .items(&labels)
                .default(0)
                .interact()?;

            Ok(names[selection].to_string())
        }
    }
}
