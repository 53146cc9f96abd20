use anyhow::Result;
use calblock_core::DateRange;
use chrono::Utc;
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use crate::commands::App;
use crate::render::Render;

/// Stop tracking a calendar.
///
/// Blockers on it are scrubbed, blockers it produced on other calendars are
/// retracted, and its ledger rows and registry entry are dropped.
pub async fn run(app: &App, account: &str, calendar_id: &str, yes: bool) -> Result<()> {
    let registry = app.store.registry();

    let Some(calendar) = registry.get(account, calendar_id).await? else {
        anyhow::bail!("Calendar {}/{} is not registered", account, calendar_id);
    };

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove {} and delete the blockers it is involved in?",
                calendar
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let engine = app.engine().await?;

    let spinner = app.spinner.start(format!("Removing blockers for {}", calendar));
    let result = engine
        .forget_calendar(&calendar, DateRange::scrub_window(Utc::now()))
        .await;
    spinner.finish_and_clear();
    let report = result?;

    registry.remove(account, calendar_id).await?;

    println!("{}", report.render());
    println!("{} {}", "Removed".red(), calendar.render());

    Ok(())
}
