use anyhow::Result;

use crate::commands::App;
use crate::render::Render;

/// Sweep marker-carrying events off every calendar, ledger or not.
pub async fn run(app: &App) -> Result<()> {
    let engine = app.require_engine().await?;

    let spinner = app.spinner.start("Scrubbing blockers".to_string());
    let result = engine.scrub().await;
    spinner.finish_and_clear();

    println!("{}", result?.render());

    Ok(())
}
