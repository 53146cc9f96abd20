use anyhow::Result;

use crate::commands::App;
use crate::render::Render;

/// Delete every blocker the ledger knows about.
pub async fn run(app: &App) -> Result<()> {
    let engine = app.engine().await?;

    let spinner = app.spinner.start("Removing blockers".to_string());
    let result = engine.desync().await;
    spinner.finish_and_clear();

    println!("{}", result?.render());

    Ok(())
}
