use anyhow::Result;

use crate::commands::App;
use crate::render::Render;

pub async fn run(app: &App) -> Result<()> {
    let engine = app.require_engine().await?;

    let spinner = app.spinner.start("Syncing blockers".to_string());
    let result = engine.sync().await;
    spinner.finish_and_clear();

    println!("{}", result?.render());

    Ok(())
}
