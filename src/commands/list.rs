use anyhow::Result;

use crate::commands::App;
use crate::render::Render;

pub async fn run(app: &App) -> Result<()> {
    let calendars = app.store.registry().list_with_counts().await?;

    if calendars.is_empty() {
        println!("No calendars registered. Add one with `calblock add <account>`.");
        return Ok(());
    }

    for summary in &calendars {
        println!("{}", summary.render());
    }

    Ok(())
}
