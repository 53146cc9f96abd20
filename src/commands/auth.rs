use anyhow::Result;
use calblock_provider_google::GoogleAuth;

use crate::commands::App;

/// Run the Google consent flow for an account ahead of the first sync.
pub async fn run(app: &App, account: &str) -> Result<()> {
    let credentials = app.config.google_credentials()?;
    let auth = GoogleAuth::new(account, credentials, app.store.tokens());

    println!("Authenticating {}...", account);
    auth.authorize().await?;

    println!("Authenticated as: {}", account);
    println!("\nRun `calblock add {}` to register a calendar.", account);

    Ok(())
}
