//! OAuth session handling for Google accounts.
//!
//! Tokens live in the store's `tokens` table. An expired access token is
//! refreshed with the refresh grant; missing or rejected credentials require
//! the interactive consent flow (browser plus a localhost callback).

use std::sync::Arc;

use calblock_core::store::TokenStore;
use calblock_core::{CalblockError, CalblockResult};
use chrono::{DateTime, Duration, Utc};
use google_calendar::{AccessToken, Client};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

const REDIRECT_PORT: u16 = 8085;

/// Access tokens are treated as expired this long before Google says so.
const EXPIRY_SKEW_SECS: i64 = 60;

pub fn redirect_uri() -> String {
    format!("http://localhost:{}/callback", REDIRECT_PORT)
}

fn redirect_address() -> String {
    format!("127.0.0.1:{}", REDIRECT_PORT)
}

/// The OAuth client registered in Google Cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl GoogleTokens {
    /// Google usually leaves the refresh token out of refresh responses;
    /// `previous_refresh_token` is kept in that case.
    fn from_access_token(token: &AccessToken, previous_refresh_token: Option<&str>) -> Self {
        let refresh_token = if token.refresh_token.is_empty() {
            previous_refresh_token.unwrap_or_default().to_string()
        } else {
            token.refresh_token.clone()
        };

        GoogleTokens {
            access_token: token.access_token.clone(),
            refresh_token,
            expires_at: (token.expires_in > 0)
                .then(|| Utc::now() + Duration::seconds(token.expires_in)),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| now + Duration::seconds(EXPIRY_SKEW_SECS) >= at)
    }
}

/// Runs right before the consent URL is printed, so the caller can release
/// the terminal (clear a spinner, say).
pub type ConsentHook = Arc<dyn Fn() + Send + Sync>;

/// Credentials for one Google account.
pub struct GoogleAuth {
    account: String,
    credentials: GoogleCredentials,
    store: TokenStore,
    cached: Mutex<Option<GoogleTokens>>,
    on_consent: Option<ConsentHook>,
}

impl GoogleAuth {
    pub fn new(account: &str, credentials: GoogleCredentials, store: TokenStore) -> Self {
        GoogleAuth {
            account: account.to_string(),
            credentials,
            store,
            cached: Mutex::new(None),
            on_consent: None,
        }
    }

    pub fn with_consent_hook(mut self, hook: ConsentHook) -> Self {
        self.on_consent = Some(hook);
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    fn client_with(&self, tokens: Option<&GoogleTokens>) -> Client {
        Client::new(
            self.credentials.client_id.clone(),
            self.credentials.client_secret.clone(),
            redirect_uri(),
            tokens.map(|t| t.access_token.clone()).unwrap_or_default(),
            tokens.map(|t| t.refresh_token.clone()).unwrap_or_default(),
        )
    }

    /// An API client with a usable access token, refreshing it first if it
    /// has expired.
    pub async fn client(&self) -> CalblockResult<Client> {
        let mut cached = self.cached.lock().await;

        if cached.is_none() {
            *cached = self.store.load::<GoogleTokens>(&self.account).await?;
        }

        let Some(tokens) = cached.clone() else {
            return Err(CalblockError::AuthRequired(format!(
                "no Google credentials stored for {}",
                self.account
            )));
        };

        if !tokens.is_expired(Utc::now()) {
            return Ok(self.client_with(Some(&tokens)));
        }

        let refreshed = self.refresh(&tokens).await?;
        let client = self.client_with(Some(&refreshed));
        *cached = Some(refreshed);
        Ok(client)
    }

    async fn refresh(&self, tokens: &GoogleTokens) -> CalblockResult<GoogleTokens> {
        if tokens.refresh_token.is_empty() {
            return Err(CalblockError::AuthExpired(format!(
                "access token for {} expired and no refresh token is stored",
                self.account
            )));
        }

        tracing::debug!(account = %self.account, "Refreshing Google access token");

        let access_token = self
            .client_with(Some(tokens))
            .refresh_access_token()
            .await
            .map_err(|e| {
                CalblockError::AuthExpired(format!(
                    "failed to refresh token for {}: {}",
                    self.account, e
                ))
            })?;

        let refreshed = GoogleTokens::from_access_token(&access_token, Some(&tokens.refresh_token));
        self.store.save(&self.account, &refreshed).await?;

        Ok(refreshed)
    }

    fn consent_url(&self, client: &mut Client) -> String {
        if let Some(hook) = &self.on_consent {
            hook();
        }

        let scopes: Vec<String> = SCOPES.iter().map(|s| s.to_string()).collect();
        client.user_consent_url(&scopes)
    }

    /// Run the interactive consent flow and store the resulting tokens.
    pub async fn authorize(&self) -> CalblockResult<()> {
        let mut client = self.client_with(None);
        let auth_url = self.consent_url(&mut client);

        eprintln!("\nAuthorize calblock to access {}:\n", self.account);
        eprintln!("{}\n", auth_url);

        if open::that(&auth_url).is_err() {
            eprintln!("(Could not open browser automatically, please copy the URL above)");
        }

        let (code, state) = wait_for_callback().await?;

        let expected_state = url::Url::parse(&auth_url)
            .ok()
            .and_then(|u| {
                u.query_pairs()
                    .find(|(k, _)| k == "state")
                    .map(|(_, v)| v.to_string())
            });
        if expected_state.is_some_and(|expected| expected != state) {
            return Err(CalblockError::AuthRequired(
                "OAuth state mismatch in callback".to_string(),
            ));
        }

        let access_token = client.get_access_token(&code, &state).await.map_err(|e| {
            CalblockError::AuthRequired(format!("failed to exchange authorization code: {}", e))
        })?;

        let tokens = GoogleTokens::from_access_token(&access_token, None);
        self.store.save(&self.account, &tokens).await?;
        *self.cached.lock().await = Some(tokens);

        tracing::info!(account = %self.account, "Stored Google credentials");
        Ok(())
    }
}

async fn wait_for_callback() -> CalblockResult<(String, String)> {
    let listener = TcpListener::bind(redirect_address()).await?;
    let (stream, _) = listener.accept().await?;

    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let params = parse_callback(&request_line);

    let response = "HTTP/1.1 200 OK\r\n\
        Content-Type: text/html\r\n\
        Connection: close\r\n\
        \r\n\
        <html><body>\
        <h1>calblock is authorized</h1>\
        <p>You can close this window and return to the terminal.</p>\
        </body></html>";

    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;

    params
}

/// Extract `code` and `state` from the callback's HTTP request line.
fn parse_callback(request_line: &str) -> CalblockResult<(String, String)> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| CalblockError::AuthRequired("invalid OAuth callback request".to_string()))?;

    let url = url::Url::parse(&format!("http://localhost{}", target))
        .map_err(|e| CalblockError::AuthRequired(format!("invalid OAuth callback: {}", e)))?;

    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.to_string())
    };

    if let Some(error) = param("error") {
        return Err(CalblockError::AuthRequired(format!(
            "consent was not granted: {}",
            error
        )));
    }

    let code = param("code")
        .ok_or_else(|| CalblockError::AuthRequired("no code in OAuth callback".to_string()))?;
    let state = param("state")
        .ok_or_else(|| CalblockError::AuthRequired("no state in OAuth callback".to_string()))?;

    Ok((code, state))
}
