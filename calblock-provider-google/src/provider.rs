use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use google_calendar::Client;
use google_calendar::types::{OrderBy, SendUpdates};

use calblock_core::{CalblockError, CalblockResult, CalendarProvider, Event};

use crate::auth::GoogleAuth;
use crate::convert::{Access, classify_error, from_google, to_google};

/// Calendars of one Google account.
///
/// Authentication is lazy: the first call loads or refreshes the stored
/// tokens, and a call rejected for credentials runs the consent flow and is
/// retried once.
pub struct GoogleProvider {
    auth: GoogleAuth,
}

impl GoogleProvider {
    pub fn new(auth: GoogleAuth) -> Self {
        GoogleProvider { auth }
    }

    pub fn account(&self) -> &str {
        self.auth.account()
    }

    async fn with_client<T, F, Fut>(&self, op: F) -> CalblockResult<T>
    where
        F: Fn(Client) -> Fut + Send + Sync,
        Fut: Future<Output = CalblockResult<T>> + Send,
        T: Send,
    {
        let op = &op;
        retry_after_reauth(
            self.account(),
            move || async move { op(self.auth.client().await?).await },
            move || self.auth.authorize(),
        )
        .await
    }

    async fn insert(&self, calendar_id: &str, event: &Event) -> CalblockResult<String> {
        self.with_client(|client| async move {
            let mut body = to_google(event);
            body.id = String::new();

            let response = client
                .events()
                .insert(calendar_id, 0, 0, false, SendUpdates::None, false, &body)
                .await
                .map_err(|e| classify_error(e, Access::Write, "failed to create event"))?;

            Ok(response.body.id)
        })
        .await
    }
}

/// Run `op`, and when credentials are rejected run `reauthorize` and try
/// `op` exactly once more. Any other failure is returned as is.
async fn retry_after_reauth<T, Op, OpFut, Auth, AuthFut>(
    account: &str,
    op: Op,
    reauthorize: Auth,
) -> CalblockResult<T>
where
    Op: Fn() -> OpFut,
    OpFut: Future<Output = CalblockResult<T>>,
    Auth: FnOnce() -> AuthFut,
    AuthFut: Future<Output = CalblockResult<()>>,
{
    match op().await {
        Err(e) if e.is_auth() => {
            tracing::warn!(account = %account, "Google credentials rejected: {}", e);
            reauthorize().await?;
            op().await
        }
        other => other,
    }
}

#[async_trait]
impl CalendarProvider for GoogleProvider {
    async fn get_calendar(&self, calendar_id: &str) -> CalblockResult<()> {
        self.with_client(|client| async move {
            client
                .calendar_list()
                .list_get(calendar_id)
                .await
                .map_err(|e| classify_error(e, Access::Read, calendar_id))?;
            Ok(())
        })
        .await
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> CalblockResult<Vec<Event>> {
        let time_min = time_min.to_rfc3339();
        let time_max = time_max.to_rfc3339();
        let (time_min, time_max) = (time_min.as_str(), time_max.as_str());

        let events = self
            .with_client(|client| async move {
                let response = client
                    .events()
                    .list_all(
                        calendar_id,
                        "",                 // i_cal_uid
                        0,                  // max_attendees
                        OrderBy::default(), // order_by
                        &[],                // private_extended_property
                        "",                 // q
                        &[],                // shared_extended_property
                        false,              // show_deleted
                        false,              // show_hidden_invitations
                        true,               // single_events
                        time_max,
                        time_min,
                        "", // time_zone
                        "", // updated_min
                    )
                    .await
                    .map_err(|e| classify_error(e, Access::Read, "failed to list events"))?;

                Ok(response
                    .body
                    .into_iter()
                    .filter_map(from_google)
                    .collect::<Vec<_>>())
            })
            .await?;

        tracing::debug!(calendar = calendar_id, count = events.len(), "Listed events");
        Ok(events)
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> CalblockResult<Event> {
        self.with_client(|client| async move {
            let response = client
                .events()
                .get(calendar_id, event_id, 0, "")
                .await
                .map_err(|e| classify_error(e, Access::Read, event_id))?;

            from_google(response.body)
                .ok_or_else(|| CalblockError::NotFound(format!("{} has no start time", event_id)))
        })
        .await
    }

    async fn add_event(&self, calendar_id: &str, event: &Event) -> CalblockResult<String> {
        self.insert(calendar_id, event).await
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> CalblockResult<String> {
        let updated = self
            .with_client(|client| async move {
                let mut body = to_google(event);
                body.id = event_id.to_string();

                let response = client
                    .events()
                    .update(
                        calendar_id,
                        event_id,
                        0,
                        0,
                        false,
                        SendUpdates::None,
                        false,
                        &body,
                    )
                    .await
                    .map_err(|e| classify_error(e, Access::Write, "failed to update event"))?;

                Ok(response.body.id)
            })
            .await;

        match updated {
            Err(e) if e.is_not_found() => {
                tracing::debug!(calendar = calendar_id, event_id, "Blocker vanished, recreating");
                self.insert(calendar_id, event).await
            }
            other => other,
        }
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> CalblockResult<()> {
        self.with_client(|client| async move {
            client
                .events()
                .delete(calendar_id, event_id, false, SendUpdates::None)
                .await
                .map_err(|e| classify_error(e, Access::Write, "failed to delete event"))?;
            Ok(())
        })
        .await
    }
}
