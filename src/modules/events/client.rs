// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use futures::{future::BoxFuture, FutureExt};

use crate::modules::{
    common::http::ApiClient,
    error::MailSyncResult,
    events::payload::{
        count_pairs, CountList, EventPayload, LabelList, LatestEvent,
    },
    mailbox::model::{Label, LabelCount, LabelId},
};

/// Read side of the server event log.
pub trait EventLogClient: Send + Sync {
    /// Cursor of the most recent event, used to bootstrap a session.
    fn latest_event_id(&self) -> BoxFuture<'static, MailSyncResult<String>>;

    /// Everything that happened after `event_id`.
    fn fetch_events(&self, event_id: &str) -> BoxFuture<'static, MailSyncResult<EventPayload>>;
}

/// Authoritative mailbox state fetched during a full refresh.
pub trait MailboxSource: Send + Sync {
    fn message_counts(&self) -> BoxFuture<'static, MailSyncResult<Vec<(LabelId, LabelCount)>>>;

    fn conversation_counts(
        &self,
    ) -> BoxFuture<'static, MailSyncResult<Vec<(LabelId, LabelCount)>>>;

    fn labels(&self) -> BoxFuture<'static, MailSyncResult<Vec<Label>>>;
}

/// Event log and mailbox reads over the mail API.
#[derive(Clone, Debug)]
pub struct HttpEventLog {
    api: ApiClient,
}

impl HttpEventLog {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl EventLogClient for HttpEventLog {
    fn latest_event_id(&self) -> BoxFuture<'static, MailSyncResult<String>> {
        let api = self.api.clone();
        async move {
            let latest: LatestEvent = api.get("events/latest").await?;
            Ok(latest.event_id)
        }
        .boxed()
    }

    fn fetch_events(&self, event_id: &str) -> BoxFuture<'static, MailSyncResult<EventPayload>> {
        let api = self.api.clone();
        let path = format!("events/{}", event_id);
        async move { api.get(&path).await }.boxed()
    }
}

impl MailboxSource for HttpEventLog {
    fn message_counts(&self) -> BoxFuture<'static, MailSyncResult<Vec<(LabelId, LabelCount)>>> {
        let api = self.api.clone();
        async move {
            let list: CountList = api.get("messages/count").await?;
            Ok(count_pairs(&list.counts))
        }
        .boxed()
    }

    fn conversation_counts(
        &self,
    ) -> BoxFuture<'static, MailSyncResult<Vec<(LabelId, LabelCount)>>> {
        let api = self.api.clone();
        async move {
            let list: CountList = api.get("conversations/count").await?;
            Ok(count_pairs(&list.counts))
        }
        .boxed()
    }

    fn labels(&self) -> BoxFuture<'static, MailSyncResult<Vec<Label>>> {
        let api = self.api.clone();
        async move {
            let list: LabelList = api.get("labels").await?;
            Ok(list.labels.into_iter().map(Label::from).collect())
        }
        .boxed()
    }
}
