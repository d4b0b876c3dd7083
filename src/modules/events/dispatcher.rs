// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use futures::{future::BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::modules::{
    cache::store::LocalCache,
    error::MailSyncResult,
    events::{
        client::MailboxSource,
        payload::{count_pairs, EventPayload, ServerAction},
        scheduler::PayloadHandler,
    },
    mailbox::{
        labels::LabelsModel,
        model::{LabelId, LabelKind, SYSTEM_LABELS},
    },
    notify::Notifier,
};

/// Consumer of the payload blocks the mailbox core does not own: settings,
/// addresses, contacts, filters and the like.
pub trait AncillarySink: Send + Sync {
    fn forward(&self, blocks: &Map<String, Value>);

    /// The server asked for every contact to be reloaded.
    fn reset_contacts(&self);
}

/// Logs the block names it receives and otherwise drops them.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl AncillarySink for TracingSink {
    fn forward(&self, blocks: &Map<String, Value>) {
        if !blocks.is_empty() {
            debug!(
                "Forwarding ancillary event blocks: {:?}",
                blocks.keys().collect::<Vec<_>>()
            );
        }
    }

    fn reset_contacts(&self) {
        info!("Contacts refresh requested by server");
    }
}

/// Applies each fetched payload to the cache, the label registry and the
/// collaborators behind [`AncillarySink`]. Payloads are applied one at a
/// time in the order they were fetched.
#[derive(Clone)]
pub struct EventDispatcher {
    apply_lock: Arc<Mutex<()>>,
    cache: Arc<LocalCache>,
    labels: Arc<LabelsModel>,
    source: Arc<dyn MailboxSource>,
    notifier: Arc<dyn Notifier>,
    sink: Arc<dyn AncillarySink>,
}

impl EventDispatcher {
    pub fn new(
        cache: Arc<LocalCache>,
        labels: Arc<LabelsModel>,
        source: Arc<dyn MailboxSource>,
        notifier: Arc<dyn Notifier>,
        sink: Arc<dyn AncillarySink>,
    ) -> Self {
        Self {
            apply_lock: Arc::new(Mutex::new(())),
            cache,
            labels,
            source,
            notifier,
            sink,
        }
    }

    pub async fn dispatch(&self, payload: EventPayload) -> MailSyncResult<()> {
        let _guard = self.apply_lock.lock().await;
        if payload.refresh != 0 {
            if payload.refresh_mail() {
                self.reload().await?;
            }
            if payload.refresh_contacts() {
                self.sink.reset_contacts();
            }
            return Ok(());
        }

        let changes: Vec<_> = payload.labels.iter().filter_map(|e| e.to_change()).collect();
        if !changes.is_empty() {
            self.labels.sync(changes);
        }

        self.cache.apply(payload.mutation_events(), true);
        self.notify_new_mail(&payload);

        let known = self.known_labels();
        let message_counts = payload.message_counts.as_deref().map(count_pairs);
        let conversation_counts = payload.conversation_counts.as_deref().map(count_pairs);
        self.cache.overwrite_counts(
            &known,
            message_counts.as_deref(),
            conversation_counts.as_deref(),
        );

        self.sink.forward(&payload.ancillary);
        Ok(())
    }

    /// Waits for outstanding writes, then swaps the whole local state for the
    /// server's counts and labels.
    pub async fn refresh_mail(&self) -> MailSyncResult<()> {
        let _guard = self.apply_lock.lock().await;
        self.reload().await
    }

    async fn reload(&self) -> MailSyncResult<()> {
        let pending = self.cache.pending_requests();
        if pending > 0 {
            info!("Full refresh waiting for {} pending writes", pending);
        }
        self.cache.pending_settled().await;

        let (message_counts, conversation_counts, labels) = futures::try_join!(
            self.source.message_counts(),
            self.source.conversation_counts(),
            self.source.labels()
        )?;

        self.cache.reset();
        self.labels.refresh(labels);
        let known = self.known_labels();
        self.cache.overwrite_counts(
            &known,
            Some(message_counts.as_slice()),
            Some(conversation_counts.as_slice()),
        );
        info!("Mailbox fully refreshed from server");
        Ok(())
    }

    fn known_labels(&self) -> Vec<LabelId> {
        SYSTEM_LABELS
            .iter()
            .map(|id| id.to_string())
            .chain(self.labels.ids(LabelKind::Folder))
            .chain(self.labels.ids(LabelKind::Label))
            .collect()
    }

    fn notify_new_mail(&self, payload: &EventPayload) {
        if payload.messages.is_empty() {
            return;
        }
        let notify = self.labels.notify_ids();
        for event in &payload.messages {
            if ServerAction::from_code(event.action) != Some(ServerAction::Create) {
                continue;
            }
            let Some(message) = &event.message else {
                continue;
            };
            if message.unread != Some(true) {
                continue;
            }
            let notifying = message
                .label_ids
                .iter()
                .flatten()
                .any(|id| notify.contains(id));
            if !notifying {
                continue;
            }
            let sender = message
                .sender
                .as_ref()
                .map(|s| {
                    if s.name.is_empty() {
                        s.address.clone()
                    } else {
                        s.name.clone()
                    }
                })
                .unwrap_or_default();
            let title = format!("New mail from {}", sender);
            self.notifier
                .new_mail(&title, message.subject.as_deref().unwrap_or_default());
        }
    }
}

impl PayloadHandler for EventDispatcher {
    fn handle(&self, payload: EventPayload) -> BoxFuture<'static, MailSyncResult<()>> {
        let this = self.clone();
        async move { this.dispatch(payload).await }.boxed()
    }

    fn reset(&self) {
        self.cache.reset();
        self.labels.refresh(Vec::new());
    }
}
