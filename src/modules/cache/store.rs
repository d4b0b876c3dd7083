// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::Future;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::modules::{
    cache::{counters::CounterReconciler, event::MutationEvent, pending::PendingWrites},
    common::paginated::{paginate_vec, Paginated},
    error::MailSyncResult,
    mailbox::model::{
        derive_conversation_labels, Conversation, ConversationId, LabelCount, LabelId, Message,
        MessageId,
    },
};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeOrigin {
    /// Authoritative events delivered by the event loop.
    Server,
    /// Events built locally by a user action.
    Local,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CacheChange {
    Applied {
        origin: ChangeOrigin,
        messages: Vec<MessageId>,
        conversations: Vec<ConversationId>,
    },
    Counters,
    Reset,
}

#[derive(Debug, Default)]
struct CacheState {
    messages: IndexMap<MessageId, Message>,
    conversations: IndexMap<ConversationId, Conversation>,
    counters: CounterReconciler,
}

#[derive(Debug, Default)]
struct Touched {
    messages: IndexSet<MessageId>,
    conversations: IndexSet<ConversationId>,
}

/// In-memory store of messages, conversations and their label counters.
///
/// `apply` never awaits: whatever reads follow it observe the new state.
pub struct LocalCache {
    state: RwLock<CacheState>,
    pending: PendingWrites,
    changes: broadcast::Sender<CacheChange>,
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCache {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(CacheState::default()),
            pending: PendingWrites::new(),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheChange> {
        self.changes.subscribe()
    }

    pub fn apply(&self, events: Vec<MutationEvent>, is_threading_update: bool) {
        if events.is_empty() {
            return;
        }
        let origin = if is_threading_update {
            ChangeOrigin::Server
        } else {
            ChangeOrigin::Local
        };
        let count = events.len();
        let touched = {
            let mut state = self.state.write();
            let mut touched = Touched::default();
            for event in events {
                state.apply_one(event, &mut touched);
            }
            touched
        };
        debug!(
            "Applied {} {:?} events ({} messages, {} conversations changed)",
            count,
            origin,
            touched.messages.len(),
            touched.conversations.len()
        );
        if touched.messages.is_empty() && touched.conversations.is_empty() {
            return;
        }
        self.publish(CacheChange::Applied {
            origin,
            messages: touched.messages.into_iter().collect(),
            conversations: touched.conversations.into_iter().collect(),
        });
    }

    pub fn get_message(&self, id: &str) -> Option<Message> {
        self.state.read().messages.get(id).cloned()
    }

    pub fn get_conversation(&self, id: &str) -> Option<Conversation> {
        self.state.read().conversations.get(id).cloned()
    }

    /// Cached messages of a conversation, oldest first.
    pub fn query_messages_by_conversation(&self, conversation_id: &str) -> Vec<Message> {
        self.state
            .read()
            .messages_of(conversation_id)
            .cloned()
            .sorted_by_key(|m| m.time)
            .collect()
    }

    /// One page of the conversations carrying `label_id`, newest first.
    pub fn conversations_in_label(
        &self,
        label_id: &str,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> MailSyncResult<Paginated<Conversation>> {
        let items: Vec<Conversation> = self
            .state
            .read()
            .conversations
            .values()
            .filter(|c| c.has_label(label_id))
            .cloned()
            .sorted_by(|a, b| b.time.cmp(&a.time))
            .collect();
        paginate_vec(&items, page, page_size)
    }

    /// One page of the messages carrying `label_id`, newest first.
    pub fn messages_in_label(
        &self,
        label_id: &str,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> MailSyncResult<Paginated<Message>> {
        let items: Vec<Message> = self
            .state
            .read()
            .messages
            .values()
            .filter(|m| m.has_label(label_id))
            .cloned()
            .sorted_by(|a, b| b.time.cmp(&a.time))
            .collect();
        paginate_vec(&items, page, page_size)
    }

    pub fn message_count(&self, label_id: &str) -> LabelCount {
        self.state.read().counters.message_count(label_id)
    }

    pub fn conversation_count(&self, label_id: &str) -> LabelCount {
        self.state.read().counters.conversation_count(label_id)
    }

    /// Installs server-authoritative counts; labels in `known` missing from
    /// a provided list are zeroed.
    pub fn overwrite_counts(
        &self,
        known: &[LabelId],
        message_counts: Option<&[(LabelId, LabelCount)]>,
        conversation_counts: Option<&[(LabelId, LabelCount)]>,
    ) {
        if message_counts.is_none() && conversation_counts.is_none() {
            return;
        }
        {
            let mut state = self.state.write();
            if let Some(counts) = message_counts {
                state.counters.overwrite_messages(known, counts);
            }
            if let Some(counts) = conversation_counts {
                state.counters.overwrite_conversations(known, counts);
            }
        }
        self.publish(CacheChange::Counters);
    }

    /// Rebuilds every counter from the cached entities and returns the labels
    /// whose incremental counters had drifted.
    pub fn recount_counters(&self) -> Vec<LabelId> {
        let diverging = {
            let mut state = self.state.write();
            let recounted =
                CounterReconciler::recount(state.messages.values(), state.conversations.values());
            let diverging = state.counters.diverging_labels(&recounted);
            state.counters = recounted;
            diverging
        };
        if !diverging.is_empty() {
            warn!("Counters drifted for labels {:?}, recounted", diverging);
            self.publish(CacheChange::Counters);
        }
        diverging
    }

    /// Registers an in-flight remote write; a refresh waits for it to settle.
    pub fn add_pending_request<F>(&self, fut: F) -> impl Future<Output = F::Output> + Send + 'static
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.pending.track(fut)
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.count()
    }

    pub async fn pending_settled(&self) {
        self.pending.settled().await
    }

    pub fn reset(&self) {
        {
            let mut state = self.state.write();
            *state = CacheState::default();
        }
        info!("Local cache cleared");
        self.publish(CacheChange::Reset);
    }

    fn publish(&self, change: CacheChange) {
        // No subscriber is a normal state, e.g. in a headless run.
        let _ = self.changes.send(change);
    }
}

impl CacheState {
    fn messages_of<'a>(&'a self, conversation_id: &'a str) -> impl Iterator<Item = &'a Message> {
        self.messages
            .values()
            .filter(move |m| m.conversation_id == conversation_id)
    }

    fn apply_one(&mut self, event: MutationEvent, touched: &mut Touched) {
        match event {
            MutationEvent::CreateMessage(message) => {
                if self.messages.contains_key(&message.id) {
                    return;
                }
                self.counters.on_message_change(None, Some(&message));
                touched.messages.insert(message.id.clone());
                self.messages.insert(message.id.clone(), message);
            }
            MutationEvent::UpdateMessage(patch) => {
                let Some(message) = self.messages.get_mut(&patch.id) else {
                    debug!("Ignoring update of uncached message {}", patch.id);
                    return;
                };
                let before = message.clone();
                if patch.merge_into(message) {
                    let after = message.clone();
                    self.counters.on_message_change(Some(&before), Some(&after));
                    touched.messages.insert(patch.id);
                }
            }
            MutationEvent::DeleteMessage { id } => {
                let Some(removed) = self.messages.shift_remove(&id) else {
                    return;
                };
                self.counters.on_message_change(Some(&removed), None);
                touched.messages.insert(id);
                self.cascade_message_delete(&removed, touched);
            }
            MutationEvent::CreateConversation(conversation) => {
                if self.conversations.contains_key(&conversation.id) {
                    return;
                }
                self.counters
                    .on_conversation_change(None, Some(&conversation));
                touched.conversations.insert(conversation.id.clone());
                self.conversations
                    .insert(conversation.id.clone(), conversation);
            }
            MutationEvent::UpdateConversation(patch) => {
                let Some(conversation) = self.conversations.get_mut(&patch.id) else {
                    debug!("Ignoring update of uncached conversation {}", patch.id);
                    return;
                };
                let before = conversation.clone();
                if patch.merge_into(conversation) {
                    let after = conversation.clone();
                    self.counters
                        .on_conversation_change(Some(&before), Some(&after));
                    touched.conversations.insert(patch.id);
                }
            }
            MutationEvent::DeleteConversation { id } => {
                if let Some(removed) = self.conversations.shift_remove(&id) {
                    self.counters.on_conversation_change(Some(&removed), None);
                    touched.conversations.insert(id);
                }
            }
        }
    }

    /// The last message gone takes its conversation with it; otherwise the
    /// conversation shrinks. Labels are rederived only when every remaining
    /// message is cached, else the removed message's share is subtracted.
    fn cascade_message_delete(&mut self, removed: &Message, touched: &mut Touched) {
        let Some(before) = self.conversations.get(&removed.conversation_id).cloned() else {
            return;
        };
        let remaining: Vec<&Message> = self.messages_of(&removed.conversation_id).collect();
        let mut after = before.clone();
        after.num_messages = before.num_messages.saturating_sub(1);

        if after.num_messages == 0 {
            self.conversations.shift_remove(&before.id);
            self.counters.on_conversation_change(Some(&before), None);
            touched.conversations.insert(before.id);
            return;
        }

        if removed.unread {
            after.num_unread = after.num_unread.saturating_sub(1);
        }
        after.labels = if remaining.len() as u32 == after.num_messages {
            derive_conversation_labels(remaining)
        } else {
            before.labels_without(removed)
        };
        after.size = after.size.saturating_sub(removed.size);
        self.counters
            .on_conversation_change(Some(&before), Some(&after));
        touched.conversations.insert(before.id.clone());
        self.conversations.insert(before.id, after);
    }
}
