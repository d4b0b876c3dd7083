// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use indexmap::IndexSet;

use crate::modules::mailbox::model::{
    Address, Conversation, ConversationId, ConversationLabel, LabelId, Message, MessageId,
};

/// The atomic unit of change applied to the local cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationEvent {
    CreateMessage(Message),
    UpdateMessage(MessagePatch),
    DeleteMessage { id: MessageId },
    CreateConversation(Conversation),
    UpdateConversation(ConversationPatch),
    DeleteConversation { id: ConversationId },
}

impl MutationEvent {
    pub fn delete_message(id: impl Into<MessageId>) -> Self {
        MutationEvent::DeleteMessage { id: id.into() }
    }

    pub fn delete_conversation(id: impl Into<ConversationId>) -> Self {
        MutationEvent::DeleteConversation { id: id.into() }
    }
}

/// Field-wise update of a cached message. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessagePatch {
    pub id: MessageId,
    pub conversation_id: Option<ConversationId>,
    pub unread: Option<bool>,
    /// Full replacement of the label set.
    pub label_ids: Option<Vec<LabelId>>,
    pub label_ids_added: Vec<LabelId>,
    pub label_ids_removed: Vec<LabelId>,
    pub size: Option<u64>,
    pub time: Option<i64>,
    pub sender: Option<Address>,
    pub subject: Option<String>,
}

impl MessagePatch {
    pub fn new(id: impl Into<MessageId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn unread(mut self, unread: bool) -> Self {
        self.unread = Some(unread);
        self
    }

    pub fn label_ids(mut self, label_ids: Vec<LabelId>) -> Self {
        self.label_ids = Some(label_ids);
        self
    }

    pub fn add_labels(mut self, added: Vec<LabelId>) -> Self {
        self.label_ids_added = added;
        self
    }

    pub fn remove_labels(mut self, removed: Vec<LabelId>) -> Self {
        self.label_ids_removed = removed;
        self
    }

    /// Merges into `message`. Returns whether any visible field changed.
    pub fn merge_into(&self, message: &mut Message) -> bool {
        let before = message.clone();
        if let Some(conversation_id) = &self.conversation_id {
            message.conversation_id = conversation_id.clone();
        }
        if let Some(unread) = self.unread {
            message.unread = unread;
        }
        if let Some(label_ids) = &self.label_ids {
            message.label_ids = label_ids.iter().cloned().collect();
        }
        resolve_label_set(
            &mut message.label_ids,
            &self.label_ids_added,
            &self.label_ids_removed,
        );
        if let Some(size) = self.size {
            message.size = size;
        }
        if let Some(time) = self.time {
            message.time = time;
        }
        if let Some(sender) = &self.sender {
            message.sender = sender.clone();
        }
        if let Some(subject) = &self.subject {
            message.subject = subject.clone();
        }
        *message != before
    }
}

/// Field-wise update of a cached conversation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationPatch {
    pub id: ConversationId,
    /// Full replacement of the label references.
    pub labels: Option<Vec<ConversationLabel>>,
    pub labels_added: Vec<LabelId>,
    pub labels_removed: Vec<LabelId>,
    pub num_messages: Option<u32>,
    pub num_unread: Option<u32>,
    pub size: Option<u64>,
    pub time: Option<i64>,
    pub senders: Option<Vec<Address>>,
    pub subject: Option<String>,
}

impl ConversationPatch {
    pub fn new(id: impl Into<ConversationId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn labels(mut self, labels: Vec<ConversationLabel>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn num_unread(mut self, num_unread: u32) -> Self {
        self.num_unread = Some(num_unread);
        self
    }

    pub fn num_messages(mut self, num_messages: u32) -> Self {
        self.num_messages = Some(num_messages);
        self
    }

    pub fn merge_into(&self, conversation: &mut Conversation) -> bool {
        let before = conversation.clone();
        if let Some(labels) = &self.labels {
            conversation.labels = labels.clone();
        }
        if !self.labels_added.is_empty() || !self.labels_removed.is_empty() {
            conversation.labels = conversation.labels_with(&self.labels_added, &self.labels_removed);
        }
        if let Some(num_messages) = self.num_messages {
            conversation.num_messages = num_messages;
        }
        if let Some(num_unread) = self.num_unread {
            conversation.num_unread = num_unread;
        }
        if let Some(size) = self.size {
            conversation.size = size;
        }
        if let Some(time) = self.time {
            conversation.time = time;
        }
        if let Some(senders) = &self.senders {
            conversation.senders = senders.clone();
        }
        if let Some(subject) = &self.subject {
            conversation.subject = subject.clone();
        }
        *conversation != before
    }
}

/// Removals are resolved before additions, so a label present in both lists
/// stays on the message.
fn resolve_label_set(labels: &mut IndexSet<LabelId>, added: &[LabelId], removed: &[LabelId]) {
    for id in removed {
        labels.shift_remove(id);
    }
    for id in added {
        labels.insert(id.clone());
    }
}
