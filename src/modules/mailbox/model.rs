// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::ValueEnum;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

pub type LabelId = String;
pub type MessageId = String;
pub type ConversationId = String;

pub const INBOX: &str = "0";
pub const ALL_DRAFTS: &str = "1";
pub const ALL_SENT: &str = "2";
pub const TRASH: &str = "3";
pub const SPAM: &str = "4";
pub const ALL_MAIL: &str = "5";
pub const ARCHIVE: &str = "6";
pub const SENT: &str = "7";
pub const DRAFTS: &str = "8";
pub const STARRED: &str = "10";

/// System locations a move always takes a message out of.
pub const BASIC_FOLDERS: [&str; 6] = [INBOX, TRASH, SPAM, ARCHIVE, SENT, DRAFTS];

/// Every system location that carries counters.
pub const SYSTEM_LABELS: [&str; 10] = [
    INBOX, ALL_DRAFTS, DRAFTS, ALL_SENT, SENT, TRASH, SPAM, ALL_MAIL, ARCHIVE, STARRED,
];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
pub enum ViewMode {
    #[default]
    Conversation,
    Message,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub unread: bool,
    pub label_ids: IndexSet<LabelId>,
    pub size: u64,
    pub time: i64,
    pub sender: Address,
    pub subject: String,
}

impl Message {
    pub fn has_label(&self, label_id: &str) -> bool {
        self.label_ids.contains(label_id)
    }
}

/// A conversation's reference to one label, with what that label sees of it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConversationLabel {
    #[serde(rename = "ID")]
    pub id: LabelId,
    #[serde(default)]
    pub context_num_unread: u32,
    #[serde(default)]
    pub context_num_messages: u32,
}

impl ConversationLabel {
    pub fn new(id: impl Into<LabelId>, context_num_unread: u32, context_num_messages: u32) -> Self {
        Self {
            id: id.into(),
            context_num_unread,
            context_num_messages,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub labels: Vec<ConversationLabel>,
    pub num_messages: u32,
    pub num_unread: u32,
    pub size: u64,
    pub time: i64,
    pub senders: Vec<Address>,
    pub subject: String,
}

impl Conversation {
    pub fn label(&self, label_id: &str) -> Option<&ConversationLabel> {
        self.labels.iter().find(|l| l.id == label_id)
    }

    pub fn has_label(&self, label_id: &str) -> bool {
        self.label(label_id).is_some()
    }

    /// Unread messages of this conversation that carry `label_id`.
    pub fn context_num_unread(&self, label_id: &str) -> u32 {
        self.label(label_id)
            .map(|l| l.context_num_unread)
            .unwrap_or_default()
    }

    /// Label references once `message` has left the conversation. Labels
    /// it was the last message of are dropped.
    pub fn labels_without(&self, message: &Message) -> Vec<ConversationLabel> {
        self.labels
            .iter()
            .filter_map(|label| {
                if !message.has_label(&label.id) {
                    return Some(label.clone());
                }
                let mut label = label.clone();
                label.context_num_messages = label.context_num_messages.saturating_sub(1);
                if message.unread {
                    label.context_num_unread = label.context_num_unread.saturating_sub(1);
                }
                (label.context_num_messages > 0).then_some(label)
            })
            .collect()
    }

    pub fn label_ids(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.id.as_str())
    }

    /// Rewrites the label references without looking at the messages.
    /// Added labels inherit the conversation's unread and message counts.
    /// Removals are resolved before additions.
    pub fn labels_with(&self, add: &[LabelId], remove: &[LabelId]) -> Vec<ConversationLabel> {
        let mut labels: Vec<ConversationLabel> = self
            .labels
            .iter()
            .filter(|l| !remove.contains(&l.id))
            .cloned()
            .collect();
        for id in add {
            if labels.iter().any(|l| &l.id == id) {
                continue;
            }
            labels.push(ConversationLabel::new(
                id.clone(),
                self.num_unread,
                self.num_messages,
            ));
        }
        labels
    }
}

/// Label references of a conversation as implied by its messages: the union
/// of every message's labels, each with its unread and message count.
pub fn derive_conversation_labels<'a, I>(messages: I) -> Vec<ConversationLabel>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut derived: IndexMap<&str, ConversationLabel> = IndexMap::new();
    for message in messages {
        for label_id in &message.label_ids {
            let entry = derived
                .entry(label_id.as_str())
                .or_insert_with(|| ConversationLabel::new(label_id.clone(), 0, 0));
            entry.context_num_messages += 1;
            if message.unread {
                entry.context_num_unread += 1;
            }
        }
    }
    derived.into_values().collect()
}

/// Where a message really lands when moved to `destination`: sent mail and
/// drafts "moved to inbox" go back to their own folders.
pub fn labels_moved(message: &Message, destination: &str) -> Vec<LabelId> {
    if destination == INBOX {
        if message.has_label(ALL_SENT) {
            return vec![SENT.to_string()];
        }
        if message.has_label(ALL_DRAFTS) {
            return vec![DRAFTS.to_string()];
        }
    }
    vec![destination.to_string()]
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum LabelKind {
    Folder,
    #[default]
    Label,
    ContactGroup,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    pub kind: LabelKind,
    pub color: Option<String>,
    /// New mail in this label raises a desktop notification.
    pub notify: bool,
    pub order: i64,
}

/// Per-label counter pair kept for both messages and conversations.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    pub total: u64,
    pub unread: u64,
}
