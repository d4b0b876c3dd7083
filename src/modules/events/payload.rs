// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::modules::{
    cache::event::{ConversationPatch, MessagePatch, MutationEvent},
    mailbox::{
        labels::LabelChange,
        model::{Address, Conversation, ConversationLabel, Label, LabelCount, LabelId, LabelKind, Message},
    },
};

/// `Refresh` bit asking for a full mailbox resync.
pub const REFRESH_MAIL: u32 = 1;
/// `Refresh` bit asking for a full contacts resync.
pub const REFRESH_CONTACTS: u32 = 2;

const LABEL_TYPE_MESSAGE: u8 = 1;
const LABEL_TYPE_CONTACT_GROUP: u8 = 2;

/// Action codes used by the event log.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServerAction {
    Delete,
    Create,
    Update,
    UpdateFlags,
}

impl ServerAction {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ServerAction::Delete),
            1 => Some(ServerAction::Create),
            2 => Some(ServerAction::Update),
            3 => Some(ServerAction::UpdateFlags),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LatestEvent {
    #[serde(rename = "EventID")]
    pub event_id: String,
}

/// One delta of the server event log.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventPayload {
    #[serde(rename = "EventID")]
    pub event_id: String,
    #[serde(default)]
    pub refresh: u32,
    #[serde(default)]
    pub more: u8,
    #[serde(default)]
    pub messages: Vec<MessageEvent>,
    #[serde(default)]
    pub conversations: Vec<ConversationEvent>,
    #[serde(default)]
    pub message_counts: Option<Vec<CountEntry>>,
    #[serde(default)]
    pub conversation_counts: Option<Vec<CountEntry>>,
    #[serde(default)]
    pub labels: Vec<LabelEvent>,
    /// Settings, addresses, contacts and the other blocks other collaborators own.
    #[serde(flatten)]
    pub ancillary: Map<String, Value>,
}

impl EventPayload {
    pub fn refresh_mail(&self) -> bool {
        self.refresh & REFRESH_MAIL != 0
    }

    pub fn refresh_contacts(&self) -> bool {
        self.refresh & REFRESH_CONTACTS != 0
    }

    pub fn has_more(&self) -> bool {
        self.more == 1
    }

    /// Messages first, then conversations, as the server ordered them.
    pub fn mutation_events(&self) -> Vec<MutationEvent> {
        self.messages
            .iter()
            .filter_map(MessageEvent::to_mutation)
            .chain(self.conversations.iter().filter_map(ConversationEvent::to_mutation))
            .collect()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CountEntry {
    #[serde(rename = "LabelID")]
    pub label_id: LabelId,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub unread: u64,
}

pub fn count_pairs(entries: &[CountEntry]) -> Vec<(LabelId, LabelCount)> {
    entries
        .iter()
        .map(|e| {
            (
                e.label_id.clone(),
                LabelCount {
                    total: e.total,
                    unread: e.unread,
                },
            )
        })
        .collect()
}

fn bool_from_int<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<u8> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| v != 0))
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageData {
    #[serde(rename = "ConversationID", default)]
    pub conversation_id: Option<String>,
    #[serde(default, deserialize_with = "bool_from_int")]
    pub unread: Option<bool>,
    #[serde(rename = "LabelIDs", default)]
    pub label_ids: Option<Vec<LabelId>>,
    #[serde(rename = "LabelIDsAdded", default)]
    pub label_ids_added: Vec<LabelId>,
    #[serde(rename = "LabelIDsRemoved", default)]
    pub label_ids_removed: Vec<LabelId>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub sender: Option<Address>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageEvent {
    #[serde(rename = "ID")]
    pub id: String,
    pub action: u8,
    #[serde(default)]
    pub message: Option<MessageData>,
}

impl MessageEvent {
    pub fn to_mutation(&self) -> Option<MutationEvent> {
        let Some(action) = ServerAction::from_code(self.action) else {
            warn!("Unknown action {} for message {}", self.action, self.id);
            return None;
        };
        if action == ServerAction::Delete {
            return Some(MutationEvent::delete_message(self.id.clone()));
        }
        let data = self.message.clone().unwrap_or_default();
        match action {
            ServerAction::Create => Some(MutationEvent::CreateMessage(Message {
                id: self.id.clone(),
                conversation_id: data.conversation_id.unwrap_or_default(),
                unread: data.unread.unwrap_or_default(),
                label_ids: data
                    .label_ids
                    .unwrap_or_default()
                    .into_iter()
                    .chain(data.label_ids_added)
                    .collect(),
                size: data.size.unwrap_or_default(),
                time: data.time.unwrap_or_default(),
                sender: data.sender.unwrap_or_default(),
                subject: data.subject.unwrap_or_default(),
            })),
            _ => Some(MutationEvent::UpdateMessage(MessagePatch {
                id: self.id.clone(),
                conversation_id: data.conversation_id,
                unread: data.unread,
                label_ids: data.label_ids,
                label_ids_added: data.label_ids_added,
                label_ids_removed: data.label_ids_removed,
                size: data.size,
                time: data.time,
                sender: data.sender,
                subject: data.subject,
            })),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConversationData {
    #[serde(default)]
    pub labels: Option<Vec<ConversationLabel>>,
    #[serde(rename = "LabelIDsAdded", default)]
    pub label_ids_added: Vec<LabelId>,
    #[serde(rename = "LabelIDsRemoved", default)]
    pub label_ids_removed: Vec<LabelId>,
    #[serde(default)]
    pub num_messages: Option<u32>,
    #[serde(default)]
    pub num_unread: Option<u32>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub senders: Option<Vec<Address>>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConversationEvent {
    #[serde(rename = "ID")]
    pub id: String,
    pub action: u8,
    #[serde(default)]
    pub conversation: Option<ConversationData>,
}

impl ConversationEvent {
    pub fn to_mutation(&self) -> Option<MutationEvent> {
        let Some(action) = ServerAction::from_code(self.action) else {
            warn!("Unknown action {} for conversation {}", self.action, self.id);
            return None;
        };
        if action == ServerAction::Delete {
            return Some(MutationEvent::delete_conversation(self.id.clone()));
        }
        let data = self.conversation.clone().unwrap_or_default();
        match action {
            ServerAction::Create => {
                let mut conversation = Conversation {
                    id: self.id.clone(),
                    labels: data.labels.unwrap_or_default(),
                    num_messages: data.num_messages.unwrap_or_default(),
                    num_unread: data.num_unread.unwrap_or_default(),
                    size: data.size.unwrap_or_default(),
                    time: data.time.unwrap_or_default(),
                    senders: data.senders.unwrap_or_default(),
                    subject: data.subject.unwrap_or_default(),
                };
                conversation.labels =
                    conversation.labels_with(&data.label_ids_added, &data.label_ids_removed);
                Some(MutationEvent::CreateConversation(conversation))
            }
            _ => Some(MutationEvent::UpdateConversation(ConversationPatch {
                id: self.id.clone(),
                labels: data.labels,
                labels_added: data.label_ids_added,
                labels_removed: data.label_ids_removed,
                num_messages: data.num_messages,
                num_unread: data.num_unread,
                size: data.size,
                time: data.time,
                senders: data.senders,
                subject: data.subject,
            })),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelData {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type", default)]
    pub label_type: u8,
    #[serde(default)]
    pub exclusive: u8,
    #[serde(default)]
    pub notify: u8,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub order: i64,
}

impl From<LabelData> for Label {
    fn from(value: LabelData) -> Self {
        let kind = match (value.label_type, value.exclusive) {
            (LABEL_TYPE_CONTACT_GROUP, _) => LabelKind::ContactGroup,
            (_, 1) => LabelKind::Folder,
            _ => LabelKind::Label,
        };
        Label {
            id: value.id,
            name: value.name,
            kind,
            color: value.color,
            notify: value.notify == 1,
            order: value.order,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelEvent {
    #[serde(rename = "ID")]
    pub id: String,
    pub action: u8,
    #[serde(default)]
    pub label: Option<LabelData>,
}

impl LabelEvent {
    pub fn to_change(&self) -> Option<LabelChange> {
        match ServerAction::from_code(self.action)? {
            ServerAction::Delete => Some(LabelChange::Delete(self.id.clone())),
            _ => {
                let data = self.label.clone()?;
                if data.label_type != LABEL_TYPE_MESSAGE && data.label_type != LABEL_TYPE_CONTACT_GROUP {
                    warn!("Label {} has unknown type {}", data.id, data.label_type);
                }
                Some(LabelChange::Upsert(data.into()))
            }
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CountList {
    #[serde(default)]
    pub counts: Vec<CountEntry>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelList {
    #[serde(default)]
    pub labels: Vec<LabelData>,
}
