// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;

use crate::modules::{
    actions::{api::MutationRequest, Undo},
    cache::{
        event::{ConversationPatch, MessagePatch, MutationEvent},
        store::LocalCache,
    },
    mailbox::{
        labels::LabelsModel,
        model::{
            derive_conversation_labels, Conversation, ConversationId, ConversationLabel, LabelId,
            LabelKind, Message, MessageId, ViewMode, ARCHIVE, BASIC_FOLDERS, SPAM, TRASH,
        },
    },
};

/// Everything one user action amounts to: the local events describing the
/// expected end state and the remote calls that make it true.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionPlan {
    /// Short verb used in failure notices, e.g. "move".
    pub action: &'static str,
    pub events: Vec<MutationEvent>,
    pub requests: Vec<MutationRequest>,
    pub success: Option<String>,
    pub undo: Option<Undo>,
    /// Sender addresses handed to the spam reporter.
    pub spam: Vec<String>,
    /// Poll the event log once the requests succeed.
    pub resync: bool,
}

impl ActionPlan {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    /// Nothing to apply and nothing to send.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.requests.iter().all(|r| r.ids.is_empty())
    }
}

/// A label ticked (`selected`) or unticked in the label picker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelSelection {
    pub id: LabelId,
    pub selected: bool,
}

impl LabelSelection {
    pub fn add(id: impl Into<LabelId>) -> Self {
        Self {
            id: id.into(),
            selected: true,
        }
    }

    pub fn remove(id: impl Into<LabelId>) -> Self {
        Self {
            id: id.into(),
            selected: false,
        }
    }
}

/// Read-only view of the state an action is planned against.
pub struct Planner<'a> {
    pub cache: &'a LocalCache,
    pub labels: &'a LabelsModel,
    pub location: LabelId,
    pub can_undo: bool,
}

impl Planner<'_> {
    /// Labels a move to `destination` takes an item out of. Trash and spam
    /// also strip user labels.
    pub fn folders_left_by(&self, destination: &str) -> Vec<LabelId> {
        let mut ids: Vec<LabelId> = BASIC_FOLDERS.iter().map(|id| id.to_string()).collect();
        ids.extend(self.labels.ids(LabelKind::Folder));
        if destination == TRASH || destination == SPAM {
            ids.extend(self.labels.ids(LabelKind::Label));
        }
        ids
    }

    /// `(added, removed)` label ids for one item under the picker state.
    /// Presence checks only apply when `present` is known.
    pub fn label_rules(
        &self,
        present: Option<&[LabelId]>,
        selections: &[LabelSelection],
        also_archive: bool,
    ) -> (Vec<LabelId>, Vec<LabelId>) {
        let has = |id: &LabelId| present.map_or(true, |p| p.contains(id));
        let lacks = |id: &LabelId| present.map_or(true, |p| !p.contains(id));
        let mut added: Vec<LabelId> = selections
            .iter()
            .filter(|s| s.selected && lacks(&s.id))
            .map(|s| s.id.clone())
            .collect();
        let mut removed: Vec<LabelId> = selections
            .iter()
            .filter(|s| !s.selected && has(&s.id))
            .map(|s| s.id.clone())
            .collect();
        if also_archive {
            added.push(ARCHIVE.to_string());
            if self.labels.is_removable_location(&self.location) {
                removed.push(self.location.clone());
            }
        }
        (added, removed)
    }

    /// Move back to where the items are displayed now, if undo is allowed.
    pub fn undo_move(&self, undo: bool, mode: ViewMode, ids: &[String]) -> Option<Undo> {
        (undo && self.can_undo).then(|| Undo::Move {
            mode,
            ids: ids.to_vec(),
            to: self.location.clone(),
        })
    }
}

/// User labels are the ones whose identifier is not a number.
pub fn user_label_ids(message: &Message) -> Vec<LabelId> {
    message
        .label_ids
        .iter()
        .filter(|id| id.parse::<u64>().is_err())
        .cloned()
        .collect()
}

/// Applies `patch` to a copy of `message`.
pub fn patched(message: &Message, patch: &MessagePatch) -> Message {
    let mut after = message.clone();
    patch.merge_into(&mut after);
    after
}

/// Conversation update implied by rewriting some of its messages, derived
/// from the messages when every one of them is cached.
pub fn derived_patch(
    cache: &LocalCache,
    conversation: &Conversation,
    rewritten: &AHashMap<MessageId, Message>,
) -> Option<ConversationPatch> {
    let cached = cache.query_messages_by_conversation(&conversation.id);
    if cached.is_empty() || (cached.len() as u32) < conversation.num_messages {
        return None;
    }
    let messages: Vec<Message> = cached
        .into_iter()
        .map(|m| rewritten.get(&m.id).cloned().unwrap_or(m))
        .collect();
    let unread = messages.iter().filter(|m| m.unread).count() as u32;
    Some(
        ConversationPatch::new(conversation.id.clone())
            .labels(derive_conversation_labels(&messages))
            .num_unread(unread),
    )
}

/// Moves each message's contribution from its old labels to its new ones
/// on the conversation's label references.
pub fn shifted_patch(conversation: &Conversation, changes: &[(Message, Message)]) -> ConversationPatch {
    let mut labels = conversation.labels.clone();
    let mut touched: AHashSet<LabelId> = AHashSet::new();
    let mut num_unread = conversation.num_unread as i64;
    for (before, after) in changes {
        for id in &before.label_ids {
            if let Some(label) = labels.iter_mut().find(|l| &l.id == id) {
                label.context_num_messages = label.context_num_messages.saturating_sub(1);
                if before.unread {
                    label.context_num_unread = label.context_num_unread.saturating_sub(1);
                }
                touched.insert(id.clone());
            }
        }
        for id in &after.label_ids {
            let label = match labels.iter().position(|l| &l.id == id) {
                Some(index) => &mut labels[index],
                None => {
                    labels.push(ConversationLabel::new(id.clone(), 0, 0));
                    let last = labels.len() - 1;
                    &mut labels[last]
                }
            };
            label.context_num_messages += 1;
            if after.unread {
                label.context_num_unread += 1;
            }
            touched.insert(id.clone());
        }
        num_unread += after.unread as i64 - before.unread as i64;
    }
    labels.retain(|l| l.context_num_messages > 0 || !touched.contains(&l.id));
    ConversationPatch::new(conversation.id.clone())
        .labels(labels)
        .num_unread(num_unread.max(0) as u32)
}

/// Conversation events following a batch of message rewrites, one per
/// cached conversation.
pub fn conversation_events(cache: &LocalCache, changes: &[(Message, Message)]) -> Vec<MutationEvent> {
    let mut grouped: IndexMap<ConversationId, Vec<(Message, Message)>> = IndexMap::new();
    for change in changes {
        grouped
            .entry(change.0.conversation_id.clone())
            .or_default()
            .push(change.clone());
    }
    grouped
        .into_iter()
        .filter_map(|(conversation_id, group)| {
            let conversation = cache.get_conversation(&conversation_id)?;
            let rewritten: AHashMap<MessageId, Message> = group
                .iter()
                .map(|(_, after)| (after.id.clone(), after.clone()))
                .collect();
            let patch = derived_patch(cache, &conversation, &rewritten)
                .unwrap_or_else(|| shifted_patch(&conversation, &group));
            Some(MutationEvent::UpdateConversation(patch))
        })
        .collect()
}

/// Groups `(label, id)` pairs into one id list per label, keeping first-seen order.
pub fn group_by_label(pairs: impl IntoIterator<Item = (LabelId, String)>) -> IndexMap<LabelId, Vec<String>> {
    let mut grouped: IndexMap<LabelId, Vec<String>> = IndexMap::new();
    for (label, id) in pairs {
        let ids = grouped.entry(label).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    grouped
}

pub fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", count, plural)
    }
}

pub fn unique(addresses: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for address in addresses {
        if !address.is_empty() && !seen.contains(&address) {
            seen.push(address);
        }
    }
    seen
}
