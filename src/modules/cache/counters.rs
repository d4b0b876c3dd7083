// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use ahash::AHashMap;
use tracing::warn;

use crate::modules::mailbox::model::{Conversation, LabelCount, LabelId, Message};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct Delta {
    total: i64,
    unread: i64,
}

/// Denormalized `{total, unread}` counters per label, kept separately for
/// messages and for conversations.
///
/// Counters move by the difference between an entity's contribution before
/// and after each change; [`CounterReconciler::recount`] rebuilds them from
/// scratch when drift is suspected.
#[derive(Clone, Debug, Default)]
pub struct CounterReconciler {
    messages: AHashMap<LabelId, LabelCount>,
    conversations: AHashMap<LabelId, LabelCount>,
}

impl CounterReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_count(&self, label_id: &str) -> LabelCount {
        self.messages.get(label_id).copied().unwrap_or_default()
    }

    pub fn conversation_count(&self, label_id: &str) -> LabelCount {
        self.conversations.get(label_id).copied().unwrap_or_default()
    }

    pub fn on_message_change(&mut self, before: Option<&Message>, after: Option<&Message>) {
        let mut deltas: AHashMap<&str, Delta> = AHashMap::new();
        if let Some(before) = before {
            for label_id in &before.label_ids {
                let d = deltas.entry(label_id.as_str()).or_default();
                d.total -= 1;
                d.unread -= before.unread as i64;
            }
        }
        if let Some(after) = after {
            for label_id in &after.label_ids {
                let d = deltas.entry(label_id.as_str()).or_default();
                d.total += 1;
                d.unread += after.unread as i64;
            }
        }
        apply_deltas(&mut self.messages, deltas);
    }

    pub fn on_conversation_change(
        &mut self,
        before: Option<&Conversation>,
        after: Option<&Conversation>,
    ) {
        let mut deltas: AHashMap<&str, Delta> = AHashMap::new();
        if let Some(before) = before {
            for label in &before.labels {
                let d = deltas.entry(label.id.as_str()).or_default();
                d.total -= 1;
                d.unread -= label.context_num_unread as i64;
            }
        }
        if let Some(after) = after {
            for label in &after.labels {
                let d = deltas.entry(label.id.as_str()).or_default();
                d.total += 1;
                d.unread += label.context_num_unread as i64;
            }
        }
        apply_deltas(&mut self.conversations, deltas);
    }

    /// Installs server-authoritative message counts. Labels in `known` that
    /// the server did not list are zeroed.
    pub fn overwrite_messages(&mut self, known: &[LabelId], counts: &[(LabelId, LabelCount)]) {
        overwrite(&mut self.messages, known, counts);
    }

    pub fn overwrite_conversations(&mut self, known: &[LabelId], counts: &[(LabelId, LabelCount)]) {
        overwrite(&mut self.conversations, known, counts);
    }

    /// Full rescan over every cached entity.
    pub fn recount<'a, M, C>(messages: M, conversations: C) -> Self
    where
        M: IntoIterator<Item = &'a Message>,
        C: IntoIterator<Item = &'a Conversation>,
    {
        let mut counters = Self::new();
        for message in messages {
            counters.on_message_change(None, Some(message));
        }
        for conversation in conversations {
            counters.on_conversation_change(None, Some(conversation));
        }
        counters
    }

    /// Labels whose counters differ between `self` and `other`.
    pub fn diverging_labels(&self, other: &CounterReconciler) -> Vec<LabelId> {
        let mut labels: Vec<LabelId> = Vec::new();
        for (table, other_table) in [
            (&self.messages, &other.messages),
            (&self.conversations, &other.conversations),
        ] {
            for id in table.keys().chain(other_table.keys()) {
                let left = table.get(id).copied().unwrap_or_default();
                let right = other_table.get(id).copied().unwrap_or_default();
                if left != right && !labels.contains(id) {
                    labels.push(id.clone());
                }
            }
        }
        labels
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.conversations.clear();
    }
}

fn apply_deltas(table: &mut AHashMap<LabelId, LabelCount>, deltas: AHashMap<&str, Delta>) {
    for (label_id, delta) in deltas {
        if delta == Delta::default() {
            continue;
        }
        let count = table.entry(label_id.to_string()).or_default();
        count.total = shift(count.total, delta.total, label_id, "total");
        count.unread = shift(count.unread, delta.unread, label_id, "unread");
    }
}

fn shift(value: u64, delta: i64, label_id: &str, field: &str) -> u64 {
    let next = value as i64 + delta;
    if next < 0 {
        warn!(
            "Counter '{}' of label {} would drop below zero ({}), clamping",
            field, label_id, next
        );
        return 0;
    }
    next as u64
}

fn overwrite(
    table: &mut AHashMap<LabelId, LabelCount>,
    known: &[LabelId],
    counts: &[(LabelId, LabelCount)],
) {
    for id in known {
        table.insert(id.clone(), LabelCount::default());
    }
    for (id, count) in counts {
        table.insert(id.clone(), *count);
    }
}
