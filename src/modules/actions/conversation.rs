// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use ahash::AHashMap;

use crate::modules::{
    actions::{
        api::{MutationKind, MutationRequest, Scope},
        message::label_requests,
        plan::{derived_patch, patched, plural, unique, user_label_ids, ActionPlan, LabelSelection, Planner},
    },
    cache::event::{ConversationPatch, MessagePatch, MutationEvent},
    mailbox::model::{
        labels_moved, Conversation, ConversationLabel, LabelId, Message, MessageId, ViewMode,
        ALL_MAIL, SPAM, STARRED, TRASH,
    },
};

/// Events for one conversation: its message updates, then the conversation
/// update. The latter is derived from the messages when all are cached and
/// falls back to `fallback` otherwise.
fn rewrite<F>(
    planner: &Planner<'_>,
    conversation_id: &str,
    patches: Vec<(Message, MessagePatch)>,
    fallback: F,
) -> Vec<MutationEvent>
where
    F: FnOnce(&Conversation) -> ConversationPatch,
{
    let rewritten: AHashMap<MessageId, Message> = patches
        .iter()
        .map(|(message, patch)| (message.id.clone(), patched(message, patch)))
        .collect();
    let mut events: Vec<MutationEvent> = patches
        .into_iter()
        .map(|(_, patch)| MutationEvent::UpdateMessage(patch))
        .collect();
    if let Some(conversation) = planner.cache.get_conversation(conversation_id) {
        let patch = derived_patch(planner.cache, &conversation, &rewritten)
            .unwrap_or_else(|| fallback(&conversation));
        events.push(MutationEvent::UpdateConversation(patch));
    }
    events
}

pub fn move_to(planner: &Planner<'_>, ids: &[String], to: &str, undo: bool) -> ActionPlan {
    let to_trash = to == TRASH;
    let leaving = planner.folders_left_by(to);
    let mut plan = ActionPlan::new("move");
    let mut senders: Vec<String> = Vec::new();

    for id in ids {
        let patches: Vec<(Message, MessagePatch)> = planner
            .cache
            .query_messages_by_conversation(id)
            .into_iter()
            .map(|message| {
                let removed: Vec<LabelId> = message
                    .label_ids
                    .iter()
                    .filter(|l| leaving.contains(l))
                    .cloned()
                    .collect();
                let patch = MessagePatch::new(message.id.clone())
                    .unread(!to_trash && message.unread)
                    .remove_labels(removed)
                    .add_labels(labels_moved(&message, to));
                (message, patch)
            })
            .collect();

        if let Some(conversation) = planner.cache.get_conversation(id) {
            senders.extend(conversation.senders.iter().map(|s| s.address.clone()));
        }

        plan.events.extend(rewrite(planner, id, patches, |conversation| {
            let unread = if to_trash { 0 } else { conversation.num_unread };
            let mut labels = vec![ConversationLabel::new(
                to,
                unread,
                conversation.num_messages,
            )];
            labels.extend(
                conversation
                    .labels
                    .iter()
                    .filter(|l| l.id != to && !leaving.contains(&l.id))
                    .map(|l| ConversationLabel {
                        context_num_unread: if to_trash { 0 } else { l.context_num_unread },
                        ..l.clone()
                    }),
            );
            ConversationPatch::new(conversation.id.clone())
                .labels(labels)
                .num_unread(unread)
        }));
    }

    if to == SPAM {
        plan.spam = unique(senders);
    }
    plan.requests = vec![
        MutationRequest::new(Scope::Conversations, MutationKind::Label, ids.to_vec())
            .with_label(to),
    ];
    plan.success = Some(format!(
        "{} moved to {}",
        plural(ids.len(), "conversation", "conversations"),
        planner.labels.display_name(to)
    ));
    plan.undo = planner.undo_move(undo, ViewMode::Conversation, ids);
    plan
}

/// Marks read the messages shown in the current location.
pub fn read(planner: &Planner<'_>, ids: &[String]) -> ActionPlan {
    let location = planner.location.clone();
    let mut plan = ActionPlan::new("mark as read");
    for id in ids {
        let patches: Vec<(Message, MessagePatch)> = planner
            .cache
            .query_messages_by_conversation(id)
            .into_iter()
            .filter(|m| m.unread && m.has_label(&location))
            .map(|m| {
                let patch = MessagePatch::new(m.id.clone()).unread(false);
                (m, patch)
            })
            .collect();
        let marked = patches.len() as u32;

        plan.events.extend(rewrite(planner, id, patches, |conversation| {
            let labels = conversation
                .labels
                .iter()
                .map(|l| ConversationLabel {
                    context_num_unread: if l.id == location || l.id == ALL_MAIL {
                        0
                    } else {
                        l.context_num_unread
                    },
                    ..l.clone()
                })
                .collect();
            ConversationPatch::new(conversation.id.clone())
                .labels(labels)
                .num_unread(conversation.num_unread.saturating_sub(marked))
        }));
    }
    plan.requests = vec![MutationRequest::new(
        Scope::Conversations,
        MutationKind::Read,
        ids.to_vec(),
    )];
    plan
}

/// Marks unread the most recent message of the current location.
pub fn unread(planner: &Planner<'_>, ids: &[String]) -> ActionPlan {
    let location = planner.location.clone();
    let mut plan = ActionPlan::new("mark as unread");
    for id in ids {
        let latest = planner
            .cache
            .query_messages_by_conversation(id)
            .into_iter()
            .filter(|m| m.has_label(&location))
            .max_by_key(|m| m.time);
        let patches: Vec<(Message, MessagePatch)> = latest
            .filter(|m| !m.unread)
            .map(|m| {
                let patch = MessagePatch::new(m.id.clone()).unread(true);
                (m, patch)
            })
            .into_iter()
            .collect();

        plan.events.extend(rewrite(planner, id, patches, |conversation| {
            let labels = conversation
                .labels
                .iter()
                .map(|l| ConversationLabel {
                    context_num_unread: if l.id == location || l.id == ALL_MAIL {
                        l.context_num_unread + 1
                    } else {
                        l.context_num_unread
                    },
                    ..l.clone()
                })
                .collect();
            ConversationPatch::new(conversation.id.clone())
                .labels(labels)
                .num_unread(conversation.num_unread + 1)
        }));
    }
    plan.requests = vec![MutationRequest::new(
        Scope::Conversations,
        MutationKind::Unread,
        ids.to_vec(),
    )
    .with_label(location)];
    plan
}

fn star_toggle(planner: &Planner<'_>, ids: &[String], starred: bool) -> ActionPlan {
    let star = vec![STARRED.to_string()];
    let (added, removed): (Vec<LabelId>, Vec<LabelId>) = if starred {
        (star, Vec::new())
    } else {
        (Vec::new(), star)
    };
    let (action, kind) = if starred {
        ("star", MutationKind::Star)
    } else {
        ("unstar", MutationKind::Unstar)
    };

    let mut plan = ActionPlan::new(action);
    for id in ids {
        if planner.cache.get_conversation(id).is_none() {
            continue;
        }
        let patches: Vec<(Message, MessagePatch)> = planner
            .cache
            .query_messages_by_conversation(id)
            .into_iter()
            .map(|m| {
                let patch = MessagePatch::new(m.id.clone())
                    .add_labels(added.clone())
                    .remove_labels(removed.clone());
                (m, patch)
            })
            .collect();
        plan.events.extend(rewrite(planner, id, patches, |conversation| {
            ConversationPatch::new(conversation.id.clone())
                .labels(conversation.labels_with(&added, &removed))
        }));
    }
    plan.requests = vec![MutationRequest::new(Scope::Conversations, kind, ids.to_vec())];
    plan
}

pub fn star(planner: &Planner<'_>, ids: &[String]) -> ActionPlan {
    star_toggle(planner, ids, true)
}

pub fn unstar(planner: &Planner<'_>, ids: &[String]) -> ActionPlan {
    star_toggle(planner, ids, false)
}

pub fn label(
    planner: &Planner<'_>,
    ids: &[String],
    selections: &[LabelSelection],
    also_archive: bool,
) -> ActionPlan {
    let mut plan = ActionPlan::new("label");
    let mut added_pairs: Vec<(LabelId, String)> = Vec::new();
    let mut removed_pairs: Vec<(LabelId, String)> = Vec::new();

    for id in ids {
        if planner.cache.get_conversation(id).is_none() {
            continue;
        }
        let patches: Vec<(Message, MessagePatch)> = planner
            .cache
            .query_messages_by_conversation(id)
            .into_iter()
            .map(|m| {
                let present = user_label_ids(&m);
                let (added, removed) = planner.label_rules(Some(&present), selections, also_archive);
                let patch = MessagePatch::new(m.id.clone())
                    .add_labels(added)
                    .remove_labels(removed);
                (m, patch)
            })
            .collect();

        let (added, removed) = planner.label_rules(None, selections, also_archive);
        added_pairs.extend(added.iter().map(|l| (l.clone(), id.clone())));
        removed_pairs.extend(removed.iter().map(|l| (l.clone(), id.clone())));

        plan.events.extend(rewrite(planner, id, patches, |conversation| {
            ConversationPatch::new(conversation.id.clone())
                .labels(conversation.labels_with(&added, &removed))
        }));
    }

    plan.requests = label_requests(
        Scope::Conversations,
        added_pairs,
        removed_pairs,
        also_archive,
        ids,
    );
    plan.resync = true;
    plan
}

/// Drops every cached message of the conversations, then the conversations.
pub fn delete(planner: &Planner<'_>, ids: &[String]) -> ActionPlan {
    let mut plan = ActionPlan::new("delete");
    for id in ids {
        plan.events.extend(
            planner
                .cache
                .query_messages_by_conversation(id)
                .into_iter()
                .map(|m| MutationEvent::delete_message(m.id)),
        );
        plan.events.push(MutationEvent::delete_conversation(id.clone()));
    }
    plan.requests = vec![MutationRequest::new(
        Scope::Conversations,
        MutationKind::Delete,
        ids.to_vec(),
    )
    .with_label(planner.location.clone())];
    plan
}
