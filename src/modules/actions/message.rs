// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::{
    actions::{
        api::{MutationKind, MutationRequest, Scope},
        plan::{
            conversation_events, group_by_label, patched, plural, unique, user_label_ids,
            ActionPlan, LabelSelection, Planner,
        },
    },
    cache::event::{MessagePatch, MutationEvent},
    mailbox::model::{labels_moved, LabelId, Message, ViewMode, ARCHIVE, SPAM, STARRED, TRASH},
};

/// Message updates plus the conversation updates they imply.
fn rewrite(planner: &Planner<'_>, patches: Vec<(Message, MessagePatch)>) -> Vec<MutationEvent> {
    let changes: Vec<(Message, Message)> = patches
        .iter()
        .map(|(message, patch)| (message.clone(), patched(message, patch)))
        .collect();
    let mut events: Vec<MutationEvent> = patches
        .into_iter()
        .map(|(_, patch)| MutationEvent::UpdateMessage(patch))
        .collect();
    events.extend(conversation_events(planner.cache, &changes));
    events
}

fn cached(planner: &Planner<'_>, ids: &[String]) -> Vec<Message> {
    ids.iter()
        .filter_map(|id| planner.cache.get_message(id))
        .collect()
}

pub fn move_to(planner: &Planner<'_>, ids: &[String], to: &str, undo: bool) -> ActionPlan {
    let to_trash = to == TRASH;
    let leaving = planner.folders_left_by(to);
    let messages = cached(planner, ids);

    let patches: Vec<(Message, MessagePatch)> = messages
        .iter()
        .map(|message| {
            let removed: Vec<LabelId> = message
                .label_ids
                .iter()
                .filter(|id| leaving.contains(id))
                .cloned()
                .collect();
            let patch = MessagePatch::new(message.id.clone())
                .unread(!to_trash && message.unread)
                .remove_labels(removed)
                .add_labels(labels_moved(message, to));
            (message.clone(), patch)
        })
        .collect();

    let mut plan = ActionPlan::new("move");
    if to == SPAM {
        plan.spam = unique(messages.iter().map(|m| m.sender.address.clone()));
    }
    plan.events = rewrite(planner, patches);
    plan.requests = vec![
        MutationRequest::new(Scope::Messages, MutationKind::Label, ids.to_vec()).with_label(to),
    ];
    plan.success = Some(format!(
        "{} moved to {}",
        plural(ids.len(), "message", "messages"),
        planner.labels.display_name(to)
    ));
    plan.undo = planner.undo_move(undo, ViewMode::Message, ids);
    plan
}

/// Applies the picker state to every message; `also_archive` additionally
/// files them into the archive.
pub fn label(
    planner: &Planner<'_>,
    ids: &[String],
    selections: &[LabelSelection],
    also_archive: bool,
) -> ActionPlan {
    let messages = cached(planner, ids);
    let mut added_pairs: Vec<(LabelId, String)> = Vec::new();
    let mut removed_pairs: Vec<(LabelId, String)> = Vec::new();

    let patches: Vec<(Message, MessagePatch)> = messages
        .iter()
        .map(|message| {
            let present = user_label_ids(message);
            let (added, removed) = planner.label_rules(Some(&present), selections, also_archive);
            added_pairs.extend(added.iter().map(|l| (l.clone(), message.id.clone())));
            removed_pairs.extend(removed.iter().map(|l| (l.clone(), message.id.clone())));
            let patch = MessagePatch::new(message.id.clone())
                .add_labels(added)
                .remove_labels(removed);
            (message.clone(), patch)
        })
        .collect();

    let mut plan = ActionPlan::new("label");
    plan.events = rewrite(planner, patches);
    plan.requests = label_requests(Scope::Messages, added_pairs, removed_pairs, also_archive, ids);
    plan.resync = true;
    plan
}

pub fn label_requests(
    scope: Scope,
    added: Vec<(LabelId, String)>,
    removed: Vec<(LabelId, String)>,
    also_archive: bool,
    ids: &[String],
) -> Vec<MutationRequest> {
    let mut requests: Vec<MutationRequest> = Vec::new();
    for (label_id, label_ids) in group_by_label(added) {
        if also_archive && label_id == ARCHIVE {
            continue;
        }
        requests.push(MutationRequest::new(scope, MutationKind::Label, label_ids).with_label(label_id));
    }
    for (label_id, label_ids) in group_by_label(removed) {
        requests.push(MutationRequest::new(scope, MutationKind::Unlabel, label_ids).with_label(label_id));
    }
    if also_archive {
        requests.push(MutationRequest::new(scope, MutationKind::Archive, ids.to_vec()));
    }
    requests
}

fn star_toggle(planner: &Planner<'_>, ids: &[String], starred: bool) -> ActionPlan {
    let patches: Vec<(Message, MessagePatch)> = cached(planner, ids)
        .into_iter()
        .filter(|m| m.has_label(STARRED) != starred)
        .map(|message| {
            let patch = MessagePatch::new(message.id.clone());
            let patch = if starred {
                patch.add_labels(vec![STARRED.to_string()])
            } else {
                patch.remove_labels(vec![STARRED.to_string()])
            };
            (message, patch)
        })
        .collect();

    let (action, kind) = if starred {
        ("star", MutationKind::Star)
    } else {
        ("unstar", MutationKind::Unstar)
    };
    let mut plan = ActionPlan::new(action);
    plan.events = rewrite(planner, patches);
    plan.requests = vec![MutationRequest::new(Scope::Messages, kind, ids.to_vec())];
    plan
}

pub fn star(planner: &Planner<'_>, ids: &[String]) -> ActionPlan {
    star_toggle(planner, ids, true)
}

pub fn unstar(planner: &Planner<'_>, ids: &[String]) -> ActionPlan {
    star_toggle(planner, ids, false)
}

fn read_toggle(planner: &Planner<'_>, ids: &[String], unread: bool) -> ActionPlan {
    let patches: Vec<(Message, MessagePatch)> = cached(planner, ids)
        .into_iter()
        .filter(|m| m.unread != unread)
        .map(|message| {
            let patch = MessagePatch::new(message.id.clone()).unread(unread);
            (message, patch)
        })
        .collect();

    let (action, kind) = if unread {
        ("mark as unread", MutationKind::Unread)
    } else {
        ("mark as read", MutationKind::Read)
    };
    let mut plan = ActionPlan::new(action);
    plan.events = rewrite(planner, patches);
    plan.requests = vec![MutationRequest::new(Scope::Messages, kind, ids.to_vec())];
    plan
}

pub fn read(planner: &Planner<'_>, ids: &[String]) -> ActionPlan {
    read_toggle(planner, ids, false)
}

pub fn unread(planner: &Planner<'_>, ids: &[String]) -> ActionPlan {
    read_toggle(planner, ids, true)
}

/// The cache shrinks or drops the parent conversations itself.
pub fn delete(planner: &Planner<'_>, ids: &[String]) -> ActionPlan {
    let mut plan = ActionPlan::new("delete");
    plan.events = cached(planner, ids)
        .into_iter()
        .map(|m| MutationEvent::delete_message(m.id))
        .collect();
    plan.requests = vec![MutationRequest::new(
        Scope::Messages,
        MutationKind::Delete,
        ids.to_vec(),
    )];
    plan
}
