// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::modules::mailbox::model::{
    Label, LabelId, LabelKind, ALL_DRAFTS, ALL_MAIL, ALL_SENT, ARCHIVE, BASIC_FOLDERS, DRAFTS,
    INBOX, SENT, SPAM, STARRED, TRASH,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LabelChange {
    Upsert(Label),
    Delete(LabelId),
}

/// Registry of the user's folders, labels and contact groups.
#[derive(Debug, Default)]
pub struct LabelsModel {
    labels: RwLock<IndexMap<LabelId, Label>>,
}

impl LabelsModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every known label, e.g. after a full refresh.
    pub fn refresh(&self, mut labels: Vec<Label>) {
        labels.sort_by_key(|l| l.order);
        let mut guard = self.labels.write();
        guard.clear();
        guard.extend(labels.into_iter().map(|l| (l.id.clone(), l)));
        debug!("Label registry refreshed with {} entries", guard.len());
    }

    pub fn sync(&self, changes: Vec<LabelChange>) {
        let mut guard = self.labels.write();
        for change in changes {
            match change {
                LabelChange::Upsert(label) => {
                    guard.insert(label.id.clone(), label);
                }
                LabelChange::Delete(id) => {
                    guard.shift_remove(&id);
                }
            }
        }
    }

    pub fn read(&self, id: &str) -> Option<Label> {
        self.labels.read().get(id).cloned()
    }

    pub fn ids(&self, kind: LabelKind) -> Vec<LabelId> {
        self.labels
            .read()
            .values()
            .filter(|l| l.kind == kind)
            .map(|l| l.id.clone())
            .collect()
    }

    pub fn contains(&self, id: &str, kind: LabelKind) -> bool {
        self.labels
            .read()
            .get(id)
            .is_some_and(|l| l.kind == kind)
    }

    /// Labels whose new mail should notify. Inbox and starred always do.
    pub fn notify_ids(&self) -> Vec<LabelId> {
        let mut ids = vec![INBOX.to_string(), STARRED.to_string()];
        ids.extend(
            self.labels
                .read()
                .values()
                .filter(|l| l.notify && l.kind != LabelKind::ContactGroup)
                .map(|l| l.id.clone()),
        );
        ids
    }

    /// Locations an item can be removed from when it gets archived.
    pub fn is_removable_location(&self, id: &str) -> bool {
        BASIC_FOLDERS.contains(&id) || self.contains(id, LabelKind::Folder)
    }

    /// Display name, falling back to the built-in folder names.
    pub fn display_name(&self, id: &str) -> String {
        match id {
            INBOX => "Inbox".into(),
            SPAM => "Spam".into(),
            DRAFTS | ALL_DRAFTS => "Drafts".into(),
            SENT | ALL_SENT => "Sent".into(),
            TRASH => "Trash".into(),
            ARCHIVE => "Archive".into(),
            ALL_MAIL => "All Mail".into(),
            STARRED => "Starred".into(),
            other => self
                .read(other)
                .map(|l| l.name)
                .unwrap_or_else(|| other.to_string()),
        }
    }
}
