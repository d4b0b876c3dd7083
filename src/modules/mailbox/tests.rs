// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::mailbox::{
    labels::{LabelChange, LabelsModel},
    model::{
        derive_conversation_labels, labels_moved, Conversation, ConversationLabel, Label,
        LabelKind, Message, ALL_DRAFTS, ALL_MAIL, ALL_SENT, ARCHIVE, DRAFTS, INBOX, SENT,
        STARRED, TRASH,
    },
};

fn message(id: &str, unread: bool, labels: &[&str]) -> Message {
    Message {
        id: id.into(),
        conversation_id: "c1".into(),
        unread,
        label_ids: labels.iter().map(|l| l.to_string()).collect(),
        ..Default::default()
    }
}

fn label(id: &str, name: &str, kind: LabelKind, notify: bool, order: i64) -> Label {
    Label {
        id: id.into(),
        name: name.into(),
        kind,
        color: None,
        notify,
        order,
    }
}

#[test]
fn derived_labels_count_per_label() {
    let messages = vec![
        message("m1", true, &[INBOX, ALL_MAIL]),
        message("m2", false, &[INBOX, ALL_MAIL, STARRED]),
        message("m3", true, &[ARCHIVE, ALL_MAIL]),
    ];
    let labels = derive_conversation_labels(&messages);
    assert_eq!(
        labels,
        vec![
            ConversationLabel::new(INBOX, 1, 2),
            ConversationLabel::new(ALL_MAIL, 2, 3),
            ConversationLabel::new(STARRED, 0, 1),
            ConversationLabel::new(ARCHIVE, 1, 1),
        ]
    );
    assert!(derive_conversation_labels(&Vec::<Message>::new()).is_empty());
}

#[test]
fn labels_with_resolves_removals_first() {
    let conversation = Conversation {
        id: "c1".into(),
        labels: vec![
            ConversationLabel::new(INBOX, 1, 2),
            ConversationLabel::new(ALL_MAIL, 1, 2),
        ],
        num_messages: 2,
        num_unread: 1,
        ..Default::default()
    };

    let moved = conversation.labels_with(&[TRASH.into()], &[INBOX.into()]);
    assert_eq!(
        moved,
        vec![
            ConversationLabel::new(ALL_MAIL, 1, 2),
            ConversationLabel::new(TRASH, 1, 2),
        ]
    );

    // A label both removed and added ends up present again.
    let both = conversation.labels_with(&[INBOX.into()], &[INBOX.into()]);
    assert!(both.iter().any(|l| l.id == INBOX));

    // Adding an existing label keeps its own counts.
    let kept = conversation.labels_with(&[ALL_MAIL.into()], &[]);
    assert_eq!(kept, conversation.labels);
}

#[test]
fn moving_sent_and_drafts_to_inbox() {
    let sent = message("m1", false, &[ALL_SENT, SENT]);
    let draft = message("m2", false, &[ALL_DRAFTS, DRAFTS]);
    let received = message("m3", false, &[ARCHIVE]);

    assert_eq!(labels_moved(&sent, INBOX), vec![SENT.to_string()]);
    assert_eq!(labels_moved(&draft, INBOX), vec![DRAFTS.to_string()]);
    assert_eq!(labels_moved(&received, INBOX), vec![INBOX.to_string()]);
    assert_eq!(labels_moved(&sent, TRASH), vec![TRASH.to_string()]);
}

#[test]
fn registry_refresh_and_sync() {
    let model = LabelsModel::new();
    model.refresh(vec![
        label("work", "Work", LabelKind::Label, false, 2),
        label("projects", "Projects", LabelKind::Folder, true, 1),
        label("friends", "Friends", LabelKind::ContactGroup, true, 3),
    ]);

    assert_eq!(model.ids(LabelKind::Label), vec!["work".to_string()]);
    assert_eq!(model.ids(LabelKind::Folder), vec!["projects".to_string()]);
    assert!(model.contains("projects", LabelKind::Folder));
    assert!(!model.contains("projects", LabelKind::Label));

    model.sync(vec![
        LabelChange::Upsert(label("work", "Office", LabelKind::Label, true, 2)),
        LabelChange::Upsert(label("travel", "Travel", LabelKind::Label, false, 4)),
        LabelChange::Delete("projects".into()),
    ]);

    assert_eq!(model.read("work").unwrap().name, "Office");
    assert!(model.read("projects").is_none());
    assert_eq!(
        model.ids(LabelKind::Label),
        vec!["work".to_string(), "travel".to_string()]
    );
    assert!(model.ids(LabelKind::Folder).is_empty());
}

#[test]
fn notify_ids_skip_contact_groups() {
    let model = LabelsModel::new();
    model.refresh(vec![
        label("alerts", "Alerts", LabelKind::Label, true, 1),
        label("quiet", "Quiet", LabelKind::Folder, false, 2),
        label("family", "Family", LabelKind::ContactGroup, true, 3),
    ]);
    assert_eq!(
        model.notify_ids(),
        vec![INBOX.to_string(), STARRED.to_string(), "alerts".to_string()]
    );
}

#[test]
fn removable_locations_are_folders() {
    let model = LabelsModel::new();
    model.refresh(vec![
        label("projects", "Projects", LabelKind::Folder, false, 1),
        label("work", "Work", LabelKind::Label, false, 2),
    ]);
    assert!(model.is_removable_location(INBOX));
    assert!(model.is_removable_location(TRASH));
    assert!(model.is_removable_location("projects"));
    assert!(!model.is_removable_location("work"));
    assert!(!model.is_removable_location(STARRED));
    assert!(!model.is_removable_location(ALL_MAIL));
}

#[test]
fn display_names() {
    let model = LabelsModel::new();
    model.refresh(vec![label("work", "Work", LabelKind::Label, false, 1)]);
    assert_eq!(model.display_name(TRASH), "Trash");
    assert_eq!(model.display_name(ALL_SENT), "Sent");
    assert_eq!(model.display_name("work"), "Work");
    assert_eq!(model.display_name("unknown"), "unknown");
}
