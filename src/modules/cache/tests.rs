// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::modules::{
    cache::{
        event::{ConversationPatch, MessagePatch, MutationEvent},
        store::{CacheChange, ChangeOrigin, LocalCache},
    },
    error::code::ErrorCode,
    mailbox::model::{
        derive_conversation_labels, Conversation, ConversationLabel, LabelCount, Message,
        ALL_MAIL, ARCHIVE, INBOX, STARRED, TRASH,
    },
};

fn message(id: &str, conversation_id: &str, unread: bool, labels: &[&str], time: i64) -> Message {
    Message {
        id: id.into(),
        conversation_id: conversation_id.into(),
        unread,
        label_ids: labels.iter().map(|l| l.to_string()).collect(),
        size: 100,
        time,
        ..Default::default()
    }
}

fn conversation_of(id: &str, messages: &[&Message]) -> Conversation {
    Conversation {
        id: id.into(),
        labels: derive_conversation_labels(messages.iter().copied()),
        num_messages: messages.len() as u32,
        num_unread: messages.iter().filter(|m| m.unread).count() as u32,
        size: messages.iter().map(|m| m.size).sum(),
        time: messages.iter().map(|m| m.time).max().unwrap_or_default(),
        ..Default::default()
    }
}

fn seed(cache: &LocalCache, conversation_id: &str, messages: Vec<Message>) {
    let refs: Vec<&Message> = messages.iter().collect();
    let conversation = conversation_of(conversation_id, &refs);
    let mut events: Vec<MutationEvent> = messages
        .iter()
        .cloned()
        .map(MutationEvent::CreateMessage)
        .collect();
    events.push(MutationEvent::CreateConversation(conversation));
    cache.apply(events, true);
}

fn unread_sum(cache: &LocalCache, label_id: &str, conversation_ids: &[&str]) -> u64 {
    conversation_ids
        .iter()
        .filter_map(|id| cache.get_conversation(id))
        .map(|c| c.context_num_unread(label_id) as u64)
        .sum()
}

#[test]
fn creates_feed_both_counter_tables() {
    let cache = LocalCache::new();
    seed(
        &cache,
        "c1",
        vec![
            message("m1", "c1", true, &[INBOX, ALL_MAIL], 1),
            message("m2", "c1", false, &[INBOX, ALL_MAIL, STARRED], 2),
        ],
    );

    assert_eq!(cache.message_count(INBOX), LabelCount { total: 2, unread: 1 });
    assert_eq!(cache.message_count(STARRED), LabelCount { total: 1, unread: 0 });
    assert_eq!(
        cache.conversation_count(INBOX),
        LabelCount { total: 1, unread: 1 }
    );
    assert_eq!(cache.message_count(TRASH), LabelCount::default());
}

#[test]
fn applying_a_batch_twice_changes_nothing_more() {
    let cache = LocalCache::new();
    let m1 = message("m1", "c1", true, &[INBOX, ALL_MAIL], 1);
    let conversation = conversation_of("c1", &[&m1]);
    let batch = vec![
        MutationEvent::CreateMessage(m1.clone()),
        MutationEvent::CreateConversation(conversation),
        MutationEvent::UpdateMessage(
            MessagePatch::new("m1")
                .unread(false)
                .add_labels(vec![STARRED.into()]),
        ),
        MutationEvent::UpdateConversation(ConversationPatch::new("c1").num_unread(0)),
    ];

    cache.apply(batch.clone(), true);
    let message_after_first = cache.get_message("m1");
    let conversation_after_first = cache.get_conversation("c1");
    let inbox_after_first = cache.message_count(INBOX);
    let starred_after_first = cache.message_count(STARRED);

    cache.apply(batch, true);
    assert_eq!(cache.get_message("m1"), message_after_first);
    assert_eq!(cache.get_conversation("c1"), conversation_after_first);
    assert_eq!(cache.message_count(INBOX), inbox_after_first);
    assert_eq!(cache.message_count(STARRED), starred_after_first);
    assert_eq!(starred_after_first, LabelCount { total: 1, unread: 0 });
    assert!(cache.recount_counters().is_empty());
}

#[test]
fn conversation_unread_matches_context_counts() {
    let cache = LocalCache::new();
    seed(
        &cache,
        "c1",
        vec![
            message("m1", "c1", true, &[INBOX, ALL_MAIL], 1),
            message("m2", "c1", true, &[INBOX, ALL_MAIL], 2),
        ],
    );
    seed(
        &cache,
        "c2",
        vec![message("m3", "c2", true, &[ARCHIVE, ALL_MAIL], 3)],
    );

    // c1 read in the inbox, c2 moved into the inbox
    cache.apply(
        vec![
            MutationEvent::UpdateMessage(MessagePatch::new("m1").unread(false)),
            MutationEvent::UpdateConversation(
                ConversationPatch::new("c1")
                    .labels(vec![
                        ConversationLabel::new(INBOX, 1, 2),
                        ConversationLabel::new(ALL_MAIL, 1, 2),
                    ])
                    .num_unread(1),
            ),
            MutationEvent::UpdateMessage(
                MessagePatch::new("m3")
                    .remove_labels(vec![ARCHIVE.into()])
                    .add_labels(vec![INBOX.into()]),
            ),
            MutationEvent::UpdateConversation(ConversationPatch::new("c2").labels(vec![
                ConversationLabel::new(INBOX, 1, 1),
                ConversationLabel::new(ALL_MAIL, 1, 1),
            ])),
        ],
        false,
    );

    for label in [INBOX, ALL_MAIL, ARCHIVE] {
        assert_eq!(
            cache.conversation_count(label).unread,
            unread_sum(&cache, label, &["c1", "c2"]),
            "label {}",
            label
        );
    }
    assert_eq!(cache.conversation_count(INBOX), LabelCount { total: 2, unread: 2 });
    assert_eq!(cache.conversation_count(ARCHIVE), LabelCount::default());
    assert!(cache.recount_counters().is_empty());
}

#[test]
fn deleting_the_last_message_drops_the_conversation() {
    let cache = LocalCache::new();
    seed(
        &cache,
        "c1",
        vec![message("m1", "c1", true, &[INBOX, ALL_MAIL], 1)],
    );

    cache.apply(vec![MutationEvent::delete_message("m1")], true);

    assert!(cache.get_message("m1").is_none());
    assert!(cache.get_conversation("c1").is_none());
    assert_eq!(cache.conversation_count(INBOX), LabelCount::default());
    assert_eq!(cache.message_count(INBOX), LabelCount::default());
}

#[test]
fn deleting_one_of_many_shrinks_the_conversation() {
    let cache = LocalCache::new();
    seed(
        &cache,
        "c1",
        vec![
            message("m1", "c1", true, &[INBOX, ALL_MAIL], 1),
            message("m2", "c1", false, &[ARCHIVE, ALL_MAIL], 2),
        ],
    );

    cache.apply(vec![MutationEvent::delete_message("m1")], true);

    let conversation = cache.get_conversation("c1").unwrap();
    assert_eq!(conversation.num_messages, 1);
    assert_eq!(conversation.num_unread, 0);
    let labels: Vec<&str> = conversation.label_ids().collect();
    assert_eq!(labels, vec![ARCHIVE, ALL_MAIL]);
    assert_eq!(cache.conversation_count(INBOX), LabelCount::default());
    assert_eq!(
        cache.conversation_count(ARCHIVE),
        LabelCount { total: 1, unread: 0 }
    );
}

/// Caches `conversation` with only `cached` of its messages.
fn seed_partial(cache: &LocalCache, conversation: Conversation, cached: &[&Message]) {
    let mut events: Vec<MutationEvent> = cached
        .iter()
        .map(|m| MutationEvent::CreateMessage((*m).clone()))
        .collect();
    events.push(MutationEvent::CreateConversation(conversation));
    cache.apply(events, true);
}

#[test]
fn deleting_from_a_partly_cached_conversation_subtracts_its_share() {
    let m1 = message("m1", "c1", true, &[INBOX, ALL_MAIL], 1);
    let m2 = message("m2", "c1", true, &[INBOX, ALL_MAIL], 2);
    let m3 = message("m3", "c1", true, &[ARCHIVE, ALL_MAIL], 3);
    let full = conversation_of("c1", &[&m1, &m2, &m3]);

    let cache = LocalCache::new();
    seed_partial(&cache, full.clone(), &[&m1, &m2]);
    cache.apply(vec![MutationEvent::delete_message("m1")], true);

    let conversation = cache.get_conversation("c1").unwrap();
    assert_eq!(conversation.num_messages, 2);
    assert_eq!(conversation.num_unread, 2);
    assert_eq!(conversation.size, 200);
    assert_eq!(
        conversation.labels,
        vec![
            ConversationLabel::new(INBOX, 1, 1),
            ConversationLabel::new(ALL_MAIL, 2, 2),
            ConversationLabel::new(ARCHIVE, 1, 1),
        ]
    );
    assert_eq!(cache.conversation_count(INBOX), LabelCount { total: 1, unread: 1 });
    assert_eq!(cache.conversation_count(ALL_MAIL), LabelCount { total: 1, unread: 2 });

    // Only the deleted message cached: the uncached siblings keep their share.
    let cache = LocalCache::new();
    seed_partial(&cache, full, &[&m3]);
    cache.apply(vec![MutationEvent::delete_message("m3")], true);

    let conversation = cache.get_conversation("c1").unwrap();
    assert_eq!(conversation.num_unread, 2);
    assert_eq!(
        conversation.labels,
        vec![
            ConversationLabel::new(INBOX, 2, 2),
            ConversationLabel::new(ALL_MAIL, 2, 2),
        ]
    );
    assert_eq!(cache.conversation_count(ARCHIVE), LabelCount::default());
    assert_eq!(cache.conversation_count(INBOX), LabelCount { total: 1, unread: 2 });
    assert_eq!(unread_sum(&cache, INBOX, &["c1"]), 2);
}

#[test]
fn deleting_a_conversation_keeps_unrelated_entries() {
    let cache = LocalCache::new();
    seed(&cache, "c1", vec![message("m1", "c1", false, &[INBOX], 1)]);
    seed(&cache, "c2", vec![message("m2", "c2", false, &[INBOX], 2)]);

    cache.apply(
        vec![
            MutationEvent::delete_message("m1"),
            MutationEvent::delete_conversation("c1"),
        ],
        false,
    );

    assert!(cache.get_conversation("c1").is_none());
    assert!(cache.get_conversation("c2").is_some());
    assert_eq!(cache.conversation_count(INBOX).total, 1);
}

#[test]
fn updates_of_uncached_entities_are_ignored() {
    let cache = LocalCache::new();
    let mut changes = cache.subscribe();
    cache.apply(
        vec![MutationEvent::UpdateMessage(
            MessagePatch::new("missing").unread(true),
        )],
        true,
    );
    assert!(cache.get_message("missing").is_none());
    assert!(changes.try_recv().is_err());
}

#[test]
fn subscribers_see_origin_and_touched_ids() {
    let cache = LocalCache::new();
    let mut changes = cache.subscribe();
    seed(&cache, "c1", vec![message("m1", "c1", true, &[INBOX], 1)]);
    cache.apply(
        vec![MutationEvent::UpdateMessage(
            MessagePatch::new("m1").unread(false),
        )],
        false,
    );

    assert_eq!(
        changes.try_recv().unwrap(),
        CacheChange::Applied {
            origin: ChangeOrigin::Server,
            messages: vec!["m1".into()],
            conversations: vec!["c1".into()],
        }
    );
    assert_eq!(
        changes.try_recv().unwrap(),
        CacheChange::Applied {
            origin: ChangeOrigin::Local,
            messages: vec!["m1".into()],
            conversations: vec![],
        }
    );
}

#[test]
fn conversation_messages_come_oldest_first() {
    let cache = LocalCache::new();
    seed(
        &cache,
        "c1",
        vec![
            message("late", "c1", false, &[INBOX], 30),
            message("early", "c1", false, &[INBOX], 10),
            message("middle", "c1", false, &[INBOX], 20),
        ],
    );
    let ids: Vec<String> = cache
        .query_messages_by_conversation("c1")
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec!["early", "middle", "late"]);
}

#[test]
fn label_listing_is_paged_newest_first() {
    let cache = LocalCache::new();
    for i in 0..5 {
        let conversation_id = format!("c{}", i);
        seed(
            &cache,
            &conversation_id,
            vec![message(&format!("m{}", i), &conversation_id, false, &[INBOX], i)],
        );
    }

    let page = cache.conversations_in_label(INBOX, Some(1), Some(2)).unwrap();
    assert_eq!(page.total_items, 5);
    assert_eq!(page.total_pages, Some(3));
    let ids: Vec<&str> = page.items.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c4", "c3"]);

    let last = cache.messages_in_label(INBOX, Some(3), Some(2)).unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].id, "m0");

    let beyond = cache.messages_in_label(INBOX, Some(9), Some(2)).unwrap();
    assert!(beyond.items.is_empty());

    let err = cache.conversations_in_label(INBOX, Some(0), Some(2)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParameter);

    let err = cache
        .messages_in_label(INBOX, Some(u64::MAX), Some(2))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParameter);

    let whole = cache.messages_in_label(INBOX, Some(1), Some(u64::MAX)).unwrap();
    assert_eq!(whole.items.len(), 5);
}

#[test]
fn overwrite_zeroes_known_labels_left_out() {
    let cache = LocalCache::new();
    seed(
        &cache,
        "c1",
        vec![message("m1", "c1", true, &[INBOX, ARCHIVE], 1)],
    );

    let known = vec![INBOX.to_string(), ARCHIVE.to_string()];
    let server = vec![(INBOX.to_string(), LabelCount { total: 40, unread: 7 })];
    cache.overwrite_counts(&known, Some(server.as_slice()), None);

    assert_eq!(cache.message_count(INBOX), LabelCount { total: 40, unread: 7 });
    assert_eq!(cache.message_count(ARCHIVE), LabelCount::default());
    // Conversation counters were not part of the overwrite.
    assert_eq!(cache.conversation_count(ARCHIVE), LabelCount { total: 1, unread: 1 });
}

#[test]
fn recount_reports_drifted_labels() {
    let cache = LocalCache::new();
    seed(&cache, "c1", vec![message("m1", "c1", true, &[INBOX], 1)]);
    let server = vec![(INBOX.to_string(), LabelCount { total: 9, unread: 9 })];
    cache.overwrite_counts(&[], Some(server.as_slice()), None);

    let drifted = cache.recount_counters();
    assert_eq!(drifted, vec![INBOX.to_string()]);
    assert_eq!(cache.message_count(INBOX), LabelCount { total: 1, unread: 1 });
    assert!(cache.recount_counters().is_empty());
}

#[test]
fn reset_clears_entities_and_counters() {
    let cache = LocalCache::new();
    let mut changes = cache.subscribe();
    seed(&cache, "c1", vec![message("m1", "c1", true, &[INBOX], 1)]);
    cache.reset();

    assert!(cache.get_message("m1").is_none());
    assert!(cache.get_conversation("c1").is_none());
    assert_eq!(cache.message_count(INBOX), LabelCount::default());
    assert!(matches!(changes.try_recv(), Ok(CacheChange::Applied { .. })));
    assert_eq!(changes.try_recv().unwrap(), CacheChange::Reset);
}

#[tokio::test]
async fn settles_once_pending_writes_finish() {
    let cache = Arc::new(LocalCache::new());
    let (release, released) = oneshot::channel::<()>();
    let write = cache.add_pending_request(async move {
        let _ = released.await;
        "done"
    });
    assert_eq!(cache.pending_requests(), 1);

    let handle = tokio::spawn(write);
    let waiter = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.pending_settled().await })
    };
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    release.send(()).unwrap();
    assert_eq!(handle.await.unwrap(), "done");
    waiter.await.unwrap();
    assert_eq!(cache.pending_requests(), 0);
}

#[tokio::test]
async fn settled_returns_at_once_when_idle() {
    let cache = LocalCache::new();
    cache.pending_settled().await;
    assert_eq!(cache.pending_requests(), 0);
}
