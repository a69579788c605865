mod common;

use common::{student, teacher, Harness};
use direct_messaging_service::{error::AppError, models::MessagePayload};

#[tokio::test]
async fn test_unread_counts_per_viewer() {
    let h = Harness::new();
    let a = student();
    let b = teacher();
    let conversation = h
        .services
        .directory
        .open_with(&a, b.user_id)
        .await
        .unwrap();

    for i in 0..5 {
        h.services
            .ledger
            .send(&b, conversation.id, MessagePayload::text(format!("from b {i}")), None)
            .await
            .unwrap();
    }
    let mut from_a = Vec::new();
    for i in 0..3 {
        from_a.push(
            h.services
                .ledger
                .send(&a, conversation.id, MessagePayload::text(format!("from a {i}")), None)
                .await
                .unwrap(),
        );
    }

    assert_eq!(
        h.services
            .unread
            .unread_count(&conversation, a.user_id)
            .await
            .unwrap(),
        5
    );
    // B has not opened A's messages yet
    assert_eq!(
        h.services
            .unread
            .unread_count(&conversation, b.user_id)
            .await
            .unwrap(),
        3
    );

    for message in &from_a {
        h.services.ledger.mark_read(&b, message.id).await.unwrap();
    }

    assert_eq!(
        h.services
            .unread
            .unread_count(&conversation, b.user_id)
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        h.services
            .unread
            .unread_count(&conversation, a.user_id)
            .await
            .unwrap(),
        5
    );
}

#[tokio::test]
async fn test_reading_and_deleting_affect_count_differently() {
    let h = Harness::new();
    let a = student();
    let b = student();
    let conversation = h
        .services
        .directory
        .open_with(&a, b.user_id)
        .await
        .unwrap();

    let mut sent = Vec::new();
    for i in 0..3 {
        sent.push(
            h.services
                .ledger
                .send(&b, conversation.id, MessagePayload::text(format!("{i}")), None)
                .await
                .unwrap(),
        );
    }

    h.services.ledger.mark_read(&a, sent[0].id).await.unwrap();
    // Delivery alone does not clear unread
    h.services.ledger.mark_delivered(&a, sent[1].id).await.unwrap();
    // Deleted but unread messages still count
    h.services.ledger.delete(&b, sent[2].id).await.unwrap();

    let count = h
        .services
        .unread
        .unread_count_for(&a, conversation.id)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_unread_count_requires_membership() {
    let h = Harness::new();
    let a = student();
    let b = student();
    let conversation = h
        .services
        .directory
        .open_with(&a, b.user_id)
        .await
        .unwrap();

    let err = h
        .services
        .unread
        .unread_count_for(&teacher(), conversation.id)
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Forbidden);
}

#[tokio::test]
async fn test_summary_covers_every_conversation() {
    let h = Harness::new();
    let a = student();
    let peers: Vec<_> = (0..4).map(|_| teacher()).collect();

    for (i, peer) in peers.iter().enumerate() {
        let conversation = h
            .services
            .directory
            .open_with(&a, peer.user_id)
            .await
            .unwrap();
        for _ in 0..i {
            h.services
                .ledger
                .send(peer, conversation.id, MessagePayload::text("hello"), None)
                .await
                .unwrap();
        }
    }

    let summary = h.services.unread.unread_summary(&a).await.unwrap();
    assert_eq!(summary.len(), 4);
    let mut counts: Vec<i64> = summary.iter().map(|s| s.unread_count).collect();
    counts.sort();
    assert_eq!(counts, vec![0, 1, 2, 3]);
}
