//! Integration tests for the Room Actor.
//!
//! These tests drive the room through `spawn_room()` and the `RoomHandle`
//! interface, using in-memory duplex streams in place of client sockets.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

use std::time::Duration;

use parley_core::{ClientId, DisplayName, Presence};
use parleyd::room::{session_writer, spawn_room, RoomError, RoomEvent, SessionWriter};
use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};
use tokio::time::timeout;

// ============================================================================
// Test Helpers
// ============================================================================

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Creates a writer for the room and the client end that reads from it.
fn client_stream() -> (SessionWriter, BufReader<DuplexStream>) {
    let (client, server) = tokio::io::duplex(16 * 1024);
    (session_writer(server), BufReader::new(client))
}

async fn read_line(reader: &mut BufReader<DuplexStream>) -> String {
    let mut line = String::new();
    timeout(RECV_TIMEOUT, reader.read_line(&mut line))
        .await
        .expect("line within timeout")
        .expect("read line");
    line
}

fn name(s: &str) -> DisplayName {
    DisplayName::new(s)
}

// ============================================================================
// Roster Tests
// ============================================================================

#[tokio::test]
async fn test_distinct_names_all_join() {
    let room = spawn_room();
    let mut clients = Vec::new();

    for (i, n) in ["Alice", "Bob", "Carol", "Dave"].iter().enumerate() {
        let (writer, client) = client_stream();
        room.join(ClientId::new(i as u64), name(n), writer)
            .await
            .expect("distinct name should join");
        clients.push(client);
    }

    assert_eq!(room.member_count().await, 4);

    let names: Vec<String> = room
        .members()
        .await
        .into_iter()
        .map(|(_, n)| n.to_string())
        .collect();
    assert_eq!(names, vec!["Alice", "Bob", "Carol", "Dave"]);
}

#[tokio::test]
async fn test_concurrent_case_collision_admits_one() {
    let room = spawn_room();
    let (w1, _c1) = client_stream();
    let (w2, _c2) = client_stream();

    let (first, second) = tokio::join!(
        room.join(ClientId::new(1), name("Alice"), w1),
        room.join(ClientId::new(2), name("alice"), w2),
    );

    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);

    let failure = if first.is_err() { first } else { second };
    assert!(matches!(failure, Err(RoomError::NameTaken(_))));
    assert_eq!(room.member_count().await, 1);
}

#[tokio::test]
async fn test_leave_frees_name() {
    let room = spawn_room();
    let (w1, _c1) = client_stream();
    room.join(ClientId::new(1), name("Bob"), w1).await.unwrap();
    assert!(room.is_name_taken(name("BOB")).await);

    assert_eq!(room.leave(ClientId::new(1)).await, Some(name("Bob")));
    assert!(!room.is_name_taken(name("BOB")).await);

    // Second leave is a no-op
    assert_eq!(room.leave(ClientId::new(1)).await, None);

    let (w2, _c2) = client_stream();
    assert!(room.join(ClientId::new(2), name("bob"), w2).await.is_ok());
}

// ============================================================================
// Broadcast and History Tests
// ============================================================================

#[tokio::test]
async fn test_broadcast_is_identical_for_every_member() {
    let room = spawn_room();
    let mut readers = Vec::new();

    for (i, n) in ["Alice", "Bob", "Carol"].iter().enumerate() {
        let (writer, reader) = client_stream();
        room.join(ClientId::new(i as u64), name(n), writer)
            .await
            .unwrap();
        readers.push(reader);
    }

    let delivery = room
        .broadcast(name("Alice"), "hello".to_string())
        .await
        .unwrap();
    assert_eq!(delivery.delivered, 3);

    let expected = format!("{}\n", delivery.line);
    for reader in &mut readers {
        assert_eq!(read_line(reader).await, expected);
    }

    let history = room.history().await;
    assert_eq!(history, vec![delivery.line]);
}

#[tokio::test]
async fn test_replay_matches_history_exactly() {
    let room = spawn_room();
    let (w1, _c1) = client_stream();
    room.join(ClientId::new(1), name("Bob"), w1).await.unwrap();

    for i in 0..5 {
        room.broadcast(name("Bob"), format!("message {i}"))
            .await
            .unwrap();
    }
    room.announce(name("Bob"), Presence::Left, None)
        .await
        .unwrap();

    let (writer, mut reader) = client_stream();
    let replayed = room.replay_history(writer).await.unwrap();
    assert_eq!(replayed, 6);

    for line in room.history().await {
        assert_eq!(read_line(&mut reader).await, format!("{line}\n"));
    }
}

#[tokio::test]
async fn test_replay_of_empty_history() {
    let room = spawn_room();
    let (writer, _reader) = client_stream();
    assert_eq!(room.replay_history(writer).await.unwrap(), 0);
}

#[tokio::test]
async fn test_announce_excludes_joiner() {
    let room = spawn_room();
    let (w1, mut c1) = client_stream();
    let (w2, mut c2) = client_stream();
    room.join(ClientId::new(1), name("Alice"), w1).await.unwrap();
    room.join(ClientId::new(2), name("Bob"), w2).await.unwrap();

    room.announce(name("Bob"), Presence::Joined, Some(ClientId::new(2)))
        .await
        .unwrap();
    room.broadcast(name("Alice"), "hi Bob".to_string())
        .await
        .unwrap();

    assert_eq!(read_line(&mut c1).await, "Bob: has joined our chat...\n");
    // Bob's first line is the chat message, not his own announcement
    assert!(read_line(&mut c2).await.ends_with("][Alice]: hi Bob\n"));
}

// ============================================================================
// Event Tests
// ============================================================================

#[tokio::test]
async fn test_events_follow_lifecycle() {
    let room = spawn_room();
    let mut events = room.subscribe();

    let (w1, _c1) = client_stream();
    let (w2, _c2) = client_stream();
    room.join(ClientId::new(1), name("Bob"), w1).await.unwrap();
    let _ = room.join(ClientId::new(2), name("bob"), w2).await;
    room.broadcast(name("Bob"), "hey".to_string()).await.unwrap();
    room.leave(ClientId::new(1)).await;

    let mut next = || events.try_recv().expect("event should be queued");

    assert!(matches!(next(), RoomEvent::Joined { client_id, .. } if client_id == ClientId::new(1)));
    assert!(matches!(next(), RoomEvent::Rejected { client_id, .. } if client_id == ClientId::new(2)));
    assert!(matches!(next(), RoomEvent::Published { delivered: 1, .. }));
    assert!(matches!(next(), RoomEvent::Left { .. }));
}

#[tokio::test]
async fn test_handle_reports_connected() {
    let room = spawn_room();
    assert!(room.is_connected());
    assert!(room.clone().is_connected());
}
