// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn manager(dir: &TempDir) -> ConversationManager {
    ConversationManager::new(ConversationStore::new(dir.path().join("conversations.json")))
}

fn dest(r: &str) -> Destination {
    Destination::new("tg1", r)
}

#[test]
fn get_or_create_is_lazy_and_stable() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);

    let created = manager.get_or_create(&dest("u1"));
    assert!(created.agent_id.is_none());
    assert_eq!(manager.total_count(), 1);

    let again = manager.get_or_create(&dest("u1"));
    assert_eq!(again.created_at, created.created_at);
    assert_eq!(manager.total_count(), 1);
}

#[test]
fn bind_maintains_bijection() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let a1 = AgentSessionId::new("a1");

    manager.bind(&dest("u1"), &a1);

    let by_dest = manager.get_by_destination(&dest("u1")).unwrap();
    assert_eq!(by_dest.agent_id.as_ref(), Some(&a1));
    let by_agent = manager.get_by_agent(&a1).unwrap();
    assert_eq!(by_agent.destination, dest("u1"));
}

#[test]
fn rebinding_replaces_and_unindexes_prior_agent() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let a1 = AgentSessionId::new("a1");
    let a2 = AgentSessionId::new("a2");

    manager.bind(&dest("u1"), &a1);
    manager.bind(&dest("u1"), &a2);

    assert!(manager.get_by_agent(&a1).is_none());
    assert_eq!(
        manager.get_by_agent(&a2).unwrap().destination,
        dest("u1")
    );
    assert_eq!(manager.total_count(), 1);
    assert_eq!(manager.active_count(), 1);
}

#[test]
fn binding_same_agent_to_new_destination_moves_it() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let a1 = AgentSessionId::new("a1");

    manager.bind(&dest("u1"), &a1);
    manager.bind(&dest("u2"), &a1);

    assert_eq!(manager.get_by_agent(&a1).unwrap().destination, dest("u2"));
    assert!(manager
        .get_by_destination(&dest("u1"))
        .unwrap()
        .agent_id
        .is_none());
    assert_eq!(manager.active_count(), 1);
}

#[test]
fn unbind_preserves_row_and_decrements_active() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let a1 = AgentSessionId::new("a1");

    manager.bind(&dest("u1"), &a1);
    assert_eq!((manager.total_count(), manager.active_count()), (1, 1));

    manager.unbind(&dest("u1"));
    assert_eq!((manager.total_count(), manager.active_count()), (1, 0));
    assert!(manager
        .get_by_destination(&dest("u1"))
        .unwrap()
        .agent_id
        .is_none());
    assert!(manager.get_by_agent(&a1).is_none());

    // Unbinding again is a no-op
    manager.unbind(&dest("u1"));
    assert_eq!(manager.total_count(), 1);
}

#[test]
fn list_filters_and_combine() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    manager.bind(&Destination::new("tg1", "u1"), &AgentSessionId::new("a1"));
    manager.get_or_create(&Destination::new("tg1", "u2"));
    manager.bind(&Destination::new("sl1", "u3"), &AgentSessionId::new("a2"));

    assert_eq!(manager.list(&ConversationFilter::default()).len(), 3);
    assert_eq!(
        manager
            .list(&ConversationFilter {
                channel_id: Some("tg1".to_string()),
                has_agent: None,
            })
            .len(),
        2
    );
    assert_eq!(
        manager
            .list(&ConversationFilter {
                channel_id: None,
                has_agent: Some(true),
            })
            .len(),
        2
    );
    let both = manager.list(&ConversationFilter {
        channel_id: Some("tg1".to_string()),
        has_agent: Some(true),
    });
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].destination, Destination::new("tg1", "u1"));
}

#[test]
fn snapshot_restore_roundtrips_and_rebuilds_reverse_index() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let a1 = AgentSessionId::new("a1");
    manager.bind(&dest("u1"), &a1);
    manager.get_or_create(&dest("u2"));

    let snapshot = manager.snapshot();

    let other = self::manager(&dir);
    other.restore(snapshot.clone());
    assert_eq!(other.snapshot(), snapshot);
    assert_eq!(other.get_by_agent(&a1).unwrap().destination, dest("u1"));
}

#[test]
fn start_stop_persists_through_store() {
    let dir = TempDir::new().unwrap();
    let a1 = AgentSessionId::new("a1");
    {
        let manager = manager(&dir);
        manager.start();
        manager.bind(&dest("u1"), &a1);
        manager.stop().unwrap();
        assert_eq!(manager.total_count(), 0, "stop clears in-memory state");
    }

    let manager = manager(&dir);
    manager.start();
    assert_eq!(manager.total_count(), 1);
    assert_eq!(manager.get_by_agent(&a1).unwrap().destination, dest("u1"));
}
