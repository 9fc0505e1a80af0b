/// REGRESSION TEST: Children announced before their parent
///
/// Object messages from other clients arrive in any order. A child whose
/// parent is not known yet sits at the root, and is attached once the parent
/// arrives, whether in the same tick or a later one. A remote entity whose
/// parent link would close a loop is moved to the root instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use strata_client::shared::{LogLevel, ObjectMessage, PushEvent, ReplicatedValue};
use strata_client::{EntityProperty, EntityReplicationEngine, ReplicationConfig};
use strata_shared::encode_property_value;
use strata_test::{
    assert_logged, connected_session, object_message_payload, ManualClock, TestSession,
};

fn remote_object(id: u64, name: &str, parent_id: Option<u64>) -> ObjectMessage {
    let mut components = BTreeMap::new();
    components.insert(
        EntityProperty::Name.key(),
        encode_property_value(&ReplicatedValue::String(name.to_string())).unwrap(),
    );
    ObjectMessage {
        id,
        entity_type: 2,
        is_transferable: true,
        is_persistent: false,
        owner_id: 4,
        parent_id,
        components: Some(components),
    }
}

fn online_engine(test_session: &TestSession) -> EntityReplicationEngine {
    EntityReplicationEngine::online(
        &test_session.handle(),
        ReplicationConfig::default(),
        Arc::new(ManualClock::new()),
        test_session.log.clone(),
    )
}

/// Child and parent in one tick, child first
#[test]
fn child_before_parent_in_one_tick() {
    let test_session = connected_session(1);
    let engine = online_engine(&test_session);

    test_session.transport.push(
        PushEvent::OnObjectMessage,
        object_message_payload(&remote_object(21, "child", Some(20))),
    );
    test_session.transport.push(
        PushEvent::OnObjectMessage,
        object_message_payload(&remote_object(20, "parent", None)),
    );
    engine.process_pending_entity_operations();

    assert_eq!(engine.root_hierarchy_entities(), vec![20]);
    assert_eq!(engine.children(20), vec![21]);
    assert_eq!(engine.parent(21), Some(20));
}

/// The child is a root until its parent shows up a tick later
#[test]
fn child_waits_at_the_root_for_its_parent() {
    let test_session = connected_session(1);
    let engine = online_engine(&test_session);

    test_session.transport.push(
        PushEvent::OnObjectMessage,
        object_message_payload(&remote_object(31, "child", Some(30))),
    );
    engine.process_pending_entity_operations();

    assert_eq!(engine.root_hierarchy_entities(), vec![31]);
    assert_eq!(engine.parent(31), None);

    test_session.transport.push(
        PushEvent::OnObjectMessage,
        object_message_payload(&remote_object(30, "parent", None)),
    );
    engine.process_pending_entity_operations();

    assert_eq!(engine.root_hierarchy_entities(), vec![30]);
    assert_eq!(engine.children(30), vec![31]);
}

/// An entity naming itself as parent is kept, at the root
#[test]
fn own_parent_is_moved_to_the_root() {
    let test_session = connected_session(1);
    let engine = online_engine(&test_session);

    test_session.transport.push(
        PushEvent::OnObjectMessage,
        object_message_payload(&remote_object(5, "narcissus", Some(5))),
    );
    engine.process_pending_entity_operations();

    assert_eq!(engine.root_hierarchy_entities(), vec![5]);
    assert_eq!(engine.parent(5), None);
    assert!(engine.children(5).is_empty());
    assert!(engine.global_position(5).is_some());
    assert_logged!(
        test_session.log,
        LogLevel::Error,
        "Entity 5 cannot be parented to 5: an entity cannot be its own parent, moved to the root."
    );
}

/// Two entities naming each other as parent: the second to arrive becomes
/// the root and adopts the first
#[test]
fn mutual_parents_do_not_form_a_loop() {
    let test_session = connected_session(1);
    let engine = online_engine(&test_session);

    test_session.transport.push(
        PushEvent::OnObjectMessage,
        object_message_payload(&remote_object(10, "first", Some(11))),
    );
    test_session.transport.push(
        PushEvent::OnObjectMessage,
        object_message_payload(&remote_object(11, "second", Some(10))),
    );
    engine.process_pending_entity_operations();

    assert_eq!(engine.entity_count(), 2);
    assert_eq!(engine.root_hierarchy_entities(), vec![11]);
    assert_eq!(engine.children(11), vec![10]);
    assert_eq!(engine.parent(10), Some(11));
    assert_eq!(engine.parent(11), None);
    assert!(engine.global_position(10).is_some());
    assert_logged!(
        test_session.log,
        LogLevel::Error,
        "Entity 11 cannot be parented to 10: the parent is a descendant of the entity, moved to the root."
    );
}

/// The loop can also close through a longer chain of waiting children
#[test]
fn loop_through_a_waiting_chain_is_broken() {
    let test_session = connected_session(1);
    let engine = online_engine(&test_session);

    for (id, parent) in [(20, 22), (21, 20), (22, 21)] {
        test_session.transport.push(
            PushEvent::OnObjectMessage,
            object_message_payload(&remote_object(id, "link", Some(parent))),
        );
    }
    engine.process_pending_entity_operations();

    assert_eq!(engine.root_hierarchy_entities(), vec![22]);
    assert_eq!(engine.children(22), vec![20]);
    assert_eq!(engine.children(20), vec![21]);
    assert_eq!(engine.parent(22), None);
}
