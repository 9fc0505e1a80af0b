/// INTEGRATION TESTS: Scope leader election
///
/// Leadership bookkeeping per scope and the heartbeat a local leader sends
/// through the relay on every interval.

use std::sync::Arc;
use std::time::Duration;

use strata_client::shared::{LogLevel, RelayMethod, WireValue};
use strata_client::transport::TransportError;
use strata_client::{ElectionConfig, ScopeLeaderElection};
use strata_test::{assert_logged, connected_session, LocalTransport, ManualClock, TestSession};

struct ElectionFixture {
    test_session: TestSession,
    clock: Arc<ManualClock>,
    election: ScopeLeaderElection,
}

impl ElectionFixture {
    fn with_session(test_session: TestSession) -> Self {
        let clock = Arc::new(ManualClock::new());
        let election = ScopeLeaderElection::new(
            &test_session.handle(),
            ElectionConfig::default(),
            clock.clone(),
            test_session.log.clone(),
        );
        Self {
            test_session,
            clock,
            election,
        }
    }

    fn connected(client_id: u64) -> Self {
        Self::with_session(connected_session(client_id))
    }

    fn heartbeats(&self) -> Vec<WireValue> {
        self.test_session
            .transport
            .calls_to(RelayMethod::SendScopeLeaderHeartbeat)
    }
}

/// Client 7 leads S1: one heartbeat straight away, none until three seconds
/// have passed, then another
#[test]
fn leader_heartbeats_once_per_interval() {
    let fixture = ElectionFixture::connected(7);
    fixture.election.register_scope("S1", Some(7));

    fixture.election.update();
    assert_eq!(
        fixture.heartbeats(),
        vec![WireValue::Array(vec![WireValue::from("S1")])]
    );

    fixture.election.update();
    assert_eq!(fixture.heartbeats().len(), 1, "Heartbeat sent again too early");

    fixture.clock.advance(Duration::from_millis(2_999));
    fixture.election.update();
    assert_eq!(fixture.heartbeats().len(), 1);

    fixture.clock.advance(Duration::from_millis(1));
    fixture.election.update();
    assert_eq!(fixture.heartbeats().len(), 2);
    assert_logged!(
        fixture.test_session.log,
        LogLevel::VeryVerbose,
        "Heartbeat was successfully sent for scope: S1"
    );
}

#[test]
fn registering_again_replaces_the_leader() {
    let fixture = ElectionFixture::connected(1);

    fixture.election.register_scope("S1", Some(4));
    assert_eq!(fixture.election.leader_client_id("S1"), Some(4));

    fixture.election.register_scope("S1", None);
    assert!(fixture.election.is_registered("S1"));
    assert_eq!(fixture.election.leader_client_id("S1"), None);
    assert_logged!(
        fixture.test_session.log,
        LogLevel::Warning,
        "was already registered with the leader: 4"
    );
}

#[test]
fn scopes_led_by_others_stay_silent() {
    let fixture = ElectionFixture::connected(7);
    fixture.election.register_scope("S1", Some(8));
    fixture.election.register_scope("S2", None);

    fixture.election.update();
    fixture.clock.advance(Duration::from_secs(10));
    fixture.election.update();

    assert!(fixture.heartbeats().is_empty());
    assert!(!fixture.election.is_local_client_leader("S1"));
}

#[test]
fn unregistered_scope_has_no_leader() {
    let fixture = ElectionFixture::connected(7);

    assert_eq!(fixture.election.leader_client_id("Nowhere"), None);
    assert_logged!(
        fixture.test_session.log,
        LogLevel::Error,
        "GetLeaderClientId Event called for the scope: Nowhere that isn't registered."
    );
}

/// An election makes the local client heartbeat; vacating stops it
#[test]
fn elected_then_vacated() {
    let fixture = ElectionFixture::connected(7);
    fixture.election.register_scope("S1", None);

    fixture.election.on_elected_scope_leader("S1", 7);
    assert!(fixture.election.is_local_client_leader("S1"));
    fixture.election.update();
    assert_eq!(fixture.heartbeats().len(), 1);

    fixture.election.on_vacated_as_scope_leader("S1");
    assert_eq!(fixture.election.leader_client_id("S1"), None);
    fixture.clock.advance(Duration::from_secs(5));
    fixture.election.update();
    assert_eq!(fixture.heartbeats().len(), 1);

    fixture.election.on_vacated_as_scope_leader("S1");
    assert_logged!(
        fixture.test_session.log,
        LogLevel::Warning,
        "that doesn't have a leader"
    );
}

#[test]
fn election_replaces_an_existing_leader() {
    let fixture = ElectionFixture::connected(7);
    fixture.election.register_scope("S1", Some(3));

    fixture.election.on_elected_scope_leader("S1", 7);

    assert_eq!(fixture.election.leader_client_id("S1"), Some(7));
    assert_logged!(
        fixture.test_session.log,
        LogLevel::Warning,
        "that already has the leader: 3, for new leader: 7"
    );
}

#[test]
fn election_for_unregistered_scope_is_ignored() {
    let fixture = ElectionFixture::connected(7);

    fixture.election.on_elected_scope_leader("S9", 7);

    assert!(!fixture.election.is_registered("S9"));
    assert_logged!(
        fixture.test_session.log,
        LogLevel::Error,
        "OnElectedScopeLeader Event called for scope: S9 that isn't registered"
    );
    fixture.election.update();
    assert!(fixture.heartbeats().is_empty());
}

/// A described failure is logged with its text, an undescribed one generically
#[test]
fn heartbeat_failures_are_logged() {
    let fixture = ElectionFixture::connected(7);
    fixture
        .test_session
        .transport
        .fail_next(RelayMethod::SendScopeLeaderHeartbeat, "boom");
    fixture.test_session.transport.respond_with(
        RelayMethod::SendScopeLeaderHeartbeat,
        Err(TransportError::Unrecognized),
    );
    fixture.election.register_scope("S1", Some(7));

    fixture.election.update();
    assert_logged!(
        fixture.test_session.log,
        LogLevel::Error,
        "Failed to send heartbeat for scope: S1 with error: boom"
    );

    fixture.clock.advance(Duration::from_secs(3));
    fixture.election.update();
    assert_logged!(
        fixture.test_session.log,
        LogLevel::Error,
        "Failed to send heartbeat for scope: S1 with an unknown error."
    );
    assert_eq!(fixture.heartbeats().len(), 2);
}

#[test]
fn no_heartbeat_without_a_client_id() {
    let fixture = ElectionFixture::with_session(TestSession::new(LocalTransport::new()));
    fixture.election.register_scope("S1", Some(0));

    fixture.election.update();

    assert!(fixture.heartbeats().is_empty());
    assert!(!fixture.election.is_local_client_leader("S1"));
}

#[test]
fn deregistered_scope_is_forgotten() {
    let fixture = ElectionFixture::connected(7);
    fixture.election.register_scope("S1", Some(7));

    fixture.election.deregister_scope("S1");

    assert!(!fixture.election.is_registered("S1"));
    assert!(!fixture.election.is_local_client_leader("S1"));
    fixture.election.update();
    assert!(fixture.heartbeats().is_empty());
}
