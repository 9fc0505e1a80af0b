use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use strata_shared::{Clock, Instant, LogLevel, LogSink, RelayMethod, WireValue};

use crate::{connection::session_connection::SessionHandle, election::config::ElectionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LeaderRecord {
    client_id: u64,
    /// `None` until the first heartbeat, so a new leader heartbeats on the
    /// next update
    last_heartbeat: Option<Instant>,
}

impl LeaderRecord {
    fn new(client_id: u64) -> Self {
        Self {
            client_id,
            last_heartbeat: None,
        }
    }
}

/// Tracks which client leads each registered scope, and keeps the relay
/// informed while the local client is a leader.
///
/// A registered scope without a leader is being contested; a scope that is
/// not registered at all is unknown to this client.
pub struct ScopeLeaderElection {
    session: SessionHandle,
    clock: Arc<dyn Clock>,
    log: Arc<dyn LogSink>,
    config: ElectionConfig,
    scopes: Mutex<HashMap<String, Option<LeaderRecord>>>,
}

impl ScopeLeaderElection {
    pub fn new(
        session: &SessionHandle,
        config: ElectionConfig,
        clock: Arc<dyn Clock>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            session: session.clone(),
            clock,
            log,
            config,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Starts tracking a scope, replacing any previous entry for it
    pub fn register_scope(&self, scope_id: &str, leader_id: Option<u64>) {
        match leader_id {
            Some(leader_id) => self.log(
                LogLevel::Log,
                &format!(
                    "ScopeLeadershipManager::RegisterScope Called for scope {} with leader: {}.",
                    scope_id, leader_id
                ),
            ),
            None => self.log(
                LogLevel::Log,
                &format!(
                    "ScopeLeadershipManager::RegisterScope Called for scope {} with no leader.",
                    scope_id
                ),
            ),
        }

        let previous = self
            .scopes
            .lock()
            .insert(scope_id.to_string(), leader_id.map(LeaderRecord::new));

        let previous_leader = previous.flatten().map(|record| record.client_id);
        if let Some(previous_leader) = previous_leader {
            if Some(previous_leader) != leader_id {
                self.log(
                    LogLevel::Warning,
                    &format!(
                        "ScopeLeadershipManager::RegisterScope Scope {} was already registered with the leader: {}.",
                        scope_id, previous_leader
                    ),
                );
            }
        }
    }

    pub fn deregister_scope(&self, scope_id: &str) {
        self.scopes.lock().remove(scope_id);
    }

    pub fn is_registered(&self, scope_id: &str) -> bool {
        self.scopes.lock().contains_key(scope_id)
    }

    /// The relay elected `client_id` as leader of `scope_id`. The new leader
    /// replaces any existing one.
    pub fn on_elected_scope_leader(&self, scope_id: &str, client_id: u64) {
        let previous = {
            let mut scopes = self.scopes.lock();
            match scopes.get_mut(scope_id) {
                None => Err(()),
                Some(record) => Ok(record.replace(LeaderRecord::new(client_id))),
            }
        };

        let previous = match previous {
            Ok(previous) => previous,
            Err(()) => {
                self.log(
                    LogLevel::Error,
                    &format!(
                        "ScopeLeadershipManager::OnElectedScopeLeader Event called for scope: {} that isn't registered, for new leader: {}.",
                        scope_id, client_id
                    ),
                );
                return;
            }
        };

        if let Some(previous) = previous {
            self.log(
                LogLevel::Warning,
                &format!(
                    "ScopeLeadershipManager::OnElectedScopeLeader Event called for scope: {}, that already has the leader: {}, for new leader: {}.",
                    scope_id, previous.client_id, client_id
                ),
            );
        }
        self.log(
            LogLevel::Log,
            &format!(
                "ScopeLeadershipManager::OnElectedScopeLeader New leader: {}, for scope: {}.",
                client_id, scope_id
            ),
        );
    }

    /// The leader of `scope_id` stepped down; the scope is contested until
    /// the next election
    pub fn on_vacated_as_scope_leader(&self, scope_id: &str) {
        let vacated = {
            let mut scopes = self.scopes.lock();
            scopes.get_mut(scope_id).map(|record| record.take().is_some())
        };

        match vacated {
            None => self.log(
                LogLevel::Warning,
                &format!(
                    "ScopeLeadershipManager::OnVacatedAsScopeLeader Event called for scope: {} that isn't registered.",
                    scope_id
                ),
            ),
            Some(false) => self.log(
                LogLevel::Warning,
                &format!(
                    "ScopeLeadershipManager::OnVacatedAsScopeLeader Event called for the scope: {} that doesn't have a leader.",
                    scope_id
                ),
            ),
            Some(true) => self.log(
                LogLevel::Log,
                &format!(
                    "ScopeLeadershipManager::OnVacatedAsScopeLeader Event called for scope: {}.",
                    scope_id
                ),
            ),
        }
    }

    /// Call once per application tick. Sends a heartbeat for every scope the
    /// local client leads whose last heartbeat is at least one interval old.
    pub fn update(&self) {
        let Some(local_client_id) = self.session.client_id() else {
            return;
        };
        let now = self.clock.now();
        let interval = self.config.heartbeat_interval;

        let due: Vec<String> = {
            let mut scopes = self.scopes.lock();
            scopes
                .iter_mut()
                .filter_map(|(scope_id, record)| {
                    let record = record.as_mut()?;
                    if record.client_id != local_client_id {
                        return None;
                    }
                    let is_due = record
                        .last_heartbeat
                        .map_or(true, |last| now.duration_since(&last) >= interval);
                    if !is_due {
                        return None;
                    }
                    record.last_heartbeat = Some(now);
                    Some(scope_id.clone())
                })
                .collect()
        };

        for scope_id in due {
            self.send_leader_heartbeat(scope_id);
        }
    }

    fn send_leader_heartbeat(&self, scope_id: String) {
        let log = self.log.clone();
        self.session.invoke(
            RelayMethod::SendScopeLeaderHeartbeat,
            WireValue::Array(vec![WireValue::from(scope_id.as_str())]),
            Box::new(move |result| match result {
                Ok(_) => log.log(
                    LogLevel::VeryVerbose,
                    &format!(
                        "ScopeLeadershipManager::SendLeaderHeartbeat Heartbeat was successfully sent for scope: {}",
                        scope_id
                    ),
                ),
                Err(error) if error.is_recognized() => log.log(
                    LogLevel::Error,
                    &format!(
                        "ScopeLeadershipManager::SendLeaderHeartbeat Failed to send heartbeat for scope: {} with error: {}",
                        scope_id, error
                    ),
                ),
                Err(_) => log.log(
                    LogLevel::Error,
                    &format!(
                        "ScopeLeadershipManager::SendLeaderHeartbeat Failed to send heartbeat for scope: {} with an unknown error.",
                        scope_id
                    ),
                ),
            }),
        );
    }

    /// Leader of a registered scope. Asking about an unregistered scope is
    /// logged and answered with `None`.
    pub fn leader_client_id(&self, scope_id: &str) -> Option<u64> {
        let leader = self
            .scopes
            .lock()
            .get(scope_id)
            .map(|record| record.map(|record| record.client_id));

        match leader {
            Some(leader) => leader,
            None => {
                self.log(
                    LogLevel::Error,
                    &format!(
                        "ScopeLeadershipManager::GetLeaderClientId Event called for the scope: {} that isn't registered.",
                        scope_id
                    ),
                );
                None
            }
        }
    }

    pub fn is_local_client_leader(&self, scope_id: &str) -> bool {
        match (self.leader_client_id(scope_id), self.session.client_id()) {
            (Some(leader), Some(local)) => leader == local,
            _ => false,
        }
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.log.log(level, message);
    }
}
