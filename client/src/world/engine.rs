use std::{
    cell::RefCell,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Weak,
    },
};

use parking_lot::ReentrantMutex;

use strata_shared::{
    Clock, EnvelopeError, ErrorCode, LogLevel, LogSink, ObjectMessage, ObjectPatch, PushEvent,
    ReplicatedValue, Vector3, Vector4, WireValue,
};

use crate::{
    connection::{error::ChainError, session_connection::SessionHandle},
    events::event_source::EventSource,
    world::{
        component::{Component, ComponentId, ComponentKind, PropertyKey},
        config::{ReplicationConfig, ReplicationMode},
        delta::{ComponentUpdate, EntityDelta},
        entity::{EntityId, EntityProperty, EntityTransform, EntityType, LockType, ReplicatedEntity},
        entity_table::{EntityTable, IncomingChange},
        error::EntityError,
        patch_sink::{PatchSink, ScopedObjectsPage},
    },
};

/// Client id used for entities created while offline
const OFFLINE_CLIENT_ID: u64 = 0;

pub type EntityCreatedCallback = Box<dyn FnOnce(Result<EntityId, EntityError>) + Send>;
pub type DestroyCallback = Box<dyn FnOnce(Result<(), EntityError>) + Send>;
/// Receives the number of entities retrieved
pub type FetchCompleteCallback = Box<dyn FnOnce(Result<u64, EntityError>) + Send>;

enum Backend {
    Offline,
    Online(Arc<dyn PatchSink>),
}

struct EngineShared {
    table: ReentrantMutex<RefCell<EntityTable>>,
    backend: Backend,
    config: ReplicationConfig,
    rate_limit_enabled: AtomicBool,
    clock: Arc<dyn Clock>,
    log: Arc<dyn LogSink>,
    next_local_id: AtomicU64,
}

impl EngineShared {
    /// Runs `f` against the entity table for reading. Reads may nest.
    fn read_table<R>(&self, f: impl FnOnce(&EntityTable) -> R) -> R {
        let guard = self.table.lock();
        let table = guard.borrow();
        f(&table)
    }

    /// Runs `f` against the entity table for writing. `f` must not call back
    /// into the engine.
    fn with_table<R>(&self, f: impl FnOnce(&mut EntityTable) -> R) -> R {
        let guard = self.table.lock();
        let mut table = guard.borrow_mut();
        f(&mut table)
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.log.log(level, message);
    }

    fn receive(&self, change: IncomingChange) {
        self.with_table(|table| table.push_incoming(change));
    }

    /// Applies a delta the relay acknowledged
    fn apply_acknowledged(&self, entity_id: EntityId, delta: &EntityDelta) {
        if let Err(error) = self.with_table(|table| table.apply_delta(entity_id, delta)) {
            self.log(
                LogLevel::Verbose,
                &format!("Acknowledged patch for entity {} not applied: {}", entity_id, error),
            );
        }
    }

    /// Applies the changes received from other clients since the last tick.
    /// A remote entity whose parent link would form a cycle is moved to the
    /// root.
    fn apply_incoming(&self) {
        let errors = self.with_table(|table| {
            let mut errors = Vec::new();
            for change in table.take_incoming() {
                match change {
                    IncomingChange::Create(message) => {
                        let inserted = ReplicatedEntity::from_object_message(&message)
                            .and_then(|mut entity| {
                                if let Err(error) =
                                    table.validate_new_parent(entity.id(), entity.parent_id())
                                {
                                    errors.push(format!("{}, moved to the root.", error));
                                    entity.set_parent_id(None);
                                }
                                table.insert(entity)
                            });
                        if let Err(error) = inserted {
                            errors.push(format!(
                                "Failed to add remote entity {}: {}",
                                message.id, error
                            ));
                        }
                    }
                    IncomingChange::Patch(patch) => {
                        if let Err(error) = table.apply_patch(&patch) {
                            errors.push(format!(
                                "Failed to apply patch for entity {}: {}",
                                patch.id, error
                            ));
                        }
                    }
                }
            }
            errors
        });

        for error in errors {
            self.log(LogLevel::Error, &error);
        }
    }
}

/// Keeps the local entity graph in sync with the rest of the space.
///
/// Setters stage changes per entity. `queue_entity_update` marks an entity for
/// sending and `process_pending_entity_operations` (the tick) sends queued
/// patches, subject to the per-entity patch rate, and applies changes
/// received from other clients.
///
/// Offline, staged changes apply immediately and nothing is sent. Online,
/// they apply once the relay acknowledges the patch, unless self-messaging is
/// on, in which case the echoed patch applies them.
pub struct EntityReplicationEngine {
    shared: Arc<EngineShared>,
}

impl EntityReplicationEngine {
    /// Engine that never touches the network
    pub fn offline(config: ReplicationConfig, clock: Arc<dyn Clock>, log: Arc<dyn LogSink>) -> Self {
        Self::build(Backend::Offline, config, clock, log)
    }

    /// Engine replicating through a connected session
    pub fn online(
        session: &SessionHandle,
        config: ReplicationConfig,
        clock: Arc<dyn Clock>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self::with_sink(Arc::new(session.clone()), session, config, clock, log)
    }

    /// Engine replicating through `sink`, receiving remote changes from `source`
    pub fn with_sink(
        sink: Arc<dyn PatchSink>,
        source: &dyn EventSource,
        config: ReplicationConfig,
        clock: Arc<dyn Clock>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let engine = Self::build(Backend::Online(sink), config, clock, log);
        engine.subscribe(source);
        engine
    }

    fn build(
        backend: Backend,
        config: ReplicationConfig,
        clock: Arc<dyn Clock>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                table: ReentrantMutex::new(RefCell::new(EntityTable::default())),
                backend,
                rate_limit_enabled: AtomicBool::new(config.entity_patch_rate_limit_enabled),
                config,
                clock,
                log,
                next_local_id: AtomicU64::new(0),
            }),
        }
    }

    fn subscribe(&self, source: &dyn EventSource) {
        let weak = Arc::downgrade(&self.shared);
        source.listen(
            PushEvent::OnObjectMessage,
            Arc::new(move |payload| {
                with_engine(&weak, |shared| on_object_message(shared, &payload))
            }),
        );

        let weak = Arc::downgrade(&self.shared);
        source.listen(
            PushEvent::OnObjectPatch,
            Arc::new(move |payload| {
                with_engine(&weak, |shared| on_object_patch(shared, &payload))
            }),
        );

        let weak = Arc::downgrade(&self.shared);
        source.listen(
            PushEvent::OnRequestToSendObject,
            Arc::new(move |payload| {
                with_engine(&weak, |shared| on_request_to_send_object(shared, &payload))
            }),
        );
    }

    pub fn mode(&self) -> ReplicationMode {
        match self.shared.backend {
            Backend::Offline => ReplicationMode::Offline,
            Backend::Online(_) => ReplicationMode::Online,
        }
    }

    // Creation and destruction

    /// Creates an object entity. Online, the id is generated by the relay and
    /// the entity is inserted once the relay accepted it.
    pub fn create_entity(
        &self,
        name: &str,
        transform: EntityTransform,
        parent_id: Option<EntityId>,
        callback: EntityCreatedCallback,
    ) {
        self.create(EntityType::Object, name, transform, parent_id, callback);
    }

    /// Creates an avatar entity at the root of the hierarchy
    pub fn create_avatar(&self, name: &str, transform: EntityTransform, callback: EntityCreatedCallback) {
        self.create(EntityType::Avatar, name, transform, None, callback);
    }

    fn create(
        &self,
        entity_type: EntityType,
        name: &str,
        transform: EntityTransform,
        parent_id: Option<EntityId>,
        callback: EntityCreatedCallback,
    ) {
        if let Some(parent_id) = parent_id {
            if !self.shared.read_table(|table| table.contains(parent_id)) {
                callback(Err(EntityError::EntityNotFound {
                    entity_id: parent_id,
                }));
                return;
            }
        }

        let sink = match &self.shared.backend {
            Backend::Offline => {
                let entity_id = self.shared.next_local_id.fetch_add(1, Ordering::Relaxed);
                let entity = ReplicatedEntity::new(
                    entity_id,
                    entity_type,
                    name,
                    transform,
                    OFFLINE_CLIENT_ID,
                    parent_id,
                );
                let result = self.shared.with_table(|table| table.insert(entity));
                callback(result.map(|()| entity_id));
                return;
            }
            Backend::Online(sink) => sink.clone(),
        };

        let shared = self.shared.clone();
        let name = name.to_string();
        let message_sink = sink.clone();
        sink.generate_object_ids(
            1,
            Box::new(move |result| {
                let entity_id = match result.and_then(|ids| first_id(&ids)) {
                    Ok(entity_id) => entity_id,
                    Err(error) => {
                        callback(Err(replication_error(&shared, error)));
                        return;
                    }
                };

                let owner_id = message_sink.client_id().unwrap_or(OFFLINE_CLIENT_ID);
                let entity =
                    ReplicatedEntity::new(entity_id, entity_type, &name, transform, owner_id, parent_id);
                let message = match entity.to_object_message() {
                    Ok(message) => message,
                    Err(error) => {
                        callback(Err(error));
                        return;
                    }
                };

                message_sink.send_object_message(
                    message,
                    Box::new(move |result| match result {
                        Ok(()) => {
                            let inserted = shared.with_table(|table| table.insert(entity));
                            if let Err(error) = &inserted {
                                shared.log(LogLevel::Error, &error.to_string());
                            }
                            callback(inserted.map(|()| entity_id));
                        }
                        Err(error) => callback(Err(replication_error(&shared, error))),
                    }),
                );
            }),
        );
    }

    /// Destroys an entity, re-rooting its direct children. The entity is
    /// removed locally straight away.
    pub fn destroy_entity(&self, entity_id: EntityId, callback: DestroyCallback) {
        let removal = self.shared.with_table(|table| {
            let children = table.children(entity_id);
            let patches: Vec<ObjectPatch> = children
                .iter()
                .filter_map(|child_id| table.get(*child_id))
                .map(|child| ObjectPatch::reparent(child.id(), child.owner_id(), None))
                .collect();
            table
                .remove(entity_id)
                .map(|entity| (ObjectPatch::destroy(entity_id, entity.owner_id()), patches))
        });

        let Some((destroy, mut patches)) = removal else {
            callback(Err(EntityError::EntityNotFound { entity_id }));
            return;
        };

        let sink = match &self.shared.backend {
            Backend::Offline => {
                callback(Ok(()));
                return;
            }
            Backend::Online(sink) => sink.clone(),
        };

        patches.insert(0, destroy);
        let shared = self.shared.clone();
        sink.send_object_patches(
            patches,
            Box::new(move |result| {
                callback(result.map_err(|error| replication_error(&shared, error)))
            }),
        );
    }

    /// Forgets every entity without telling the relay, as when leaving a space
    pub fn local_destroy_all_entities(&self) {
        self.shared.with_table(EntityTable::clear);
    }

    // Setters

    pub fn set_name(&self, entity_id: EntityId, name: &str) -> Result<(), EntityError> {
        self.set_property(entity_id, EntityProperty::Name, name.into())
    }

    pub fn set_position(&self, entity_id: EntityId, position: Vector3) -> Result<(), EntityError> {
        self.set_property(entity_id, EntityProperty::Position, position.into())
    }

    pub fn set_rotation(&self, entity_id: EntityId, rotation: Vector4) -> Result<(), EntityError> {
        self.set_property(entity_id, EntityProperty::Rotation, rotation.into())
    }

    pub fn set_scale(&self, entity_id: EntityId, scale: Vector3) -> Result<(), EntityError> {
        self.set_property(entity_id, EntityProperty::Scale, scale.into())
    }

    pub fn set_third_party_ref(&self, entity_id: EntityId, third_party_ref: &str) -> Result<(), EntityError> {
        self.set_property(entity_id, EntityProperty::ThirdPartyRef, third_party_ref.into())
    }

    fn set_property(
        &self,
        entity_id: EntityId,
        property: EntityProperty,
        value: ReplicatedValue,
    ) -> Result<(), EntityError> {
        self.stage(entity_id, |_, delta| {
            delta.set_property(property, value);
            Ok(())
        })
    }

    pub fn lock(&self, entity_id: EntityId) -> Result<(), EntityError> {
        self.set_lock(entity_id, LockType::UserAgnostic)
    }

    pub fn unlock(&self, entity_id: EntityId) -> Result<(), EntityError> {
        self.set_lock(entity_id, LockType::None)
    }

    fn set_lock(&self, entity_id: EntityId, lock_type: LockType) -> Result<(), EntityError> {
        let result = self.stage(entity_id, |entity, delta| {
            let current = delta.staged_lock().unwrap_or(entity.lock_type());
            match (current, lock_type) {
                (LockType::UserAgnostic, LockType::UserAgnostic) => {
                    Err(EntityError::AlreadyLocked { entity_id })
                }
                (LockType::None, LockType::None) => Err(EntityError::NotLocked { entity_id }),
                _ => {
                    delta.set_property(
                        EntityProperty::LockType,
                        ReplicatedValue::Integer(lock_type.wire_id()),
                    );
                    Ok(())
                }
            }
        });

        match &result {
            Err(EntityError::AlreadyLocked { .. }) => {
                self.shared.log(LogLevel::Error, "Entity is already locked.")
            }
            Err(EntityError::NotLocked { .. }) => {
                self.shared.log(LogLevel::Error, "Entity is not currently locked.")
            }
            _ => {}
        }
        result
    }

    /// Adds a component of `kind` and returns its id. Only one `ScriptData`
    /// component is allowed; asking for a second returns the existing one.
    pub fn add_component(&self, entity_id: EntityId, kind: ComponentKind) -> Result<ComponentId, EntityError> {
        let mut existing = None;
        let result = self.stage(entity_id, |entity, delta| {
            ensure_modifiable(entity, delta, "add component")?;

            if !kind.allows_multiple() {
                let found = entity
                    .components()
                    .values()
                    .filter(|component| {
                        !matches!(delta.component(component.id()), Some(ComponentUpdate::Delete))
                    })
                    .chain(delta.staged_components())
                    .find(|component| component.kind() == kind)
                    .map(Component::id);
                if let Some(component_id) = found {
                    existing = Some(component_id);
                    return Ok(component_id);
                }
            }

            let component_id = entity.allocate_component_id()?;
            delta.upsert_component(Component::new(component_id, kind));
            Ok(component_id)
        });

        match &result {
            Err(EntityError::EntityLocked { .. }) => self.shared.log(
                LogLevel::Error,
                "Entity is locked. New components can not be added to a locked Entity.",
            ),
            Err(error @ EntityError::ComponentIdsExhausted { .. }) => {
                self.shared.log(LogLevel::Error, &error.to_string())
            }
            Ok(component_id) if existing.is_some() => self.shared.log(
                LogLevel::Warning,
                &format!(
                    "Entity {} already has a {:?} component ({}), only one is allowed.",
                    entity_id, kind, component_id
                ),
            ),
            _ => {}
        }
        result
    }

    pub fn remove_component(&self, entity_id: EntityId, component_id: ComponentId) -> Result<(), EntityError> {
        let result = self.stage(entity_id, |entity, delta| {
            ensure_modifiable(entity, delta, "remove component")?;

            let applied = entity.component(component_id).is_some();
            let staged = matches!(delta.component(component_id), Some(ComponentUpdate::Upsert(_)));
            if !applied && !staged {
                return Err(EntityError::ComponentNotFound {
                    entity_id,
                    component_id,
                });
            }
            delta.delete_component(component_id, applied);
            Ok(())
        });

        if let Err(EntityError::EntityLocked { .. }) = &result {
            self.shared.log(
                LogLevel::Error,
                "Entity is locked. Components can not be removed from a locked Entity.",
            );
        }
        result
    }

    pub fn set_component_property(
        &self,
        entity_id: EntityId,
        component_id: ComponentId,
        key: PropertyKey,
        value: ReplicatedValue,
    ) -> Result<(), EntityError> {
        self.stage(entity_id, |entity, delta| {
            let mut component = match delta.component(component_id) {
                Some(ComponentUpdate::Upsert(component)) => component.clone(),
                Some(ComponentUpdate::Delete) => {
                    return Err(EntityError::ComponentNotFound {
                        entity_id,
                        component_id,
                    })
                }
                None => entity
                    .component(component_id)
                    .cloned()
                    .ok_or(EntityError::ComponentNotFound {
                        entity_id,
                        component_id,
                    })?,
            };
            component.set_property(key, value);
            delta.upsert_component(component);
            Ok(())
        })
    }

    /// Reparents an entity; `None` moves it to the root. Rejects missing
    /// parents and changes that would create a cycle.
    pub fn set_parent(&self, entity_id: EntityId, parent_id: Option<EntityId>) -> Result<(), EntityError> {
        self.shared
            .read_table(|table| table.validate_parent(entity_id, parent_id))?;
        self.stage(entity_id, |_, delta| {
            delta.set_parent(parent_id);
            Ok(())
        })
    }

    pub fn remove_parent(&self, entity_id: EntityId) -> Result<(), EntityError> {
        self.set_parent(entity_id, None)
    }

    /// Records a change in the entity's staged delta. Offline, the delta is
    /// applied straight away.
    fn stage<R>(
        &self,
        entity_id: EntityId,
        change: impl FnOnce(&mut ReplicatedEntity, &mut EntityDelta) -> Result<R, EntityError>,
    ) -> Result<R, EntityError> {
        let offline = matches!(self.shared.backend, Backend::Offline);
        self.shared.with_table(|table| {
            let (entity, delta) = table.entity_and_delta_mut(entity_id)?;
            let output = change(entity, delta)?;
            if offline {
                if let Some(delta) = table.take_delta(entity_id) {
                    table.apply_delta(entity_id, &delta)?;
                }
            }
            Ok(output)
        })
    }

    // Replication

    /// Marks an entity's staged changes for sending on the next tick. An
    /// entity without staged changes is skipped.
    pub fn queue_entity_update(&self, entity_id: EntityId) -> Result<(), EntityError> {
        let queued = self.shared.with_table(|table| -> Result<bool, EntityError> {
            table.try_get(entity_id)?;
            if !table.has_pending_changes(entity_id) {
                return Ok(false);
            }
            table.queue(entity_id);
            Ok(true)
        })?;

        if !queued && self.mode() == ReplicationMode::Online {
            self.shared.log(
                LogLevel::VeryVerbose,
                &format!("Entity {} has no pending changes, skipping update.", entity_id),
            );
        }
        Ok(())
    }

    /// The tick: applies changes received from other clients, then sends
    /// every queued entity whose patch rate allows it. Rate-limited entities
    /// stay queued.
    pub fn process_pending_entity_operations(&self) {
        tick(&self.shared);
    }

    /// Pages through every entity other clients have in this client's scopes,
    /// queues them, ticks once so they are in the graph, then reports how many
    /// were retrieved. Offline there is nothing to retrieve.
    pub fn retrieve_all_entities(&self, callback: FetchCompleteCallback) {
        match &self.shared.backend {
            Backend::Offline => callback(Ok(0)),
            Backend::Online(sink) => fetch_page(self.shared.clone(), sink.clone(), 0, callback),
        }
    }

    pub fn set_entity_patch_rate_limit_enabled(&self, enabled: bool) {
        self.shared
            .rate_limit_enabled
            .store(enabled, Ordering::Relaxed);
    }

    pub fn is_entity_patch_rate_limit_enabled(&self) -> bool {
        self.shared.rate_limit_enabled.load(Ordering::Relaxed)
    }

    // Queries

    pub fn entity_count(&self) -> usize {
        self.shared.read_table(|table| table.len())
    }

    pub fn find_entity_by_id(&self, entity_id: EntityId) -> Option<ReplicatedEntity> {
        self.shared.read_table(|table| table.get(entity_id).cloned())
    }

    /// Runs `f` against an entity. The table is released before `f` runs, so
    /// `f` may call back into the engine.
    pub fn with_entity<R>(&self, entity_id: EntityId, f: impl FnOnce(&ReplicatedEntity) -> R) -> Option<R> {
        self.find_entity_by_id(entity_id).map(|entity| f(&entity))
    }

    pub fn find_entity(&self, name: &str) -> Option<EntityId> {
        self.shared.read_table(|table| table.find_by_name(name))
    }

    pub fn root_hierarchy_entities(&self) -> Vec<EntityId> {
        self.shared.read_table(|table| table.roots())
    }

    pub fn children(&self, entity_id: EntityId) -> Vec<EntityId> {
        self.shared.read_table(|table| table.children(entity_id))
    }

    pub fn parent(&self, entity_id: EntityId) -> Option<EntityId> {
        self.shared.read_table(|table| table.resolved_parent(entity_id))
    }

    /// Whether the entity has staged changes that have not been applied
    pub fn has_pending_update(&self, entity_id: EntityId) -> bool {
        self.shared
            .read_table(|table| table.has_pending_changes(entity_id) || table.is_queued(entity_id))
    }

    /// Remote changes waiting for the next tick
    pub fn pending_incoming_count(&self) -> usize {
        self.shared.read_table(|table| table.incoming_len())
    }

    pub fn global_position(&self, entity_id: EntityId) -> Option<Vector3> {
        self.global_transform(entity_id)
            .map(|transform| transform.position)
    }

    pub fn global_rotation(&self, entity_id: EntityId) -> Option<Vector4> {
        self.global_transform(entity_id)
            .map(|transform| transform.rotation)
    }

    pub fn global_scale(&self, entity_id: EntityId) -> Option<Vector3> {
        self.global_transform(entity_id)
            .map(|transform| transform.scale)
    }

    pub fn global_transform(&self, entity_id: EntityId) -> Option<EntityTransform> {
        self.shared
            .read_table(|table| table.global_transform(entity_id))
    }
}

fn with_engine(weak: &Weak<EngineShared>, f: impl FnOnce(&EngineShared)) {
    if let Some(shared) = weak.upgrade() {
        f(&shared);
    }
}

fn tick(shared: &Arc<EngineShared>) {
    shared.apply_incoming();

    let Backend::Online(sink) = &shared.backend else {
        return;
    };

    let now = shared.clock.now();
    let rate_limited = shared.rate_limit_enabled.load(Ordering::Relaxed);
    let rate = shared.config.entity_patch_rate;
    let (outgoing, failures) = shared.with_table(|table| {
        let mut outgoing = Vec::new();
        let mut failures = Vec::new();
        for entity_id in table.queued() {
            if rate_limited {
                if let Some(last) = table.last_patch(entity_id) {
                    if now.duration_since(&last) < rate {
                        continue;
                    }
                }
            }

            table.dequeue(entity_id);
            let Some(owner_id) = table.get(entity_id).map(ReplicatedEntity::owner_id) else {
                continue;
            };
            let Some(delta) = table.take_delta(entity_id) else {
                continue;
            };
            match delta.to_object_patch(entity_id, owner_id) {
                Ok(patch) => {
                    table.record_patch(entity_id, now);
                    outgoing.push((entity_id, delta, patch));
                }
                Err(error) => failures.push((entity_id, error)),
            }
        }
        (outgoing, failures)
    });

    for (entity_id, error) in failures {
        shared.log(
            LogLevel::Error,
            &format!("Failed to build patch for entity {}: {}", entity_id, error),
        );
    }

    for (entity_id, delta, patch) in outgoing {
        let acknowledged = shared.clone();
        let ack_sink = sink.clone();
        sink.send_object_patches(
            vec![patch],
            Box::new(move |result| match result {
                Ok(()) => {
                    if !ack_sink.allow_self_messaging() {
                        acknowledged.apply_acknowledged(entity_id, &delta);
                    }
                }
                Err(error) => acknowledged.log(
                    LogLevel::Error,
                    &format!("Failed to send patch for entity {}: {}", entity_id, error),
                ),
            }),
        );
    }
}

/// Requests the page starting at `skip`, queueing its entities, until the
/// relay's total is reached or a page comes back empty
fn fetch_page(
    shared: Arc<EngineShared>,
    sink: Arc<dyn PatchSink>,
    skip: u64,
    callback: FetchCompleteCallback,
) {
    let limit = shared.config.entity_page_limit;
    let next_sink = sink.clone();
    sink.page_scoped_objects(
        skip,
        limit,
        Box::new(move |result| {
            let ScopedObjectsPage {
                objects,
                total_count,
            } = match result {
                Ok(page) => page,
                Err(error) => {
                    callback(Err(replication_error(&shared, error)));
                    return;
                }
            };

            let exhausted = objects.is_empty();
            let retrieved = skip + objects.len() as u64;
            for message in objects {
                shared.receive(IncomingChange::Create(message));
            }

            if retrieved < total_count && !exhausted {
                fetch_page(shared, next_sink, retrieved, callback);
            } else {
                tick(&shared);
                callback(Ok(retrieved));
            }
        }),
    );
}

fn on_object_message(shared: &EngineShared, payload: &WireValue) {
    match payload
        .try_element(0)
        .map_err(EnvelopeError::from)
        .and_then(ObjectMessage::try_from_wire)
    {
        Ok(message) => shared.receive(IncomingChange::Create(message)),
        Err(error) => shared.log(
            LogLevel::Error,
            &format!("Received malformed object message: {}", error),
        ),
    }
}

fn on_object_patch(shared: &EngineShared, payload: &WireValue) {
    match payload
        .try_element(0)
        .map_err(EnvelopeError::from)
        .and_then(ObjectPatch::try_from_wire)
    {
        Ok(patch) => shared.receive(IncomingChange::Patch(patch)),
        Err(error) => shared.log(
            LogLevel::Error,
            &format!("Received malformed object patch: {}", error),
        ),
    }
}

/// The relay asks for an entity to be sent again. Unknown ids are reported
/// back as not found.
fn on_request_to_send_object(shared: &EngineShared, payload: &WireValue) {
    let Backend::Online(sink) = &shared.backend else {
        return;
    };
    let entity_id = match payload.try_element(0).and_then(WireValue::try_as_u64) {
        Ok(entity_id) => entity_id,
        Err(error) => {
            shared.log(
                LogLevel::Error,
                &format!("Received malformed object request: {}", error),
            );
            return;
        }
    };

    let log = shared.log.clone();
    let message = shared.read_table(|table| table.get(entity_id).map(ReplicatedEntity::to_object_message));
    match message {
        Some(Ok(message)) => sink.send_object_message(
            message,
            Box::new(move |result| {
                if let Err(error) = result {
                    log.log(
                        LogLevel::Error,
                        &format!("Failed to send server requested object. {}", error.message),
                    );
                }
            }),
        ),
        Some(Err(error)) => shared.log(
            LogLevel::Error,
            &format!("Failed to build object message for entity {}: {}", entity_id, error),
        ),
        None => sink.send_object_not_found(
            entity_id,
            Box::new(move |result| {
                if let Err(error) = result {
                    log.log(LogLevel::Error, &error.message);
                }
            }),
        ),
    }
}

/// An entity with a lock, unless an unlock is staged, cannot change its
/// components
fn ensure_modifiable(
    entity: &ReplicatedEntity,
    delta: &EntityDelta,
    action: &'static str,
) -> Result<(), EntityError> {
    if entity.is_locked() && delta.staged_lock() != Some(LockType::None) {
        return Err(EntityError::EntityLocked {
            entity_id: entity.id(),
            action,
        });
    }
    Ok(())
}

fn first_id(ids: &[u64]) -> Result<EntityId, ChainError> {
    ids.first().copied().ok_or_else(|| {
        ChainError::new(ErrorCode::Unknown, "GenerateObjectIds returned no ids.")
    })
}

fn replication_error(shared: &EngineShared, error: ChainError) -> EntityError {
    shared.log(LogLevel::Error, &error.message);
    EntityError::Replication {
        code: error.code,
        message: error.message,
    }
}
