use thiserror::Error;

use strata_shared::{EnvelopeError, ErrorCode, ReplicatedValueType};

use crate::world::{
    component::ComponentId,
    entity::{EntityId, EntityProperty},
};

/// Errors that can occur while mutating or replicating entities
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    /// No entity with this id is known locally
    #[error("Entity {entity_id} not found")]
    EntityNotFound { entity_id: EntityId },

    /// An entity with this id is already known locally
    #[error("Entity {entity_id} already exists")]
    EntityAlreadyExists { entity_id: EntityId },

    /// The entity has no component with this id
    #[error("Component {component_id} not found on entity {entity_id}")]
    ComponentNotFound {
        entity_id: EntityId,
        component_id: ComponentId,
    },

    /// The entity is locked and the action would change its components
    #[error("Entity {entity_id} is locked, cannot {action}")]
    EntityLocked {
        entity_id: EntityId,
        action: &'static str,
    },

    /// Every component id below the view property keys is taken
    #[error("Entity {entity_id} has no component ids left")]
    ComponentIdsExhausted { entity_id: EntityId },

    /// `lock` was called on an entity that is already locked
    #[error("Entity {entity_id} is already locked")]
    AlreadyLocked { entity_id: EntityId },

    /// `unlock` was called on an entity that is not locked
    #[error("Entity {entity_id} is not currently locked")]
    NotLocked { entity_id: EntityId },

    /// The requested parent would break the hierarchy
    #[error("Entity {entity_id} cannot be parented to {parent_id}: {reason}")]
    InvalidParent {
        entity_id: EntityId,
        parent_id: EntityId,
        reason: &'static str,
    },

    /// An object message carried an entity type this client does not know
    #[error("Unknown entity type {type_id}")]
    UnknownEntityType { type_id: u64 },

    /// A component carried a kind this client does not know
    #[error("Unknown component kind {type_id}")]
    UnknownComponentKind { type_id: u64 },

    /// A view property received a value of the wrong type
    #[error("Property {property:?} cannot hold a value of type {found:?}")]
    PropertyType {
        property: EntityProperty,
        found: ReplicatedValueType,
    },

    /// The relay rejected or failed a replication call
    #[error("Replication failed ({code:?}): {message}")]
    Replication { code: ErrorCode, message: String },

    /// An object message or patch could not be encoded or decoded
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}
