// SPDX-License-Identifier: MIT OR Apache-2.0
//! The actor that owns a running action.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actor ID for binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    /// Create a new random actor ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Binding of a timeline to the actor performing it
///
/// Effects spawn at `position`; damage fields are tagged with `actor_id`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    /// Owning actor
    pub actor_id: ActorId,
    /// World position of the actor when the action runs
    pub position: [f32; 3],
}

impl Owner {
    /// Create an owner at the origin
    pub fn new(actor_id: ActorId) -> Self {
        Self {
            actor_id,
            position: [0.0, 0.0, 0.0],
        }
    }

    /// Place the owner at a position
    pub fn at(actor_id: ActorId, position: [f32; 3]) -> Self {
        Self { actor_id, position }
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new(ActorId::new())
    }
}
