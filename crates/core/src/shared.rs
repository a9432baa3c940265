//! Shared-maintenance groups: a master entity owns the calendar cycles and
//! its members only follow, entering maintenance together once all of them
//! are available.

use serde::Serialize;

use crate::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MaintenanceRole {
    Independent,
    Master,
    /// Non-owning back-reference to the master.
    Member(EntityId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedMaintenanceGroup {
    master: EntityId,
    members: Vec<EntityId>,
}

impl SharedMaintenanceGroup {
    pub fn new(master: EntityId, members: Vec<EntityId>) -> Self {
        Self { master, members }
    }

    pub fn master(&self) -> EntityId {
        self.master
    }

    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    /// Members first, the master last.
    pub fn participants(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.iter().copied().chain(std::iter::once(self.master))
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.master == entity || self.members.contains(&entity)
    }

    /// True only when every participant reports available.
    pub fn is_available(&self, mut available: impl FnMut(EntityId) -> bool) -> bool {
        self.participants().all(|id| available(id))
    }
}
