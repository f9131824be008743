//! Immutable registry of item types, frozen at simulation start.
//!
//! Components configured with an item type validate it against the registry
//! at placement. An unknown type permanently deactivates the component
//! instead of failing placement; injection of an unknown type is refused
//! outright since no parcel of it could ever be named or matched.

use crate::id::ItemTypeId;

/// Errors raised while building the registry. Never raised during simulation.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry has been frozen; no further definitions are accepted.
    #[error("registry is frozen")]
    Frozen,
    /// An item type with this name already exists.
    #[error("duplicate item type name: {0}")]
    DuplicateName(String),
}

/// Registry of item type definitions. Built once, then frozen.
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    names: Vec<String>,
    frozen: bool,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new item type. Fails once the registry is frozen.
    pub fn define(&mut self, name: &str) -> Result<ItemTypeId, RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen);
        }
        if self.names.iter().any(|n| n == name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let id = ItemTypeId(self.names.len() as u32);
        self.names.push(name.to_string());
        Ok(id)
    }

    /// Freeze the registry. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether an item type id refers to a defined type.
    pub fn contains(&self, id: ItemTypeId) -> bool {
        (id.0 as usize) < self.names.len()
    }

    /// Look up the name of an item type.
    pub fn name(&self, id: ItemTypeId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
