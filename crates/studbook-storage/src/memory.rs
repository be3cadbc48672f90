//! In-memory storage backend for testing

use crate::error::{StorageError, StorageResult};
use crate::traits::StorageBackend;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;
use studbook_core::lineage::walk_ancestors;
use studbook_core::{AncestorRow, Horse, HorseFields, HorseId, Owner, OwnerFields, OwnerId};

/// In-memory storage backend
///
/// Useful for testing and temporary storage.
pub struct MemoryStorage {
    horses: RwLock<BTreeMap<HorseId, Horse>>,
    owners: RwLock<BTreeMap<OwnerId, Owner>>,
    next_horse_id: AtomicI64,
    next_owner_id: AtomicI64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            horses: RwLock::new(BTreeMap::new()),
            owners: RwLock::new(BTreeMap::new()),
            next_horse_id: AtomicI64::new(1),
            next_owner_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Database(format!("Lock error: {}", e))
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(true)
    }

    // Horse operations

    async fn create_horse(&self, fields: &HorseFields) -> StorageResult<Horse> {
        tracing::trace!("create_horse({:?})", fields);
        let id = HorseId(self.next_horse_id.fetch_add(1, Ordering::SeqCst));
        let horse = Horse::from_fields(id, fields.clone());

        let mut horses = self.horses.write().map_err(lock_error)?;
        horses.insert(id, horse.clone());
        Ok(horse)
    }

    async fn update_horse(&self, id: HorseId, fields: &HorseFields) -> StorageResult<Horse> {
        tracing::trace!("update_horse({}, {:?})", id, fields);
        let mut horses = self.horses.write().map_err(lock_error)?;
        let horse = horses.get_mut(&id).ok_or(StorageError::HorseNotFound(id))?;
        horse.apply(fields.clone());
        Ok(horse.clone())
    }

    async fn get_horse(&self, id: HorseId) -> StorageResult<Option<Horse>> {
        let horses = self.horses.read().map_err(lock_error)?;
        Ok(horses.get(&id).cloned())
    }

    async fn get_all_horses(&self) -> StorageResult<Vec<Horse>> {
        let horses = self.horses.read().map_err(lock_error)?;
        Ok(horses.values().cloned().collect())
    }

    async fn delete_horse(&self, id: HorseId) -> StorageResult<()> {
        tracing::trace!("delete_horse({})", id);
        let mut horses = self.horses.write().map_err(lock_error)?;
        if !horses.contains_key(&id) {
            return Err(StorageError::HorseNotFound(id));
        }

        for child in horses.values_mut() {
            if child.orphan_from(id) {
                tracing::debug!("Orphaned horse {} from deleted parent {}", child.id, id);
            }
        }
        horses.remove(&id);
        Ok(())
    }

    async fn children_of(&self, id: HorseId) -> StorageResult<Vec<Horse>> {
        let horses = self.horses.read().map_err(lock_error)?;
        Ok(horses.values().filter(|h| h.is_child_of(id)).cloned().collect())
    }

    async fn ancestors_within_depth(
        &self,
        id: HorseId,
        max_generations: u32,
    ) -> StorageResult<Vec<AncestorRow>> {
        tracing::trace!("ancestors_within_depth({}, {})", id, max_generations);
        let horses = self.horses.read().map_err(lock_error)?;
        let rows = walk_ancestors(id, max_generations, |hid| {
            Ok::<_, StorageError>(horses.get(&hid).cloned())
        })?;

        if rows.is_empty() {
            return Err(StorageError::HorseNotFound(id));
        }
        Ok(rows)
    }

    // Owner operations

    async fn create_owner(&self, fields: &OwnerFields) -> StorageResult<Owner> {
        tracing::trace!("create_owner({:?})", fields);
        let id = OwnerId(self.next_owner_id.fetch_add(1, Ordering::SeqCst));
        let owner = Owner::from_fields(id, fields.clone());

        let mut owners = self.owners.write().map_err(lock_error)?;
        owners.insert(id, owner.clone());
        Ok(owner)
    }

    async fn get_owner(&self, id: OwnerId) -> StorageResult<Option<Owner>> {
        let owners = self.owners.read().map_err(lock_error)?;
        Ok(owners.get(&id).cloned())
    }

    async fn get_all_owners(&self) -> StorageResult<Vec<Owner>> {
        let owners = self.owners.read().map_err(lock_error)?;
        Ok(owners.values().cloned().collect())
    }
}
