//! Exposes a storage backend to the pedigree validator

use async_trait::async_trait;
use studbook_core::{Horse, HorseGraph, HorseId, OwnerDirectory, OwnerId, Result};

use crate::traits::StorageBackend;

/// Read-only view of a backend as a horse graph and owner directory
pub struct StoreGraph<'a, S: ?Sized> {
    storage: &'a S,
}

impl<'a, S: StorageBackend + ?Sized> StoreGraph<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: StorageBackend + ?Sized> HorseGraph for StoreGraph<'_, S> {
    async fn horse(&self, id: HorseId) -> Result<Option<Horse>> {
        Ok(self.storage.get_horse(id).await?)
    }

    async fn children_of(&self, id: HorseId) -> Result<Vec<Horse>> {
        Ok(self.storage.children_of(id).await?)
    }
}

#[async_trait]
impl<S: StorageBackend + ?Sized> OwnerDirectory for StoreGraph<'_, S> {
    async fn owner_exists(&self, id: OwnerId) -> Result<bool> {
        Ok(self.storage.get_owner(id).await?.is_some())
    }
}
