//! Storage backend trait definitions

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use studbook_core::{
    AncestorRow, Horse, HorseFields, HorseId, HorseSearch, Owner, OwnerFields, OwnerId,
    OwnerSearch,
};

/// Trait for storage backend implementations
///
/// A backend is the durable graph store: horses point to a mother, a father
/// and an owner by id. Every call is a single blocking unit from the caller's
/// point of view; conflicting writes are serialized by the backend.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn initialize(&self) -> StorageResult<()>;

    /// Health check
    async fn health_check(&self) -> StorageResult<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Horse Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a horse and assign its id
    async fn create_horse(&self, fields: &HorseFields) -> StorageResult<Horse>;

    /// Replace every mutable field of an existing horse
    async fn update_horse(&self, id: HorseId, fields: &HorseFields) -> StorageResult<Horse>;

    /// Get a horse by id
    async fn get_horse(&self, id: HorseId) -> StorageResult<Option<Horse>>;

    /// Get all horses, ordered by id
    async fn get_all_horses(&self) -> StorageResult<Vec<Horse>>;

    /// Null the mother/father reference of every child, then remove the
    /// horse. Fails with `HorseNotFound` if it does not exist.
    async fn delete_horse(&self, id: HorseId) -> StorageResult<()>;

    /// Horses whose mother or father is `id`
    async fn children_of(&self, id: HorseId) -> StorageResult<Vec<Horse>>;

    /// Bounded ancestor walk. Generation 1 is the root; each horse is
    /// reported once with its smallest generation. `max_generations` must be
    /// at least 1. Fails with `HorseNotFound` if the root does not exist.
    async fn ancestors_within_depth(
        &self,
        id: HorseId,
        max_generations: u32,
    ) -> StorageResult<Vec<AncestorRow>>;

    /// Horses matching every set filter, ordered by id
    async fn search_horses(&self, filter: &HorseSearch) -> StorageResult<Vec<Horse>> {
        let owners: HashMap<OwnerId, Owner> = self
            .get_all_owners()
            .await?
            .into_iter()
            .map(|o| (o.id, o))
            .collect();

        let horses = self
            .get_all_horses()
            .await?
            .into_iter()
            .filter(|h| filter.matches(h, h.owner_id.and_then(|id| owners.get(&id))))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(horses)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Owner Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an owner and assign its id
    async fn create_owner(&self, fields: &OwnerFields) -> StorageResult<Owner>;

    /// Get an owner by id
    async fn get_owner(&self, id: OwnerId) -> StorageResult<Option<Owner>>;

    /// Get all owners, ordered by id
    async fn get_all_owners(&self) -> StorageResult<Vec<Owner>>;

    /// Get an owner by exact email
    async fn get_owner_by_email(&self, email: &str) -> StorageResult<Option<Owner>> {
        Ok(self
            .get_all_owners()
            .await?
            .into_iter()
            .find(|o| o.email.as_deref() == Some(email)))
    }

    /// Get several owners at once. Fails with `OwnerNotFound` on the first
    /// unknown id.
    async fn get_owners_by_ids(&self, ids: &[OwnerId]) -> StorageResult<HashMap<OwnerId, Owner>> {
        let mut owners = HashMap::with_capacity(ids.len());
        for id in ids {
            let owner = self
                .get_owner(*id)
                .await?
                .ok_or(StorageError::OwnerNotFound(*id))?;
            owners.insert(*id, owner);
        }
        Ok(owners)
    }

    /// Owners matching the filter, ordered by id
    async fn search_owners(&self, filter: &OwnerSearch) -> StorageResult<Vec<Owner>> {
        Ok(self
            .get_all_owners()
            .await?
            .into_iter()
            .filter(|o| filter.matches(o))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect())
    }
}
