//! Registry service
//!
//! Runs every request through field validation, then the pedigree
//! validator, then at most one store write, and resolves references for the
//! response.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use studbook_core::lineage::check_generations;
use studbook_core::validation::{
    validate_horse_for_create, validate_horse_for_update, validate_owner,
};
use studbook_core::{
    Conflict, ConflictReport, Error, Horse, HorseDraft, HorseId, HorseSearch, LineageAssembler,
    LineageNode, OwnerDraft, OwnerId, OwnerSearch, PedigreeValidator, Result,
};
use studbook_storage::{StorageBackend, StorageError, StoreGraph};

use crate::dto::{HorseDetailDto, HorseListDto, OwnerDto, ParentDto};

/// Horse and owner operations over a storage backend
pub struct Studbook<S: StorageBackend + ?Sized> {
    storage: Arc<S>,
    today: fn() -> NaiveDate,
}

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

impl<S: StorageBackend + ?Sized + 'static> Studbook<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            today: utc_today,
        }
    }

    /// Use a fixed clock for the date-of-birth check
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Horse Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn list_horses(&self) -> Result<Vec<HorseListDto>> {
        tracing::trace!("list_horses()");
        let horses = self.storage.get_all_horses().await?;
        self.to_list(horses).await
    }

    pub async fn search_horses(&self, filter: &HorseSearch) -> Result<Vec<HorseListDto>> {
        tracing::trace!("search_horses({:?})", filter);
        let horses = self.storage.search_horses(filter).await?;
        self.to_list(horses).await
    }

    pub async fn get_horse(&self, id: HorseId) -> Result<HorseDetailDto> {
        tracing::trace!("get_horse({})", id);
        let horse = self
            .storage
            .get_horse(id)
            .await?
            .ok_or(Error::HorseNotFound(id))?;
        self.to_detail(horse).await
    }

    pub async fn create_horse(&self, draft: &HorseDraft) -> Result<HorseDetailDto> {
        tracing::trace!("create_horse({:?})", draft);
        let fields = validate_horse_for_create(draft, (self.today)()).map_err(|errors| {
            tracing::warn!("Field errors in horse to create: {:?}", errors);
            Error::Validation(errors)
        })?;

        let graph = StoreGraph::new(self.storage.as_ref());
        PedigreeValidator::new(&graph, &graph)
            .validate_for_create(&fields)
            .await?
            .into_result()?;

        let horse = self.storage.create_horse(&fields).await?;
        tracing::info!("Created horse {} ({})", horse.id, horse.name);
        self.to_detail(horse).await
    }

    /// Replace every mutable field of horse `id`. The path id wins over any
    /// id carried in the draft.
    pub async fn update_horse(&self, id: HorseId, mut draft: HorseDraft) -> Result<HorseDetailDto> {
        tracing::trace!("update_horse({}, {:?})", id, draft);
        draft.id = Some(id);
        let (id, fields) = validate_horse_for_update(&draft, (self.today)()).map_err(|errors| {
            tracing::warn!("Field errors in horse {} to update: {:?}", id, errors);
            Error::Validation(errors)
        })?;

        let graph = StoreGraph::new(self.storage.as_ref());
        PedigreeValidator::new(&graph, &graph)
            .validate_for_update(id, &fields)
            .await?
            .into_result()?;

        let horse = self.storage.update_horse(id, &fields).await?;
        tracing::info!("Updated horse {} ({})", horse.id, horse.name);
        self.to_detail(horse).await
    }

    /// Delete a horse; its children lose the parent reference
    pub async fn delete_horse(&self, id: HorseId) -> Result<()> {
        tracing::trace!("delete_horse({})", id);
        self.storage.delete_horse(id).await?;
        tracing::info!("Deleted horse {}", id);
        Ok(())
    }

    /// Lineage tree of `id` covering `generations` generations, the horse
    /// itself being the first
    pub async fn lineage_tree(&self, id: HorseId, generations: i64) -> Result<LineageNode> {
        tracing::trace!("lineage_tree({}, {})", id, generations);
        let generations = check_generations(generations)?;
        let rows = self.storage.ancestors_within_depth(id, generations).await?;
        LineageAssembler::new(generations).build(id, &rows)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Owner Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_owner(&self, draft: &OwnerDraft) -> Result<OwnerDto> {
        tracing::trace!("create_owner({:?})", draft);
        let fields = validate_owner(draft).map_err(|errors| {
            tracing::warn!("Field errors in owner to create: {:?}", errors);
            Error::Validation(errors)
        })?;

        // Only a given email has to be unique
        if let Some(email) = &fields.email {
            if self.storage.get_owner_by_email(email).await?.is_some() {
                tracing::warn!("Owner email {} is already taken", email);
                [Conflict::EmailTaken]
                    .into_iter()
                    .collect::<ConflictReport>()
                    .into_result()?;
            }
        }

        let owner = self.storage.create_owner(&fields).await?;
        tracing::info!("Created owner {} ({})", owner.id, owner.full_name());
        Ok(owner.into())
    }

    pub async fn get_owner(&self, id: OwnerId) -> Result<OwnerDto> {
        tracing::trace!("get_owner({})", id);
        let owner = self
            .storage
            .get_owner(id)
            .await?
            .ok_or(Error::OwnerNotFound(id))?;
        Ok(owner.into())
    }

    pub async fn list_owners(&self) -> Result<Vec<OwnerDto>> {
        tracing::trace!("list_owners()");
        let owners = self.storage.get_all_owners().await?;
        Ok(owners.into_iter().map(OwnerDto::from).collect())
    }

    pub async fn search_owners(&self, filter: &OwnerSearch) -> Result<Vec<OwnerDto>> {
        tracing::trace!("search_owners({:?})", filter);
        let owners = self.storage.search_owners(filter).await?;
        Ok(owners.into_iter().map(OwnerDto::from).collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reference resolution
    // ─────────────────────────────────────────────────────────────────────────

    async fn to_list(&self, horses: Vec<Horse>) -> Result<Vec<HorseListDto>> {
        let owner_ids: Vec<OwnerId> = horses
            .iter()
            .filter_map(|h| h.owner_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let owners = match self.storage.get_owners_by_ids(&owner_ids).await {
            Ok(owners) => owners,
            Err(StorageError::OwnerNotFound(id)) => {
                return Err(fatal(format!(
                    "Horse, that is already persisted, refers to non-existing owner {}",
                    id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        horses
            .into_iter()
            .map(|horse| HorseListDto::from_horse(horse, &owners))
            .collect()
    }

    async fn to_detail(&self, horse: Horse) -> Result<HorseDetailDto> {
        let owner = match horse.owner_id {
            Some(id) => Some(self.storage.get_owner(id).await?.ok_or_else(|| {
                fatal(format!("Owner {} referenced by horse {} not found", id, horse.id))
            })?),
            None => None,
        };
        let mother = self.parent(&horse, horse.mother_id).await?;
        let father = self.parent(&horse, horse.father_id).await?;

        Ok(HorseDetailDto {
            id: horse.id,
            name: horse.name,
            description: horse.description,
            date_of_birth: horse.date_of_birth,
            sex: horse.sex,
            owner: owner.map(OwnerDto::from),
            mother,
            father,
        })
    }

    async fn parent(&self, child: &Horse, parent: Option<HorseId>) -> Result<Option<ParentDto>> {
        let Some(id) = parent else {
            return Ok(None);
        };
        let parent = self.storage.get_horse(id).await?.ok_or_else(|| {
            fatal(format!("Parent {} referenced by horse {} not found", id, child.id))
        })?;
        Ok(Some(ParentDto::from(&parent)))
    }
}

fn fatal(message: String) -> Error {
    tracing::error!("{}", message);
    Error::Fatal(message)
}
