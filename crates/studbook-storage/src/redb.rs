//! ReDB storage backend

use crate::error::{StorageError, StorageResult};
use crate::migration::{upgrade, SchemaStep, SchemaVersioned};
use crate::traits::StorageBackend;
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;
use std::sync::Mutex;
use studbook_core::lineage::walk_ancestors;
use studbook_core::{AncestorRow, Horse, HorseFields, HorseId, Owner, OwnerFields, OwnerId};

// Table definitions
const HORSES: TableDefinition<i64, &[u8]> = TableDefinition::new("horses");
const OWNERS: TableDefinition<i64, &[u8]> = TableDefinition::new("owners");
const META: TableDefinition<&str, i64> = TableDefinition::new("meta");

const NEXT_HORSE_ID: &str = "next_horse_id";
const NEXT_OWNER_ID: &str = "next_owner_id";
const SCHEMA_VERSION: &str = "schema_version";

/// ReDB storage backend
pub struct RedbStorage {
    db: Mutex<Database>,
}

impl RedbStorage {
    /// Open or create a ReDB database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path).map_err(|e| StorageError::Database(e.to_string()))?;
        let storage = Self { db: Mutex::new(db) };
        upgrade(&storage)?;
        Ok(storage)
    }

    fn db(&self) -> StorageResult<std::sync::MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    /// Take the next id from a counter in the meta table
    fn next_id(txn: &WriteTransaction, counter: &str) -> StorageResult<i64> {
        let mut meta = txn.open_table(META)?;
        let id = meta
            .get(counter)?
            .map(|v| v.value())
            .ok_or_else(|| StorageError::Migration(format!("Missing id counter {}", counter)))?;
        meta.insert(counter, id + 1)?;
        Ok(id)
    }
}

impl SchemaVersioned for RedbStorage {
    fn stored_version(&self) -> StorageResult<u32> {
        let db = self.db()?;
        let read_txn = db.begin_read()?;
        let meta = match read_txn.open_table(META) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let version = meta.get(SCHEMA_VERSION)?.map(|v| v.value()).unwrap_or(0);
        u32::try_from(version).map_err(|e| StorageError::Migration(e.to_string()))
    }

    fn apply_step(&self, step: SchemaStep) -> StorageResult<()> {
        let db = self.db()?;
        let write_txn = db.begin_write()?;
        {
            let mut meta = write_txn.open_table(META)?;
            match step {
                SchemaStep::RegistryTables => {
                    write_txn.open_table(HORSES)?;
                    write_txn.open_table(OWNERS)?;
                }
                SchemaStep::ParentLookups => {
                    for counter in [NEXT_HORSE_ID, NEXT_OWNER_ID] {
                        if meta.get(counter)?.is_none() {
                            meta.insert(counter, 1)?;
                        }
                    }
                }
            }
            meta.insert(SCHEMA_VERSION, i64::from(step.version()))?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for RedbStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let db = self.db()?;
        let read_txn = db.begin_read()?;
        read_txn.open_table(HORSES)?;
        Ok(true)
    }

    async fn create_horse(&self, fields: &HorseFields) -> StorageResult<Horse> {
        tracing::trace!("create_horse({:?})", fields);
        let db = self.db()?;
        let write_txn = db.begin_write()?;
        let horse = {
            let id = HorseId(Self::next_id(&write_txn, NEXT_HORSE_ID)?);
            let horse = Horse::from_fields(id, fields.clone());
            let value = serde_json::to_vec(&horse)?;
            let mut table = write_txn.open_table(HORSES)?;
            table.insert(id.0, value.as_slice())?;
            horse
        };
        write_txn.commit()?;

        Ok(horse)
    }

    async fn update_horse(&self, id: HorseId, fields: &HorseFields) -> StorageResult<Horse> {
        tracing::trace!("update_horse({}, {:?})", id, fields);
        let db = self.db()?;
        let write_txn = db.begin_write()?;
        let horse = {
            let mut table = write_txn.open_table(HORSES)?;
            if table.get(id.0)?.is_none() {
                return Err(StorageError::HorseNotFound(id));
            }
            let horse = Horse::from_fields(id, fields.clone());
            let value = serde_json::to_vec(&horse)?;
            table.insert(id.0, value.as_slice())?;
            horse
        };
        write_txn.commit()?;

        Ok(horse)
    }

    async fn get_horse(&self, id: HorseId) -> StorageResult<Option<Horse>> {
        let db = self.db()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(HORSES)?;

        if let Some(value) = table.get(id.0)? {
            let horse: Horse = serde_json::from_slice(value.value())?;
            Ok(Some(horse))
        } else {
            Ok(None)
        }
    }

    async fn get_all_horses(&self) -> StorageResult<Vec<Horse>> {
        let db = self.db()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(HORSES)?;

        let mut horses = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let horse: Horse = serde_json::from_slice(value.value())?;
            horses.push(horse);
        }

        Ok(horses)
    }

    async fn delete_horse(&self, id: HorseId) -> StorageResult<()> {
        tracing::trace!("delete_horse({})", id);
        let db = self.db()?;
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(HORSES)?;
            if table.get(id.0)?.is_none() {
                return Err(StorageError::HorseNotFound(id));
            }

            let mut children = Vec::new();
            for entry in table.iter()? {
                let (_, value) = entry?;
                let horse: Horse = serde_json::from_slice(value.value())?;
                if horse.is_child_of(id) {
                    children.push(horse);
                }
            }

            for mut child in children {
                child.orphan_from(id);
                let value = serde_json::to_vec(&child)?;
                table.insert(child.id.0, value.as_slice())?;
                tracing::debug!("Orphaned horse {} from deleted parent {}", child.id, id);
            }
            table.remove(id.0)?;
        }
        write_txn.commit()?;

        Ok(())
    }

    async fn children_of(&self, id: HorseId) -> StorageResult<Vec<Horse>> {
        Ok(self
            .get_all_horses()
            .await?
            .into_iter()
            .filter(|h| h.is_child_of(id))
            .collect())
    }

    async fn ancestors_within_depth(
        &self,
        id: HorseId,
        max_generations: u32,
    ) -> StorageResult<Vec<AncestorRow>> {
        tracing::trace!("ancestors_within_depth({}, {})", id, max_generations);
        let db = self.db()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(HORSES)?;

        let rows = walk_ancestors(id, max_generations, |hid| -> StorageResult<Option<Horse>> {
            match table.get(hid.0)? {
                Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
                None => Ok(None),
            }
        })?;

        if rows.is_empty() {
            return Err(StorageError::HorseNotFound(id));
        }
        Ok(rows)
    }

    async fn create_owner(&self, fields: &OwnerFields) -> StorageResult<Owner> {
        tracing::trace!("create_owner({:?})", fields);
        let db = self.db()?;
        let write_txn = db.begin_write()?;
        let owner = {
            let id = OwnerId(Self::next_id(&write_txn, NEXT_OWNER_ID)?);
            let owner = Owner::from_fields(id, fields.clone());
            let value = serde_json::to_vec(&owner)?;
            let mut table = write_txn.open_table(OWNERS)?;
            table.insert(id.0, value.as_slice())?;
            owner
        };
        write_txn.commit()?;

        Ok(owner)
    }

    async fn get_owner(&self, id: OwnerId) -> StorageResult<Option<Owner>> {
        let db = self.db()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(OWNERS)?;

        if let Some(value) = table.get(id.0)? {
            let owner: Owner = serde_json::from_slice(value.value())?;
            Ok(Some(owner))
        } else {
            Ok(None)
        }
    }

    async fn get_all_owners(&self) -> StorageResult<Vec<Owner>> {
        let db = self.db()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(OWNERS)?;

        let mut owners = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let owner: Owner = serde_json::from_slice(value.value())?;
            owners.push(owner);
        }

        Ok(owners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::CURRENT_VERSION;
    use chrono::NaiveDate;
    use studbook_core::Sex;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_redb_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("studbook.redb")).unwrap();
        assert_eq!(storage.stored_version().unwrap(), CURRENT_VERSION);

        let mare = storage
            .create_horse(&HorseFields::new("Mare", date(2000), Sex::Female))
            .await
            .unwrap();
        let foal = storage
            .create_horse(&HorseFields::new("Foal", date(2008), Sex::Male).with_mother(mare.id))
            .await
            .unwrap();
        assert_eq!(foal.id, HorseId(mare.id.0 + 1));

        let rows = storage.ancestors_within_depth(foal.id, 3).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(storage.children_of(mare.id).await.unwrap().len(), 1);

        storage.delete_horse(mare.id).await.unwrap();
        let foal_after = storage.get_horse(foal.id).await.unwrap().unwrap();
        assert_eq!(foal_after.mother_id, None);
        assert!(matches!(
            storage.delete_horse(mare.id).await,
            Err(StorageError::HorseNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_redb_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studbook.redb");

        let owner_id = {
            let storage = RedbStorage::open(&path).unwrap();
            storage
                .create_owner(&OwnerFields::new("Anna", "Huber"))
                .await
                .unwrap()
                .id
        };

        let storage = RedbStorage::open(&path).unwrap();
        let owner = storage.get_owner(owner_id).await.unwrap().unwrap();
        assert_eq!(owner.first_name, "Anna");

        let next = storage
            .create_owner(&OwnerFields::new("Bernd", "Maier"))
            .await
            .unwrap();
        assert_ne!(next.id, owner_id);
    }

    #[tokio::test]
    async fn test_redb_upgrades_version_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studbook.redb");

        // Tables exist but the id counters were never seeded
        {
            let db = Database::create(&path).unwrap();
            let write_txn = db.begin_write().unwrap();
            {
                write_txn.open_table(HORSES).unwrap();
                write_txn.open_table(OWNERS).unwrap();
                let mut meta = write_txn.open_table(META).unwrap();
                meta.insert(SCHEMA_VERSION, 1).unwrap();
            }
            write_txn.commit().unwrap();
        }

        let storage = RedbStorage::open(&path).unwrap();
        assert_eq!(storage.stored_version().unwrap(), CURRENT_VERSION);
        let horse = storage
            .create_horse(&HorseFields::new("First", date(2010), Sex::Male))
            .await
            .unwrap();
        assert_eq!(horse.id, HorseId(1));
    }
}
