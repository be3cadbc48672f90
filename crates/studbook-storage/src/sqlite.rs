//! SQLite storage backend

use crate::error::{StorageError, StorageResult};
use crate::migration::{upgrade, SchemaStep, SchemaVersioned};
use crate::traits::StorageBackend;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use studbook_core::lineage::dedup_min_generation;
use studbook_core::{AncestorRow, Horse, HorseFields, HorseId, Owner, OwnerFields, OwnerId, Sex};

const HORSE_COLUMNS: &str =
    "id, name, description, date_of_birth, sex, owner_id, mother_id, father_id";

const SQL_ANCESTORS: &str = r#"
    WITH RECURSIVE tree(id, mother_id, father_id, generation) AS (
        SELECT id, mother_id, father_id, 1 FROM horse WHERE id = ?1
        UNION
        SELECT h.id, h.mother_id, h.father_id, tree.generation + 1
        FROM horse h JOIN tree ON h.id = tree.mother_id OR h.id = tree.father_id
        WHERE tree.generation < ?2
    )
    SELECT h.id, h.name, h.description, h.date_of_birth, h.sex,
           h.owner_id, h.mother_id, h.father_id, tree.generation
    FROM tree JOIN horse h ON h.id = tree.id
    "#;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open or create a SQLite database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(|e| StorageError::Database(e.to_string()))?;

        let storage = Self { conn: Mutex::new(conn) };
        upgrade(&storage)?;

        Ok(storage)
    }

    /// Create an in-memory SQLite database (for testing)
    pub fn in_memory() -> StorageResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StorageError::Database(e.to_string()))?;

        let storage = Self { conn: Mutex::new(conn) };
        upgrade(&storage)?;

        Ok(storage)
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Database(e.to_string()))
    }
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn horse_from_row(row: &Row<'_>) -> rusqlite::Result<Horse> {
    let date: String = row.get(3)?;
    let date_of_birth = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|e| conversion_error(3, e.to_string()))?;
    let sex: String = row.get(4)?;
    let sex: Sex = sex.parse().map_err(|e| conversion_error(4, e))?;

    Ok(Horse {
        id: HorseId(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        date_of_birth,
        sex,
        owner_id: row.get::<_, Option<i64>>(5)?.map(OwnerId),
        mother_id: row.get::<_, Option<i64>>(6)?.map(HorseId),
        father_id: row.get::<_, Option<i64>>(7)?.map(HorseId),
    })
}

fn owner_from_row(row: &Row<'_>) -> rusqlite::Result<Owner> {
    Ok(Owner {
        id: OwnerId(row.get(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
    })
}

impl SchemaVersioned for SqliteStorage {
    fn stored_version(&self) -> StorageResult<u32> {
        let conn = self.conn()?;
        let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    fn apply_step(&self, step: SchemaStep) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        match step {
            SchemaStep::RegistryTables => tx.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS owner (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    email TEXT
                );

                CREATE TABLE IF NOT EXISTS horse (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    date_of_birth TEXT NOT NULL,
                    sex TEXT NOT NULL,
                    owner_id INTEGER REFERENCES owner(id),
                    mother_id INTEGER REFERENCES horse(id),
                    father_id INTEGER REFERENCES horse(id)
                );
                "#,
            )?,
            // Not UNIQUE: owners without an email share NULL
            SchemaStep::ParentLookups => tx.execute_batch(
                r#"
                CREATE INDEX IF NOT EXISTS idx_horse_mother ON horse(mother_id);
                CREATE INDEX IF NOT EXISTS idx_horse_father ON horse(father_id);
                CREATE INDEX IF NOT EXISTS idx_owner_email ON owner(email);
                "#,
            )?,
        }
        tx.pragma_update(None, "user_version", step.version())?;
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(true)
    }

    async fn create_horse(&self, fields: &HorseFields) -> StorageResult<Horse> {
        tracing::trace!("create_horse({:?})", fields);
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO horse
                 (name, description, date_of_birth, sex, owner_id, mother_id, father_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                fields.name,
                fields.description,
                fields.date_of_birth.to_string(),
                fields.sex.as_str(),
                fields.owner_id.map(|id| id.0),
                fields.mother_id.map(|id| id.0),
                fields.father_id.map(|id| id.0),
            ],
        )?;

        let id = HorseId(conn.last_insert_rowid());
        Ok(Horse::from_fields(id, fields.clone()))
    }

    async fn update_horse(&self, id: HorseId, fields: &HorseFields) -> StorageResult<Horse> {
        tracing::trace!("update_horse({}, {:?})", id, fields);
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE horse SET name = ?1, description = ?2, date_of_birth = ?3, sex = ?4,
                              owner_id = ?5, mother_id = ?6, father_id = ?7
             WHERE id = ?8",
            params![
                fields.name,
                fields.description,
                fields.date_of_birth.to_string(),
                fields.sex.as_str(),
                fields.owner_id.map(|id| id.0),
                fields.mother_id.map(|id| id.0),
                fields.father_id.map(|id| id.0),
                id.0,
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::HorseNotFound(id));
        }
        Ok(Horse::from_fields(id, fields.clone()))
    }

    async fn get_horse(&self, id: HorseId) -> StorageResult<Option<Horse>> {
        let conn = self.conn()?;
        let horse = conn
            .query_row(
                &format!("SELECT {} FROM horse WHERE id = ?1", HORSE_COLUMNS),
                params![id.0],
                horse_from_row,
            )
            .optional()?;
        Ok(horse)
    }

    async fn get_all_horses(&self) -> StorageResult<Vec<Horse>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM horse ORDER BY id", HORSE_COLUMNS))?;
        let horses = stmt
            .query_map([], horse_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(horses)
    }

    async fn delete_horse(&self, id: HorseId) -> StorageResult<()> {
        tracing::trace!("delete_horse({})", id);
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("UPDATE horse SET mother_id = NULL WHERE mother_id = ?1", params![id.0])?;
        tx.execute("UPDATE horse SET father_id = NULL WHERE father_id = ?1", params![id.0])?;
        let deleted = tx.execute("DELETE FROM horse WHERE id = ?1", params![id.0])?;

        if deleted == 0 {
            // dropping the transaction rolls back the child updates
            return Err(StorageError::HorseNotFound(id));
        }
        tx.commit()?;
        Ok(())
    }

    async fn children_of(&self, id: HorseId) -> StorageResult<Vec<Horse>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM horse WHERE mother_id = ?1 OR father_id = ?1 ORDER BY id",
            HORSE_COLUMNS
        ))?;
        let children = stmt
            .query_map(params![id.0], horse_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(children)
    }

    async fn ancestors_within_depth(
        &self,
        id: HorseId,
        max_generations: u32,
    ) -> StorageResult<Vec<AncestorRow>> {
        tracing::trace!("ancestors_within_depth({}, {})", id, max_generations);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(SQL_ANCESTORS)?;
        let rows = stmt
            .query_map(params![id.0, max_generations], |row| {
                Ok(AncestorRow {
                    horse: horse_from_row(row)?,
                    generation: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if rows.is_empty() {
            return Err(StorageError::HorseNotFound(id));
        }
        // UNION only removes identical rows; the same horse can still be
        // reached at several generations
        Ok(dedup_min_generation(rows))
    }

    async fn create_owner(&self, fields: &OwnerFields) -> StorageResult<Owner> {
        tracing::trace!("create_owner({:?})", fields);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO owner (first_name, last_name, email) VALUES (?1, ?2, ?3)",
            params![fields.first_name, fields.last_name, fields.email],
        )?;
        let id = OwnerId(conn.last_insert_rowid());
        Ok(Owner::from_fields(id, fields.clone()))
    }

    async fn get_owner(&self, id: OwnerId) -> StorageResult<Option<Owner>> {
        let conn = self.conn()?;
        let owner = conn
            .query_row(
                "SELECT id, first_name, last_name, email FROM owner WHERE id = ?1",
                params![id.0],
                owner_from_row,
            )
            .optional()?;
        Ok(owner)
    }

    async fn get_all_owners(&self) -> StorageResult<Vec<Owner>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, first_name, last_name, email FROM owner ORDER BY id")?;
        let owners = stmt
            .query_map([], owner_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(owners)
    }

    async fn get_owner_by_email(&self, email: &str) -> StorageResult<Option<Owner>> {
        let conn = self.conn()?;
        let owner = conn
            .query_row(
                "SELECT id, first_name, last_name, email FROM owner WHERE email = ?1 LIMIT 1",
                params![email],
                owner_from_row,
            )
            .optional()?;
        Ok(owner)
    }
}
