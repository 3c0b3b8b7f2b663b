use crate::entities::{EntityId, Owner, Pet, PetType, Visit, DEFAULT_PET_TYPES};
use crate::error::{ClinicError, Result};
use crate::repository::{total_pages, OwnerPage, OwnerRepository};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Owner row as it appears in a seed CSV
#[derive(Debug, Deserialize, Clone)]
pub struct OwnerRecord {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub telephone: String,
}

impl From<OwnerRecord> for Owner {
    fn from(record: OwnerRecord) -> Self {
        Owner::new(
            record.first_name,
            record.last_name,
            record.address,
            record.city,
            record.telephone,
        )
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Cascades depend on this, and it is per-connection
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Pet types (shared classification)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Owners (aggregate root)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS owners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            address TEXT NOT NULL,
            city TEXT NOT NULL,
            telephone TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Pets and visits (owned by the aggregate, deleted with it)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS pets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            birth_date TEXT,
            type_id INTEGER REFERENCES types(id),
            owner_id INTEGER NOT NULL REFERENCES owners(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS visits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pet_id INTEGER NOT NULL REFERENCES pets(id) ON DELETE CASCADE,
            visit_date TEXT NOT NULL,
            description TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute("CREATE INDEX IF NOT EXISTS idx_owners_last_name ON owners(last_name)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_types_name ON types(name)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_pets_owner ON pets(owner_id)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_visits_pet ON visits(pet_id)", [])?;

    Ok(())
}

/// Insert the default pet types into an empty types table
pub fn seed_pet_types(conn: &Connection) -> Result<usize> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM types", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(0);
    }

    for name in DEFAULT_PET_TYPES {
        conn.execute("INSERT INTO types (name) VALUES (?1)", params![name])?;
    }
    tracing::info!(count = DEFAULT_PET_TYPES.len(), "seeded default pet types");

    Ok(DEFAULT_PET_TYPES.len())
}

/// Read owners from a CSV with columns first_name,last_name,address,city,telephone
pub fn load_owners_csv(csv_path: &Path) -> Result<Vec<Owner>> {
    let mut rdr = csv::Reader::from_path(csv_path)?;

    let mut owners = Vec::new();
    for result in rdr.deserialize() {
        let record: OwnerRecord = result?;
        owners.push(record.into());
    }

    Ok(owners)
}

// ============================================================================
// AGGREGATE LOADING
// ============================================================================

pub fn get_owner(conn: &Connection, id: EntityId) -> Result<Option<Owner>> {
    let owner = conn
        .query_row(
            "SELECT id, first_name, last_name, address, city, telephone
             FROM owners
             WHERE id = ?1",
            params![id],
            |row| {
                let mut owner = Owner::new(
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                );
                owner.id = Some(row.get(0)?);
                Ok(owner)
            },
        )
        .optional()?;

    let Some(mut owner) = owner else {
        return Ok(None);
    };

    for pet in get_pets_for_owner(conn, id)? {
        owner.attach_loaded(pet);
    }

    Ok(Some(owner))
}

fn get_pets_for_owner(conn: &Connection, owner_id: EntityId) -> Result<Vec<Pet>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.birth_date, t.id, t.name
         FROM pets p
         LEFT JOIN types t ON t.id = p.type_id
         WHERE p.owner_id = ?1
         ORDER BY p.id",
    )?;

    let mut pets = stmt
        .query_map(params![owner_id], |row| {
            let type_id: Option<EntityId> = row.get(3)?;
            let type_name: Option<String> = row.get(4)?;
            let pet_type = match (type_id, type_name) {
                (Some(id), Some(name)) => Some(PetType::with_id(id, name)),
                _ => None,
            };

            let birth_date: Option<NaiveDate> = row.get(2)?;
            let pet = Pet::new(row.get::<_, String>(1)?, birth_date, pet_type).with_id(row.get(0)?);
            Ok(pet)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for pet in &mut pets {
        if let Some(pet_id) = pet.id {
            for visit in get_visits_for_pet(conn, pet_id)? {
                pet.add_visit(visit);
            }
        }
    }

    Ok(pets)
}

fn get_visits_for_pet(conn: &Connection, pet_id: EntityId) -> Result<Vec<Visit>> {
    let mut stmt = conn.prepare(
        "SELECT id, visit_date, description
         FROM visits
         WHERE pet_id = ?1
         ORDER BY visit_date ASC, id ASC",
    )?;

    let visits = stmt
        .query_map(params![pet_id], |row| {
            let mut visit = Visit::new(row.get(1)?, row.get::<_, String>(2)?);
            visit.id = Some(row.get(0)?);
            Ok(visit)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(visits)
}

// ============================================================================
// AGGREGATE SAVING
// ============================================================================

/// Write the whole aggregate; the caller owns the transaction
fn write_owner(conn: &Connection, owner: &mut Owner) -> Result<EntityId> {
    let owner_id = match owner.id {
        Some(id) => {
            let updated = conn.execute(
                "UPDATE owners
                 SET first_name = ?1, last_name = ?2, address = ?3, city = ?4, telephone = ?5
                 WHERE id = ?6",
                params![owner.first_name(), owner.last_name(), owner.address, owner.city, owner.telephone, id],
            )?;
            if updated == 0 {
                return Err(ClinicError::owner_not_found(id));
            }
            id
        }
        None => {
            conn.execute(
                "INSERT INTO owners (first_name, last_name, address, city, telephone)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![owner.first_name(), owner.last_name(), owner.address, owner.city, owner.telephone],
            )?;
            conn.last_insert_rowid()
        }
    };
    owner.id = Some(owner_id);

    let mut kept_pets = HashSet::new();
    for pet in owner.pets_mut() {
        let pet_id = write_pet(conn, owner_id, pet)?;
        kept_pets.insert(pet_id);
    }
    delete_missing(conn, "pets", "owner_id", owner_id, &kept_pets)?;

    Ok(owner_id)
}

fn write_pet(conn: &Connection, owner_id: EntityId, pet: &mut Pet) -> Result<EntityId> {
    let type_id = match pet.pet_type.as_mut() {
        Some(pet_type) => Some(ensure_pet_type(conn, pet_type)?),
        None => None,
    };

    let pet_id = match pet.id {
        Some(id) => {
            let updated = conn.execute(
                "UPDATE pets SET name = ?1, birth_date = ?2, type_id = ?3
                 WHERE id = ?4 AND owner_id = ?5",
                params![pet.name, pet.birth_date, type_id, id, owner_id],
            )?;
            if updated == 0 {
                return Err(ClinicError::pet_not_found(id));
            }
            id
        }
        None => {
            conn.execute(
                "INSERT INTO pets (name, birth_date, type_id, owner_id) VALUES (?1, ?2, ?3, ?4)",
                params![pet.name, pet.birth_date, type_id, owner_id],
            )?;
            conn.last_insert_rowid()
        }
    };
    pet.id = Some(pet_id);

    let mut kept_visits = HashSet::new();
    for visit in pet.visits_mut() {
        let visit_id = match visit.id {
            Some(id) => {
                conn.execute(
                    "UPDATE visits SET visit_date = ?1, description = ?2 WHERE id = ?3 AND pet_id = ?4",
                    params![visit.date, visit.description, id, pet_id],
                )?;
                id
            }
            None => {
                conn.execute(
                    "INSERT INTO visits (pet_id, visit_date, description) VALUES (?1, ?2, ?3)",
                    params![pet_id, visit.date, visit.description],
                )?;
                conn.last_insert_rowid()
            }
        };
        visit.id = Some(visit_id);
        kept_visits.insert(visit_id);
    }
    delete_missing(conn, "visits", "pet_id", pet_id, &kept_visits)?;

    Ok(pet_id)
}

/// Delete child rows of `parent_id` that are no longer in the aggregate
fn delete_missing(
    conn: &Connection,
    table: &str,
    parent_column: &str,
    parent_id: EntityId,
    kept: &HashSet<EntityId>,
) -> Result<()> {
    let mut stmt = conn.prepare(&format!("SELECT id FROM {} WHERE {} = ?1", table, parent_column))?;
    let stored = stmt
        .query_map(params![parent_id], |row| row.get::<_, EntityId>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for id in stored.into_iter().filter(|id| !kept.contains(id)) {
        conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])?;
        tracing::debug!(table, id, "removed row dropped from aggregate");
    }

    Ok(())
}

/// Key of a pet type, storing it first when it is new.
/// A new type whose name is already stored reuses that row.
fn ensure_pet_type(conn: &Connection, pet_type: &mut PetType) -> Result<EntityId> {
    if let Some(id) = pet_type.id {
        return Ok(id);
    }

    let existing: Option<EntityId> = conn
        .query_row("SELECT id FROM types WHERE name = ?1 ORDER BY id LIMIT 1", params![pet_type.name], |row| row.get(0))
        .optional()?;

    let id = match existing {
        Some(id) => id,
        None => {
            conn.execute("INSERT INTO types (name) VALUES (?1)", params![pet_type.name])?;
            conn.last_insert_rowid()
        }
    };
    pet_type.id = Some(id);
    Ok(id)
}

// ============================================================================
// QUERIES
// ============================================================================

const PREFIX_FILTER: &str = "substr(last_name, 1, length(?1)) = ?1";

pub fn count_owners_by_last_name_prefix(conn: &Connection, prefix: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM owners WHERE {}", PREFIX_FILTER),
        params![prefix],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

pub fn get_pet_types(conn: &Connection) -> Result<Vec<PetType>> {
    let mut stmt = conn.prepare("SELECT id, name FROM types ORDER BY name, id")?;
    let types = stmt
        .query_map([], |row| Ok(PetType::with_id(row.get(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(types)
}

// ============================================================================
// SQLITE REPOSITORY
// ============================================================================

pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open (or create) a database file, with WAL and schema in place
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteRepository { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl OwnerRepository for SqliteRepository {
    fn load_owner_by_id(&self, id: EntityId) -> Result<Option<Owner>> {
        get_owner(&self.conn, id)
    }

    fn save_owner(&mut self, mut owner: Owner) -> Result<Owner> {
        let tx = self.conn.transaction()?;
        let owner_id = write_owner(&tx, &mut owner)?;
        tx.commit()?;

        tracing::debug!(owner_id, pets = owner.pets().len(), "saved owner aggregate");
        Ok(owner)
    }

    fn delete_owner(&mut self, id: EntityId) -> Result<()> {
        let deleted = self.conn.execute("DELETE FROM owners WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(ClinicError::owner_not_found(id));
        }
        Ok(())
    }

    fn query_by_last_name_prefix(&self, prefix: &str, page_index: usize, page_size: usize) -> Result<OwnerPage> {
        if page_size == 0 {
            return Err(ClinicError::invalid_argument("Page size must be positive"));
        }

        let total_count = count_owners_by_last_name_prefix(&self.conn, prefix)?;

        let total_pages = total_pages(total_count, page_size);

        // An offset SQLite cannot represent lies past every row
        let window = page_index
            .checked_mul(page_size)
            .and_then(|offset| Some((i64::try_from(offset).ok()?, i64::try_from(page_size).ok()?)));
        let Some((offset, limit)) = window else {
            return Ok(OwnerPage {
                owners: Vec::new(),
                total_count,
                total_pages,
            });
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT id FROM owners WHERE {} ORDER BY id LIMIT ?2 OFFSET ?3",
            PREFIX_FILTER
        ))?;
        let ids = stmt
            .query_map(params![prefix, limit, offset], |row| row.get::<_, EntityId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut owners = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(owner) = get_owner(&self.conn, id)? {
                owners.push(owner);
            }
        }

        Ok(OwnerPage {
            owners,
            total_count,
            total_pages,
        })
    }

    fn list_pet_types(&self) -> Result<Vec<PetType>> {
        get_pet_types(&self.conn)
    }

    fn save_pet_type(&mut self, mut pet_type: PetType) -> Result<PetType> {
        match pet_type.id {
            Some(id) => {
                let updated = self
                    .conn
                    .execute("UPDATE types SET name = ?1 WHERE id = ?2", params![pet_type.name, id])?;
                if updated == 0 {
                    return Err(ClinicError::InvalidReference { entity: "PetType", id });
                }
            }
            None => {
                self.conn
                    .execute("INSERT INTO types (name) VALUES (?1)", params![pet_type.name])?;
                pet_type.id = Some(self.conn.last_insert_rowid());
            }
        }
        Ok(pet_type)
    }
}
