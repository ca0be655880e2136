//! Asset repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the portfolio store the engine reads snapshots from.
//! - Allocate `IP-YYYY-NNN` identifiers inside the same write as the insert.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate the asset before any SQL mutation.
//! - Updates are read-modify-write inside one transaction and go through
//!   `Asset::validate_update_of`, so a resolved deadline is never reopened.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Listings keep insertion order.
//! - A deadline id is owned by exactly one asset; a write that would hand
//!   it to another asset fails with `DuplicateDeadline` and changes nothing.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::asset::{Asset, AssetId, AssetKind, AssetStatus, NewAsset, Owners, Priority};
use crate::model::deadline::{Deadline, DeadlineDraft, DeadlineId, DeadlineRecord};
use crate::model::error::{NotFoundError, ValidationError};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

const ASSET_SELECT_SQL: &str = "SELECT
    id,
    kind,
    title,
    description,
    status,
    priority,
    jurisdictions,
    filing_date,
    expiry_date,
    inventors,
    assignee,
    application_number,
    documents
FROM assets";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for asset persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(NotFoundError),
    /// Import collided with an existing identifier.
    AlreadyExists(AssetId),
    /// Persisted data cannot be converted to a valid asset.
    InvalidData(String),
    /// Another thread panicked while holding the store lock.
    LockPoisoned,
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(err) => write!(f, "{err}"),
            Self::AlreadyExists(id) => write!(f, "asset already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted asset data: {message}"),
            Self::LockPoisoned => write!(f, "asset store lock poisoned"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "asset repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "asset repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(err) => Some(err),
            Self::AlreadyExists(_)
            | Self::InvalidData(_)
            | Self::LockPoisoned
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NotFoundError> for RepoError {
    fn from(value: NotFoundError) -> Self {
        Self::NotFound(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetListQuery {
    pub include_archived: bool,
    pub kind: Option<AssetKind>,
}

impl AssetListQuery {
    pub fn matches(&self, asset: &Asset) -> bool {
        (self.include_archived || !asset.is_archived())
            && self.kind.map_or(true, |kind| kind == asset.kind)
    }
}

/// Portfolio store.
///
/// All methods take `&self`; implementations serialize writes internally.
pub trait AssetRepository {
    /// Allocates the next id for `year` and inserts the asset atomically.
    fn create_asset(&self, new_asset: NewAsset, year: i32) -> RepoResult<Asset>;

    /// Inserts an asset that already carries an id, e.g. from a fixture.
    ///
    /// The per-year sequence is advanced past the imported id.
    fn insert_asset(&self, asset: Asset) -> RepoResult<()>;

    fn get_asset(&self, id: &AssetId) -> RepoResult<Option<Asset>>;

    /// Assets in insertion order. Archived assets are excluded unless
    /// `include_archived` is set.
    fn list_assets(&self, query: &AssetListQuery) -> RepoResult<Vec<Asset>>;

    /// Applies `edit` to a copy of the stored asset and persists the result.
    ///
    /// Nothing is written when `edit` or validation fails.
    fn update_with(
        &self,
        id: &AssetId,
        edit: &mut dyn FnMut(&mut Asset) -> RepoResult<()>,
    ) -> RepoResult<Asset>;

    /// Replaces the stored asset with `asset`.
    fn update_asset(&self, asset: Asset) -> RepoResult<Asset> {
        let id = asset.id.clone();
        let mut replacement = Some(asset);
        self.update_with(&id, &mut |stored| {
            if let Some(next) = replacement.take() {
                *stored = next;
            }
            Ok(())
        })
    }

    /// Marks one deadline resolved. Returns whether the flag changed.
    fn resolve_deadline(&self, asset_id: &AssetId, deadline_id: DeadlineId) -> RepoResult<bool> {
        let mut changed = false;
        self.update_with(asset_id, &mut |asset| {
            changed = asset.resolve_deadline(deadline_id)?;
            Ok(())
        })?;
        Ok(changed)
    }

    /// Binds `draft` to the asset and appends it after existing deadlines.
    fn append_deadline(
        &self,
        asset_id: &AssetId,
        draft: DeadlineDraft,
        lookback_days: u32,
    ) -> RepoResult<Deadline> {
        let deadline = draft.into_deadline(asset_id, lookback_days)?;
        let mut pending = Some(deadline.clone());
        self.update_with(asset_id, &mut |asset| {
            if let Some(deadline) = pending.take() {
                asset.push_deadline(deadline)?;
            }
            Ok(())
        })?;
        Ok(deadline)
    }

    /// Copy of every asset, archived included.
    fn snapshot(&self) -> RepoResult<Vec<Asset>> {
        self.list_assets(&AssetListQuery {
            include_archived: true,
            kind: None,
        })
    }

    /// Like `get_asset`, with a missing asset reported as `NotFound`.
    fn require_asset(&self, id: &AssetId) -> RepoResult<Asset> {
        self.get_asset(id)?
            .ok_or_else(|| RepoError::NotFound(NotFoundError::Asset(id.clone())))
    }
}

/// SQLite-backed asset repository.
pub struct SqliteAssetRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssetRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AssetRepository for SqliteAssetRepository<'_> {
    fn create_asset(&self, new_asset: NewAsset, year: i32) -> RepoResult<Asset> {
        let tx = self.conn.unchecked_transaction()?;
        let id = allocate_id(&tx, year)?;
        let asset = Asset::from_new(id, new_asset)?;
        insert_asset_rows(&tx, &asset)?;
        tx.commit()?;
        Ok(asset)
    }

    fn insert_asset(&self, asset: Asset) -> RepoResult<()> {
        asset.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        if asset_exists(&tx, &asset.id)? {
            return Err(RepoError::AlreadyExists(asset.id));
        }
        insert_asset_rows(&tx, &asset)?;
        tx.execute(
            "INSERT INTO asset_id_sequences (year, last_value) VALUES (?1, ?2)
             ON CONFLICT(year) DO UPDATE
             SET last_value = MAX(last_value, excluded.last_value);",
            params![asset.id.year(), asset.id.sequence()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_asset(&self, id: &AssetId) -> RepoResult<Option<Asset>> {
        load_asset(self.conn, id)
    }

    fn list_assets(&self, query: &AssetListQuery) -> RepoResult<Vec<Asset>> {
        let mut sql = format!("{ASSET_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_archived {
            sql.push_str(" AND status <> 'archived'");
        }

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }

        sql.push_str(" ORDER BY rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut assets = Vec::new();
        while let Some(row) = rows.next()? {
            let mut asset = parse_asset_row(row)?;
            asset.deadlines = load_deadlines(self.conn, &asset.id)?;
            asset.validate()?;
            assets.push(asset);
        }

        Ok(assets)
    }

    fn update_with(
        &self,
        id: &AssetId,
        edit: &mut dyn FnMut(&mut Asset) -> RepoResult<()>,
    ) -> RepoResult<Asset> {
        let tx = self.conn.unchecked_transaction()?;
        let previous = load_asset(&tx, id)?
            .ok_or_else(|| RepoError::NotFound(NotFoundError::Asset(id.clone())))?;

        let mut next = previous.clone();
        edit(&mut next)?;
        next.validate_update_of(&previous)?;

        let changed = tx.execute(
            "UPDATE assets
             SET
                kind = ?1,
                title = ?2,
                description = ?3,
                status = ?4,
                priority = ?5,
                jurisdictions = ?6,
                filing_date = ?7,
                expiry_date = ?8,
                inventors = ?9,
                assignee = ?10,
                application_number = ?11,
                documents = ?12,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?13;",
            params![
                next.kind.as_str(),
                next.title.as_str(),
                next.description.as_str(),
                next.status.as_str(),
                next.priority.as_str(),
                to_json(&next.jurisdictions)?,
                next.filing_date,
                next.expiry_date,
                to_json(&next.owners.inventors)?,
                next.owners.assignee.as_deref(),
                next.application_number.as_deref(),
                to_json(&next.documents)?,
                next.id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(NotFoundError::Asset(id.clone())));
        }

        ensure_deadlines_unclaimed(&tx, &next)?;
        for (position, deadline) in next.deadlines.iter().enumerate() {
            upsert_deadline(&tx, &next.id, position, deadline)?;
        }

        tx.commit()?;
        Ok(next)
    }
}

fn allocate_id(conn: &Connection, year: i32) -> RepoResult<AssetId> {
    loop {
        let sequence: u32 = conn.query_row(
            "INSERT INTO asset_id_sequences (year, last_value) VALUES (?1, 1)
             ON CONFLICT(year) DO UPDATE SET last_value = last_value + 1
             RETURNING last_value;",
            [year],
            |row| row.get(0),
        )?;
        let id = AssetId::from_parts(year, sequence)?;
        if !asset_exists(conn, &id)? {
            return Ok(id);
        }
    }
}

fn asset_exists(conn: &Connection, id: &AssetId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM assets WHERE id = ?1);",
        [id.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn insert_asset_rows(conn: &Connection, asset: &Asset) -> RepoResult<()> {
    ensure_deadlines_unclaimed(conn, asset)?;
    conn.execute(
        "INSERT INTO assets (
            id,
            kind,
            title,
            description,
            status,
            priority,
            jurisdictions,
            filing_date,
            expiry_date,
            inventors,
            assignee,
            application_number,
            documents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
        params![
            asset.id.as_str(),
            asset.kind.as_str(),
            asset.title.as_str(),
            asset.description.as_str(),
            asset.status.as_str(),
            asset.priority.as_str(),
            to_json(&asset.jurisdictions)?,
            asset.filing_date,
            asset.expiry_date,
            to_json(&asset.owners.inventors)?,
            asset.owners.assignee.as_deref(),
            asset.application_number.as_deref(),
            to_json(&asset.documents)?,
        ],
    )?;

    for (position, deadline) in asset.deadlines.iter().enumerate() {
        upsert_deadline(conn, &asset.id, position, deadline)?;
    }
    Ok(())
}

/// Fails when a deadline of `asset` is already owned by another asset.
fn ensure_deadlines_unclaimed(conn: &Connection, asset: &Asset) -> RepoResult<()> {
    let mut stmt = conn.prepare("SELECT asset_id FROM deadlines WHERE id = ?1;")?;
    for deadline in &asset.deadlines {
        let owner: Option<String> = stmt
            .query_row([deadline.id.to_string()], |row| row.get(0))
            .optional()?;
        if owner.is_some_and(|owner| owner != asset.id.as_str()) {
            return Err(ValidationError::DuplicateDeadline(deadline.id).into());
        }
    }
    Ok(())
}

/// Writes one deadline row owned by `owner`.
///
/// An existing row owned by a different asset is left untouched and the
/// write fails with `DuplicateDeadline`.
fn upsert_deadline(
    conn: &Connection,
    owner: &AssetId,
    position: usize,
    deadline: &Deadline,
) -> RepoResult<()> {
    let position = i64::try_from(position)
        .map_err(|_| RepoError::InvalidData(format!("deadline position {position} overflows")))?;
    let declared_asset_id = (deadline.asset_id != *owner).then(|| deadline.asset_id.as_str());
    let changed = conn.execute(
        "INSERT INTO deadlines (
            id,
            asset_id,
            declared_asset_id,
            position,
            kind,
            label,
            due_date,
            window_start,
            resolved
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            position = excluded.position,
            kind = excluded.kind,
            label = excluded.label,
            due_date = excluded.due_date,
            window_start = excluded.window_start,
            resolved = excluded.resolved
        WHERE deadlines.asset_id = excluded.asset_id;",
        params![
            deadline.id.to_string(),
            owner.as_str(),
            declared_asset_id,
            position,
            deadline.kind.as_str(),
            deadline.label.as_str(),
            deadline.due_date,
            deadline.window_start,
            bool_to_int(deadline.is_resolved()),
        ],
    )?;
    if changed == 0 {
        return Err(ValidationError::DuplicateDeadline(deadline.id).into());
    }
    Ok(())
}

fn load_asset(conn: &Connection, id: &AssetId) -> RepoResult<Option<Asset>> {
    let mut stmt = conn.prepare(&format!("{ASSET_SELECT_SQL} WHERE id = ?1;"))?;
    let asset = stmt
        .query_row([id.as_str()], |row| Ok(parse_asset_row(row)))
        .optional()?
        .transpose()?;

    let Some(mut asset) = asset else {
        return Ok(None);
    };
    asset.deadlines = load_deadlines(conn, &asset.id)?;
    asset.validate()?;
    Ok(Some(asset))
}

fn load_deadlines(conn: &Connection, asset_id: &AssetId) -> RepoResult<Vec<Deadline>> {
    let mut stmt = conn.prepare(
        "SELECT id, asset_id, declared_asset_id, kind, label, due_date, window_start, resolved
         FROM deadlines
         WHERE asset_id = ?1
         ORDER BY position ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([asset_id.as_str()])?;
    let mut deadlines = Vec::new();
    while let Some(row) = rows.next()? {
        deadlines.push(parse_deadline_row(row)?);
    }
    Ok(deadlines)
}

fn parse_asset_row(row: &Row<'_>) -> RepoResult<Asset> {
    let id_text: String = row.get("id")?;
    let id = AssetId::parse(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid asset id `{id_text}` in assets.id")))?;

    let jurisdictions = parse_json_column(row, "jurisdictions")?;

    let inventors = parse_json_column(row, "inventors")?;
    let documents = parse_json_column(row, "documents")?;

    Ok(Asset {
        id,
        kind: parse_column::<AssetKind>(row, "kind")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: parse_column::<AssetStatus>(row, "status")?,
        priority: parse_column::<Priority>(row, "priority")?,
        jurisdictions,
        filing_date: row.get::<_, Option<NaiveDate>>("filing_date")?,
        expiry_date: row.get::<_, Option<NaiveDate>>("expiry_date")?,
        owners: Owners {
            inventors,
            assignee: row.get("assignee")?,
        },
        application_number: row.get("application_number")?,
        documents,
        deadlines: Vec::new(),
    })
}

fn parse_deadline_row(row: &Row<'_>) -> RepoResult<Deadline> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in deadlines.id"))
    })?;

    let owner_text: String = row.get("asset_id")?;
    let declared_text: Option<String> = row.get("declared_asset_id")?;
    let (column, asset_text) = match declared_text {
        Some(declared) => ("declared_asset_id", declared),
        None => ("asset_id", owner_text),
    };
    let asset_id = AssetId::parse(&asset_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid asset id `{asset_text}` in deadlines.{column}"
        ))
    })?;

    let resolved = match row.get::<_, i64>("resolved")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid resolved value `{other}` in deadlines.resolved"
            )));
        }
    };

    let record = DeadlineRecord {
        id,
        asset_id,
        kind: parse_column(row, "kind")?,
        label: row.get("label")?,
        due_date: row.get("due_date")?,
        window_start: Some(row.get("window_start")?),
        resolved,
    };
    Deadline::try_from(record).map_err(|err| {
        RepoError::InvalidData(format!("invalid deadline {id_text}: {err}"))
    })
}

fn parse_column<T>(row: &Row<'_>, column: &'static str) -> RepoResult<T>
where
    T: FromStr<Err = ValidationError>,
{
    let text: String = row.get(column)?;
    text.parse()
        .map_err(|_| RepoError::InvalidData(format!("invalid value `{text}` in column {column}")))
}

fn parse_json_column<T>(row: &Row<'_>, column: &'static str) -> RepoResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let text: String = row.get(column)?;
    serde_json::from_str(&text).map_err(|err| {
        RepoError::InvalidData(format!("invalid JSON `{text}` in assets.{column}: {err}"))
    })
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> RepoResult<String> {
    serde_json::to_string(value).map_err(|err| RepoError::InvalidData(err.to_string()))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["assets", "deadlines", "asset_id_sequences"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
