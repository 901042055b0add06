//! SQLite-backed aggregate store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, ffi, params};
use thiserror::Error;

use crate::{Child, RepositoryMarker, Root, Section};

use super::schema::{SchemaError, initialise_schema};
use super::{AggregateStore, StoreError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised by [`SqliteAggregateStore`].
#[derive(Debug, Error)]
pub enum SqliteAggregateStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The schema could not be created or has the wrong version.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A statement failed.
    #[error("SQLite error: {source}")]
    Sqlite {
        /// What the store was doing.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The children of an aggregate could not be encoded or decoded.
    #[error("failed to encode or decode children of {section} aggregate {id}: {source}")]
    Document {
        /// Section of the aggregate.
        section: Section,
        /// Root id of the aggregate.
        id: String,
        /// JSON failure.
        #[source]
        source: serde_json::Error,
    },
    /// A stored column held a value that cannot be decoded.
    #[error("stored {what} '{value}' is invalid")]
    Corrupt {
        /// Which column was invalid.
        what: &'static str,
        /// Raw stored value.
        value: String,
    },
}

impl From<SqliteAggregateStoreError> for StoreError {
    fn from(error: SqliteAggregateStoreError) -> Self {
        let operation = match &error {
            SqliteAggregateStoreError::OpenDatabase { .. } => "open database",
            SqliteAggregateStoreError::Schema(_) => "initialise schema",
            SqliteAggregateStoreError::Sqlite { operation, .. } => *operation,
            SqliteAggregateStoreError::Document { .. } => "convert aggregate document",
            SqliteAggregateStoreError::Corrupt { .. } => "decode stored value",
        };
        Self::backend(operation, error)
    }
}

fn sqlite(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> SqliteAggregateStoreError {
    move |source| SqliteAggregateStoreError::Sqlite { operation, source }
}

/// Aggregate store persisting each root as one row with its children as
/// JSON.
///
/// Every write is a single statement or transaction, so an interrupted run
/// never leaves a half-written aggregate behind.
#[derive(Debug)]
pub struct SqliteAggregateStore {
    connection: Connection,
}

impl SqliteAggregateStore {
    /// Open (creating if needed) the database at `path` and ensure its
    /// schema.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or carries an incompatible
    /// schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteAggregateStoreError> {
        let path = path.as_ref();
        let connection =
            Connection::open(path).map_err(|source| SqliteAggregateStoreError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::with_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Fails when SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, SqliteAggregateStoreError> {
        let connection = Connection::open_in_memory().map_err(|source| {
            SqliteAggregateStoreError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            }
        })?;
        Self::with_connection(connection)
    }

    fn with_connection(mut connection: Connection) -> Result<Self, SqliteAggregateStoreError> {
        initialise_schema(&mut connection)?;
        Ok(Self { connection })
    }

    fn write_root(
        connection: &Connection,
        section: Section,
        root: &Root,
    ) -> Result<(), StoreError> {
        let children = serde_json::to_string(&root.children).map_err(|source| {
            SqliteAggregateStoreError::Document {
                section,
                id: root.id.clone(),
                source,
            }
        })?;
        connection
            .execute(
                "INSERT INTO aggregates (section, id, name, hash, children)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![section.as_str(), root.id, root.name, root.hash, children],
            )
            .map_err(|error| {
                if is_duplicate_key(&error) {
                    StoreError::Duplicate {
                        section,
                        id: root.id.clone(),
                    }
                } else {
                    sqlite("insert aggregate")(error).into()
                }
            })?;
        Ok(())
    }
}

struct StoredRoot {
    id: String,
    name: String,
    hash: String,
    children: String,
}

impl StoredRoot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            hash: row.get(2)?,
            children: row.get(3)?,
        })
    }

    fn decode(self, section: Section) -> Result<Root, SqliteAggregateStoreError> {
        let children: Vec<Child> = serde_json::from_str(&self.children).map_err(|source| {
            SqliteAggregateStoreError::Document {
                section,
                id: self.id.clone(),
                source,
            }
        })?;
        Ok(Root {
            id: self.id,
            name: self.name,
            children,
            hash: self.hash,
        })
    }
}

/// Only a primary-key clash counts as a duplicate; CHECK failures stay
/// backend errors.
fn is_duplicate_key(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn parse_date(value: Option<String>) -> Result<Option<NaiveDate>, SqliteAggregateStoreError> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|_| {
                SqliteAggregateStoreError::Corrupt {
                    what: "marker version",
                    value: raw,
                }
            })
        })
        .transpose()
}

fn parse_timestamp(
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, SqliteAggregateStoreError> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|stamp| stamp.with_timezone(&Utc))
                .map_err(|_| SqliteAggregateStoreError::Corrupt {
                    what: "marker timestamp",
                    value: raw,
                })
        })
        .transpose()
}

impl AggregateStore for SqliteAggregateStore {
    fn find_root(&self, section: Section, id: &str) -> Result<Option<Root>, StoreError> {
        let stored = self
            .connection
            .query_row(
                "SELECT id, name, hash, children FROM aggregates
                 WHERE section = ?1 AND id = ?2",
                params![section.as_str(), id],
                StoredRoot::from_row,
            )
            .optional()
            .map_err(sqlite("read aggregate"))?;
        Ok(stored.map(|row| row.decode(section)).transpose()?)
    }

    fn insert_root(&mut self, section: Section, root: &Root) -> Result<(), StoreError> {
        Self::write_root(&self.connection, section, root)
    }

    fn replace_root(&mut self, section: Section, root: &Root) -> Result<(), StoreError> {
        let transaction = self
            .connection
            .transaction()
            .map_err(sqlite("begin replace transaction"))?;
        let removed = transaction
            .execute(
                "DELETE FROM aggregates WHERE section = ?1 AND id = ?2",
                params![section.as_str(), root.id],
            )
            .map_err(sqlite("delete aggregate"))?;
        if removed == 0 {
            return Err(StoreError::Missing {
                section,
                id: root.id.clone(),
            });
        }
        Self::write_root(&transaction, section, root)?;
        transaction
            .commit()
            .map_err(sqlite("commit replace transaction"))?;
        Ok(())
    }

    fn list_roots(&self, section: Section) -> Result<Vec<Root>, StoreError> {
        let mut statement = self
            .connection
            .prepare(
                "SELECT id, name, hash, children FROM aggregates
                 WHERE section = ?1 ORDER BY id",
            )
            .map_err(sqlite("prepare aggregate listing"))?;
        let rows = statement
            .query_map([section.as_str()], StoredRoot::from_row)
            .map_err(sqlite("list aggregates"))?;
        let mut roots = Vec::new();
        for row in rows {
            let stored = row.map_err(sqlite("read aggregate row"))?;
            roots.push(stored.decode(section)?);
        }
        Ok(roots)
    }

    fn load_marker(&self) -> Result<Option<RepositoryMarker>, StoreError> {
        let stored = self
            .connection
            .query_row(
                "SELECT version, last_update, refreshing FROM repository_marker
                 WHERE singleton = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(sqlite("read repository marker"))?;
        let Some((version, last_update, refreshing)) = stored else {
            return Ok(None);
        };
        Ok(Some(RepositoryMarker {
            version: parse_date(version)?,
            last_update: parse_timestamp(last_update)?,
            refreshing,
        }))
    }

    fn save_marker(&mut self, marker: &RepositoryMarker) -> Result<(), StoreError> {
        let version = marker
            .version
            .map(|date| date.format(DATE_FORMAT).to_string());
        let last_update = marker.last_update.map(|stamp| stamp.to_rfc3339());
        self.connection
            .execute(
                "INSERT INTO repository_marker (singleton, version, last_update, refreshing)
                 VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT (singleton) DO UPDATE SET
                    version = excluded.version,
                    last_update = excluded.last_update,
                    refreshing = excluded.refreshing",
                params![version, last_update, marker.refreshing],
            )
            .map_err(sqlite("write repository marker"))?;
        Ok(())
    }
}
