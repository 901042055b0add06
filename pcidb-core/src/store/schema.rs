use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

/// Version recorded in `pcidb_schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Create the aggregate and marker tables inside `connection`.
///
/// Re-running against an initialised database is a no-op. A database
/// stamped with a different schema version is rejected so migrations can be
/// applied explicitly.
///
/// # Errors
///
/// Returns [`SchemaError`] when a statement fails or the recorded version
/// does not match [`SCHEMA_VERSION`].
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use pcidb_core::store::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create schema");
///
/// let version: i64 = conn
///     .query_row("SELECT version FROM pcidb_schema_version LIMIT 1", [], |row| row.get(0))
///     .expect("read schema version");
/// assert_eq!(version, 1);
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_tables(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create aggregates",
        "CREATE TABLE IF NOT EXISTS aggregates (
            section TEXT NOT NULL CHECK (section IN ('devices', 'classes')),
            id TEXT NOT NULL CHECK (length(id) > 0),
            name TEXT NOT NULL,
            hash TEXT NOT NULL,
            children TEXT NOT NULL,
            PRIMARY KEY (section, id)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create repository_marker",
        "CREATE TABLE IF NOT EXISTS repository_marker (
            singleton INTEGER PRIMARY KEY CHECK (singleton = 1),
            version TEXT,
            last_update TEXT,
            refreshing INTEGER NOT NULL CHECK (refreshing IN (0, 1))
        )",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS pcidb_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM pcidb_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO pcidb_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

/// Errors raised when initialising the aggregate schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A schema statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Name of the failed step.
        step: &'static str,
        /// Error returned by SQLite.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible release.
    #[error(
        "expected pcidb schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version stored in the database.
        found: i64,
    },
}
