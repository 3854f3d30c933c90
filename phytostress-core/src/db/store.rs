//! The store handle and its generic statement primitive
//!
//! [`Store::execute`] never fails at the Rust level: every statement ends in a
//! tagged [`Outcome`] the caller branches on. Typed, named-field operations
//! built on top of it live in [`super::repo`].

use crate::error::Result;
use rusqlite::types::Value;
use rusqlite::{ffi, params_from_iter, Connection, ErrorCode};
use std::path::Path;

/// One result row, in column order.
pub type Row = Vec<Value>;

/// Result of running a single statement through [`Store::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A read that matched at least one row
    Rows(Vec<Row>),
    /// A read that matched nothing
    Empty,
    /// A committed mutation
    Applied {
        /// Rows inserted, updated or deleted
        changes: usize,
        /// Row id of the most recent insert on this connection
        last_insert_id: i64,
    },
    /// A uniqueness constraint rejected the statement
    Duplicate,
    /// Any other constraint, syntax or type failure
    Failure(String),
}

impl Outcome {
    /// True for `Rows`, `Empty` and `Applied`
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Rows(_) | Outcome::Empty | Outcome::Applied { .. }
        )
    }

    /// Row id produced by a successful insert
    pub fn inserted_id(&self) -> Option<i64> {
        match self {
            Outcome::Applied {
                changes,
                last_insert_id,
            } if *changes > 0 => Some(*last_insert_id),
            _ => None,
        }
    }

    /// Number of rows touched by a mutation (0 for anything else)
    pub fn changes(&self) -> usize {
        match self {
            Outcome::Applied { changes, .. } => *changes,
            _ => 0,
        }
    }

    /// Rows returned by a read; empty for every other outcome
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Outcome::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }
}

/// Owned handle to the experiment database.
///
/// One connection, opened once and dropped at shutdown. The handle is passed
/// to (or borrowed by) everything that needs the data; there is no global.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "Opening database");
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Create the tables if absent and bring the schema up to date
    pub fn initialize(&self) -> Result<()> {
        super::schema::run_migrations(&self.conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run one parameterized statement.
    ///
    /// Statements that produce columns are reads and return [`Outcome::Rows`]
    /// or [`Outcome::Empty`]. Everything else commits immediately and returns
    /// [`Outcome::Applied`].
    pub fn execute(&self, statement: &str, params: &[Value]) -> Outcome {
        match self.run(statement, params) {
            Ok(outcome) => outcome,
            Err(err) if is_unique_violation(&err) => {
                tracing::warn!(error = %err, "Duplicate entry rejected");
                Outcome::Duplicate
            }
            Err(err) => {
                tracing::warn!(
                    statement = statement.trim(),
                    params = ?params,
                    error = %err,
                    "Statement failed"
                );
                Outcome::Failure(err.to_string())
            }
        }
    }

    fn run(&self, statement: &str, params: &[Value]) -> rusqlite::Result<Outcome> {
        let mut stmt = self.conn.prepare(statement)?;
        let column_count = stmt.column_count();

        if column_count > 0 {
            let rows = stmt
                .query_map(params_from_iter(params.iter()), |row| {
                    (0..column_count)
                        .map(|i| row.get::<_, Value>(i))
                        .collect::<rusqlite::Result<Row>>()
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            if rows.is_empty() {
                Ok(Outcome::Empty)
            } else {
                Ok(Outcome::Rows(rows))
            }
        } else {
            let changes = stmt.execute(params_from_iter(params.iter()))?;
            Ok(Outcome::Applied {
                changes,
                last_insert_id: self.conn.last_insert_rowid(),
            })
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, message) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || message
                        .as_deref()
                        .is_some_and(|m| m.starts_with("UNIQUE constraint failed")))
        }
        _ => false,
    }
}
