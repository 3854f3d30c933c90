//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! Version 1 is the historical table layout; data files created before
//! versioning was introduced report version 0 and pass through it unchanged
//! because every statement is `IF NOT EXISTS`.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: experiments, treatments, measurements
    r#"
    CREATE TABLE IF NOT EXISTS experiments (
        id INTEGER PRIMARY KEY,
        experiment_code TEXT UNIQUE NOT NULL,
        experiment_name TEXT NOT NULL,
        plant_species TEXT NOT NULL,
        stress_type TEXT NOT NULL,
        researcher TEXT,
        start_date TEXT,
        end_date TEXT,
        description TEXT,
        status TEXT DEFAULT 'active',
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS treatments (
        id INTEGER PRIMARY KEY,
        experiment_id INTEGER NOT NULL,
        treatment_name TEXT NOT NULL,
        treatment_type TEXT NOT NULL,
        stress_level TEXT,
        concentration REAL,
        duration_days INTEGER,
        temperature REAL,
        description TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (experiment_id) REFERENCES experiments (id) ON DELETE CASCADE,
        UNIQUE(experiment_id, treatment_name)
    );

    CREATE TABLE IF NOT EXISTS measurements (
        id INTEGER PRIMARY KEY,
        treatment_id INTEGER NOT NULL,
        measurement_date TEXT NOT NULL,
        plant_height REAL,
        leaf_area REAL,
        chlorophyll_content REAL,
        photosynthesis_rate REAL,
        stomatal_conductance REAL,
        root_length REAL,
        biomass_fresh REAL,
        biomass_dry REAL,
        water_content REAL,
        notes TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (treatment_id) REFERENCES treatments (id) ON DELETE CASCADE
    );
    "#,
    // Version 2: lookup indexes for the per-experiment joins
    r#"
    CREATE INDEX IF NOT EXISTS idx_treatments_experiment ON treatments(experiment_id);
    CREATE INDEX IF NOT EXISTS idx_measurements_treatment ON measurements(treatment_id);
    CREATE INDEX IF NOT EXISTS idx_measurements_date ON measurements(treatment_id, measurement_date);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.pragma_update(None, "user_version", version)?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["experiments", "treatments", "measurements"] {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_preversioned_file_is_adopted() {
        let conn = Connection::open_in_memory().unwrap();
        // A data file written before user_version tracking
        conn.execute_batch(MIGRATIONS[0]).unwrap();
        conn.execute(
            "INSERT INTO experiments (experiment_code, experiment_name, plant_species, stress_type)
             VALUES ('EXP001', 'Legacy', 'Arabidopsis thaliana', 'drought')",
            [],
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM experiments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let fk_targets = |table: &str| -> Vec<String> {
            conn.prepare(&format!("PRAGMA foreign_key_list({})", table))
                .unwrap()
                .query_map([], |row| row.get::<_, String>(2))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };

        assert_eq!(fk_targets("treatments"), vec!["experiments".to_string()]);
        assert_eq!(fk_targets("measurements"), vec!["treatments".to_string()]);
    }
}
