// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use rusqlite::{Connection, OpenFlags};
use std::path::Path;

use crate::NavDataError;

// Ingest touches millions of rows in one transaction; these pragmas trade
// durability headroom for write throughput. Page size and auto-vacuum must
// be in place before the first table is created.
const PRAGMAS: &str = "
    PRAGMA page_size = 65536;
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA cache_size = -20000;
    PRAGMA temp_store = MEMORY;
    PRAGMA mmap_size = 268435456;
    PRAGMA auto_vacuum = INCREMENTAL;
    PRAGMA foreign_keys = ON;
";

// The airport row owns every subsidiary row through cascading foreign keys;
// deleting an airport is how add-on scenery replaces the base definition.
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS countries (
        country_id   INTEGER PRIMARY KEY,
        country_name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS regions (
        region_id   INTEGER PRIMARY KEY,
        region_code TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS states (
        state_id   INTEGER PRIMARY KEY,
        state_name TEXT NOT NULL,
        country_id INTEGER REFERENCES countries(country_id),
        UNIQUE (state_name, country_id)
    );

    CREATE TABLE IF NOT EXISTS cities (
        city_id    INTEGER PRIMARY KEY,
        city_name  TEXT NOT NULL,
        state_id   INTEGER REFERENCES states(state_id),
        country_id INTEGER REFERENCES countries(country_id),
        UNIQUE (city_name, state_id, country_id)
    );

    CREATE TABLE IF NOT EXISTS airports (
        icao             TEXT PRIMARY KEY,
        iata             TEXT,
        faa              TEXT,
        airport_name     TEXT,
        elevation        INTEGER,
        kind             TEXT,
        latitude         REAL,
        longitude        REAL,
        country_id       INTEGER REFERENCES countries(country_id),
        state_id         INTEGER REFERENCES states(state_id),
        city_id          INTEGER REFERENCES cities(city_id),
        region_id        INTEGER REFERENCES regions(region_id),
        transition_alt   TEXT,
        transition_level TEXT
    );

    CREATE TABLE IF NOT EXISTS runways (
        runway_id                INTEGER PRIMARY KEY AUTOINCREMENT,
        airport_icao             TEXT REFERENCES airports(icao) ON DELETE CASCADE,
        width                    REAL,
        surface                  INTEGER,
        end1_rw_number           TEXT,
        end1_lat                 REAL,
        end1_lon                 REAL,
        end1_displaced_threshold REAL,
        end1_marking_code        INTEGER,
        end1_approach_light_code INTEGER,
        end2_rw_number           TEXT,
        end2_lat                 REAL,
        end2_lon                 REAL,
        end2_displaced_threshold REAL,
        end2_marking_code        INTEGER,
        end2_approach_light_code INTEGER,
        UNIQUE (airport_icao, end1_rw_number, end2_rw_number)
    );

    CREATE TABLE IF NOT EXISTS taxi_nodes (
        node_id      INTEGER NOT NULL,
        airport_icao TEXT NOT NULL REFERENCES airports(icao) ON DELETE CASCADE,
        latitude     REAL,
        longitude    REAL,
        node_type    TEXT,
        PRIMARY KEY (airport_icao, node_id)
    );

    CREATE TABLE IF NOT EXISTS taxi_edges (
        airport_icao  TEXT NOT NULL REFERENCES airports(icao) ON DELETE CASCADE,
        start_node_id INTEGER,
        end_node_id   INTEGER,
        is_two_way    INTEGER,
        taxiway_name  TEXT,
        width_class   TEXT
    );

    CREATE TABLE IF NOT EXISTS linear_features (
        airport_icao     TEXT NOT NULL REFERENCES airports(icao) ON DELETE CASCADE,
        feature_sequence INTEGER NOT NULL,
        line_type        TEXT,
        PRIMARY KEY (airport_icao, feature_sequence)
    );

    CREATE TABLE IF NOT EXISTS linear_feature_nodes (
        airport_icao     TEXT NOT NULL REFERENCES airports(icao) ON DELETE CASCADE,
        feature_sequence INTEGER NOT NULL,
        latitude         REAL,
        longitude        REAL,
        bezier_lat       REAL,
        bezier_lon       REAL,
        node_order       INTEGER NOT NULL,
        PRIMARY KEY (airport_icao, feature_sequence, node_order)
    );

    CREATE TABLE IF NOT EXISTS startup_locations (
        location_id   INTEGER PRIMARY KEY,
        airport_icao  TEXT REFERENCES airports(icao) ON DELETE CASCADE,
        latitude      REAL,
        longitude     REAL,
        heading       REAL,
        location_type TEXT,
        ramp_name     TEXT
    );

    CREATE TABLE IF NOT EXISTS aircraft_types (
        aircraft_type_id   INTEGER PRIMARY KEY,
        aircraft_type_code TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS startup_location_aircraft_types (
        location_id      INTEGER NOT NULL
            REFERENCES startup_locations(location_id) ON DELETE CASCADE,
        aircraft_type_id INTEGER NOT NULL
            REFERENCES aircraft_types(aircraft_type_id),
        PRIMARY KEY (location_id, aircraft_type_id)
    );

    CREATE TABLE IF NOT EXISTS scenery_paths (
        path_id      INTEGER PRIMARY KEY,
        scenery_path TEXT NOT NULL UNIQUE
    );
";

/// Opens (creating if necessary) the store and applies the performance
/// pragmas. The schema is applied separately so in-memory test connections
/// can share the code path.
pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Connection, NavDataError> {
    let conn = Connection::open_with_flags(
        db_path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    conn.execute_batch(PRAGMAS)?;
    Ok(conn)
}

/// Creates every table if it does not exist yet. Safe to run on every
/// connect; the layout is recreated, never migrated.
pub fn apply_schema(conn: &Connection) -> Result<(), NavDataError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Post-ingest maintenance: refresh planner statistics and reclaim the
/// space freed by overlay deletes. Must run outside the ingest transaction.
pub fn optimize(conn: &Connection) -> Result<(), NavDataError> {
    log::info!("optimizing database");
    conn.execute_batch(
        "ANALYZE;
         VACUUM;
         PRAGMA incremental_vacuum;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = memory_conn();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for expected in [
            "aircraft_types",
            "airports",
            "cities",
            "countries",
            "linear_feature_nodes",
            "linear_features",
            "regions",
            "runways",
            "scenery_paths",
            "startup_location_aircraft_types",
            "startup_locations",
            "states",
            "taxi_edges",
            "taxi_nodes",
        ] {
            assert!(
                tables.iter().any(|t| t == expected),
                "missing table {expected}"
            );
        }
    }

    #[test]
    fn test_airport_delete_cascades() {
        let conn = memory_conn();
        apply_schema(&conn).unwrap();

        conn.execute("INSERT INTO airports (icao) VALUES ('KSEA')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO runways (airport_icao, end1_rw_number, end2_rw_number)
             VALUES ('KSEA', '16L', '34R')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO taxi_nodes (node_id, airport_icao) VALUES (1, 'KSEA')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM airports WHERE icao = 'KSEA'", [])
            .unwrap();

        let runways: i64 = conn
            .query_row("SELECT COUNT(*) FROM runways", [], |row| row.get(0))
            .unwrap();
        let nodes: i64 = conn
            .query_row("SELECT COUNT(*) FROM taxi_nodes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(runways, 0);
        assert_eq!(nodes, 0);
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("navdata.db");
        let conn = open(&db_path).unwrap();
        apply_schema(&conn).unwrap();
        assert!(db_path.exists());

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");
    }
}
