// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use crate::records::ParsedFile;

/// Row counts accumulated over one `parse_and_load` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub files_parsed: usize,
    pub files_skipped: usize,
    pub airports: usize,
    pub airports_replaced: usize,
    pub airports_skipped: usize,
    pub runways: usize,
    pub taxiway_nodes: usize,
    pub taxiway_edges: usize,
    pub linear_features: usize,
    pub linear_feature_nodes: usize,
    pub startup_locations: usize,
}

/// Whether `path` is already recorded in the incremental-reparse ledger.
pub fn is_scenery_path_loaded(conn: &Connection, path: &Path) -> rusqlite::Result<bool> {
    let value = path.to_string_lossy();
    let found = conn
        .query_row(
            "SELECT path_id FROM scenery_paths WHERE scenery_path = ?1",
            [value.as_ref()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Records `path` in the ledger. The row shares the ingest transaction, so
/// an aborted run forgets the path again.
pub fn record_scenery_path(conn: &Connection, path: &Path) -> rusqlite::Result<()> {
    let value = path.to_string_lossy();
    conn.execute(
        "INSERT OR IGNORE INTO scenery_paths (scenery_path) VALUES (?1)",
        [value.as_ref()],
    )?;
    Ok(())
}

/// Writes one parsed file in foreign-key dependency order: airports first,
/// then everything that references them. Must be called inside the ingest
/// transaction.
///
/// `airports_in_tx` carries the ICAOs written earlier in the same
/// transaction so an add-on can also replace an airport that another add-on
/// (or the base file) contributed moments ago.
pub fn insert_parsed_file(
    conn: &Connection,
    parsed: &ParsedFile,
    is_overlay: bool,
    airports_in_tx: &mut HashSet<String>,
    stats: &mut LoadStats,
) -> rusqlite::Result<()> {
    insert_airports(conn, parsed, is_overlay, airports_in_tx, stats)?;
    insert_runways(conn, parsed, stats)?;
    insert_taxiway_nodes(conn, parsed, stats)?;
    insert_taxiway_edges(conn, parsed, stats)?;
    insert_linear_features(conn, parsed, stats)?;
    insert_linear_feature_nodes(conn, parsed, stats)?;
    insert_startup_locations(conn, parsed, stats)?;
    Ok(())
}

fn clean_icao(icao: &Option<String>) -> Option<&str> {
    icao.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn insert_airports(
    conn: &Connection,
    parsed: &ParsedFile,
    is_overlay: bool,
    airports_in_tx: &mut HashSet<String>,
    stats: &mut LoadStats,
) -> rusqlite::Result<()> {
    let mut check = conn.prepare("SELECT icao FROM airports WHERE icao = ?1")?;
    let mut delete = conn.prepare("DELETE FROM airports WHERE icao = ?1")?;
    let mut insert = conn.prepare(
        "INSERT OR REPLACE INTO airports
         (icao, iata, faa, airport_name, elevation, kind, latitude, longitude,
          country_id, state_id, city_id, region_id, transition_alt, transition_level)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )?;

    for airport in &parsed.airports {
        let icao = match clean_icao(&airport.icao) {
            Some(icao) => icao.to_string(),
            None => {
                log::debug!("skipping airport without ICAO: {}", airport.display_name());
                stats.airports_skipped += 1;
                continue;
            }
        };

        if is_overlay {
            let exists_in_db = check
                .query_row([icao.as_str()], |row| row.get::<_, String>(0))
                .optional()?
                .is_some();
            if exists_in_db || airports_in_tx.contains(&icao) {
                // Add-on scenery fully replaces the airport; the cascading
                // foreign keys take the old runways, taxiway graph, linear
                // features and startups with it.
                delete.execute([icao.as_str()])?;
                stats.airports_replaced += 1;
                log::debug!("replacing airport {icao} with add-on definition");
            }
        }

        let country_id = match airport.country.as_deref().filter(|c| !c.is_empty()) {
            Some(country) => Some(get_or_create_country(conn, country)?),
            None => None,
        };
        let region_id = match airport.region.as_deref().filter(|r| !r.is_empty()) {
            Some(region) => Some(get_or_create_region(conn, region)?),
            None => None,
        };
        // A state only makes sense inside a country, a city inside both.
        let state_id = match (airport.state.as_deref().filter(|s| !s.is_empty()), country_id) {
            (Some(state), Some(country_id)) => {
                Some(get_or_create_state(conn, state, country_id)?)
            }
            _ => None,
        };
        let city_id = match (
            airport.city.as_deref().filter(|c| !c.is_empty()),
            state_id,
            country_id,
        ) {
            (Some(city), Some(state_id), Some(country_id)) => {
                Some(get_or_create_city(conn, city, state_id, country_id)?)
            }
            _ => None,
        };

        insert.execute(params![
            icao,
            airport.iata,
            airport.faa,
            airport.airport_name,
            airport.elevation,
            airport.kind.map(|k| k.as_str()),
            airport.latitude,
            airport.longitude,
            country_id,
            state_id,
            city_id,
            region_id,
            airport.transition_alt,
            airport.transition_level,
        ])?;

        airports_in_tx.insert(icao);
        stats.airports += 1;
    }
    Ok(())
}

fn insert_runways(
    conn: &Connection,
    parsed: &ParsedFile,
    stats: &mut LoadStats,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO runways
         (airport_icao, width, surface,
          end1_rw_number, end1_lat, end1_lon, end1_displaced_threshold,
          end1_marking_code, end1_approach_light_code,
          end2_rw_number, end2_lat, end2_lon, end2_displaced_threshold,
          end2_marking_code, end2_approach_light_code)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
    )?;

    for runway in &parsed.runways {
        let Some(icao) = clean_icao(&runway.airport_icao) else {
            continue;
        };
        stmt.execute(params![
            icao,
            runway.width,
            runway.surface,
            runway.end1.rw_number,
            runway.end1.lat,
            runway.end1.lon,
            runway.end1.displaced_threshold,
            runway.end1.marking_code,
            runway.end1.approach_light_code,
            runway.end2.rw_number,
            runway.end2.lat,
            runway.end2.lon,
            runway.end2.displaced_threshold,
            runway.end2.marking_code,
            runway.end2.approach_light_code,
        ])?;
        stats.runways += 1;
    }
    Ok(())
}

fn insert_taxiway_nodes(
    conn: &Connection,
    parsed: &ParsedFile,
    stats: &mut LoadStats,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO taxi_nodes
         (node_id, airport_icao, latitude, longitude, node_type)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    for node in &parsed.taxiway_nodes {
        let Some(icao) = clean_icao(&node.airport_icao) else {
            continue;
        };
        let Some(node_id) = node.node_id else {
            log::debug!("skipping taxi node without id at {icao}");
            continue;
        };
        stmt.execute(params![
            node_id,
            icao,
            node.latitude,
            node.longitude,
            node.node_kind,
        ])?;
        stats.taxiway_nodes += 1;
    }
    Ok(())
}

fn insert_taxiway_edges(
    conn: &Connection,
    parsed: &ParsedFile,
    stats: &mut LoadStats,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO taxi_edges
         (airport_icao, start_node_id, end_node_id, is_two_way, taxiway_name, width_class)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for edge in &parsed.taxiway_edges {
        let Some(icao) = clean_icao(&edge.airport_icao) else {
            continue;
        };
        stmt.execute(params![
            icao,
            edge.start_node_id,
            edge.end_node_id,
            edge.is_two_way,
            edge.taxiway_name,
            edge.width_class,
        ])?;
        stats.taxiway_edges += 1;
    }
    Ok(())
}

fn insert_linear_features(
    conn: &Connection,
    parsed: &ParsedFile,
    stats: &mut LoadStats,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO linear_features
         (airport_icao, feature_sequence, line_type)
         VALUES (?1, ?2, ?3)",
    )?;

    for feature in &parsed.linear_features {
        let Some(icao) = clean_icao(&feature.airport_icao) else {
            continue;
        };
        stmt.execute(params![icao, feature.feature_sequence, feature.line_type])?;
        stats.linear_features += 1;
    }
    Ok(())
}

fn insert_linear_feature_nodes(
    conn: &Connection,
    parsed: &ParsedFile,
    stats: &mut LoadStats,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO linear_feature_nodes
         (airport_icao, feature_sequence, latitude, longitude,
          bezier_lat, bezier_lon, node_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for node in &parsed.linear_feature_nodes {
        let Some(icao) = clean_icao(&node.airport_icao) else {
            continue;
        };
        stmt.execute(params![
            icao,
            node.feature_sequence,
            node.latitude,
            node.longitude,
            node.bezier_lat,
            node.bezier_lon,
            node.node_order,
        ])?;
        stats.linear_feature_nodes += 1;
    }
    Ok(())
}

fn insert_startup_locations(
    conn: &Connection,
    parsed: &ParsedFile,
    stats: &mut LoadStats,
) -> rusqlite::Result<()> {
    let mut location_stmt = conn.prepare(
        "INSERT INTO startup_locations
         (airport_icao, latitude, longitude, heading, location_type, ramp_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut type_stmt =
        conn.prepare("INSERT OR IGNORE INTO aircraft_types (aircraft_type_code) VALUES (?1)")?;
    let mut junction_stmt = conn.prepare(
        "INSERT OR IGNORE INTO startup_location_aircraft_types (location_id, aircraft_type_id)
         SELECT ?1, aircraft_type_id FROM aircraft_types WHERE aircraft_type_code = ?2",
    )?;

    for location in &parsed.startup_locations {
        let Some(icao) = clean_icao(&location.airport_icao) else {
            continue;
        };
        location_stmt.execute(params![
            icao,
            location.latitude,
            location.longitude,
            location.heading,
            location.kind,
            location.ramp_name,
        ])?;
        let location_id = conn.last_insert_rowid();
        stats.startup_locations += 1;

        if let Some(types) = &location.aircraft_types {
            for code in types.split('|').filter(|code| !code.is_empty()) {
                type_stmt.execute([code])?;
                junction_stmt.execute(params![location_id, code])?;
            }
        }
    }
    Ok(())
}

// Lookup ids are resolved per airport with two statements per miss; the
// UNIQUE constraints keep ids stable within (and across) transactions.

fn get_or_create_country(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
    if let Some(id) = conn
        .query_row(
            "SELECT country_id FROM countries WHERE country_name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?
    {
        return Ok(id);
    }
    conn.execute("INSERT INTO countries (country_name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

fn get_or_create_region(conn: &Connection, code: &str) -> rusqlite::Result<i64> {
    if let Some(id) = conn
        .query_row(
            "SELECT region_id FROM regions WHERE region_code = ?1",
            [code],
            |row| row.get(0),
        )
        .optional()?
    {
        return Ok(id);
    }
    conn.execute("INSERT INTO regions (region_code) VALUES (?1)", [code])?;
    Ok(conn.last_insert_rowid())
}

fn get_or_create_state(conn: &Connection, name: &str, country_id: i64) -> rusqlite::Result<i64> {
    if let Some(id) = conn
        .query_row(
            "SELECT state_id FROM states WHERE state_name = ?1 AND country_id = ?2",
            params![name, country_id],
            |row| row.get(0),
        )
        .optional()?
    {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO states (state_name, country_id) VALUES (?1, ?2)",
        params![name, country_id],
    )?;
    Ok(conn.last_insert_rowid())
}

fn get_or_create_city(
    conn: &Connection,
    name: &str,
    state_id: i64,
    country_id: i64,
) -> rusqlite::Result<i64> {
    if let Some(id) = conn
        .query_row(
            "SELECT city_id FROM cities
             WHERE city_name = ?1 AND state_id = ?2 AND country_id = ?3",
            params![name, state_id, country_id],
            |row| row.get(0),
        )
        .optional()?
    {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO cities (city_name, state_id, country_id) VALUES (?1, ?2, ?3)",
        params![name, state_id, country_id],
    )?;
    Ok(conn.last_insert_rowid())
}
