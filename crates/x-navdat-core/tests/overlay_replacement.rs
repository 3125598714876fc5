// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz
//
// Add-on scenery fully replaces a base airport: the airport row and every
// dependent row come from the add-on afterwards.

mod common;

use x_navdat_core::NavDataManager;

fn subsidiary_counts(db: &std::path::Path, icao: &str) -> (i64, i64, i64, i64, i64) {
    let conn = rusqlite::Connection::open(db).unwrap();
    let count = |sql: &str| -> i64 {
        conn.query_row(sql, [icao], |row| row.get(0)).unwrap()
    };
    (
        count("SELECT COUNT(*) FROM runways WHERE airport_icao = ?1"),
        count("SELECT COUNT(*) FROM taxi_nodes WHERE airport_icao = ?1"),
        count("SELECT COUNT(*) FROM taxi_edges WHERE airport_icao = ?1"),
        count("SELECT COUNT(*) FROM linear_features WHERE airport_icao = ?1"),
        count("SELECT COUNT(*) FROM startup_locations WHERE airport_icao = ?1"),
    )
}

#[test]
fn test_addon_replaces_base_airport_completely() {
    let root = common::xplane_root_with(
        &common::global_apt_dat(),
        &[("KSEA_Enhanced", &common::custom_ksea_apt_dat())],
    );
    let db = common::db_path(&root);

    let mut manager = NavDataManager::new(root.path());
    manager.scan().unwrap();
    manager.connect(&db).unwrap();
    manager.parse_and_load(false).unwrap();

    let query = manager.airport_query().unwrap();
    let ksea = query.by_icao("KSEA").unwrap().unwrap();
    assert_eq!(ksea.elevation, Some(434));
    drop(manager);

    // Only the add-on's dependents remain: one runway, no taxiway graph,
    // one linear feature, one gate.
    let (runways, nodes, edges, features, startups) = subsidiary_counts(&db, "KSEA");
    assert_eq!(runways, 1);
    assert_eq!(nodes, 0);
    assert_eq!(edges, 0);
    assert_eq!(features, 1);
    assert_eq!(startups, 1);

    let conn = rusqlite::Connection::open(&db).unwrap();
    let ramp: String = conn
        .query_row(
            "SELECT ramp_name FROM startup_locations WHERE airport_icao = 'KSEA'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(ramp, "Gate B2");
}

#[test]
fn test_base_only_airport_survives_overlay_of_another() {
    let root = common::xplane_root_with(
        &common::global_apt_dat(),
        &[("KSEA_Enhanced", &common::custom_ksea_apt_dat())],
    );
    let db = common::db_path(&root);

    let mut manager = NavDataManager::new(root.path());
    manager.scan().unwrap();
    manager.connect(&db).unwrap();
    manager.parse_and_load(false).unwrap();
    drop(manager);

    let (runways, _, _, _, _) = subsidiary_counts(&db, "KEWR");
    assert_eq!(runways, 1);
}

#[test]
fn test_later_addon_wins_within_one_transaction() {
    // Two add-on packs declare the same airport; pack order is the load
    // order, so the later one must win even though the earlier one was only
    // written moments before in the same transaction.
    let early = "\
1 100 0 0 LFPG Paris Charles de Gaulle
1302 country France
100 45.0 1 1 0.25 1 3 0 08L 49.02700 2.56100 0 0 3 2 1 1 26R 49.02600 2.58600 0 0 3 2 1 1
99
";
    let late = "\
1 392 0 0 LFPG Paris Charles de Gaulle v2
1302 country France
100 60.0 2 1 0.25 1 3 0 09L 49.01900 2.52400 0 0 3 2 1 1 27R 49.01800 2.55000 0 0 3 2 1 1
100 60.0 2 1 0.25 1 3 0 09R 49.01500 2.52400 0 0 3 2 1 1 27L 49.01400 2.55000 0 0 3 2 1 1
99
";
    let root = common::xplane_root_with(
        &common::global_apt_dat(),
        &[("A_LFPG_Old", early), ("B_LFPG_New", late)],
    );
    let db = common::db_path(&root);

    let mut manager = NavDataManager::new(root.path());
    manager.scan().unwrap();
    manager.connect(&db).unwrap();
    let stats = manager.parse_and_load(false).unwrap();
    assert_eq!(stats.airports_replaced, 1);

    let query = manager.airport_query().unwrap();
    let lfpg = query.by_icao("LFPG").unwrap().unwrap();
    assert_eq!(lfpg.elevation, Some(392));
    assert_eq!(
        lfpg.airport_name.as_deref(),
        Some("Paris Charles de Gaulle v2")
    );
    assert_eq!(query.runways_for_airport("LFPG").unwrap().len(), 2);
}
