// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz
//
// Shared fixtures: fabricated X-Plane installations with a base scenery
// apt.dat and optional add-on packs.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Base scenery: KSEA (two runways, taxiway graph, one kept and one dropped
/// linear feature, one gate) and KEWR (one runway with short end numbers).
pub fn global_apt_dat() -> String {
    "\
I
1000 Generated by WorldEditor

1 433 0 0 KSEA Seattle Tacoma Intl
1302 city Seattle
1302 country USA United States
1302 state Washington
1302 region_code K1
1302 datum_lat 47.449900
1302 datum_lon -122.311800
1302 transition_alt 18000
1302 transition_level 18000
100 45.72 1 1 0.25 1 3 0 16L 47.46380 -122.30790 0 0 3 2 1 1 34R 47.43160 -122.30800 0 0 3 2 1 1
100 45.72 2 1 0.25 1 3 0 16C 47.46380 -122.31170 0 0 3 2 1 1 34C 47.43160 -122.31180 0 0 3 2 1 1
1200
1201 47.44000 -122.30000 both 1 A
1201 47.44100 -122.30100 both 2 B
1202 1 2 twoway taxiway_E A
120 taxiway centerline
111 47.44000 -122.30000 5
111 47.44100 -122.30100 5
120 apron edge
111 47.44200 -122.30200 22
111 47.44300 -122.30300 22
1300 47.44500 -122.30500 180.00 gate jets|heavy Gate A1

1 18 0 0 KEWR Newark Liberty Intl
1302 city Newark
1302 country USA United States
1302 state New Jersey
1302 datum_lat 40.692500
1302 datum_lon -74.168700
100 45.72 1 1 0.25 1 3 0 4L 40.68400 -74.16800 0 0 3 2 1 1 22R 40.70100 -74.15700 0 0 3 2 1 1
99
"
    .to_string()
}

/// Add-on redefinition of KSEA: higher elevation, a single runway, one kept
/// and one dropped linear feature, one gate of its own.
pub fn custom_ksea_apt_dat() -> String {
    "\
I
1000 Generated by WorldEditor

1 434 0 0 KSEA Seattle Tacoma Intl Enhanced
1302 city Seattle
1302 country USA United States
1302 state Washington
1302 datum_lat 47.449900
1302 datum_lon -122.311800
100 45.72 1 1 0.25 1 3 0 16L 47.46380 -122.30790 0 0 3 2 1 1 34R 47.43160 -122.30800 0 0 3 2 1 1
120 taxiway centerline
111 47.44000 -122.30000 51
111 47.44050 -122.30050 51
120 service road
111 47.44200 -122.30200 22
111 47.44300 -122.30300 22
1300 47.44600 -122.30600 90.00 gate heavy Gate B2
99
"
    .to_string()
}

/// Lays out `<root>/Global Scenery/Global Airports/Earth nav data/apt.dat`
/// plus one pack directory per `(name, content)` pair under Custom Scenery.
pub fn xplane_root_with(global: &str, customs: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_apt(
        dir.path(),
        "Global Scenery/Global Airports/Earth nav data",
        global,
    );
    for (pack, content) in customs {
        write_apt(
            dir.path(),
            &format!("Custom Scenery/{pack}/Earth nav data"),
            content,
        );
    }
    dir
}

pub fn add_custom_pack(root: &Path, pack: &str, content: &str) {
    write_apt(root, &format!("Custom Scenery/{pack}/Earth nav data"), content);
}

fn write_apt(root: &Path, rel: &str, content: &str) {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("apt.dat"), content).unwrap();
}

pub fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("navdata.db")
}
