// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum AirportKind {
    Land,
    Seaplane,
    Heliport,
}

impl AirportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AirportKind::Land => "land",
            AirportKind::Seaplane => "seaplane",
            AirportKind::Heliport => "heliport",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "land" => Some(AirportKind::Land),
            "seaplane" => Some(AirportKind::Seaplane),
            "heliport" => Some(AirportKind::Heliport),
            _ => None,
        }
    }
}

/// Airport header plus its merged `1302` metadata rows. Fields absent from
/// the source file stay `None` and persist as SQL NULL.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AirportMeta {
    pub icao: Option<String>,
    pub iata: Option<String>,
    pub faa: Option<String>,
    pub airport_name: Option<String>,
    pub elevation: Option<i64>,
    pub kind: Option<AirportKind>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub transition_alt: Option<String>,
    pub transition_level: Option<String>,
}

impl AirportMeta {
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.airport_name
            .as_deref()
            .or(self.icao.as_deref())
            .unwrap_or("Unknown Airport")
    }
}

/// One end of a runway as laid out on the `100` row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunwayEnd {
    pub rw_number: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub displaced_threshold: Option<f64>,
    pub marking_code: Option<i64>,
    pub approach_light_code: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunwayData {
    pub airport_icao: Option<String>,
    pub width: Option<f64>,
    pub surface: Option<i64>,
    pub end1: RunwayEnd,
    pub end2: RunwayEnd,
}

impl RunwayData {
    pub fn full_runway_name(&self) -> String {
        format!(
            "{}/{}",
            self.end1.rw_number.as_deref().unwrap_or("??"),
            self.end2.rw_number.as_deref().unwrap_or("??")
        )
    }

    /// Great-circle length between the two thresholds, 0.0 when either end
    /// has no coordinates.
    pub fn length_m(&self) -> f64 {
        match (self.end1.lat, self.end1.lon, self.end2.lat, self.end2.lon) {
            (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) => {
                haversine_m(lat1, lon1, lat2, lon2)
            }
            _ => 0.0,
        }
    }

    pub fn length_ft(&self) -> f64 {
        self.length_m() * 3.28084
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaxiwayNode {
    pub airport_icao: Option<String>,
    pub node_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub node_kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaxiwayEdge {
    pub airport_icao: Option<String>,
    pub start_node_id: Option<i64>,
    pub end_node_id: Option<i64>,
    pub is_two_way: Option<bool>,
    pub width_class: Option<String>,
    pub taxiway_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearFeature {
    pub airport_icao: Option<String>,
    pub feature_sequence: Option<i64>,
    pub line_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearFeatureNode {
    pub airport_icao: Option<String>,
    pub feature_sequence: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bezier_lat: Option<f64>,
    pub bezier_lon: Option<f64>,
    pub node_order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StartupLocation {
    pub airport_icao: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub heading: Option<f64>,
    pub kind: Option<String>,
    pub ramp_name: Option<String>,
    /// Pipe-delimited as in the source file (`jets|heavy|props`); split at
    /// load time.
    pub aircraft_types: Option<String>,
}

/// Everything parsed out of one apt.dat file, each kind in file order.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub airports: Vec<AirportMeta>,
    pub runways: Vec<RunwayData>,
    pub taxiway_nodes: Vec<TaxiwayNode>,
    pub taxiway_edges: Vec<TaxiwayEdge>,
    pub linear_features: Vec<LinearFeature>,
    pub linear_feature_nodes: Vec<LinearFeatureNode>,
    pub startup_locations: Vec<StartupLocation>,
}

impl ParsedFile {
    pub fn record_count(&self) -> usize {
        self.airports.len()
            + self.runways.len()
            + self.taxiway_nodes.len()
            + self.taxiway_edges.len()
            + self.linear_features.len()
            + self.linear_feature_nodes.len()
            + self.startup_locations.len()
    }
}

/// Haversine distance in meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let r = 6371000.0; // Earth radius in meters
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    r * c
}
