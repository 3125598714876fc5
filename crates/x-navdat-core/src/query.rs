// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use rusqlite::types::ToSql;
use rusqlite::{Connection, Row};

use crate::records::{haversine_m, AirportKind, AirportMeta, RunwayData, RunwayEnd};
use crate::NavDataError;

const KM_PER_DEG_LAT: f64 = 111.2;

const AIRPORT_SELECT: &str = "SELECT a.icao, a.iata, a.faa, a.airport_name, a.elevation, a.kind,
        a.latitude, a.longitude, c.country_name, s.state_name, ci.city_name,
        r.region_code, a.transition_alt, a.transition_level
 FROM airports a
 LEFT JOIN countries c ON a.country_id = c.country_id
 LEFT JOIN states s ON a.state_id = s.state_id
 LEFT JOIN cities ci ON a.city_id = ci.city_id
 LEFT JOIN regions r ON a.region_id = r.region_id";

const AIRPORT_COUNT: &str = "SELECT COUNT(*)
 FROM airports a
 LEFT JOIN countries c ON a.country_id = c.country_id
 LEFT JOIN states s ON a.state_id = s.state_id
 LEFT JOIN cities ci ON a.city_id = ci.city_id
 LEFT JOIN regions r ON a.region_id = r.region_id";

const RUNWAY_SELECT: &str = "SELECT airport_icao, width, surface,
        end1_rw_number, end1_lat, end1_lon, end1_displaced_threshold,
        end1_marking_code, end1_approach_light_code,
        end2_rw_number, end2_lat, end2_lon, end2_displaced_threshold,
        end2_marking_code, end2_approach_light_code
 FROM runways";

/// Read-only façade over a connected store. Obtained from the manager after
/// `connect`; all queries run against the committed state.
pub struct AirportQuery<'conn> {
    conn: &'conn Connection,
}

impl<'conn> AirportQuery<'conn> {
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn airports(&self) -> AirportQueryBuilder<'conn> {
        AirportQueryBuilder::new(self.conn)
    }

    pub fn runways(&self) -> RunwayQueryBuilder<'conn> {
        RunwayQueryBuilder::new(self.conn)
    }

    pub fn by_icao(&self, icao: &str) -> Result<Option<AirportMeta>, NavDataError> {
        self.airports().icao(icao).first()
    }

    pub fn by_country(&self, country: &str, limit: usize) -> Result<Vec<AirportMeta>, NavDataError> {
        self.airports().country(country).max_results(limit).execute()
    }

    pub fn by_state(&self, state: &str, limit: usize) -> Result<Vec<AirportMeta>, NavDataError> {
        self.airports().state(state).max_results(limit).execute()
    }

    pub fn near(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<AirportMeta>, NavDataError> {
        self.airports()
            .near(lat, lon, radius_km)
            .max_results(limit)
            .execute()
    }

    pub fn runways_for_airport(&self, icao: &str) -> Result<Vec<RunwayData>, NavDataError> {
        self.runways().airport_icao(icao).execute()
    }

    pub fn runways_by_surface(
        &self,
        surface: i64,
        limit: usize,
    ) -> Result<Vec<RunwayData>, NavDataError> {
        self.runways().surface(surface).max_results(limit).execute()
    }
}

/// Chainable filter set over `airports`. String filters match
/// case-insensitive substrings; `kind` is an equality filter; `near` is a
/// bounding-box SQL pre-filter refined by an exact Haversine check.
pub struct AirportQueryBuilder<'conn> {
    conn: &'conn Connection,
    icao: Option<String>,
    country: Option<String>,
    state: Option<String>,
    city: Option<String>,
    kind: Option<AirportKind>,
    min_elevation: Option<i64>,
    max_elevation: Option<i64>,
    near: Option<(f64, f64, f64)>,
    limit: usize,
    order_by_icao: bool,
}

impl<'conn> AirportQueryBuilder<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            icao: None,
            country: None,
            state: None,
            city: None,
            kind: None,
            min_elevation: None,
            max_elevation: None,
            near: None,
            limit: 100,
            order_by_icao: true,
        }
    }

    pub fn icao(mut self, icao: impl Into<String>) -> Self {
        self.icao = Some(icao.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn kind(mut self, kind: AirportKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn elevation_range(mut self, min_ft: i64, max_ft: i64) -> Self {
        self.min_elevation = Some(min_ft);
        self.max_elevation = Some(max_ft);
        self
    }

    pub fn near(mut self, lat: f64, lon: f64, radius_km: f64) -> Self {
        self.near = Some((lat, lon, radius_km));
        self
    }

    pub fn max_results(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn order_by_icao(mut self, order: bool) -> Self {
        self.order_by_icao = order;
        self
    }

    fn conditions(&self) -> (Vec<&'static str>, Vec<Box<dyn ToSql>>) {
        let mut conds: Vec<&'static str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(icao) = &self.icao {
            conds.push("a.icao LIKE ?");
            params.push(Box::new(format!("%{icao}%")));
        }
        if let Some(country) = &self.country {
            conds.push("c.country_name LIKE ?");
            params.push(Box::new(format!("%{country}%")));
        }
        if let Some(state) = &self.state {
            conds.push("s.state_name LIKE ?");
            params.push(Box::new(format!("%{state}%")));
        }
        if let Some(city) = &self.city {
            conds.push("ci.city_name LIKE ?");
            params.push(Box::new(format!("%{city}%")));
        }
        if let Some(kind) = self.kind {
            conds.push("a.kind = ?");
            params.push(Box::new(kind.as_str()));
        }
        if let Some(min) = self.min_elevation {
            conds.push("a.elevation >= ?");
            params.push(Box::new(min));
        }
        if let Some(max) = self.max_elevation {
            conds.push("a.elevation <= ?");
            params.push(Box::new(max));
        }
        if let Some((lat, lon, radius_km)) = self.near {
            // Cheap degree-box around the center; the exact Haversine check
            // runs on the mapped rows.
            let lat_delta = radius_km / KM_PER_DEG_LAT;
            let lon_scale = lat.to_radians().cos().abs().max(0.01);
            let lon_delta = radius_km / (KM_PER_DEG_LAT * lon_scale);
            conds.push("a.latitude BETWEEN ? AND ?");
            params.push(Box::new(lat - lat_delta));
            params.push(Box::new(lat + lat_delta));
            conds.push("a.longitude BETWEEN ? AND ?");
            params.push(Box::new(lon - lon_delta));
            params.push(Box::new(lon + lon_delta));
        }

        (conds, params)
    }

    // Row fetch shared by `execute` and the near-aware `count`. The limit
    // only applies when the caller wants a result page; a count must see
    // every row that survives the radius check.
    fn fetch(&self, apply_limit: bool) -> Result<Vec<AirportMeta>, NavDataError> {
        let (conds, params) = self.conditions();

        let mut sql = String::from(AIRPORT_SELECT);
        if !conds.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conds.join(" AND "));
        }
        if self.order_by_icao {
            sql.push_str(" ORDER BY a.icao");
        }
        if apply_limit && self.near.is_none() && self.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", self.limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut rows = stmt.query(param_refs.as_slice())?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(map_airport_row(row)?);
        }

        if let Some((lat, lon, radius_km)) = self.near {
            results.retain(|airport| match (airport.latitude, airport.longitude) {
                (Some(a_lat), Some(a_lon)) => {
                    haversine_m(lat, lon, a_lat, a_lon) <= radius_km * 1000.0
                }
                _ => false,
            });
            if apply_limit && self.limit > 0 {
                results.truncate(self.limit);
            }
        }
        Ok(results)
    }

    pub fn execute(&self) -> Result<Vec<AirportMeta>, NavDataError> {
        self.fetch(true)
    }

    pub fn first(mut self) -> Result<Option<AirportMeta>, NavDataError> {
        self.limit = 1;
        Ok(self.execute()?.into_iter().next())
    }

    pub fn count(&self) -> Result<usize, NavDataError> {
        if self.near.is_some() {
            return Ok(self.fetch(false)?.len());
        }

        let (conds, params) = self.conditions();
        let mut sql = String::from(AIRPORT_COUNT);
        if !conds.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conds.join(" AND "));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let count: i64 = stmt.query_row(param_refs.as_slice(), |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Chainable filter set over `runways`. `airport_icao` and `surface` are
/// equality filters; `runway_number` matches either end.
pub struct RunwayQueryBuilder<'conn> {
    conn: &'conn Connection,
    airport_icao: Option<String>,
    surface: Option<i64>,
    min_width: Option<f64>,
    runway_number: Option<String>,
    limit: usize,
    order_by_icao: bool,
}

impl<'conn> RunwayQueryBuilder<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            airport_icao: None,
            surface: None,
            min_width: None,
            runway_number: None,
            limit: 100,
            order_by_icao: true,
        }
    }

    pub fn airport_icao(mut self, icao: impl Into<String>) -> Self {
        self.airport_icao = Some(icao.into());
        self
    }

    pub fn surface(mut self, surface: i64) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn min_width(mut self, width: f64) -> Self {
        self.min_width = Some(width);
        self
    }

    pub fn runway_number(mut self, number: impl Into<String>) -> Self {
        self.runway_number = Some(number.into());
        self
    }

    pub fn max_results(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn conditions(&self) -> (Vec<&'static str>, Vec<Box<dyn ToSql>>) {
        let mut conds: Vec<&'static str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(icao) = &self.airport_icao {
            conds.push("airport_icao = ?");
            params.push(Box::new(icao.clone()));
        }
        if let Some(surface) = self.surface {
            conds.push("surface = ?");
            params.push(Box::new(surface));
        }
        if let Some(width) = self.min_width {
            conds.push("width >= ?");
            params.push(Box::new(width));
        }
        if let Some(number) = &self.runway_number {
            conds.push("(end1_rw_number = ? OR end2_rw_number = ?)");
            params.push(Box::new(number.clone()));
            params.push(Box::new(number.clone()));
        }

        (conds, params)
    }

    fn build_sql(&self, select: &str, with_order_and_limit: bool) -> String {
        let (conds, _) = self.conditions();
        let mut sql = String::from(select);
        if !conds.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conds.join(" AND "));
        }
        if with_order_and_limit {
            if self.order_by_icao {
                sql.push_str(" ORDER BY airport_icao");
            }
            if self.limit > 0 {
                sql.push_str(&format!(" LIMIT {}", self.limit));
            }
        }
        sql
    }

    pub fn execute(&self) -> Result<Vec<RunwayData>, NavDataError> {
        let (_, params) = self.conditions();
        let sql = self.build_sql(RUNWAY_SELECT, true);

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut rows = stmt.query(param_refs.as_slice())?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(map_runway_row(row)?);
        }
        Ok(results)
    }

    pub fn first(mut self) -> Result<Option<RunwayData>, NavDataError> {
        self.limit = 1;
        Ok(self.execute()?.into_iter().next())
    }

    pub fn count(&self) -> Result<usize, NavDataError> {
        let (_, params) = self.conditions();
        let sql = self.build_sql("SELECT COUNT(*) FROM runways", false);

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let count: i64 = stmt.query_row(param_refs.as_slice(), |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn map_airport_row(row: &Row) -> rusqlite::Result<AirportMeta> {
    Ok(AirportMeta {
        icao: row.get(0)?,
        iata: row.get(1)?,
        faa: row.get(2)?,
        airport_name: row.get(3)?,
        elevation: row.get(4)?,
        kind: row
            .get::<_, Option<String>>(5)?
            .as_deref()
            .and_then(AirportKind::from_str),
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        country: row.get(8)?,
        state: row.get(9)?,
        city: row.get(10)?,
        region: row.get(11)?,
        transition_alt: row.get(12)?,
        transition_level: row.get(13)?,
    })
}

fn map_runway_row(row: &Row) -> rusqlite::Result<RunwayData> {
    Ok(RunwayData {
        airport_icao: row.get(0)?,
        width: row.get(1)?,
        surface: row.get(2)?,
        end1: RunwayEnd {
            rw_number: row.get(3)?,
            lat: row.get(4)?,
            lon: row.get(5)?,
            displaced_threshold: row.get(6)?,
            marking_code: row.get(7)?,
            approach_light_code: row.get(8)?,
        },
        end2: RunwayEnd {
            rw_number: row.get(9)?,
            lat: row.get(10)?,
            lon: row.get(11)?,
            displaced_threshold: row.get(12)?,
            marking_code: row.get(13)?,
            approach_light_code: row.get(14)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{self, LoadStats};
    use crate::records::{ParsedFile, RunwayData, RunwayEnd};
    use crate::store;
    use std::collections::HashSet;

    fn seeded_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        store::apply_schema(&conn).unwrap();

        let mut parsed = ParsedFile::default();

        let mut ksea = AirportMeta {
            icao: Some("KSEA".to_string()),
            airport_name: Some("Seattle Tacoma Intl".to_string()),
            elevation: Some(433),
            kind: Some(AirportKind::Land),
            latitude: Some(47.4502),
            longitude: Some(-122.3088),
            country: Some("United States".to_string()),
            state: Some("Washington".to_string()),
            city: Some("Seattle".to_string()),
            region: Some("K1".to_string()),
            ..AirportMeta::default()
        };
        ksea.transition_level = Some("FL180".to_string());
        parsed.airports.push(ksea);

        parsed.airports.push(AirportMeta {
            icao: Some("KEWR".to_string()),
            airport_name: Some("Newark Liberty Intl".to_string()),
            elevation: Some(18),
            kind: Some(AirportKind::Land),
            latitude: Some(40.6925),
            longitude: Some(-74.1687),
            country: Some("United States".to_string()),
            state: Some("New Jersey".to_string()),
            city: Some("Newark".to_string()),
            ..AirportMeta::default()
        });

        parsed.airports.push(AirportMeta {
            icao: Some("EDDF".to_string()),
            airport_name: Some("Frankfurt am Main".to_string()),
            elevation: Some(364),
            kind: Some(AirportKind::Land),
            latitude: Some(50.0333),
            longitude: Some(8.5706),
            country: Some("Germany".to_string()),
            state: Some("Hessen".to_string()),
            city: Some("Frankfurt".to_string()),
            ..AirportMeta::default()
        });

        parsed.airports.push(AirportMeta {
            icao: Some("W55".to_string()),
            airport_name: Some("Lake Union Seaplane Base".to_string()),
            elevation: Some(0),
            kind: Some(AirportKind::Seaplane),
            latitude: Some(47.6290),
            longitude: Some(-122.3390),
            country: Some("United States".to_string()),
            ..AirportMeta::default()
        });

        parsed.runways.push(RunwayData {
            airport_icao: Some("KSEA".to_string()),
            width: Some(45.72),
            surface: Some(1),
            end1: RunwayEnd {
                rw_number: Some("16L".to_string()),
                lat: Some(47.4638),
                lon: Some(-122.3079),
                ..RunwayEnd::default()
            },
            end2: RunwayEnd {
                rw_number: Some("34R".to_string()),
                lat: Some(47.4316),
                lon: Some(-122.3080),
                ..RunwayEnd::default()
            },
        });
        parsed.runways.push(RunwayData {
            airport_icao: Some("KSEA".to_string()),
            width: Some(60.0),
            surface: Some(2),
            end1: RunwayEnd {
                rw_number: Some("16C".to_string()),
                ..RunwayEnd::default()
            },
            end2: RunwayEnd {
                rw_number: Some("34C".to_string()),
                ..RunwayEnd::default()
            },
        });
        parsed.runways.push(RunwayData {
            airport_icao: Some("KEWR".to_string()),
            width: Some(45.72),
            surface: Some(1),
            end1: RunwayEnd {
                rw_number: Some("04L".to_string()),
                ..RunwayEnd::default()
            },
            end2: RunwayEnd {
                rw_number: Some("22R".to_string()),
                ..RunwayEnd::default()
            },
        });

        loader::insert_parsed_file(
            &conn,
            &parsed,
            false,
            &mut HashSet::new(),
            &mut LoadStats::default(),
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_icao_substring_filter() {
        let conn = seeded_conn();
        let q = AirportQuery::new(&conn);

        let hits = q.airports().icao("SEA").execute().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].icao.as_deref(), Some("KSEA"));
        assert_eq!(hits[0].country.as_deref(), Some("United States"));
        assert_eq!(hits[0].state.as_deref(), Some("Washington"));
        assert_eq!(hits[0].transition_level.as_deref(), Some("FL180"));
    }

    #[test]
    fn test_country_filter_is_case_insensitive() {
        let conn = seeded_conn();
        let q = AirportQuery::new(&conn);

        let hits = q.airports().country("united states").execute().unwrap();
        let icaos: Vec<_> = hits.iter().map(|a| a.icao.as_deref().unwrap()).collect();
        assert_eq!(icaos, vec!["KEWR", "KSEA", "W55"]);
    }

    #[test]
    fn test_state_city_and_kind_filters() {
        let conn = seeded_conn();
        let q = AirportQuery::new(&conn);

        let jersey = q.airports().state("Jersey").execute().unwrap();
        assert_eq!(jersey.len(), 1);
        assert_eq!(jersey[0].icao.as_deref(), Some("KEWR"));

        let frankfurt = q.airports().city("frankfurt").execute().unwrap();
        assert_eq!(frankfurt.len(), 1);
        assert_eq!(frankfurt[0].icao.as_deref(), Some("EDDF"));

        let seaplanes = q.airports().kind(AirportKind::Seaplane).execute().unwrap();
        assert_eq!(seaplanes.len(), 1);
        assert_eq!(seaplanes[0].icao.as_deref(), Some("W55"));
    }

    #[test]
    fn test_elevation_range() {
        let conn = seeded_conn();
        let q = AirportQuery::new(&conn);

        let mid = q.airports().elevation_range(300, 500).execute().unwrap();
        let icaos: Vec<_> = mid.iter().map(|a| a.icao.as_deref().unwrap()).collect();
        assert_eq!(icaos, vec!["EDDF", "KSEA"]);
    }

    #[test]
    fn test_near_uses_exact_distance() {
        let conn = seeded_conn();
        let q = AirportQuery::new(&conn);

        // 25 km around downtown Seattle catches KSEA and the seaplane base,
        // not Newark.
        let nearby = q.airports().near(47.6, -122.33, 25.0).execute().unwrap();
        let icaos: Vec<_> = nearby.iter().map(|a| a.icao.as_deref().unwrap()).collect();
        assert_eq!(icaos, vec!["KSEA", "W55"]);

        let tight = q.airports().near(47.6, -122.33, 5.0).execute().unwrap();
        assert_eq!(tight.len(), 1);
        assert_eq!(tight[0].icao.as_deref(), Some("W55"));
    }

    #[test]
    fn test_count_first_and_limit() {
        let conn = seeded_conn();
        let q = AirportQuery::new(&conn);

        assert_eq!(q.airports().count().unwrap(), 4);
        assert_eq!(q.airports().country("United States").count().unwrap(), 3);

        let first = q.airports().country("United States").first().unwrap();
        assert_eq!(first.unwrap().icao.as_deref(), Some("KEWR"));

        let limited = q.airports().max_results(2).execute().unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_runway_filters() {
        let conn = seeded_conn();
        let q = AirportQuery::new(&conn);

        assert_eq!(q.runways_for_airport("KSEA").unwrap().len(), 2);
        assert_eq!(q.runways().airport_icao("KSEA").count().unwrap(), 2);

        let concrete = q.runways_by_surface(2, 50).unwrap();
        assert_eq!(concrete.len(), 1);
        assert_eq!(concrete[0].full_runway_name(), "16C/34C");

        let wide = q.runways().min_width(50.0).execute().unwrap();
        assert_eq!(wide.len(), 1);

        // Matches either end of the pair.
        let by_number = q.runways().runway_number("22R").execute().unwrap();
        assert_eq!(by_number.len(), 1);
        assert_eq!(by_number[0].airport_icao.as_deref(), Some("KEWR"));
        let by_number = q.runways().runway_number("04L").execute().unwrap();
        assert_eq!(by_number.len(), 1);
    }

    #[test]
    fn test_near_count_ignores_max_results() {
        let conn = seeded_conn();
        let q = AirportQuery::new(&conn);

        // Two airports sit inside the radius; a result page capped at one
        // must not cap the count.
        let page = q
            .airports()
            .near(47.6, -122.33, 25.0)
            .max_results(1)
            .execute()
            .unwrap();
        assert_eq!(page.len(), 1);

        let count = q
            .airports()
            .near(47.6, -122.33, 25.0)
            .max_results(1)
            .count()
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_convenience_shortcuts() {
        let conn = seeded_conn();
        let q = AirportQuery::new(&conn);

        assert!(q.by_icao("EDDF").unwrap().is_some());
        assert!(q.by_icao("ZZZZ").unwrap().is_none());
        assert_eq!(q.by_country("Germany", 10).unwrap().len(), 1);
        assert_eq!(q.by_state("Washington", 10).unwrap().len(), 1);
        assert_eq!(q.near(47.6, -122.33, 25.0, 50).unwrap().len(), 2);
    }
}
