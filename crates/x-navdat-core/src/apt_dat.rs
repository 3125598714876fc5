// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use std::io::BufRead;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::line_reader::LookaheadLineReader;
use crate::records::{
    AirportKind, AirportMeta, LinearFeature, LinearFeatureNode, ParsedFile, RunwayData, RunwayEnd,
    StartupLocation, TaxiwayEdge, TaxiwayNode,
};

/// Painted line-type codes that belong to the taxiway network. A linear
/// feature is kept only if at least one of its nodes carries one of these
/// codes; everything else (service roads, hold-short art, aprons) is
/// dropped. This set is the one lever for which surface markings are
/// retained.
pub const TAXIWAY_LINE_TYPES: [i64; 16] = [
    1, 4, 5, 6, 7, 51, 54, 55, 56, 57, 101, 103, 104, 105, 107, 108,
];

/// Legacy airport-status markers that old apt.dat revisions interleave with
/// the airport name.
const LEGACY_MARKERS: [&str; 3] = ["[H]", "[S]", "[X]"];

/// A typed token conversion failed. Carries enough context to find the
/// offending line without re-running the parse.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("parse failure in {file}:{line_number}: {cause}\n  line: `{line}`\n  tokens: {tokens:?}")]
pub struct ParseError {
    pub file: PathBuf,
    pub line_number: u64,
    pub line: String,
    pub tokens: Vec<String>,
    pub cause: String,
}

impl ParseError {
    fn at<R: BufRead>(reader: &LookaheadLineReader<R>, cause: impl Into<String>) -> Self {
        Self {
            file: reader.path().to_path_buf(),
            line_number: reader.line_number(),
            line: reader.line().to_string(),
            tokens: reader.tokens().iter().map(|t| t.to_string()).collect(),
            cause: cause.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AptDatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// One-pass parser for the apt.dat row-code record format.
///
/// Dispatches on the row code of each record group's header line; every
/// handler consumes its continuation rows and pushes the first foreign line
/// back so the dispatcher sees it again. Row codes outside the dispatch
/// table are skipped. Any typed conversion failure aborts the file with a
/// [`ParseError`]; there is no per-record recovery, because a partially
/// ingested file would break the scenery override guarantees downstream.
pub struct AptDatParser;

struct ParserState {
    current_icao: Option<String>,
    // 1-based, reset whenever an airport header is accepted. Only retained
    // linear features consume a sequence number.
    feature_sequence: i64,
}

impl AptDatParser {
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ParsedFile, AptDatError> {
        let reader = LookaheadLineReader::open(path)?;
        Self::parse(reader)
    }

    pub fn parse<R: BufRead>(
        mut reader: LookaheadLineReader<R>,
    ) -> Result<ParsedFile, AptDatError> {
        let mut out = ParsedFile::default();
        let mut state = ParserState {
            current_icao: None,
            feature_sequence: 1,
        };

        while reader.advance()? {
            match reader.row_code() {
                1 | 16 | 17 => {
                    reader.push_back();
                    parse_airport(&mut reader, &mut state, &mut out)?;
                }
                100 => {
                    reader.push_back();
                    parse_runway(&mut reader, &state, &mut out)?;
                }
                1201 => {
                    reader.push_back();
                    parse_taxiway_node(&mut reader, &state, &mut out)?;
                }
                1202 => {
                    reader.push_back();
                    parse_taxiway_edge(&mut reader, &state, &mut out)?;
                }
                120 => {
                    reader.push_back();
                    parse_linear_feature(&mut reader, &mut state, &mut out)?;
                }
                1300 => {
                    reader.push_back();
                    parse_startup_location(&mut reader, &state, &mut out)?;
                }
                // 1200 opens a taxiway network but carries no payload of its
                // own; nodes arrive as 1201 rows. All other codes are not
                // ours to interpret.
                _ => {}
            }
        }

        log::debug!(
            "parsed {}: {} airports, {} records total",
            reader.path().display(),
            out.airports.len(),
            out.record_count()
        );
        Ok(out)
    }
}

fn parse_f64<R: BufRead>(
    reader: &LookaheadLineReader<R>,
    raw: Option<&str>,
    what: &str,
) -> Result<Option<f64>, ParseError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ParseError::at(reader, format!("invalid {what} `{raw}`"))),
    }
}

fn parse_i64<R: BufRead>(
    reader: &LookaheadLineReader<R>,
    raw: Option<&str>,
    what: &str,
) -> Result<Option<i64>, ParseError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ParseError::at(reader, format!("invalid {what} `{raw}`"))),
    }
}

fn join_tail(tokens: &[&str], from: usize) -> Option<String> {
    tokens
        .get(from..)
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.join(" "))
}

/// `1|16|17` header plus any number of `1302 key value` continuation rows.
fn parse_airport<R: BufRead>(
    reader: &mut LookaheadLineReader<R>,
    state: &mut ParserState,
    out: &mut ParsedFile,
) -> Result<(), AptDatError> {
    reader.advance()?;

    let mut meta = {
        let kind = match reader.row_code() {
            16 => AirportKind::Seaplane,
            17 => AirportKind::Heliport,
            _ => AirportKind::Land,
        };

        let tokens = reader.tokens();
        let filtered: Vec<&str> = tokens
            .iter()
            .enumerate()
            .filter(|&(i, token)| i < 3 || !LEGACY_MARKERS.contains(token))
            .map(|(_, token)| *token)
            .collect();

        let elevation = parse_f64(reader, filtered.get(1).copied(), "airport elevation")?
            .map(|feet| feet as i64);

        AirportMeta {
            icao: filtered.get(4).map(|t| t.to_string()),
            airport_name: join_tail(&filtered, 5),
            elevation,
            kind: Some(kind),
            ..AirportMeta::default()
        }
    };

    loop {
        if !reader.advance()? {
            break;
        }
        if reader.row_code() == 1302 {
            merge_metadata(reader, &mut meta)?;
        } else {
            reader.push_back();
            break;
        }
    }

    // Strip control whitespace and normalize case before the ICAO becomes
    // the key for every subsidiary record of this airport.
    let clean = meta
        .icao
        .as_deref()
        .map(str::trim)
        .unwrap_or("")
        .to_ascii_uppercase();
    if clean.is_empty() {
        log::debug!(
            "airport without ICAO near {}:{}, dropped at load",
            reader.path().display(),
            reader.line_number()
        );
        meta.icao = None;
        state.current_icao = None;
    } else {
        meta.icao = Some(clean.clone());
        state.current_icao = Some(clean);
    }
    state.feature_sequence = 1;

    out.airports.push(meta);
    Ok(())
}

fn merge_metadata<R: BufRead>(
    reader: &LookaheadLineReader<R>,
    meta: &mut AirportMeta,
) -> Result<(), ParseError> {
    let tokens = reader.tokens();
    let key = match tokens.get(1) {
        Some(key) => *key,
        None => return Ok(()),
    };
    let value = match join_tail(&tokens, 2) {
        Some(value) => value,
        None => return Ok(()),
    };

    match key {
        "icao_code" => meta.icao = Some(value),
        "iata_code" => meta.iata = Some(value),
        "faa_code" => meta.faa = Some(value),
        "city" => meta.city = Some(value),
        "country" => meta.country = Some(value),
        "state" => meta.state = Some(value),
        "region_code" => meta.region = Some(value),
        "transition_alt" => meta.transition_alt = Some(value),
        "transition_level" => meta.transition_level = Some(normalize_transition_level(&value)),
        "datum_lat" => meta.latitude = parse_f64(reader, Some(&value), "datum latitude")?,
        "datum_lon" => meta.longitude = parse_f64(reader, Some(&value), "datum longitude")?,
        // Plenty of other 1302 keys exist (gui_label, flatten, ...); none of
        // them are persisted.
        _ => {}
    }
    Ok(())
}

/// A bare transition level arrives either as feet (`18000`) or already in
/// flight-level form (`FL180`). Numeric values are folded to `FL{n/100}`,
/// anything else passes through untouched.
fn normalize_transition_level(value: &str) -> String {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        match value.parse::<i64>() {
            Ok(feet) => format!("FL{}", feet / 100),
            Err(_) => value.to_string(),
        }
    } else {
        value.to_string()
    }
}

/// Runway numbers shorter than the `[NN][LCR]` shape get a leading zero so
/// `4L`/`22R` pairs align.
fn pad_runway_number(raw: &str) -> String {
    if raw.len() == 2 && matches!(raw.as_bytes()[1], b'L' | b'C' | b'R') {
        format!("0{raw}")
    } else {
        raw.to_string()
    }
}

fn parse_runway_end<R: BufRead>(
    reader: &LookaheadLineReader<R>,
    base: usize,
) -> Result<RunwayEnd, ParseError> {
    Ok(RunwayEnd {
        rw_number: reader.token(base).map(pad_runway_number),
        lat: parse_f64(reader, reader.token(base + 1), "runway end latitude")?,
        lon: parse_f64(reader, reader.token(base + 2), "runway end longitude")?,
        displaced_threshold: parse_f64(reader, reader.token(base + 3), "displaced threshold")?,
        marking_code: parse_i64(reader, reader.token(base + 4), "marking code")?,
        approach_light_code: parse_i64(reader, reader.token(base + 5), "approach light code")?,
    })
}

fn parse_runway<R: BufRead>(
    reader: &mut LookaheadLineReader<R>,
    state: &ParserState,
    out: &mut ParsedFile,
) -> Result<(), AptDatError> {
    reader.advance()?;

    // Fixed layout of the 100 row: width and surface up front, then one
    // block per end starting at tokens 8 and 17.
    let runway = RunwayData {
        airport_icao: state.current_icao.clone(),
        width: parse_f64(reader, reader.token(1), "runway width")?,
        surface: parse_i64(reader, reader.token(2), "surface code")?,
        end1: parse_runway_end(reader, 8)?,
        end2: parse_runway_end(reader, 17)?,
    };
    out.runways.push(runway);
    Ok(())
}

fn parse_taxiway_node<R: BufRead>(
    reader: &mut LookaheadLineReader<R>,
    state: &ParserState,
    out: &mut ParsedFile,
) -> Result<(), AptDatError> {
    reader.advance()?;

    let node = TaxiwayNode {
        airport_icao: state.current_icao.clone(),
        latitude: parse_f64(reader, reader.token(1), "taxi node latitude")?,
        longitude: parse_f64(reader, reader.token(2), "taxi node longitude")?,
        node_kind: reader.token(3).map(|t| t.to_string()),
        node_id: parse_i64(reader, reader.token(4), "taxi node id")?,
    };
    out.taxiway_nodes.push(node);
    Ok(())
}

fn parse_taxiway_edge<R: BufRead>(
    reader: &mut LookaheadLineReader<R>,
    state: &ParserState,
    out: &mut ParsedFile,
) -> Result<(), AptDatError> {
    reader.advance()?;

    let edge = {
        let tokens = reader.tokens();
        TaxiwayEdge {
            airport_icao: state.current_icao.clone(),
            start_node_id: parse_i64(reader, tokens.get(1).copied(), "edge start node")?,
            end_node_id: parse_i64(reader, tokens.get(2).copied(), "edge end node")?,
            is_two_way: tokens.get(3).map(|t| *t == "twoway"),
            // The width token is e.g. `taxiway_E`; its last character is the
            // ICAO width class.
            width_class: tokens
                .get(4)
                .and_then(|t| t.chars().last())
                .map(|c| c.to_string()),
            taxiway_name: join_tail(&tokens, 5),
        }
    };
    out.taxiway_edges.push(edge);
    Ok(())
}

/// `120` header followed by `111`-`116` node rows. The whole feature is
/// buffered and only committed when at least one node carries a taxiway
/// line-type code.
fn parse_linear_feature<R: BufRead>(
    reader: &mut LookaheadLineReader<R>,
    state: &mut ParserState,
    out: &mut ParsedFile,
) -> Result<(), AptDatError> {
    reader.advance()?;

    let line_type = {
        let tokens = reader.tokens();
        join_tail(&tokens, 1)
    };
    let sequence = state.feature_sequence;

    let mut nodes: Vec<LinearFeatureNode> = Vec::new();
    let mut keep = false;

    loop {
        if !reader.advance()? {
            break;
        }
        let row_code = reader.row_code();
        if !(111..=116).contains(&row_code) {
            // Covers the next record group and a second 120 header alike.
            reader.push_back();
            break;
        }

        let has_bezier = matches!(row_code, 112 | 114 | 116);
        let node = {
            let latitude = parse_f64(reader, reader.token(1), "feature node latitude")?;
            let longitude = parse_f64(reader, reader.token(2), "feature node longitude")?;
            let (bezier_lat, bezier_lon) = if has_bezier {
                (
                    parse_f64(reader, reader.token(3), "bezier latitude")?,
                    parse_f64(reader, reader.token(4), "bezier longitude")?,
                )
            } else {
                (None, None)
            };

            let tokens = reader.tokens();
            let type_start = if has_bezier { 5 } else { 3 };
            for raw in tokens.get(type_start..).unwrap_or(&[]) {
                let code = raw.parse::<i64>().map_err(|_| {
                    ParseError::at(reader, format!("invalid line-type code `{raw}`"))
                })?;
                if TAXIWAY_LINE_TYPES.contains(&code) {
                    keep = true;
                }
            }

            LinearFeatureNode {
                airport_icao: state.current_icao.clone(),
                feature_sequence: Some(sequence),
                latitude,
                longitude,
                bezier_lat,
                bezier_lon,
                node_order: Some(nodes.len() as i64),
            }
        };
        nodes.push(node);
    }

    if keep && !nodes.is_empty() {
        out.linear_features.push(LinearFeature {
            airport_icao: state.current_icao.clone(),
            feature_sequence: Some(sequence),
            line_type,
        });
        out.linear_feature_nodes.extend(nodes);
        state.feature_sequence += 1;
    }
    Ok(())
}

fn parse_startup_location<R: BufRead>(
    reader: &mut LookaheadLineReader<R>,
    state: &ParserState,
    out: &mut ParsedFile,
) -> Result<(), AptDatError> {
    reader.advance()?;

    let location = {
        let tokens = reader.tokens();
        StartupLocation {
            airport_icao: state.current_icao.clone(),
            latitude: parse_f64(reader, tokens.get(1).copied(), "startup latitude")?,
            longitude: parse_f64(reader, tokens.get(2).copied(), "startup longitude")?,
            heading: parse_f64(reader, tokens.get(3).copied(), "startup heading")?,
            kind: tokens.get(4).map(|t| t.to_string()),
            aircraft_types: tokens.get(5).map(|t| t.to_string()),
            ramp_name: join_tail(&tokens, 6),
        }
    };
    out.startup_locations.push(location);
    Ok(())
}
