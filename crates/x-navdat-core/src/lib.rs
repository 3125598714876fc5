// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

pub mod apt_dat;
pub mod discovery;
pub mod line_reader;
pub mod loader;
pub mod query;
pub mod records;
pub mod store;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::Connection;
use thiserror::Error;

pub use apt_dat::{AptDatError, AptDatParser, ParseError, TAXIWAY_LINE_TYPES};
pub use discovery::{find_apt_dat_files, ScenerySource};
pub use loader::LoadStats;
pub use query::{AirportQuery, AirportQueryBuilder, RunwayQueryBuilder};
pub use records::{
    AirportKind, AirportMeta, LinearFeature, LinearFeatureNode, ParsedFile, RunwayData, RunwayEnd,
    StartupLocation, TaxiwayEdge, TaxiwayNode,
};

#[derive(Error, Debug)]
pub enum NavDataError {
    #[error("not a valid X-Plane directory: {0}")]
    InvalidRoot(PathBuf),
    #[error("global airport scenery not found at {0}")]
    MissingGlobalScenery(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("database not connected, call connect() first")]
    NotConnected,
}

impl From<AptDatError> for NavDataError {
    fn from(err: AptDatError) -> Self {
        match err {
            AptDatError::Io(e) => NavDataError::Io(e),
            AptDatError::Parse(e) => NavDataError::Parse(e),
        }
    }
}

/// One-shot pipeline from an X-Plane installation to a queryable airport
/// database: `scan` finds the apt.dat files, `connect` opens the store and
/// ensures the schema, `parse_and_load` ingests everything in a single
/// transaction. Afterwards [`airport_query`](Self::airport_query) serves
/// reads.
///
/// The manager owns the database connection exclusively; the lifecycle
/// calls are blocking and must run in order.
pub struct NavDataManager {
    xp_root: PathBuf,
    sources: Vec<ScenerySource>,
    conn: Option<Connection>,
}

impl NavDataManager {
    pub fn new<P: AsRef<Path>>(xp_root: P) -> Self {
        Self {
            xp_root: xp_root.as_ref().to_path_buf(),
            sources: Vec::new(),
            conn: None,
        }
    }

    /// Scans the installation for apt.dat files. Fails when the root is not
    /// a directory or the base scenery subtree is missing.
    pub fn scan(&mut self) -> Result<usize, NavDataError> {
        self.sources = discovery::find_apt_dat_files(&self.xp_root)?;
        Ok(self.sources.len())
    }

    /// The files `scan` selected, in load order (base scenery first).
    pub fn sources(&self) -> &[ScenerySource] {
        &self.sources
    }

    /// Opens (or creates) the store at `db_path` and applies the schema.
    pub fn connect<P: AsRef<Path>>(&mut self, db_path: P) -> Result<(), NavDataError> {
        let conn = store::open(db_path.as_ref())?;
        store::apply_schema(&conn)?;
        log::info!("database ready at {}", db_path.as_ref().display());
        self.conn = Some(conn);
        Ok(())
    }

    /// Parses every scanned file and writes the results in one transaction.
    ///
    /// Files already recorded in the `scenery_paths` ledger are skipped
    /// unless `force_full_parse` is set. Any parse or store failure aborts
    /// the whole batch; the database is left exactly as it was. After a
    /// successful commit the store is re-analyzed and vacuumed.
    pub fn parse_and_load(&mut self, force_full_parse: bool) -> Result<LoadStats, NavDataError> {
        let conn = self.conn.as_mut().ok_or(NavDataError::NotConnected)?;
        let started = Instant::now();

        let mut stats = LoadStats::default();
        let tx = conn.transaction()?;
        {
            let mut airports_in_tx: HashSet<String> = HashSet::new();

            for source in &self.sources {
                let already_loaded = loader::is_scenery_path_loaded(&tx, &source.path)?;
                if already_loaded && !force_full_parse {
                    log::debug!("already ingested, skipping {}", source.path.display());
                    stats.files_skipped += 1;
                    continue;
                }
                if !already_loaded {
                    loader::record_scenery_path(&tx, &source.path)?;
                }

                log::info!(
                    "parsing {}{}",
                    source.path.display(),
                    if source.is_overlay { " (add-on)" } else { "" }
                );
                let parsed = AptDatParser::parse_file(&source.path)?;
                loader::insert_parsed_file(
                    &tx,
                    &parsed,
                    source.is_overlay,
                    &mut airports_in_tx,
                    &mut stats,
                )?;
                stats.files_parsed += 1;
            }
        }
        tx.commit()?;

        log::info!(
            "ingested {} file(s) ({} skipped), {} airports in {:.1}s",
            stats.files_parsed,
            stats.files_skipped,
            stats.airports,
            started.elapsed().as_secs_f64()
        );

        store::optimize(conn)?;
        Ok(stats)
    }

    /// Read access to the connected store. Fails with
    /// [`NavDataError::NotConnected`] before `connect`.
    pub fn airport_query(&self) -> Result<AirportQuery<'_>, NavDataError> {
        let conn = self.conn.as_ref().ok_or(NavDataError::NotConnected)?;
        Ok(AirportQuery::new(conn))
    }
}
