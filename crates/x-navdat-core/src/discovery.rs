// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::NavDataError;

/// Directory-name fragments (lowercased) whose subtrees never carry airport
/// data worth indexing: ortho tiles, mesh, landmark packs, libraries.
/// Matching directories are pruned without descending.
const EXCLUDED_DIR_PATTERNS: [&str; 8] = [
    "z_",
    "ortho",
    "zortho4xp_",
    "simheaven_",
    "x-plane landmarks",
    "uhd_",
    "hd_",
    "library",
];

/// One apt.dat file selected for ingest. `is_overlay` marks add-on scenery,
/// which supersedes the base dataset for airports it redefines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenerySource {
    pub path: PathBuf,
    pub is_overlay: bool,
}

/// Collects the apt.dat files of an X-Plane installation: the base file
/// under `Global Scenery/Global Airports/Earth nav data` plus every add-on
/// under `Custom Scenery`, minus excluded subtrees and nested duplicates.
///
/// The returned order is the load order: base scenery first, add-ons
/// second. The overlay replacement policy in the loader depends on it.
pub fn find_apt_dat_files(xp_root: &Path) -> Result<Vec<ScenerySource>, NavDataError> {
    if !xp_root.is_dir() {
        return Err(NavDataError::InvalidRoot(xp_root.to_path_buf()));
    }

    let global_root = xp_root
        .join("Global Scenery")
        .join("Global Airports")
        .join("Earth nav data");
    if !global_root.is_dir() {
        return Err(NavDataError::MissingGlobalScenery(global_root));
    }
    let custom_root = xp_root.join("Custom Scenery");

    let mut candidates: Vec<(PathBuf, bool)> = Vec::new();
    collect_apt_files(&global_root, false, &mut candidates)?;
    if custom_root.is_dir() {
        collect_apt_files(&custom_root, true, &mut candidates)?;
    }

    // Add-on packs sometimes ship nested copies (backups, SAM fixtures);
    // the canonical file of a package is the one with the shortest path.
    let mut shortest_per_package: BTreeMap<String, (PathBuf, bool)> = BTreeMap::new();
    for (path, is_overlay) in candidates {
        let package = package_name(&path).unwrap_or_default();
        let keep = match shortest_per_package.get(&package) {
            Some((existing, _)) => path.as_os_str().len() < existing.as_os_str().len(),
            None => true,
        };
        if keep {
            if let Some((dropped, _)) = shortest_per_package.insert(package, (path, is_overlay)) {
                log::debug!("skipping nested apt.dat: {}", dropped.display());
            }
        } else {
            log::debug!("skipping nested apt.dat: {}", path.display());
        }
    }

    let mut sources: Vec<ScenerySource> = Vec::new();
    for overlay_pass in [false, true] {
        for (path, is_overlay) in shortest_per_package.values() {
            if *is_overlay == overlay_pass {
                sources.push(ScenerySource {
                    path: path.clone(),
                    is_overlay: *is_overlay,
                });
            }
        }
    }

    log::info!(
        "located {} apt.dat file(s) under {}",
        sources.len(),
        xp_root.display()
    );
    Ok(sources)
}

fn collect_apt_files(
    root: &Path,
    apply_exclusions: bool,
    out: &mut Vec<(PathBuf, bool)>,
) -> Result<(), NavDataError> {
    let walker = WalkDir::new(root).into_iter().filter_entry(move |entry| {
        if !apply_exclusions || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        !EXCLUDED_DIR_PATTERNS
            .iter()
            .any(|pattern| name.contains(pattern))
    });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && entry.file_name() == "apt.dat" {
            out.push((entry.into_path(), apply_exclusions));
        }
    }
    Ok(())
}

/// The dedup unit: the first path segment after the `Global Scenery` or
/// `Custom Scenery` component, provided it is not the final segment.
fn package_name(path: &Path) -> Option<String> {
    let components: Vec<_> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    let anchor = components
        .iter()
        .position(|c| c == "Global Scenery" || c == "Custom Scenery")?;
    let candidate = components.get(anchor + 1)?;
    if anchor + 2 < components.len() {
        Some(candidate.clone())
    } else {
        None
    }
}
