// Readers and writers for the per-poll result files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use snafu::prelude::*;

use crate::polls::io_common::{display_path, read_rows, table_name, to_csv_bytes};
use crate::polls::*;

pub const RESULT_COLUMNS: [&str; 4] = ["candidat", "intentions", "erreur_sup", "erreur_inf"];

/// Lists the result files of a directory, keyed by poll identifier.
pub fn list_result_files(dir: &Path) -> MergeResult<BTreeMap<String, PathBuf>> {
    let p = display_path(dir);
    let mut res: BTreeMap<String, PathBuf> = BTreeMap::new();
    if !dir.exists() {
        warn!("The directory {:?} does not exist", dir);
        return Ok(res);
    }
    for entry_r in fs::read_dir(dir).context(ListingPollsSnafu { path: p.clone() })? {
        let entry = entry_r.context(ListingPollsSnafu { path: p.clone() })?;
        let path = entry.path();
        if !path.is_file() || path.extension().map(|e| e != "csv").unwrap_or(true) {
            debug!("list_result_files: skipping {:?}", path);
            continue;
        }
        if let Some(stem) = path.file_stem() {
            res.insert(stem.to_string_lossy().to_string(), path);
        }
    }
    info!("Found {} result files in {:?}", res.len(), dir);
    Ok(res)
}

/// Reads the result file of a poll. The candidate labels are kept as written.
pub fn read_poll_results(
    meta: &PollMetadata,
    files: &BTreeMap<String, PathBuf>,
) -> MergeResult<Vec<PollResult>> {
    let path = match files.get(&meta.poll_id) {
        Some(p) => p,
        None => {
            return MissingResultFileSnafu {
                poll_id: meta.poll_id.clone(),
                path: format!("{}.csv", meta.poll_id),
            }
            .fail()
        }
    };
    debug!("read_poll_results: {}: {:?}", meta.poll_id, path);
    let (columns, rows) = read_rows(path)?;
    if let Some(c) = columns.first_missing(&RESULT_COLUMNS) {
        return MissingColumnSnafu {
            path: display_path(path),
            column: c,
        }
        .fail();
    }

    let mut res: Vec<PollResult> = Vec::new();
    for (lineno, record) in rows.iter() {
        let candidat = columns.get(record, "candidat");
        ensure!(
            !candidat.trim().is_empty(),
            MissingRequiredFieldSnafu {
                table: table_name(path),
                row: *lineno,
                column: "candidat",
            }
        );
        let measure = |field: &str| -> MergeResult<Measure> {
            Measure::parse(columns.get(record, field)).map_err(|value| {
                PollError::MalformedNumericField {
                    path: display_path(path),
                    row: *lineno,
                    field: field.to_string(),
                    value,
                }
            })
        };
        res.push(PollResult {
            candidat: candidat.to_string(),
            intentions: measure("intentions")?,
            erreur_sup: measure("erreur_sup")?,
            erreur_inf: measure("erreur_inf")?,
            row: *lineno,
        });
    }
    debug!("read_poll_results: {}: {} rows", meta.poll_id, res.len());
    Ok(res)
}

/// The content of a result file holding the given rows.
pub fn poll_results_csv(path: &Path, results: &[PollResult]) -> MergeResult<Vec<u8>> {
    let rows = results.iter().map(|r| {
        vec![
            r.candidat.as_str(),
            r.intentions.raw.as_str(),
            r.erreur_sup.raw.as_str(),
            r.erreur_inf.raw.as_str(),
        ]
    });
    to_csv_bytes(&RESULT_COLUMNS, rows, path)
}
