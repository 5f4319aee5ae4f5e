// Readers for the candidate and hypothesis tables.

use std::path::Path;

use log::info;
use snafu::prelude::*;

use crate::polls::io_common::{display_path, read_rows};
use crate::polls::*;

pub const CANDIDATE_COLUMNS: [&str; 5] = ["candidate_id", "complete_name", "name", "surname", "parti"];
pub const HYPOTHESIS_COLUMNS: [&str; 2] = ["id_hypothese", "hypothese_complete"];

pub fn read_candidates(path: &Path) -> MergeResult<Vec<Candidate>> {
    info!("Attempting to read candidate table {:?}", path);
    let (columns, rows) = read_rows(path)?;
    if let Some(c) = columns.first_missing(&CANDIDATE_COLUMNS) {
        return MalformedReferenceDataSnafu {
            path: display_path(path),
            message: format!("missing column {}", c),
        }
        .fail();
    }

    let mut res: Vec<Candidate> = Vec::new();
    for (lineno, record) in rows.iter() {
        let candidate_id = columns.get(record, "candidate_id").trim();
        ensure!(
            !candidate_id.is_empty(),
            MalformedReferenceDataSnafu {
                path: display_path(path),
                message: format!("line {}: blank candidate_id", lineno),
            }
        );
        let parti = columns.get(record, "parti").trim();
        res.push(Candidate {
            candidate_id: candidate_id.to_string(),
            complete_name: columns.get(record, "complete_name").trim().to_string(),
            name: columns.get(record, "name").trim().to_string(),
            surname: columns.get(record, "surname").trim().to_string(),
            parti: if parti.is_empty() {
                None
            } else {
                Some(parti.to_string())
            },
            row: *lineno,
        });
    }
    info!("Read {} candidates", res.len());
    Ok(res)
}

/// Splits the list of a hypothesis: `"Marine Le Pen, Jean-Luc Mélenchon,"`.
pub fn split_hypothesis(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn read_hypotheses(path: &Path) -> MergeResult<Vec<Hypothesis>> {
    info!("Attempting to read hypothesis table {:?}", path);
    let (columns, rows) = read_rows(path)?;
    if let Some(c) = columns.first_missing(&HYPOTHESIS_COLUMNS) {
        return MalformedReferenceDataSnafu {
            path: display_path(path),
            message: format!("missing column {}", c),
        }
        .fail();
    }

    let mut res: Vec<Hypothesis> = Vec::new();
    for (lineno, record) in rows.iter() {
        let id = columns.get(record, "id_hypothese").trim();
        ensure!(
            !id.is_empty(),
            MalformedReferenceDataSnafu {
                path: display_path(path),
                message: format!("line {}: blank id_hypothese", lineno),
            }
        );
        res.push(Hypothesis {
            id: id.to_string(),
            candidates: split_hypothesis(columns.get(record, "hypothese_complete")),
            row: *lineno,
        });
    }
    info!("Read {} hypotheses", res.len());
    Ok(res)
}
