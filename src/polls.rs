use log::{debug, info, warn};

use poll_consolidation::builder::Builder;
use poll_consolidation::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::args::Args;
use crate::polls::config_reader::*;

pub mod config_reader;
mod io_common;
mod io_output;
mod io_reference;
mod io_registry;
mod io_results;

#[derive(Debug, Snafu)]
pub enum PollError {
    #[snafu(display("Cannot open {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("{path}: cannot read line {lineno}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Cannot serialize the rows of {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("{path}: malformed reference data: {message}"))]
    MalformedReferenceData { path: String, message: String },
    #[snafu(display("{path}: poll_id {poll_id} appears on lines {first_row} and {row}"))]
    DuplicatePollId {
        path: String,
        poll_id: String,
        first_row: usize,
        row: usize,
    },
    #[snafu(display("{path}: missing column {column}"))]
    MissingColumn { path: String, column: String },
    #[snafu(display("{table} line {row}: {column} is blank"))]
    MissingRequiredField {
        table: String,
        row: usize,
        column: String,
    },
    #[snafu(display("poll {poll_id}: missing result file {path}"))]
    MissingResultFile { poll_id: String, path: String },
    #[snafu(display("{path} line {row}: {field} is not a number: {value:?}"))]
    MalformedNumericField {
        path: String,
        row: usize,
        field: String,
        value: String,
    },
    #[snafu(display("Cannot list the result files in {path}"))]
    ListingPolls {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Cannot open {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Cannot parse {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Cannot serialize the JSON export {path}"))]
    SerializingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Cannot read {path}"))]
    ReadingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Cannot write {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Validation { source: ValidationErrors },
    #[snafu(display("The consolidated table differs from the reference {path}"))]
    ReferenceMismatch { path: String },
}

pub type MergeResult<T> = Result<T, PollError>;

/// What a successful run did.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    pub polls: usize,
    /// The consolidated table, written unless in check mode.
    pub output: PathBuf,
    /// The files that were (re)written, in order.
    pub written: Vec<PathBuf>,
}

/// Resolves the paths of a run from the command line arguments.
pub fn data_paths(args: &Args) -> MergeResult<DataPaths> {
    let mut paths = if let Some(config_path) = &args.config {
        let config = read_config(config_path)?;
        info!("config: {:?}", config);
        let base = std::path::Path::new(config_path)
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        DataPaths::from_config(&config, &base)
    } else {
        let root = PathBuf::from(args.root.clone().unwrap_or_else(|| ".".to_string()));
        DataPaths::from_root(&root)
    };
    if let Some(out) = &args.out {
        paths.output = PathBuf::from(out);
    }
    if let Some(json) = &args.json {
        paths.json_output = Some(PathBuf::from(json));
    }
    debug!("data_paths: {:?}", paths);
    Ok(paths)
}

/// Loads every input, in order, failing on the first unreadable file.
///
/// The registry is fully checked for duplicates before any result file is
/// opened.
pub fn load_dataset(paths: &DataPaths) -> MergeResult<Dataset> {
    let candidates = io_reference::read_candidates(&paths.candidates)?;
    let hypotheses = io_reference::read_hypotheses(&paths.hypotheses)?;
    let registry = io_registry::read_registry(&paths.registry)?;
    let files = io_results::list_result_files(&paths.polls_dir)?;

    let mut builder = Builder::new()
        .candidates(candidates)
        .hypotheses(hypotheses)
        .result_files(files.keys().cloned().collect::<BTreeSet<String>>());
    for meta in registry {
        let results = io_results::read_poll_results(&meta, &files)?;
        builder.add_poll(meta, results);
    }
    Ok(builder.build())
}

/// Computes the missing margins and returns the new content of the result
/// files that changed. Nothing is written here.
///
/// Nothing is computed unless the whole dataset is valid.
fn fill_missing_margins(
    dataset: &mut Dataset,
    paths: &DataPaths,
) -> MergeResult<Vec<(PathBuf, Vec<u8>)>> {
    validation::validate(dataset).context(ValidationSnafu {})?;
    let mut updates: Vec<(PathBuf, Vec<u8>)> = Vec::new();
    for entry in dataset.polls.iter_mut() {
        let updated = margins::fill_margins(entry);
        if updated == 0 {
            continue;
        }
        let p = paths.result_file(&entry.metadata.poll_id);
        info!(
            "Filled the margins of {} rows of poll {}",
            updated, entry.metadata.poll_id
        );
        let content = io_results::poll_results_csv(&p, &entry.results)?;
        updates.push((p, content));
    }
    Ok(updates)
}

/// Runs the whole pipeline: load, validate, merge, compare, write.
///
/// Every output is staged next to its target before any of them replaces
/// the previous version. A failed run leaves all the files as they were.
pub fn run(args: &Args) -> MergeResult<RunSummary> {
    let paths = data_paths(args)?;
    let mut dataset = load_dataset(&paths)?;

    let mut outputs: Vec<(PathBuf, Vec<u8>)> = Vec::new();
    if args.fill_margins {
        outputs.extend(fill_missing_margins(&mut dataset, &paths)?);
    }

    let rows = consolidate(&dataset).context(ValidationSnafu {})?;
    let csv_bytes = io_output::consolidated_csv(&rows, &paths.output)?;

    if let Some(reference) = &args.reference {
        io_output::check_reference(&PathBuf::from(reference), &csv_bytes)?;
    }

    let json = match &paths.json_output {
        Some(p) => Some((p.clone(), io_output::consolidated_json(&rows, p)?)),
        None => None,
    };

    let written = if args.check {
        info!(
            "Check only: {} rows built, {} files left untouched",
            rows.len(),
            outputs.len() + 1
        );
        Vec::new()
    } else {
        outputs.push((paths.output.clone(), csv_bytes));
        if let Some((p, content)) = json {
            outputs.push((p, content.into_bytes()));
        }
        let mut staged: Vec<io_common::StagedFile> = Vec::new();
        for (p, content) in outputs.iter() {
            staged.push(io_common::stage_file(p, content)?);
        }
        io_common::commit_all(staged)?
    };

    Ok(RunSummary {
        rows: rows.len(),
        polls: dataset.polls.len(),
        output: paths.output,
        written,
    })
}

/// Prints an error on the standard error channel, one violation per line.
pub fn report_error(e: &PollError) {
    match e {
        PollError::Validation { source } => {
            eprintln!("Validation failed: {} problem(s)", source.violations.len());
            for v in source.violations.iter() {
                eprintln!("  {}", v);
            }
        }
        x => {
            warn!("Error occured {:?}", x);
            eprintln!("An error occured: {}", x);
            let mut cause = std::error::Error::source(x);
            while let Some(c) = cause {
                eprintln!("  caused by: {}", c);
                cause = std::error::Error::source(c);
            }
        }
    }
}
