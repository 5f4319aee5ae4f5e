// Primitives for reading and writing CSV files.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use log::{debug, info};
use snafu::prelude::*;

use crate::polls::*;

pub fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// The short name of a file, used in the messages aimed at contributors.
pub fn table_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| display_path(path))
}

/// The position of the named columns of a file.
#[derive(Debug, Clone)]
pub struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    pub fn from_headers(headers: &StringRecord) -> Columns {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (idx, n) in names.iter().enumerate() {
            index.entry(n.clone()).or_insert(idx);
        }
        Columns { names, index }
    }

    /// The first of the required columns that is absent, if any.
    pub fn first_missing<'a>(&self, required: &[&'a str]) -> Option<&'a str> {
        required.iter().find(|c| !self.index.contains_key(**c)).cloned()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The content of a cell, empty when the column or the cell is absent.
    pub fn get<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        self.index
            .get(column)
            .and_then(|idx| record.get(*idx))
            .unwrap_or("")
    }
}

/// Opens a CSV file with a header row. Rows may be shorter than the header.
pub fn open_csv(path: &Path) -> MergeResult<(csv::Reader<File>, Columns)> {
    let p = display_path(path);
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path: p.clone() })?;
    let headers = rdr
        .headers()
        .context(CsvLineParseSnafu { path: p, lineno: 1usize })?
        .clone();
    let columns = Columns::from_headers(&headers);
    debug!("open_csv: {:?}: columns {:?}", path, columns.names());
    Ok((rdr, columns))
}

/// Reads all the data rows of a file, with their line numbers.
///
/// Rows where every cell is blank are dropped.
pub fn read_rows(path: &Path) -> MergeResult<(Columns, Vec<(usize, StringRecord)>)> {
    let (rdr, columns) = open_csv(path)?;
    let mut rows: Vec<(usize, StringRecord)> = Vec::new();
    for (idx, record_r) in rdr.into_records().enumerate() {
        let record = record_r.context(CsvLineParseSnafu {
            path: display_path(path),
            lineno: idx + 2,
        })?;
        let lineno = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(idx + 2);
        if record.iter().all(|s| s.trim().is_empty()) {
            debug!("read_rows: {:?}: skipping blank line {}", path, lineno);
            continue;
        }
        rows.push((lineno, record));
    }
    Ok((columns, rows))
}

/// Serializes rows into CSV text, header first.
pub fn to_csv_bytes<'a, I>(header: &[&str], rows: I, path: &Path) -> MergeResult<Vec<u8>>
where
    I: IntoIterator<Item = Vec<&'a str>>,
{
    let p = display_path(path);
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(header)
        .context(CsvWriteSnafu { path: p.clone() })?;
    for row in rows {
        wtr.write_record(&row)
            .context(CsvWriteSnafu { path: p.clone() })?;
    }
    wtr.into_inner()
        .map_err(|e| e.into_error())
        .context(WritingOutputSnafu { path: p })
}

/// The new content of a file, written next to it and not yet visible.
///
/// Dropping a staged file without committing it removes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    target: PathBuf,
    tmp: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Renames the temporary file over the target.
    fn commit(mut self) -> MergeResult<PathBuf> {
        fs::rename(&self.tmp, &self.target).context(WritingOutputSnafu {
            path: display_path(&self.target),
        })?;
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            debug!("Discarding staged file {:?}", self.tmp);
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

/// Writes the content of a file to a temporary file of the same directory.
///
/// The target must not be a directory.
pub fn stage_file(path: &Path, content: &[u8]) -> MergeResult<StagedFile> {
    let p = display_path(path);
    if path.is_dir() {
        return Err(io::Error::new(io::ErrorKind::Other, "the target is a directory"))
            .context(WritingOutputSnafu { path: p });
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingOutputSnafu { path: p.clone() })?;
        }
    }
    let tmp = path.with_file_name(format!(".{}.tmp", table_name(path)));
    let staged = StagedFile {
        target: path.to_path_buf(),
        tmp,
        committed: false,
    };
    fs::write(&staged.tmp, content).context(WritingOutputSnafu { path: p })?;
    debug!("Staged {} bytes for {:?}", content.len(), path);
    Ok(staged)
}

/// Replaces the targets of the staged files, in order.
pub fn commit_all(staged: Vec<StagedFile>) -> MergeResult<Vec<PathBuf>> {
    let mut written: Vec<PathBuf> = Vec::new();
    for f in staged {
        let p = f.commit()?;
        info!("Wrote {}", display_path(&p));
        written.push(p);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_by_name() {
        let headers = StringRecord::from(vec!["\u{feff}candidat", " intentions ", "erreur_sup"]);
        let cols = Columns::from_headers(&headers);
        assert_eq!(cols.first_missing(&["candidat", "intentions"]), None);
        assert_eq!(
            cols.first_missing(&["candidat", "erreur_inf", "autre"]),
            Some("erreur_inf")
        );
        let rec = StringRecord::from(vec!["Marine Le Pen", "36"]);
        assert_eq!(cols.get(&rec, "intentions"), "36");
        assert_eq!(cols.get(&rec, "erreur_sup"), "");
        assert_eq!(cols.get(&rec, "autre"), "");
    }

    #[test]
    fn skips_blank_rows_and_keeps_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("t.csv");
        fs::write(&p, "a,b\n1,2\n,\n\"x\ny\",3\n4,5\n").unwrap();
        let (_, rows) = read_rows(&p).unwrap();
        let lines: Vec<usize> = rows.iter().map(|(l, _)| *l).collect();
        assert_eq!(lines, vec![2, 4, 6]);
        assert_eq!(rows[1].1.get(0), Some("x\ny"));
    }

    #[test]
    fn staged_files_replace_on_commit() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sub/out.csv");
        let q = dir.path().join("sub/out.json");
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(&p, "one\n").unwrap();

        let staged = vec![stage_file(&p, b"two\n").unwrap(), stage_file(&q, b"{}").unwrap()];
        assert_eq!(fs::read_to_string(&p).unwrap(), "one\n");
        assert!(!q.exists());

        let written = commit_all(staged).unwrap();
        assert_eq!(written, vec![p.clone(), q.clone()]);
        assert_eq!(fs::read_to_string(&p).unwrap(), "two\n");
        assert_eq!(fs::read_to_string(&q).unwrap(), "{}");
        assert!(!dir.path().join("sub/.out.csv.tmp").exists());
    }

    #[test]
    fn dropped_staged_file_leaves_target() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("out.csv");
        fs::write(&p, "previous\n").unwrap();
        {
            let _staged = stage_file(&p, b"new\n").unwrap();
            assert!(dir.path().join(".out.csv.tmp").exists());
        }
        assert!(!dir.path().join(".out.csv.tmp").exists());
        assert_eq!(fs::read_to_string(&p).unwrap(), "previous\n");
    }

    #[test]
    fn directory_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        match stage_file(dir.path(), b"x") {
            Err(PollError::WritingOutput { .. }) => {}
            x => panic!("unexpected result {:?}", x),
        }
    }
}
