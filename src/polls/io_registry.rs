// Reader for the poll registry.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use csv::StringRecord;
use log::{debug, info};
use snafu::prelude::*;

use crate::polls::io_common::{display_path, read_rows, table_name, Columns};
use crate::polls::*;

pub const REGISTRY_COLUMNS: [&str; 10] = [
    "poll_id",
    "hypothese",
    "nom_institut",
    "commanditaire",
    "debut_enquete",
    "fin_enquete",
    "echantillon",
    "population",
    "tour",
    "filename",
];

const SUB_SAMPLE_PREFIX: &str = "sous_echantillon";
const SUB_POPULATION_PREFIX: &str = "sous_population";

/// Reads the registry, in order.
///
/// Fails on the first duplicated identifier or blank mandatory field.
pub fn read_registry(path: &Path) -> MergeResult<Vec<PollMetadata>> {
    info!("Attempting to read poll registry {:?}", path);
    let (columns, rows) = read_rows(path)?;
    if let Some(c) = columns.first_missing(&REGISTRY_COLUMNS) {
        return MissingColumnSnafu {
            path: display_path(path),
            column: c,
        }
        .fail();
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut res: Vec<PollMetadata> = Vec::new();
    for (lineno, record) in rows.iter() {
        let meta = read_metadata(&columns, record, *lineno);
        for column in REQUIRED_POLL_FIELDS.iter() {
            let blank = meta.field(column).map(|v| v.trim().is_empty()).unwrap_or(true);
            ensure!(
                !blank,
                MissingRequiredFieldSnafu {
                    table: table_name(path),
                    row: *lineno,
                    column: *column,
                }
            );
        }
        if let Some(first_row) = seen.get(&meta.poll_id) {
            return DuplicatePollIdSnafu {
                path: display_path(path),
                poll_id: meta.poll_id.clone(),
                first_row: *first_row,
                row: *lineno,
            }
            .fail();
        }
        seen.insert(meta.poll_id.clone(), *lineno);
        debug!("read_registry: line {}: {:?}", lineno, meta);
        res.push(meta);
    }
    info!("Read {} polls", res.len());
    Ok(res)
}

fn read_metadata(columns: &Columns, record: &StringRecord, lineno: usize) -> PollMetadata {
    let get = |c: &str| columns.get(record, c).to_string();
    PollMetadata {
        poll_id: get("poll_id").trim().to_string(),
        hypothese: get("hypothese").trim().to_string(),
        nom_institut: get("nom_institut"),
        commanditaire: get("commanditaire"),
        debut_enquete: get("debut_enquete"),
        fin_enquete: get("fin_enquete"),
        echantillon: get("echantillon"),
        population: get("population"),
        tour: get("tour"),
        filename: get("filename"),
        rolling: get("rolling"),
        media: get("media"),
        sub_samples: read_sub_samples(columns, record),
        row: lineno,
    }
}

/// Collects the `sous_echantillon<N>` / `sous_population<N>` pairs, by
/// increasing N.
fn read_sub_samples(columns: &Columns, record: &StringRecord) -> Vec<SubSample> {
    let mut subs: BTreeMap<u32, SubSample> = BTreeMap::new();
    for name in columns.names() {
        let (suffix, is_sample) = if let Some(s) = name.strip_prefix(SUB_SAMPLE_PREFIX) {
            (s, true)
        } else if let Some(s) = name.strip_prefix(SUB_POPULATION_PREFIX) {
            (s, false)
        } else {
            continue;
        };
        let n = match suffix.parse::<u32>() {
            Ok(n) => n,
            Err(_) => continue,
        };
        let value = columns.get(record, name);
        let value = if value.trim().is_empty() {
            None
        } else {
            Some(value.to_string())
        };
        let entry = subs.entry(n).or_insert(SubSample {
            suffix: n,
            sample: None,
            population: None,
        });
        if is_sample {
            entry.sample = value;
        } else {
            entry.population = value;
        }
    }
    subs.into_values()
        .filter(|s| s.sample.is_some() || s.population.is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "poll_id,hypothese,nom_institut,commanditaire,debut_enquete,fin_enquete,echantillon,population,tour,filename,sous_population1,sous_echantillon1,sous_echantillon2";

    fn write_registry(rows: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("polls.csv");
        let mut content = format!("{}\n", HEADER);
        for r in rows {
            content.push_str(r);
            content.push('\n');
        }
        fs::write(&p, content).unwrap();
        (dir, p)
    }

    #[test]
    fn reads_in_order() {
        let (_dir, p) = write_registry(&[
            "20250326_0327_if_A, H1 ,Ifop,Le Figaro,2025-03-26,2025-03-27,1200,Inscrits,1er tour,a.pdf,Certains,900,",
            "20250401_0402_el_B,H2,Elabe,BFMTV,2025-04-01,2025-04-02,1500,Inscrits,1er tour,b.pdf,,,",
        ]);
        let polls = read_registry(&p).unwrap();
        assert_eq!(polls.len(), 2);
        assert_eq!(polls[0].hypothese, "H1");
        assert_eq!(polls[0].row, 2);
        assert_eq!(
            polls[0].sub_samples,
            vec![SubSample {
                suffix: 1,
                sample: Some("900".to_string()),
                population: Some("Certains".to_string()),
            }]
        );
        assert_eq!(polls[0].most_specific_sub_sample(), Some("900"));
        assert_eq!(polls[1].poll_id, "20250401_0402_el_B");
        assert!(polls[1].sub_samples.is_empty());
        assert_eq!(polls[1].rolling, "");
    }

    #[test]
    fn duplicate_poll_id() {
        let row = "20250326_0327_if_A,H1,Ifop,Le Figaro,2025-03-26,2025-03-27,1200,Inscrits,1er tour,a.pdf,,,";
        let (_dir, p) = write_registry(&[row, row]);
        match read_registry(&p) {
            Err(PollError::DuplicatePollId { first_row, row, .. }) => {
                assert_eq!((first_row, row), (2, 3));
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn blank_mandatory_field() {
        let (_dir, p) = write_registry(&[
            "20250326_0327_if_A,H1,Ifop,Le Figaro,2025-03-26,2025-03-27,,Inscrits,1er tour,a.pdf,,,",
        ]);
        match read_registry(&p) {
            Err(PollError::MissingRequiredField { table, row, column }) => {
                assert_eq!(table, "polls.csv");
                assert_eq!(row, 2);
                assert_eq!(column, "echantillon");
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("polls.csv");
        fs::write(&p, "poll_id,hypothese\n20250326_0327_if_A,H1\n").unwrap();
        match read_registry(&p) {
            Err(PollError::MissingColumn { column, .. }) => assert_eq!(column, "nom_institut"),
            x => panic!("unexpected result {:?}", x),
        }
    }
}
