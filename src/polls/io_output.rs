// Builders of the consolidated outputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use snafu::prelude::*;
use text_diff::print_diff;

use crate::polls::io_common::{display_path, to_csv_bytes};
use crate::polls::*;

/// The consolidated table as CSV text.
pub fn consolidated_csv(rows: &[ConsolidatedRow], path: &Path) -> MergeResult<Vec<u8>> {
    let content = to_csv_bytes(
        &ConsolidatedRow::COLUMNS,
        rows.iter().map(|r| r.fields().to_vec()),
        path,
    )?;
    debug!("consolidated_csv: {} rows, {} bytes", rows.len(), content.len());
    Ok(content)
}

#[derive(Serialize, Debug)]
struct JsonCandidate<'a> {
    candidate_id: &'a str,
    candidat: &'a str,
    complete_name: &'a str,
    name: &'a str,
    surname: &'a str,
    parti: &'a str,
    intentions: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    erreur_sup: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    erreur_inf: Option<Value>,
}

#[derive(Serialize, Debug)]
struct JsonPoll<'a> {
    poll_id: &'a str,
    institut: &'a str,
    commanditaire: &'a str,
    debut_enquete: &'a str,
    fin_enquete: &'a str,
    echantillon: Value,
    population: &'a str,
    hypothese: &'a str,
    tour: &'a str,
    rolling: &'a str,
    media: &'a str,
    filename: &'a str,
    candidats: Vec<JsonCandidate<'a>>,
}

/// A numeric cell as JSON: integers stay integers, blanks are null and
/// anything unreadable is kept as text.
fn json_number(raw: &str) -> Value {
    let t = raw.trim();
    if t.is_empty() {
        return Value::Null;
    }
    if !t.contains('.') {
        if let Ok(i) = t.parse::<i64>() {
            return Value::from(i);
        }
    }
    match t.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(t.to_string()),
    }
}

fn json_margin(raw: &str) -> Option<Value> {
    match json_number(raw) {
        Value::Null => None,
        v => Some(v),
    }
}

/// The consolidated table grouped by poll, as pretty-printed JSON.
pub fn consolidated_json(rows: &[ConsolidatedRow], path: &Path) -> MergeResult<String> {
    let mut polls: BTreeMap<&str, JsonPoll> = BTreeMap::new();
    for r in rows.iter() {
        let poll = polls.entry(r.poll_id.as_str()).or_insert_with(|| JsonPoll {
            poll_id: &r.poll_id,
            institut: &r.nom_institut,
            commanditaire: &r.commanditaire,
            debut_enquete: &r.debut_enquete,
            fin_enquete: &r.fin_enquete,
            echantillon: json_number(&r.echantillon),
            population: &r.population,
            hypothese: &r.hypothese,
            tour: &r.tour,
            rolling: &r.rolling,
            media: &r.media,
            filename: &r.filename,
            candidats: Vec::new(),
        });
        poll.candidats.push(JsonCandidate {
            candidate_id: &r.candidate_id,
            candidat: &r.candidat,
            complete_name: &r.complete_name,
            name: &r.name,
            surname: &r.surname,
            parti: &r.parti,
            intentions: json_number(&r.intentions),
            erreur_sup: json_margin(&r.erreur_sup),
            erreur_inf: json_margin(&r.erreur_inf),
        });
    }
    let polls: Vec<JsonPoll> = polls.into_values().collect();
    info!("consolidated_json: {} polls", polls.len());
    serde_json::to_string_pretty(&polls).context(SerializingJsonSnafu {
        path: display_path(path),
    })
}

/// Compares the built table with a reference file, printing the differences.
pub fn check_reference(reference: &Path, built: &[u8]) -> MergeResult<()> {
    let p = display_path(reference);
    let expected = fs::read(reference).context(ReadingFileSnafu { path: p.clone() })?;
    if expected == built {
        info!("The consolidated table matches {}", p);
        return Ok(());
    }
    warn!("Found differences with the reference {}", p);
    print_diff(
        String::from_utf8_lossy(&expected).as_ref(),
        String::from_utf8_lossy(built).as_ref(),
        "\n",
    );
    ReferenceMismatchSnafu { path: p }.fail()
}
