mod model;
use log::{debug, info};

use std::collections::BTreeSet;

pub use crate::model::*;

pub mod builder;
pub mod manual;
pub mod margins;
pub mod normalize;
pub mod validation;

use crate::normalize::References;

/// Everything needed to build the consolidated table.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub references: References,
    /// The polls, in registry order, with their results in file order.
    pub polls: Vec<PollEntry>,
    /// The poll identifiers for which a result file exists, when known.
    pub result_files: Option<BTreeSet<String>>,
}

/// Validates a dataset and, if it is valid, builds the consolidated table.
///
/// Nothing is returned unless every check passes: the caller can write the
/// rows without worrying about partial results.
pub fn consolidate(dataset: &Dataset) -> Result<Vec<ConsolidatedRow>, ValidationErrors> {
    info!(
        "consolidate: {} candidates, {} hypotheses, {} polls",
        dataset.references.candidates().len(),
        dataset.references.hypotheses().len(),
        dataset.polls.len()
    );
    validation::validate(dataset)?;
    merge_polls(dataset)
}

/// Joins the poll metadata, the poll results and the candidate attributes.
///
/// One row is produced per result row, in registry order then file order.
/// Candidates of the hypothesis that are missing from a result file were not
/// polled and get no row.
///
/// Arguments:
/// * `dataset` the inputs. They are expected to be validated, the names that
/// cannot be resolved are reported as errors.
pub fn merge_polls(dataset: &Dataset) -> Result<Vec<ConsolidatedRow>, ValidationErrors> {
    let refs = &dataset.references;
    let mut rows: Vec<ConsolidatedRow> = Vec::new();
    let mut unknown: Vec<Violation> = Vec::new();

    for entry in dataset.polls.iter() {
        let m = &entry.metadata;
        for r in entry.results.iter() {
            let candidate = refs
                .resolve(&r.candidat, &m.hypothese)
                .and_then(|cid| refs.candidate(cid));
            let c = match candidate {
                Some(c) => c,
                None => {
                    unknown.push(Violation::UnknownCandidate {
                        poll_id: m.poll_id.clone(),
                        name: r.candidat.clone(),
                    });
                    continue;
                }
            };
            rows.push(ConsolidatedRow {
                poll_id: m.poll_id.clone(),
                hypothese: m.hypothese.clone(),
                nom_institut: m.nom_institut.clone(),
                commanditaire: m.commanditaire.clone(),
                debut_enquete: m.debut_enquete.clone(),
                fin_enquete: m.fin_enquete.clone(),
                echantillon: m.echantillon.clone(),
                population: m.population.clone(),
                rolling: m.rolling.clone(),
                media: m.media.clone(),
                tour: m.tour.clone(),
                filename: m.filename.clone(),
                candidate_id: c.candidate_id.clone(),
                candidat: r.candidat.clone(),
                complete_name: c.complete_name.clone(),
                name: c.name.clone(),
                surname: c.surname.clone(),
                parti: c.parti.clone().unwrap_or_default(),
                intentions: r.intentions.raw.clone(),
                erreur_sup: r.erreur_sup.raw.clone(),
                erreur_inf: r.erreur_inf.raw.clone(),
            });
        }
        debug!(
            "merge_polls: {}: {} result rows",
            m.poll_id,
            entry.results.len()
        );
    }

    if !unknown.is_empty() {
        return Err(ValidationErrors {
            violations: unknown,
        });
    }
    info!("merge_polls: {} rows", rows.len());
    Ok(rows)
}
