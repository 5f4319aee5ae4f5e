use log::{debug, info, warn};
use std::collections::{BTreeSet, HashSet};

use crate::model::*;
use crate::normalize::References;
use crate::Dataset;

/// Runs all the checks on a dataset and returns every problem found.
///
/// The checks are independent from each other: a broken poll does not stop
/// the checks of the other polls, so that a contributor gets a complete
/// report in one run.
pub fn validate(dataset: &Dataset) -> Result<(), ValidationErrors> {
    let mut violations: Vec<Violation> = Vec::new();

    check_reference_keys(&dataset.references, &mut violations);
    check_registry(&dataset.polls, &mut violations);
    for entry in dataset.polls.iter() {
        check_poll(entry, &dataset.references, &mut violations);
    }
    if let Some(files) = &dataset.result_files {
        check_result_files(&dataset.polls, files, &mut violations);
    }

    if violations.is_empty() {
        info!("validate: {} polls are valid", dataset.polls.len());
        Ok(())
    } else {
        info!("validate: {} violations found", violations.len());
        Err(ValidationErrors { violations })
    }
}

fn check_reference_keys(refs: &References, violations: &mut Vec<Violation>) {
    let mut seen: HashSet<&str> = HashSet::new();
    for c in refs.candidates() {
        if c.candidate_id.trim().is_empty() {
            violations.push(Violation::MissingRequiredField {
                table: "candidats.csv".to_string(),
                row: c.row,
                column: "candidate_id".to_string(),
            });
        } else if !seen.insert(c.candidate_id.as_str()) {
            violations.push(Violation::DuplicateKey {
                kind: KeyKind::CandidateId,
                value: c.candidate_id.clone(),
            });
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for h in refs.hypotheses() {
        if h.id.trim().is_empty() {
            violations.push(Violation::MissingRequiredField {
                table: "hypotheses.csv".to_string(),
                row: h.row,
                column: "id_hypothese".to_string(),
            });
        } else if !seen.insert(h.id.as_str()) {
            violations.push(Violation::DuplicateKey {
                kind: KeyKind::HypothesisId,
                value: h.id.clone(),
            });
        }
    }
}

fn check_registry(polls: &[PollEntry], violations: &mut Vec<Violation>) {
    let mut seen: HashSet<&str> = HashSet::new();
    for entry in polls.iter() {
        let m = &entry.metadata;
        for column in REQUIRED_POLL_FIELDS.iter() {
            let blank = m.field(column).map(|v| v.trim().is_empty()).unwrap_or(true);
            if blank {
                violations.push(Violation::MissingRequiredField {
                    table: "polls.csv".to_string(),
                    row: m.row,
                    column: column.to_string(),
                });
            }
        }
        if m.poll_id.trim().is_empty() {
            continue;
        }
        if !seen.insert(m.poll_id.as_str()) {
            violations.push(Violation::DuplicateKey {
                kind: KeyKind::PollId,
                value: m.poll_id.clone(),
            });
        }
        if !is_well_formed_poll_id(&m.poll_id) {
            violations.push(Violation::MalformedPollId {
                poll_id: m.poll_id.clone(),
            });
        }
    }
}

/// Poll identifiers encode the start date, the end date, the institute and the
/// hypothesis: `20250326_0327_if_A`. Only the start date and the number of
/// parts are enforced.
pub fn is_well_formed_poll_id(poll_id: &str) -> bool {
    let parts: Vec<&str> = poll_id.split('_').collect();
    match parts.first() {
        Some(start) if parts.len() >= 3 => {
            start.len() == 8 && start.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

fn check_poll(entry: &PollEntry, refs: &References, violations: &mut Vec<Violation>) {
    let m = &entry.metadata;
    let poll_id = m.poll_id.clone();

    let hypothesis_known = refs.has_hypothesis(&m.hypothese);
    if !m.hypothese.trim().is_empty() && !hypothesis_known {
        violations.push(Violation::UnknownHypothesis {
            poll_id: poll_id.clone(),
            hypothese: m.hypothese.clone(),
        });
    }

    check_non_negative(&poll_id, "echantillon", &m.echantillon, violations);
    for sub in m.sub_samples.iter() {
        if let Some(sample) = &sub.sample {
            let field = format!("sous_echantillon{}", sub.suffix);
            check_non_negative(&poll_id, &field, sample, violations);
        }
    }

    if entry.results.is_empty() {
        violations.push(Violation::EmptyResultFile {
            poll_id: poll_id.clone(),
        });
    }

    let mut found: HashSet<&str> = HashSet::new();
    for r in entry.results.iter() {
        for (field, measure) in r.measures() {
            if let Some(v) = measure.value {
                if !v.is_finite() || v < 0.0 {
                    violations.push(Violation::InvalidNumericValue {
                        poll_id: poll_id.clone(),
                        field: field.to_string(),
                        raw_value: measure.raw.clone(),
                    });
                }
            }
        }

        match refs.resolve(&r.candidat, &m.hypothese) {
            Some(cid) => {
                if !found.insert(cid) {
                    violations.push(Violation::DuplicateKey {
                        kind: KeyKind::PollCandidate,
                        value: format!("{}/{}", poll_id, cid),
                    });
                }
            }
            None => {
                violations.push(Violation::UnknownCandidate {
                    poll_id: poll_id.clone(),
                    name: r.candidat.clone(),
                });
            }
        }
    }

    // Soft check: the poll and its hypothesis should list the same candidates.
    if let Some(members) = refs.hypothesis_members(&m.hypothese) {
        let expected: BTreeSet<&str> = members
            .iter()
            .filter_map(|hm| hm.candidate_id.as_deref())
            .collect();
        let got: BTreeSet<&str> = found.iter().cloned().collect();
        if !expected.is_empty() && expected != got {
            warn!(
                "Poll {} candidates differ from hypothesis {}: missing {:?}, extra {:?}",
                poll_id,
                m.hypothese,
                expected.difference(&got).collect::<Vec<_>>(),
                got.difference(&expected).collect::<Vec<_>>()
            );
        }
    }
    debug!("check_poll: {} checked {} rows", poll_id, entry.results.len());
}

fn check_non_negative(poll_id: &str, field: &str, raw: &str, violations: &mut Vec<Violation>) {
    if raw.trim().is_empty() {
        // Blank mandatory fields are reported by the completeness check.
        return;
    }
    let ok = matches!(raw.trim().parse::<f64>(), Ok(v) if v.is_finite() && v >= 0.0);
    if !ok {
        violations.push(Violation::InvalidNumericValue {
            poll_id: poll_id.to_string(),
            field: field.to_string(),
            raw_value: raw.to_string(),
        });
    }
}

fn check_result_files(
    polls: &[PollEntry],
    files: &BTreeSet<String>,
    violations: &mut Vec<Violation>,
) {
    let registered: HashSet<&str> = polls.iter().map(|p| p.metadata.poll_id.as_str()).collect();
    for f in files.iter() {
        if !registered.contains(f.as_str()) {
            violations.push(Violation::UnreferencedResultFile { poll_id: f.clone() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn valid_dataset() {
        let ds = sample_dataset();
        assert_eq!(validate(&ds), Ok(()));
    }

    #[test]
    fn poll_id_format() {
        assert!(is_well_formed_poll_id("20250326_0327_if_A"));
        assert!(is_well_formed_poll_id("20240707_0708_hi_D"));
        assert!(!is_well_formed_poll_id("20250326"));
        assert!(!is_well_formed_poll_id("2025_0326_if_A"));
        assert!(!is_well_formed_poll_id("abcdefgh_0327_if"));
    }

    #[test]
    fn collects_every_violation() {
        let mut ds = sample_dataset();
        ds.polls[0]
            .results
            .push(result_row("Jean Dupont", "3", "", "", 4));
        ds.polls[0].results[0].intentions = Measure::parse("-1").unwrap();
        ds.polls[0].metadata.hypothese = "H9".to_string();
        ds.polls[0].metadata.echantillon = "mille".to_string();

        let errs = validate(&ds).unwrap_err();
        assert!(errs.violations.contains(&Violation::UnknownCandidate {
            poll_id: "20250326_0327_if_A".to_string(),
            name: "Jean Dupont".to_string(),
        }));
        assert!(errs.violations.contains(&Violation::UnknownHypothesis {
            poll_id: "20250326_0327_if_A".to_string(),
            hypothese: "H9".to_string(),
        }));
        assert!(errs.violations.contains(&Violation::InvalidNumericValue {
            poll_id: "20250326_0327_if_A".to_string(),
            field: "intentions".to_string(),
            raw_value: "-1".to_string(),
        }));
        assert!(errs.violations.contains(&Violation::InvalidNumericValue {
            poll_id: "20250326_0327_if_A".to_string(),
            field: "echantillon".to_string(),
            raw_value: "mille".to_string(),
        }));
        assert_eq!(errs.violations.len(), 4);
    }

    #[test]
    fn duplicate_keys() {
        let mut ds = sample_dataset();
        let again = ds.polls[0].clone();
        ds.polls.push(again);
        let mut cands = ds.references.candidates().to_vec();
        cands.push(candidate("MLP", "Marion Le Pen", "Marion", "Le Pen", 9));
        ds.references = References::new(cands, ds.references.hypotheses().to_vec());

        let errs = validate(&ds).unwrap_err();
        assert!(errs.violations.contains(&Violation::DuplicateKey {
            kind: KeyKind::PollId,
            value: "20250326_0327_if_A".to_string(),
        }));
        assert!(errs.violations.contains(&Violation::DuplicateKey {
            kind: KeyKind::CandidateId,
            value: "MLP".to_string(),
        }));
    }

    #[test]
    fn same_candidate_twice_in_a_poll() {
        let mut ds = sample_dataset();
        ds.polls[0]
            .results
            .push(result_row("marine le pen", "35", "", "", 4));
        let errs = validate(&ds).unwrap_err();
        assert_eq!(
            errs.violations,
            vec![Violation::DuplicateKey {
                kind: KeyKind::PollCandidate,
                value: "20250326_0327_if_A/MLP".to_string(),
            }]
        );
    }

    #[test]
    fn blank_required_fields_and_empty_results() {
        let mut ds = sample_dataset();
        ds.polls[0].metadata.fin_enquete = " ".to_string();
        ds.polls[0].results.clear();
        let errs = validate(&ds).unwrap_err();
        assert_eq!(
            errs.violations,
            vec![
                Violation::MissingRequiredField {
                    table: "polls.csv".to_string(),
                    row: 2,
                    column: "fin_enquete".to_string(),
                },
                Violation::EmptyResultFile {
                    poll_id: "20250326_0327_if_A".to_string(),
                },
            ]
        );
    }

    #[test]
    fn candidate_outside_hypothesis_is_accepted() {
        let mut ds = sample_dataset();
        ds.polls[0]
            .results
            .push(result_row("Édouard Philippe", "14", "", "", 4));
        assert_eq!(validate(&ds), Ok(()));
    }

    #[test]
    fn unreferenced_result_file() {
        let mut ds = sample_dataset();
        let mut files: BTreeSet<String> = BTreeSet::new();
        files.insert("20250326_0327_if_A".to_string());
        files.insert("20990101_0101_xx_A".to_string());
        ds.result_files = Some(files);
        let errs = validate(&ds).unwrap_err();
        assert_eq!(
            errs.violations,
            vec![Violation::UnreferencedResultFile {
                poll_id: "20990101_0101_xx_A".to_string(),
            }]
        );
    }

    #[test]
    fn report_lists_all_lines() {
        let errs = ValidationErrors {
            violations: vec![
                Violation::UnknownCandidate {
                    poll_id: "p".to_string(),
                    name: "Jean Dupont".to_string(),
                },
                Violation::MalformedPollId {
                    poll_id: "p".to_string(),
                },
            ],
        };
        let s = errs.to_string();
        assert!(s.starts_with("2 violation(s) found"));
        assert!(s.contains("poll p: unknown candidate \"Jean Dupont\""));
        assert_eq!(s.lines().count(), 3);
    }
}
