use std::collections::BTreeSet;

pub use crate::model::*;
use crate::normalize::References;
use crate::Dataset;

/// A builder for assembling a dataset.
///
/// The lookups on the reference tables are only built once, when calling
/// `build`.
///
/// ```
/// use poll_consolidation::builder::Builder;
/// use poll_consolidation::*;
///
/// let mut builder = Builder::new().hypotheses(vec![Hypothesis {
///     id: "H1".to_string(),
///     candidates: vec!["Marine Le Pen".to_string()],
///     row: 2,
/// }]);
/// builder.add_candidate_simple("MLP", "Marine Le Pen");
/// builder.add_poll_simple("20250326_0327_if_A", "H1", "1200", &[("Marine Le Pen", "36")])?;
///
/// let rows = consolidate(&builder.build())?;
/// assert_eq!(rows.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    _candidates: Vec<Candidate>,
    _hypotheses: Vec<Hypothesis>,
    _polls: Vec<PollEntry>,
    _result_files: Option<BTreeSet<String>>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    pub fn candidates(self, cands: Vec<Candidate>) -> Builder {
        Builder {
            _candidates: cands,
            ..self
        }
    }

    pub fn hypotheses(self, hyps: Vec<Hypothesis>) -> Builder {
        Builder {
            _hypotheses: hyps,
            ..self
        }
    }

    /// The poll identifiers for which a result file exists. When set, the
    /// validator reports the files that the registry does not mention.
    pub fn result_files(self, files: BTreeSet<String>) -> Builder {
        Builder {
            _result_files: Some(files),
            ..self
        }
    }

    /// Adds a candidate with only an identifier and a complete name.
    pub fn add_candidate_simple(&mut self, candidate_id: &str, complete_name: &str) {
        let row = self._candidates.len() + 2;
        self._candidates.push(Candidate {
            candidate_id: candidate_id.to_string(),
            complete_name: complete_name.to_string(),
            name: "".to_string(),
            surname: "".to_string(),
            parti: None,
            row,
        });
    }

    /// Adds a poll, with its results in file order.
    pub fn add_poll(&mut self, metadata: PollMetadata, results: Vec<PollResult>) {
        self._polls.push(PollEntry { metadata, results });
    }

    /// Adds a poll with the mandatory metadata and (name, intentions) pairs.
    ///
    /// Returns the offending text if an intention is not a number.
    pub fn add_poll_simple(
        &mut self,
        poll_id: &str,
        hypothese: &str,
        echantillon: &str,
        results: &[(&str, &str)],
    ) -> Result<(), String> {
        let mut rows: Vec<PollResult> = Vec::new();
        for (idx, (name, intentions)) in results.iter().enumerate() {
            rows.push(PollResult {
                candidat: name.to_string(),
                intentions: Measure::parse(intentions)?,
                erreur_sup: Measure::default(),
                erreur_inf: Measure::default(),
                row: idx + 2,
            });
        }
        let metadata = PollMetadata {
            poll_id: poll_id.to_string(),
            hypothese: hypothese.to_string(),
            debut_enquete: poll_id.chars().take(8).collect(),
            fin_enquete: poll_id.chars().skip(9).take(4).collect(),
            echantillon: echantillon.to_string(),
            filename: format!("{}.pdf", poll_id),
            row: self._polls.len() + 2,
            ..Default::default()
        };
        self.add_poll(metadata, rows);
        Ok(())
    }

    pub fn build(self) -> Dataset {
        Dataset {
            references: References::new(self._candidates, self._hypotheses),
            polls: self._polls,
            result_files: self._result_files,
        }
    }
}
