use log::{debug, warn};
use std::collections::HashMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::{Candidate, Hypothesis};

/// The canonical form of a name, used to compare names written by
/// different contributors.
///
/// Typographic apostrophes and dashes are replaced by their ASCII form, the
/// diacritics are dropped, spaces are collapsed and the result is lower-cased.
///
/// ```
/// use poll_consolidation::normalize::canonical_name;
///
/// assert_eq!(canonical_name("  Édouard   Philippe "), "edouard philippe");
/// assert_eq!(canonical_name("Jean‐Luc Mélenchon"), "jean-luc melenchon");
/// ```
pub fn canonical_name(s: &str) -> String {
    let ascii_punct: String = s
        .chars()
        .map(|c| match c {
            '\u{2019}' | '`' => '\'',
            '\u{2013}' | '\u{2014}' | '\u{2010}' => '-',
            x => x,
        })
        .collect();
    let stripped: String = ascii_punct
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// The keys under which a candidate can be found.
fn candidate_keys(c: &Candidate) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    if !c.complete_name.trim().is_empty() {
        keys.push(canonical_name(&c.complete_name));
    }
    if !c.name.trim().is_empty() || !c.surname.trim().is_empty() {
        keys.push(canonical_name(&format!("{} {}", c.name, c.surname)));
        keys.push(canonical_name(&format!("{} {}", c.surname, c.name)));
    }
    keys.retain(|k| !k.is_empty());
    keys
}

/// A member of a hypothesis, after resolution against the candidate table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct HypothesisMember {
    pub label: String,
    pub key: String,
    pub candidate_id: Option<String>,
}

/// The reference tables, with the lookups built once per run.
#[derive(Debug, Clone)]
pub struct References {
    candidates: Vec<Candidate>,
    hypotheses: Vec<Hypothesis>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, String>,
    members: HashMap<String, Vec<HypothesisMember>>,
}

impl References {
    pub fn new(candidates: Vec<Candidate>, hypotheses: Vec<Hypothesis>) -> References {
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut by_name: HashMap<String, String> = HashMap::new();
        for (idx, c) in candidates.iter().enumerate() {
            // The first occurrence wins, duplicates are reported by the validator.
            by_id.entry(c.candidate_id.clone()).or_insert(idx);
            for k in candidate_keys(c) {
                match by_name.get(&k) {
                    Some(cid) if *cid != c.candidate_id => {
                        warn!(
                            "Name {:?} of candidate {} already used by candidate {}",
                            k, c.candidate_id, cid
                        );
                    }
                    Some(_) => {}
                    None => {
                        by_name.insert(k, c.candidate_id.clone());
                    }
                }
            }
        }

        // Surnames that identify a single candidate.
        let mut surnames: HashMap<String, Vec<String>> = HashMap::new();
        for c in candidates.iter() {
            let k = canonical_name(&c.surname);
            if !k.is_empty() {
                let ids = surnames.entry(k).or_default();
                if !ids.contains(&c.candidate_id) {
                    ids.push(c.candidate_id.clone());
                }
            }
        }

        let mut members: HashMap<String, Vec<HypothesisMember>> = HashMap::new();
        for h in hypotheses.iter() {
            if members.contains_key(&h.id) {
                continue;
            }
            let resolved: Vec<HypothesisMember> = h
                .candidates
                .iter()
                .map(|label| {
                    let key = canonical_name(label);
                    let candidate_id = by_name.get(&key).cloned().or_else(|| {
                        match surnames.get(&key).map(|ids| ids.as_slice()) {
                            Some([cid]) => Some(cid.clone()),
                            _ => None,
                        }
                    });
                    if candidate_id.is_none() {
                        warn!(
                            "Hypothesis {}: {:?} does not match any candidate",
                            h.id, label
                        );
                    }
                    HypothesisMember {
                        label: label.clone(),
                        key,
                        candidate_id,
                    }
                })
                .collect();
            debug!("Hypothesis {}: {:?}", h.id, resolved);
            members.insert(h.id.clone(), resolved);
        }

        References {
            candidates,
            hypotheses,
            by_id,
            by_name,
            members,
        }
    }

    /// All the candidates, in table order, duplicates included.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// All the hypotheses, in table order, duplicates included.
    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.by_id.get(candidate_id).map(|idx| &self.candidates[*idx])
    }

    pub fn has_hypothesis(&self, hypothesis_id: &str) -> bool {
        self.members.contains_key(hypothesis_id)
    }

    /// The resolved members of a hypothesis, in order.
    pub fn hypothesis_members(&self, hypothesis_id: &str) -> Option<&[HypothesisMember]> {
        self.members.get(hypothesis_id).map(|v| v.as_slice())
    }

    /// Finds the candidate identifier behind a name written in a result file.
    ///
    /// The candidate table is authoritative. The members of the hypothesis are
    /// only used for the labels that the table does not know under that form.
    pub fn resolve(&self, name: &str, hypothesis_id: &str) -> Option<&str> {
        let key = canonical_name(name);
        if let Some(cid) = self.by_name.get(&key) {
            return Some(cid.as_str());
        }
        self.members
            .get(hypothesis_id)
            .and_then(|ms| ms.iter().find(|m| m.key == key))
            .and_then(|m| m.candidate_id.as_deref())
    }
}
