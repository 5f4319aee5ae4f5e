// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// An entry of the candidate table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    pub candidate_id: String,
    pub complete_name: String,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    pub parti: Option<String>,
    /// Line number in the source table (1 is the header).
    pub row: usize,
}

/// A scenario: the candidates tested together in a poll.
///
/// The labels are the names as written in the hypothesis table, in order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Hypothesis {
    pub id: String,
    pub candidates: Vec<String>,
    pub row: usize,
}

/// The sample size and population of a sub-group of respondents.
///
/// Registries number them (`sous_echantillon1`, `sous_population1`, ...), the
/// suffix is kept to preserve that order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SubSample {
    pub suffix: u32,
    pub sample: Option<String>,
    pub population: Option<String>,
}

/// One row of the poll registry.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct PollMetadata {
    pub poll_id: String,
    pub hypothese: String,
    pub nom_institut: String,
    pub commanditaire: String,
    pub debut_enquete: String,
    pub fin_enquete: String,
    pub echantillon: String,
    pub population: String,
    pub tour: String,
    pub filename: String,
    pub rolling: String,
    pub media: String,
    pub sub_samples: Vec<SubSample>,
    pub row: usize,
}

/// The columns of the registry that may never be blank.
pub const REQUIRED_POLL_FIELDS: [&str; 6] = [
    "poll_id",
    "hypothese",
    "debut_enquete",
    "fin_enquete",
    "echantillon",
    "filename",
];

impl PollMetadata {
    /// The value of a registry column, by name.
    pub fn field(&self, column: &str) -> Option<&str> {
        let v = match column {
            "poll_id" => &self.poll_id,
            "hypothese" => &self.hypothese,
            "nom_institut" => &self.nom_institut,
            "commanditaire" => &self.commanditaire,
            "debut_enquete" => &self.debut_enquete,
            "fin_enquete" => &self.fin_enquete,
            "echantillon" => &self.echantillon,
            "population" => &self.population,
            "tour" => &self.tour,
            "filename" => &self.filename,
            "rolling" => &self.rolling,
            "media" => &self.media,
            _ => return None,
        };
        Some(v.as_str())
    }

    /// The sample size of the most specific sub-group that has one.
    pub fn most_specific_sub_sample(&self) -> Option<&str> {
        self.sub_samples
            .iter()
            .filter_map(|s| s.sample.as_deref().map(|v| (s.suffix, v)))
            .filter(|(_, v)| !v.trim().is_empty())
            .max_by_key(|(suffix, _)| *suffix)
            .map(|(_, v)| v)
    }
}

/// A numeric cell of a result file.
///
/// The raw text is what gets written back out; the value is only used for
/// checks and computations.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Measure {
    pub raw: String,
    pub value: Option<f64>,
}

impl Measure {
    /// Parses a cell. Blank cells are absent values, anything else must be a
    /// number.
    pub fn parse(raw: &str) -> Result<Measure, String> {
        let t = raw.trim();
        if t.is_empty() {
            return Ok(Measure {
                raw: raw.to_string(),
                value: None,
            });
        }
        match t.parse::<f64>() {
            Ok(v) => Ok(Measure {
                raw: raw.to_string(),
                value: Some(v),
            }),
            Err(_) => Err(raw.to_string()),
        }
    }

    pub fn from_value(value: f64) -> Measure {
        Measure {
            raw: format!("{}", value),
            value: Some(value),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.value.is_none()
    }
}

/// One row of a per-poll result file.
#[derive(PartialEq, Debug, Clone)]
pub struct PollResult {
    pub candidat: String,
    pub intentions: Measure,
    pub erreur_sup: Measure,
    pub erreur_inf: Measure,
    pub row: usize,
}

impl PollResult {
    pub fn measures(&self) -> [(&'static str, &Measure); 3] {
        [
            ("intentions", &self.intentions),
            ("erreur_sup", &self.erreur_sup),
            ("erreur_inf", &self.erreur_inf),
        ]
    }
}

/// A poll with the rows of its result file.
#[derive(PartialEq, Debug, Clone)]
pub struct PollEntry {
    pub metadata: PollMetadata,
    pub results: Vec<PollResult>,
}

// ******** Output data structures *********

/// One row of the consolidated table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ConsolidatedRow {
    pub poll_id: String,
    pub hypothese: String,
    pub nom_institut: String,
    pub commanditaire: String,
    pub debut_enquete: String,
    pub fin_enquete: String,
    pub echantillon: String,
    pub population: String,
    pub rolling: String,
    pub media: String,
    pub tour: String,
    pub filename: String,
    pub candidate_id: String,
    pub candidat: String,
    pub complete_name: String,
    pub name: String,
    pub surname: String,
    pub parti: String,
    pub intentions: String,
    pub erreur_sup: String,
    pub erreur_inf: String,
}

impl ConsolidatedRow {
    pub const COLUMNS: [&'static str; 21] = [
        "poll_id",
        "hypothese",
        "nom_institut",
        "commanditaire",
        "debut_enquete",
        "fin_enquete",
        "echantillon",
        "population",
        "rolling",
        "media",
        "tour",
        "filename",
        "candidate_id",
        "candidat",
        "complete_name",
        "name",
        "surname",
        "parti",
        "intentions",
        "erreur_sup",
        "erreur_inf",
    ];

    /// The values, in the order of `COLUMNS`.
    pub fn fields(&self) -> [&str; 21] {
        [
            &self.poll_id,
            &self.hypothese,
            &self.nom_institut,
            &self.commanditaire,
            &self.debut_enquete,
            &self.fin_enquete,
            &self.echantillon,
            &self.population,
            &self.rolling,
            &self.media,
            &self.tour,
            &self.filename,
            &self.candidate_id,
            &self.candidat,
            &self.complete_name,
            &self.name,
            &self.surname,
            &self.parti,
            &self.intentions,
            &self.erreur_sup,
            &self.erreur_inf,
        ]
    }
}

// ******** Errors *********

/// The tables in which a key must be unique.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum KeyKind {
    PollId,
    CandidateId,
    HypothesisId,
    /// The same candidate listed twice in one result file.
    PollCandidate,
}

impl Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            KeyKind::PollId => "poll_id",
            KeyKind::CandidateId => "candidate_id",
            KeyKind::HypothesisId => "id_hypothese",
            KeyKind::PollCandidate => "poll_id/candidate_id",
        };
        write!(f, "{}", s)
    }
}

/// A problem found in the input data. All of them are fixable by the
/// contributor.
#[derive(PartialEq, Debug, Clone)]
pub enum Violation {
    UnknownCandidate {
        poll_id: String,
        name: String,
    },
    UnknownHypothesis {
        poll_id: String,
        hypothese: String,
    },
    DuplicateKey {
        kind: KeyKind,
        value: String,
    },
    InvalidNumericValue {
        poll_id: String,
        field: String,
        raw_value: String,
    },
    MissingRequiredField {
        table: String,
        row: usize,
        column: String,
    },
    MalformedPollId {
        poll_id: String,
    },
    EmptyResultFile {
        poll_id: String,
    },
    UnreferencedResultFile {
        poll_id: String,
    },
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::UnknownCandidate { poll_id, name } => {
                write!(f, "poll {}: unknown candidate {:?}", poll_id, name)
            }
            Violation::UnknownHypothesis { poll_id, hypothese } => {
                write!(f, "poll {}: unknown hypothesis {:?}", poll_id, hypothese)
            }
            Violation::DuplicateKey { kind, value } => {
                write!(f, "duplicate {}: {:?}", kind, value)
            }
            Violation::InvalidNumericValue {
                poll_id,
                field,
                raw_value,
            } => write!(
                f,
                "poll {}: {} is not a non-negative number: {:?}",
                poll_id, field, raw_value
            ),
            Violation::MissingRequiredField { table, row, column } => {
                write!(f, "{} line {}: {} is blank", table, row, column)
            }
            Violation::MalformedPollId { poll_id } => write!(
                f,
                "poll {}: identifier should look like YYYYMMDD_MMDD_ii_X",
                poll_id
            ),
            Violation::EmptyResultFile { poll_id } => {
                write!(f, "poll {}: the result file has no data row", poll_id)
            }
            Violation::UnreferencedResultFile { poll_id } => {
                write!(f, "polls/{}.csv has no entry in the poll registry", poll_id)
            }
        }
    }
}

/// The complete list of problems found by the validator. Never empty.
#[derive(PartialEq, Debug, Clone)]
pub struct ValidationErrors {
    pub violations: Vec<Violation>,
}

impl Error for ValidationErrors {}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} violation(s) found", self.violations.len())?;
        for v in self.violations.iter() {
            write!(f, "\n  {}", v)?;
        }
        Ok(())
    }
}
