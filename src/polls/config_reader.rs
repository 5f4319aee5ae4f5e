use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::polls::*;

pub const CANDIDATES_FILE: &str = "candidats.csv";
pub const HYPOTHESES_FILE: &str = "hypotheses.csv";
pub const REGISTRY_FILE: &str = "polls.csv";
pub const POLLS_DIRECTORY: &str = "polls";
pub const OUTPUT_FILE: &str = "presidentielle2027.csv";

/// The optional JSON description of a run. Every path is optional and
/// relative to the directory of the configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(rename = "candidatesFile")]
    pub candidates_file: Option<String>,
    #[serde(rename = "hypothesesFile")]
    pub hypotheses_file: Option<String>,
    #[serde(rename = "pollsFile")]
    pub polls_file: Option<String>,
    #[serde(rename = "pollsDirectory")]
    pub polls_directory: Option<String>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
    #[serde(rename = "jsonOutputFile")]
    pub json_output_file: Option<String>,
}

/// The resolved locations of all the inputs and outputs of a run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DataPaths {
    pub candidates: PathBuf,
    pub hypotheses: PathBuf,
    pub registry: PathBuf,
    pub polls_dir: PathBuf,
    pub output: PathBuf,
    pub json_output: Option<PathBuf>,
}

impl DataPaths {
    /// The fixed layout of the data repository.
    pub fn from_root(root: &Path) -> DataPaths {
        DataPaths {
            candidates: root.join(CANDIDATES_FILE),
            hypotheses: root.join(HYPOTHESES_FILE),
            registry: root.join(REGISTRY_FILE),
            polls_dir: root.join(POLLS_DIRECTORY),
            output: root.join(OUTPUT_FILE),
            json_output: None,
        }
    }

    pub fn from_config(config: &RunConfig, base: &Path) -> DataPaths {
        let pick = |x: &Option<String>, default: &str| -> PathBuf {
            base.join(x.as_deref().unwrap_or(default))
        };
        DataPaths {
            candidates: pick(&config.candidates_file, CANDIDATES_FILE),
            hypotheses: pick(&config.hypotheses_file, HYPOTHESES_FILE),
            registry: pick(&config.polls_file, REGISTRY_FILE),
            polls_dir: pick(&config.polls_directory, POLLS_DIRECTORY),
            output: pick(&config.output_file, OUTPUT_FILE),
            json_output: config.json_output_file.as_ref().map(|p| base.join(p)),
        }
    }

    /// The result file of a poll.
    pub fn result_file(&self, poll_id: &str) -> PathBuf {
        self.polls_dir.join(format!("{}.csv", poll_id))
    }
}

pub fn read_config(path: &str) -> MergeResult<RunConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: RunConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(config)
}
