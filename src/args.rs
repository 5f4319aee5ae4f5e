use clap::Parser;

/// Consolidates the published polls of the presidential election into a single table.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (directory, default '.') The root of the data repository. It contains candidats.csv, hypotheses.csv,
    /// polls.csv and the polls/ directory.
    #[clap(long, value_parser)]
    pub root: Option<String>,

    /// (file path, optional) A JSON file describing the location of the inputs and outputs. Relative paths
    /// are resolved against the directory of this file. Takes precedence over --root.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) If specified, the consolidated table is written to this location instead of
    /// presidentielle2027.csv.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) If specified, the consolidated table is also written in JSON format to this location,
    /// grouped by poll.
    #[clap(short, long, value_parser)]
    pub json: Option<String>,

    /// (file path) A reference consolidated table. If provided, the run fails when the table built from the
    /// inputs differs from it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, the inputs are checked and merged but nothing is written.
    #[clap(long, takes_value = false)]
    pub check: bool,

    /// If passed as an argument, the missing margins of error are computed and written back to the result
    /// files before merging.
    #[clap(long, takes_value = false)]
    pub fill_margins: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
