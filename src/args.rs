use clap::{Parser, Subcommand};
use contributors::pr_ref::is_valid_handle;
use github_client::DEFAULT_GITHUB_URL;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const DEFAULT_SUBMITTERS_FILE: &str = "submitters_data.csv";
pub const DEFAULT_COMMENTERS_FILE: &str = "commenters_data.csv";
pub const DEFAULT_HONORED_FILE: &str = "honored_contributor.csv";

/// Collects monthly pull request submitters and commenters of GitHub organizations.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Output file name (default depends on the command)
    #[clap(short, long, global = true)]
    pub out: Option<PathBuf>,

    /// Environment variable holding the GitHub token
    #[clap(short, long = "token_var", global = true, default_value = DEFAULT_TOKEN_VAR)]
    pub token_var: String,

    /// Append to the output file instead of overwriting it
    #[clap(short, long, global = true)]
    pub append: bool,

    /// Don't write a header line in the output file
    #[clap(long = "no_header", global = true)]
    pub no_header: bool,

    /// Display progress information on the standard output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Write a debug trace to "debug.log"
    #[clap(long, global = true, hide = true)]
    pub debug: bool,

    /// GitHub API URL
    #[clap(long = "api_url", env = "GITHUB_API_URL", global = true, default_value = DEFAULT_GITHUB_URL)]
    pub api_url: String,

    #[clap(subcommand)]
    pub command: Command,
}

impl Args {
    /// The `--out` file, or `default` when not given.
    pub fn out_or(&self, default: impl AsRef<Path>) -> PathBuf {
        self.out.clone().unwrap_or_else(|| default.as_ref().to_path_buf())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Retrieves data from GitHub
    #[clap(subcommand)]
    Get(GetCommand),

    /// Picks a random submitter of the month (YYYY-MM) and gathers what is shown to honor them
    Honor {
        month: String,

        /// Directory containing "pr_per_submitter-YYYY-MM.csv"
        #[clap(long = "data_dir", default_value = "data")]
        data_dir: PathBuf,

        /// File to output the data to (default: "<data_dir>/honored_contributor.csv")
        #[clap(long)]
        output: Option<PathBuf>,

        /// Organization to search pull requests in (default: jenkinsci and jenkins-infra)
        #[clap(long = "org", parse(try_from_str = handle_format))]
        orgs: Vec<String>,
    },

    /// Removes the lines of a CSV file mentioning a user, or any user listed in "file:<path>"
    Remove {
        user: String,

        file: PathBuf,

        /// Make a backup of the original file
        #[clap(short, long)]
        backup: bool,
    },

    /// Gets the current GitHub API quota status
    Quota,
}

#[derive(Subcommand, Debug)]
pub enum GetCommand {
    /// Retrieves the pull requests created in an organization during a month (YYYY-MM)
    Submitters {
        org: String,

        month: String,

        /// File listing the GitHub users to exclude
        #[clap(short = 'x', long)]
        exclude: Option<PathBuf>,

        /// Skip closed (not merged) pull requests
        #[clap(long = "skip_closed")]
        skip_closed: bool,
    },

    /// Retrieves the commenters of a pull request ("org/project/number") or of a list of pull requests
    Commenters {
        #[clap(required_unless_present = "file")]
        pr: Option<String>,

        /// CSV file listing pull requests, with the header of the submitters output
        #[clap(short, long, conflicts_with = "pr")]
        file: Option<PathBuf>,
    },
}

fn handle_format(value: &str) -> clap::Result<String, String> {
    if is_valid_handle(value) {
        Ok(value.to_string())
    } else {
        Err(format!("\"{}\" is not a valid GitHub organization.", value))
    }
}

#[test]
fn parse_test() {
    let args = Args::try_parse_from([
        "contributors",
        "get",
        "submitters",
        "jenkinsci",
        "2023-09",
        "-x",
        "excluded.txt",
        "--skip_closed",
        "-o",
        "out.csv",
        "-a",
        "--no_header",
    ])
    .unwrap();
    assert!(args.append && args.no_header && !args.verbose);
    assert_eq!(args.out_or(DEFAULT_SUBMITTERS_FILE), PathBuf::from("out.csv"));
    assert_eq!(args.token_var, DEFAULT_TOKEN_VAR);
    match args.command {
        Command::Get(GetCommand::Submitters {
            org,
            month,
            exclude,
            skip_closed,
        }) => {
            assert_eq!(org, "jenkinsci");
            assert_eq!(month, "2023-09");
            assert_eq!(exclude, Some(PathBuf::from("excluded.txt")));
            assert!(skip_closed);
        }
        command => panic!("unexpected command {:?}", command),
    }
}

#[test]
fn commenters_parse_test() {
    let args = Args::try_parse_from(["contributors", "get", "commenters", "on4kjm/flecli/1", "-v"]).unwrap();
    assert!(args.verbose);
    assert_eq!(args.out_or(DEFAULT_COMMENTERS_FILE), PathBuf::from(DEFAULT_COMMENTERS_FILE));
    assert!(Args::try_parse_from(["contributors", "get", "commenters"]).is_err());
    assert!(Args::try_parse_from(["contributors", "get", "commenters", "a/b/1", "-f", "list.csv"]).is_err());
}

#[test]
fn honor_parse_test() {
    let args =
        Args::try_parse_from(["contributors", "honor", "2024-04", "--org", "on4kjm", "--org", "jenkinsci"]).unwrap();
    match args.command {
        Command::Honor { data_dir, orgs, .. } => {
            assert_eq!(data_dir, PathBuf::from("data"));
            assert_eq!(orgs, vec!["on4kjm", "jenkinsci"]);
        }
        command => panic!("unexpected command {:?}", command),
    }
    assert!(Args::try_parse_from(["contributors", "honor", "2024-04", "--org", "not an org"]).is_err());
}
