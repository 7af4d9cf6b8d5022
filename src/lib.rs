mod args;
mod logging;

pub use args::{
    Args, Command, GetCommand, DEFAULT_COMMENTERS_FILE, DEFAULT_HONORED_FILE, DEFAULT_SUBMITTERS_FILE,
    DEFAULT_TOKEN_VAR,
};
pub use contributors::{Error, Result};
pub use logging::DEBUG_LOG;

use chrono::{Local, Utc};
use contributors::api::{Budget, Client};
use contributors::commenters::CommenterCollector;
use contributors::exclusions::ExcludedAuthors;
use contributors::honor::{
    input_file_name, load_submitter_tallies, pick_random, HonorFetcher, DEFAULT_ORGS, HONORED_HEADER,
};
use contributors::pr_list::load_pr_list;
use contributors::pr_ref::is_valid_handle;
use contributors::progress::Progress;
use contributors::record::{CommentRecord, SubmitterRecord, COMMENTERS_HEADER, SUBMITTERS_HEADER};
use contributors::remove::{remove_authors, RemovalTarget};
use contributors::sink::CsvSink;
use contributors::submitters::SubmitterCollector;
use contributors::{Month, PrRef};
use github_client::{GithubClient, GithubClientBuilder, RateLimiter};
use log::{debug, info};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const USER_AGENT: &str = concat!("contributors/", env!("CARGO_PKG_VERSION"));

/// Runs the command given on the command line.
pub async fn run(args: Args) -> Result<()> {
    logging::init_logging(args.debug);
    if args.debug {
        println!("*** Debug mode enabled ***\nSee \"{}\" for the trace", DEBUG_LOG);
        debug!("******** New debug session ********");
    }

    match &args.command {
        Command::Get(GetCommand::Submitters {
            org,
            month,
            exclude,
            skip_closed,
        }) => get_submitters(&args, org, month, exclude.as_deref(), *skip_closed).await,
        Command::Get(GetCommand::Commenters { pr, file }) => {
            get_commenters(&args, pr.as_deref(), file.as_deref()).await
        }
        Command::Honor {
            month,
            data_dir,
            output,
            orgs,
        } => honor(&args, month, data_dir, output.as_deref(), orgs).await,
        Command::Remove { user, file, backup } => remove(&args, user, file, *backup),
        Command::Quota => quota(&args).await,
    }
}

/// Reads the GitHub token from the environment variable `var`.
pub fn load_token(var: &str) -> Result<SecretString> {
    match std::env::var(var) {
        Ok(token) if !token.trim().is_empty() => Ok(SecretString::new(token.trim().to_string())),
        _ => Err(Error::AuthMissing(var.to_string())),
    }
}

fn connect(args: &Args) -> Result<(Arc<GithubClient>, Arc<RateLimiter>)> {
    let token = load_token(&args.token_var)?;
    let client = GithubClientBuilder::default()
        .with_github_url(&args.api_url)
        .try_with_token(token)?
        .try_with_user_agent(USER_AGENT)?
        .build()?;
    Ok((Arc::new(client), Arc::new(RateLimiter::default())))
}

fn parse_org(org: &str) -> Result<&str> {
    if is_valid_handle(org) {
        Ok(org)
    } else {
        Err(Error::InputInvalid(format!("\"{}\" is not a valid GitHub organization", org)))
    }
}

async fn get_submitters(args: &Args, org: &str, month: &str, exclude: Option<&Path>, skip_closed: bool) -> Result<()> {
    let org = parse_org(org)?;
    let month: Month = month.parse()?;
    let excluded = match exclude {
        Some(path) => ExcludedAuthors::load(path)?,
        None => ExcludedAuthors::default(),
    };
    let (client, budget) = connect(args)?;
    if args.debug {
        let rate = client.rate_limit().await?;
        debug!(
            "Starting quota: {} of {} remaining, reset at {}",
            rate.remaining, rate.limit, rate.reset_at
        );
        budget.observe(&rate).await?;
    }

    let progress = Arc::new(Progress::new(args.verbose));
    let collector = SubmitterCollector::new(client, budget, excluded, skip_closed, progress.clone());
    let mut sink = CsvSink::open(args.out_or(DEFAULT_SUBMITTERS_FILE), args.append, args.no_header)?;
    progress.verbose(format!("Output file: {} ({})", sink.path().display(), sink.mode()));
    let summary = collector
        .collect(org, &month, |records| {
            sink.write_rows(SUBMITTERS_HEADER, records.iter().map(SubmitterRecord::to_csv_line))
        })
        .await;
    sink.close()?;
    let summary = summary?;
    info!(
        "{} of {} pull request(s) of {} in {} written",
        summary.emitted, summary.total, org, month
    );
    Ok(())
}

async fn get_commenters(args: &Args, pr: Option<&str>, file: Option<&Path>) -> Result<()> {
    let prs: Vec<PrRef> = match (pr, file) {
        (_, Some(file)) => load_pr_list(file)?,
        (Some(pr), None) => vec![pr.parse()?],
        (None, None) => {
            return Err(Error::InputInvalid(
                "a PR specification or a PR list file is required".to_string(),
            ))
        }
    };
    let (client, budget) = connect(args)?;
    let progress = Arc::new(Progress::new(args.verbose));
    if file.is_some() {
        progress.verbose(format!("Successfully loaded {} Pull Request(s) to analyze", prs.len()));
    }
    let big_file = match file {
        Some(_) => is_big_file(client.as_ref(), budget.as_ref(), prs.len()).await?,
        None => false,
    };

    let collector = CommenterCollector::new(client, budget, big_file, progress.clone());
    let path = args.out_or(DEFAULT_COMMENTERS_FILE);
    progress.reset_total(prs.len() as u64);
    let mut sink: Option<CsvSink> = None;
    let mut total = 0;
    for pr in &prs {
        progress.set_message(pr.to_string());
        let (count, records) = collector.collect(pr).await?;
        progress.inc(1);
        if count == 0 {
            continue;
        }
        total += count;
        if sink.is_none() {
            let opened = CsvSink::open(&path, args.append, args.no_header)?;
            progress.verbose(format!("Output file: {} ({})", opened.path().display(), opened.mode()));
            sink = Some(opened);
        }
        if let Some(sink) = sink.as_mut() {
            sink.write_rows(COMMENTERS_HEADER, records.iter().map(CommentRecord::to_csv_line))?;
        }
    }
    progress.finish();
    if let Some(sink) = sink {
        sink.close()?;
    }
    info!("{} comment(s) found in {} pull request(s)", total, prs.len());
    Ok(())
}

/// Whether a list of `pr_count` pull requests needs more calls than the remaining quota.
async fn is_big_file<CLIENT, BUDGET>(client: &CLIENT, budget: &BUDGET, pr_count: usize) -> Result<bool>
where
    CLIENT: Client + ?Sized,
    BUDGET: Budget + ?Sized,
{
    let rate = client.rate_limit().await?;
    budget.observe(&rate).await?;
    let big_file = pr_count as i64 > rate.remaining;
    if big_file {
        info!(
            "{} pull requests for {} remaining calls: checking the quota before each one",
            pr_count, rate.remaining
        );
    }
    Ok(big_file)
}

async fn honor(args: &Args, month: &str, data_dir: &Path, output: Option<&Path>, orgs: &[String]) -> Result<()> {
    let month: Month = month.parse()?;
    if !data_dir.is_dir() {
        return Err(Error::InputInvalid(format!(
            "Supplied DataDir \"{}\" does not exist.",
            data_dir.display()
        )));
    }
    let output: PathBuf = output
        .map(Path::to_path_buf)
        .or_else(|| args.out.clone())
        .unwrap_or_else(|| data_dir.join(DEFAULT_HONORED_FILE));
    let progress = Progress::new(args.verbose);
    progress.verbose(format!("Output file: {}", output.display()));

    let tallies = load_submitter_tallies(input_file_name(data_dir, &month))?;
    let picked = pick_random(&tallies, &mut rand::thread_rng())
        .ok_or_else(|| Error::InputInvalid("No submitter to pick from".to_string()))?;
    progress.verbose(format!("  - Picked {} - {} PRs", picked.user, picked.prs));

    let orgs: Vec<String> = if orgs.is_empty() {
        DEFAULT_ORGS.iter().map(|org| org.to_string()).collect()
    } else {
        orgs.to_vec()
    };
    let (client, budget) = connect(args)?;
    let honored = HonorFetcher::new(client, budget, orgs)
        .fetch(&picked.user, picked.prs, &month)
        .await?;
    progress.verbose(format!("\n{}\n", honored));

    let mut sink = CsvSink::open(&output, args.append, args.no_header)?;
    sink.write_rows(HONORED_HEADER, [honored.to_csv_line()])?;
    sink.close()
}

fn remove(args: &Args, user: &str, file: &Path, backup: bool) -> Result<()> {
    let target = RemovalTarget::parse(user)?;
    let authors = target.authors()?;
    let progress = Progress::new(args.verbose);
    progress.verbose(format!("Removing entries for {:?} from {}", authors, file.display()));

    let outcome = remove_authors(file, &authors, backup)?;
    if let Some(backup) = &outcome.backup {
        progress.verbose(format!("Created backup file: \"{}\"", backup.display()));
    }
    if outcome.removed > 0 {
        println!(
            "Removed {} line(s) with user \"{}\" from \"{}\"",
            outcome.removed,
            user,
            file.display()
        );
    } else {
        println!("Didn't find an entry for user \"{}\" in file \"{}\"", user, file.display());
    }
    Ok(())
}

async fn quota(args: &Args) -> Result<()> {
    let (client, _) = connect(args)?;
    let rate = client.rate_limit().await?;
    let seconds_to_go = (rate.reset_at - Utc::now()).num_seconds();
    println!(
        "Limit: {}\nRemaining: {}\nReset time: {} (in {} secs)",
        rate.limit,
        rate.remaining,
        rate.reset_at.with_timezone(&Local).to_rfc2822(),
        seconds_to_go
    );
    Ok(())
}
