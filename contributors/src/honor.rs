use crate::api::{Budget, Client, Error, Result};
use crate::period::{DateRange, Month};
use crate::pr_list::validate_header;
use derive_more::Constructor;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const HONORED_HEADER: &str = "MONTH,GH_HANDLE,FULL_NAME,COMPANY,GH_HANDLE_URL,GH_HANDLE_AVATAR,NBR_PRS,REPOSITORIES";
pub const TALLY_HEADER: [&str; 2] = ["user", "PR"];
pub const DEFAULT_ORGS: [&str; 2] = ["jenkinsci", "jenkins-infra"];

/// `<data_dir>/pr_per_submitter-YYYY-MM.csv`
pub fn input_file_name(data_dir: &Path, month: &Month) -> PathBuf {
    data_dir.join(format!("pr_per_submitter-{}.csv", month))
}

/// Search predicate for the pull requests `login` created in any of `orgs` within `range`.
pub fn honor_search<S: AsRef<str>>(orgs: &[S], login: &str, range: &DateRange) -> String {
    let orgs: Vec<String> = orgs.iter().map(|org| format!("org:{}", org.as_ref())).collect();
    format!("{} is:pr author:{} created:{}", orgs.join(" "), login, range)
}

/// Number of pull requests a submitter opened during the month.
#[derive(Constructor, Debug, Clone, PartialEq, Eq)]
pub struct SubmitterTally {
    pub user: String,
    pub prs: u32,
}

/// Loads a `user,PR` file, which must hold at least one record.
pub fn load_submitter_tallies(path: impl AsRef<Path>) -> Result<Vec<SubmitterTally>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| Error::InputInvalid(format!("Unable to read input file {}: {}", path.display(), err)))?;
    validate_header(reader.headers()?, &TALLY_HEADER)?;

    let mut tallies = Vec::new();
    for record in reader.records() {
        let record = record?;
        let user = record.get(0).unwrap_or_default().trim();
        let prs = record.get(1).unwrap_or_default().trim();
        let prs = prs
            .parse::<u32>()
            .map_err(|_| Error::InputInvalid(format!("PR count \"{}\" of {} is not a number", prs, user)))?;
        tallies.push(SubmitterTally::new(user.to_string(), prs));
    }
    if tallies.is_empty() {
        return Err(Error::InputInvalid(format!(
            "No data available after the header in {}",
            path.display()
        )));
    }
    debug!("Loaded {} submitter(s) from {}", tallies.len(), path.display());
    Ok(tallies)
}

pub fn pick_random<'a, R: Rng + ?Sized>(tallies: &'a [SubmitterTally], rng: &mut R) -> Option<&'a SubmitterTally> {
    tallies.choose(rng)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HonoredContributor {
    pub handle: String,
    pub full_name: String,
    pub url: String,
    pub avatar_url: String,
    pub company: String,
    pub month: String,
    pub found_prs: u32,
    pub expected_prs: u32,
    /// Distinct `owner/name` repositories, in search order.
    pub repositories: Vec<String>,
}

impl HonoredContributor {
    pub fn repositories_field(&self) -> String {
        self.repositories.join(" ")
    }

    pub fn to_csv_line(&self) -> String {
        let found_prs = self.found_prs.to_string();
        let repositories = self.repositories_field();
        [
            &self.month,
            &self.handle,
            &self.full_name,
            &self.company,
            &self.url,
            &self.avatar_url,
            &found_prs,
            &repositories,
        ]
        .iter()
        .map(|field| format!("\"{}\"", field))
        .collect::<Vec<_>>()
        .join(", ")
    }
}

impl Display for HonoredContributor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PRs found:    {}", self.found_prs)?;
        writeln!(f, "PRs expected: {}", self.expected_prs)?;
        writeln!(f, "Repositories: {}", self.repositories_field())?;
        writeln!(f)?;
        writeln!(f, "GH handle:    {}", self.handle)?;
        writeln!(f, "User name:    {}", self.full_name)?;
        writeln!(f, "URL:          {}", self.url)?;
        writeln!(f, "Avatar:       {}", self.avatar_url)?;
        write!(f, "Company:      {}", self.company)
    }
}

/// Gathers what is shown about the contributor honored for a month.
#[derive(Constructor)]
pub struct HonorFetcher<CLIENT, BUDGET>
where
    CLIENT: Client + ?Sized,
    BUDGET: Budget + ?Sized,
{
    client: Arc<CLIENT>,
    budget: Arc<BUDGET>,
    orgs: Vec<String>,
}

impl<CLIENT, BUDGET> HonorFetcher<CLIENT, BUDGET>
where
    CLIENT: Client + ?Sized,
    BUDGET: Budget + ?Sized,
{
    /// Fetches the profile of `login` and the repositories of the pull requests they created during `month`.
    ///
    /// A found pull request count differing from `expected_prs` is reported, not rejected.
    pub async fn fetch(&self, login: &str, expected_prs: u32, month: &Month) -> Result<HonoredContributor> {
        self.budget.ensure_budget(2).await?;
        let profile = self.client.user_profile(login).await?;
        self.budget.observe(&profile.rate).await?;
        let profile = profile.data;

        let search = honor_search(&self.orgs, login, &month.range()?);
        self.budget.ensure_budget(2).await?;
        let authored = self.client.authored_pull_requests(&search).await?;
        self.budget.observe(&authored.rate).await?;
        let authored = authored.data;
        if authored.issue_count != expected_prs {
            debug!(
                "{} has {} PR(s) in {}, {} expected",
                login, authored.issue_count, month, expected_prs
            );
        }

        let mut repositories: Vec<String> = Vec::new();
        for repository in authored.repositories {
            if !repositories.contains(&repository) {
                repositories.push(repository);
            }
        }
        Ok(HonoredContributor {
            handle: login.to_string(),
            full_name: profile.name,
            url: profile.url,
            avatar_url: profile.avatar_url,
            company: profile.company,
            month: month.to_string(),
            found_prs: authored.issue_count,
            expected_prs,
            repositories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AuthoredPullRequests, UserProfile};
    use crate::testing::{FakeClient, RecordingBudget};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;

    fn profile() -> UserProfile {
        UserProfile {
            login: "basil".into(),
            name: "Basil Crow".into(),
            company: "CloudBees".into(),
            avatar_url: "https://avatars.githubusercontent.com/u/29850?v=4".into(),
            url: "https://github.com/basil".into(),
        }
    }

    #[test]
    fn search_test() {
        let range = "2024-04".parse::<Month>().unwrap().range().unwrap();
        assert_eq!(
            honor_search(&DEFAULT_ORGS, "dduportal", &range),
            "org:jenkinsci org:jenkins-infra is:pr author:dduportal created:2024-04-01..2024-04-30"
        );
        assert_eq!(
            honor_search(&["on4kjm".to_string()], "on4kjm", &range),
            "org:on4kjm is:pr author:on4kjm created:2024-04-01..2024-04-30"
        );
    }

    #[tokio::test]
    async fn fetch_test() {
        let month: Month = "2024-04".parse().unwrap();
        let search = honor_search(&DEFAULT_ORGS, "basil", &month.range().unwrap());
        let client = FakeClient::default().with_profile(profile()).with_authored(
            search,
            AuthoredPullRequests::new(
                4,
                vec![
                    "jenkinsci/jenkins".into(),
                    "jenkinsci/bom".into(),
                    "jenkinsci/jenkins".into(),
                    "jenkins-infra/jenkins.io".into(),
                ],
            ),
        );
        let budget = Arc::new(RecordingBudget::default());
        let fetcher = HonorFetcher::new(
            Arc::new(client),
            budget.clone(),
            DEFAULT_ORGS.iter().map(|org| org.to_string()).collect(),
        );

        let honored = fetcher.fetch("basil", 5, &month).await.unwrap();
        assert_eq!(honored.found_prs, 4);
        assert_eq!(honored.expected_prs, 5);
        assert_eq!(honored.repositories_field(), "jenkinsci/jenkins jenkinsci/bom jenkins-infra/jenkins.io");
        assert_eq!(
            honored.to_csv_line(),
            "\"2024-04\", \"basil\", \"Basil Crow\", \"CloudBees\", \"https://github.com/basil\", \
             \"https://avatars.githubusercontent.com/u/29850?v=4\", \"4\", \
             \"jenkinsci/jenkins jenkinsci/bom jenkins-infra/jenkins.io\""
        );
        assert!(honored.to_string().contains("PRs expected: 5"));
        assert_eq!(budget.observed(), 2);
    }

    #[test]
    fn tallies_test() {
        let dir = tempfile::tempdir().unwrap();
        let month: Month = "2024-04".parse().unwrap();
        let path = input_file_name(dir.path(), &month);
        assert!(path.ends_with("pr_per_submitter-2024-04.csv"));

        fs::write(&path, "user,PR\nbasil,5\ndduportal,12\n").unwrap();
        let tallies = load_submitter_tallies(&path).unwrap();
        assert_eq!(
            tallies,
            vec![SubmitterTally::new("basil".into(), 5), SubmitterTally::new("dduportal".into(), 12)]
        );

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let picked = pick_random(&tallies, &mut rng).unwrap();
            assert!(tallies.contains(picked));
        }
        assert!(pick_random(&[], &mut rng).is_none());
    }

    #[test]
    fn invalid_tallies_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tallies.csv");
        for content in ["user,PR\n", "login,PR\nbasil,5\n", "user,PR\nbasil,many\n"] {
            fs::write(&path, content).unwrap();
            assert!(
                matches!(load_submitter_tallies(&path), Err(Error::InputInvalid(_))),
                "{:?} should be rejected",
                content
            );
        }
    }
}
