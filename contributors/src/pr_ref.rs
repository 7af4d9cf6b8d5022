use crate::api::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

// Stricter GitHub rules (no leading, trailing or double "-") are not enforced: existing data breaks them.
static HANDLE_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-]+$").expect("handle regex is valid"));
static PROJECT_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.\-]+$").expect("project regex is valid"));

/// Validates whether the input is formatted as a GitHub user or organization.
pub fn is_valid_handle(input: &str) -> bool {
    HANDLE_FORMAT.is_match(input)
}

/// Validates whether the input is formatted as a GitHub repository name.
pub fn is_valid_project(input: &str) -> bool {
    PROJECT_FORMAT.is_match(input)
}

/// Pull request reference, written `org/project/number`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrRef {
    pub org: String,
    pub project: String,
    pub number: u64,
}

impl PrRef {
    pub fn new(org: &str, project: &str, number: &str) -> Result<Self> {
        let org = org.trim();
        let project = project.trim();
        let number = number.trim();
        if org.is_empty() {
            return Err(invalid("organization element is empty"));
        }
        if project.is_empty() {
            return Err(invalid("project element is empty"));
        }
        if number.is_empty() {
            return Err(invalid("PR element is empty"));
        }
        if !is_valid_handle(org) {
            return Err(invalid(format!("\"{}\" is not a valid GitHub organization", org)));
        }
        if !is_valid_project(project) {
            return Err(invalid(format!("\"{}\" is not a valid GitHub project", project)));
        }
        let number = Some(number)
            .filter(|number| number.bytes().all(|byte| byte.is_ascii_digit()))
            .and_then(|number| number.parse::<u64>().ok())
            .filter(|number| *number > 0)
            .ok_or_else(|| invalid(format!("PR part \"{}\" is not a positive number", number)))?;
        Ok(PrRef {
            org: org.to_string(),
            project: project.to_string(),
            number,
        })
    }
}

fn invalid(reason: impl Display) -> Error {
    Error::InputInvalid(format!("Invalid PR specification (\"org/project/pr\"): {}", reason))
}

impl FromStr for PrRef {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self> {
        match spec.trim().split('/').collect::<Vec<_>>().as_slice() {
            [org, project, number] => PrRef::new(org, project, number),
            parts => Err(invalid(format!("expecting 3 elements, found {}", parts.len()))),
        }
    }
}

impl Display for PrRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.project, self.number)
    }
}

#[test]
fn pr_ref_round_trip_test() {
    let cases = [
        ("on4kjm/flecli/1", "on4kjm", "flecli", 1),
        ("jenkinsci/aqua-security-scanner-plugin/51", "jenkinsci", "aqua-security-scanner-plugin", 51),
        ("jenkins-infra/jenkins.io/6500", "jenkins-infra", "jenkins.io", 6500),
        ("a/b_c/42", "a", "b_c", 42),
        ("  jenkinsci/credentials-plugin/475 ", "jenkinsci", "credentials-plugin", 475),
    ];
    for (spec, org, project, number) in cases {
        let pr: PrRef = spec.parse().unwrap();
        assert_eq!(pr, PrRef { org: org.into(), project: project.into(), number });
        assert_eq!(pr.to_string(), spec.trim());
    }
}

#[test]
fn pr_ref_invalid_test() {
    for spec in [
        "",
        "jenkinsci/credentials-plugin",
        "jenkinsci/credentials-plugin/475/1",
        "/credentials-plugin/475",
        "jenkinsci//475",
        "jenkinsci/credentials-plugin/",
        "jenkinsci/credentials-plugin/abc",
        "jenkinsci/credentials-plugin/0",
        "jenkinsci/credentials-plugin/-3",
        "jenkinsci/credentials-plugin/+5",
        "jenkins ci/credentials-plugin/1",
        "jenkinsci/credentials plugin/1",
    ] {
        assert!(
            matches!(spec.parse::<PrRef>(), Err(Error::InputInvalid(_))),
            "{:?} should be rejected",
            spec
        );
    }
}

#[test]
fn handle_test() {
    assert!(is_valid_handle("jenkinsci"));
    assert!(is_valid_handle("jenkins-infra"));
    assert!(is_valid_handle("trailing-"));
    assert!(!is_valid_handle(""));
    assert!(!is_valid_handle("dependabot[bot]"));
    assert!(!is_valid_handle("with space"));
}
