use crate::api::{Error, Result};
use crate::exclusions::ExcludedAuthors;
use crate::pr_ref::is_valid_handle;
use crate::sink::CsvSink;
use chrono::{DateTime, Local};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

static FILE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^file:").expect("file prefix regex is valid"));

/// Who to remove: a single user, or every user listed in an exclusions file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalTarget {
    User(String),
    File(PathBuf),
}

impl RemovalTarget {
    pub fn parse(spec: &str) -> Result<Self> {
        if FILE_PREFIX.is_match(spec) {
            let path = FILE_PREFIX.replace(spec, "");
            return Ok(RemovalTarget::File(PathBuf::from(path.as_ref())));
        }
        if !is_valid_handle(spec) {
            return Err(Error::InputInvalid(format!("{} is not a valid GitHub user", spec)));
        }
        Ok(RemovalTarget::User(spec.to_string()))
    }

    pub fn authors(&self) -> Result<Vec<String>> {
        match self {
            RemovalTarget::User(user) => Ok(vec![user.clone()]),
            RemovalTarget::File(path) => ExcludedAuthors::load(path)
                .map(|excluded| excluded.handles().to_vec())
                .map_err(|err| Error::InputInvalid(format!("invalid excluded user list => {}", err))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub removed: usize,
    pub backup: Option<PathBuf>,
}

/// `<dir>/removeBackup_YYYYMMDD_HHMMSS__<name>`
pub fn backup_file_name(path: &Path, now: DateTime<Local>) -> PathBuf {
    let name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    let backup = format!("removeBackup_{}__{}", now.format("%Y%m%d_%H%M%S"), name);
    match path.parent() {
        Some(dir) => dir.join(backup),
        None => PathBuf::from(backup),
    }
}

/// Removes every line of `path` mentioning one of `authors`.
///
/// The file is rewritten only if something was removed, after an optional backup of the original content.
pub fn remove_authors(path: impl AsRef<Path>, authors: &[String], backup: bool) -> Result<RemovalOutcome> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::InputInvalid(format!("{} is not an existing file", path.display())));
    }
    let content = fs::read_to_string(path)?;
    let original: Vec<&str> = content.lines().collect();
    if original.len() <= 1 {
        return Err(Error::InputInvalid(format!(
            "\"{}\" seems empty. Retrieved {} lines.",
            path.display(),
            original.len()
        )));
    }

    let cleaned: Vec<&str> = original
        .iter()
        .copied()
        .filter(|line| !authors.iter().any(|author| line.contains(author.as_str())))
        .collect();
    if cleaned.len() > original.len() {
        return Err(Error::InternalInvariant(
            "the cleaned file increased in size".to_string(),
        ));
    }
    let removed = original.len() - cleaned.len();
    debug!("{} of {} line(s) of {} mention {:?}", removed, original.len(), path.display(), authors);
    if removed == 0 {
        return Ok(RemovalOutcome { removed, backup: None });
    }

    let backup = if backup {
        let backup_path = backup_file_name(path, Local::now());
        info!("Creating backup file: {}", backup_path.display());
        rewrite(&backup_path, &original)?;
        Some(backup_path)
    } else {
        None
    };
    rewrite(path, &cleaned)?;
    Ok(RemovalOutcome { removed, backup })
}

fn rewrite(path: &Path, lines: &[&str]) -> Result<()> {
    let mut sink = CsvSink::open(path, false, true)?;
    sink.write_rows("", lines)?;
    sink.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DATA: &str = "PR_ref,commenter,month\n\
                        \"jenkinsci/credentials-plugin/475\",\"jtnord\",\"2023-09\"\n\
                        \"jenkinsci/credentials-plugin/475\",\"jenkins-infra-bot\",\"2023-09\"\n\
                        \"on4kjm/flecli/1\",\"jtnord\",\"2020-07\"\n\
                        \"on4kjm/flecli/1\",\"on4kjm\",\"2020-07\"\n";

    fn data_file(dir: &Path) -> PathBuf {
        let path = dir.join("commenters_data.csv");
        fs::write(&path, DATA).unwrap();
        path
    }

    #[test]
    fn target_test() {
        assert_eq!(RemovalTarget::parse("jtnord").unwrap(), RemovalTarget::User("jtnord".into()));
        assert_eq!(
            RemovalTarget::parse("File:data/excluded.txt").unwrap(),
            RemovalTarget::File("data/excluded.txt".into())
        );
        assert_eq!(
            RemovalTarget::parse("file:excluded.txt").unwrap(),
            RemovalTarget::File("excluded.txt".into())
        );
        assert!(matches!(RemovalTarget::parse("not a user"), Err(Error::InputInvalid(_))));
    }

    #[test]
    fn remove_with_backup_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = data_file(dir.path());
        let outcome = remove_authors(&path, &["jtnord".to_string()], true).unwrap();
        assert_eq!(outcome.removed, 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "PR_ref,commenter,month\n\
             \"jenkinsci/credentials-plugin/475\",\"jenkins-infra-bot\",\"2023-09\"\n\
             \"on4kjm/flecli/1\",\"on4kjm\",\"2020-07\"\n"
        );
        let backup = outcome.backup.unwrap();
        assert_eq!(backup.parent(), Some(dir.path()));
        assert_eq!(fs::read_to_string(backup).unwrap(), DATA);
    }

    #[test]
    fn remove_listed_authors_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = data_file(dir.path());
        let list = dir.path().join("excluded.txt");
        fs::write(&list, "# bots\njenkins-infra-bot\non4kjm\n").unwrap();

        let target = RemovalTarget::parse(&format!("FILE:{}", list.display())).unwrap();
        let outcome = remove_authors(&path, &target.authors().unwrap(), false).unwrap();
        // "on4kjm" also matches the PR reference of the flecli lines.
        assert_eq!(outcome, RemovalOutcome { removed: 3, backup: None });
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "PR_ref,commenter,month\n\"jenkinsci/credentials-plugin/475\",\"jtnord\",\"2023-09\"\n"
        );
    }

    #[test]
    fn nothing_to_remove_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = data_file(dir.path());
        let outcome = remove_authors(&path, &["basil".to_string()], true).unwrap();
        assert_eq!(outcome, RemovalOutcome { removed: 0, backup: None });
        assert_eq!(fs::read_to_string(&path).unwrap(), DATA);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn empty_file_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header_only.csv");
        fs::write(&path, "PR_ref,commenter,month\n").unwrap();
        assert!(matches!(
            remove_authors(&path, &["jtnord".to_string()], false),
            Err(Error::InputInvalid(_))
        ));
        assert!(matches!(
            remove_authors(dir.path().join("missing.csv"), &["jtnord".to_string()], false),
            Err(Error::InputInvalid(_))
        ));
    }

    #[test]
    fn backup_name_test() {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 10, 20, 30).unwrap();
        assert_eq!(
            backup_file_name(Path::new("data/submitters_data.csv"), now),
            PathBuf::from("data/removeBackup_20240115_102030__submitters_data.csv")
        );
    }
}
