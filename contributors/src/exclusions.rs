use crate::api::{Error, Result};
use crate::pr_ref::is_valid_handle;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static COMMENTED_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#").expect("comment regex is valid"));
static EMPTY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*$").expect("empty line regex is valid"));

/// Authors whose pull requests are left out, in the order they were listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedAuthors {
    handles: Vec<String>,
}

impl ExcludedAuthors {
    /// Loads one handle per line, skipping full-line comments and blank lines.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|err| Error::InputInvalid(format!("Unable to read input file {}: {}", path.display(), err)))?;
        let excluded = Self::parse(&content)?;
        debug!("Loaded {} excluded author(s) from {}", excluded.len(), path.display());
        Ok(excluded)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let lines: Vec<&str> = content
            .lines()
            .filter(|line| !is_commented_line(line))
            .map(remove_inline_comment)
            .collect();
        if lines.is_empty() {
            return Err(Error::InputInvalid("Excluded authors file is empty".to_string()));
        }
        if let Some(invalid) = lines.iter().find(|line| !is_valid_handle(line)) {
            return Err(Error::InputInvalid(format!(
                "Invalid excluded user \"{}\" (does not match GitHub user syntax)",
                invalid
            )));
        }
        Ok(Self::from_handles(lines))
    }

    pub fn from_handles<I, S>(handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut excluded = ExcludedAuthors::default();
        for handle in handles {
            let handle = handle.into();
            if !excluded.contains(&handle) {
                excluded.handles.push(handle);
            }
        }
        excluded
    }

    pub fn contains(&self, login: &str) -> bool {
        self.handles.iter().any(|handle| handle == login)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[String] {
        &self.handles
    }
}

fn is_commented_line(line: &str) -> bool {
    COMMENTED_LINE.is_match(line) || EMPTY_LINE.is_match(line)
}

// Inline comments are kept: a line such as `alice # left` fails handle validation.
fn remove_inline_comment(line: &str) -> &str {
    line
}
