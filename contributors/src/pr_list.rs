use crate::api::{Error, Result};
use crate::pr_ref::PrRef;
use crate::record::submitters_columns;
use csv::StringRecord;
use log::debug;
use std::path::Path;

/// Checks that a loaded CSV header is exactly `reference`.
pub fn validate_header(found: &StringRecord, reference: &[&str]) -> Result<()> {
    if found.len() != reference.len() {
        return Err(Error::InputInvalid(format!(
            "Header is incorrect: field number mismatch (found {}, wanted {})",
            found.len(),
            reference.len()
        )));
    }
    for (index, (found, wanted)) in found.iter().zip(reference).enumerate() {
        if found != *wanted {
            return Err(Error::InputInvalid(format!(
                "Header is incorrect: not the expected header field at column {} (found \"{}\", wanted \"{}\")",
                index + 1,
                found,
                wanted
            )));
        }
    }
    Ok(())
}

/// Loads the pull requests listed in a submitters CSV file.
///
/// Only the `org`, `repository` and `number` columns are used.
pub fn load_pr_list(path: impl AsRef<Path>) -> Result<Vec<PrRef>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| Error::InputInvalid(format!("Unable to read input file {}: {}", path.display(), err)))?;
    validate_header(reader.headers()?, &submitters_columns())?;
    debug!("Header of {} is correct", path.display());

    let mut pull_requests = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |index: usize| record.get(index).unwrap_or_default();
        pull_requests.push(PrRef::new(field(0), field(1), field(2))?);
    }
    if pull_requests.is_empty() {
        return Err(Error::InputInvalid(format!(
            "No data available after the header in {}",
            path.display()
        )));
    }
    debug!("Loaded {} pull request(s) from {}", pull_requests.len(), path.display());
    Ok(pull_requests)
}
