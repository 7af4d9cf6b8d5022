//! Monthly contributor statistics
//!
//! # Overview
//!
//! Community stewards want to know who submits pull requests to an organization, who comments on them,
//! and who deserves to be publicly thanked each month.
//! This library pulls that activity from GitHub's GraphQL API and turns it into CSV rows.
//!
//! Given an organization and a month (`YYYY-MM`), the submitter collector first asks how many pull requests
//! were created in that month. The search API never returns more than 1000 results for a single query, so
//! larger months are split into sub-windows of days, each of which is paginated through with an opaque cursor.
//! Given a pull request reference (`org/project/number`), the commenter collector retrieves its general comments,
//! its reviews and the line comments nested under each review.
//!
//! Every query reports the remaining API budget. Collectors feed it to a [`api::Budget`] which sleeps until the
//! reset time when the next call would not fit.

pub mod api;
pub mod exclusions;
pub mod period;
pub mod pr_list;
pub mod pr_ref;
pub mod record;
pub mod remove;
pub mod sink;
pub mod splitter;
pub mod text;

#[cfg(feature = "collector")]
pub mod commenters;
#[cfg(feature = "collector")]
pub mod honor;
#[cfg(feature = "collector")]
pub mod progress;
#[cfg(feature = "collector")]
pub mod submitters;

#[cfg(test)]
mod testing;

pub use api::{Error, Result};
pub use period::{DateRange, Month};
pub use pr_ref::PrRef;
