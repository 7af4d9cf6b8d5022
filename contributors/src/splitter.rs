use crate::api::{Error, Result};
use crate::period::{DateRange, Month};
use log::debug;

/// Maximal number of results a single paginated search can return.
pub const QUERY_LIMIT: u32 = 1000;

/// A month can't be split in more windows than it has days.
pub const MAX_ITEMS: u32 = 28 * QUERY_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub range: DateRange,
    pub has_more: bool,
}

/// Number of sub-windows needed to fetch `total_items` of the given month.
pub fn window_count(total_items: u32, month: &Month) -> Result<u32> {
    if total_items > MAX_ITEMS {
        return Err(Error::InputInvalid(format!(
            "{} items can't be split in windows of {} (at most {})",
            total_items, QUERY_LIMIT, MAX_ITEMS
        )));
    }
    if total_items <= QUERY_LIMIT {
        return Ok(1);
    }
    Ok(std::cmp::min(total_items / QUERY_LIMIT + 1, month.days()))
}

/// Computes the `iteration`-th sub-window of `month` so that each holds less than [`QUERY_LIMIT`] items.
///
/// Windows are slices of whole days. The last one is stretched to the end of the month to absorb rounding.
///
/// # Arguments
/// * `total_items` - Number of items in the whole month, as reported by the count probe
/// * `month` - Month to split
/// * `iteration` - Zero-based index of the requested window
pub fn split(total_items: u32, month: &Month, iteration: u32) -> Result<Window> {
    let windows = window_count(total_items, month)?;
    if iteration >= windows {
        return Err(Error::InputInvalid(format!(
            "requested iteration ({}) is out of the {} window(s) of {}",
            iteration, windows, month
        )));
    }

    let days_per_window = month.days() / windows;
    let has_more = iteration + 1 < windows;
    let start = month.day(days_per_window * iteration + 1)?;
    let end = if has_more {
        month.day(days_per_window * (iteration + 1))?
    } else {
        month.day(month.days())?
    };
    let range = DateRange::new(start, end)?;

    debug!("Iteration {} start: {} end: {} has more iterations: {}", iteration, start, end, has_more);
    Ok(Window { range, has_more })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn month(value: &str) -> Month {
        value.parse().unwrap()
    }

    fn windows(total: u32, month: &Month) -> Vec<Window> {
        let mut windows = Vec::new();
        let mut iteration = 0;
        loop {
            let window = split(total, month, iteration).unwrap();
            windows.push(window);
            if !window.has_more {
                return windows;
            }
            iteration += 1;
        }
    }

    #[test]
    fn below_limit_test() {
        let september = month("2023-09");
        let window = split(692, &september, 0).unwrap();
        assert_eq!(window.range.to_string(), "2023-09-01..2023-09-30");
        assert!(!window.has_more);

        for total in [0, 1, 999, QUERY_LIMIT] {
            assert_eq!(split(total, &september, 0).unwrap().range, september.range().unwrap());
            assert!(split(total, &september, 1).is_err());
        }
    }

    #[test]
    fn above_limit_test() {
        let january = month("2020-01");
        let windows = windows(1233, &january);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].range.to_string(), "2020-01-01..2020-01-15");
        assert!(windows[0].has_more);
        assert_eq!(windows[1].range.to_string(), "2020-01-16..2020-01-31");
        assert!(!windows[1].has_more);
        assert!(split(1233, &january, 2).is_err());
    }

    #[test]
    fn too_many_items_test() {
        let january = month("2020-01");
        for iteration in [0, 1, 28, 100] {
            assert!(split(MAX_ITEMS + 1, &january, iteration).is_err());
        }
    }

    #[test]
    fn partition_test() {
        let months = ["2023-01", "2023-02", "2024-02", "2023-04", "2021-12"].map(month);
        let totals = (0..=MAX_ITEMS).step_by(137).chain([1000, 1001, 1999, 2000, 27999, MAX_ITEMS]);
        for total in totals {
            for month in &months {
                let mut expected_day = 1;
                for window in windows(total, month) {
                    assert_eq!(window.range.start().day(), expected_day, "gap or overlap for {} in {}", total, month);
                    expected_day = window.range.end().day() + 1;
                }
                assert_eq!(expected_day, month.days() + 1, "{} items in {} not fully covered", total, month);
            }
        }
    }
}
