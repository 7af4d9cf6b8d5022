use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_TITLE_LEN: usize = 40;
const ELLIPSIS: &str = "...";

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("line break regex is valid"));

/// Makes a title or a body safe for a quoted CSV field and shortens it.
pub fn clean_title(input: &str) -> String {
    let single_line = LINE_BREAK.replace_all(input, " ");
    truncate(&single_line.replace('"', "'"), MAX_TITLE_LEN)
}

/// Shortens `input` to at most `max` bytes, ellipsis included, cutting at the last whitespace.
///
/// Input without any whitespace is returned as is.
pub fn truncate(input: &str, max: usize) -> String {
    if input.len() <= max || !input.chars().any(char::is_whitespace) {
        return input.to_string();
    }
    let budget = max.saturating_sub(ELLIPSIS.len());
    let fitting = || input.char_indices().take_while(move |(index, _)| *index <= budget);
    let cut = fitting()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(index, _)| index)
        .last()
        .or_else(|| fitting().map(|(index, _)| index).last())
        .unwrap_or(0);
    format!("{}{}", &input[..cut], ELLIPSIS)
}
