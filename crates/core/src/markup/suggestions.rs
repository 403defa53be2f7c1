use std::borrow::Cow;
use std::ops::Range;

/// Opens a suggestion list region.
pub const SUGGESTIONS_START: &str = "[SUGGESTIONS]";
/// Closes a suggestion list region.
pub const SUGGESTIONS_END: &str = "[/SUGGESTIONS]";
/// Separates the prompts inside a suggestion region.
pub const SUGGESTION_DELIMITER: char = '|';

/// Splits the inner text of a suggestion region into follow-up prompts.
///
/// Entries are trimmed and empty ones are dropped, so `"A||B"` yields
/// `["A", "B"]`.
pub fn split_suggestions(region: &str) -> Vec<String> {
    region
        .split(SUGGESTION_DELIMITER)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Extracts the prompts of the first closed suggestion region in `text`.
///
/// Returns `None` while the region is missing or still open.
pub fn extract_suggestions(text: &str) -> Option<Vec<String>> {
    let region = closed_regions(text).next()?;
    Some(split_suggestions(&text[region.inner]))
}

/// Removes every closed suggestion region from `text`. An unterminated
/// region is kept as is.
pub(crate) fn strip_suggestion_regions(text: &str) -> Cow<'_, str> {
    let mut regions = closed_regions(text).peekable();
    if regions.peek().is_none() {
        return Cow::Borrowed(text);
    }

    let mut stripped = String::with_capacity(text.len());
    let mut copied_up_to = 0;
    for region in regions {
        stripped.push_str(&text[copied_up_to..region.outer.start]);
        copied_up_to = region.outer.end;
    }
    stripped.push_str(&text[copied_up_to..]);
    Cow::Owned(stripped)
}

struct Region {
    outer: Range<usize>,
    inner: Range<usize>,
}

fn closed_regions(text: &str) -> impl Iterator<Item = Region> + '_ {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        let start = cursor + text[cursor..].find(SUGGESTIONS_START)?;
        let inner_start = start + SUGGESTIONS_START.len();
        let inner_end =
            inner_start + text[inner_start..].find(SUGGESTIONS_END)?;
        let end = inner_end + SUGGESTIONS_END.len();
        cursor = end;
        Some(Region {
            outer: start..end,
            inner: inner_start..inner_end,
        })
    })
}
