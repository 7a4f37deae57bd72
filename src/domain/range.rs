//! Category-range selector parsing
//!
//! A range cell mixes free text with account selectors, e.g.
//! `Cash 10000 to 19999 (15000)`. Parsing drops the words, keeps the
//! selectors and sorts them into include and exclude lists. Bracketed
//! blocks (`[]`, `()`, `<>`) hold exclusions.

use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;

/// Include/exclude selectors parsed from one range cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSelection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl RangeSelection {
    pub fn include_joined(&self) -> String {
        self.include.join("_")
    }

    pub fn exclude_joined(&self) -> String {
        self.exclude.join("_")
    }
}

/// Turns selector notation into include/exclude sets.
pub trait RangeParser: Send + Sync {
    fn parse(&self, input: &str) -> RangeSelection;
}

/// Build the range query for a record from its primary and secondary range cells.
///
/// The secondary block is only emitted when it has inclusions; an empty primary
/// inclusion yields an empty query.
pub fn range_expression(parser: &dyn RangeParser, primary: &str, secondary: &str) -> String {
    let pa = parser.parse(primary);
    let sa = parser.parse(secondary);
    let pa_inc = pa.include_joined();
    let pa_exc = pa.exclude_joined();
    let sa_inc = sa.include_joined();
    let sa_exc = sa.exclude_joined();

    let mut query = String::new();
    if !sa_inc.is_empty() {
        query.push_str(&format!("pa={}", pa_inc));
        push_exclude(&mut query, &pa_exc);
        query.push_str(&format!("&sa={}", sa_inc));
        push_exclude(&mut query, &sa_exc);
    } else if !pa_inc.is_empty() {
        query.push_str(&format!("pa={}", pa_inc));
        push_exclude(&mut query, &pa_exc);
    }
    query
}

fn push_exclude(query: &mut String, exclude: &str) {
    if !exclude.is_empty() {
        query.push_str(&format!("&exclude={}", exclude));
    }
}

/// Default parser for the chart-of-accounts selector notation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectorRangeParser;

impl RangeParser for SelectorRangeParser {
    fn parse(&self, input: &str) -> RangeSelection {
        let cleaned = strip_words(input);
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for (i, block) in block_delimiters().split(&cleaned).enumerate() {
            let target = if i % 2 == 1 { &mut exclude } else { &mut include };
            target.extend(block.split(',').map(str::to_string));
        }
        RangeSelection {
            include: normalize(include),
            exclude: normalize(exclude),
        }
    }
}

fn normalize(tokens: Vec<String>) -> Vec<String> {
    tokens
        .into_iter()
        .filter(|t| valid_selector(t))
        .map(|t| t.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .collect_vec()
}

fn block_delimiters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\[\]()<>]").expect("static regex"))
}

fn short_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\s|^)\d{1,4}(\s|$)").expect("static regex"))
}

fn range_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\sto\s").expect("static regex"))
}

fn valid_token(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && !token.contains(' ')
}

/// A selector is a single token or `<token> to <token>`.
/// Bare numbers of up to four digits are not account selectors.
fn valid_selector(token: &str) -> bool {
    let token = token.trim();
    if short_number().is_match(token) {
        return false;
    }
    if range_keyword().is_match(token) {
        let bounds: Vec<&str> = range_keyword().split(token).collect();
        bounds.len() == 2 && valid_token(bounds[0]) && valid_token(bounds[1])
    } else {
        valid_token(token)
    }
}

/// Characters that glue a selector together.
fn is_selector_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '~' | '*' | '&' | ':')
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '.' | '-' | ':')
}

/// Remove free-text words: runs of letters, `.`, `-` and `:` that are not
/// glued to selector characters on either side. The range keyword `to` is kept
/// when it stands on its own.
fn strip_words(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < n {
        match word_match_end(&chars, i) {
            Some(end) => i = end,
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

/// Longest removable word starting at `start`, as its exclusive end.
fn word_match_end(chars: &[char], start: usize) -> Option<usize> {
    if start > 0 && is_selector_char(chars[start - 1]) {
        return None;
    }
    let run_end = chars[start..]
        .iter()
        .position(|&c| !is_word_char(c))
        .map(|p| start + p)
        .unwrap_or(chars.len());
    (start + 1..=run_end).rev().find(|&end| {
        let followed_by_selector = end < chars.len() && is_selector_char(chars[end]);
        !followed_by_selector && !ends_with_standalone_to(chars, end)
    })
}

fn ends_with_standalone_to(chars: &[char], end: usize) -> bool {
    end >= 3
        && chars[end - 2].eq_ignore_ascii_case(&'t')
        && chars[end - 1].eq_ignore_ascii_case(&'o')
        && !is_selector_char(chars[end - 3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_leading_word_when_stripping_then_removes_it() {
        assert_eq!(strip_words("Cash 10000"), " 10000");
    }

    #[test]
    fn given_standalone_to_when_stripping_then_keeps_it() {
        assert_eq!(strip_words("10000 to 19999"), "10000 to 19999");
        assert_eq!(strip_words("10000 TO 19999"), "10000 TO 19999");
    }

    #[test]
    fn given_word_glued_to_digits_when_stripping_then_keeps_it() {
        assert_eq!(strip_words("A100"), "A100");
        assert_eq!(strip_words("100A"), "100A");
    }

    #[test]
    fn given_short_number_when_validating_then_rejects() {
        assert!(!valid_selector("4000"));
        assert!(!valid_selector(" 12 "));
        assert!(valid_selector("40000"));
    }

    #[test]
    fn given_malformed_range_when_validating_then_rejects() {
        assert!(!valid_selector("10000 to 20000 to 30000"));
        assert!(!valid_selector("10000 11000 to 20000"));
        assert!(valid_selector("10000 to 20000"));
    }
}
