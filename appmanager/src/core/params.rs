//! Launch parameter string handling.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// What quote stripping found on a parameter string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteIssue {
    /// One matching pair of this quote character was removed.
    Stripped(char),
    /// A quote at only one end; the value was left untouched.
    Unbalanced(char),
}

impl fmt::Display for QuoteIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteIssue::Stripped(q) => write!(f, "removed enclosing {q}...{q} quotes"),
            QuoteIssue::Unbalanced(q) => write!(f, "unbalanced {q} quote left in place"),
        }
    }
}

/// Result of [`strip_enclosing_quotes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unquoted<'a> {
    pub value: &'a str,
    pub issue: Option<QuoteIssue>,
}

const QUOTES: [char; 2] = ['"', '\''];

/// Strip exactly one matching pair of leading/trailing quotes.
///
/// Nothing else is removed. A quote present at only one end is reported but
/// not touched.
pub fn strip_enclosing_quotes(raw: &str) -> Unquoted<'_> {
    let value = raw.trim();
    let first = value.chars().next().filter(|c| QUOTES.contains(c));
    let last = value.chars().last().filter(|c| QUOTES.contains(c));

    match (first, last) {
        (Some(open), Some(close)) if open == close && value.len() >= 2 => Unquoted {
            value: &value[1..value.len() - 1],
            issue: Some(QuoteIssue::Stripped(open)),
        },
        (Some(q), _) | (None, Some(q)) => Unquoted {
            value,
            issue: Some(QuoteIssue::Unbalanced(q)),
        },
        (None, None) => Unquoted { value, issue: None },
    }
}

/// One entry of a launch argument string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// Text before the first `--flag`.
    Positional(String),
    Flag { name: String, value: Option<String> },
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Positional(text) => f.write_str(text),
            Parameter::Flag { name, value: None } => write!(f, "--{name}"),
            Parameter::Flag {
                name,
                value: Some(value),
            } => write!(f, "--{name} {value}"),
        }
    }
}

static FLAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)--").expect("flag separator regex"));

/// Split `--name value --other` style arguments into flag/value pairs.
pub fn split_parameters(raw: &str) -> Vec<Parameter> {
    let trimmed = raw.trim();
    let leading_flag = trimmed.starts_with("--");

    let mut params = Vec::new();
    for (index, piece) in FLAG_RE.split(trimmed).enumerate() {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if index == 0 && !leading_flag {
            params.push(Parameter::Positional(piece.to_string()));
            continue;
        }
        let param = match piece.split_once(char::is_whitespace) {
            Some((name, value)) => Parameter::Flag {
                name: name.to_string(),
                value: Some(value.trim().to_string()),
            },
            None => Parameter::Flag {
                name: piece.to_string(),
                value: None,
            },
        };
        params.push(param);
    }
    params
}
