//! Bone-name canonicalization.
//!
//! A name is reduced to lower-case content tokens plus an optional side
//! marker. The original string is kept untouched: it is the identity key,
//! and the marker's byte span lets the mirror resolver flip the side in
//! place without disturbing prefixes or spacing.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::config::{shared_default, NameRules};

/// Left/right side carried by a bone name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn flip(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "l" | "left" => Some(Side::Left),
            "r" | "right" => Some(Side::Right),
            _ => None,
        }
    }
}

/// Canonical comparison form of a bone name.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedName {
    /// The name exactly as given.
    pub original: String,
    /// Lower-cased name with trailing whitespace removed.
    pub lowered: String,
    /// Lower-cased content tokens, side marker excluded.
    pub tokens: Vec<String>,
    /// Content tokens joined without separators.
    pub compact: String,
    pub side: Option<Side>,
    /// Byte span of the side marker inside `original`.
    pub marker: Option<Range<usize>>,
}

impl NormalizedName {
    /// True when nothing but prefixes, separators or a side marker remained.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The original name with its side marker flipped, keeping the marker's
    /// letter case (`L`/`R`, `left`/`right`, `Left`/`Right`, `LEFT`/`RIGHT`).
    pub fn mirrored(&self) -> Option<String> {
        let span = self.marker.clone()?;
        let marker = &self.original[span.clone()];
        let flipped = flip_marker(marker)?;

        let mut out = String::with_capacity(self.original.len() + 1);
        out.push_str(&self.original[..span.start]);
        out.push_str(&flipped);
        out.push_str(&self.original[span.end..]);
        Some(out)
    }
}

fn flip_marker(marker: &str) -> Option<String> {
    let flipped = match marker {
        "L" => "R",
        "R" => "L",
        "l" => "r",
        "r" => "l",
        "LEFT" => "RIGHT",
        "RIGHT" => "LEFT",
        "Left" => "Right",
        "Right" => "Left",
        "left" => "right",
        "right" => "left",
        _ => return None,
    };
    Some(flipped.to_string())
}

/// A token and its byte span in the original name.
#[derive(Debug, Clone)]
struct Token {
    text: String,
    span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Upper,
    Lower,
    Digit,
    Separator,
}

fn classify(c: char) -> CharClass {
    if c.is_numeric() {
        CharClass::Digit
    } else if c.is_uppercase() {
        CharClass::Upper
    } else if c.is_alphabetic() {
        CharClass::Lower
    } else {
        CharClass::Separator
    }
}

/// Name normalizer bound to a set of prefix/suffix rules.
pub struct Normalizer<'a> {
    rules: &'a NameRules,
    prefixes: Vec<&'a str>,
    suffixes: Vec<&'a str>,
}

impl<'a> Normalizer<'a> {
    pub fn new(rules: &'a NameRules) -> Self {
        let mut prefixes: Vec<&str> = rules.prefixes.iter().map(String::as_str).collect();
        let mut suffixes: Vec<&str> = rules.suffixes.iter().map(String::as_str).collect();
        // Longest first so "J_Bip_C_" wins over "J_Bip_".
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        suffixes.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        Self {
            rules,
            prefixes,
            suffixes,
        }
    }

    pub fn normalize(&self, name: &str) -> NormalizedName {
        let trimmed_end = name.trim_end().len();
        let (start, end) = self.content_bounds(name, trimmed_end);
        let tokens = tokenize(name, start, end);

        let (side, marker_index) = detect_side(name, start, &tokens);

        let content: Vec<String> = tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != marker_index)
            .map(|(_, t)| t.text.clone())
            .collect();

        NormalizedName {
            original: name.to_string(),
            lowered: name[..trimmed_end].to_lowercase(),
            compact: content.concat(),
            tokens: content,
            side,
            marker: marker_index.map(|i| tokens[i].span.clone()),
        }
    }

    /// Byte range of `name` left after namespace, prefix and suffix removal.
    fn content_bounds(&self, name: &str, end: usize) -> (usize, usize) {
        let mut start = 0;
        let mut end = end;

        if self.rules.strip_namespace {
            if let Some(pos) = name[..end].rfind(':') {
                start = pos + 1;
            }
        }

        for prefix in &self.prefixes {
            if starts_with_ignore_case(&name[start..end], prefix) {
                start += prefix.len();
                break;
            }
        }

        for suffix in &self.suffixes {
            if ends_with_ignore_case(&name[start..end], suffix) {
                end -= suffix.len();
                break;
            }
        }

        (start, end)
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    !prefix.is_empty()
        && s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn ends_with_ignore_case(s: &str, suffix: &str) -> bool {
    !suffix.is_empty()
        && s.len() >= suffix.len()
        && s.is_char_boundary(s.len() - suffix.len())
        && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Split `name[start..end]` at separators, case transitions and digit
/// boundaries.
fn tokenize(name: &str, start: usize, end: usize) -> Vec<Token> {
    let chars: Vec<(usize, char)> = name[start..end]
        .char_indices()
        .map(|(i, c)| (start + i, c))
        .collect();

    let mut tokens = Vec::new();
    let mut token_start: Option<usize> = None;

    for (k, &(pos, c)) in chars.iter().enumerate() {
        let class = classify(c);
        if class == CharClass::Separator {
            if let Some(s) = token_start.take() {
                tokens.push(make_token(name, s, pos));
            }
            continue;
        }

        if let Some(s) = token_start {
            let prev = classify(chars[k - 1].1);
            let next = chars.get(k + 1).map(|&(_, n)| classify(n));
            let boundary = match (prev, class) {
                (CharClass::Lower, CharClass::Upper) => true,
                (CharClass::Digit, CharClass::Upper | CharClass::Lower) => true,
                (CharClass::Upper | CharClass::Lower, CharClass::Digit) => true,
                // "LArm" splits before the 'A': an upper run ends where a
                // capitalized word begins.
                (CharClass::Upper, CharClass::Upper) => next == Some(CharClass::Lower),
                _ => false,
            };
            if boundary {
                tokens.push(make_token(name, s, pos));
                token_start = Some(pos);
            }
        } else {
            token_start = Some(pos);
        }
    }

    if let Some(s) = token_start {
        tokens.push(make_token(name, s, end));
    }
    tokens
}

fn make_token(name: &str, start: usize, end: usize) -> Token {
    Token {
        text: name[start..end].to_lowercase(),
        span: start..end,
    }
}

/// Find the side marker. A leading whitespace character followed by a lone
/// `L`/`R` is checked first (the target vocabulary's encoding), then any
/// whole `l`/`r`/`left`/`right` token.
fn detect_side(name: &str, start: usize, tokens: &[Token]) -> (Option<Side>, Option<usize>) {
    let leading = &name[start..];
    if leading.starts_with(char::is_whitespace) {
        if let Some(first) = tokens.first() {
            if first.text.len() == 1 {
                if let Some(side) = Side::from_token(&first.text) {
                    return (Some(side), Some(0));
                }
            }
        }
    }

    for (i, token) in tokens.iter().enumerate() {
        if let Some(side) = Side::from_token(&token.text) {
            return (Some(side), Some(i));
        }
    }
    (None, None)
}

/// Normalize with the embedded default name rules.
pub fn normalize(name: &str) -> NormalizedName {
    Normalizer::new(&shared_default().names).normalize(name)
}
