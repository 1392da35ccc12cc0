//! Structural screening of regex sources against catastrophic backtracking.
//!
//! A pattern is rejected when it exceeds the length cap or contains a
//! quantified group whose body itself holds an unescaped quantifier, such as
//! `(a+)+`, `(a*)*` or `(a+){2,}`. Escaped characters and character classes
//! are treated as opaque, so hostname patterns like `s3\..*\.amazonaws\.com`
//! and alternations like `^(GET|POST)$` pass.

use regex::Regex;
use thiserror::Error;

pub const MAX_PATTERN_LEN: usize = 512;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern exceeds {MAX_PATTERN_LEN} characters")]
    TooLong,
    #[error("pattern contains a nested quantifier")]
    NestedQuantifier,
    #[error("pattern does not compile: {0}")]
    Invalid(String),
}

/// Admits a pattern into the configuration: length cap, nested-quantifier
/// walk, then a compile check.
pub fn validate_pattern(pattern: &str) -> Result<(), PatternError> {
    if pattern.chars().count() > MAX_PATTERN_LEN {
        return Err(PatternError::TooLong);
    }
    check_nested_quantifiers(pattern)?;
    Regex::new(pattern).map_err(|e| PatternError::Invalid(e.to_string()))?;
    Ok(())
}

fn check_nested_quantifiers(pattern: &str) -> Result<(), PatternError> {
    let chars: Vec<char> = pattern.chars().collect();
    let len = chars.len();
    // One entry per open group: whether its body holds a quantifier so far.
    let mut groups: Vec<bool> = Vec::new();
    let mut i = 0;
    while i < len {
        match chars[i] {
            '\\' => {
                i += 2;
                continue;
            }
            '[' => {
                i += 1;
                if i < len && chars[i] == '^' {
                    i += 1;
                }
                if i < len && chars[i] == ']' {
                    i += 1;
                }
                while i < len && chars[i] != ']' {
                    if chars[i] == '\\' {
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
            }
            '(' => groups.push(false),
            ')' => {
                let quantified_body = groups.pop().unwrap_or(false);
                if quantified_body {
                    if matches!(chars.get(i + 1), Some('+') | Some('*') | Some('{')) {
                        return Err(PatternError::NestedQuantifier);
                    }
                    // The quantifier is still inside any enclosing group.
                    if let Some(enclosing) = groups.last_mut() {
                        *enclosing = true;
                    }
                }
            }
            '+' | '*' => {
                if let Some(current) = groups.last_mut() {
                    *current = true;
                }
            }
            '{' => {
                if is_unbounded_repetition(&chars[i..])
                    && let Some(current) = groups.last_mut()
                {
                    *current = true;
                }
            }
            _ => {}
        }
        i += 1;
    }
    Ok(())
}

// `{n,}` with no upper bound.
fn is_unbounded_repetition(tail: &[char]) -> bool {
    let mut j = 1;
    let mut digits = false;
    while j < tail.len() && tail[j].is_ascii_digit() {
        digits = true;
        j += 1;
    }
    digits && tail.get(j) == Some(&',') && tail.get(j + 1) == Some(&'}')
}
