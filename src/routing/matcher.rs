//! Path template matching.
//!
//! # Responsibilities
//! - Compile a path template (`/users/:id`) into a matcher
//! - Test a concrete path and extract named parameters
//!
//! # Template Syntax
//! - `:name` captures one segment made of `[A-Za-z0-9-_~ %]`
//! - `*` captures anything (lazily) under the key `_`
//! - `( ... )` marks an optional part; parameters inside it may be absent
//! - `\` escapes the next character
//! - Everything else matches literally
//!
//! # Design Decisions
//! - Anchored on both ends: the whole path must match
//! - Case-sensitive
//! - Parameter values are returned exactly as they appear in the path

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::routing::error::PatternError;

/// Parameters captured by a successful match.
pub type Params = HashMap<String, String>;

/// Key under which a `*` wildcard capture is stored.
pub const WILDCARD_KEY: &str = "_";

const SEGMENT_VALUE: &str = r"[a-zA-Z0-9\-_~ %]+";

/// Whether `value` can be captured by a `:name` segment.
pub fn is_segment_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '~' | ' ' | '%'))
}

/// Trait for testing a resource path against a compiled template.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns the captured parameters, or `None` if the path does not match.
    fn match_path(&self, path: &str) -> Option<Params>;
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Static(String),
    Named(String),
    Wildcard,
    Optional(Vec<Token>),
}

/// A compiled path template.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    /// Capture group names, in group order.
    names: Vec<String>,
}

impl Pattern {
    /// Compile a template.
    pub fn new(template: &str) -> Result<Self, PatternError> {
        let tokens = tokenize(template)?;

        let mut names = Vec::new();
        let mut body = String::from("^");
        compile(&tokens, &mut body, &mut names);
        body.push('$');

        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(PatternError::DuplicateName(name.clone()));
            }
        }

        let regex = Regex::new(&body).map_err(|e| PatternError::Regex(e.to_string()))?;
        Ok(Self {
            source: template.to_string(),
            regex,
            names,
        })
    }

    /// The template this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the parameters this pattern can capture.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }
}

impl Matcher for Pattern {
    fn match_path(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let params = self
            .names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                // Groups inside an optional part that did not participate are skipped.
                caps.get(i + 1).map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect();
        Some(params)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("names", &self.names)
            .finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(template: &str) -> Result<Vec<Token>, PatternError> {
    let chars: Vec<(usize, char)> = template.char_indices().collect();
    let mut pos = 0;
    let tokens = tokenize_group(&chars, &mut pos, None)?;
    Ok(tokens)
}

/// Parses tokens until the end of input, or until the `)` closing the group
/// opened at `open` (if any).
fn tokenize_group(
    chars: &[(usize, char)],
    pos: &mut usize,
    open: Option<usize>,
) -> Result<Vec<Token>, PatternError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();

    let flush = |literal: &mut String, tokens: &mut Vec<Token>| {
        if !literal.is_empty() {
            tokens.push(Token::Static(std::mem::take(literal)));
        }
    };

    while *pos < chars.len() {
        let (offset, c) = chars[*pos];
        match c {
            '\\' => {
                let (_, escaped) = *chars.get(*pos + 1).ok_or(PatternError::DanglingEscape)?;
                literal.push(escaped);
                *pos += 2;
            }
            ':' => {
                flush(&mut literal, &mut tokens);
                *pos += 1;
                let start = *pos;
                while *pos < chars.len() && is_name_char(chars[*pos].1) {
                    *pos += 1;
                }
                if *pos == start {
                    return Err(PatternError::EmptyName(offset));
                }
                let name: String = chars[start..*pos].iter().map(|(_, c)| *c).collect();
                tokens.push(Token::Named(name));
            }
            '*' => {
                flush(&mut literal, &mut tokens);
                tokens.push(Token::Wildcard);
                *pos += 1;
            }
            '(' => {
                flush(&mut literal, &mut tokens);
                *pos += 1;
                let inner = tokenize_group(chars, pos, Some(offset))?;
                tokens.push(Token::Optional(inner));
            }
            ')' => {
                if open.is_none() {
                    return Err(PatternError::UnbalancedParens(offset));
                }
                flush(&mut literal, &mut tokens);
                *pos += 1;
                return Ok(tokens);
            }
            _ => {
                literal.push(c);
                *pos += 1;
            }
        }
    }

    if let Some(open) = open {
        return Err(PatternError::UnbalancedParens(open));
    }
    flush(&mut literal, &mut tokens);
    Ok(tokens)
}

fn compile(tokens: &[Token], out: &mut String, names: &mut Vec<String>) {
    for token in tokens {
        match token {
            Token::Static(text) => out.push_str(&regex::escape(text)),
            Token::Named(name) => {
                out.push('(');
                out.push_str(SEGMENT_VALUE);
                out.push(')');
                names.push(name.clone());
            }
            Token::Wildcard => {
                out.push_str("(.*?)");
                names.push(WILDCARD_KEY.to_string());
            }
            Token::Optional(inner) => {
                out.push_str("(?:");
                compile(inner, out, names);
                out.push_str(")?");
            }
        }
    }
}
