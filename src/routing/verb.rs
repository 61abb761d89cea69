//! Canonical verbs and verb-expression classification.
//!
//! # Responsibilities
//! - Define the closed set of canonical verbs
//! - Hold the synonym table (verb → accepted tokens)
//! - Classify a free-form trailing token into a verb
//!
//! # Design Decisions
//! - Classification walks verbs in reverse declaration order
//!   (DELETE, PUT, GET, POST); when synonym lists overlap the first
//!   verb in that order wins
//! - Tokens are stored lowercase; lookup is exact and case-sensitive

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::routing::error::InvalidRouteError;

/// One of the four canonical action verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    /// Create.
    Post,
    /// Read.
    Get,
    /// Update.
    Put,
    /// Delete.
    Delete,
}

impl Verb {
    /// All verbs in declaration order.
    pub const ALL: [Verb; 4] = [Verb::Post, Verb::Get, Verb::Put, Verb::Delete];

    /// Canonical label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Post => "POST",
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Verb::Post => 0,
            Verb::Get => 1,
            Verb::Put => 2,
            Verb::Delete => 3,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = InvalidRouteError;

    /// Parses a canonical label. Labels are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POST" => Ok(Verb::Post),
            "GET" => Ok(Verb::Get),
            "PUT" => Ok(Verb::Put),
            "DELETE" => Ok(Verb::Delete),
            other => Err(InvalidRouteError::UnknownVerb(other.to_string())),
        }
    }
}

/// Synonym table mapping each verb to the tokens that mean it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbTable {
    post: Vec<String>,
    get: Vec<String>,
    put: Vec<String>,
    delete: Vec<String>,
}

impl VerbTable {
    /// A table with no tokens at all. Nothing classifies until synonyms are added.
    pub fn empty() -> Self {
        Self {
            post: Vec::new(),
            get: Vec::new(),
            put: Vec::new(),
            delete: Vec::new(),
        }
    }

    /// Tokens accepted for `verb`.
    pub fn synonyms(&self, verb: Verb) -> &[String] {
        match verb {
            Verb::Post => &self.post,
            Verb::Get => &self.get,
            Verb::Put => &self.put,
            Verb::Delete => &self.delete,
        }
    }

    fn synonyms_mut(&mut self, verb: Verb) -> &mut Vec<String> {
        match verb {
            Verb::Post => &mut self.post,
            Verb::Get => &mut self.get,
            Verb::Put => &mut self.put,
            Verb::Delete => &mut self.delete,
        }
    }

    /// Replace the tokens for `verb`.
    pub fn with_synonyms<I, S>(mut self, verb: Verb, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = self.synonyms_mut(verb);
        list.clear();
        for token in tokens {
            push_token(list, token.as_ref());
        }
        self
    }

    /// Add one token for `verb`. Adding a token twice is a no-op.
    pub fn add_synonym(&mut self, verb: Verb, token: &str) {
        push_token(self.synonyms_mut(verb), token);
    }

    /// Classify a verb expression.
    pub fn classify(&self, token: &str) -> Option<Verb> {
        Verb::ALL
            .iter()
            .rev()
            .copied()
            .find(|verb| self.synonyms(*verb).iter().any(|t| t == token))
    }
}

fn push_token(list: &mut Vec<String>, token: &str) {
    let token = token.to_lowercase();
    if !list.contains(&token) {
        list.push(token);
    }
}

impl Default for VerbTable {
    fn default() -> Self {
        Self::empty()
            .with_synonyms(Verb::Post, ["create", "post"])
            .with_synonyms(Verb::Get, ["read", "get"])
            .with_synonyms(Verb::Put, ["update", "put"])
            .with_synonyms(Verb::Delete, ["delete"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_synonyms() {
        let table = VerbTable::default();
        assert_eq!(table.classify("create"), Some(Verb::Post));
        assert_eq!(table.classify("post"), Some(Verb::Post));
        assert_eq!(table.classify("read"), Some(Verb::Get));
        assert_eq!(table.classify("get"), Some(Verb::Get));
        assert_eq!(table.classify("update"), Some(Verb::Put));
        assert_eq!(table.classify("put"), Some(Verb::Put));
        assert_eq!(table.classify("delete"), Some(Verb::Delete));
    }

    #[test]
    fn test_unknown_and_case_sensitive() {
        let table = VerbTable::default();
        assert_eq!(table.classify("remove"), None);
        assert_eq!(table.classify(""), None);
        assert_eq!(table.classify("GET"), None);
    }

    #[test]
    fn test_overlap_resolves_in_reverse_declaration_order() {
        let table = VerbTable::default()
            .with_synonyms(Verb::Post, ["create", "save"])
            .with_synonyms(Verb::Put, ["update", "save"]);
        assert_eq!(table.classify("save"), Some(Verb::Put));

        let table = VerbTable::default().with_synonyms(Verb::Get, ["read", "get", "delete"]);
        assert_eq!(table.classify("delete"), Some(Verb::Delete));
    }

    #[test]
    fn test_tokens_are_lowercased_and_deduplicated() {
        let mut table = VerbTable::empty();
        table.add_synonym(Verb::Get, "Fetch");
        table.add_synonym(Verb::Get, "fetch");
        assert_eq!(table.synonyms(Verb::Get), ["fetch"]);
        assert_eq!(table.classify("fetch"), Some(Verb::Get));
        assert_eq!(table.classify("Fetch"), None);
    }

    #[test]
    fn test_verb_labels() {
        for verb in Verb::ALL {
            assert_eq!(verb.as_str().parse::<Verb>().unwrap(), verb);
        }
        assert_eq!(
            "get".parse::<Verb>().unwrap_err(),
            InvalidRouteError::UnknownVerb("get".into())
        );
        assert_eq!(Verb::Delete.to_string(), "DELETE");
    }
}
