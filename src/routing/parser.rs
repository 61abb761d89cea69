//! Route string parsing.
//!
//! A route string looks like `<resource>/<verb>[?<query>]`, for example
//! `/users/4/photos/1/put?crop=false`.
//!
//! # Design Decisions
//! - The path is used exactly as sent: no dot-segment collapsing, no
//!   percent-encoding, no host detection for a leading `//`
//! - A `#fragment` is dropped, then the string is split at the first `?`
//! - A missing leading slash is tolerated
//! - Query values are form-urlencoded decoded; for a repeated key the
//!   first occurrence wins
//! - The last path segment is the verb expression; the resource is
//!   everything before it and must not be empty

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use url::form_urlencoded;

use crate::routing::matcher::{Matcher, Pattern, WILDCARD_KEY};

const ROUTE_TEMPLATE: &str = "*/:verbExpression";
const VERB_KEY: &str = "verbExpression";

/// A route string split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoute {
    pub query: HashMap<String, String>,
    pub resource: String,
    pub verb_expression: String,
}

fn route_pattern() -> Option<&'static Pattern> {
    static PATTERN: OnceLock<Option<Pattern>> = OnceLock::new();
    PATTERN.get_or_init(|| Pattern::new(ROUTE_TEMPLATE).ok()).as_ref()
}

/// Decode a query string. Repeated keys keep their first value.
fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut query = HashMap::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        query.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    query
}

/// Parse a route string. Returns `None` if it has no resource and verb segment.
pub fn parse(route: &str) -> Option<ParsedRoute> {
    let route = route.split_once('#').map_or(route, |(before, _)| before);
    let (path, query) = route.split_once('?').unwrap_or((route, ""));

    let path: Cow<'_, str> = if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    };

    let mut captures = route_pattern()?.match_path(&path)?;
    let resource = captures.remove(WILDCARD_KEY)?;
    let verb_expression = captures.remove(VERB_KEY)?;
    if resource.is_empty() {
        return None;
    }

    Some(ParsedRoute {
        query: parse_query(query),
        resource,
        verb_expression,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_and_verb() {
        let route = parse("/users/4/get").unwrap();
        assert_eq!(route.resource, "/users/4");
        assert_eq!(route.verb_expression, "get");
        assert!(route.query.is_empty());
    }

    #[test]
    fn test_query_string() {
        let route = parse("/users/4/photos/1/put?crop=false&size=large%20x").unwrap();
        assert_eq!(route.resource, "/users/4/photos/1");
        assert_eq!(route.verb_expression, "put");
        assert_eq!(route.query.get("crop").map(String::as_str), Some("false"));
        assert_eq!(route.query.get("size").map(String::as_str), Some("large x"));
    }

    #[test]
    fn test_repeated_query_key_keeps_first() {
        let route = parse("/photos/post?tag=a&tag=b&flag").unwrap();
        assert_eq!(route.query.get("tag").map(String::as_str), Some("a"));
        assert_eq!(route.query.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn test_missing_verb_segment() {
        // A single segment is all verb, no resource
        assert_eq!(parse("/users"), None);
        assert_eq!(parse("/get"), None);
        assert_eq!(parse("/"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_trailing_slash_is_rejected() {
        assert_eq!(parse("/users/4/get/"), None);
    }

    #[test]
    fn test_missing_leading_slash_is_tolerated() {
        let route = parse("users/4/read").unwrap();
        assert_eq!(route.resource, "/users/4");
        assert_eq!(route.verb_expression, "read");
    }

    #[test]
    fn test_verb_segment_charset() {
        // Dots are not part of a verb expression
        assert_eq!(parse("/users/4/get.json"), None);
    }

    #[test]
    fn test_path_is_kept_as_sent() {
        let route = parse("/files/my file/get").unwrap();
        assert_eq!(route.resource, "/files/my file");

        // Dot segments are not collapsed
        let route = parse("/users/../admin/get").unwrap();
        assert_eq!(route.resource, "/users/../admin");

        // A leading `//` is not a host
        let route = parse("//users/4/get").unwrap();
        assert_eq!(route.resource, "//users/4");

        let route = parse("/a\\b/get").unwrap();
        assert_eq!(route.resource, "/a\\b");
    }

    #[test]
    fn test_fragment_is_dropped() {
        let route = parse("/users/4/get?x=1#top").unwrap();
        assert_eq!(route.verb_expression, "get");
        assert_eq!(route.query.get("x").map(String::as_str), Some("1"));

        let route = parse("/users/4/get#?x=1").unwrap();
        assert!(route.query.is_empty());
    }
}
