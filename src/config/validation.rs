//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, endpoint path and limits
//! - Check the verb synonym table: non-empty, lowercase, disjoint
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::routing::Verb;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("listener.path: `{0}` must start with '/'")]
    InvalidPath(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("verbs.{0}: at least one token is required")]
    NoTokens(Verb),

    #[error("verbs.{verb}: invalid token `{token}`")]
    InvalidToken { verb: Verb, token: String },

    #[error("token `{token}` is listed for both {first} and {second}")]
    SharedToken { token: String, first: Verb, second: Verb },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if !config.listener.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(config.listener.path.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }
    if config.listener.max_message_bytes == 0 {
        errors.push(ValidationError::Zero("listener.max_message_bytes"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    validate_verbs(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_verbs(config: &RouterConfig, errors: &mut Vec<ValidationError>) {
    let mut seen: Vec<(&str, Verb)> = Vec::new();

    for verb in Verb::ALL {
        let tokens = config.verbs.tokens(verb);
        if tokens.is_empty() {
            errors.push(ValidationError::NoTokens(verb));
        }

        for token in tokens {
            if !is_valid_token(token) {
                errors.push(ValidationError::InvalidToken {
                    verb,
                    token: token.clone(),
                });
                continue;
            }
            match seen.iter().find(|(t, _)| *t == token.as_str()) {
                Some((_, first)) if *first != verb => {
                    errors.push(ValidationError::SharedToken {
                        token: token.clone(),
                        first: *first,
                        second: verb,
                    });
                }
                Some(_) => {}
                None => seen.push((token.as_str(), verb)),
            }
        }
    }
}

fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|c| {
            (c.is_ascii_alphanumeric() && !c.is_ascii_uppercase()) || matches!(c, '-' | '_' | '~')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&RouterConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "localhost".into();
        config.listener.path = "ws".into();
        config.listener.max_connections = 0;
        config.listener.max_message_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidAddress {
                    field: "listener.bind_address",
                    value: "localhost".into(),
                },
                ValidationError::InvalidPath("ws".into()),
                ValidationError::Zero("listener.max_connections"),
                ValidationError::Zero("listener.max_message_bytes"),
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = RouterConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(validate_config(&config).unwrap_err().len(), 1);
    }

    #[test]
    fn test_shared_token_is_rejected() {
        let mut config = RouterConfig::default();
        config.verbs.put.push("create".into());

        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::SharedToken {
                token: "create".into(),
                first: Verb::Post,
                second: Verb::Put,
            }]
        );
    }

    #[test]
    fn test_bad_tokens() {
        let mut config = RouterConfig::default();
        config.verbs.delete.clear();
        config.verbs.get = vec!["Read".into(), "get/all".into(), "".into(), "get".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::NoTokens(Verb::Delete)));
        assert!(errors.contains(&ValidationError::InvalidToken {
            verb: Verb::Get,
            token: "Read".into(),
        }));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::NoTokens(Verb::Put).to_string(),
            "verbs.PUT: at least one token is required"
        );
    }
}
