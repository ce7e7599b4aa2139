//! # Directives
//!
//! Control payloads one gateway instance sends to another. The wire form is
//! plain text so any publish channel can carry it unchanged.

use std::fmt;

use thiserror::Error;

/// Verb prefix of the user-eviction directive.
pub const DELETE_USER_PREFIX: &str = "DELETE USER ";

/// A control instruction addressed to a specific gateway instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Drop the local live connection of the given user identity.
    DeleteUser(i64),
}

impl Directive {
    /// Wire encoding of the directive.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Parse a directive from its wire encoding.
    pub fn parse(payload: &[u8]) -> Result<Self, DirectiveParseError> {
        let text = std::str::from_utf8(payload).map_err(|_| DirectiveParseError::NotUtf8)?;
        let text = text.trim();

        let Some(identity) = text.strip_prefix(DELETE_USER_PREFIX) else {
            return Err(DirectiveParseError::UnknownVerb(text.to_string()));
        };

        identity
            .trim()
            .parse::<i64>()
            .map(Directive::DeleteUser)
            .map_err(|_| DirectiveParseError::InvalidIdentity(identity.to_string()))
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteUser(user) => write!(f, "{DELETE_USER_PREFIX}{user}"),
        }
    }
}

/// Errors from decoding a directive payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectiveParseError {
    /// Payload is not UTF-8 text.
    #[error("directive payload is not valid UTF-8")]
    NotUtf8,

    /// Payload does not start with a known verb.
    #[error("unknown directive: {0:?}")]
    UnknownVerb(String),

    /// The identity argument is not a decimal integer.
    #[error("invalid user identity in directive: {0:?}")]
    InvalidIdentity(String),
}

/// A payload together with the topic it was published on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    /// Destination topic (a container identity).
    pub topic: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}
