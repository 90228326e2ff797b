//! Button payloads.
//!
//! Wire format: `<action>:<event-ref>` or `toggle:<event-ref>:<True|False>`.
//! The event reference is the uid in URL-safe base64, or `#` followed by the
//! hex SHA-256 of the uid when the base64 form would push the payload past
//! Discord's custom id limit. A bare `noop` is also accepted.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const TOGGLE: &str = "toggle";
const COMPLETE: &str = "complete";
const NOOP: &str = "noop";

/// Discord rejects custom ids longer than this
pub const MAX_PAYLOAD_LEN: usize = 100;

/// Room left for the event reference in the longest payload, `toggle:<ref>:False`
const MAX_REF_LEN: usize = MAX_PAYLOAD_LEN - "toggle:".len() - ":False".len();

/// Never part of the URL-safe base64 alphabet
const DIGEST_MARKER: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("payload is missing the event identifier")]
    MissingUid,
    #[error("event identifier is not valid base64: {0}")]
    InvalidEncoding(String),
    #[error("event digest is not 64 hex characters: '{0}'")]
    InvalidDigest(String),
    #[error("expanded flag must be 'True' or 'False', got '{0}'")]
    InvalidFlag(String),
    #[error("toggle payload is missing the expanded flag")]
    MissingFlag,
    #[error("unexpected trailing data in payload")]
    TrailingData,
}

/// Which event a button refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRef {
    Uid(String),
    /// Hex SHA-256 of a uid too long to carry in full
    Digest(String),
}

impl EventRef {
    pub fn uid(uid: impl Into<String>) -> Self {
        EventRef::Uid(uid.into())
    }

    /// Whether this reference points at the event with `uid`
    pub fn matches(&self, uid: &str) -> bool {
        match self {
            EventRef::Uid(own) => own == uid,
            EventRef::Digest(digest) => *digest == uid_digest(uid),
        }
    }

    fn to_segment(&self) -> String {
        match self {
            EventRef::Uid(uid) => {
                let encoded = encode_uid(uid);
                if encoded.len() <= MAX_REF_LEN {
                    encoded
                } else {
                    format!("{}{}", DIGEST_MARKER, uid_digest(uid))
                }
            }
            EventRef::Digest(digest) => format!("{}{}", DIGEST_MARKER, digest),
        }
    }

    fn from_segment(segment: &str) -> Result<Self, DecodeError> {
        match segment.strip_prefix(DIGEST_MARKER) {
            Some(digest) => {
                if digest.len() != 64
                    || !digest
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
                {
                    return Err(DecodeError::InvalidDigest(digest.to_string()));
                }
                Ok(EventRef::Digest(digest.to_string()))
            }
            None => decode_uid(segment).map(EventRef::Uid),
        }
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventRef::Uid(uid) => f.write_str(uid),
            EventRef::Digest(digest) => write!(f, "{}{}", DIGEST_MARKER, digest),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Toggle,
    Complete,
    Noop,
}

/// Decoded button press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackToken {
    /// `expanded` is the state the message had when the button was rendered
    Toggle { event: EventRef, expanded: bool },
    Complete { event: EventRef },
    Noop { event: Option<EventRef> },
}

impl CallbackToken {
    pub fn toggle(uid: &str, expanded: bool) -> Self {
        CallbackToken::Toggle {
            event: EventRef::uid(uid),
            expanded,
        }
    }

    pub fn complete(uid: &str) -> Self {
        CallbackToken::Complete {
            event: EventRef::uid(uid),
        }
    }

    pub fn noop(uid: &str) -> Self {
        CallbackToken::Noop {
            event: Some(EventRef::uid(uid)),
        }
    }

    pub fn action(&self) -> CallbackAction {
        match self {
            CallbackToken::Toggle { .. } => CallbackAction::Toggle,
            CallbackToken::Complete { .. } => CallbackAction::Complete,
            CallbackToken::Noop { .. } => CallbackAction::Noop,
        }
    }

    pub fn event(&self) -> Option<&EventRef> {
        match self {
            CallbackToken::Toggle { event, .. } | CallbackToken::Complete { event } => Some(event),
            CallbackToken::Noop { event } => event.as_ref(),
        }
    }

    /// Encode into the button payload, never longer than [`MAX_PAYLOAD_LEN`]
    pub fn to_payload(&self) -> String {
        match self {
            CallbackToken::Toggle { event, expanded } => format!(
                "{}:{}:{}",
                TOGGLE,
                event.to_segment(),
                if *expanded { "True" } else { "False" }
            ),
            CallbackToken::Complete { event } => format!("{}:{}", COMPLETE, event.to_segment()),
            CallbackToken::Noop { event: Some(event) } => {
                format!("{}:{}", NOOP, event.to_segment())
            }
            CallbackToken::Noop { event: None } => NOOP.to_string(),
        }
    }
}

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_payload())
    }
}

impl FromStr for CallbackToken {
    type Err = DecodeError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        build_token(payload)
    }
}

/// Encode an event uid for use inside a payload
pub fn encode_uid(uid: &str) -> String {
    URL_SAFE.encode(uid.as_bytes())
}

/// Reverse [`encode_uid`]
pub fn decode_uid(encoded: &str) -> Result<String, DecodeError> {
    if encoded.is_empty() {
        return Err(DecodeError::MissingUid);
    }
    let bytes = URL_SAFE
        .decode(encoded)
        .map_err(|e| DecodeError::InvalidEncoding(e.to_string()))?;
    let uid = String::from_utf8(bytes).map_err(|e| DecodeError::InvalidEncoding(e.to_string()))?;
    if uid.is_empty() {
        return Err(DecodeError::MissingUid);
    }
    Ok(uid)
}

/// Lowercase hex SHA-256 of a uid
pub fn uid_digest(uid: &str) -> String {
    format!("{:x}", Sha256::digest(uid.as_bytes()))
}

/// Parse a raw payload into a token
pub fn build_token(payload: &str) -> Result<CallbackToken, DecodeError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut parts = payload.split(':');
    let action = parts.next().unwrap_or_default();
    let segment = parts.next();
    let flag = parts.next();
    if parts.next().is_some() {
        return Err(DecodeError::TrailingData);
    }

    match action {
        TOGGLE => {
            let event = EventRef::from_segment(segment.ok_or(DecodeError::MissingUid)?)?;
            let expanded = match flag.ok_or(DecodeError::MissingFlag)? {
                "True" => true,
                "False" => false,
                other => return Err(DecodeError::InvalidFlag(other.to_string())),
            };
            Ok(CallbackToken::Toggle { event, expanded })
        }
        COMPLETE => {
            if flag.is_some() {
                return Err(DecodeError::TrailingData);
            }
            let event = EventRef::from_segment(segment.ok_or(DecodeError::MissingUid)?)?;
            Ok(CallbackToken::Complete { event })
        }
        NOOP => {
            if flag.is_some() {
                return Err(DecodeError::TrailingData);
            }
            let event = segment.map(EventRef::from_segment).transpose()?;
            Ok(CallbackToken::Noop { event })
        }
        other => Err(DecodeError::UnknownAction(other.to_string())),
    }
}
