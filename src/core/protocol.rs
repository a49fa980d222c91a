//! Lease wire protocol.
//!
//! One TCP connection carries exactly one request and one acknowledgment.
//! Requests are newline-free ASCII with comma-separated fields:
//!
//! - acquire: `"<count>,A"` or `"<count>,A,<tag>"`
//! - relinquish: `"<count>,R"`
//!
//! The acknowledgment is opaque. Any bytes, including none before the peer
//! closes, mean the scheduler has already applied the request.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::AdmissionError;

/// Separator between request fields.
pub const FIELD_DELIMITER: char = ',';

/// Upper bound on the acknowledgment bytes a client reads.
pub const MAX_ACK_BYTES: usize = 100;

/// Upper bound on a request the scheduler reads.
pub const MAX_REQUEST_BYTES: usize = 512;

/// Acknowledgment sent by the bundled scheduler.
pub const ACK: &[u8] = b"OK";

/// Direction of a lease request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseAction {
    /// Take cores from the pool.
    Acquire,
    /// Return cores to the pool.
    Relinquish,
}

impl LeaseAction {
    /// Single-letter wire code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Acquire => "A",
            Self::Relinquish => "R",
        }
    }
}

/// A single request on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRequest {
    /// Number of cores. Zero is a legal no-op.
    pub count: u32,
    /// Acquire or relinquish.
    pub action: LeaseAction,
    /// Operation name, only ever present on acquire.
    pub tag: Option<String>,
}

impl LeaseRequest {
    /// Build an acquire request. The tag is sanitized and dropped if nothing
    /// printable survives.
    #[must_use]
    pub fn acquire(count: u32, tag: Option<&str>) -> Self {
        Self {
            count,
            action: LeaseAction::Acquire,
            tag: tag.and_then(sanitize_tag),
        }
    }

    /// Build a relinquish request.
    #[must_use]
    pub const fn relinquish(count: u32) -> Self {
        Self {
            count,
            action: LeaseAction::Relinquish,
            tag: None,
        }
    }

    /// Encode to the wire text.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse wire text. Trailing whitespace (including a newline) is tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::MalformedRequest`] for a bad count, an unknown
    /// action code, or a tag on a relinquish.
    pub fn parse(input: &str) -> Result<Self, AdmissionError> {
        let input = input.trim_end();
        let mut fields = input.splitn(3, FIELD_DELIMITER);

        let count = fields
            .next()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AdmissionError::MalformedRequest(format!("missing count in `{input}`")))?;
        let count: u32 = count
            .trim()
            .parse()
            .map_err(|e| AdmissionError::MalformedRequest(format!("bad count `{count}`: {e}")))?;

        let action = match fields.next().map(str::trim) {
            Some("A") => LeaseAction::Acquire,
            Some("R") => LeaseAction::Relinquish,
            Some(other) => {
                return Err(AdmissionError::MalformedRequest(format!(
                    "unknown action `{other}`"
                )))
            }
            None => {
                return Err(AdmissionError::MalformedRequest(format!(
                    "missing action in `{input}`"
                )))
            }
        };

        let tag = fields.next().and_then(sanitize_tag);
        if action == LeaseAction::Relinquish && tag.is_some() {
            return Err(AdmissionError::MalformedRequest(
                "relinquish does not carry a tag".into(),
            ));
        }

        Ok(Self { count, action, tag })
    }
}

impl fmt::Display for LeaseRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{FIELD_DELIMITER}{}", self.count, self.action.code())?;
        if let Some(tag) = &self.tag {
            write!(f, "{FIELD_DELIMITER}{tag}")?;
        }
        Ok(())
    }
}

/// Strip the field delimiter and control characters from a tag.
///
/// Returns `None` when nothing is left.
#[must_use]
pub fn sanitize_tag(tag: &str) -> Option<String> {
    let cleaned: String = tag
        .chars()
        .filter(|c| *c != FIELD_DELIMITER && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
