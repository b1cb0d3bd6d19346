//! Ordinal verdict and route-depth enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete outcome of an assessment, ordered by severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Benign,
    Suspicious,
    Malicious,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Benign => "benign",
            Verdict::Suspicious => "suspicious",
            Verdict::Malicious => "malicious",
        }
    }

    /// Action recommended to the mailbox owner for this verdict.
    pub fn recommended_action(&self) -> &'static str {
        match self {
            Verdict::Benign => "deliver",
            Verdict::Suspicious => "quarantine_for_review",
            Verdict::Malicious => "block_and_report",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Investigation depth selected by the router.
///
/// This is the only depth vocabulary used internally. The `FAST` /
/// `STANDARD` / `DEEP` labels exist only at the output boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDepth {
    Minimal,
    Standard,
    Deep,
}

impl RouteDepth {
    pub const ALL: [RouteDepth; 3] = [RouteDepth::Minimal, RouteDepth::Standard, RouteDepth::Deep];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDepth::Minimal => "minimal",
            RouteDepth::Standard => "standard",
            RouteDepth::Deep => "deep",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RouteDepth::Minimal => "FAST",
            RouteDepth::Standard => "STANDARD",
            RouteDepth::Deep => "DEEP",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "FAST" => Some(RouteDepth::Minimal),
            "STANDARD" => Some(RouteDepth::Standard),
            "DEEP" => Some(RouteDepth::Deep),
            _ => None,
        }
    }
}

impl fmt::Display for RouteDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serde adapter that writes a [`RouteDepth`] as its display name.
///
/// Use with `#[serde(with = "sieve_types::verdict::display_depth")]` on
/// response fields.
pub mod display_depth {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use super::RouteDepth;

    pub fn serialize<S: Serializer>(depth: &RouteDepth, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(depth.display_name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RouteDepth, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RouteDepth::from_display_name(&raw)
            .ok_or_else(|| D::Error::custom(format!("unknown route depth: {raw}")))
    }
}
