//! User-visible warnings
//!
//! Warnings are logged when raised and also returned to the caller, which
//! decides how to render them.

use crate::key::StagedKey;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Which side of a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Live remote value
    Remote,
    /// Staged value
    Staged,
    /// Left-hand version
    Left,
    /// Right-hand version
    Right,
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Remote => "remote",
            Self::Staged => "staged",
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// Non-fatal condition worth telling the user about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Staged value equals the live value; the entry was unstaged
    AutoUnstaged {
        /// Affected key
        key: StagedKey,
    },
    /// JSON formatting requested but only one side is valid JSON
    JsonFallback {
        /// Resource name
        name: String,
        /// Side that is not JSON
        side: Side,
    },
    /// Two resolved versions hold the same value
    IdenticalVersions {
        /// Rendered left specifier
        left: String,
        /// Rendered right specifier
        right: String,
        /// Suggested specifier to compare against instead
        hint: String,
    },
}

impl Warning {
    /// Log the warning and hand it back
    #[must_use]
    pub fn raise(self) -> Self {
        tracing::warn!("{self}");
        self
    }
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoUnstaged { key } => {
                write!(f, "unstaged {key}: staged value is identical to the remote")
            }
            Self::JsonFallback { name, side } => write!(
                f,
                "{name}: {side} value is not valid JSON, comparing raw text"
            ),
            Self::IdenticalVersions { left, right, hint } => write!(
                f,
                "{left} and {right} are identical; try comparing with {hint}"
            ),
        }
    }
}
