//! Version specifiers
//!
//! A [`VersionSpec`] names a resource and, optionally, one exact revision of
//! it plus a relative "go back N versions" shift.
//!
//! # Examples
//! - `/app/db/url` → latest revision
//! - `/app/db/url#3` → ordinal version 3
//! - `/app/db/url~2` → two revisions before latest
//! - `db-creds:previous~1` → one revision before the one labelled `previous`

use crate::grammar::{BackendGrammar, IdKind};
use std::fmt::{self, Display, Formatter};

/// Absolute pin to one historical revision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbsoluteIdentifier {
    /// Ordinal version number
    Numeric(i64),
    /// Backend-assigned opaque version id
    OpaqueId(String),
    /// Movable stage label (e.g. `current`, `previous`)
    Label(String),
}

impl AbsoluteIdentifier {
    /// Raw value without any marker
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Numeric(n) => n.to_string(),
            Self::OpaqueId(id) => id.clone(),
            Self::Label(label) => label.clone(),
        }
    }

    /// Whether this identifier is a movable label
    #[inline]
    #[must_use]
    pub fn is_label(&self) -> bool {
        matches!(self, Self::Label(_))
    }
}

impl Display for AbsoluteIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "#{n}"),
            Self::OpaqueId(id) => write!(f, "#{id}"),
            Self::Label(label) => write!(f, ":{label}"),
        }
    }
}

/// Parsed version specifier
///
/// `shift` is always relative to the revision `absolute` identifies, or to
/// the latest revision when `absolute` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpec {
    /// Resource name
    pub name: String,
    /// Absolute pin, if any
    pub absolute: Option<AbsoluteIdentifier>,
    /// Number of revisions to go back
    pub shift: u32,
}

impl VersionSpec {
    /// Spec addressing the latest revision of `name`
    #[inline]
    #[must_use]
    pub fn latest(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            absolute: None,
            shift: 0,
        }
    }

    /// Pin to an absolute revision
    #[inline]
    #[must_use]
    pub fn at(mut self, absolute: AbsoluteIdentifier) -> Self {
        self.absolute = Some(absolute);
        self
    }

    /// Go back `shift` revisions
    #[inline]
    #[must_use]
    pub fn shifted(mut self, shift: u32) -> Self {
        self.shift = shift;
        self
    }

    /// Whether resolution needs the full history
    #[inline]
    #[must_use]
    pub fn needs_history(&self) -> bool {
        self.shift > 0
    }

    /// Render back into the text form accepted by `grammar`
    ///
    /// Falls back to the default markers (`#` and `:`) when the grammar has
    /// no marker for the identifier kind.
    #[must_use]
    pub fn render(&self, grammar: &BackendGrammar) -> String {
        let mut out = self.name.clone();
        match &self.absolute {
            Some(AbsoluteIdentifier::Numeric(n)) => {
                out.push(grammar.id_marker_for(IdKind::Numeric).unwrap_or('#'));
                out.push_str(&n.to_string());
            }
            Some(AbsoluteIdentifier::OpaqueId(id)) => {
                out.push(grammar.id_marker_for(IdKind::Opaque).unwrap_or('#'));
                out.push_str(id);
            }
            Some(AbsoluteIdentifier::Label(label)) => {
                out.push(grammar.label_marker().unwrap_or(':'));
                out.push_str(label);
            }
            None => {}
        }
        if self.shift > 0 {
            out.push('~');
            out.push_str(&self.shift.to_string());
        }
        out
    }
}

impl Display for VersionSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(absolute) = &self.absolute {
            write!(f, "{absolute}")?;
        }
        if self.shift > 0 {
            write!(f, "~{}", self.shift)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_latest() {
        assert_eq!(VersionSpec::latest("/a/b").to_string(), "/a/b");
    }

    #[test]
    fn display_full() {
        let spec = VersionSpec::latest("/a/b")
            .at(AbsoluteIdentifier::Numeric(3))
            .shifted(2);
        assert_eq!(spec.to_string(), "/a/b#3~2");
    }

    #[test]
    fn render_uses_grammar_markers() {
        let spec = VersionSpec::latest("creds")
            .at(AbsoluteIdentifier::Label("previous".into()))
            .shifted(1);
        assert_eq!(spec.render(&BackendGrammar::secret()), "creds:previous~1");
    }

    #[test]
    fn needs_history_only_with_shift() {
        let spec = VersionSpec::latest("x").at(AbsoluteIdentifier::Numeric(1));
        assert!(!spec.needs_history());
        assert!(spec.shifted(1).needs_history());
    }
}
