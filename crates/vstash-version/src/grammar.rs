//! Backend-selectable specifier grammars
//!
//! Each backend picks which absolute markers it understands. The parameter
//! backend only has ordinal versions (`#3`); the secret backend has opaque
//! version ids (`#<id>`) and stage labels (`:previous`).

/// How the value after the id marker is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// All-digit ordinal, parsed as `i64`
    Numeric,
    /// Backend-assigned opaque string
    Opaque,
}

/// Marker configuration for one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendGrammar {
    id: Option<(char, IdKind)>,
    label: Option<char>,
}

impl BackendGrammar {
    /// Grammar with no absolute markers (shift only)
    #[inline]
    #[must_use]
    pub const fn shift_only() -> Self {
        Self {
            id: None,
            label: None,
        }
    }

    /// Parameter store grammar: `#<number>`
    #[inline]
    #[must_use]
    pub const fn parameter() -> Self {
        Self {
            id: Some(('#', IdKind::Numeric)),
            label: None,
        }
    }

    /// Secret vault grammar: `#<version-id>` and `:<label>`
    #[inline]
    #[must_use]
    pub const fn secret() -> Self {
        Self {
            id: Some(('#', IdKind::Opaque)),
            label: Some(':'),
        }
    }

    /// Use `marker` for ids of `kind`
    #[inline]
    #[must_use]
    pub const fn with_id(mut self, marker: char, kind: IdKind) -> Self {
        self.id = Some((marker, kind));
        self
    }

    /// Use `marker` for labels
    #[inline]
    #[must_use]
    pub const fn with_label(mut self, marker: char) -> Self {
        self.label = Some(marker);
        self
    }

    /// Id marker and kind, if the grammar has one
    #[inline]
    #[must_use]
    pub fn id_marker(&self) -> Option<(char, IdKind)> {
        self.id
    }

    /// Id marker, only if the grammar uses ids of `kind`
    #[inline]
    #[must_use]
    pub fn id_marker_for(&self, kind: IdKind) -> Option<char> {
        self.id.filter(|(_, k)| *k == kind).map(|(c, _)| c)
    }

    /// Label marker, if the grammar has one
    #[inline]
    #[must_use]
    pub fn label_marker(&self) -> Option<char> {
        self.label
    }

    /// Which marker `c` is, if any
    pub(crate) fn marker(&self, c: char) -> Option<Marker> {
        match self.id {
            Some((m, kind)) if m == c => return Some(Marker::Id(kind)),
            _ => {}
        }
        match self.label {
            Some(m) if m == c => Some(Marker::Label),
            _ => None,
        }
    }
}

impl Default for BackendGrammar {
    fn default() -> Self {
        Self::parameter()
    }
}

/// Marker recognised at a given position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    Id(IdKind),
    Label,
}

impl Marker {
    /// Whether `c` may start a value after this marker
    pub(crate) fn accepts_start(self, c: char) -> bool {
        match self {
            Self::Id(IdKind::Numeric) => c.is_ascii_digit(),
            Self::Id(IdKind::Opaque) | Self::Label => c.is_ascii_alphanumeric(),
        }
    }
}

/// Characters allowed inside a marker value
pub(crate) fn is_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}
