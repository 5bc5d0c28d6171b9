//! Display names chosen by clients during the handshake.

use std::fmt;

/// A participant's display name.
///
/// Names are compared for uniqueness without regard to case, but are always
/// shown exactly as the client typed them (minus surrounding whitespace).
///
/// No validation beyond trimming is performed: an empty name is a valid,
/// if degenerate, name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DisplayName(String);

impl DisplayName {
    /// Creates a display name verbatim.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a display name from a raw handshake line.
    ///
    /// Strips surrounding whitespace, including the line terminator.
    pub fn from_input(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    /// Returns the name as typed.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the case-folded form used for uniqueness checks.
    #[must_use]
    pub fn folded(&self) -> String {
        self.0.to_lowercase()
    }

    /// Checks whether two names collide under case-insensitive comparison.
    #[must_use]
    pub fn matches(&self, other: &DisplayName) -> bool {
        self.0 == other.0 || self.folded() == other.folded()
    }

    /// Returns true for the empty name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DisplayName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DisplayName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
