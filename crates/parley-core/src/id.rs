//! Connection identity.

use std::fmt;

/// Identity of one accepted connection.
///
/// Assigned by the listener from a monotonically increasing counter, so two
/// live connections never share an id even when they pick the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// Creates a client id from a connection number.
    pub const fn new(connection_number: u64) -> Self {
        Self(connection_number)
    }

    /// Returns the underlying connection number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

impl From<u64> for ClientId {
    fn from(n: u64) -> Self {
        Self(n)
    }
}
