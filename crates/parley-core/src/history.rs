//! Append-only chat history.

use crate::ChatLine;

/// Every line broadcast since the relay started, oldest first.
///
/// The log is never pruned; it lives as long as the process does.
#[derive(Debug, Default, Clone)]
pub struct History {
    entries: Vec<ChatLine>,
}

impl History {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line at the end of the log.
    pub fn push(&mut self, line: ChatLine) {
        self.entries.push(line);
    }

    /// Returns the entries in broadcast order.
    pub fn entries(&self) -> &[ChatLine] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a ChatLine;
    type IntoIter = std::slice::Iter<'a, ChatLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
