//! Candidate ports for binding a listener.

use tilecast_protocol::PORT_SEARCH_SPAN;

/// Inclusive range of ports tried by a bind.
///
/// A search starting at `port` covers `[port, port + PORT_SEARCH_SPAN)`,
/// truncated at 65535.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub first: u16,
    pub last: u16,
}

impl PortRange {
    /// Only `port` itself.
    pub fn single(port: u16) -> Self {
        Self {
            first: port,
            last: port,
        }
    }

    /// `port` and the ports following it.
    ///
    /// Port 0 asks the OS for any free port, so it never needs a search.
    pub fn search(port: u16) -> Self {
        if port == 0 {
            return Self::single(0);
        }
        Self {
            first: port,
            last: port.saturating_add(PORT_SEARCH_SPAN - 1),
        }
    }

    /// The candidates for a bind request.
    pub fn candidates(port: u16, search: bool) -> Self {
        if search {
            Self::search(port)
        } else {
            Self::single(port)
        }
    }

    /// Number of ports in the range; zero if `last < first`.
    pub fn len(&self) -> usize {
        if self.last < self.first {
            0
        } else {
            (self.last - self.first) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the ports in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.first..=self.last
    }
}

impl std::fmt::Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.first == self.last {
            write!(f, "port {}", self.first)
        } else {
            write!(f, "ports {}-{}", self.first, self.last)
        }
    }
}
