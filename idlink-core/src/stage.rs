//! Progress of a single linking attempt.

use std::fmt;

/// Where a linking attempt currently is.
///
/// Stages only move forward. A failure at any stage ends the attempt; there
/// is nothing to resume from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LinkStage {
    /// Nothing exchanged yet.
    #[default]
    Unauthenticated,
    /// The code was exchanged for an access token.
    TokenObtained,
    /// Profile and descriptor were fetched.
    ProfileResolved,
    /// The canonical identity was produced.
    Linked,
}

impl LinkStage {
    /// The stage that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Unauthenticated => Some(Self::TokenObtained),
            Self::TokenObtained => Some(Self::ProfileResolved),
            Self::ProfileResolved => Some(Self::Linked),
            Self::Linked => None,
        }
    }

    /// Move to the next stage. Stays put once linked.
    pub fn advance(&mut self) -> Self {
        if let Some(next) = self.next() {
            *self = next;
        }
        *self
    }

    /// Stage name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::TokenObtained => "token_obtained",
            Self::ProfileResolved => "profile_resolved",
            Self::Linked => "linked",
        }
    }

    /// Whether the attempt completed.
    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Linked)
    }
}

impl fmt::Display for LinkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
