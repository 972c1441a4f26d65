/// Per-URL pipeline state definitions
///
/// Each URL pulled from the frontier walks these states strictly in order.
use std::fmt;

/// Represents the current state of a URL in the crawl pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    // ===== Active States =====
    /// Pulled from the frontier, not started yet
    Pending,

    /// Page content is being retrieved
    Fetching,

    /// Candidate fragments are being pulled out of the content
    Extracting,

    /// Fragments are being assigned a language
    Classifying,

    /// Classified fragments are being written to their partitions
    Storing,

    // ===== Terminal States =====
    /// Pipeline completed
    Done,

    /// Pipeline aborted at some stage
    Failed,
}

impl UrlState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns the state that follows this one on the success path
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Fetching),
            Self::Fetching => Some(Self::Extracting),
            Self::Extracting => Some(Self::Classifying),
            Self::Classifying => Some(Self::Storing),
            Self::Storing => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Returns true if moving from this state to `to` is allowed
    ///
    /// Any active state may fail; otherwise only the next stage is reachable.
    pub fn can_transition_to(&self, to: UrlState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }

    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Classifying => "classifying",
            Self::Storing => "storing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Parses a state from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "fetching" => Some(Self::Fetching),
            "extracting" => Some(Self::Extracting),
            "classifying" => Some(Self::Classifying),
            "storing" => Some(Self::Storing),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Extracting,
            Self::Classifying,
            Self::Storing,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
