//! State module for tracking per-URL pipeline progress
//!
//! - `UrlState`: the stage a URL has reached (pending, fetching, ..., done or failed)
//! - `UrlProgress`: enforces legal transitions while a URL is processed

mod url_state;

pub use url_state::UrlState;

use crate::ParemiaError;

/// Tracks one URL through the pipeline, rejecting out-of-order transitions
#[derive(Debug, Clone)]
pub struct UrlProgress {
    url: String,
    state: UrlState,
}

impl UrlProgress {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: UrlState::Pending,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> UrlState {
        self.state
    }

    /// Moves to `to`, failing if the transition skips or reverses a stage
    pub fn advance(&mut self, to: UrlState) -> Result<(), ParemiaError> {
        if !self.state.can_transition_to(to) {
            return Err(ParemiaError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::trace!("{}: {} -> {}", self.url, self.state, to);
        self.state = to;
        Ok(())
    }

    /// Marks the URL failed; a no-op once terminal
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = UrlState::Failed;
        }
    }
}
