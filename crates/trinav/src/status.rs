//! State codes for searches and navigation requests

/// State of an [`AStarSearch`](crate::AStarSearch) or
/// [`DijkstraSearch`](crate::DijkstraSearch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchState {
    /// The search has not been initialized or has been reset
    #[default]
    Uninitialized,
    /// The search is initialized but no processing has occurred
    Initialized,
    /// The search is in progress
    Processing,
    /// The search finished successfully
    Complete,
    /// The search finished without finding a path
    Failed,
}

impl SearchState {
    /// Checks if the search can still make progress
    pub fn is_active(&self) -> bool {
        matches!(self, SearchState::Initialized | SearchState::Processing)
    }

    /// Checks if the search reached a terminal state
    pub fn is_finished(&self) -> bool {
        matches!(self, SearchState::Complete | SearchState::Failed)
    }
}

impl std::fmt::Display for SearchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchState::Uninitialized => write!(f, "Uninitialized"),
            SearchState::Initialized => write!(f, "Initialized"),
            SearchState::Processing => write!(f, "Processing"),
            SearchState::Complete => write!(f, "Complete"),
            SearchState::Failed => write!(f, "Failed"),
        }
    }
}

/// State of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NavRequestState {
    /// The request is still being worked on
    #[default]
    Processing,
    /// The request finished and its data is final
    Complete,
    /// The request could not be fulfilled
    Failed,
}

impl NavRequestState {
    /// Checks if the request reached a terminal state
    pub fn is_finished(&self) -> bool {
        *self != NavRequestState::Processing
    }
}

impl std::fmt::Display for NavRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavRequestState::Processing => write!(f, "Processing"),
            NavRequestState::Complete => write!(f, "Complete"),
            NavRequestState::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_state_activity() {
        assert!(!SearchState::Uninitialized.is_active());
        assert!(SearchState::Initialized.is_active());
        assert!(SearchState::Processing.is_active());
        assert!(!SearchState::Complete.is_active());
        assert!(!SearchState::Failed.is_active());

        assert!(SearchState::Complete.is_finished());
        assert!(SearchState::Failed.is_finished());
        assert!(!SearchState::Processing.is_finished());
        assert_eq!(SearchState::default(), SearchState::Uninitialized);
    }

    #[test]
    fn test_request_state() {
        assert_eq!(NavRequestState::default(), NavRequestState::Processing);
        assert!(!NavRequestState::Processing.is_finished());
        assert!(NavRequestState::Complete.is_finished());
        assert!(NavRequestState::Failed.is_finished());
        assert_eq!(NavRequestState::Failed.to_string(), "Failed");
    }
}
