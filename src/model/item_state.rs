/// Per-item processing states and run classifications
///
/// Every work item moves through
/// `Queued → Fetching → (FetchFailed | Extracted) → (Committed | CommitFailed) → Done`.
/// A recoverable fetch failure re-enters `Queued` as a new logical attempt
/// with the same identity.
use std::fmt;

/// State of one work item inside the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    Queued,
    Fetching,
    FetchFailed,
    Extracted,
    Committed,
    CommitFailed,
    Done,
}

impl ItemState {
    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition(self, next: ItemState) -> bool {
        use ItemState::*;
        matches!(
            (self, next),
            (Queued, Fetching)
                | (Queued, Done) // already-visited short circuit
                | (Fetching, FetchFailed)
                | (Fetching, Extracted)
                | (FetchFailed, Queued) // re-enqueue
                | (FetchFailed, Done) // dead-letter
                | (Extracted, Committed)
                | (Extracted, CommitFailed)
                | (Committed, Done)
                | (CommitFailed, Done)
        )
    }

    /// Advances to `next`, tracing the transition. Illegal transitions are a
    /// pipeline bug and assert in debug builds.
    pub fn advance(self, next: ItemState) -> ItemState {
        debug_assert!(
            self.can_transition(next),
            "invalid item transition: {:?} -> {:?}",
            self,
            next
        );
        tracing::trace!("item state: {:?} -> {:?}", self, next);
        next
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::FetchFailed => "fetch_failed",
            Self::Extracted => "extracted",
            Self::Committed => "committed",
            Self::CommitFailed => "commit_failed",
            Self::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// Final classification of one work item, reported in the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Fetched, extracted, and committed this run
    Added,

    /// Already in the visited ledger; fetch and extract were bypassed
    Skipped,

    /// Dead-lettered: attempts exhausted, structure unusable, or commit rejected
    Unrecoverable,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Skipped => "skipped",
            Self::Unrecoverable => "unrecoverable",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use ItemState::*;
        let chain = [Queued, Fetching, Extracted, Committed, Done];
        for pair in chain.windows(2) {
            assert!(pair[0].can_transition(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_retry_loop_transitions() {
        use ItemState::*;
        assert!(Fetching.can_transition(FetchFailed));
        assert!(FetchFailed.can_transition(Queued));
        assert!(FetchFailed.can_transition(Done));
    }

    #[test]
    fn test_visited_short_circuit() {
        assert!(ItemState::Queued.can_transition(ItemState::Done));
    }

    #[test]
    fn test_commit_failure_is_terminal() {
        use ItemState::*;
        assert!(Extracted.can_transition(CommitFailed));
        assert!(CommitFailed.can_transition(Done));
        assert!(!CommitFailed.can_transition(Queued));
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        use ItemState::*;
        assert!(!Queued.can_transition(Extracted));
        assert!(!Fetching.can_transition(Committed));
        assert!(!Done.can_transition(Queued));
        assert!(!Committed.can_transition(CommitFailed));
    }

    #[test]
    fn test_only_done_is_terminal() {
        use ItemState::*;
        assert!(Done.is_terminal());
        for s in [Queued, Fetching, FetchFailed, Extracted, Committed, CommitFailed] {
            assert!(!s.is_terminal());
        }
    }

    #[test]
    fn test_outcome_strings() {
        assert_eq!(Outcome::Added.as_str(), "added");
        assert_eq!(Outcome::Skipped.as_str(), "skipped");
        assert_eq!(Outcome::Unrecoverable.as_str(), "unrecoverable");
    }
}
