use thiserror::Error;

/// Dispute engine error types
#[derive(Error, Debug, Clone)]
pub enum DisputeError {
    /// Caller is not on this dispute's selected panel
    #[error("Not a selected arbitrator for dispute {0}")]
    NotSelectedArbitrator(u64),

    /// Arbitrator has already cast a vote on this dispute
    #[error("Already voted on dispute {0}")]
    AlreadyVoted(u64),

    /// Voting deadline has passed
    #[error("Voting ended for dispute {0}")]
    VotingEnded(u64),

    /// Voting deadline has not passed yet
    #[error("Voting period still active for dispute {0}")]
    VotingStillActive(u64),

    /// Dispute is not in the Active state
    #[error("Dispute {0} is not active")]
    DisputeNotActive(u64),

    /// Dispute id is unknown
    #[error("Dispute not found: {0}")]
    DisputeNotFound(u64),

    /// Registry does not hold enough arbitrators to form a panel
    #[error("Insufficient arbitrators: needed {needed}, available {available}")]
    InsufficientArbitrators { needed: usize, available: usize },

    /// Identity is already registered as an arbitrator
    #[error("Already an arbitrator: {0}")]
    AlreadyArbitrator(String),

    /// The zero identity is never a valid arbitrator
    #[error("Zero address")]
    ZeroAddress,

    /// No resolve-dispute capability has been wired in
    #[error("Dispute resolver not configured")]
    ResolverNotConfigured,

    /// The job ledger failed to apply the resolution
    #[error("Resolution failed: {0}")]
    ResolveFailed(String),
}

/// Result type for dispute engine operations
pub type Result<T> = std::result::Result<T, DisputeError>;
