use thiserror::Error;

/// Job ledger error types
#[derive(Error, Debug, Clone)]
pub enum EscrowError {
    /// Caller is not the job's client
    #[error("Not the client for job {0}")]
    NotClient(u64),

    /// Caller is not the job's freelancer
    #[error("Not the freelancer for job {0}")]
    NotFreelancer(u64),

    /// Caller is neither client nor freelancer
    #[error("Not a party to job {0}")]
    NotAParty(u64),

    /// Operation requires an assigned freelancer
    #[error("Job {0} has no freelancer assigned")]
    NotAssigned(u64),

    /// Operation requires the job to be in Open status
    #[error("Job {0} is not open")]
    NotOpen(u64),

    /// Operation requires the milestone to be in Submitted status
    #[error("Milestone {index} of job {job_id} is not awaiting review")]
    NotSubmitted { job_id: u64, index: usize },

    /// Milestone is not in a submittable state
    #[error("Milestone {index} of job {job_id} cannot be submitted")]
    CannotSubmit { job_id: u64, index: usize },

    /// Milestone is not under dispute
    #[error("Milestone {index} of job {job_id} is not under dispute")]
    NotDisputed { job_id: u64, index: usize },

    /// Cancellation requires the job to still be Open
    #[error("Job {0} can no longer be cancelled")]
    CannotCancel(u64),

    /// Settlement retry requires a fully settled, not yet completed job
    #[error("Job {0} has no pending completion")]
    CompletionNotPending(u64),

    /// Auto-approval grace period has not elapsed
    #[error("Milestone {index} of job {job_id} is not yet eligible for auto-approval")]
    AutoApproveNotReady { job_id: u64, index: usize },

    /// Rejection would exceed the revision cap
    #[error("Milestone {index} of job {job_id} has exhausted its revisions")]
    MaxRevisionsReached { job_id: u64, index: usize },

    /// Platform is paused
    #[error("Platform is paused")]
    Paused,

    /// A job must carry at least one milestone
    #[error("Job has no milestones")]
    NoMilestones,

    /// Milestone count exceeds the per-job cap
    #[error("Too many milestones: {got} (max {max})")]
    TooManyMilestones { got: usize, max: usize },

    /// Milestone field vectors differ in length
    #[error("Milestone titles, descriptions and amounts must have equal length")]
    MilestoneMismatch,

    /// Milestone amount below the configured floor
    #[error("Milestone amount below minimum of {minimum} base units")]
    BelowMinimumAmount { minimum: u64 },

    /// Deadline does not leave the required lead time
    #[error("Deadline for job must be at least {lead_secs}s in the future")]
    DeadlineTooSoon { lead_secs: i64 },

    /// Job deadline has already passed
    #[error("Deadline for job {0} has passed")]
    PastDeadline(u64),

    /// Submission carried no deliverable reference
    #[error("Deliverable reference is empty")]
    EmptyDeliverable,

    /// The zero identity cannot participate
    #[error("Zero address")]
    ZeroAddress,

    /// A client cannot hire themselves
    #[error("Client and freelancer must differ")]
    SelfAssignment,

    /// Fee rate outside 0..=10000 basis points
    #[error("Invalid fee rate: {0} bps")]
    InvalidFeeRate(u64),

    /// Locked amount would overflow
    #[error("Amount overflow")]
    AmountOverflow,

    /// Unknown job id
    #[error("Job not found: {0}")]
    JobNotFound(u64),

    /// Milestone index out of range for the job
    #[error("Milestone {index} not found on job {job_id}")]
    MilestoneNotFound { job_id: u64, index: usize },

    /// No arbitration engine has been wired in
    #[error("Dispute engine not configured")]
    EngineNotConfigured,

    /// The value transfer port refused or failed the movement
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Opening the dispute failed downstream
    #[error("Dispute failed: {0}")]
    DisputeFailed(String),

    /// Credential issuance failed downstream
    #[error("Credential issuance failed: {0}")]
    CredentialFailed(String),
}

/// Result type for job ledger operations
pub type Result<T> = std::result::Result<T, EscrowError>;
