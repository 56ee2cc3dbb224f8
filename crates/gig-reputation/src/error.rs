use thiserror::Error;

/// Credential ledger error types
#[derive(Error, Debug, Clone)]
pub enum ReputationError {
    /// A credential for this job already exists
    #[error("Credential already issued for job {0}")]
    AlreadyIssued(u64),

    /// No credential exists for this job
    #[error("No credential for job {0}")]
    NoCredentialForJob(u64),

    /// Caller is not the client recorded on the credential
    #[error("Not the client for job {0}")]
    NotClient(u64),

    /// Rating already set; a credential is rated at most once
    #[error("Job {0} already rated")]
    AlreadyRated(u64),

    /// Rating outside the 1-5 range
    #[error("Invalid rating: {0} (must be 1-5)")]
    InvalidRating(u8),

    /// The zero identity cannot hold or issue credentials
    #[error("Zero address")]
    ZeroAddress,
}

/// Result type for credential ledger operations
pub type Result<T> = std::result::Result<T, ReputationError>;
