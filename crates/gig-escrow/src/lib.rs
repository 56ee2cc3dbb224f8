//! # GigLedger Job Ledger
//!
//! Core of the escrow platform: jobs, milestones, fund custody and release.
//!
//! A client funds a job up front (milestone total plus platform fee), assigns
//! a freelancer, and reviews milestone deliverables one by one. Approval
//! releases that milestone's funds from custody to the worker; rejection sends
//! it back for revision up to a cap; a stale review can be auto-approved by
//! anyone after the grace period. Disagreements freeze the milestone under
//! the arbitration engine, which settles it through the [`DisputeResolver`]
//! capability [`EscrowManager`] implements. When every milestone has settled
//! the fee pays out, the job completes, and the worker's credential is issued.
//!
//! [`DisputeResolver`]: gig_dispute::DisputeResolver

pub mod error;
pub mod escrow;
pub mod platform;
pub mod types;

pub use error::{EscrowError, Result};
pub use escrow::EscrowManager;
pub use platform::GigPlatform;
pub use types::{EscrowConfig, Job, JobStatus, Milestone, MilestoneStatus};
