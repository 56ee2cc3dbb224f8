use gig_types::{AccountAddress, TokenAmount};
use serde::{Deserialize, Serialize};

/// Lifecycle of a job on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Funded, no freelancer yet
    Open,
    /// Freelancer assigned, work underway
    InProgress,
    /// At least one milestone awaiting client review
    UnderReview,
    /// Every milestone settled, fee paid out, credential issued
    Completed,
    /// A milestone is under arbitration
    Disputed,
    /// Cancelled while still Open; all funds refunded
    Cancelled,
}

/// Lifecycle of a single milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MilestoneStatus {
    /// Not yet submitted
    Pending,
    /// Submitted, awaiting client review
    Submitted,
    /// Released to the worker
    Approved,
    /// Sent back for revision, or refunded after a client-favor dispute
    Rejected,
    /// Frozen under arbitration
    Disputed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub description_ref: String,
    pub amount: TokenAmount,
    pub status: MilestoneStatus,
    pub deliverable_ref: String,
    pub submitted_at: Option<i64>,
    pub approved_at: Option<i64>,
    /// Rejections so far; capped by `EscrowConfig::max_revisions`
    pub revision: u8,
    /// Set when a client-favor dispute refunds this milestone. A refunded
    /// milestone is terminal: it can never be resubmitted or released.
    pub refunded_at: Option<i64>,
}

impl Milestone {
    pub fn new(title: String, description_ref: String, amount: TokenAmount) -> Self {
        Self {
            title,
            description_ref,
            amount,
            status: MilestoneStatus::Pending,
            deliverable_ref: String::new(),
            submitted_at: None,
            approved_at: None,
            revision: 0,
            refunded_at: None,
        }
    }

    /// Settled milestones no longer hold custody funds: either released to
    /// the worker or refunded to the client.
    pub fn is_settled(&self) -> bool {
        self.status == MilestoneStatus::Approved || self.refunded_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub client: AccountAddress,
    pub freelancer: Option<AccountAddress>,
    pub title: String,
    pub description_ref: String,
    pub category: String,
    /// Sum of milestone amounts; the fee is locked on top of this
    pub total_amount: TokenAmount,
    pub platform_fee: TokenAmount,
    /// Set once the locked fee has left custody; completion never pays twice
    pub fee_paid: bool,
    pub status: JobStatus,
    pub created_at: i64,
    pub deadline: i64,
    pub milestones: Vec<Milestone>,
}

impl Job {
    pub fn is_settled(&self) -> bool {
        self.milestones.iter().all(|m| m.is_settled())
    }

    /// Total released to the worker so far.
    pub fn amount_earned(&self) -> TokenAmount {
        self.milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Approved)
            .fold(TokenAmount::ZERO, |acc, m| acc.saturating_add(m.amount))
    }
}

/// Job ledger parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Platform fee in basis points of the job total
    pub fee_bps: u64,
    /// Floor for each milestone amount, in base units
    pub min_milestone_amount: TokenAmount,
    /// Minimum lead between creation and deadline, seconds
    pub min_deadline_lead_secs: i64,
    /// Cap on milestones per job
    pub max_milestones: usize,
    /// Cap on rejections per milestone
    pub max_revisions: u8,
    /// Grace after submission before anyone may auto-approve, seconds
    pub auto_approve_grace_secs: i64,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            fee_bps: 250,
            min_milestone_amount: TokenAmount::from_base_units(1_000_000),
            min_deadline_lead_secs: 86_400,
            max_milestones: 10,
            max_revisions: 3,
            auto_approve_grace_secs: 7 * 86_400,
        }
    }
}
