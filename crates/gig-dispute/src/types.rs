use gig_types::AccountAddress;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dispute lifecycle: one-way, never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeStatus {
    Active,
    Resolved,
}

/// A milestone dispute under arbitration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: u64,
    pub job_id: u64,
    pub milestone_index: usize,
    pub raised_by: AccountAddress,
    pub created_at: i64,
    /// Fixed offset from creation; votes are only accepted strictly before it.
    pub voting_deadline: i64,
    pub status: DisputeStatus,
    /// Selected panel, fixed at creation, all distinct.
    pub panel: Vec<AccountAddress>,
    /// Vote direction per arbitrator; presence means the vote was cast.
    pub votes: HashMap<AccountAddress, bool>,
    pub votes_for_worker: u32,
    pub votes_for_client: u32,
}

impl Dispute {
    pub fn is_panel_member(&self, arbitrator: &AccountAddress) -> bool {
        self.panel.contains(arbitrator)
    }

    pub fn has_voted(&self, arbitrator: &AccountAddress) -> bool {
        self.votes.contains_key(arbitrator)
    }
}

/// Dispute engine configuration
#[derive(Debug, Clone)]
pub struct DisputeConfig {
    /// Panel size per dispute (distinct arbitrators)
    pub panel_size: usize,
    /// Matching votes required for early resolution
    pub quorum: u32,
    /// Voting window from dispute creation, in seconds
    pub voting_window_secs: i64,
}

impl Default for DisputeConfig {
    fn default() -> Self {
        Self {
            panel_size: 3,
            quorum: 2,
            voting_window_secs: 72 * 60 * 60,
        }
    }
}
