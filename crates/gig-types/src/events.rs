//! Event system for escrow platform state changes
//!
//! Every state transition the platform performs is broadcast here so external
//! consumers (indexers, notification services, UIs) can react without polling.

use crate::types::{AccountAddress, TokenAmount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Events buffered per subscriber before old events are dropped
const EVENT_BUFFER: usize = 1024;

/// Events emitted by the escrow platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PlatformEvent {
    JobCreated {
        job_id: u64,
        client: AccountAddress,
        total_amount: TokenAmount,
        category: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    FreelancerAssigned {
        job_id: u64,
        freelancer: AccountAddress,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    MilestoneSubmitted {
        job_id: u64,
        milestone_index: usize,
        deliverable_ref: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    MilestoneApproved {
        job_id: u64,
        milestone_index: usize,
        amount_released: TokenAmount,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    MilestoneRejected {
        job_id: u64,
        milestone_index: usize,
        revision: u8,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    /// Emitted alongside `MilestoneApproved` on the permissionless path
    AutoApproved {
        job_id: u64,
        milestone_index: usize,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    JobCompleted {
        job_id: u64,
        freelancer: AccountAddress,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    JobCancelled {
        job_id: u64,
        refund_amount: TokenAmount,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    DisputeOpened {
        dispute_id: u64,
        job_id: u64,
        milestone_index: usize,
        raised_by: AccountAddress,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    VoteCast {
        dispute_id: u64,
        arbitrator: AccountAddress,
        favor_worker: bool,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    DisputeResolved {
        dispute_id: u64,
        favor_worker: bool,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },
}

impl PlatformEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            PlatformEvent::JobCreated { .. } => "job_created",
            PlatformEvent::FreelancerAssigned { .. } => "freelancer_assigned",
            PlatformEvent::MilestoneSubmitted { .. } => "milestone_submitted",
            PlatformEvent::MilestoneApproved { .. } => "milestone_approved",
            PlatformEvent::MilestoneRejected { .. } => "milestone_rejected",
            PlatformEvent::AutoApproved { .. } => "auto_approved",
            PlatformEvent::JobCompleted { .. } => "job_completed",
            PlatformEvent::JobCancelled { .. } => "job_cancelled",
            PlatformEvent::DisputeOpened { .. } => "dispute_opened",
            PlatformEvent::VoteCast { .. } => "vote_cast",
            PlatformEvent::DisputeResolved { .. } => "dispute_resolved",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PlatformEvent::JobCreated { timestamp, .. }
            | PlatformEvent::FreelancerAssigned { timestamp, .. }
            | PlatformEvent::MilestoneSubmitted { timestamp, .. }
            | PlatformEvent::MilestoneApproved { timestamp, .. }
            | PlatformEvent::MilestoneRejected { timestamp, .. }
            | PlatformEvent::AutoApproved { timestamp, .. }
            | PlatformEvent::JobCompleted { timestamp, .. }
            | PlatformEvent::JobCancelled { timestamp, .. }
            | PlatformEvent::DisputeOpened { timestamp, .. }
            | PlatformEvent::VoteCast { timestamp, .. }
            | PlatformEvent::DisputeResolved { timestamp, .. } => *timestamp,
        }
    }
}

/// Broadcast bus for platform events.
///
/// Cloning shares the underlying channel; the escrow manager and the dispute
/// engine hold clones of one bus so subscribers see a single ordered stream.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: PlatformEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(event_type, receivers, "📢 Event emitted");
            }
            Err(_) => {
                // No subscribers; events are fire-and-forget
                debug!(event_type, "Event emitted with no subscribers");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
