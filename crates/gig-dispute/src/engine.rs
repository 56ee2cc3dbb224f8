//! Dispute lifecycle: panel selection, quorum voting, timeout finalization.
//!
//! A dispute resolves exactly once, either early (a decisive quorum of
//! matching votes) or by permissionless finalization after the voting
//! deadline. The engine never touches job or milestone state directly; it
//! reports the outcome through the narrow [`DisputeResolver`] capability the
//! job ledger implements.

use crate::error::{DisputeError, Result};
use crate::registry::ArbitratorRegistry;
use crate::types::{Dispute, DisputeConfig, DisputeStatus};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gig_types::{AccountAddress, Clock, EventBus, PlatformEvent, SequenceAllocator};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Narrow resolve-dispute capability of the job ledger.
///
/// The engine holds the ledger only through this trait, so it can release or
/// refund funds without a full mutable reference to job state.
#[async_trait]
pub trait DisputeResolver: Send + Sync {
    async fn resolve_dispute(
        &self,
        job_id: u64,
        milestone_index: usize,
        favor_worker: bool,
    ) -> anyhow::Result<()>;
}

pub struct DisputeEngine {
    config: DisputeConfig,
    registry: Arc<ArbitratorRegistry>,
    resolver: RwLock<Option<Arc<dyn DisputeResolver>>>,
    disputes: Arc<RwLock<HashMap<u64, Dispute>>>,
    ids: SequenceAllocator,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl DisputeEngine {
    pub fn new(
        config: DisputeConfig,
        registry: Arc<ArbitratorRegistry>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            registry,
            resolver: RwLock::new(None),
            disputes: Arc::new(RwLock::new(HashMap::new())),
            ids: SequenceAllocator::new(),
            clock,
            events,
        }
    }

    /// Wire in the job ledger's resolve capability. Must be called before any
    /// dispute can resolve.
    pub async fn set_resolver(&self, resolver: Arc<dyn DisputeResolver>) {
        *self.resolver.write().await = Some(resolver);
    }

    /// Open a dispute on a submitted milestone. Invoked by the job ledger.
    ///
    /// Selects a fixed-size panel of distinct arbitrators from the registry.
    /// Selection is deterministic given the seed but seeded with call-time
    /// entropy, so neither party can predict the panel ahead of raising the
    /// dispute. The seed is not cryptographically unpredictable.
    pub async fn open_dispute(
        &self,
        job_id: u64,
        milestone_index: usize,
        raised_by: AccountAddress,
    ) -> Result<u64> {
        let mut pool = self.registry.snapshot().await;
        if pool.len() < self.config.panel_size {
            return Err(DisputeError::InsufficientArbitrators {
                needed: self.config.panel_size,
                available: pool.len(),
            });
        }

        let now = self.clock.now();
        let seed = selection_seed(job_id, milestone_index, now);
        let panel = select_panel(&mut pool, self.config.panel_size, &seed);

        let dispute_id = self.ids.next_id();
        let dispute = Dispute {
            id: dispute_id,
            job_id,
            milestone_index,
            raised_by,
            created_at: now,
            voting_deadline: now + self.config.voting_window_secs,
            status: DisputeStatus::Active,
            panel: panel.clone(),
            votes: HashMap::new(),
            votes_for_worker: 0,
            votes_for_client: 0,
        };

        self.disputes.write().await.insert(dispute_id, dispute);

        info!(
            dispute_id,
            job_id,
            milestone_index,
            raised_by = %raised_by,
            panel_size = panel.len(),
            "⚖️ Dispute opened"
        );

        self.events.emit(PlatformEvent::DisputeOpened {
            dispute_id,
            job_id,
            milestone_index,
            raised_by,
            timestamp: timestamp(now),
        });

        Ok(dispute_id)
    }

    /// Record a panel member's vote. Resolves immediately once one side
    /// reaches the decisive quorum.
    pub async fn vote(
        &self,
        arbitrator: AccountAddress,
        dispute_id: u64,
        favor_worker: bool,
    ) -> Result<()> {
        let now = self.clock.now();
        let quorum_outcome = {
            let mut disputes = self.disputes.write().await;
            let dispute = disputes
                .get_mut(&dispute_id)
                .ok_or(DisputeError::DisputeNotFound(dispute_id))?;

            if dispute.status != DisputeStatus::Active {
                return Err(DisputeError::DisputeNotActive(dispute_id));
            }
            if !dispute.is_panel_member(&arbitrator) {
                return Err(DisputeError::NotSelectedArbitrator(dispute_id));
            }
            if dispute.has_voted(&arbitrator) {
                return Err(DisputeError::AlreadyVoted(dispute_id));
            }
            if now >= dispute.voting_deadline {
                return Err(DisputeError::VotingEnded(dispute_id));
            }

            dispute.votes.insert(arbitrator, favor_worker);
            if favor_worker {
                dispute.votes_for_worker += 1;
            } else {
                dispute.votes_for_client += 1;
            }

            info!(
                dispute_id,
                arbitrator = %arbitrator,
                favor_worker,
                votes_for_worker = dispute.votes_for_worker,
                votes_for_client = dispute.votes_for_client,
                "🗳️ Vote recorded"
            );

            if dispute.votes_for_worker >= self.config.quorum {
                dispute.status = DisputeStatus::Resolved;
                Some((dispute.job_id, dispute.milestone_index, true))
            } else if dispute.votes_for_client >= self.config.quorum {
                dispute.status = DisputeStatus::Resolved;
                Some((dispute.job_id, dispute.milestone_index, false))
            } else {
                None
            }
        };

        self.events.emit(PlatformEvent::VoteCast {
            dispute_id,
            arbitrator,
            favor_worker,
            timestamp: timestamp(now),
        });

        if let Some((job_id, milestone_index, winner_is_worker)) = quorum_outcome {
            self.apply_resolution(dispute_id, job_id, milestone_index, winner_is_worker)
                .await?;
        }
        Ok(())
    }

    /// Permissionless finalization once the voting deadline has passed.
    ///
    /// The side with more votes cast wins. A tie, including zero votes,
    /// resolves in favor of the worker: the deliverable was submitted and the
    /// panel produced no majority against it.
    pub async fn finalize_dispute(&self, dispute_id: u64) -> Result<()> {
        let now = self.clock.now();
        let (job_id, milestone_index, favor_worker) = {
            let mut disputes = self.disputes.write().await;
            let dispute = disputes
                .get_mut(&dispute_id)
                .ok_or(DisputeError::DisputeNotFound(dispute_id))?;

            if dispute.status != DisputeStatus::Active {
                return Err(DisputeError::DisputeNotActive(dispute_id));
            }
            if now < dispute.voting_deadline {
                return Err(DisputeError::VotingStillActive(dispute_id));
            }

            dispute.status = DisputeStatus::Resolved;
            let favor_worker = dispute.votes_for_worker >= dispute.votes_for_client;

            info!(
                dispute_id,
                votes_for_worker = dispute.votes_for_worker,
                votes_for_client = dispute.votes_for_client,
                favor_worker,
                "⏰ Dispute finalized after deadline"
            );

            (dispute.job_id, dispute.milestone_index, favor_worker)
        };

        self.apply_resolution(dispute_id, job_id, milestone_index, favor_worker)
            .await
    }

    /// Report the outcome to the job ledger and emit the resolution event.
    ///
    /// The dispute is already marked Resolved, which blocks further votes. If
    /// the ledger rejects the resolution (e.g. the value transfer failed) the
    /// dispute is reverted to Active so the resolution can be re-driven.
    async fn apply_resolution(
        &self,
        dispute_id: u64,
        job_id: u64,
        milestone_index: usize,
        favor_worker: bool,
    ) -> Result<()> {
        let resolver = {
            let guard = self.resolver.read().await;
            guard.clone().ok_or(DisputeError::ResolverNotConfigured)?
        };

        if let Err(e) = resolver
            .resolve_dispute(job_id, milestone_index, favor_worker)
            .await
        {
            warn!(
                dispute_id,
                job_id,
                error = %e,
                "Resolution rejected by job ledger, reverting dispute to active"
            );
            if let Some(dispute) = self.disputes.write().await.get_mut(&dispute_id) {
                dispute.status = DisputeStatus::Active;
            }
            return Err(DisputeError::ResolveFailed(e.to_string()));
        }

        info!(dispute_id, job_id, favor_worker, "✅ Dispute resolved");

        self.events.emit(PlatformEvent::DisputeResolved {
            dispute_id,
            favor_worker,
            timestamp: timestamp(self.clock.now()),
        });
        Ok(())
    }

    pub async fn get_dispute(&self, dispute_id: u64) -> Option<Dispute> {
        self.disputes.read().await.get(&dispute_id).cloned()
    }

    pub async fn get_arbitrators(&self, dispute_id: u64) -> Result<Vec<AccountAddress>> {
        let disputes = self.disputes.read().await;
        let dispute = disputes
            .get(&dispute_id)
            .ok_or(DisputeError::DisputeNotFound(dispute_id))?;
        Ok(dispute.panel.clone())
    }

    /// Tally so far: (votes for worker, votes for client).
    pub async fn get_votes(&self, dispute_id: u64) -> Result<(u32, u32)> {
        let disputes = self.disputes.read().await;
        let dispute = disputes
            .get(&dispute_id)
            .ok_or(DisputeError::DisputeNotFound(dispute_id))?;
        Ok((dispute.votes_for_worker, dispute.votes_for_client))
    }
}

fn timestamp(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Seed for panel selection: call-time entropy mixed with the dispute's
/// coordinates, hashed so selection is deterministic given the seed.
fn selection_seed(job_id: u64, milestone_index: usize, now: i64) -> [u8; 32] {
    let entropy: u64 = rand::random();
    let mut data = Vec::with_capacity(32);
    data.extend_from_slice(&job_id.to_le_bytes());
    data.extend_from_slice(&(milestone_index as u64).to_le_bytes());
    data.extend_from_slice(&now.to_le_bytes());
    data.extend_from_slice(&entropy.to_le_bytes());
    *blake3::hash(&data).as_bytes()
}

/// Draw `panel_size` distinct members from the pool without replacement.
fn select_panel(
    pool: &mut Vec<AccountAddress>,
    panel_size: usize,
    seed: &[u8; 32],
) -> Vec<AccountAddress> {
    let mut panel = Vec::with_capacity(panel_size);
    for round in 0..panel_size {
        let mut hasher = blake3::Hasher::new();
        hasher.update(seed);
        hasher.update(&(round as u64).to_le_bytes());
        let digest = hasher.finalize();
        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&digest.as_bytes()[..8]);
        let index = (u64::from_le_bytes(index_bytes) % pool.len() as u64) as usize;
        panel.push(pool.swap_remove(index));
    }
    panel
}
