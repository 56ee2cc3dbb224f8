//! Job ledger: funding, milestone review, release, cancellation.
//!
//! All funds a job locks sit at the custody address until a milestone is
//! approved (released to the worker) or refunded (returned to the client).
//! The fee locked at creation is paid out only when the job completes; a
//! cancelled job refunds it with the principal. Every mutating operation
//! commits state only after the value transfer it depends on has succeeded.

use crate::error::{EscrowError, Result};
use crate::types::{EscrowConfig, Job, JobStatus, Milestone, MilestoneStatus};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gig_dispute::{DisputeEngine, DisputeResolver};
use gig_economics::ValueTransfer;
use gig_reputation::ReputationLedger;
use gig_types::{AccountAddress, Clock, EventBus, PlatformEvent, SequenceAllocator, TokenAmount};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct EscrowManager {
    config: RwLock<EscrowConfig>,
    ledger: Arc<dyn ValueTransfer>,
    reputation: Arc<ReputationLedger>,
    custody: AccountAddress,
    fee_recipient: RwLock<AccountAddress>,
    paused: AtomicBool,
    jobs: Arc<RwLock<HashMap<u64, Job>>>,
    jobs_by_client: RwLock<HashMap<AccountAddress, Vec<u64>>>,
    jobs_by_freelancer: RwLock<HashMap<AccountAddress, Vec<u64>>>,
    dispute_engine: RwLock<Option<Arc<DisputeEngine>>>,
    ids: SequenceAllocator,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl EscrowManager {
    pub fn new(
        config: EscrowConfig,
        ledger: Arc<dyn ValueTransfer>,
        reputation: Arc<ReputationLedger>,
        fee_recipient: AccountAddress,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Result<Self> {
        if fee_recipient.is_zero() {
            return Err(EscrowError::ZeroAddress);
        }
        Ok(Self {
            config: RwLock::new(config),
            ledger,
            reputation,
            custody: AccountAddress::custody(),
            fee_recipient: RwLock::new(fee_recipient),
            paused: AtomicBool::new(false),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            jobs_by_client: RwLock::new(HashMap::new()),
            jobs_by_freelancer: RwLock::new(HashMap::new()),
            dispute_engine: RwLock::new(None),
            ids: SequenceAllocator::new(),
            clock,
            events,
        })
    }

    /// Wire in the arbitration engine. Disputes cannot be raised until this
    /// has been called.
    pub async fn set_dispute_engine(&self, engine: Arc<DisputeEngine>) {
        *self.dispute_engine.write().await = Some(engine);
    }

    /// Create a job and lock its funding.
    ///
    /// Milestone fields are parallel vectors. The client is debited the
    /// milestone total plus the platform fee in a single transfer; the job id
    /// is allocated only after that transfer succeeds, so a failed funding
    /// leaves no trace on the ledger.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_job(
        &self,
        client: AccountAddress,
        title: String,
        description_ref: String,
        category: String,
        milestone_titles: Vec<String>,
        milestone_descriptions: Vec<String>,
        milestone_amounts: Vec<TokenAmount>,
        deadline: i64,
    ) -> Result<u64> {
        self.ensure_not_paused()?;
        if client.is_zero() {
            return Err(EscrowError::ZeroAddress);
        }

        let config = self.config.read().await.clone();
        if milestone_amounts.is_empty() {
            return Err(EscrowError::NoMilestones);
        }
        if milestone_amounts.len() > config.max_milestones {
            return Err(EscrowError::TooManyMilestones {
                got: milestone_amounts.len(),
                max: config.max_milestones,
            });
        }
        if milestone_titles.len() != milestone_amounts.len()
            || milestone_descriptions.len() != milestone_amounts.len()
        {
            return Err(EscrowError::MilestoneMismatch);
        }

        let mut total = TokenAmount::ZERO;
        for amount in &milestone_amounts {
            if *amount < config.min_milestone_amount {
                return Err(EscrowError::BelowMinimumAmount {
                    minimum: config.min_milestone_amount.to_base_units(),
                });
            }
            total = total
                .checked_add(*amount)
                .ok_or(EscrowError::AmountOverflow)?;
        }

        let now = self.clock.now();
        if deadline < now + config.min_deadline_lead_secs {
            return Err(EscrowError::DeadlineTooSoon {
                lead_secs: config.min_deadline_lead_secs,
            });
        }

        let fee = total.fee_bps(config.fee_bps);
        let locked = total.checked_add(fee).ok_or(EscrowError::AmountOverflow)?;

        self.ledger
            .transfer(client, self.custody, locked)
            .await
            .map_err(|e| EscrowError::TransferFailed(e.to_string()))?;

        let milestones = milestone_titles
            .into_iter()
            .zip(milestone_descriptions)
            .zip(milestone_amounts)
            .map(|((title, description), amount)| Milestone::new(title, description, amount))
            .collect();

        let job_id = self.ids.next_id();
        let job = Job {
            id: job_id,
            client,
            freelancer: None,
            title,
            description_ref,
            category: category.clone(),
            total_amount: total,
            platform_fee: fee,
            fee_paid: false,
            status: JobStatus::Open,
            created_at: now,
            deadline,
            milestones,
        };

        self.jobs.write().await.insert(job_id, job);
        self.jobs_by_client
            .write()
            .await
            .entry(client)
            .or_default()
            .push(job_id);

        info!(
            job_id,
            client = %client,
            total = total.to_tokens(),
            fee = fee.to_tokens(),
            "💰 Job created and funded"
        );

        self.events.emit(PlatformEvent::JobCreated {
            job_id,
            client,
            total_amount: total,
            category,
            timestamp: timestamp(now),
        });

        Ok(job_id)
    }

    /// Assign a freelancer to an open job. Client only.
    pub async fn assign_freelancer(
        &self,
        caller: AccountAddress,
        job_id: u64,
        freelancer: AccountAddress,
    ) -> Result<()> {
        self.ensure_not_paused()?;
        if freelancer.is_zero() {
            return Err(EscrowError::ZeroAddress);
        }

        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(EscrowError::JobNotFound(job_id))?;

        if caller != job.client {
            return Err(EscrowError::NotClient(job_id));
        }
        if job.status != JobStatus::Open {
            return Err(EscrowError::NotOpen(job_id));
        }
        if freelancer == job.client {
            return Err(EscrowError::SelfAssignment);
        }

        job.freelancer = Some(freelancer);
        job.status = JobStatus::InProgress;
        drop(jobs);

        self.jobs_by_freelancer
            .write()
            .await
            .entry(freelancer)
            .or_default()
            .push(job_id);

        let now = self.clock.now();
        info!(job_id, freelancer = %freelancer, "Freelancer assigned");
        self.events.emit(PlatformEvent::FreelancerAssigned {
            job_id,
            freelancer,
            timestamp: timestamp(now),
        });
        Ok(())
    }

    /// Submit (or resubmit) a milestone deliverable. Freelancer only.
    pub async fn submit_milestone(
        &self,
        caller: AccountAddress,
        job_id: u64,
        index: usize,
        deliverable_ref: String,
    ) -> Result<()> {
        self.ensure_not_paused()?;
        if deliverable_ref.is_empty() {
            return Err(EscrowError::EmptyDeliverable);
        }

        let now = self.clock.now();
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(EscrowError::JobNotFound(job_id))?;

        if job.freelancer != Some(caller) {
            return Err(EscrowError::NotFreelancer(job_id));
        }
        if !matches!(job.status, JobStatus::InProgress | JobStatus::UnderReview) {
            return Err(EscrowError::CannotSubmit { job_id, index });
        }
        if now > job.deadline {
            return Err(EscrowError::PastDeadline(job_id));
        }

        let milestone = job
            .milestones
            .get_mut(index)
            .ok_or(EscrowError::MilestoneNotFound { job_id, index })?;

        let submittable = matches!(
            milestone.status,
            MilestoneStatus::Pending | MilestoneStatus::Rejected
        ) && milestone.refunded_at.is_none();
        if !submittable {
            return Err(EscrowError::CannotSubmit { job_id, index });
        }

        milestone.status = MilestoneStatus::Submitted;
        milestone.submitted_at = Some(now);
        milestone.deliverable_ref = deliverable_ref.clone();
        job.status = JobStatus::UnderReview;

        info!(job_id, milestone_index = index, "Milestone submitted");
        self.events.emit(PlatformEvent::MilestoneSubmitted {
            job_id,
            milestone_index: index,
            deliverable_ref,
            timestamp: timestamp(now),
        });
        Ok(())
    }

    /// Approve a submitted milestone and release its funds. Client only.
    pub async fn approve_milestone(
        &self,
        caller: AccountAddress,
        job_id: u64,
        index: usize,
    ) -> Result<()> {
        self.ensure_not_paused()?;

        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(EscrowError::JobNotFound(job_id))?;

        if caller != job.client {
            return Err(EscrowError::NotClient(job_id));
        }
        self.ensure_submitted(job, index)?;
        self.release_milestone(job, index).await
    }

    /// Permissionless release of a milestone the client has sat on past the
    /// auto-approval grace period.
    pub async fn auto_approve_milestone(&self, job_id: u64, index: usize) -> Result<()> {
        self.ensure_not_paused()?;
        let grace = self.config.read().await.auto_approve_grace_secs;

        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(EscrowError::JobNotFound(job_id))?;

        self.ensure_submitted(job, index)?;
        let submitted_at = job.milestones[index]
            .submitted_at
            .ok_or(EscrowError::NotSubmitted { job_id, index })?;

        let now = self.clock.now();
        if now < submitted_at + grace {
            return Err(EscrowError::AutoApproveNotReady { job_id, index });
        }

        info!(job_id, milestone_index = index, "⏰ Auto-approving stale milestone");
        self.release_milestone(job, index).await?;
        self.events.emit(PlatformEvent::AutoApproved {
            job_id,
            milestone_index: index,
            timestamp: timestamp(now),
        });
        Ok(())
    }

    /// Send a submitted milestone back for revision. Client only, capped by
    /// the revision limit.
    pub async fn reject_milestone(
        &self,
        caller: AccountAddress,
        job_id: u64,
        index: usize,
    ) -> Result<()> {
        self.ensure_not_paused()?;
        let max_revisions = self.config.read().await.max_revisions;

        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(EscrowError::JobNotFound(job_id))?;

        if caller != job.client {
            return Err(EscrowError::NotClient(job_id));
        }
        self.ensure_submitted(job, index)?;

        let milestone = &mut job.milestones[index];
        if milestone.revision >= max_revisions {
            return Err(EscrowError::MaxRevisionsReached { job_id, index });
        }
        milestone.revision += 1;
        milestone.status = MilestoneStatus::Rejected;
        let revision = milestone.revision;
        job.status = job_phase(&job.milestones);

        let now = self.clock.now();
        info!(job_id, milestone_index = index, revision, "Milestone rejected");
        self.events.emit(PlatformEvent::MilestoneRejected {
            job_id,
            milestone_index: index,
            revision,
            timestamp: timestamp(now),
        });
        Ok(())
    }

    /// Cancel a still-open job and refund everything it locked, fee included.
    ///
    /// Deliberately not gated on pause: locked funds must always have a way
    /// back out.
    pub async fn cancel_job(&self, caller: AccountAddress, job_id: u64) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(EscrowError::JobNotFound(job_id))?;

        if caller != job.client {
            return Err(EscrowError::NotClient(job_id));
        }
        if job.status != JobStatus::Open {
            return Err(EscrowError::CannotCancel(job_id));
        }

        let refund = job.total_amount.saturating_add(job.platform_fee);
        self.ledger
            .transfer(self.custody, job.client, refund)
            .await
            .map_err(|e| EscrowError::TransferFailed(e.to_string()))?;

        job.status = JobStatus::Cancelled;

        let now = self.clock.now();
        info!(job_id, refund = refund.to_tokens(), "Job cancelled and refunded");
        self.events.emit(PlatformEvent::JobCancelled {
            job_id,
            refund_amount: refund,
            timestamp: timestamp(now),
        });
        Ok(())
    }

    /// Freeze a submitted milestone under arbitration. Either party may raise.
    pub async fn raise_dispute(
        &self,
        caller: AccountAddress,
        job_id: u64,
        index: usize,
    ) -> Result<u64> {
        self.ensure_not_paused()?;
        let engine = {
            let guard = self.dispute_engine.read().await;
            guard.clone().ok_or(EscrowError::EngineNotConfigured)?
        };

        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(EscrowError::JobNotFound(job_id))?;

        if caller != job.client && job.freelancer != Some(caller) {
            return Err(EscrowError::NotAParty(job_id));
        }
        self.ensure_submitted(job, index)?;

        let dispute_id = engine
            .open_dispute(job_id, index, caller)
            .await
            .map_err(|e| EscrowError::DisputeFailed(e.to_string()))?;

        job.milestones[index].status = MilestoneStatus::Disputed;
        job.status = JobStatus::Disputed;

        info!(job_id, milestone_index = index, dispute_id, "⚖️ Milestone frozen under dispute");
        Ok(dispute_id)
    }

    /// Settle a disputed milestone per the arbitration outcome.
    ///
    /// Worker favor releases the milestone like an approval and is therefore
    /// blocked while paused; the engine keeps the dispute re-drivable until
    /// after unpause. Client favor refunds the milestone amount even while
    /// paused, like cancellation, and terminates the milestone: it keeps
    /// Rejected status with its revisions exhausted and can never be
    /// resubmitted, since its funds have left custody.
    async fn apply_dispute_resolution(
        &self,
        job_id: u64,
        index: usize,
        favor_worker: bool,
    ) -> Result<()> {
        let max_revisions = self.config.read().await.max_revisions;

        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(EscrowError::JobNotFound(job_id))?;
        let status = job
            .milestones
            .get(index)
            .ok_or(EscrowError::MilestoneNotFound { job_id, index })?
            .status;
        if status != MilestoneStatus::Disputed {
            return Err(EscrowError::NotDisputed { job_id, index });
        }

        if favor_worker {
            self.ensure_not_paused()?;
            return self.release_milestone(job, index).await;
        }

        let amount = job.milestones[index].amount;
        self.ledger
            .transfer(self.custody, job.client, amount)
            .await
            .map_err(|e| EscrowError::TransferFailed(e.to_string()))?;

        let now = self.clock.now();
        let milestone = &mut job.milestones[index];
        milestone.status = MilestoneStatus::Rejected;
        milestone.revision = max_revisions;
        milestone.refunded_at = Some(now);

        info!(
            job_id,
            milestone_index = index,
            amount = amount.to_tokens(),
            "💸 Disputed milestone refunded to client"
        );

        let worker = job.freelancer.ok_or(EscrowError::NotAssigned(job_id))?;
        self.settle_job_phase(job, worker, now).await
    }

    /// Release a milestone's funds to the worker and advance the job.
    /// Caller has already validated authorization and milestone state.
    async fn release_milestone(&self, job: &mut Job, index: usize) -> Result<()> {
        let worker = job.freelancer.ok_or(EscrowError::NotAssigned(job.id))?;
        let amount = job.milestones[index].amount;

        self.ledger
            .transfer(self.custody, worker, amount)
            .await
            .map_err(|e| EscrowError::TransferFailed(e.to_string()))?;

        let now = self.clock.now();
        let milestone = &mut job.milestones[index];
        milestone.status = MilestoneStatus::Approved;
        milestone.approved_at = Some(now);

        info!(
            job_id = job.id,
            milestone_index = index,
            amount = amount.to_tokens(),
            worker = %worker,
            "💸 Milestone released"
        );
        self.events.emit(PlatformEvent::MilestoneApproved {
            job_id: job.id,
            milestone_index: index,
            amount_released: amount,
            timestamp: timestamp(now),
        });

        self.settle_job_phase(job, worker, now).await
    }

    /// Re-drive a job whose milestones have all settled but whose completion
    /// stalled partway, a failed fee payout for example. Permissionless, like
    /// auto-approval: the steps left to run are not discretionary.
    pub async fn settle_job(&self, job_id: u64) -> Result<()> {
        self.ensure_not_paused()?;

        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(EscrowError::JobNotFound(job_id))?;

        if matches!(job.status, JobStatus::Completed | JobStatus::Cancelled)
            || !job.is_settled()
        {
            return Err(EscrowError::CompletionNotPending(job_id));
        }
        let worker = job.freelancer.ok_or(EscrowError::NotAssigned(job_id))?;

        let now = self.clock.now();
        self.complete_job(job, worker, now).await
    }

    /// After a milestone settles, recompute the job's phase; once every
    /// milestone has settled, drive completion.
    async fn settle_job_phase(
        &self,
        job: &mut Job,
        worker: AccountAddress,
        now: i64,
    ) -> Result<()> {
        job.status = job_phase(&job.milestones);
        if job.is_settled() {
            self.complete_job(job, worker, now).await?;
        }
        Ok(())
    }

    /// Completion steps: fee payout, credential, Completed status. Each step
    /// is guarded so a retry through [`EscrowManager::settle_job`] never
    /// repeats one that already committed; a failure partway leaves the job
    /// in a re-drivable non-terminal state.
    async fn complete_job(&self, job: &mut Job, worker: AccountAddress, now: i64) -> Result<()> {
        if !job.fee_paid {
            let fee_recipient = *self.fee_recipient.read().await;
            if !job.platform_fee.is_zero() {
                self.ledger
                    .transfer(self.custody, fee_recipient, job.platform_fee)
                    .await
                    .map_err(|e| EscrowError::TransferFailed(e.to_string()))?;
            }
            job.fee_paid = true;
        }

        if self.reputation.token_for_job(job.id).await.is_none() {
            if let Err(e) = self
                .reputation
                .issue_credential(
                    worker,
                    job.client,
                    job.id,
                    job.title.clone(),
                    job.amount_earned(),
                    job.category.clone(),
                )
                .await
            {
                warn!(job_id = job.id, error = %e, "Credential issuance failed");
                return Err(EscrowError::CredentialFailed(e.to_string()));
            }
        }

        job.status = JobStatus::Completed;

        info!(
            job_id = job.id,
            worker = %worker,
            fee = job.platform_fee.to_tokens(),
            "✅ Job completed"
        );
        self.events.emit(PlatformEvent::JobCompleted {
            job_id: job.id,
            freelancer: worker,
            timestamp: timestamp(now),
        });
        Ok(())
    }

    fn ensure_submitted(&self, job: &Job, index: usize) -> Result<()> {
        let milestone = job
            .milestones
            .get(index)
            .ok_or(EscrowError::MilestoneNotFound {
                job_id: job.id,
                index,
            })?;
        if milestone.status != MilestoneStatus::Submitted {
            return Err(EscrowError::NotSubmitted {
                job_id: job.id,
                index,
            });
        }
        Ok(())
    }

    fn ensure_not_paused(&self) -> Result<()> {
        if self.paused.load(Ordering::SeqCst) {
            return Err(EscrowError::Paused);
        }
        Ok(())
    }

    // --- admin ---

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        warn!("Platform paused");
    }

    pub fn unpause(&self) {
        self.paused.store(false, Ordering::SeqCst);
        info!("Platform unpaused");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub async fn set_fee_recipient(&self, recipient: AccountAddress) -> Result<()> {
        if recipient.is_zero() {
            return Err(EscrowError::ZeroAddress);
        }
        *self.fee_recipient.write().await = recipient;
        info!(recipient = %recipient, "Fee recipient updated");
        Ok(())
    }

    /// Change the fee rate for jobs created from now on. Already-locked fees
    /// are unaffected.
    pub async fn set_fee_rate(&self, fee_bps: u64) -> Result<()> {
        if fee_bps > 10_000 {
            return Err(EscrowError::InvalidFeeRate(fee_bps));
        }
        self.config.write().await.fee_bps = fee_bps;
        info!(fee_bps, "Fee rate updated");
        Ok(())
    }

    // --- queries ---

    pub async fn get_job(&self, job_id: u64) -> Option<Job> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    pub async fn get_milestones(&self, job_id: u64) -> Result<Vec<Milestone>> {
        let jobs = self.jobs.read().await;
        let job = jobs.get(&job_id).ok_or(EscrowError::JobNotFound(job_id))?;
        Ok(job.milestones.clone())
    }

    pub async fn get_client_jobs(&self, client: AccountAddress) -> Vec<u64> {
        self.jobs_by_client
            .read()
            .await
            .get(&client)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn get_freelancer_jobs(&self, freelancer: AccountAddress) -> Vec<u64> {
        self.jobs_by_freelancer
            .read()
            .await
            .get(&freelancer)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn fee_recipient(&self) -> AccountAddress {
        *self.fee_recipient.read().await
    }

    pub async fn config(&self) -> EscrowConfig {
        self.config.read().await.clone()
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }
}

#[async_trait]
impl DisputeResolver for EscrowManager {
    async fn resolve_dispute(
        &self,
        job_id: u64,
        milestone_index: usize,
        favor_worker: bool,
    ) -> anyhow::Result<()> {
        self.apply_dispute_resolution(job_id, milestone_index, favor_worker)
            .await?;
        Ok(())
    }
}

fn timestamp(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Phase of a job that is not yet settled: a live dispute dominates, then an
/// open review, otherwise work continues.
fn job_phase(milestones: &[Milestone]) -> JobStatus {
    if milestones
        .iter()
        .any(|m| m.status == MilestoneStatus::Disputed)
    {
        JobStatus::Disputed
    } else if milestones
        .iter()
        .any(|m| m.status == MilestoneStatus::Submitted)
    {
        JobStatus::UnderReview
    } else {
        JobStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gig_economics::MemoryLedger;
    use gig_types::FixedClock;

    const START: i64 = 1_700_000_000;
    const DAY: i64 = 86_400;

    fn client() -> AccountAddress {
        AccountAddress::from_bytes([1; 32])
    }

    fn worker() -> AccountAddress {
        AccountAddress::from_bytes([2; 32])
    }

    fn treasury() -> AccountAddress {
        AccountAddress::from_bytes([3; 32])
    }

    async fn setup() -> (EscrowManager, Arc<MemoryLedger>, Arc<FixedClock>) {
        let ledger = Arc::new(MemoryLedger::new());
        ledger
            .mint(client(), TokenAmount::from_tokens(10_000.0))
            .await
            .unwrap();
        let clock = Arc::new(FixedClock::new(START));
        let reputation = Arc::new(ReputationLedger::new(clock.clone()));
        let manager = EscrowManager::new(
            EscrowConfig::default(),
            ledger.clone(),
            reputation,
            treasury(),
            clock.clone(),
            EventBus::new(),
        )
        .unwrap();
        (manager, ledger, clock)
    }

    async fn create_simple_job(manager: &EscrowManager, amounts: Vec<f64>) -> u64 {
        let n = amounts.len();
        manager
            .create_job(
                client(),
                "Build a website".to_string(),
                "ipfs://job".to_string(),
                "development".to_string(),
                (0..n).map(|i| format!("Milestone {}", i)).collect(),
                (0..n).map(|i| format!("ipfs://ms{}", i)).collect(),
                amounts.into_iter().map(TokenAmount::from_tokens).collect(),
                START + 30 * DAY,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_locks_total_plus_fee() {
        let (manager, ledger, _) = setup().await;
        create_simple_job(&manager, vec![60.0, 40.0]).await;

        // 100 total + 2.5% fee
        assert_eq!(
            ledger.balance_of(AccountAddress::custody()).await.unwrap(),
            TokenAmount::from_tokens(102.5)
        );
        assert_eq!(
            ledger.balance_of(client()).await.unwrap(),
            TokenAmount::from_tokens(9_897.5)
        );

        let job = manager.get_job(1).await.unwrap();
        assert_eq!(job.status, JobStatus::Open);
        assert_eq!(job.total_amount, TokenAmount::from_tokens(100.0));
        assert_eq!(job.platform_fee, TokenAmount::from_tokens(2.5));
        assert_eq!(manager.get_client_jobs(client()).await, vec![1]);
    }

    #[tokio::test]
    async fn test_create_validations() {
        let (manager, _, _) = setup().await;

        let empty = manager
            .create_job(
                client(),
                "Job".into(),
                "ref".into(),
                "dev".into(),
                vec![],
                vec![],
                vec![],
                START + 30 * DAY,
            )
            .await;
        assert!(matches!(empty, Err(EscrowError::NoMilestones)));

        let mismatched = manager
            .create_job(
                client(),
                "Job".into(),
                "ref".into(),
                "dev".into(),
                vec!["a".into(), "b".into()],
                vec!["ra".into(), "rb".into()],
                vec![TokenAmount::from_tokens(10.0)],
                START + 30 * DAY,
            )
            .await;
        assert!(matches!(mismatched, Err(EscrowError::MilestoneMismatch)));

        let too_many = manager
            .create_job(
                client(),
                "Job".into(),
                "ref".into(),
                "dev".into(),
                (0..11).map(|i| format!("m{}", i)).collect(),
                (0..11).map(|i| format!("r{}", i)).collect(),
                vec![TokenAmount::from_tokens(10.0); 11],
                START + 30 * DAY,
            )
            .await;
        assert!(matches!(
            too_many,
            Err(EscrowError::TooManyMilestones { got: 11, max: 10 })
        ));

        let dust = manager
            .create_job(
                client(),
                "Job".into(),
                "ref".into(),
                "dev".into(),
                vec!["m".into()],
                vec!["r".into()],
                vec![TokenAmount::from_base_units(999_999)],
                START + 30 * DAY,
            )
            .await;
        assert!(matches!(dust, Err(EscrowError::BelowMinimumAmount { .. })));

        let rushed = manager
            .create_job(
                client(),
                "Job".into(),
                "ref".into(),
                "dev".into(),
                vec!["m".into()],
                vec!["r".into()],
                vec![TokenAmount::from_tokens(10.0)],
                START + DAY - 1,
            )
            .await;
        assert!(matches!(rushed, Err(EscrowError::DeadlineTooSoon { .. })));
    }

    #[tokio::test]
    async fn test_create_with_unfunded_client_leaves_no_job() {
        let (manager, _, _) = setup().await;
        let broke = AccountAddress::from_bytes([7; 32]);

        let result = manager
            .create_job(
                broke,
                "Job".into(),
                "ref".into(),
                "dev".into(),
                vec!["m".into()],
                vec!["r".into()],
                vec![TokenAmount::from_tokens(10.0)],
                START + 30 * DAY,
            )
            .await;

        assert!(matches!(result, Err(EscrowError::TransferFailed(_))));
        assert!(manager.get_job(1).await.is_none());
        assert!(manager.get_client_jobs(broke).await.is_empty());
    }

    #[tokio::test]
    async fn test_assignment_guards() {
        let (manager, _, _) = setup().await;
        let job_id = create_simple_job(&manager, vec![10.0]).await;

        assert!(matches!(
            manager.assign_freelancer(worker(), job_id, worker()).await,
            Err(EscrowError::NotClient(_))
        ));
        assert!(matches!(
            manager.assign_freelancer(client(), job_id, client()).await,
            Err(EscrowError::SelfAssignment)
        ));
        assert!(matches!(
            manager
                .assign_freelancer(client(), job_id, AccountAddress::from_bytes([0; 32]))
                .await,
            Err(EscrowError::ZeroAddress)
        ));

        manager
            .assign_freelancer(client(), job_id, worker())
            .await
            .unwrap();
        assert_eq!(
            manager.get_job(job_id).await.unwrap().status,
            JobStatus::InProgress
        );
        assert_eq!(manager.get_freelancer_jobs(worker()).await, vec![job_id]);

        // Already assigned
        assert!(matches!(
            manager.assign_freelancer(client(), job_id, worker()).await,
            Err(EscrowError::NotOpen(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_guards() {
        let (manager, _, clock) = setup().await;
        let job_id = create_simple_job(&manager, vec![10.0]).await;

        // No freelancer yet
        assert!(matches!(
            manager
                .submit_milestone(worker(), job_id, 0, "ipfs://x".into())
                .await,
            Err(EscrowError::NotFreelancer(_))
        ));

        manager
            .assign_freelancer(client(), job_id, worker())
            .await
            .unwrap();

        assert!(matches!(
            manager.submit_milestone(worker(), job_id, 0, "".into()).await,
            Err(EscrowError::EmptyDeliverable)
        ));
        assert!(matches!(
            manager
                .submit_milestone(worker(), job_id, 5, "ipfs://x".into())
                .await,
            Err(EscrowError::MilestoneNotFound { index: 5, .. })
        ));

        manager
            .submit_milestone(worker(), job_id, 0, "ipfs://x".into())
            .await
            .unwrap();
        assert_eq!(
            manager.get_job(job_id).await.unwrap().status,
            JobStatus::UnderReview
        );

        // Double submission
        assert!(matches!(
            manager
                .submit_milestone(worker(), job_id, 0, "ipfs://y".into())
                .await,
            Err(EscrowError::CannotSubmit { .. })
        ));

        // Past the deadline no further submissions are possible
        let job_id2 = create_simple_job(&manager, vec![10.0]).await;
        manager
            .assign_freelancer(client(), job_id2, worker())
            .await
            .unwrap();
        clock.advance(31 * DAY);
        assert!(matches!(
            manager
                .submit_milestone(worker(), job_id2, 0, "ipfs://x".into())
                .await,
            Err(EscrowError::PastDeadline(_))
        ));
    }

    #[tokio::test]
    async fn test_approve_releases_and_completes() {
        let (manager, ledger, _) = setup().await;
        let job_id = create_simple_job(&manager, vec![60.0, 40.0]).await;
        manager
            .assign_freelancer(client(), job_id, worker())
            .await
            .unwrap();

        manager
            .submit_milestone(worker(), job_id, 0, "ipfs://a".into())
            .await
            .unwrap();
        manager.approve_milestone(client(), job_id, 0).await.unwrap();

        assert_eq!(
            ledger.balance_of(worker()).await.unwrap(),
            TokenAmount::from_tokens(60.0)
        );
        assert_eq!(
            manager.get_job(job_id).await.unwrap().status,
            JobStatus::InProgress
        );

        manager
            .submit_milestone(worker(), job_id, 1, "ipfs://b".into())
            .await
            .unwrap();
        manager.approve_milestone(client(), job_id, 1).await.unwrap();

        let job = manager.get_job(job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(
            ledger.balance_of(worker()).await.unwrap(),
            TokenAmount::from_tokens(100.0)
        );
        assert_eq!(
            ledger.balance_of(treasury()).await.unwrap(),
            TokenAmount::from_tokens(2.5)
        );
        assert_eq!(
            ledger.balance_of(AccountAddress::custody()).await.unwrap(),
            TokenAmount::ZERO
        );
    }

    #[tokio::test]
    async fn test_approve_requires_client_and_submission() {
        let (manager, _, _) = setup().await;
        let job_id = create_simple_job(&manager, vec![10.0]).await;
        manager
            .assign_freelancer(client(), job_id, worker())
            .await
            .unwrap();

        assert!(matches!(
            manager.approve_milestone(client(), job_id, 0).await,
            Err(EscrowError::NotSubmitted { .. })
        ));

        manager
            .submit_milestone(worker(), job_id, 0, "ipfs://a".into())
            .await
            .unwrap();
        assert!(matches!(
            manager.approve_milestone(worker(), job_id, 0).await,
            Err(EscrowError::NotClient(_))
        ));
    }

    #[tokio::test]
    async fn test_reject_and_revision_cap() {
        let (manager, _, _) = setup().await;
        let job_id = create_simple_job(&manager, vec![10.0]).await;
        manager
            .assign_freelancer(client(), job_id, worker())
            .await
            .unwrap();

        for round in 1..=3u8 {
            manager
                .submit_milestone(worker(), job_id, 0, format!("ipfs://v{}", round))
                .await
                .unwrap();
            manager.reject_milestone(client(), job_id, 0).await.unwrap();
            let milestones = manager.get_milestones(job_id).await.unwrap();
            assert_eq!(milestones[0].revision, round);
            assert_eq!(milestones[0].status, MilestoneStatus::Rejected);
        }

        manager
            .submit_milestone(worker(), job_id, 0, "ipfs://v4".into())
            .await
            .unwrap();
        assert!(matches!(
            manager.reject_milestone(client(), job_id, 0).await,
            Err(EscrowError::MaxRevisionsReached { .. })
        ));
    }

    #[tokio::test]
    async fn test_auto_approve_waits_out_grace() {
        let (manager, ledger, clock) = setup().await;
        let job_id = create_simple_job(&manager, vec![10.0]).await;
        manager
            .assign_freelancer(client(), job_id, worker())
            .await
            .unwrap();
        manager
            .submit_milestone(worker(), job_id, 0, "ipfs://a".into())
            .await
            .unwrap();

        clock.advance(7 * DAY - 1);
        assert!(matches!(
            manager.auto_approve_milestone(job_id, 0).await,
            Err(EscrowError::AutoApproveNotReady { .. })
        ));

        clock.advance(1);
        manager.auto_approve_milestone(job_id, 0).await.unwrap();
        assert_eq!(
            ledger.balance_of(worker()).await.unwrap(),
            TokenAmount::from_tokens(10.0)
        );
        assert_eq!(
            manager.get_job(job_id).await.unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_auto_approve_event_only_after_release_commits() {
        let (manager, ledger, clock) = setup().await;
        let job_id = create_simple_job(&manager, vec![10.0]).await;
        manager
            .assign_freelancer(client(), job_id, worker())
            .await
            .unwrap();
        manager
            .submit_milestone(worker(), job_id, 0, "ipfs://a".into())
            .await
            .unwrap();
        clock.advance(7 * DAY);

        // Drain custody so the release must fail
        let held = ledger
            .balance_of(AccountAddress::custody())
            .await
            .unwrap();
        let sink = AccountAddress::from_bytes([8; 32]);
        ledger
            .transfer(AccountAddress::custody(), sink, held)
            .await
            .unwrap();

        let mut rx = manager.events().subscribe();
        assert!(matches!(
            manager.auto_approve_milestone(job_id, 0).await,
            Err(EscrowError::TransferFailed(_))
        ));
        // A failed release broadcasts nothing
        assert!(rx.try_recv().is_err());

        ledger
            .transfer(sink, AccountAddress::custody(), held)
            .await
            .unwrap();
        manager.auto_approve_milestone(job_id, 0).await.unwrap();

        let mut types = Vec::new();
        while let Ok(event) = rx.try_recv() {
            types.push(event.event_type());
        }
        assert_eq!(
            types,
            vec!["milestone_approved", "job_completed", "auto_approved"]
        );
    }

    #[tokio::test]
    async fn test_cancel_refunds_everything() {
        let (manager, ledger, _) = setup().await;
        let job_id = create_simple_job(&manager, vec![60.0, 40.0]).await;

        assert!(matches!(
            manager.cancel_job(worker(), job_id).await,
            Err(EscrowError::NotClient(_))
        ));

        manager.cancel_job(client(), job_id).await.unwrap();
        assert_eq!(
            ledger.balance_of(client()).await.unwrap(),
            TokenAmount::from_tokens(10_000.0)
        );
        assert_eq!(
            ledger.balance_of(AccountAddress::custody()).await.unwrap(),
            TokenAmount::ZERO
        );
        assert_eq!(
            manager.get_job(job_id).await.unwrap().status,
            JobStatus::Cancelled
        );

        assert!(matches!(
            manager.cancel_job(client(), job_id).await,
            Err(EscrowError::CannotCancel(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_after_assignment_rejected() {
        let (manager, _, _) = setup().await;
        let job_id = create_simple_job(&manager, vec![10.0]).await;
        manager
            .assign_freelancer(client(), job_id, worker())
            .await
            .unwrap();

        assert!(matches!(
            manager.cancel_job(client(), job_id).await,
            Err(EscrowError::CannotCancel(_))
        ));
    }

    #[tokio::test]
    async fn test_pause_blocks_mutations_but_not_cancel() {
        let (manager, ledger, _) = setup().await;
        let job_id = create_simple_job(&manager, vec![10.0]).await;

        manager.pause();
        assert!(manager.is_paused());

        assert!(matches!(
            manager
                .create_job(
                    client(),
                    "Job".into(),
                    "ref".into(),
                    "dev".into(),
                    vec!["m".into()],
                    vec!["r".into()],
                    vec![TokenAmount::from_tokens(10.0)],
                    START + 30 * DAY,
                )
                .await,
            Err(EscrowError::Paused)
        ));
        assert!(matches!(
            manager.assign_freelancer(client(), job_id, worker()).await,
            Err(EscrowError::Paused)
        ));

        // Funds must never be stranded by the circuit breaker
        manager.cancel_job(client(), job_id).await.unwrap();
        assert_eq!(
            ledger.balance_of(client()).await.unwrap(),
            TokenAmount::from_tokens(10_000.0)
        );

        manager.unpause();
        assert!(!manager.is_paused());
        create_simple_job(&manager, vec![10.0]).await;
    }

    #[tokio::test]
    async fn test_admin_guards() {
        let (manager, _, _) = setup().await;

        assert!(matches!(
            manager
                .set_fee_recipient(AccountAddress::from_bytes([0; 32]))
                .await,
            Err(EscrowError::ZeroAddress)
        ));
        assert!(matches!(
            manager.set_fee_rate(10_001).await,
            Err(EscrowError::InvalidFeeRate(10_001))
        ));

        manager.set_fee_rate(500).await.unwrap();
        assert_eq!(manager.config().await.fee_bps, 500);

        let new_treasury = AccountAddress::from_bytes([9; 32]);
        manager.set_fee_recipient(new_treasury).await.unwrap();
        assert_eq!(manager.fee_recipient().await, new_treasury);
    }

    #[tokio::test]
    async fn test_fee_rate_change_applies_to_new_jobs_only() {
        let (manager, _, _) = setup().await;
        let first = create_simple_job(&manager, vec![100.0]).await;
        manager.set_fee_rate(500).await.unwrap();
        let second = create_simple_job(&manager, vec![100.0]).await;

        assert_eq!(
            manager.get_job(first).await.unwrap().platform_fee,
            TokenAmount::from_tokens(2.5)
        );
        assert_eq!(
            manager.get_job(second).await.unwrap().platform_fee,
            TokenAmount::from_tokens(5.0)
        );
    }

    #[tokio::test]
    async fn test_raise_dispute_requires_engine() {
        let (manager, _, _) = setup().await;
        let job_id = create_simple_job(&manager, vec![10.0]).await;
        manager
            .assign_freelancer(client(), job_id, worker())
            .await
            .unwrap();
        manager
            .submit_milestone(worker(), job_id, 0, "ipfs://a".into())
            .await
            .unwrap();

        assert!(matches!(
            manager.raise_dispute(client(), job_id, 0).await,
            Err(EscrowError::EngineNotConfigured)
        ));
    }
}
