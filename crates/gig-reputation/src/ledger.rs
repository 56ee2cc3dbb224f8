//! Append-only credential ledger.
//!
//! One credential per completed job, written by the job ledger at the moment
//! the job reaches Completed. Credentials expose no transfer operation at
//! all; non-transferability holds by construction for the life of the record.

use crate::error::{ReputationError, Result};
use gig_types::{AccountAddress, Clock, SequenceAllocator, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Non-transferable record of one completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub token_id: u64,
    pub job_id: u64,
    pub client: AccountAddress,
    pub worker: AccountAddress,
    pub job_title: String,
    pub category: String,
    pub amount_earned: TokenAmount,
    pub issued_at: i64,
    /// 1-5 once set; meaningless while `rating_set` is false.
    pub rating: u8,
    pub rating_set: bool,
}

#[derive(Default)]
struct ReputationState {
    credentials: HashMap<u64, Credential>,
    job_to_token: HashMap<u64, u64>,
    tokens_by_worker: HashMap<AccountAddress, Vec<u64>>,
    completed_jobs: HashMap<AccountAddress, u64>,
    total_earned: HashMap<AccountAddress, TokenAmount>,
}

/// Credential ledger. Writes come only from the job ledger; all reads are
/// side-effect-free.
pub struct ReputationLedger {
    state: Arc<RwLock<ReputationState>>,
    ids: SequenceAllocator,
    clock: Arc<dyn Clock>,
}

impl ReputationLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ReputationState::default())),
            ids: SequenceAllocator::new(),
            clock,
        }
    }

    /// Append a credential for a completed job. Invoked by the job ledger,
    /// exactly once per job id.
    pub async fn issue_credential(
        &self,
        worker: AccountAddress,
        client: AccountAddress,
        job_id: u64,
        job_title: String,
        amount_earned: TokenAmount,
        category: String,
    ) -> Result<u64> {
        if worker.is_zero() || client.is_zero() {
            return Err(ReputationError::ZeroAddress);
        }

        let mut state = self.state.write().await;
        if state.job_to_token.contains_key(&job_id) {
            return Err(ReputationError::AlreadyIssued(job_id));
        }

        let token_id = self.ids.next_id();
        let credential = Credential {
            token_id,
            job_id,
            client,
            worker,
            job_title,
            category,
            amount_earned,
            issued_at: self.clock.now(),
            rating: 0,
            rating_set: false,
        };

        state.credentials.insert(token_id, credential);
        state.job_to_token.insert(job_id, token_id);
        state
            .tokens_by_worker
            .entry(worker)
            .or_default()
            .push(token_id);
        *state.completed_jobs.entry(worker).or_insert(0) += 1;
        let earned = state
            .total_earned
            .entry(worker)
            .or_insert(TokenAmount::ZERO);
        *earned = earned.saturating_add(amount_earned);

        info!(
            token_id,
            job_id,
            worker = %worker,
            amount_earned = amount_earned.to_tokens(),
            "🏅 Credential issued"
        );
        Ok(token_id)
    }

    /// Rate a completed job, 1-5. Only the credential's recorded client may
    /// rate, and only once.
    pub async fn set_rating(
        &self,
        caller: AccountAddress,
        job_id: u64,
        rating: u8,
    ) -> Result<()> {
        if !(1..=5).contains(&rating) {
            return Err(ReputationError::InvalidRating(rating));
        }

        let mut state = self.state.write().await;
        let token_id = *state
            .job_to_token
            .get(&job_id)
            .ok_or(ReputationError::NoCredentialForJob(job_id))?;
        let credential = state
            .credentials
            .get_mut(&token_id)
            .ok_or(ReputationError::NoCredentialForJob(job_id))?;

        if credential.client != caller {
            return Err(ReputationError::NotClient(job_id));
        }
        if credential.rating_set {
            return Err(ReputationError::AlreadyRated(job_id));
        }

        credential.rating = rating;
        credential.rating_set = true;

        info!(job_id, token_id, rating, "⭐ Rating set");
        Ok(())
    }

    /// Reputation score: simple mean of rating x 100 over rated credentials.
    /// One job rated 4 scores 400; jobs rated 5 and 3 score 400. Unrated
    /// credentials do not count, and a worker with none scores 0.
    pub async fn reputation_score(&self, worker: AccountAddress) -> u64 {
        let state = self.state.read().await;
        let tokens = match state.tokens_by_worker.get(&worker) {
            Some(tokens) => tokens,
            None => return 0,
        };

        let mut sum = 0u64;
        let mut rated = 0u64;
        for token_id in tokens {
            if let Some(credential) = state.credentials.get(token_id) {
                if credential.rating_set {
                    sum += credential.rating as u64 * 100;
                    rated += 1;
                }
            }
        }
        if rated == 0 {
            0
        } else {
            sum / rated
        }
    }

    pub async fn get_credentials(&self, worker: AccountAddress) -> Vec<Credential> {
        let state = self.state.read().await;
        state
            .tokens_by_worker
            .get(&worker)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(|id| state.credentials.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn get_worker_tokens(&self, worker: AccountAddress) -> Vec<u64> {
        let state = self.state.read().await;
        state
            .tokens_by_worker
            .get(&worker)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn token_for_job(&self, job_id: u64) -> Option<u64> {
        self.state.read().await.job_to_token.get(&job_id).copied()
    }

    pub async fn completed_jobs(&self, worker: AccountAddress) -> u64 {
        self.state
            .read()
            .await
            .completed_jobs
            .get(&worker)
            .copied()
            .unwrap_or(0)
    }

    pub async fn total_earned(&self, worker: AccountAddress) -> TokenAmount {
        self.state
            .read()
            .await
            .total_earned
            .get(&worker)
            .copied()
            .unwrap_or(TokenAmount::ZERO)
    }
}
