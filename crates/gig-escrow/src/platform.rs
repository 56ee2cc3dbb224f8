//! One-stop wiring of the full platform.
//!
//! The escrow manager and dispute engine reference each other through narrow
//! capabilities (`DisputeResolver` one way, the engine handle the other), so
//! construction happens in two phases. [`GigPlatform`] does that wiring once
//! and hands out the assembled components.

use crate::error::Result;
use crate::escrow::EscrowManager;
use crate::types::EscrowConfig;
use gig_dispute::{ArbitratorRegistry, DisputeConfig, DisputeEngine};
use gig_economics::ValueTransfer;
use gig_reputation::ReputationLedger;
use gig_types::{AccountAddress, Clock, EventBus};
use std::sync::Arc;
use tracing::info;

pub struct GigPlatform {
    pub escrow: Arc<EscrowManager>,
    pub disputes: Arc<DisputeEngine>,
    pub arbitrators: Arc<ArbitratorRegistry>,
    pub reputation: Arc<ReputationLedger>,
    pub events: EventBus,
}

impl GigPlatform {
    pub async fn new(
        ledger: Arc<dyn ValueTransfer>,
        fee_recipient: AccountAddress,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::with_config(
            EscrowConfig::default(),
            DisputeConfig::default(),
            ledger,
            fee_recipient,
            clock,
        )
        .await
    }

    pub async fn with_config(
        escrow_config: EscrowConfig,
        dispute_config: DisputeConfig,
        ledger: Arc<dyn ValueTransfer>,
        fee_recipient: AccountAddress,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let events = EventBus::new();
        let arbitrators = Arc::new(ArbitratorRegistry::new());
        let reputation = Arc::new(ReputationLedger::new(clock.clone()));

        let disputes = Arc::new(DisputeEngine::new(
            dispute_config,
            arbitrators.clone(),
            clock.clone(),
            events.clone(),
        ));
        let escrow = Arc::new(EscrowManager::new(
            escrow_config,
            ledger,
            reputation.clone(),
            fee_recipient,
            clock,
            events.clone(),
        )?);

        disputes.set_resolver(escrow.clone()).await;
        escrow.set_dispute_engine(disputes.clone()).await;

        info!("GigLedger platform assembled");
        Ok(Self {
            escrow,
            disputes,
            arbitrators,
            reputation,
            events,
        })
    }
}
