use anyhow::{bail, Result};
use async_trait::async_trait;
use gig_types::{AccountAddress, TokenAmount};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// The abstract unit-of-value transfer capability the escrow core depends on.
///
/// A call either succeeds completely or fails with no movement; the outcome is
/// known before the call returns. The core never invokes it twice for the same
/// logical movement without having observed the first outcome. A partial or
/// unknown outcome must be reported as failure.
#[async_trait]
pub trait ValueTransfer: Send + Sync {
    async fn transfer(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()>;

    async fn balance_of(&self, address: AccountAddress) -> Result<TokenAmount>;
}

/// In-memory value ledger.
///
/// Used by tests and by embedders that settle balances off-platform. The
/// balance map is the single source of truth; a transfer debits and credits
/// under one write lock, so it is atomic with respect to all other calls.
pub struct MemoryLedger {
    balances: Arc<RwLock<HashMap<AccountAddress, TokenAmount>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Credit freshly minted funds to an account.
    pub async fn mint(&self, address: AccountAddress, amount: TokenAmount) -> Result<()> {
        let mut balances = self.balances.write().await;
        let current = balances.get(&address).copied().unwrap_or(TokenAmount::ZERO);
        let new_balance = current
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("Balance overflow for {}", address))?;
        balances.insert(address, new_balance);

        info!(
            address = %address,
            amount = amount.to_tokens(),
            balance_after = new_balance.to_tokens(),
            "💰 Balance minted"
        );
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValueTransfer for MemoryLedger {
    async fn transfer(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()> {
        if from == to {
            bail!("Cannot transfer to same address");
        }

        let mut balances = self.balances.write().await;

        let from_balance = balances.get(&from).copied().unwrap_or(TokenAmount::ZERO);
        if from_balance < amount {
            bail!(
                "Insufficient balance: {} has {}, needs {}",
                from,
                from_balance,
                amount
            );
        }

        let to_balance = balances.get(&to).copied().unwrap_or(TokenAmount::ZERO);
        let new_to_balance = to_balance
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("Balance overflow for recipient {}", to))?;

        balances.insert(from, from_balance.saturating_sub(amount));
        balances.insert(to, new_to_balance);

        info!(
            from = %from,
            to = %to,
            amount = amount.to_tokens(),
            "💸 Transfer executed"
        );
        Ok(())
    }

    async fn balance_of(&self, address: AccountAddress) -> Result<TokenAmount> {
        let balances = self.balances.read().await;
        Ok(balances.get(&address).copied().unwrap_or(TokenAmount::ZERO))
    }
}
