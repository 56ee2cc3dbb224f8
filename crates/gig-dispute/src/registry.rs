use crate::error::{DisputeError, Result};
use gig_types::AccountAddress;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Maintained set of eligible arbitrator identities.
///
/// Panel selection draws from this set without replacement within a single
/// dispute. Insertion order is kept so selection indexes stay stable for a
/// given seed.
pub struct ArbitratorRegistry {
    arbitrators: Arc<RwLock<Vec<AccountAddress>>>,
}

impl ArbitratorRegistry {
    pub fn new() -> Self {
        Self {
            arbitrators: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn add_arbitrator(&self, identity: AccountAddress) -> Result<()> {
        if identity.is_zero() {
            return Err(DisputeError::ZeroAddress);
        }

        let mut arbitrators = self.arbitrators.write().await;
        if arbitrators.contains(&identity) {
            return Err(DisputeError::AlreadyArbitrator(identity.to_string()));
        }
        arbitrators.push(identity);

        info!(
            arbitrator = %identity,
            pool_size = arbitrators.len(),
            "⚖️ Arbitrator registered"
        );
        Ok(())
    }

    pub async fn is_arbitrator(&self, identity: &AccountAddress) -> bool {
        self.arbitrators.read().await.contains(identity)
    }

    pub async fn count(&self) -> usize {
        self.arbitrators.read().await.len()
    }

    /// Current eligible pool, in registration order.
    pub async fn snapshot(&self) -> Vec<AccountAddress> {
        self.arbitrators.read().await.clone()
    }
}

impl Default for ArbitratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_query() {
        let registry = ArbitratorRegistry::new();
        let arb = AccountAddress::from_bytes([1; 32]);

        registry.add_arbitrator(arb).await.unwrap();
        assert!(registry.is_arbitrator(&arb).await);
        assert_eq!(registry.count().await, 1);
        assert_eq!(registry.snapshot().await, vec![arb]);
    }

    #[tokio::test]
    async fn test_rejects_duplicate() {
        let registry = ArbitratorRegistry::new();
        let arb = AccountAddress::from_bytes([2; 32]);

        registry.add_arbitrator(arb).await.unwrap();
        assert!(matches!(
            registry.add_arbitrator(arb).await,
            Err(DisputeError::AlreadyArbitrator(_))
        ));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_rejects_zero_identity() {
        let registry = ArbitratorRegistry::new();
        assert!(matches!(
            registry
                .add_arbitrator(AccountAddress::from_bytes([0; 32]))
                .await,
            Err(DisputeError::ZeroAddress)
        ));
    }
}
