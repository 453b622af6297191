use async_trait::async_trait;
use rail_shared::LedgerEvent;

/// Sink for notifications about committed ledger changes
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &LedgerEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
