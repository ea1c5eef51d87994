use anvil_dns_domain::{DomainError, Zone};
use async_trait::async_trait;

/// Maps a query name to the zone serving it. Supplied by the embedding
/// application; called once per accepted query with the lowercased name.
#[async_trait]
pub trait ZoneResolver: Send + Sync {
    /// Returns the zone authoritative for `name`, or `None` when this
    /// server does not serve the name (the query is refused).
    async fn resolve(&self, name: &str) -> Result<Option<Zone>, DomainError>;
}
