use std::fmt;

use anvil_dns_domain::DomainError;

/// An internal failure together with a rendering of the request that
/// triggered it, for diagnostics.
#[derive(Debug, Clone)]
pub struct QueryFailure {
    pub error: DomainError,
    pub request: String,
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.request)
    }
}

/// Receives internal failures (resolver errors, invalid zones, handler
/// errors, write failures). Nothing is retried; reporting is the only
/// escalation path.
pub trait Reporter: Send + Sync {
    fn report(&self, failure: QueryFailure);
}
