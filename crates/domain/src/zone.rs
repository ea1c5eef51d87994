use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::DomainError;
use crate::name::is_domain;
use crate::record_set::RecordSet;
use crate::record_type::RecordType;

const DEFAULT_REFRESH: Duration = Duration::from_secs(6 * 3600);
const DEFAULT_RETRY: Duration = Duration::from_secs(3600);
const DEFAULT_EXPIRE: Duration = Duration::from_secs(72 * 3600);
const DEFAULT_SOA_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_NS_TTL: Duration = Duration::from_secs(48 * 3600);
const DEFAULT_MIN_TTL: Duration = Duration::from_secs(5 * 60);

/// Record storage callback for a zone. The server asks it for record sets on
/// every query and never retains what it returns.
#[async_trait]
pub trait RecordHandler: Send + Sync {
    /// Returns the record sets at `name`. `Some(rtype)` asks for sets
    /// relevant to one type; implementations are free to return every set at
    /// the name, the lookup engine filters either way. `None` is the untyped
    /// existence probe used to tell NODATA from NXDOMAIN.
    ///
    /// When `name` falls below a delegation point, implementations should
    /// return the covering NS set (owned by the delegation ancestor) so the
    /// query can be answered with a referral.
    async fn lookup(
        &self,
        rtype: Option<RecordType>,
        name: &str,
    ) -> Result<Vec<RecordSet>, DomainError>;
}

/// A single authoritative zone. Constructed by the application's zone
/// resolver per query, validated by the server, then dropped.
#[derive(Clone)]
pub struct Zone {
    /// The FQDN of the zone apex, e.g. `example.com.`.
    pub name: String,

    /// The FQDN of the primary name server. The parent zone must expose it
    /// as A and AAAA records.
    pub master_name_server: String,

    /// The FQDNs of all authoritative name servers for this zone.
    pub all_name_servers: Vec<String>,

    /// The administrator mailbox, e.g. `hostmaster@example.com.`.
    ///
    /// Default: `hostmaster@<name>`.
    pub admin_email: String,

    /// SOA refresh interval. Default: 6h.
    pub refresh: Duration,

    /// SOA retry interval. Default: 1h.
    pub retry: Duration,

    /// SOA expire interval. Default: 72h.
    pub expire: Duration,

    /// TTL of the synthesized SOA record. Default: 15m.
    pub soa_ttl: Duration,

    /// TTL of NS records. Default: 48h.
    pub ns_ttl: Duration,

    /// Floor for set TTLs, and the SOA MINIMUM governing negative caching.
    /// Default: 5m.
    pub min_ttl: Duration,

    /// The record storage behind this zone.
    pub handler: Arc<dyn RecordHandler>,
}

impl Zone {
    /// Creates a zone with all optional fields unset; `validate` fills in
    /// the documented defaults.
    pub fn new(
        name: impl Into<String>,
        master_name_server: impl Into<String>,
        all_name_servers: Vec<String>,
        handler: Arc<dyn RecordHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            master_name_server: master_name_server.into(),
            all_name_servers,
            admin_email: String::new(),
            refresh: Duration::ZERO,
            retry: Duration::ZERO,
            expire: Duration::ZERO,
            soa_ttl: Duration::ZERO,
            ns_ttl: Duration::ZERO,
            min_ttl: Duration::ZERO,
            handler,
        }
    }

    /// Applies the documented defaults, then enforces the SOA timer
    /// invariants. A zone failing validation is unusable for the query that
    /// produced it.
    pub fn validate(&mut self) -> Result<(), DomainError> {
        if !is_domain(&self.name, true) {
            return Err(DomainError::InvalidZone("name not fully qualified".to_string()));
        }

        if !is_domain(&self.master_name_server, true) {
            return Err(DomainError::InvalidZone(
                "master name server not fully qualified".to_string(),
            ));
        }

        if self.all_name_servers.is_empty() {
            return Err(DomainError::InvalidZone("missing name servers".to_string()));
        }

        for ns in &self.all_name_servers {
            if !is_domain(ns, true) {
                return Err(DomainError::InvalidZone(format!(
                    "name server not fully qualified: {}",
                    ns
                )));
            }
        }

        if self.admin_email.is_empty() {
            self.admin_email = format!("hostmaster@{}", self.name);
        }

        if self.refresh.is_zero() {
            self.refresh = DEFAULT_REFRESH;
        }

        if self.retry.is_zero() {
            self.retry = DEFAULT_RETRY;
        }

        if self.expire.is_zero() {
            self.expire = DEFAULT_EXPIRE;
        }

        if self.soa_ttl.is_zero() {
            self.soa_ttl = DEFAULT_SOA_TTL;
        }

        if self.ns_ttl.is_zero() {
            self.ns_ttl = DEFAULT_NS_TTL;
        }

        if self.min_ttl.is_zero() {
            self.min_ttl = DEFAULT_MIN_TTL;
        }

        if self.retry >= self.refresh {
            return Err(DomainError::InvalidZone(
                "retry must be less than refresh".to_string(),
            ));
        }

        if self.expire < self.refresh + self.retry {
            return Err(DomainError::InvalidZone(
                "expire must be at least refresh plus retry".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zone")
            .field("name", &self.name)
            .field("master_name_server", &self.master_name_server)
            .field("all_name_servers", &self.all_name_servers)
            .field("admin_email", &self.admin_email)
            .field("refresh", &self.refresh)
            .field("retry", &self.retry)
            .field("expire", &self.expire)
            .field("soa_ttl", &self.soa_ttl)
            .field("ns_ttl", &self.ns_ttl)
            .field("min_ttl", &self.min_ttl)
            .finish_non_exhaustive()
    }
}
