use std::collections::HashSet;

use anvil_dns_domain::name::{in_zone, parent};
use anvil_dns_domain::{DomainError, Record, RecordSet, RecordType, Zone};
use tracing::debug;

/// Upper bound on CNAME chase iterations. Chains longer than this (and
/// cycles) terminate with the partial chain collected so far.
const CHASE_LIMIT: usize = 16;

/// A record set resolved for a query, carrying the owner name to answer
/// with. After wildcard expansion the owner is the queried name while the
/// set keeps its `*.parent` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSet {
    pub owner: String,
    pub set: RecordSet,
}

/// A delegation below the apex: the NS set for the authority section and
/// glue addresses for in-zone name-server targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referral {
    pub ns: ResolvedSet,
    pub glue: Vec<ResolvedSet>,
}

/// The outcome of a lookup. `other_types` is meaningful only when `answers`
/// is empty and no referral applies: it distinguishes NODATA (the name
/// exists with other types) from NXDOMAIN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    pub answers: Vec<ResolvedSet>,
    pub referral: Option<Referral>,
    pub other_types: bool,
}

/// Resolves `(name, qtypes)` within a single validated zone: direct match,
/// delegation detection, wildcard expansion, CNAME chasing and the NODATA
/// probe, in that order.
#[derive(Debug, Default)]
pub struct LookupRecordsUseCase;

impl LookupRecordsUseCase {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(
        &self,
        zone: &Zone,
        name: &str,
        qtypes: &[RecordType],
    ) -> Result<Lookup, DomainError> {
        let mut lookup = Lookup::default();

        if qtypes.is_empty() || !in_zone(&zone.name, name) {
            return Ok(lookup);
        }

        let want_cname = qtypes.contains(&RecordType::CNAME);
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = name.to_ascii_lowercase();

        for _ in 0..CHASE_LIMIT {
            if !visited.insert(current.clone()) {
                debug!(name = %current, "CNAME cycle detected, returning partial chain");
                break;
            }

            let mut found = self.collect_sets(zone, &current, qtypes).await?;

            // a non-apex NS set turns the query into a referral
            if let Some(ns_set) = found
                .iter()
                .find(|s| s.rtype == RecordType::NS && !s.name.eq_ignore_ascii_case(&zone.name))
            {
                let glue = self.resolve_glue(zone, ns_set).await?;
                lookup.referral = Some(Referral {
                    ns: ResolvedSet {
                        owner: ns_set.name.clone(),
                        set: ns_set.clone(),
                    },
                    glue,
                });
                return Ok(lookup);
            }

            if found.is_empty()
                && !current.eq_ignore_ascii_case(&zone.name)
                && zone.handler.lookup(None, &current).await?.is_empty()
            {
                found = self.wildcard_sets(zone, &current, qtypes).await?;
            }

            if !want_cname {
                if let Some(cname_set) = found.iter().find(|s| s.rtype == RecordType::CNAME) {
                    let target = match cname_set.records.first() {
                        Some(Record::CNAME(target)) => target.clone(),
                        _ => break,
                    };

                    lookup.answers.push(ResolvedSet {
                        owner: current.clone(),
                        set: cname_set.clone(),
                    });

                    if !in_zone(&zone.name, &target) {
                        // out-of-zone target, the client's resolver chases on
                        return Ok(lookup);
                    }

                    current = target.to_ascii_lowercase();
                    continue;
                }
            }

            for qtype in qtypes {
                for set in found.iter().filter(|s| s.rtype == *qtype) {
                    lookup.answers.push(ResolvedSet {
                        owner: current.clone(),
                        set: set.clone(),
                    });
                }
            }

            break;
        }

        if lookup.answers.is_empty() {
            let probe = zone.handler.lookup(None, name).await?;
            lookup.other_types = !probe.is_empty();
        }

        Ok(lookup)
    }

    /// Asks the handler for sets at `name` for each requested type, then
    /// validates and filters what comes back. Kept sets either match a
    /// requested type, carry a CNAME, or delegate via NS; everything else
    /// the handler volunteered is dropped. Sets must be owned by the
    /// queried name, except NS sets owned by an ancestor delegation point.
    async fn collect_sets(
        &self,
        zone: &Zone,
        name: &str,
        qtypes: &[RecordType],
    ) -> Result<Vec<RecordSet>, DomainError> {
        let mut sets: Vec<RecordSet> = Vec::new();
        let mut seen: HashSet<(String, RecordType)> = HashSet::new();

        for qtype in qtypes {
            for mut set in zone.handler.lookup(Some(*qtype), name).await? {
                set.validate()?;

                if !owner_matches(zone, name, &set) {
                    return Err(DomainError::InvalidSet(format!(
                        "set {} does not match name {}",
                        set.name, name
                    )));
                }

                let relevant = qtypes.contains(&set.rtype)
                    || set.rtype == RecordType::CNAME
                    || set.rtype == RecordType::NS;
                if !relevant {
                    continue;
                }

                if seen.insert((set.name.to_ascii_lowercase(), set.rtype)) {
                    sets.push(set);
                }
            }
        }

        Ok(sets)
    }

    /// Walks the ancestors of `name` up to the apex, probing `*.<parent>`
    /// at each level. The first wildcard with sets wins.
    async fn wildcard_sets(
        &self,
        zone: &Zone,
        name: &str,
        qtypes: &[RecordType],
    ) -> Result<Vec<RecordSet>, DomainError> {
        let mut ancestor = parent(name);

        while let Some(candidate) = ancestor {
            if !in_zone(&zone.name, candidate) {
                break;
            }

            let wildcard = format!("*.{}", candidate);
            let sets = self.collect_sets(zone, &wildcard, qtypes).await?;
            if !sets.is_empty() {
                return Ok(sets);
            }

            if candidate.eq_ignore_ascii_case(&zone.name) {
                break;
            }
            ancestor = parent(candidate);
        }

        Ok(Vec::new())
    }

    /// Resolves A/AAAA glue for the in-zone targets of a delegation NS set.
    async fn resolve_glue(
        &self,
        zone: &Zone,
        ns_set: &RecordSet,
    ) -> Result<Vec<ResolvedSet>, DomainError> {
        let mut glue = Vec::new();

        for record in &ns_set.records {
            let Record::NS(target) = record else { continue };
            if !in_zone(&zone.name, target) {
                continue;
            }

            let sets = self
                .collect_sets(
                    zone,
                    &target.to_ascii_lowercase(),
                    &[RecordType::A, RecordType::AAAA],
                )
                .await?;

            for set in sets
                .into_iter()
                .filter(|s| matches!(s.rtype, RecordType::A | RecordType::AAAA))
            {
                glue.push(ResolvedSet {
                    owner: set.name.clone(),
                    set,
                });
            }
        }

        Ok(glue)
    }
}

fn owner_matches(zone: &Zone, queried: &str, set: &RecordSet) -> bool {
    if set.name.eq_ignore_ascii_case(queried) {
        return true;
    }

    // delegation NS sets are owned by an ancestor of the queried name
    set.rtype == RecordType::NS && in_zone(&zone.name, &set.name) && in_zone(&set.name, queried)
}
