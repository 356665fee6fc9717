//! Duplicate counting and keep-set ranking over a Network Data snapshot.
//!
//! Everything here is a pure function of one snapshot, the local RLOC16 and
//! the local record, so repeated evaluations of an unchanged snapshot always
//! reach the same decision.

use netdata_types::{NetworkDataRecord, NetworkDataSnapshot, Rloc16, RoutePreference};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Outcome of evaluating one local record against a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// Equivalent entries contributed by other nodes.
    pub observed_count: usize,
    /// Whether the local node ranks among the `desired` best contributors.
    pub in_keep_set: bool,
}

/// Rank of a contributor; smaller sorts first and is kept first.
///
/// Prefix kinds rank by route preference (high first), then by RLOC16
/// (numerically lower first). DNS/SRP entries rank by RLOC16 only.
type Rank = (Reverse<RoutePreference>, Rloc16);

fn rank(owner: Rloc16, record: &NetworkDataRecord) -> Rank {
    let preference = match record {
        NetworkDataRecord::OnMeshPrefix(config) => config.preference,
        NetworkDataRecord::ExternalRoute(config) => config.preference,
        NetworkDataRecord::DnsSrpService(_) => RoutePreference::Medium,
    };
    (Reverse(preference), owner)
}

/// Best rank of every other node contributing an entry equivalent to `local`.
///
/// A node with several equivalent entries counts once.
fn other_contributors(
    snapshot: &NetworkDataSnapshot,
    local_rloc16: Rloc16,
    local: &NetworkDataRecord,
) -> BTreeMap<Rloc16, Rank> {
    let mut contributors: BTreeMap<Rloc16, Rank> = BTreeMap::new();
    for entry in snapshot.iter() {
        if entry.owner == local_rloc16
            || !entry.record.is_stable()
            || !local.is_equivalent(&entry.record)
        {
            continue;
        }
        let candidate = rank(entry.owner, &entry.record);
        contributors
            .entry(entry.owner)
            .and_modify(|best| *best = (*best).min(candidate))
            .or_insert(candidate);
    }
    contributors
}

/// Number of other nodes with an entry equivalent to `local`.
pub fn count_duplicates(
    snapshot: &NetworkDataSnapshot,
    local_rloc16: Rloc16,
    local: &NetworkDataRecord,
) -> usize {
    other_contributors(snapshot, local_rloc16, local).len()
}

/// Evaluate `local` against `snapshot` for a redundancy target of `desired`.
pub fn evaluate(
    snapshot: &NetworkDataSnapshot,
    local_rloc16: Rloc16,
    local: &NetworkDataRecord,
    desired: usize,
) -> Evaluation {
    let others = other_contributors(snapshot, local_rloc16, local);
    let own_rank = rank(local_rloc16, local);
    let ranked_above = others.values().filter(|r| **r < own_rank).count();

    Evaluation {
        observed_count: others.len(),
        in_keep_set: ranked_above < desired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdata_types::{
        DnsSrpServiceEntry, ExternalRouteConfig, NetworkDataEntry, OnMeshPrefixConfig,
    };

    fn on_mesh(flags: &str) -> NetworkDataRecord {
        NetworkDataRecord::OnMeshPrefix(
            OnMeshPrefixConfig::new("2001:db8:1::/64".parse().unwrap())
                .with_flags(flags)
                .unwrap(),
        )
    }

    fn route(preference: RoutePreference) -> NetworkDataRecord {
        NetworkDataRecord::ExternalRoute(
            ExternalRouteConfig::new("fd00:abcd::/48".parse().unwrap()).with_preference(preference),
        )
    }

    fn snapshot(entries: &[(u16, NetworkDataRecord)]) -> NetworkDataSnapshot {
        entries
            .iter()
            .map(|(owner, record)| NetworkDataEntry::new(Rloc16(*owner), *record))
            .collect()
    }

    #[test]
    fn test_local_copy_excluded() {
        let local = on_mesh("paos");
        let snap = snapshot(&[(0x0800, local), (0x0400, local)]);
        assert_eq!(count_duplicates(&snap, Rloc16(0x0800), &local), 1);
    }

    #[test]
    fn test_flags_must_match() {
        let local = on_mesh("paos");
        let snap = snapshot(&[(0x0400, on_mesh("pos")), (0x0c00, on_mesh("paos"))]);
        assert_eq!(count_duplicates(&snap, Rloc16(0x0800), &local), 1);
    }

    #[test]
    fn test_non_stable_entries_ignored() {
        let local = on_mesh("paos");
        let snap = snapshot(&[(0x0400, on_mesh("pao"))]);
        assert_eq!(count_duplicates(&snap, Rloc16(0x0800), &local), 0);
    }

    #[test]
    fn test_owner_counted_once() {
        let local = on_mesh("paos");
        let snap = snapshot(&[(0x0400, local), (0x0400, local)]);
        assert_eq!(count_duplicates(&snap, Rloc16(0x0800), &local), 1);
    }

    #[test]
    fn test_keep_set_by_rloc16() {
        let local = on_mesh("paos");
        let snap = snapshot(&[(0x0400, local), (0x0c00, local)]);

        // 0x0800 sits between the two others: kept with desired = 2.
        let eval = evaluate(&snap, Rloc16(0x0800), &local, 2);
        assert_eq!(eval.observed_count, 2);
        assert!(eval.in_keep_set);

        // 0x1000 ranks last.
        let eval = evaluate(&snap, Rloc16(0x1000), &local, 2);
        assert!(!eval.in_keep_set);
    }

    #[test]
    fn test_preference_outranks_rloc16() {
        let local = route(RoutePreference::High);
        let snap = snapshot(&[
            (0x0400, route(RoutePreference::Medium)),
            (0x0800, route(RoutePreference::Low)),
        ]);

        let eval = evaluate(&snap, Rloc16(0x2000), &local, 1);
        assert_eq!(eval.observed_count, 2);
        assert!(eval.in_keep_set);
    }

    #[test]
    fn test_dns_srp_categories() {
        let local = NetworkDataRecord::DnsSrpService(DnsSrpServiceEntry::Unicast {
            address: "fd00::1".parse().unwrap(),
            port: 53,
        });
        let snap = snapshot(&[
            (
                0x0400,
                NetworkDataRecord::DnsSrpService(DnsSrpServiceEntry::UnicastMeshLocalEid {
                    port: 5353,
                }),
            ),
            (
                0x0c00,
                NetworkDataRecord::DnsSrpService(DnsSrpServiceEntry::Anycast {
                    sequence_number: 1,
                }),
            ),
        ]);

        let eval = evaluate(&snap, Rloc16(0x0800), &local, 1);
        assert_eq!(eval.observed_count, 1);
        assert!(!eval.in_keep_set);
    }
}
