//! Keeps aggregation membership consistent with the rest of the registry.

use std::collections::{BTreeMap, BTreeSet};

/// What a reconciliation pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// `(aggregation, member)` pairs that were pruned.
    pub pruned_members: Vec<(String, String)>,
    pub removed_aggregations: Vec<String>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.pruned_members.is_empty() && self.removed_aggregations.is_empty()
    }
}

/// Removes aggregation members that do not lead to any direct application,
/// then drops aggregations left without members.
///
/// An aggregation resolves when one of its members is a direct application
/// or a resolving aggregation. Aggregations that only reference each other
/// never resolve and disappear entirely. The result is stable: running the
/// pass again changes nothing.
pub fn reconcile<V>(
    direct: &BTreeMap<String, V>,
    aggregations: &mut BTreeMap<String, Vec<String>>,
) -> ReconcileReport {
    let mut resolvable: BTreeSet<String> = BTreeSet::new();
    loop {
        let mut changed = false;
        for (name, members) in aggregations.iter() {
            if resolvable.contains(name) {
                continue;
            }
            if members
                .iter()
                .any(|m| direct.contains_key(m) || resolvable.contains(m))
            {
                resolvable.insert(name.clone());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut report = ReconcileReport::default();
    for (name, members) in aggregations.iter_mut() {
        members.retain(|member| {
            let keep = direct.contains_key(member) || resolvable.contains(member);
            if !keep {
                report.pruned_members.push((name.clone(), member.clone()));
            }
            keep
        });
    }
    aggregations.retain(|name, members| {
        if members.is_empty() {
            report.removed_aggregations.push(name.clone());
            false
        } else {
            true
        }
    });
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(names: &[&str]) -> BTreeMap<String, ()> {
        names.iter().map(|n| (n.to_string(), ())).collect()
    }

    fn aggregations(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(name, members)| {
                (
                    name.to_string(),
                    members.iter().map(|m| m.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_dangling_member_is_pruned() {
        let direct = direct(&["appA"]);
        let mut aggs = aggregations(&[("group1", &["appA", "appB"])]);
        let report = reconcile(&direct, &mut aggs);
        assert_eq!(aggs["group1"], vec!["appA"]);
        assert_eq!(report.pruned_members, vec![("group1".to_string(), "appB".to_string())]);
        assert!(report.removed_aggregations.is_empty());
    }

    #[test]
    fn test_empty_aggregation_is_removed() {
        let direct = direct(&[]);
        let mut aggs = aggregations(&[("group1", &["gone"])]);
        let report = reconcile(&direct, &mut aggs);
        assert!(aggs.is_empty());
        assert_eq!(report.removed_aggregations, vec!["group1"]);
    }

    #[test]
    fn test_chained_dangling_references_resolve_in_one_call() {
        // top -> middle -> bottom -> (missing)
        let direct = direct(&[]);
        let mut aggs = aggregations(&[
            ("top", &["middle"]),
            ("middle", &["bottom"]),
            ("bottom", &["missing"]),
        ]);
        reconcile(&direct, &mut aggs);
        assert!(aggs.is_empty());
    }

    #[test]
    fn test_cycle_without_leaf_is_dangling() {
        let direct = direct(&["app"]);
        let mut aggs = aggregations(&[
            ("x", &["y"]),
            ("y", &["x"]),
            ("kept", &["app", "x"]),
        ]);
        reconcile(&direct, &mut aggs);
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs["kept"], vec!["app"]);
    }

    #[test]
    fn test_cycle_with_leaf_is_kept() {
        let direct = direct(&["app"]);
        let mut aggs = aggregations(&[("x", &["y", "app"]), ("y", &["x"])]);
        let report = reconcile(&direct, &mut aggs);
        assert!(report.is_empty());
        assert_eq!(aggs.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let direct = direct(&["a", "b"]);
        let mut aggs = aggregations(&[
            ("g1", &["a", "zz", "g2"]),
            ("g2", &["g3"]),
            ("g3", &["g2"]),
            ("g4", &["b", "g1"]),
        ]);
        reconcile(&direct, &mut aggs);
        let once = aggs.clone();
        let report = reconcile(&direct, &mut aggs);
        assert_eq!(aggs, once);
        assert!(report.is_empty());
    }
}
