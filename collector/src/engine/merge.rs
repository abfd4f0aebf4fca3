//! Combining node and application snapshots.
//!
//! Counters are summed by name. Gauges are not additive, so they stay
//! separate per node, keyed by the node URL.

use chrono::{DateTime, Utc};
use pulse_models::{ApplicationSnapshot, MetricsSnapshot};

pub fn merge_nodes<'a, I>(application: &str, nodes: I, collected_at: DateTime<Utc>) -> ApplicationSnapshot
where
    I: IntoIterator<Item = (&'a str, &'a MetricsSnapshot)>,
{
    let mut merged = ApplicationSnapshot::empty(application, collected_at);
    for (node, snapshot) in nodes {
        merged.node_count += 1;
        for (name, stats) in &snapshot.counters {
            merged.counters.entry(name.clone()).or_default().combine(stats);
        }
        if !snapshot.gauges.is_empty() {
            merged
                .gauges
                .entry(node.to_string())
                .or_default()
                .extend(snapshot.gauges.iter().map(|(k, v)| (k.clone(), *v)));
        }
    }
    merged
}

/// Merges member snapshots into one view named `application`.
pub fn merge_applications<'a, I>(application: &str, members: I) -> Option<ApplicationSnapshot>
where
    I: IntoIterator<Item = &'a ApplicationSnapshot>,
{
    let mut merged: Option<ApplicationSnapshot> = None;
    for member in members {
        let target = merged.get_or_insert_with(|| ApplicationSnapshot::empty(application, member.collected_at));
        target.node_count += member.node_count;
        target.collected_at = target.collected_at.max(member.collected_at);
        for (name, stats) in &member.counters {
            target.counters.entry(name.clone()).or_default().combine(stats);
        }
        for (node, gauges) in &member.gauges {
            target
                .gauges
                .entry(node.clone())
                .or_default()
                .extend(gauges.iter().map(|(k, v)| (k.clone(), *v)));
        }
    }
    merged
}

/// Drops counters the predicate hides.
pub fn filter_counters<F>(mut snapshot: ApplicationSnapshot, hidden: F) -> ApplicationSnapshot
where
    F: Fn(&str) -> bool,
{
    snapshot.counters.retain(|name, _| !hidden(name));
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_models::CounterStats;

    fn node(counters: &[(&str, u64)], gauges: &[(&str, f64)]) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: counters
                .iter()
                .map(|(n, hits)| {
                    (
                        n.to_string(),
                        CounterStats { hits: *hits, errors: 1, duration_millis: hits * 10 },
                    )
                })
                .collect(),
            gauges: gauges.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_counters_sum_and_gauges_stay_per_node() {
        let a = node(&[("http", 2), ("sql", 1)], &[("heap", 0.5)]);
        let b = node(&[("http", 3)], &[("heap", 0.7)]);
        let now = Utc::now();
        let merged = merge_nodes("app", [("n1", &a), ("n2", &b)], now);

        assert_eq!(merged.node_count, 2);
        assert_eq!(merged.counters["http"], CounterStats { hits: 5, errors: 2, duration_millis: 50 });
        assert_eq!(merged.counters["sql"].hits, 1);
        assert_eq!(merged.gauges["n1"]["heap"], 0.5);
        assert_eq!(merged.gauges["n2"]["heap"], 0.7);
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let a = node(&[("http", 2)], &[("cpu", 1.0)]);
        let b = node(&[("http", 4), ("jobs", 1)], &[]);
        let c = node(&[("jobs", 2)], &[("cpu", 3.0)]);
        let now = Utc::now();
        let forward = merge_nodes("app", [("a", &a), ("b", &b), ("c", &c)], now);
        let backward = merge_nodes("app", [("c", &c), ("b", &b), ("a", &a)], now);
        assert_eq!(forward, backward);

        let left = merge_nodes("app", [("a", &a), ("b", &b)], now);
        let right = merge_nodes("app", [("c", &c)], now);
        let grouped = merge_applications("app", [&left, &right]).unwrap();
        assert_eq!(grouped, forward);
    }

    #[test]
    fn test_hidden_counters_are_filtered() {
        let merged = merge_nodes("app", [("n", &node(&[("http", 1), ("sql", 1)], &[]))], Utc::now());
        let filtered = filter_counters(merged, |name| !name.eq_ignore_ascii_case("HTTP"));
        assert_eq!(filtered.counters.keys().collect::<Vec<_>>(), vec!["http"]);
    }

    #[test]
    fn test_no_members_is_none() {
        let empty: [&ApplicationSnapshot; 0] = [];
        assert!(merge_applications("g", empty).is_none());
    }
}
