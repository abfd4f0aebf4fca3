use std::collections::{BTreeMap, HashSet};

use pulse_models::ApplicationEntry;
use url::Url;

/// Immutable view of both application maps. A name is a key of at most one
/// of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    pub direct: BTreeMap<String, Vec<Url>>,
    pub aggregations: BTreeMap<String, Vec<String>>,
}

impl Registry {
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.aggregations.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.direct.contains_key(name) || self.aggregations.contains_key(name)
    }

    pub fn entry(&self, name: &str) -> Option<ApplicationEntry> {
        if let Some(urls) = self.direct.get(name) {
            return Some(ApplicationEntry::Direct { urls: urls.clone() });
        }
        self.aggregations
            .get(name)
            .map(|members| ApplicationEntry::Aggregation {
                members: members.clone(),
            })
    }

    /// Direct applications reached from `name`, depth first in member order,
    /// each listed once. A direct application resolves to itself.
    pub fn resolve_direct_members(&self, name: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut resolved = Vec::new();
        self.collect_direct(name, &mut visited, &mut resolved);
        resolved
    }

    fn collect_direct(&self, name: &str, visited: &mut HashSet<String>, out: &mut Vec<String>) {
        if !visited.insert(name.to_string()) {
            return;
        }
        if self.direct.contains_key(name) {
            out.push(name.to_string());
            return;
        }
        if let Some(members) = self.aggregations.get(name) {
            for member in members {
                self.collect_direct(member, visited, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_resolve_nested_and_cyclic_aggregations() {
        let mut registry = Registry::default();
        registry.direct.insert("a".into(), vec![url("http://a/m")]);
        registry.direct.insert("b".into(), vec![url("http://b/m")]);
        registry.aggregations.insert("inner".into(), vec!["b".into(), "outer".into()]);
        registry.aggregations.insert("outer".into(), vec!["a".into(), "inner".into(), "a".into()]);

        assert_eq!(registry.resolve_direct_members("outer"), vec!["a", "b"]);
        assert_eq!(registry.resolve_direct_members("inner"), vec!["b", "a"]);
        assert_eq!(registry.resolve_direct_members("a"), vec!["a"]);
        assert!(registry.resolve_direct_members("missing").is_empty());
    }

    #[test]
    fn test_entry_is_tagged() {
        let mut registry = Registry::default();
        registry.direct.insert("a".into(), vec![url("http://a/m")]);
        registry.aggregations.insert("g".into(), vec!["a".into()]);
        assert!(registry.entry("a").unwrap().is_direct());
        assert_eq!(registry.entry("g").unwrap().members(), ["a".to_string()]);
    }
}
