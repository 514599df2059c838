//! Kahn's-algorithm topological sort (C12), shared by the UI validator's
//! acyclicity phase (§4.1 phase 4) and the script-compilation pipeline.
//!
//! Works over bare node ids plus a caller-supplied dependency lookup, so it
//! has no notion of `UiEdge` or `AlgorithmNode` itself — both callers adapt
//! their own graph shape into `(ids, deps_of)` and get back either the
//! order or the set of ids stuck in a cycle.

use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// Ids that never reached zero in-degree — the nodes in (or downstream
    /// of) the cycle. Order matches the caller's input order.
    pub remaining: Vec<String>,
}

/// Topologically sort `ids` given `deps_of(id)`, the set of ids that must
/// appear **before** `id`. References to ids outside `ids` are ignored
/// (§4.10: "cross-node references only; ignore references to nodes outside
/// the IR"). Ties among equally-ready nodes resolve in `ids`' original
/// order, so the result is deterministic for a given input (§5).
pub fn kahn_topo_sort<F>(ids: &[String], mut deps_of: F) -> Result<Vec<String>, CycleError>
where
    F: FnMut(&str) -> Vec<String>,
{
    let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();

    let mut indegree: HashMap<&str, usize> = ids.iter().map(|id| (id.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = ids.iter().map(|id| (id.as_str(), Vec::new())).collect();

    for id in ids {
        let deps = deps_of(id);
        let mut counted = HashSet::new();
        for dep in &deps {
            if !id_set.contains(dep.as_str()) || dep == id {
                continue;
            }
            if counted.insert(dep.clone()) {
                *indegree.get_mut(id.as_str()).unwrap() += 1;
            }
        }
        // Record the reverse edge using an owned copy so the dependents map
        // doesn't need to borrow from a short-lived `deps` vector.
        for dep in deps {
            if let Some(dep_id) = ids.iter().find(|x| x.as_str() == dep) {
                dependents.get_mut(dep_id.as_str()).unwrap().push(id.as_str());
            }
        }
    }

    let mut queue: VecDeque<&str> = VecDeque::new();
    for id in ids {
        if indegree[id.as_str()] == 0 {
            queue.push_back(id.as_str());
        }
    }

    let mut order: Vec<String> = Vec::with_capacity(ids.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        if let Some(next) = dependents.get(id) {
            for &dependent in next {
                let entry = indegree.get_mut(dependent).unwrap();
                *entry -= 1;
                if *entry == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if order.len() != ids.len() {
        let emitted: HashSet<&str> = order.iter().map(String::as_str).collect();
        let remaining = ids.iter().filter(|id| !emitted.contains(id.as_str())).cloned().collect();
        return Err(CycleError { remaining });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn sort_with(edges: Map<&str, Vec<&str>>, ids: &[&str]) -> Result<Vec<String>, CycleError> {
        let owned: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        kahn_topo_sort(&owned, |id| {
            edges.get(id).cloned().unwrap_or_default().into_iter().map(String::from).collect()
        })
    }

    #[test]
    fn linear_chain_sorts_in_order() {
        let mut edges = Map::new();
        edges.insert("b", vec!["a"]);
        edges.insert("c", vec!["b"]);
        let order = sort_with(edges, &["a", "b", "c"]).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn detects_cycle() {
        let mut edges = Map::new();
        edges.insert("a", vec!["b"]);
        edges.insert("b", vec!["a"]);
        let err = sort_with(edges, &["a", "b"]).unwrap_err();
        let mut remaining = err.remaining;
        remaining.sort();
        assert_eq!(remaining, vec!["a", "b"]);
    }

    #[test]
    fn ignores_references_outside_the_set() {
        let mut edges = Map::new();
        edges.insert("a", vec!["external_src"]);
        let order = sort_with(edges, &["a"]).unwrap();
        assert_eq!(order, vec!["a"]);
    }

    #[test]
    fn diamond_dependency_resolves() {
        let mut edges = Map::new();
        edges.insert("b", vec!["a"]);
        edges.insert("c", vec!["a"]);
        edges.insert("d", vec!["b", "c"]);
        let order = sort_with(edges, &["a", "b", "c", "d"]).unwrap();
        assert_eq!(order.last().unwrap(), "d");
        assert_eq!(order[0], "a");
    }
}
