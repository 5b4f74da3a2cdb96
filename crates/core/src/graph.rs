#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

/// Scans the dependency graph for cycles.
///
/// `deps` maps a task id to the ids it is blocked by (edge A -> B means "B
/// must complete before A"). Every node is visited exactly once across DFS
/// roots; a per-path recursion stack catches back edges, so diamond-shaped
/// graphs are never flagged. Each back edge is reported as one cycle of the
/// form `[start, .., current, start]`, and the scan keeps going after a hit
/// so every distinct cycle in the graph is returned.
pub fn find_cycles(deps: &BTreeMap<String, Vec<String>>) -> Vec<Vec<String>> {
    let mut cycles = Vec::new();
    let mut visited = BTreeSet::new();
    let mut stack = BTreeSet::new();
    let mut path = Vec::new();

    for node in deps.keys() {
        if !visited.contains(node.as_str()) {
            walk(node, deps, &mut visited, &mut stack, &mut path, &mut cycles);
        }
    }

    cycles
}

fn walk(
    node: &str,
    deps: &BTreeMap<String, Vec<String>>,
    visited: &mut BTreeSet<String>,
    stack: &mut BTreeSet<String>,
    path: &mut Vec<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    visited.insert(node.to_string());
    stack.insert(node.to_string());
    path.push(node.to_string());

    for dep in deps.get(node).map(Vec::as_slice).unwrap_or_default() {
        if !visited.contains(dep.as_str()) {
            walk(dep, deps, visited, stack, path, cycles);
        } else if stack.contains(dep.as_str()) {
            // Back edge: the cycle runs from dep's position on the current
            // path down to this node.
            let start = path.iter().position(|id| id == dep).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].to_vec();
            cycle.push(dep.clone());
            cycles.push(cycle);
        }
    }

    stack.remove(node);
    path.pop();
}

#[cfg(test)]
mod tests;
