use super::*;

fn graph(edges: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    edges
        .iter()
        .map(|(node, deps)| {
            (
                node.to_string(),
                deps.iter().map(|dep| dep.to_string()).collect(),
            )
        })
        .collect()
}

#[test]
fn empty_graph_has_no_cycles() {
    assert!(find_cycles(&BTreeMap::new()).is_empty());
}

#[test]
fn chain_has_no_cycles() {
    let deps = graph(&[("A", &["B"]), ("B", &["C"]), ("C", &[])]);
    assert!(find_cycles(&deps).is_empty());
}

#[test]
fn diamond_is_not_a_cycle() {
    let deps = graph(&[
        ("A", &["B", "C"]),
        ("B", &["D"]),
        ("C", &["D"]),
        ("D", &[]),
    ]);
    assert!(find_cycles(&deps).is_empty());
}

#[test]
fn two_node_cycle_is_reported() {
    let deps = graph(&[("T1", &["T2"]), ("T2", &["T1"])]);
    let cycles = find_cycles(&deps);
    assert_eq!(cycles, vec![vec!["T1", "T2", "T1"]]);
}

#[test]
fn triangle_cycle_contains_all_three_nodes() {
    let deps = graph(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"])]);
    let cycles = find_cycles(&deps);
    assert_eq!(cycles.len(), 1);
    let cycle = &cycles[0];
    assert_eq!(cycle.first(), cycle.last());
    for id in ["A", "B", "C"] {
        assert!(cycle.iter().any(|node| node == id), "missing {id}");
    }
}

#[test]
fn self_loop_is_a_cycle() {
    let deps = graph(&[("A", &["A"])]);
    assert_eq!(find_cycles(&deps), vec![vec!["A", "A"]]);
}

#[test]
fn distinct_cycles_are_all_reported() {
    let deps = graph(&[
        ("A", &["B"]),
        ("B", &["A"]),
        ("C", &["D"]),
        ("D", &["C"]),
    ]);
    let cycles = find_cycles(&deps);
    assert_eq!(cycles.len(), 2);
}

#[test]
fn cycle_reached_after_another_root_is_not_misreported() {
    // B <-> C form the only cycle; A merely points into it. A stale
    // recursion stack would make the A root report a phantom cycle.
    let deps = graph(&[("B", &["C"]), ("C", &["B"]), ("A", &["B"])]);
    let cycles = find_cycles(&deps);
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].iter().all(|id| id == "B" || id == "C"));
}

#[test]
fn dangling_dependency_is_treated_as_leaf() {
    let deps = graph(&[("A", &["GHOST"])]);
    assert!(find_cycles(&deps).is_empty());
}
