#![forbid(unsafe_code)]

use std::path::PathBuf;
use tl_core::ids::TeamId;
use tl_storage::{
    AddDependencyOutcome, ClaimOutcome, CompleteOutcome, CreateTaskRequest, TeamLedger,
};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = base.join(format!("tl_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn open_ledger(test_name: &str) -> TeamLedger {
    let state_dir = temp_dir(test_name);
    let team = TeamId::try_new("test-team").expect("team id");
    TeamLedger::open(&state_dir, &team).expect("open ledger")
}

fn task(subject: &str) -> CreateTaskRequest {
    CreateTaskRequest {
        subject: subject.to_string(),
        description: format!("{subject} in detail"),
        active_form: None,
        metadata: None,
    }
}

#[test]
fn dependency_edges_stay_symmetric() {
    let mut ledger = open_ledger("dependency_edges_stay_symmetric");
    let blocker = ledger.create_task(task("Collect data")).expect("create");
    let dependent = ledger.create_task(task("Analyze data")).expect("create");

    let outcome = ledger
        .add_task_dependency(&dependent.id, &blocker.id)
        .expect("add dependency");
    assert_eq!(outcome, AddDependencyOutcome::Added);

    let dependent_row = ledger
        .get_task(&dependent.id)
        .expect("get")
        .expect("exists");
    let blocker_row = ledger.get_task(&blocker.id).expect("get").expect("exists");
    assert_eq!(dependent_row.blocked_by, vec![blocker.id.clone()]);
    assert_eq!(blocker_row.blocks, vec![dependent.id.clone()]);
}

#[test]
fn adding_an_existing_edge_is_a_no_op() {
    let mut ledger = open_ledger("adding_an_existing_edge_is_a_no_op");
    let blocker = ledger.create_task(task("Collect data")).expect("create");
    let dependent = ledger.create_task(task("Analyze data")).expect("create");

    assert_eq!(
        ledger
            .add_task_dependency(&dependent.id, &blocker.id)
            .expect("add"),
        AddDependencyOutcome::Added
    );
    assert_eq!(
        ledger
            .add_task_dependency(&dependent.id, &blocker.id)
            .expect("re-add"),
        AddDependencyOutcome::AlreadyPresent
    );

    let dependent_row = ledger
        .get_task(&dependent.id)
        .expect("get")
        .expect("exists");
    let blocker_row = ledger.get_task(&blocker.id).expect("get").expect("exists");
    assert_eq!(dependent_row.blocked_by.len(), 1);
    assert_eq!(blocker_row.blocks.len(), 1);
}

#[test]
fn dependency_requires_both_tasks_to_exist() {
    let mut ledger = open_ledger("dependency_requires_both_tasks_to_exist");
    let real = ledger.create_task(task("Exists")).expect("create");

    assert_eq!(
        ledger
            .add_task_dependency(&real.id, "TASK-404")
            .expect("add"),
        AddDependencyOutcome::TaskNotFound {
            task_id: "TASK-404".to_string()
        }
    );
    assert_eq!(
        ledger
            .add_task_dependency("TASK-404", &real.id)
            .expect("add"),
        AddDependencyOutcome::TaskNotFound {
            task_id: "TASK-404".to_string()
        }
    );

    // The failed edits must not leave half an edge behind.
    let row = ledger.get_task(&real.id).expect("get").expect("exists");
    assert!(row.blocked_by.is_empty());
    assert!(row.blocks.is_empty());
}

#[test]
fn blocked_task_is_hidden_until_completion_cascade() {
    let mut ledger = open_ledger("blocked_task_is_hidden_until_completion_cascade");
    let blocker = ledger.create_task(task("Build the index")).expect("create");
    let dependent = ledger.create_task(task("Query the index")).expect("create");
    ledger
        .add_task_dependency(&dependent.id, &blocker.id)
        .expect("add dependency");

    let available = ledger.find_available_tasks(10).expect("available");
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].id, blocker.id);

    let refused = ledger.claim_task(&dependent.id, "agent-a").expect("claim");
    assert_eq!(
        refused,
        ClaimOutcome::Blocked {
            blocked_by: vec![blocker.id.clone()]
        }
    );

    assert!(
        ledger
            .claim_task(&blocker.id, "agent-a")
            .expect("claim")
            .is_claimed()
    );
    let outcome = ledger.complete_task(&blocker.id).expect("complete");
    assert_eq!(
        outcome,
        CompleteOutcome::Completed {
            unblocked: vec![dependent.id.clone()]
        }
    );

    let dependent_row = ledger
        .get_task(&dependent.id)
        .expect("get")
        .expect("exists");
    assert!(dependent_row.blocked_by.is_empty());

    let available = ledger.find_available_tasks(10).expect("available");
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].id, dependent.id);
}

#[test]
fn cascade_removes_only_the_finished_blocker() {
    let mut ledger = open_ledger("cascade_removes_only_the_finished_blocker");
    let first = ledger.create_task(task("Fetch sources")).expect("create");
    let second = ledger.create_task(task("Clean sources")).expect("create");
    let sink = ledger.create_task(task("Merge sources")).expect("create");
    ledger
        .add_task_dependency(&sink.id, &first.id)
        .expect("add");
    ledger
        .add_task_dependency(&sink.id, &second.id)
        .expect("add");

    assert!(
        ledger
            .claim_task(&first.id, "agent-a")
            .expect("claim")
            .is_claimed()
    );
    let outcome = ledger.complete_task(&first.id).expect("complete");
    // The sink still has one outstanding blocker, so nothing is unblocked.
    assert_eq!(
        outcome,
        CompleteOutcome::Completed {
            unblocked: Vec::new()
        }
    );

    let sink_row = ledger.get_task(&sink.id).expect("get").expect("exists");
    assert_eq!(sink_row.blocked_by, vec![second.id.clone()]);

    assert!(
        ledger
            .claim_task(&second.id, "agent-b")
            .expect("claim")
            .is_claimed()
    );
    let outcome = ledger.complete_task(&second.id).expect("complete");
    assert_eq!(
        outcome,
        CompleteOutcome::Completed {
            unblocked: vec![sink.id.clone()]
        }
    );
    assert!(
        ledger
            .claim_task(&sink.id, "agent-c")
            .expect("claim")
            .is_claimed()
    );
}

#[test]
fn triangle_of_dependencies_is_reported_as_one_cycle() {
    let mut ledger = open_ledger("triangle_of_dependencies_is_reported_as_one_cycle");
    let a = ledger.create_task(task("Alpha")).expect("create");
    let b = ledger.create_task(task("Beta")).expect("create");
    let c = ledger.create_task(task("Gamma")).expect("create");

    ledger.add_task_dependency(&a.id, &b.id).expect("a<-b");
    ledger.add_task_dependency(&b.id, &c.id).expect("b<-c");
    ledger.add_task_dependency(&c.id, &a.id).expect("c<-a");

    let cycles = ledger.detect_circular_dependencies().expect("detect");
    assert_eq!(cycles.len(), 1);
    let cycle = &cycles[0];
    assert_eq!(cycle.first(), cycle.last());
    for id in [&a.id, &b.id, &c.id] {
        assert!(cycle.contains(id), "cycle must contain {id}");
    }
}

#[test]
fn two_task_loop_is_detected() {
    let mut ledger = open_ledger("two_task_loop_is_detected");
    let t1 = ledger.create_task(task("First")).expect("create");
    let t2 = ledger.create_task(task("Second")).expect("create");

    ledger.add_task_dependency(&t1.id, &t2.id).expect("t1<-t2");
    ledger.add_task_dependency(&t2.id, &t1.id).expect("t2<-t1");

    let cycles = ledger.detect_circular_dependencies().expect("detect");
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 3);
    assert_eq!(cycles[0].first(), cycles[0].last());
}

#[test]
fn diamond_graph_has_no_cycles() {
    let mut ledger = open_ledger("diamond_graph_has_no_cycles");
    let a = ledger.create_task(task("Top")).expect("create");
    let b = ledger.create_task(task("Left")).expect("create");
    let c = ledger.create_task(task("Right")).expect("create");
    let d = ledger.create_task(task("Bottom")).expect("create");

    ledger.add_task_dependency(&a.id, &b.id).expect("a<-b");
    ledger.add_task_dependency(&a.id, &c.id).expect("a<-c");
    ledger.add_task_dependency(&b.id, &d.id).expect("b<-d");
    ledger.add_task_dependency(&c.id, &d.id).expect("c<-d");

    assert!(
        ledger
            .detect_circular_dependencies()
            .expect("detect")
            .is_empty()
    );
}

#[test]
fn deleting_a_blocker_leaves_the_dependent_blocked() {
    let mut ledger = open_ledger("deleting_a_blocker_leaves_the_dependent_blocked");
    let blocker = ledger.create_task(task("Doomed blocker")).expect("create");
    let dependent = ledger.create_task(task("Waiting work")).expect("create");
    ledger
        .add_task_dependency(&dependent.id, &blocker.id)
        .expect("add");

    assert!(ledger.delete_task(&blocker.id).expect("delete"));
    assert!(ledger.get_task(&blocker.id).expect("get").is_none());

    // The dangling edge is reported to the caller, not silently dropped.
    assert!(ledger.find_available_tasks(10).expect("available").is_empty());
    assert_eq!(
        ledger.claim_task(&dependent.id, "agent-a").expect("claim"),
        ClaimOutcome::Blocked {
            blocked_by: vec![blocker.id.clone()]
        }
    );
}
