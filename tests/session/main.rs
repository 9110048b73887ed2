use std::{
    collections::{HashMap, HashSet},
    num::NonZeroUsize,
    thread,
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use kidist::{
    Scheduler,
    config::SchedulerConfig,
    error::ScheduleError,
    item::{ItemId, WorkerId},
    scope::resolve_scope,
    session::{Session, SessionReport, WorkerCommand, WorkerEvent},
};
use pretty_assertions::assert_eq;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(workers: usize, low_watermark: usize) -> SchedulerConfig {
    SchedulerConfig::new(NonZeroUsize::new(workers).unwrap())
        .with_low_watermark(NonZeroUsize::new(low_watermark).unwrap())
}

/// How a simulated worker behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Complete,
    /// Go down after receiving the first work unit, without running it.
    Crash,
}

#[derive(Debug, Default)]
struct WorkerLog {
    ran: Vec<ItemId>,
    aborted: Option<String>,
}

fn worker(
    id: WorkerId,
    collection: Vec<ItemId>,
    behavior: Behavior,
    events: Sender<WorkerEvent>,
    commands: Receiver<WorkerCommand>,
) -> WorkerLog {
    let mut log = WorkerLog::default();
    let _ = events.send(WorkerEvent::Collected {
        worker: id.clone(),
        items: collection,
    });

    while let Ok(command) = commands.recv() {
        match command {
            WorkerCommand::Run(_) if behavior == Behavior::Crash => {
                let _ = events.send(WorkerEvent::Down { worker: id.clone() });
                break;
            }
            WorkerCommand::Run(items) => {
                for item in items {
                    log.ran.push(item.clone());
                    let _ = events.send(WorkerEvent::Completed {
                        worker: id.clone(),
                        item,
                    });
                }
            }
            WorkerCommand::Shutdown => break,
            WorkerCommand::Abort(reason) => {
                log.aborted = Some(reason);
                break;
            }
        }
    }
    log
}

struct Run {
    result: Result<SessionReport, ScheduleError>,
    logs: HashMap<WorkerId, WorkerLog>,
}

fn run_session(
    config: SchedulerConfig,
    workers: Vec<(WorkerId, Vec<ItemId>, Behavior)>,
) -> Run {
    init_tracing();
    let (etx, erx) = unbounded();

    thread::scope(|scope| {
        let mut session = Session::new(Scheduler::new(config), erx);
        let mut handles = Vec::new();
        for (id, collection, behavior) in workers {
            let (ctx, crx) = unbounded();
            session = session.with_worker(id.clone(), ctx);
            let etx = etx.clone();
            handles.push((
                id.clone(),
                scope.spawn(move || worker(id, collection, behavior, etx, crx)),
            ));
        }
        drop(etx);

        let result = session.run();
        let logs = handles
            .into_iter()
            .map(|(id, handle)| (id, handle.join().expect("worker thread should not panic")))
            .collect();
        Run { result, logs }
    })
}

fn collection() -> Vec<ItemId> {
    let mut items = Vec::new();
    for module in 0..12 {
        for test in 0..5 {
            let id = match (module % 3, test) {
                (0, _) => format!("t/test_m{module}.py::test_{test}@db"),
                (1, 0 | 1) => format!("t/test_m{module}.py::test_{test}[user@host]@net"),
                (1, _) => format!("t/test_m{module}.py::test_{test}[user@host]"),
                _ => format!("t/test_m{module}.py::test_{test}"),
            };
            items.push(ItemId::from(id));
        }
    }
    items
}

fn workers(count: usize, items: &[ItemId]) -> Vec<(WorkerId, Vec<ItemId>, Behavior)> {
    (0..count)
        .map(|idx| {
            (
                WorkerId::from(format!("gw{idx}")),
                items.to_vec(),
                Behavior::Complete,
            )
        })
        .collect()
}

#[test]
fn every_item_runs_exactly_once() {
    let items = collection();
    let run = run_session(config(4, 2), workers(4, &items));
    let report = run.result.expect("session should finish");

    let mut ran: Vec<ItemId> = run.logs.values().flat_map(|log| log.ran.clone()).collect();
    ran.sort();
    let mut expected = items.clone();
    expected.sort();
    assert_eq!(ran, expected);
    assert_eq!(report.completed.len(), items.len());
    assert!(report.unfinished.is_empty());
    assert!(run.logs.values().all(|log| log.aborted.is_none()));
}

#[test]
fn groups_run_on_a_single_worker() {
    let items = collection();
    let run = run_session(config(3, 1), workers(3, &items));

    for group in ["db", "net"] {
        let owners: HashSet<_> = run
            .logs
            .iter()
            .filter(|(_, log)| log.ran.iter().any(|item| resolve_scope(item) == group))
            .map(|(id, _)| id.clone())
            .collect();
        assert_eq!(owners.len(), 1, "group {group} ran on {owners:?}");
    }

    // `[user@host]` items without a trailing tag are units of their own.
    let report = run.result.as_ref().expect("session should finish");
    let scopes: HashSet<&str> = report.units.values().flatten().map(|scope| &**scope).collect();
    let untagged: Vec<_> = items
        .iter()
        .filter(|item| item.ends_with("[user@host]"))
        .collect();
    assert_eq!(untagged.len(), 4 * 3);
    for item in untagged {
        assert!(scopes.contains(item.as_str()), "{item} is not its own unit");
    }
}

#[test]
fn grouped_units_are_assigned_once() {
    let items = collection();
    let run = run_session(config(2, 2), workers(2, &items));
    let report = run.result.expect("session should finish");

    let mut seen = HashSet::new();
    for scope in report.units.values().flatten() {
        assert!(seen.insert(scope.clone()), "{scope} assigned twice");
    }
    assert!(seen.contains("db"));
    assert!(seen.contains("net"));
}

#[test]
fn mismatched_collection_aborts_everyone() {
    let items = collection();
    let mut workers = workers(3, &items);
    workers[2].1.pop();

    let run = run_session(config(3, 2), workers);
    let err = run.result.expect_err("collections differ");

    let ScheduleError::CollectionMismatch { diffs } = &err else {
        panic!("expected a collection mismatch, got {err:?}");
    };
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].other.as_str(), "gw2");
    assert_eq!(diffs[0].missing, vec![items[items.len() - 1].clone()]);

    for log in run.logs.values() {
        assert!(log.ran.is_empty());
        let reason = log.aborted.as_deref().expect("worker should be aborted");
        assert!(reason.contains("gw2"));
    }
}

#[test]
fn crashed_worker_leaves_its_unit_to_the_caller() {
    let items = collection();
    let mut workers = workers(3, &items);
    workers[1].2 = Behavior::Crash;

    let run = run_session(config(3, 2), workers);
    let report = run.result.expect("session should finish");

    assert_eq!(report.unfinished.len(), 1);
    let (crashed, unfinished) = &report.unfinished[0];
    assert_eq!(crashed.as_str(), "gw1");
    assert!(!unfinished.is_empty());

    let mut accounted: Vec<ItemId> = report
        .completed
        .iter()
        .map(|(_, item)| item.clone())
        .chain(unfinished.iter().cloned())
        .collect();
    accounted.sort();
    let mut expected = items.clone();
    expected.sort();
    assert_eq!(accounted, expected);
}

#[test]
fn losing_every_worker_fails_the_session() {
    let items = collection();
    let mut workers = workers(3, &items);
    for worker in &mut workers {
        worker.2 = Behavior::Crash;
    }

    let run = run_session(config(3, 2), workers);
    let err = run.result.expect_err("no worker is left to run the queued units");

    let ScheduleError::NoWorkersLeft { queued, .. } = &err else {
        panic!("expected no workers left, got {err:?}");
    };
    assert!(*queued > 0);
    assert!(run.logs.values().all(|log| log.ran.is_empty()));
}
