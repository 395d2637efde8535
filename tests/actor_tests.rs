//! End-to-end actor scenarios on real background executors.

mod common;

use common::{entries, init_tracing, next_entry, Spy, Seen, WAIT};
use std::sync::mpsc::channel;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use troupe::{
    Action, ActionError, Actor, ActorConfig, Continuation, LifecycleError, ManualExecutor,
    ThreadExecutor, TokioExecutor, Transition, TransitionKind,
};

type Counter = Actor<u32, Spy<u32>>;

fn threaded(state: u32) -> Counter {
    Actor::with_config(
        state,
        ActorConfig::default().with_executor(Arc::new(ThreadExecutor::new("test-task"))),
    )
}

/// An actor whose async work only runs when the returned executor is stepped.
fn stepped(state: u32) -> (Counter, Arc<ManualExecutor>) {
    let tasks = Arc::new(ManualExecutor::new());
    let actor = Actor::with_config(
        state,
        ActorConfig::default().with_executor(tasks.clone()),
    );
    (actor, tasks)
}

fn increment() -> Action<u32, Spy<u32>> {
    Action::map(|n| n + 1)
}

#[test]
fn counter_delivers_every_increment_in_order() {
    init_tracing();
    let actor = threaded(0);
    let (spy, rx) = Spy::new();
    actor.attach(spy);

    for _ in 0..3 {
        actor.exec(increment()).unwrap();
    }

    assert_eq!(actor.project(|n| *n), 3);
    assert_eq!(entries(&rx), vec![1, 2, 3]);
}

#[test]
fn reenter_fires_once_and_keeps_state() {
    init_tracing();
    let actor = threaded(9);
    let (spy, rx) = Spy::new();
    actor.attach(spy);

    actor.exec(Action::reenter()).unwrap();

    assert_eq!(actor.project(|n| *n), 9);
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Seen::Enter(9)]);
}

#[test]
fn enter_reports_exit_before_entry() {
    init_tracing();
    let actor = threaded(1);
    let (spy, rx) = Spy::new();
    actor.attach(spy);

    actor.exec(Action::enter(2)).unwrap();

    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![Seen::Exit(1, 2), Seen::Enter(2)]
    );
}

#[test]
fn async_result_arrives_later() {
    init_tracing();
    let actor = threaded(0);
    let (spy, rx) = Spy::new();
    actor.attach(spy);

    actor
        .exec(Action::task(|token| {
            token.wait(Duration::from_millis(50))?;
            Ok(Action::enter(42))
        }))
        .unwrap();

    assert_eq!(next_entry(&rx, WAIT), Some(42));
    assert_eq!(actor.project(|n| *n), 42);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn actions_run_while_supplier_is_pending() {
    init_tracing();
    let (actor, tasks) = stepped(0);
    let (spy, rx) = Spy::new();
    actor.attach(spy);

    actor
        .exec(Action::task(|_| Ok(Action::map(|n| n * 10))))
        .unwrap();
    actor.exec(increment()).unwrap();
    assert_eq!(actor.project(|n| *n), 1);
    assert_eq!(tasks.pending(), 1);

    assert!(tasks.step());
    assert_eq!(entries(&rx), vec![1, 10]);
}

#[test]
fn chain_suspends_and_resumes_with_remaining_steps() {
    init_tracing();
    let actor = threaded(0);
    let (spy, rx) = Spy::new();
    actor.attach(spy);

    actor
        .exec(
            increment()
                .then(Action::task(|_| Ok(Action::map(|n| n + 10))))
                .then(Action::map(|n| n * 2)),
        )
        .unwrap();

    assert_eq!(next_entry(&rx, WAIT), Some(1));
    assert_eq!(next_entry(&rx, WAIT), Some(22));
}

#[test]
fn deferred_continuation_resumes_from_another_thread() {
    init_tracing();
    let actor = threaded(0);
    let (spy, rx) = Spy::new();
    actor.attach(spy);

    actor
        .exec(Action::new(|_| {
            Transition::defer(|resume: Continuation<u32, Spy<u32>>| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(20));
                    resume.ok(7);
                });
            })
        }))
        .unwrap();

    assert_eq!(next_entry(&rx, WAIT), Some(7));
}

#[test]
fn supplier_failure_reaches_error_callback() {
    init_tracing();
    let actor = threaded(3);
    let (spy, rx) = Spy::new();
    actor.attach(spy);

    actor
        .exec(Action::task(|_| Err(ActionError::msg("network down"))))
        .unwrap();

    let seen = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(seen, Seen::Error("network down".to_string()));
    assert_eq!(actor.project(|n| *n), 3);
}

#[test]
fn dispose_suppresses_pending_continuation() {
    init_tracing();
    let (actor, tasks) = stepped(0);
    let (spy, rx) = Spy::new();
    actor.attach(spy);
    let (ran_tx, ran_rx) = channel();

    actor
        .exec(Action::task(move |token| {
            ran_tx.send(token.is_cancelled()).unwrap();
            Ok(Action::enter(42))
        }))
        .unwrap();

    actor.dispose();
    assert_eq!(tasks.run_all(), 1);

    assert_eq!(ran_rx.try_recv(), Ok(true));
    assert!(rx.try_recv().is_err());
    assert_eq!(actor.project(|n| *n), 0);
    assert_eq!(actor.history().kinds(), vec![TransitionKind::Async]);
    assert_eq!(actor.exec(increment()), Err(LifecycleError::Disposed));
}

#[test]
fn suppliers_complete_in_the_order_they_are_stepped() {
    init_tracing();
    let (actor, tasks) = stepped(1);
    let (spy, rx) = Spy::new();
    actor.attach(spy);

    actor
        .exec(Action::task(|_| Ok(Action::map(|n| n + 1))))
        .unwrap();
    actor
        .exec(Action::task(|_| Ok(Action::map(|n| n * 3))))
        .unwrap();
    assert_eq!(tasks.pending(), 2);

    assert!(tasks.step());
    assert_eq!(entries(&rx), vec![2]);
    assert!(tasks.step());
    assert_eq!(entries(&rx), vec![6]);
    assert!(!tasks.step());
}

#[test]
fn slow_supplier_is_dropped_after_timeout() {
    init_tracing();
    let actor: Counter = Actor::with_config(
        0,
        ActorConfig::default()
            .with_executor(Arc::new(ThreadExecutor::default()))
            .with_async_timeout(Duration::from_millis(20)),
    );
    let (spy, rx) = Spy::new();
    actor.attach(spy);
    let (done_tx, done_rx) = channel();

    actor
        .exec(Action::task(move |token| {
            // Wakes at the deadline instead of sleeping the full second.
            let waited = token.wait(Duration::from_secs(1));
            done_tx.send(waited.is_err()).unwrap();
            Ok(Action::enter(1))
        }))
        .unwrap();

    assert!(done_rx.recv_timeout(WAIT).unwrap());
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(actor.history().kinds(), vec![TransitionKind::Async]);
}

#[test]
fn concurrent_submitters_are_serialized() {
    init_tracing();
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;

    let actor = threaded(0);
    let (spy, rx) = Spy::new();
    actor.attach(spy);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let actor = actor.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    actor.exec(increment()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = (THREADS * PER_THREAD) as u32;
    assert_eq!(actor.project(|n| *n), total);
    assert_eq!(entries(&rx), (1..=total).collect::<Vec<_>>());
}

#[test]
fn detached_actor_keeps_working_silently() {
    init_tracing();
    let actor = threaded(0);
    let (first, first_rx) = Spy::new();
    actor.attach(first);
    actor.detach();

    actor.exec(increment()).unwrap();
    assert!(first_rx.try_recv().is_err());

    let (second, second_rx) = Spy::new();
    actor.attach(second);
    actor.exec(Action::reenter()).unwrap();
    assert_eq!(entries(&second_rx), vec![1]);
}

#[tokio::test(flavor = "multi_thread")]
async fn tokio_executor_runs_suppliers() {
    init_tracing();
    let actor: Counter = Actor::with_config(
        0,
        ActorConfig::default().with_executor(Arc::new(TokioExecutor::current().unwrap())),
    );
    let (spy, rx) = Spy::new();
    actor.attach(spy);

    actor
        .exec(Action::task(|_| Ok(Action::enter(5))))
        .unwrap();

    let seen = tokio::task::spawn_blocking(move || next_entry(&rx, WAIT))
        .await
        .unwrap();
    assert_eq!(seen, Some(5));
}
