//! Behaviour-driven tests for worker supervision.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{Harness, TransportEvent, eventually};
use crate::{StateChange, SupervisorError, SupervisorEvent, SupervisorState};

struct World {
    harness: Harness,
    events: Receiver<SupervisorEvent>,
    starter: Option<JoinHandle<Result<SupervisorState, SupervisorError>>>,
}

#[fixture]
fn world() -> World {
    let harness = Harness::enabled();
    let events = harness.supervisor.subscribe();
    World {
        harness,
        events,
        starter: None,
    }
}

fn render(event: &TransportEvent) -> String {
    match event {
        TransportEvent::Opened(pid) => format!("open {pid}"),
        TransportEvent::Closed(pid) => format!("close {pid}"),
        TransportEvent::Exited(pid) => format!("exit {pid}"),
    }
}

#[given("an enabled worker configuration")]
fn given_enabled(world: &mut World) {
    world.harness.config.set_enabled(true);
}

#[given("workers take {millis} milliseconds to start")]
fn given_slow_start(world: &mut World, millis: u64) {
    world
        .harness
        .factory
        .set_start_delay(Duration::from_millis(millis));
}

#[given("the next spawn fails with {message}")]
fn given_spawn_failure(world: &mut World, message: String) {
    world
        .harness
        .factory
        .fail_next_start(message.trim_matches('"'));
}

#[when("the worker is started")]
fn when_started(world: &mut World) {
    // Failures are asserted through the resulting state.
    let _ = world.harness.supervisor.start();
}

#[when("the worker is restarted")]
fn when_restarted(world: &mut World) {
    let _ = world.harness.supervisor.restart();
}

#[when("the worker is toggled")]
fn when_toggled(world: &mut World) {
    let _ = world.harness.supervisor.toggle_enabled();
}

#[when("the configuration disables the worker")]
fn when_disabled(world: &mut World) {
    world.harness.config.set_enabled(false);
}

#[when("the worker exits on its own")]
fn when_worker_exits(world: &mut World) {
    world.harness.factory.crash_current();
}

#[when("a start is issued in the background")]
fn when_background_start(world: &mut World) {
    let supervisor = Arc::clone(&world.harness.supervisor);
    world.starter = Some(thread::spawn(move || supervisor.start()));
}

#[when("a stop is issued once the start is under way")]
fn when_stop_after_start(world: &mut World) {
    let under_way = world
        .events
        .iter()
        .take(4)
        .any(|event| {
            matches!(
                event,
                SupervisorEvent::StateChanged(StateChange {
                    to: SupervisorState::Starting,
                    ..
                })
            )
        });
    assert!(under_way, "start never began");

    let stopped = world.harness.supervisor.stop();
    let started = world
        .starter
        .take()
        .expect("a background start was issued")
        .join()
        .expect("start thread panicked");
    assert_eq!(started.ok(), Some(SupervisorState::Running));
    assert_eq!(stopped.ok(), Some(SupervisorState::Stopped));
}

#[then("the supervisor is {state}")]
fn then_state(world: &mut World, state: String) {
    assert_eq!(
        world.harness.supervisor.state().to_string(),
        state.trim_matches('"')
    );
}

#[then("the supervisor has failed mentioning {text}")]
fn then_failed(world: &mut World, text: String) {
    let state = world.harness.supervisor.state();
    let reason = state.failure_reason().unwrap_or_default();
    assert!(
        reason.contains(text.trim_matches('"')),
        "unexpected state: {state}"
    );
}

#[then("exactly {count} worker has been spawned")]
fn then_spawned(world: &mut World, count: usize) {
    assert_eq!(world.harness.factory.opened(), count);
}

#[then("no worker is alive")]
fn then_none_alive(world: &mut World) {
    assert_eq!(world.harness.factory.live(), 0);
    assert!(!world.harness.supervisor.is_running());
}

#[then("the transport log reads {log}")]
fn then_log(world: &mut World, log: String) {
    let rendered: Vec<_> = world.harness.factory.events().iter().map(render).collect();
    assert_eq!(rendered.join(", "), log.trim_matches('"'));
}

#[then("the supervisor notices the exit")]
fn then_notices_exit(world: &mut World) {
    let supervisor = Arc::clone(&world.harness.supervisor);
    assert!(eventually(Duration::from_secs(1), || supervisor.reconcile()));
}

#[scenario(path = "tests/features/supervisor.feature")]
fn supervisor_behaviour(world: World) {
    let _ = world;
}
